//! Repository configuration.
//!
//! A TOML document lists type priorities and index definitions:
//!
//! ```toml
//! type_priorities = [["Sentence", "Token"]]
//!
//! [[indexes]]
//! label = "TokensByPos"
//! type = "Token"
//! kind = "set"
//! keys = [
//!     { feature = "pos" },
//!     { feature = "begin", order = "reverse" },
//!     { type_order = true },
//! ]
//! ```

use crate::{
    index::{ComparatorSpec, IndexDefinition, IndexKind, KeyDirection, SortKey},
    model::{LinearTypeOrder, LinearTypeOrderBuilder, TypeOrderError, TypeSystem},
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// ConfigFileError
///

#[derive(Debug, ThisError)]
pub enum ConfigFileError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("index '{label}' key {position}: {reason}")]
    InvalidKey {
        label: String,
        position: usize,
        reason: &'static str,
    },
}

///
/// RepositoryConfig
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RepositoryConfig {
    /// Chains of type names, each read as `a < b < c`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_priorities: Vec<Vec<String>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<IndexConfig>,
}

impl RepositoryConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigFileError> {
        Ok(toml::from_str(source)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigFileError> {
        Ok(toml::to_string(self)?)
    }

    /// Linear type order from the declared priorities.
    pub fn type_order(&self, type_system: &TypeSystem) -> Result<LinearTypeOrder, TypeOrderError> {
        let mut builder = LinearTypeOrderBuilder::new(type_system);
        for chain in &self.type_priorities {
            builder.add(chain.as_slice())?;
        }

        Ok(builder.build())
    }
}

///
/// IndexConfig
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IndexConfig {
    pub label: String,

    #[serde(rename = "type")]
    pub type_name: String,

    #[serde(default)]
    pub kind: IndexKind,

    pub keys: Vec<KeyConfig>,
}

impl IndexConfig {
    pub fn definition(&self) -> Result<IndexDefinition, ConfigFileError> {
        let mut comparator = ComparatorSpec::new(&self.type_name);
        for (position, key) in self.keys.iter().enumerate() {
            let key = match (&key.feature, key.type_order) {
                (Some(feature), false) => SortKey::feature(feature, key.order),
                (None, true) => SortKey::type_order(key.order),
                (Some(_), true) => {
                    return Err(self.invalid_key(position, "names both a feature and type_order"));
                }
                (None, false) => {
                    return Err(self.invalid_key(position, "names neither a feature nor type_order"));
                }
            };
            comparator.keys.push(key);
        }

        Ok(IndexDefinition::new(&self.label, self.kind, comparator))
    }

    fn invalid_key(&self, position: usize, reason: &'static str) -> ConfigFileError {
        ConfigFileError::InvalidKey {
            label: self.label.clone(),
            position,
            reason,
        }
    }
}

///
/// KeyConfig
///
/// Exactly one of `feature` or `type_order = true`.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KeyConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature: Option<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub type_order: bool,

    #[serde(default)]
    pub order: KeyDirection,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_false(value: &bool) -> bool {
    !*value
}

#[cfg(test)]
mod tests;
