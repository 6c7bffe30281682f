use crate::{
    config::{ConfigFileError, IndexConfig, KeyConfig, RepositoryConfig},
    error::{ErrorClass, ErrorOrigin},
    index::{ComparatorSpec, IndexKind, IndexRepository, KeyDirection},
    test_support::text_types,
};

const SAMPLE: &str = r#"
type_priorities = [["Sentence", "Token"], ["NamedEntity", "Token"]]

[[indexes]]
label = "TokensByPos"
type = "Token"
kind = "set"
keys = [
    { feature = "pos" },
    { feature = "begin", order = "reverse" },
    { type_order = true },
]

[[indexes]]
label = "Entities"
type = "NamedEntity"
keys = [{ feature = "confidence", order = "reverse" }]
"#;

#[test]
fn parses_priorities_and_index_definitions() {
    let config = RepositoryConfig::from_toml_str(SAMPLE).unwrap();

    assert_eq!(config.type_priorities.len(), 2);
    assert_eq!(config.indexes.len(), 2);
    assert_eq!(config.indexes[1].kind, IndexKind::Sorted);

    let definition = config.indexes[0].definition().unwrap();
    assert_eq!(definition.label, "TokensByPos");
    assert_eq!(definition.kind, IndexKind::Set);
    assert_eq!(
        definition.comparator,
        ComparatorSpec::new("Token")
            .key("pos", KeyDirection::Standard)
            .key("begin", KeyDirection::Reverse)
            .type_order(KeyDirection::Standard)
    );
}

#[test]
fn empty_document_is_a_valid_config() {
    let config = RepositoryConfig::from_toml_str("").unwrap();

    assert_eq!(config, RepositoryConfig::default());
}

#[test]
fn unknown_fields_are_parse_errors() {
    let err = RepositoryConfig::from_toml_str("indices = []").unwrap_err();

    assert!(matches!(err, ConfigFileError::Parse(_)));
}

#[test]
fn keys_must_name_exactly_one_target() {
    let index = IndexConfig {
        label: "Broken".to_string(),
        type_name: "Token".to_string(),
        kind: IndexKind::Bag,
        keys: vec![
            KeyConfig {
                feature: Some("pos".to_string()),
                ..KeyConfig::default()
            },
            KeyConfig::default(),
        ],
    };

    let err = index.definition().unwrap_err();
    assert!(matches!(err, ConfigFileError::InvalidKey { position: 1, .. }));

    let both = KeyConfig {
        feature: Some("pos".to_string()),
        type_order: true,
        order: KeyDirection::Standard,
    };
    let index = IndexConfig {
        keys: vec![both],
        ..index
    };
    assert!(matches!(
        index.definition().unwrap_err(),
        ConfigFileError::InvalidKey { position: 0, .. }
    ));
}

#[test]
fn round_trips_through_toml_and_json() {
    let config = RepositoryConfig::from_toml_str(SAMPLE).unwrap();

    let toml = config.to_toml_string().unwrap();
    assert_eq!(RepositoryConfig::from_toml_str(&toml).unwrap(), config);

    let json = serde_json::to_string(&config).unwrap();
    let back: RepositoryConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);
}

#[test]
fn repository_from_config_builds_every_index() {
    let config = RepositoryConfig::from_toml_str(SAMPLE).unwrap();
    let repository = IndexRepository::from_config(text_types(), &config).unwrap();

    let labels: Vec<_> = repository.labels().collect();
    assert_eq!(labels, vec!["AnnotationIndex", "Entities", "TokensByPos"]);
    assert_eq!(repository.index("TokensByPos").unwrap().kind(), IndexKind::Set);
    assert!(!repository.type_order().is_empty_order());
}

#[test]
fn repository_from_config_is_all_or_nothing() {
    let source = r#"
[[indexes]]
label = "Good"
type = "Token"
keys = [{ feature = "pos" }]

[[indexes]]
label = "Bad"
type = "Token"
keys = [{ feature = "lemma" }]
"#;
    let config = RepositoryConfig::from_toml_str(source).unwrap();
    let err = IndexRepository::from_config(text_types(), &config).unwrap_err();

    assert_eq!(err.class, ErrorClass::Config);
    assert_eq!(err.origin, ErrorOrigin::Comparator);
    assert!(err.message.contains("lemma"));
}

#[test]
fn unknown_priority_types_are_config_errors() {
    let config = RepositoryConfig::from_toml_str(r#"type_priorities = [["Token", "Chapter"]]"#)
        .unwrap();
    let err = IndexRepository::from_config(text_types(), &config).unwrap_err();

    assert_eq!(err.class, ErrorClass::Config);
    assert_eq!(err.origin, ErrorOrigin::TypeOrder);
}
