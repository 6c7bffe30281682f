use crate::{
    model::TypeSystem,
    types::{Generation, TypeCode},
};
use std::{
    cmp::{Ordering, Reverse},
    collections::{BTreeSet, BinaryHeap},
};
use thiserror::Error as ThisError;

///
/// TypeOrderError
///

#[derive(Debug, Eq, PartialEq, ThisError)]
pub enum TypeOrderError {
    #[error("type priority references unknown type '{0}'")]
    UnknownType(String),

    #[error("type priority '{first}' < '{second}' creates a cycle")]
    Cycle { first: String, second: String },

    #[error("type order computed for {order} cannot be used with type system {type_system}")]
    GenerationMismatch {
        order: Generation,
        type_system: Generation,
    },
}

///
/// LinearTypeOrder
///
/// Total order over every type of one type system, used as the tiebreak key
/// of annotation comparators. Immutable once built; a new type system needs
/// a new order.
///

#[derive(Clone, Debug)]
pub struct LinearTypeOrder {
    generation: Generation,
    order: Vec<TypeCode>,
    rank: Vec<u32>,
    is_empty_order: bool,
}

impl LinearTypeOrder {
    /// Order with no declared priorities: types rank by code.
    #[must_use]
    pub fn natural(type_system: &TypeSystem) -> Self {
        Self::from_order(
            type_system.generation(),
            type_system.type_codes().collect(),
            true,
        )
    }

    fn from_order(generation: Generation, order: Vec<TypeCode>, is_empty_order: bool) -> Self {
        let mut rank = vec![0u32; order.len()];
        for (position, code) in order.iter().enumerate() {
            rank[code.index()] = u32::try_from(position).unwrap_or(u32::MAX);
        }

        Self {
            generation,
            order,
            rank,
            is_empty_order,
        }
    }

    #[must_use]
    pub const fn generation(&self) -> Generation {
        self.generation
    }

    /// Type codes from lowest to highest priority.
    #[must_use]
    pub fn order(&self) -> &[TypeCode] {
        &self.order
    }

    /// Whether the order was built without any declared priorities.
    #[must_use]
    pub const fn is_empty_order(&self) -> bool {
        self.is_empty_order
    }

    #[must_use]
    pub fn less_than(&self, left: TypeCode, right: TypeCode) -> bool {
        self.rank_of(left) < self.rank_of(right)
    }

    #[must_use]
    pub fn compare(&self, left: TypeCode, right: TypeCode) -> Ordering {
        if left == right {
            return Ordering::Equal;
        }

        self.rank_of(left).cmp(&self.rank_of(right))
    }

    // Codes outside the type system sort after every known type.
    fn rank_of(&self, code: TypeCode) -> u32 {
        self.rank.get(code.index()).copied().unwrap_or(u32::MAX)
    }
}

impl PartialEq for LinearTypeOrder {
    fn eq(&self, other: &Self) -> bool {
        self.generation == other.generation && self.order == other.order
    }
}

impl Eq for LinearTypeOrder {}

///
/// LinearTypeOrderBuilder
///
/// Collects pairwise type priorities (`a` before `b`) and linearizes them
/// with a deterministic topological sort. Types without a priority of their
/// own inherit the priorities of their nearest constrained supertype.
///

pub struct LinearTypeOrderBuilder<'a> {
    type_system: &'a TypeSystem,
    successors: Vec<BTreeSet<TypeCode>>,
    predecessors: Vec<BTreeSet<TypeCode>>,
    declared: bool,
}

impl<'a> LinearTypeOrderBuilder<'a> {
    #[must_use]
    pub fn new(type_system: &'a TypeSystem) -> Self {
        let len = type_system.len();

        Self {
            type_system,
            successors: vec![BTreeSet::new(); len],
            predecessors: vec![BTreeSet::new(); len],
            declared: false,
        }
    }

    /// Add a priority chain: each type sorts before the next one.
    pub fn add<S: AsRef<str>>(&mut self, chain: &[S]) -> Result<(), TypeOrderError> {
        let codes = chain
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.type_system
                    .type_code(name)
                    .ok_or_else(|| TypeOrderError::UnknownType(name.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        for pair in codes.windows(2) {
            self.add_pair(pair[0], pair[1])?;
        }

        Ok(())
    }

    fn add_pair(&mut self, first: TypeCode, second: TypeCode) -> Result<(), TypeOrderError> {
        if self.path_exists(first, second) {
            return Ok(());
        }
        if self.path_exists(second, first) {
            return Err(TypeOrderError::Cycle {
                first: self.type_system.type_name(first).to_string(),
                second: self.type_system.type_name(second).to_string(),
            });
        }
        self.connect(first, second);
        self.declared = true;

        Ok(())
    }

    fn connect(&mut self, from: TypeCode, to: TypeCode) {
        self.successors[from.index()].insert(to);
        self.predecessors[to.index()].insert(from);
    }

    fn path_exists(&self, from: TypeCode, to: TypeCode) -> bool {
        let mut seen = vec![false; self.successors.len()];
        let mut stack = vec![from];
        while let Some(code) = stack.pop() {
            if code == to {
                return true;
            }
            if std::mem::replace(&mut seen[code.index()], true) {
                continue;
            }
            stack.extend(self.successors[code.index()].iter().copied());
        }

        false
    }

    // Walk each type up its supertype chain; unconstrained types on the way
    // copy the in/out edges of the first constrained ancestor.
    fn inherit_priorities(&mut self) {
        let codes: Vec<TypeCode> = self.type_system.type_codes().collect();

        for bottom in codes {
            let mut chain = Vec::new();
            let mut with_preds = None;
            let mut with_succs = None;
            let mut current = Some(bottom);

            while let Some(code) = current {
                if with_preds.is_none() && !self.predecessors[code.index()].is_empty() {
                    with_preds = Some(code);
                }
                if with_succs.is_none() && !self.successors[code.index()].is_empty() {
                    with_succs = Some(code);
                }
                if (with_preds.is_some() && with_succs.is_some()) || code == TypeSystem::TOP {
                    break;
                }
                chain.push(code);
                current = self.type_system.parent(code);
            }

            let mut fill_preds = with_preds.is_some();
            let mut fill_succs = with_succs.is_some();
            for code in chain {
                if fill_preds && let Some(source) = with_preds {
                    if self.predecessors[code.index()].is_empty() {
                        let inherited: Vec<_> =
                            self.predecessors[source.index()].iter().copied().collect();
                        for pred in inherited {
                            if !self.path_exists(code, pred) {
                                self.connect(pred, code);
                            }
                        }
                    } else {
                        fill_preds = false;
                    }
                }
                if fill_succs && let Some(source) = with_succs {
                    if self.successors[code.index()].is_empty() {
                        let inherited: Vec<_> =
                            self.successors[source.index()].iter().copied().collect();
                        for succ in inherited {
                            if !self.path_exists(succ, code) {
                                self.connect(code, succ);
                            }
                        }
                    } else {
                        fill_succs = false;
                    }
                }
            }
        }
    }

    /// Linearize the collected priorities.
    #[must_use]
    pub fn build(mut self) -> LinearTypeOrder {
        if !self.declared {
            return LinearTypeOrder::natural(self.type_system);
        }
        self.inherit_priorities();

        let len = self.successors.len();
        let mut in_degree: Vec<usize> = self.predecessors.iter().map(BTreeSet::len).collect();
        let mut ready: BinaryHeap<Reverse<TypeCode>> = self
            .type_system
            .type_codes()
            .filter(|code| in_degree[code.index()] == 0)
            .map(Reverse)
            .collect();

        let mut order = Vec::with_capacity(len);
        while let Some(Reverse(code)) = ready.pop() {
            order.push(code);
            for succ in &self.successors[code.index()] {
                let degree = &mut in_degree[succ.index()];
                *degree -= 1;
                if *degree == 0 {
                    ready.push(Reverse(*succ));
                }
            }
        }

        LinearTypeOrder::from_order(self.type_system.generation(), order, false)
    }
}
