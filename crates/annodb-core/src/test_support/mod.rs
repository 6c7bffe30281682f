mod fixtures;

pub(crate) use fixtures::*;
