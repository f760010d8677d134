use std::fmt;

use serde::{Deserialize, Serialize};

/// Correlation key binding a fired prompt to its eventual oracle callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Address of one benchmark inside the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BenchmarkRef {
    pub group_id: usize,
    pub index: usize,
}

impl BenchmarkRef {
    pub fn new(group_id: usize, index: usize) -> Self {
        Self { group_id, index }
    }
}

impl fmt::Display for BenchmarkRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group_id, self.index)
    }
}
