use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Ordered tensor dimensions. Every dimension is at least 1.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Shape(pub SmallVec<[usize; 6]>);

impl Shape {
    pub fn from_slice(d: &[usize]) -> Self {
        Self(d.iter().map(|&v| v.max(1)).collect())
    }

    /// Builds a shape from raw declared dimensions, replacing anything
    /// that is not a concrete positive value with 1.
    pub fn from_declared(dims: impl IntoIterator<Item = Option<i64>>) -> Self {
        Self(dims.into_iter().map(normalize_dim).collect())
    }

    pub fn rank(&self) -> usize {
        self.0.len()
    }

    pub fn dims(&self) -> &[usize] {
        &self.0
    }
}

/// Unknown, symbolic, zero or negative dimensions collapse to 1.
pub fn normalize_dim(raw: Option<i64>) -> usize {
    match raw {
        Some(v) if v > 0 => usize::try_from(v).unwrap_or(1),
        _ => 1,
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "]")
    }
}
