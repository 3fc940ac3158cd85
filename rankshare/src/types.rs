/// Rank of a participant in a communicator group (0-indexed).
pub type Rank = u32;

/// Reduction operations for collective communication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReduceOp {
    /// Sum across ranks.
    Sum,
    /// Product across ranks.
    Prod,
    /// Minimum across ranks.
    Min,
    /// Maximum across ranks.
    Max,
}

impl ReduceOp {
    /// Combine two operands.
    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            ReduceOp::Sum => a + b,
            ReduceOp::Prod => a * b,
            ReduceOp::Min => a.min(b),
            ReduceOp::Max => a.max(b),
        }
    }

    /// Fold values in the order given.
    ///
    /// Every rank folds the same rank-ordered sequence, so floating-point
    /// results are bit-identical across the group.
    pub(crate) fn fold(self, values: &[f64]) -> Option<f64> {
        let (&first, rest) = values.split_first()?;
        Some(rest.iter().fold(first, |acc, &v| self.apply(acc, v)))
    }
}

impl std::fmt::Display for ReduceOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReduceOp::Sum => f.write_str("sum"),
            ReduceOp::Prod => f.write_str("prod"),
            ReduceOp::Min => f.write_str("min"),
            ReduceOp::Max => f.write_str("max"),
        }
    }
}
