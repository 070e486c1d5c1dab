use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Three-way partition of two lists, each side sorted ascending.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub mutual: Vec<String>,
    pub only_in_a: Vec<String>,
    pub only_in_b: Vec<String>,
}

/// Partition `a` and `b` into items in both, only in `a` and only in `b`.
///
/// Inputs are treated as sets and compared by exact string equality, so
/// duplicates and input order never affect the result.
pub fn compare<A, B>(a: &[A], b: &[B]) -> ComparisonResult
where
    A: AsRef<str>,
    B: AsRef<str>,
{
    let left: BTreeSet<&str> = a.iter().map(AsRef::as_ref).collect();
    let right: BTreeSet<&str> = b.iter().map(AsRef::as_ref).collect();

    ComparisonResult {
        mutual: left.intersection(&right).map(|s| s.to_string()).collect(),
        only_in_a: left.difference(&right).map(|s| s.to_string()).collect(),
        only_in_b: right.difference(&left).map(|s| s.to_string()).collect(),
    }
}
