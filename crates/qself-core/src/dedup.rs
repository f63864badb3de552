// Generic sequence helpers shared by the reconcilers

use std::collections::HashSet;
use std::hash::Hash;

/// Reverse a sequence in place.
pub fn reverse<T>(items: &mut [T]) {
    items.reverse();
}

/// Keep the first occurrence of each key, preserving order.
pub fn unique_by_key<T, K, F>(items: Vec<T>, key_of: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::with_capacity(items.len());
    items.into_iter().filter(|item| seen.insert(key_of(item))).collect()
}

/// Keep the elements of `primary` whose key also appears in `reference`,
/// preserving order. Keys are compared by value, so `primary` and
/// `reference` may hold different element types.
pub fn keep_only_present_in<T, R, K, FP, FR>(
    primary: Vec<T>,
    reference: &[R],
    key_of_primary: FP,
    key_of_reference: FR,
) -> Vec<T>
where
    K: Eq + Hash,
    FP: Fn(&T) -> K,
    FR: Fn(&R) -> K,
{
    let present: HashSet<K> = reference.iter().map(key_of_reference).collect();
    primary
        .into_iter()
        .filter(|item| present.contains(&key_of_primary(item)))
        .collect()
}
