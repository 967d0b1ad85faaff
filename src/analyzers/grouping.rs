//! Explicit grouping keys over record indices.
//!
//! A [`Groups`] maps each key to the indices of the records (or students)
//! that carry it, with keys kept in order of first appearance. Aggregations
//! read from these index lists instead of threading accumulators through a
//! single pass.

use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct Groups<'a> {
    order: Vec<&'a str>,
    members: HashMap<&'a str, Vec<usize>>,
}

impl<'a> Groups<'a> {
    /// Groups `indices` by the key `key(index)` returns.
    pub fn build<I, F>(indices: I, key: F) -> Self
    where
        I: IntoIterator<Item = usize>,
        F: Fn(usize) -> &'a str,
    {
        let mut groups = Groups::default();
        for index in indices {
            groups.insert(key(index), index);
        }
        groups
    }

    pub fn insert(&mut self, key: &'a str, index: usize) {
        self.slot(key).push(index);
    }

    /// Registers `key` with no members, fixing its position in the order.
    pub fn insert_key(&mut self, key: &'a str) {
        self.slot(key);
    }

    fn slot(&mut self, key: &'a str) -> &mut Vec<usize> {
        self.members.entry(key).or_insert_with(|| {
            self.order.push(key);
            Vec::new()
        })
    }

    /// Keys with their member indices, in order of first appearance.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &[usize])> + '_ {
        self.order
            .iter()
            .map(|&key| (key, self.members.get(key).map_or(&[][..], Vec::as_slice)))
    }

    pub fn get(&self, key: &str) -> &[usize] {
        self.members.get(key).map_or(&[][..], Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groups_keep_first_appearance_order() {
        let keys = ["b", "a", "b", "c", "a"];
        let groups = Groups::build(0..keys.len(), |i| keys[i]);

        let collected: Vec<_> = groups.iter().collect();
        assert_eq!(
            collected,
            vec![("b", &[0usize, 2][..]), ("a", &[1usize, 4][..]), ("c", &[3usize][..])]
        );
        assert_eq!(groups.len(), 3);
    }

    #[test]
    fn test_registered_key_without_members() {
        let mut groups = Groups::default();
        groups.insert_key("empty");
        groups.insert("full", 0);
        groups.insert_key("full");

        let collected: Vec<_> = groups.iter().collect();
        assert_eq!(collected, vec![("empty", &[][..]), ("full", &[0usize][..])]);
    }

    #[test]
    fn test_missing_key_is_empty() {
        let groups = Groups::build(std::iter::empty(), |_| "");
        assert!(groups.is_empty());
        assert!(groups.get("x").is_empty());
    }
}
