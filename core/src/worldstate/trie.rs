//! Authenticated commitment over a [`Cache`]'s dirty-free contents: a
//! sorted-leaves Merkle tree keyed by the same byte key the cache uses.
//!
//! The corpus has no Merkle-Patricia-trie crate to reach for (checked the
//! retrieval pack), so this builds the commitment from the same
//! `Hash::combine` primitive the teacher already used for header merkle
//! roots, applied over every live key in sorted order. Membership proofs
//! aren't exposed because nothing in scope consumes them yet.

use crate::primitives::Hash;

/// Root commitment of a set of `(key_bytes, value_hash)` pairs. Two states
/// with the same live entries always commit to the same root, independent
/// of insertion order, since entries are sorted before folding.
pub fn root_hash(mut entries: Vec<(Vec<u8>, Hash)>) -> Hash {
    if entries.is_empty() {
        return Hash::ZERO;
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    let mut level: Vec<Hash> = entries.into_iter().map(|(k, v)| Hash::combine(&Hash::keccak(&k), &v)).collect();
    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        for pair in level.chunks(2) {
            let combined = match pair {
                [a, b] => Hash::combine(a, b),
                [a] => Hash::combine(a, a),
                _ => unreachable!("chunks(2) yields at most 2 elements"),
            };
            next.push(combined);
        }
        level = next;
    }
    level[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_set_commits_to_zero() {
        assert_eq!(root_hash(vec![]), Hash::ZERO);
    }

    #[test]
    fn root_is_order_independent() {
        let a = (b"a".to_vec(), Hash::blake2b(b"va"));
        let b = (b"b".to_vec(), Hash::blake2b(b"vb"));
        let r1 = root_hash(vec![a.clone(), b.clone()]);
        let r2 = root_hash(vec![b, a]);
        assert_eq!(r1, r2);
    }

    #[test]
    fn changing_a_value_changes_the_root() {
        let entries_a = vec![(b"a".to_vec(), Hash::blake2b(b"va"))];
        let entries_b = vec![(b"a".to_vec(), Hash::blake2b(b"changed"))];
        assert_ne!(root_hash(entries_a), root_hash(entries_b));
    }

    #[test]
    fn odd_leaf_count_duplicates_last_leaf() {
        let entries = vec![
            (b"a".to_vec(), Hash::blake2b(b"1")),
            (b"b".to_vec(), Hash::blake2b(b"2")),
            (b"c".to_vec(), Hash::blake2b(b"3")),
        ];
        assert_ne!(root_hash(entries), Hash::ZERO);
    }
}
