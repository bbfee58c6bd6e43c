use super::*;

use proptest::prelude::*;
use std::cmp::Ordering as CmpOrdering;
use std::collections::BTreeMap;

fn rank_precedes(a: (&[u8], f64), b: (&[u8], f64)) -> bool {
    match a.1.total_cmp(&b.1) {
        CmpOrdering::Less => true,
        CmpOrdering::Greater => false,
        CmpOrdering::Equal => a.0 <= b.0,
    }
}

/// Walk one subtree, asserting parent links and both stored augmentations.
/// Returns (height, size).
fn check_subtree(set: &RankedSet, node: NodeRef, parent: NodeRef) -> (u32, u32) {
    if node.is_null() {
        return (0, 0);
    }
    let link = *set.records.tree_link(node);
    assert_eq!(link.parent, parent, "parent link mismatch");

    let (lh, ls) = check_subtree(set, link.left, node);
    let (rh, rs) = check_subtree(set, link.right, node);
    assert!(lh.abs_diff(rh) <= 1, "AVL imbalance: {} vs {}", lh, rh);
    assert_eq!(link.height, 1 + lh.max(rh), "stored height must match children");
    assert_eq!(link.size, 1 + ls + rs, "stored size must match children");

    let rec = &set.records[node];
    if !link.left.is_null() {
        let left = &set.records[link.left];
        assert!(
            rank_precedes((left.key(), left.score()), (rec.key(), rec.score())),
            "left child out of order"
        );
    }
    if !link.right.is_null() {
        let right = &set.records[link.right];
        assert!(
            rank_precedes((rec.key(), rec.score()), (right.key(), right.score())),
            "right child out of order"
        );
    }
    (link.height, link.size)
}

fn inorder(set: &RankedSet) -> Vec<(Vec<u8>, f64)> {
    let mut out = Vec::with_capacity(set.len());
    for rank in 0..set.len() {
        let (key, score) = set.nth(rank).expect("rank within len must resolve");
        out.push((key.to_vec(), score));
    }
    out
}

fn validate(set: &RankedSet) {
    assert_eq!(set.index.len(), set.records.len(), "hash index lost a record");

    let mut visited = 0usize;
    set.index.for_each(&set.records, |_| {
        visited += 1;
        true
    });
    assert_eq!(visited, set.records.len(), "traversal must reach every record");

    let (_, total) = check_subtree(set, set.root, NodeRef::NULL);
    assert_eq!(total as usize, set.records.len(), "tree lost a record");
    assert_eq!(set.nth(set.len()), None);
}

#[derive(Clone, Debug)]
enum Op {
    Insert(Vec<u8>, f64),
    Remove(Vec<u8>),
    Score(Vec<u8>),
    Nth(usize),
}

fn key_strategy() -> impl Strategy<Value = Vec<u8>> + Clone {
    // A tiny alphabet keeps keys colliding, so updates, chain removals, and
    // equal-score ordering all get exercised.
    prop::collection::vec(0u8..=3, 0..=4)
}

fn score_strategy() -> impl Strategy<Value = f64> + Clone {
    (0u8..8).prop_map(f64::from)
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    let key = key_strategy();
    let op = prop_oneof![
        50 => (key.clone(), score_strategy()).prop_map(|(k, s)| Op::Insert(k, s)),
        25 => key.clone().prop_map(Op::Remove),
        15 => key.prop_map(Op::Score),
        10 => (0usize..400).prop_map(Op::Nth),
    ];
    prop::collection::vec(op, 0..=300)
}

proptest! {
    #[test]
    fn ops_match_btreemap_model(ops in ops_strategy()) {
        let mut set = RankedSet::new();
        let mut model: BTreeMap<Vec<u8>, f64> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(key, score) => {
                    let fresh = set.insert(&key, score);
                    prop_assert_eq!(fresh, !model.contains_key(&key));
                    model.insert(key, score);
                }
                Op::Remove(key) => {
                    let removed = set.remove(&key);
                    prop_assert_eq!(removed, model.remove(&key).is_some());
                }
                Op::Score(key) => {
                    prop_assert_eq!(set.score(&key), model.get(&key).copied());
                }
                Op::Nth(rank) => {
                    let hit = set.nth(rank);
                    prop_assert_eq!(hit.is_some(), rank < model.len());
                }
            }
            prop_assert_eq!(set.len(), model.len());
            validate(&set);
        }

        // Final rank order must be the model sorted by (score, key).
        let mut expected: Vec<(Vec<u8>, f64)> =
            model.into_iter().collect();
        expected.sort_by(|a, b| {
            a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0))
        });
        prop_assert_eq!(inorder(&set), expected);
    }

    #[test]
    fn growth_never_loses_keys(count in 1usize..400) {
        let mut set = RankedSet::new();
        for i in 0..count {
            let key = format!("member:{:04}", i);
            set.insert(key.as_bytes(), (i % 16) as f64);
        }
        validate(&set);
        for i in 0..count {
            let key = format!("member:{:04}", i);
            prop_assert_eq!(set.score(key.as_bytes()), Some((i % 16) as f64));
        }
    }

    #[test]
    fn range_matches_model(
        entries in prop::collection::btree_map(key_strategy(), score_strategy(), 0..64),
        bound_score in score_strategy(),
        bound_key in key_strategy(),
        limit in 0usize..16,
    ) {
        let mut set = RankedSet::new();
        for (key, score) in &entries {
            set.insert(key, *score);
        }

        let mut sorted: Vec<(Vec<u8>, f64)> = entries.into_iter().collect();
        sorted.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        let expected: Vec<(Vec<u8>, f64)> = sorted
            .into_iter()
            .filter(|(k, s)| rank_precedes((bound_key.as_slice(), bound_score), (k.as_slice(), *s)))
            .take(limit)
            .collect();

        let got: Vec<(Vec<u8>, f64)> = set
            .range(bound_score, &bound_key, 0, limit)
            .into_iter()
            .map(|(k, s)| (k.to_vec(), s))
            .collect();
        prop_assert_eq!(got, expected);
    }
}
