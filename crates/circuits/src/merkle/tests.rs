use ark_r1cs_std::{alloc::AllocVar, fields::fp::FpVar};
use ark_relations::r1cs::ConstraintSystem;

use super::*;
use crate::field::FieldElement;
use crate::poseidon::{hash2, PoseidonSuite};

fn leaves(n: u64) -> Vec<FieldElement> {
    (0..n).map(|i| FieldElement::from(1000 + i * 7)).collect()
}

#[test]
fn test_empty_root_is_zero_chain() {
    let tree = AllowlistTree::new(DEFAULT_DEPTH).unwrap();
    let zeros = zero_hashes(DEFAULT_DEPTH).unwrap();

    assert_eq!(tree.root(), zeros[DEFAULT_DEPTH]);
    assert_eq!(zeros[0], ZERO_ELEMENT);
    assert_eq!(zeros[1], hash2(ZERO_ELEMENT, ZERO_ELEMENT).unwrap());
}

#[test]
fn test_single_leaf_root_folds_zero_subtrees() {
    let depth = DEFAULT_DEPTH;
    let leaf = FieldElement::from(42u64);
    let mut tree = AllowlistTree::new(depth).unwrap();

    assert_eq!(tree.insert(leaf).unwrap(), 0);

    let zeros = zero_hashes(depth).unwrap();
    let mut expected = leaf;
    for zero in zeros.iter().take(depth) {
        expected = hash2(expected, *zero).unwrap();
    }
    assert_eq!(tree.root(), expected);
}

#[test]
fn test_insert_returns_sequential_indices() {
    let mut tree = AllowlistTree::new(8).unwrap();
    for (i, leaf) in leaves(10).into_iter().enumerate() {
        assert_eq!(tree.insert(leaf).unwrap(), i);
    }
    assert_eq!(tree.len(), 10);
}

#[test]
fn test_every_path_validates() {
    let mut tree = AllowlistTree::new(6).unwrap();
    for leaf in leaves(13) {
        tree.insert(leaf).unwrap();

        // Every earlier leaf still authenticates against the new root.
        for index in 0..tree.len() {
            let path = tree.path(index).unwrap();
            assert_eq!(path.depth(), 6);
            assert_eq!(path.leaf_index(), Some(index as u64));
            assert!(path.verify(tree.leaf(index).unwrap(), tree.root()).unwrap());
        }
    }
}

#[test]
fn test_path_rejects_wrong_leaf() {
    let mut tree = AllowlistTree::new(4).unwrap();
    for leaf in leaves(5) {
        tree.insert(leaf).unwrap();
    }
    let path = tree.path(2).unwrap();
    assert!(!path.verify(FieldElement::from(1u64), tree.root()).unwrap());
}

#[test]
fn test_snapshot_rebuild_reproduces_roots_and_paths() {
    let snapshot = leaves(37);
    let mut incremental = AllowlistTree::new(DEFAULT_DEPTH).unwrap();
    let mut prefix_roots = Vec::new();
    for leaf in &snapshot {
        incremental.insert(*leaf).unwrap();
        prefix_roots.push(incremental.root());
    }

    let rebuilt = AllowlistTree::from_leaves(DEFAULT_DEPTH, &snapshot).unwrap();
    assert_eq!(rebuilt.root(), incremental.root());
    for index in 0..snapshot.len() {
        assert_eq!(rebuilt.path(index).unwrap(), incremental.path(index).unwrap());
    }

    // Any prefix of the snapshot reproduces the root recorded at that point.
    for (n, root) in prefix_roots.iter().enumerate() {
        let prefix = AllowlistTree::from_leaves(DEFAULT_DEPTH, &snapshot[..=n]).unwrap();
        assert_eq!(prefix.root(), *root);
    }
}

#[test]
fn test_capacity_boundary() {
    let mut tree = AllowlistTree::new(3).unwrap();
    assert_eq!(tree.capacity(), 8);

    for leaf in leaves(8) {
        tree.insert(leaf).unwrap();
    }
    let full_root = tree.root();

    let err = tree.insert(FieldElement::from(9u64)).unwrap_err();
    assert!(matches!(
        err,
        MerkleError::CapacityExceeded { depth: 3, capacity: 8 }
    ));
    assert_eq!(tree.len(), 8);
    assert_eq!(tree.root(), full_root);

    assert!(matches!(
        AllowlistTree::from_leaves(3, &leaves(9)),
        Err(MerkleError::CapacityExceeded { .. })
    ));
}

#[test]
fn test_path_index_out_of_range() {
    let mut tree = AllowlistTree::new(4).unwrap();
    assert!(matches!(
        tree.path(0),
        Err(MerkleError::IndexOutOfRange { index: 0, size: 0 })
    ));

    tree.insert(FieldElement::from(1u64)).unwrap();
    assert!(tree.path(0).is_ok());
    assert!(matches!(
        tree.path(1),
        Err(MerkleError::IndexOutOfRange { index: 1, size: 1 })
    ));
}

#[test]
fn test_invalid_depth() {
    assert!(matches!(AllowlistTree::new(0), Err(MerkleError::InvalidDepth(0))));
    assert!(matches!(
        AllowlistTree::new(MAX_DEPTH + 1),
        Err(MerkleError::InvalidDepth(_))
    ));
}

#[test]
fn test_path_from_indices() {
    let siblings = vec![FieldElement::from(1u64), FieldElement::from(2u64)];
    let path = MerklePath::from_indices(siblings.clone(), &[1, 0]).unwrap();
    assert_eq!(path.indices(), vec![1, 0]);
    assert_eq!(path.leaf_index(), Some(1));

    assert!(matches!(
        MerklePath::from_indices(siblings.clone(), &[2, 0]),
        Err(MerkleError::MalformedPath(_))
    ));
    assert!(matches!(
        MerklePath::from_indices(siblings, &[0]),
        Err(MerkleError::MalformedPath(_))
    ));
}

#[test]
fn test_leaf_index_overflow_is_none() {
    let siblings = vec![FieldElement::from(0u64); 65];
    let mut bits = vec![0u8; 65];
    assert_eq!(
        MerklePath::from_indices(siblings.clone(), &bits).unwrap().leaf_index(),
        Some(0)
    );

    bits[63] = 1;
    assert_eq!(
        MerklePath::from_indices(siblings.clone(), &bits).unwrap().leaf_index(),
        Some(1 << 63)
    );

    bits[64] = 1;
    assert_eq!(MerklePath::from_indices(siblings, &bits).unwrap().leaf_index(), None);
}

#[test]
fn test_membership_gadget() {
    let depth = 5;
    let suite = PoseidonSuite::new().unwrap();
    let mut tree = AllowlistTree::new(depth).unwrap();
    for leaf in leaves(11) {
        tree.insert(leaf).unwrap();
    }
    let index = 6;
    let path = tree.path(index).unwrap();

    let cs = ConstraintSystem::<FieldElement>::new_ref();
    let root_var = FpVar::new_input(cs.clone(), || Ok(tree.root())).unwrap();
    let leaf_var = FpVar::new_witness(cs.clone(), || Ok(tree.leaf(index).unwrap())).unwrap();
    let path_var = MerklePathVar::new_witness(cs.clone(), Some(&path), depth).unwrap();

    verify_membership(&suite.leaf_gadget(), &root_var, &leaf_var, &path_var).unwrap();

    assert!(cs.is_satisfied().unwrap());
    println!("Membership constraints (depth {}): {}", depth, cs.num_constraints());
}

#[test]
fn test_membership_gadget_wrong_leaf() {
    let depth = 5;
    let suite = PoseidonSuite::new().unwrap();
    let mut tree = AllowlistTree::new(depth).unwrap();
    for leaf in leaves(4) {
        tree.insert(leaf).unwrap();
    }
    let path = tree.path(1).unwrap();

    let cs = ConstraintSystem::<FieldElement>::new_ref();
    let root_var = FpVar::new_input(cs.clone(), || Ok(tree.root())).unwrap();
    // Leaf 2 presented with the path of leaf 1
    let leaf_var = FpVar::new_witness(cs.clone(), || Ok(tree.leaf(2).unwrap())).unwrap();
    let path_var = MerklePathVar::new_witness(cs.clone(), Some(&path), depth).unwrap();

    verify_membership(&suite.leaf_gadget(), &root_var, &leaf_var, &path_var).unwrap();

    assert!(!cs.is_satisfied().unwrap());
}
