use super::*;

use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

//-----------------------------------------------------------------------------

fn insert_choices(tree: &mut JunctionTree, choices: &[u8]) -> NodeId {
    let result = tree.insert(choices);
    assert!(result.is_ok(), "Failed to insert {}: {}", String::from_utf8_lossy(choices), result.unwrap_err());
    result.unwrap()
}

// Builds the tree with links A, TCG, and TGGCG.
//
// Node identifiers: T=1, G=2, G=3, C=4, G=5 (TGGCG), C=6, G=7 (TCG), A=8.
fn example_tree() -> JunctionTree {
    let mut tree = JunctionTree::new();
    insert_choices(&mut tree, b"TGGCG");
    insert_choices(&mut tree, b"TCG");
    insert_choices(&mut tree, b"A");
    tree
}

fn random_choices(rng: &mut StdRng, max_len: usize) -> Vec<u8> {
    let len = rng.gen_range(1..=max_len);
    (0..len).map(|_| SYMBOLS[rng.gen_range(0..4)]).collect()
}

// Checks that counts do not increase along any path.
fn check_monotonic(tree: &JunctionTree) {
    for node in tree.preorder() {
        if let Some(parent) = tree.parent(node) {
            if parent != JunctionTree::ROOT {
                assert!(tree.count(node) <= tree.count(parent), "Node {} has a higher count than its parent", node);
            }
        }
    }
}

//-----------------------------------------------------------------------------

#[test]
fn empty_tree() {
    let tree = JunctionTree::new();
    assert_eq!(tree.len(), 1, "Empty tree should only have the root");
    assert!(tree.is_empty(), "Empty tree is not empty");
    assert_eq!(tree.link_count(), 0, "Empty tree has links");
    assert_eq!(tree.get_all_links(None).count(), 0, "The root was reported as a link");
    assert!(tree.is_leaf(JunctionTree::ROOT), "The root of an empty tree is not a leaf");
    assert_eq!(tree.parent(JunctionTree::ROOT), None, "The root has a parent");
    assert_eq!(tree.parent_edge(JunctionTree::ROOT), None, "The root has a parent edge");
}

#[test]
fn insert_and_counts() {
    let mut tree = JunctionTree::new();
    let first = insert_choices(&mut tree, b"TCG");
    let second = insert_choices(&mut tree, b"TCG");
    assert_eq!(first, second, "Same choices ended at different nodes");
    assert_eq!(tree.len(), 4, "Wrong number of nodes after repeated insertion");
    assert_eq!(tree.junction_coverages(first), vec![2, 2, 2], "Wrong coverages after repeated insertion");

    let third = insert_choices(&mut tree, b"TGGCG");
    assert_eq!(tree.len(), 8, "Insertion did not share the prefix");
    assert_eq!(tree.junction_choices(third), b"TGGCG".to_vec(), "Wrong choices");
    assert_eq!(tree.junction_coverages(third), vec![3, 1, 1, 1, 1], "Wrong coverages");
    assert_eq!(tree.depth(third), 5, "Wrong depth");
    assert_eq!(tree.parent_edge(third), Some(b'G'), "Wrong parent edge");
    assert_eq!(tree.link_count(), 2, "Wrong number of links");

    let t = tree.child(JunctionTree::ROOT, b'T');
    assert!(t.is_some(), "Missing child T");
    let children: Vec<u8> = tree.children(t.unwrap()).map(|(symbol, _)| symbol).collect();
    assert_eq!(children, b"CG".to_vec(), "Wrong children of T");
    assert!(tree.child(JunctionTree::ROOT, b'A').is_none(), "Found a nonexistent child");
}

#[test]
fn add_edge() {
    let mut tree = JunctionTree::new();
    let first = tree.add_edge(JunctionTree::ROOT, b'c');
    assert!(first.is_ok(), "Failed to add an edge: {}", first.unwrap_err());
    let first = first.unwrap();
    assert_eq!(tree.parent_edge(first), Some(b'C'), "Lowercase choice was not normalized");
    let again = tree.add_edge(JunctionTree::ROOT, b'C').unwrap();
    assert_eq!(again, first, "Repeated edge created a new node");
    assert_eq!(tree.count(first), 2, "Wrong count after two edges");

    assert!(tree.add_edge(JunctionTree::ROOT, b'N').is_err(), "Added an invalid choice");
    assert!(tree.add_edge(100, b'A').is_err(), "Added a child to a nonexistent node");
    assert!(tree.insert(b"AAN").is_err(), "Inserted invalid choices");
}

#[test]
fn traversals() {
    let tree = example_tree();
    let preorder: Vec<NodeId> = tree.preorder().collect();
    assert_eq!(preorder, vec![0, 8, 1, 6, 7, 2, 3, 4, 5], "Wrong preorder");
    let postorder: Vec<NodeId> = tree.postorder().collect();
    assert_eq!(postorder, vec![8, 7, 6, 5, 4, 3, 2, 1, 0], "Wrong postorder");
    let bfs: Vec<NodeId> = tree.bfs().collect();
    assert_eq!(bfs, vec![0, 8, 1, 6, 2, 7, 3, 4, 5], "Wrong BFS order");

    // Each call starts a new traversal.
    assert_eq!(tree.preorder().count(), tree.len(), "Second preorder traversal differs");
}

#[test]
fn links() {
    let tree = example_tree();
    let all: Vec<String> = tree.get_all_links(None).map(|link| link.to_string()).collect();
    assert_eq!(all, vec![String::from("A:1"), String::from("TCG:2,1,1"), String::from("TGGCG:2,1,1,1,1")], "Wrong links");

    let long: Vec<Link> = tree.get_all_links(Some(3)).collect();
    assert_eq!(long.len(), 2, "Wrong number of links of length at least 3");
    assert_eq!(long[0].choices, b"TCG".to_vec(), "Wrong first long link");
    assert_eq!(long[0].leaf, 7, "Wrong leaf for TCG");
    assert_eq!(long[1].len(), 5, "Wrong length for the second long link");

    assert_eq!(tree.get_all_links(Some(6)).count(), 0, "Found links longer than the tree is deep");
    assert_eq!(tree.get_all_links(Some(0)).count(), 3, "Minimum length 0 should report all links");
}

#[test]
fn insert_with_coverage() {
    let tree = example_tree();
    let mut copy = JunctionTree::new();
    for link in tree.get_all_links(None) {
        let result = copy.insert_with_coverage(&link.choices, &link.coverage);
        assert!(result.is_ok(), "Failed to insert link {}: {}", link, result.unwrap_err());
    }
    assert_eq!(copy.link_set(), tree.link_set(), "Copied tree has different links");
    assert!(copy.insert_with_coverage(b"AC", &[1]).is_err(), "Inserted a link with mismatched lengths");
}

//-----------------------------------------------------------------------------

#[test]
fn prune_retains_emptied_nodes() {
    let mut tree = JunctionTree::new();
    insert_choices(&mut tree, b"A");
    insert_choices(&mut tree, b"A");
    insert_choices(&mut tree, b"AC");
    insert_choices(&mut tree, b"G");

    let removed = tree.prune(2);
    assert_eq!(removed, 2, "Wrong number of removed nodes");
    let links: Vec<String> = tree.get_all_links(None).map(|link| link.to_string()).collect();
    assert_eq!(links, vec![String::from("A:3")], "Emptied internal node was not retained as a leaf");

    let removed = tree.prune(4);
    assert_eq!(removed, 1, "Wrong number of removed nodes");
    assert!(tree.is_empty(), "Tree is not empty after pruning everything");
    assert_eq!(tree.len(), 1, "The root was not retained");
}

#[test]
fn random_trees() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for threshold in [1, 2, 3, 5] {
        let mut tree = JunctionTree::new();
        for _ in 0..200 {
            let choices = random_choices(&mut rng, 6);
            insert_choices(&mut tree, &choices);
        }
        check_monotonic(&tree);

        let surviving = tree.preorder().filter(|node| *node != JunctionTree::ROOT && tree.count(*node) >= threshold).count();
        let original = tree.len();
        let removed = tree.prune(threshold);
        assert_eq!(removed, original - tree.len(), "Wrong number of removed nodes with threshold {}", threshold);
        assert_eq!(tree.len(), surviving + 1, "Wrong number of nodes after pruning with threshold {}", threshold);
        check_monotonic(&tree);
        for link in tree.get_all_links(None) {
            assert!(link.coverage.iter().all(|count| *count >= threshold), "Link {} survived pruning with threshold {}", link, threshold);
        }

        // Links reproduce the tree.
        let mut copy = JunctionTree::new();
        for link in tree.get_all_links(None) {
            copy.insert_with_coverage(&link.choices, &link.coverage).unwrap();
        }
        assert_eq!(copy.link_set(), tree.link_set(), "Rebuilt tree has different links with threshold {}", threshold);
        assert_eq!(copy.len(), tree.len(), "Rebuilt tree has a different number of nodes with threshold {}", threshold);
    }
}

//-----------------------------------------------------------------------------
