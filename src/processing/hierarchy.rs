//! Containment tree reconstruction.
//!
//! Turns the flat, address-ordered result of a range query into nested
//! [`ContainmentNode`]s. Stored blocks are CIDR blocks, so any two of them
//! are either disjoint or nested; a candidate that overlaps a sibling is
//! therefore inside it.

use crate::error::IpamResult;
use crate::models::{ContainmentNode, Ipv4};
use crate::store::{NetworkStore, StoreState};

/// Convert a wire depth to a level budget; any negative value means unlimited.
pub fn depth_limit(depth: i64) -> Option<usize> {
    usize::try_from(depth).ok()
}

/// Build the containment tree below `block`, at most `depth` levels deep.
///
/// `None` means unlimited. The root is marked unregistered when `block`
/// itself is not stored; its stored descendants are still returned.
pub fn build_tree(state: &StoreState, block: Ipv4, depth: Option<usize>) -> ContainmentNode {
    let mut candidates = state
        .query_containing(
            block.mask,
            block.network_address(),
            block.broadcast_address(),
        )
        .into_iter()
        .peekable();

    let registered = candidates.next_if(|n| n.cidr == block).is_some();
    let mut root = ContainmentNode::new(block, registered);
    if depth == Some(0) {
        return root;
    }

    let budget = depth.map(|d| d - 1);
    for candidate in candidates {
        insert_node(&mut root.children, candidate.cidr, budget);
    }
    root
}

/// Place `cidr` under the sibling it overlaps, or append it as a new sibling.
///
/// `budget` is the number of further levels allowed below `siblings`.
fn insert_node(siblings: &mut Vec<ContainmentNode>, cidr: Ipv4, budget: Option<usize>) {
    match siblings.iter_mut().find(|s| s.cidr.overlaps(&cidr)) {
        Some(parent) => match budget {
            Some(0) => {}
            _ => insert_node(&mut parent.children, cidr, budget.map(|b| b - 1)),
        },
        None => siblings.push(ContainmentNode::new(cidr, true)),
    }
}

/// [`build_tree`] against a store handle.
pub fn get_tree(store: &NetworkStore, block: Ipv4, depth: Option<usize>) -> IpamResult<ContainmentNode> {
    store.read(|state| build_tree(state, block, depth))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn net(s: &str) -> Ipv4 {
        Ipv4::parse_network(s).unwrap()
    }

    fn state_with(blocks: &[&str]) -> StoreState {
        let mut state = StoreState::default();
        for b in blocks {
            state.register(net(b));
        }
        state
    }

    fn cidrs(nodes: &[ContainmentNode]) -> Vec<String> {
        nodes.iter().map(|n| n.cidr.to_string()).collect()
    }

    #[test]
    fn test_depth_limit() {
        assert_eq!(depth_limit(-1), None);
        assert_eq!(depth_limit(-7), None);
        assert_eq!(depth_limit(0), Some(0));
        assert_eq!(depth_limit(3), Some(3));
    }

    #[test]
    fn test_registered_root_with_child() {
        let state = state_with(&["127.0.0.0/8", "127.0.0.0/16"]);
        let tree = build_tree(&state, net("127.0.0.0/8"), None);
        assert!(tree.registered);
        assert_eq!(cidrs(&tree.children), vec!["127.0.0.0/16"]);
        assert!(tree.children[0].registered);
    }

    #[test]
    fn test_depth_zero_has_no_children() {
        let state = state_with(&["127.0.0.0/8", "127.0.0.0/16"]);
        let tree = build_tree(&state, net("127.0.0.0/8"), Some(0));
        assert!(tree.registered);
        assert!(tree.children.is_empty());
    }

    #[test]
    fn test_depth_one_has_no_grandchildren() {
        let state = state_with(&["127.0.0.0/8", "127.0.0.0/16", "127.0.0.0/24", "127.0.0.0/28"]);
        let tree = build_tree(&state, net("127.0.0.0/8"), Some(1));
        assert_eq!(cidrs(&tree.children), vec!["127.0.0.0/16"]);
        assert!(tree.children[0].children.is_empty());

        let tree = build_tree(&state, net("127.0.0.0/8"), Some(2));
        assert_eq!(tree.depth(), 2);
        let tree = build_tree(&state, net("127.0.0.0/8"), None);
        assert_eq!(tree.depth(), 3);
    }

    #[test]
    fn test_unregistered_root() {
        let state = state_with(&["127.0.0.0/8", "127.0.0.0/16"]);
        let tree = build_tree(&state, net("0.0.0.0/0"), None);
        assert!(!tree.registered);
        assert_eq!(cidrs(&tree.children), vec!["127.0.0.0/8"]);
        assert_eq!(cidrs(&tree.children[0].children), vec!["127.0.0.0/16"]);

        let tree = build_tree(&state, net("128.0.0.0/8"), None);
        assert!(!tree.registered);
        assert!(tree.children.is_empty());
    }

    #[test]
    fn test_siblings_in_address_order() {
        let state = state_with(&[
            "10.0.0.0/8",
            "10.3.0.0/16",
            "10.1.0.0/16",
            "10.1.4.0/24",
            "10.1.2.0/24",
            "10.0.0.0/12",
            "10.0.5.0/24",
        ]);
        let tree = build_tree(&state, net("10.0.0.0/8"), None);
        // 10.1.0.0/16 and 10.3.0.0/16 sit inside 10.0.0.0/12
        assert_eq!(cidrs(&tree.children), vec!["10.0.0.0/12"]);
        let twelve = &tree.children[0];
        assert_eq!(
            cidrs(&twelve.children),
            vec!["10.0.5.0/24", "10.1.0.0/16", "10.3.0.0/16"]
        );
        assert_eq!(
            cidrs(&twelve.children[1].children),
            vec!["10.1.2.0/24", "10.1.4.0/24"]
        );
    }

    #[test]
    fn test_every_descendant_exactly_once() {
        let blocks = [
            "172.16.0.0/12",
            "172.16.0.0/16",
            "172.16.0.0/24",
            "172.16.1.0/24",
            "172.17.0.0/16",
            "172.18.0.0/15",
            "172.18.128.0/17",
            "172.31.255.0/24",
            "172.32.0.0/16",
            "10.0.0.0/8",
        ];
        let state = state_with(&blocks);
        let tree = build_tree(&state, net("172.16.0.0/12"), None);
        let mut seen: Vec<String> = tree.flatten().iter().map(|c| c.to_string()).collect();
        seen.sort();
        let mut expected: Vec<String> = blocks[..8].iter().map(|s| s.to_string()).collect();
        expected.sort();
        assert_eq!(seen, expected);

        for limit in 0..4 {
            let tree = build_tree(&state, net("172.16.0.0/12"), Some(limit));
            assert!(tree.depth() <= limit);
        }
    }

    #[test]
    fn test_get_tree_from_store() {
        let store = NetworkStore::in_memory();
        store.register(net("192.168.0.0/16")).unwrap();
        store.register(net("192.168.0.0/17")).unwrap();
        store.register(net("192.168.0.0/18")).unwrap();
        store.register(net("192.168.0.0/19")).unwrap();
        let tree = get_tree(&store, net("192.168.0.0/14"), Some(2)).unwrap();
        assert!(!tree.registered);
        assert_eq!(tree.depth(), 2);
        assert_eq!(cidrs(&tree.children), vec!["192.168.0.0/16"]);
    }
}
