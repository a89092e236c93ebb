//! Gap finding and best-fit allocation inside a parent block.
//!
//! Identifies unused, alignment-correct address ranges between the direct
//! children of a parent and claims the smallest one that still fits.

use super::hierarchy::build_tree;
use crate::error::{IpamError, IpamResult};
use crate::models::{block_size, next_aligned_start, ContainmentNode, Ipv4, Network, MAX_LENGTH};
use crate::store::StoreState;
use itertools::Itertools;

/// A free range under a parent, starting on a legal boundary for the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gap {
    /// First address of the range.
    pub start: u64,
    /// Number of addresses up to the next child (or the parent's end).
    pub length: u64,
}

/// All gaps under `parent` large enough for a `/prefix_len` block, in address order.
///
/// `children` are the direct children of `parent`, sorted by address.
pub fn find_gaps(parent: Ipv4, children: &[ContainmentNode], prefix_len: u8) -> Vec<Gap> {
    let required = block_size(prefix_len);
    let parent_end = parent.broadcast_address() + 1;

    let (first, last) = match (children.first(), children.last()) {
        (Some(first), Some(last)) => (first.cidr, last.cidr),
        _ => {
            return vec![Gap {
                start: parent.network_address(),
                length: parent.size(),
            }]
            .into_iter()
            .filter(|g| g.length >= required)
            .collect()
        }
    };

    let mut gaps = Vec::with_capacity(children.len() + 1);
    gaps.push(Gap {
        start: parent.network_address(),
        length: first.network_address() - parent.network_address(),
    });
    for (c1, c2) in children.iter().tuple_windows() {
        let start = next_aligned_start(c1.cidr, prefix_len);
        gaps.push(Gap {
            start,
            length: c2.cidr.network_address().saturating_sub(start),
        });
    }
    let start = next_aligned_start(last, prefix_len);
    gaps.push(Gap {
        start,
        length: parent_end.saturating_sub(start),
    });

    gaps.retain(|g| g.length >= required);
    gaps
}

/// Smallest gap; on equal length the first one (lowest address) wins.
pub fn best_fit(gaps: &[Gap]) -> Option<Gap> {
    let mut best: Option<Gap> = None;
    for gap in gaps {
        match best {
            Some(b) if gap.length >= b.length => {}
            _ => best = Some(*gap),
        }
    }
    best
}

/// Allocate and register a free `/prefix_len` block directly under `parent`.
///
/// Must run inside one store transaction so the gap read and the insert
/// cannot interleave with another claim.
pub fn claim(state: &mut StoreState, parent: Ipv4, prefix_len: u8) -> IpamResult<Network> {
    if prefix_len > MAX_LENGTH {
        return Err(IpamError::InvalidRequest(format!(
            "prefix length /{prefix_len} is too long"
        )));
    }
    if prefix_len < parent.mask {
        return Err(IpamError::InvalidRequest(format!(
            "a /{prefix_len} does not fit into {parent}"
        )));
    }

    let tree = build_tree(state, parent, Some(1));
    if tree.children.is_empty() {
        // nothing below the parent: take its first block, reusing it if already stored
        let block = Ipv4::from_u64(parent.network_address(), prefix_len)?;
        let (network, created) = state.register(block);
        log::info!("Claimed {block} in empty {parent} (new={created})");
        return Ok(network);
    }

    let no_gap = || IpamError::NoMatchingGapAvailable {
        parent: parent.to_string(),
        prefix_len,
    };

    let gaps = find_gaps(parent, &tree.children, prefix_len);
    log::debug!(
        "claim /{prefix_len} in {parent}: {} children, {} usable gaps",
        tree.children.len(),
        gaps.len()
    );
    let gap = best_fit(&gaps).ok_or_else(no_gap)?;

    let block = Ipv4::from_u64(gap.start, prefix_len)?;
    let network = state.insert_new(block)?;
    log::info!("Claimed {block} in {parent} (gap of {} addresses)", gap.length);
    Ok(network)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContainmentNode;

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

    fn children(blocks: &[&str]) -> Vec<ContainmentNode> {
        blocks
            .iter()
            .map(|b| ContainmentNode::new(net(b), true))
            .collect()
    }

    fn addr(s: &str) -> u64 {
        net(s).network_address()
    }

    #[test]
    fn test_find_gaps_empty_parent() {
        let gaps = find_gaps(net("10.0.0.0/8"), &[], 16);
        assert_eq!(
            gaps,
            vec![Gap {
                start: addr("10.0.0.0/8"),
                length: 1 << 24
            }]
        );
    }

    #[test]
    fn test_find_gaps_leading_interior_trailing() {
        let gaps = find_gaps(
            net("127.0.0.0/8"),
            &children(&["127.1.0.0/16", "127.3.0.0/16"]),
            16,
        );
        assert_eq!(
            gaps,
            vec![
                Gap {
                    start: addr("127.0.0.0/16"),
                    length: 1 << 16
                },
                Gap {
                    start: addr("127.2.0.0/16"),
                    length: 1 << 16
                },
                Gap {
                    start: addr("127.4.0.0/16"),
                    length: (1 << 24) - (4 << 16)
                },
            ]
        );
    }

    #[test]
    fn test_find_gaps_alignment_skips_enclosing_supernet() {
        let gaps = find_gaps(net("1.0.0.0/8"), &children(&["1.2.3.0/24"]), 9);
        assert_eq!(
            gaps,
            vec![Gap {
                start: addr("1.128.0.0/9"),
                length: 1 << 23
            }]
        );
    }

    #[test]
    fn test_find_gaps_end_of_address_space() {
        let gaps = find_gaps(net("255.255.255.0/24"), &children(&["255.255.255.128/25"]), 25);
        assert_eq!(
            gaps,
            vec![Gap {
                start: addr("255.255.255.0/25"),
                length: 128
            }]
        );
    }

    #[test]
    fn test_best_fit_prefers_smallest_then_lowest() {
        let gaps = [
            Gap { start: 0, length: 64 },
            Gap { start: 100, length: 16 },
            Gap { start: 200, length: 32 },
            Gap { start: 300, length: 16 },
        ];
        assert_eq!(best_fit(&gaps), Some(Gap { start: 100, length: 16 }));
        assert_eq!(best_fit(&[]), None);
    }

    #[test]
    fn test_claim_empty_parent() {
        let mut state = state_with(&["127.0.0.0/8"]);
        let claimed = claim(&mut state, net("127.0.0.0/8"), 16).unwrap();
        assert_eq!(claimed.cidr, net("127.0.0.0/16"));
        assert!(state.get(&net("127.0.0.0/16")).is_some());
    }

    #[test]
    fn test_claim_only_gap() {
        let mut state = state_with(&["127.0.0.0/8", "127.0.0.0/16", "127.2.0.0/16"]);
        let claimed = claim(&mut state, net("127.0.0.0/8"), 16).unwrap();
        assert_eq!(claimed.cidr, net("127.1.0.0/16"));
    }

    #[test]
    fn test_claim_first_gap() {
        let mut state = state_with(&["127.0.0.0/8", "127.1.0.0/16", "127.2.0.0/16"]);
        let claimed = claim(&mut state, net("127.0.0.0/8"), 16).unwrap();
        assert_eq!(claimed.cidr, net("127.0.0.0/16"));
    }

    #[test]
    fn test_claim_last_gap() {
        let mut state = state_with(&["127.0.0.0/8", "127.0.0.0/16", "127.1.0.0/16"]);
        let claimed = claim(&mut state, net("127.0.0.0/8"), 16).unwrap();
        assert_eq!(claimed.cidr, net("127.2.0.0/16"));
    }

    #[test]
    fn test_claim_only_last_gap_remaining() {
        let mut state = state_with(&[
            "127.0.0.0/16",
            "127.0.0.0/18",
            "127.0.64.0/18",
            "127.0.128.0/18",
        ]);
        let claimed = claim(&mut state, net("127.0.0.0/16"), 18).unwrap();
        assert_eq!(claimed.cidr, net("127.0.192.0/18"));
    }

    #[test]
    fn test_claim_last_gap_with_offset() {
        let mut state = state_with(&["1.0.0.0/8", "1.2.3.0/24"]);
        let claimed = claim(&mut state, net("1.0.0.0/8"), 9).unwrap();
        assert_eq!(claimed.cidr, net("1.128.0.0/9"));
    }

    #[test]
    fn test_claim_best_fit_over_first_fit() {
        // leading gap is a /25, the gap after 10.0.0.192/26 is a /27
        let mut state = state_with(&["10.0.0.0/24", "10.0.0.128/26", "10.0.0.224/27"]);
        let claimed = claim(&mut state, net("10.0.0.0/24"), 27).unwrap();
        assert_eq!(claimed.cidr, net("10.0.0.192/27"));
    }

    #[test]
    fn test_claim_tie_goes_to_lower_address() {
        let mut state = state_with(&["10.0.0.0/24", "10.0.0.64/26", "10.0.0.192/26"]);
        let claimed = claim(&mut state, net("10.0.0.0/24"), 26).unwrap();
        assert_eq!(claimed.cidr, net("10.0.0.0/26"));
    }

    #[test]
    fn test_claim_no_matching_gap() {
        let mut state = state_with(&["127.0.0.0/9", "127.128.0.0/9"]);
        assert!(matches!(
            claim(&mut state, net("127.0.0.0/8"), 16),
            Err(IpamError::NoMatchingGapAvailable { prefix_len: 16, .. })
        ));
    }

    #[test]
    fn test_claim_no_matching_gap_at_start() {
        let mut state = state_with(&["1.0.0.0/8", "1.2.3.0/24", "1.128.0.0/9"]);
        assert!(matches!(
            claim(&mut state, net("1.0.0.0/8"), 9),
            Err(IpamError::NoMatchingGapAvailable { .. })
        ));
    }

    #[test]
    fn test_claim_bigger_than_parent() {
        let mut state = state_with(&["127.0.0.0/16"]);
        assert!(matches!(
            claim(&mut state, net("127.0.0.0/16"), 8),
            Err(IpamError::InvalidRequest(_))
        ));
        assert!(matches!(
            claim(&mut state, net("127.0.0.0/16"), 33),
            Err(IpamError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_claim_whole_parent() {
        let mut state = state_with(&["10.0.0.0/8"]);
        let claimed = claim(&mut state, net("10.0.0.0/8"), 8).unwrap();
        assert_eq!(claimed.cidr, net("10.0.0.0/8"));
        assert_eq!(claimed.id, state.get(&net("10.0.0.0/8")).unwrap().id);
        assert_eq!(state.len(), 1);

        let claimed = claim(&mut state, net("11.0.0.0/8"), 8).unwrap();
        assert_eq!(claimed.cidr, net("11.0.0.0/8"));
        assert_eq!(state.len(), 2);
    }

    #[test]
    fn test_claim_in_empty_parent_starts_at_network_address() {
        let mut state = state_with(&["10.0.0.0/8"]);
        let claimed = claim(&mut state, net("10.0.0.0/8"), 16).unwrap();
        assert_eq!(claimed.cidr, net("10.0.0.0/16"));
        assert!(state.get(&net("10.0.0.0/16")).is_some());
    }

    #[test]
    fn test_claimed_block_is_within_parent_and_free() {
        let mut state = state_with(&[
            "10.0.0.0/16",
            "10.0.0.0/24",
            "10.0.3.0/24",
            "10.0.4.0/22",
            "10.0.64.0/18",
        ]);
        let before = build_tree(&state, net("10.0.0.0/16"), Some(1)).children;
        for prefix_len in [24, 23, 22, 20, 18, 28] {
            let claimed = claim(&mut state, net("10.0.0.0/16"), prefix_len).unwrap();
            assert_eq!(claimed.cidr.mask, prefix_len);
            assert!(net("10.0.0.0/16").contains(&claimed.cidr));
            assert!(before.iter().all(|c| !c.cidr.overlaps(&claimed.cidr)));
        }
    }
}
