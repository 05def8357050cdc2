//! Greedy multi-point relay selection (spec §4.6), run once per domain for the flooding MPR set
//! and once per routing metric for the routing MPR set — the same algorithm either way, over
//! whichever per-domain metric the caller passes in.

use std::collections::BTreeSet;

use manet_common::PeerId;

use crate::ib::{
    InformationBase,
    LinkStatus,
};

/// One candidate relay: its id, willingness, and the per-domain metric used for tie-breaking.
#[derive(Clone, Copy, Debug)]
pub struct Candidate {
    pub id: PeerId,
    pub willingness: u8,
    pub metric: u8,
}

/// Runs the greedy MPR selection of spec §4.6 against an explicit candidate/coverage view, so the
/// same routine serves both the flooding domain and every routing-metric domain without the
/// caller threading an `InformationBase` through it.
///
/// `covers(candidate, two_hop)` must answer "did `candidate` advertise `two_hop` with SYMMETRIC
/// status in this domain".
pub fn select<F>(candidates: &[Candidate], two_hop_peers: &[PeerId], covers: F) -> BTreeSet<PeerId>
where
    F: Fn(PeerId, PeerId) -> bool,
{
    let mut selected = BTreeSet::new();
    let mut uncovered: BTreeSet<PeerId> = two_hop_peers.iter().copied().collect();

    // Step 2: force-include willingness-7 ("ALWAYS") neighbors and drop what they already cover.
    for candidate in candidates.iter().filter(|candidate| candidate.willingness == 7) {
        selected.insert(candidate.id);
        uncovered.retain(|peer| !covers(candidate.id, *peer));
    }

    // Step 3: greedily cover the rest.
    while !uncovered.is_empty() {
        let best = candidates
            .iter()
            .filter(|candidate| !selected.contains(&candidate.id))
            .map(|candidate| {
                let coverage = uncovered.iter().filter(|peer| covers(candidate.id, **peer)).count();
                (candidate, coverage)
            })
            .filter(|(_, coverage)| *coverage > 0)
            .max_by(|(a, a_coverage), (b, b_coverage)| {
                a_coverage
                    .cmp(b_coverage)
                    .then(a.willingness.cmp(&b.willingness))
                    .then(b.metric.cmp(&a.metric)) // lower metric wins, so reverse the comparison
                    .then(b.id.cmp(&a.id)) // lower id wins, so reverse the comparison
            });

        let Some((winner, _)) = best else {
            // No remaining candidate covers anything: the rest of `two_hop_peers` is unreachable
            // through any one-hop neighbor in this domain.
            break;
        };

        selected.insert(winner.id);
        uncovered.retain(|peer| !covers(winner.id, *peer));
    }

    selected
}

/// Convenience wrapper over [`select`] that reads candidates and coverage straight out of an
/// [`InformationBase`] for one domain.
pub fn select_from_ib(ib: &InformationBase, domain: usize) -> BTreeSet<PeerId> {
    let candidates: Vec<Candidate> = ib
        .neighbor_ids()
        .iter()
        .filter_map(|&id| {
            let entry = ib.entry(id)?.as_neighbor()?;
            let per_domain = entry.domains.get(domain)?;
            Some(Candidate {
                id,
                willingness: entry.willingness,
                metric: per_domain.metric,
            })
        })
        .collect();

    let two_hop_peers: Vec<PeerId> = ib.two_hop_ids().to_vec();

    select(&candidates, &two_hop_peers, |candidate, two_hop| {
        ib.entry(candidate)
            .and_then(|entry| entry.as_neighbor())
            .is_some_and(|neighbor| {
                neighbor
                    .link_info
                    .iter()
                    .any(|link| link.peer == two_hop && link.status == LinkStatus::Symmetric)
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u8) -> PeerId {
        PeerId::new(raw).unwrap()
    }

    #[test]
    fn selects_both_neighbors_when_each_is_necessary() {
        // spec §8 scenario S5.
        let a = Candidate { id: id(1), willingness: 3, metric: 1 };
        let b = Candidate { id: id(2), willingness: 3, metric: 1 };
        let candidates = [a, b];
        let two_hop = [id(3), id(4), id(5)]; // C, D, E

        let covers = |candidate: PeerId, two_hop: PeerId| match (candidate.get(), two_hop.get()) {
            (1, 3) | (1, 5) => true, // A covers C, E
            (2, 4) | (2, 5) => true, // B covers D, E
            _ => false,
        };

        let selected = select(&candidates, &two_hop, covers);
        assert_eq!(selected, BTreeSet::from([id(1), id(2)]));
    }

    #[test]
    fn willingness_seven_is_always_selected_even_without_coverage() {
        let always = Candidate { id: id(9), willingness: 7, metric: 1 };
        let selected = select(&[always], &[], |_, _| false);
        assert!(selected.contains(&id(9)));
    }

    #[test]
    fn ties_broken_by_lower_metric_then_lower_id() {
        let a = Candidate { id: id(1), willingness: 3, metric: 5 };
        let b = Candidate { id: id(2), willingness: 3, metric: 1 };
        let two_hop = [id(10)];
        let covers = |_: PeerId, _: PeerId| true;

        let selected = select(&[a, b], &two_hop, covers);
        assert_eq!(selected, BTreeSet::from([id(2)]));
    }
}
