//! Single-source shortest path over the composite topology graph (spec §4.7), run on demand (one
//! domain at a time) every `ROUTING_INTERVAL` ticks.

use std::collections::HashMap;

use manet_common::PeerId;

use crate::ib::{
    InformationBase,
    NeighborLink,
    RoutingInfo,
    METRIC_SENTINEL,
};

/// Recomputes `routing_info` for every live entry in one domain. Neighbors always finish as their
/// own next hop; two-hop and remote entries get `next_hop`/`hop_count`/`path_metric` from the
/// shortest path found, or stay at the unreachable sentinel if none exists.
///
/// Mirrors the reference's `routing_metric_list` sentinel scheme directly: `0` means "self/null"
/// (never assigned here, since self has no table entry), `-1` means finalized, a positive value
/// is the current best tentative distance, and anything `>= METRIC_SENTINEL` is treated as
/// unreachable and never selected as the next vertex to relax from.
pub fn run(ib: &mut InformationBase, domain: usize) {
    let ids: Vec<PeerId> = ib.live_ids().collect();
    let mut dist: HashMap<PeerId, i64> = HashMap::with_capacity(ids.len());

    for &id in &ids {
        let initial = ib
            .entry(id)
            .and_then(|entry| entry.as_neighbor())
            .and_then(|neighbor| neighbor.domains.get(domain))
            .map(|per_domain| per_domain.metric as i64)
            .unwrap_or(METRIC_SENTINEL as i64);
        dist.insert(id, initial);

        if let Some(entry) = ib.entry_mut(id) {
            *entry.routing_info_mut() = match entry.as_neighbor() {
                Some(_) => RoutingInfo {
                    next_hop: Some(id),
                    hop_count: 1,
                    path_metric: initial.min(METRIC_SENTINEL as i64) as u8,
                },
                None => RoutingInfo::default(),
            };
        }
    }

    loop {
        let next = dist
            .iter()
            .filter(|(_, &d)| d > 0 && d < METRIC_SENTINEL as i64)
            .min_by_key(|(id, &d)| (d, id.get()))
            .map(|(&id, &d)| (id, d));

        let Some((u, dist_u)) = next else { break };
        dist.insert(u, -1);

        let Some(entry_u) = ib.entry(u) else { continue };
        let next_hop_u = entry_u.routing_info().next_hop;
        let hop_count_u = entry_u.routing_info().hop_count;
        let links: Vec<NeighborLink> = entry_u.link_info().to_vec();

        for link in links {
            let v = link.peer;
            let Some(&dist_v) = dist.get(&v) else { continue }; // 0 = self/null, or not in this domain's id set
            if dist_v <= 0 {
                continue; // already finalized, or self
            }

            let candidate = dist_u + link.metric as i64;
            if candidate < dist_v {
                dist.insert(v, candidate);
                if let Some(entry_v) = ib.entry_mut(v) {
                    *entry_v.routing_info_mut() = RoutingInfo {
                        next_hop: next_hop_u,
                        hop_count: hop_count_u.saturating_add(1),
                        path_metric: candidate.min(METRIC_SENTINEL as i64) as u8,
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ib::{
        LinkStatus,
        NeighborEntry,
        PeerEntry,
    };

    fn id(raw: u8) -> PeerId {
        PeerId::new(raw).unwrap()
    }

    fn neighbor(peer: PeerId, metric: u8, link_info: Vec<NeighborLink>) -> PeerEntry {
        PeerEntry::Neighbor(NeighborEntry {
            peer,
            link_status: LinkStatus::Symmetric,
            willingness: 3,
            domains: alloc_like_vec(metric),
            last_seen_tick: 0,
            valid_until_tick: 100,
            last_seq_num: 0,
            link_info,
            routing_info: RoutingInfo::default(),
        })
    }

    fn alloc_like_vec(metric: u8) -> Vec<crate::ib::PerDomainLink> {
        vec![crate::ib::PerDomainLink { metric, ..Default::default() }]
    }

    #[test]
    fn shortest_path_prefers_cheaper_two_hop_route() {
        // spec §8 scenario S6: self -A(1)-> , self -B(4)->, A -C(2)->, B -C(1)->.
        // Expect C: path_metric=3, next_hop=A, hop_num=2.
        let a = id(1);
        let b = id(2);
        let c = id(3);

        let mut ib = InformationBase::new(16);
        ib.set_entry(neighbor(a, 1, vec![NeighborLink { peer: c, status: LinkStatus::Symmetric, metric: 2 }]));
        ib.set_entry(neighbor(b, 4, vec![NeighborLink { peer: c, status: LinkStatus::Symmetric, metric: 1 }]));
        ib.set_entry(PeerEntry::TwoHop(crate::ib::TwoHopEntry {
            peer: c,
            link_info: Vec::new(),
            valid_until_tick: 100,
            routing_info: RoutingInfo::default(),
        }));

        run(&mut ib, 0);

        let routing_c = *ib.entry(c).unwrap().routing_info();
        assert_eq!(routing_c.path_metric, 3);
        assert_eq!(routing_c.next_hop, Some(a));
        assert_eq!(routing_c.hop_count, 2);
    }

    #[test]
    fn unreachable_entry_keeps_sentinel() {
        let mut ib = InformationBase::new(16);
        ib.set_entry(PeerEntry::TwoHop(crate::ib::TwoHopEntry {
            peer: id(9),
            link_info: Vec::new(),
            valid_until_tick: 100,
            routing_info: RoutingInfo::default(),
        }));

        run(&mut ib, 0);

        let routing = *ib.entry(id(9)).unwrap().routing_info();
        assert_eq!(routing.path_metric, METRIC_SENTINEL);
        assert_eq!(routing.next_hop, None);
    }
}
