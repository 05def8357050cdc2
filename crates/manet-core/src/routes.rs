//! A collaborator trait for installing the routes Dijkstra computes, without bundling any OS
//! backend into this crate — mirrors how `octavius-route` separates `RouteTable` (the shape of
//! "a thing that can report/install routes") from its own platform-specific implementations.

use manet_common::PeerId;

use crate::ib::InformationBase;

/// One resolved route: `destination` is reachable via `next_hop` at `path_metric`, in
/// `hop_count` hops (spec §4.7 outputs).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Route {
    pub destination: PeerId,
    pub next_hop: PeerId,
    pub hop_count: u8,
    pub path_metric: u8,
}

/// Something that can receive the routing set produced by a Dijkstra run. The core never talks
/// to a kernel routing table itself; a host binary implements this against whatever platform API
/// it targets (a Linux `RTNETLINK` socket, an ESP-IDF routing shim, or — in tests — a `Vec`).
pub trait RouteSink {
    type Error;

    fn install(&mut self, routes: &[Route]) -> Result<(), Self::Error>;
}

/// Reads every live two-hop/remote entry's current `routing_info` out of the information base
/// into the flat `Route` list a [`RouteSink`] expects. Entries still at the unreachable sentinel
/// (no `next_hop`) are omitted.
pub fn collect_routes(ib: &InformationBase, destinations: impl IntoIterator<Item = PeerId>) -> Vec<Route> {
    destinations
        .into_iter()
        .filter_map(|destination| {
            let entry = ib.entry(destination)?;
            let routing_info = entry.routing_info();
            let next_hop = routing_info.next_hop?;
            Some(Route {
                destination,
                next_hop,
                hop_count: routing_info.hop_count,
                path_metric: routing_info.path_metric,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ib::{
        PeerEntry,
        RoutingInfo,
        TwoHopEntry,
    };

    struct VecSink(Vec<Route>);

    impl RouteSink for VecSink {
        type Error = core::convert::Infallible;

        fn install(&mut self, routes: &[Route]) -> Result<(), Self::Error> {
            self.0 = routes.to_vec();
            Ok(())
        }
    }

    #[test]
    fn unreachable_entries_are_omitted() {
        let mut ib = InformationBase::new(16);
        let (id, _) = ib.get_or_create_id(manet_common::LinkAddr::from_mac([0, 0, 0, 0, 0, 9])).unwrap();
        ib.set_entry(PeerEntry::TwoHop(TwoHopEntry { peer: id, link_info: Vec::new(), valid_until_tick: 100, routing_info: RoutingInfo::default() }));

        let routes = collect_routes(&ib, [id]);
        assert!(routes.is_empty());

        let mut sink = VecSink(Vec::new());
        sink.install(&routes).unwrap();
        assert!(sink.0.is_empty());
    }
}
