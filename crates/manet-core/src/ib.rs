//! The information base (spec §4.4, §3): peer table plus one tagged entry per live peer-id.
//!
//! The reference C code stores `void *entry_ptr_list[MAX_PEER]` with a type tag at a fixed byte
//! offset and casts to the matching struct. Re-expressed here as [`PeerEntry`], a tagged sum type
//! indexed by the dense [`PeerId`] the peer table assigns — no pointer, no manual tag byte.

use manet_common::{
    LinkAddr,
    PeerId,
    PeerTable,
};

use crate::error::CoreError;

/// Stand-in for "infinite" path metric (spec §4.7: "others to +∞ (represented by 255 or
/// SENTINEL)").
pub const METRIC_SENTINEL: u8 = 255;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LinkStatus {
    Heard,
    Symmetric,
    Lost,
    Pending,
}

impl LinkStatus {
    /// Wire values per spec §6: `0=LOST, 1=SYMMETRIC, 2=HEARD`. `Pending` never appears on the
    /// wire — it's a local-only state before any link status has been observed — and is given the
    /// next free value so `from_wire` stays a total function.
    pub fn to_wire(self) -> u8 {
        match self {
            LinkStatus::Lost => 0,
            LinkStatus::Symmetric => 1,
            LinkStatus::Heard => 2,
            LinkStatus::Pending => 3,
        }
    }

    pub fn from_wire(value: u8) -> Self {
        match value {
            1 => LinkStatus::Symmetric,
            2 => LinkStatus::Heard,
            3 => LinkStatus::Pending,
            _ => LinkStatus::Lost,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum MprStatus {
    #[default]
    None,
    To,
    From,
    ToFrom,
}

impl MprStatus {
    /// True if the local node selected the neighbor holding this status as an MPR.
    pub fn is_selected(self) -> bool {
        matches!(self, MprStatus::To | MprStatus::ToFrom)
    }

    /// True if the neighbor holding this status selected the local node as its MPR.
    pub fn is_selector(self) -> bool {
        matches!(self, MprStatus::From | MprStatus::ToFrom)
    }

    pub fn with_to(self, to: bool) -> Self {
        Self::combine(to, self.is_selector())
    }

    pub fn with_from(self, from: bool) -> Self {
        Self::combine(self.is_selected(), from)
    }

    fn combine(to: bool, from: bool) -> Self {
        match (to, from) {
            (false, false) => MprStatus::None,
            (true, false) => MprStatus::To,
            (false, true) => MprStatus::From,
            (true, true) => MprStatus::ToFrom,
        }
    }

    pub fn to_wire(self) -> u8 {
        self as u8
    }

    pub fn from_wire(value: u8) -> Self {
        match value {
            1 => MprStatus::To,
            2 => MprStatus::From,
            3 => MprStatus::ToFrom,
            _ => MprStatus::None,
        }
    }
}

/// Per-(domain) MPR/metric state a neighbor carries (spec §4.9: "MPR set, routing set, and
/// neighbor-metric fields in §3 are per-domain"). Flooding MPR status is *not* per-domain: there
/// is exactly one flooding domain (spec §4.9), so it lives directly on [`NeighborEntry`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PerDomainLink {
    pub metric: u8,
    pub routing_mpr_status: MprStatus,
}

/// One edge of the topology graph: this entry's originator advertised `peer` with `status` at
/// `metric` (spec §3 "Topology graph... Edges = (source-peer -> dst-peer, metric)").
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NeighborLink {
    pub peer: PeerId,
    pub status: LinkStatus,
    pub metric: u8,
}

/// Result of the last Dijkstra run for one entry (spec §4.7). Neighbors are their own next hop;
/// two-hop and remote entries get theirs computed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RoutingInfo {
    pub next_hop: Option<PeerId>,
    pub hop_count: u8,
    pub path_metric: u8,
}

impl Default for RoutingInfo {
    fn default() -> Self {
        Self {
            next_hop: None,
            hop_count: 0,
            path_metric: METRIC_SENTINEL,
        }
    }
}

#[derive(Clone, Debug)]
pub struct NeighborEntry {
    pub peer: PeerId,
    pub link_status: LinkStatus,
    pub willingness: u8,
    pub flooding_mpr_status: MprStatus,
    pub domains: Vec<PerDomainLink>,
    pub last_seen_tick: u64,
    pub valid_until_tick: u64,
    pub last_seq_num: u16,
    pub link_info: Vec<NeighborLink>,
    pub routing_info: RoutingInfo,
}

#[derive(Clone, Debug)]
pub struct TwoHopEntry {
    pub peer: PeerId,
    pub link_info: Vec<NeighborLink>,
    pub valid_until_tick: u64,
    pub routing_info: RoutingInfo,
}

#[derive(Clone, Debug)]
pub struct RemoteEntry {
    pub peer: PeerId,
    pub link_info: Vec<NeighborLink>,
    pub valid_until_tick: u64,
    pub last_seq_num: u16,
    pub routing_info: RoutingInfo,
}

#[derive(Clone, Debug)]
pub enum PeerEntry {
    Neighbor(NeighborEntry),
    TwoHop(TwoHopEntry),
    Remote(RemoteEntry),
}

impl PeerEntry {
    pub fn peer(&self) -> PeerId {
        match self {
            PeerEntry::Neighbor(entry) => entry.peer,
            PeerEntry::TwoHop(entry) => entry.peer,
            PeerEntry::Remote(entry) => entry.peer,
        }
    }

    pub fn valid_until(&self) -> u64 {
        match self {
            PeerEntry::Neighbor(entry) => entry.valid_until_tick,
            PeerEntry::TwoHop(entry) => entry.valid_until_tick,
            PeerEntry::Remote(entry) => entry.valid_until_tick,
        }
    }

    pub fn link_info(&self) -> &[NeighborLink] {
        match self {
            PeerEntry::Neighbor(entry) => &entry.link_info,
            PeerEntry::TwoHop(entry) => &entry.link_info,
            PeerEntry::Remote(entry) => &entry.link_info,
        }
    }

    pub fn routing_info(&self) -> &RoutingInfo {
        match self {
            PeerEntry::Neighbor(entry) => &entry.routing_info,
            PeerEntry::TwoHop(entry) => &entry.routing_info,
            PeerEntry::Remote(entry) => &entry.routing_info,
        }
    }

    pub fn routing_info_mut(&mut self) -> &mut RoutingInfo {
        match self {
            PeerEntry::Neighbor(entry) => &mut entry.routing_info,
            PeerEntry::TwoHop(entry) => &mut entry.routing_info,
            PeerEntry::Remote(entry) => &mut entry.routing_info,
        }
    }

    pub fn as_neighbor(&self) -> Option<&NeighborEntry> {
        match self {
            PeerEntry::Neighbor(entry) => Some(entry),
            _ => None,
        }
    }

    pub fn as_neighbor_mut(&mut self) -> Option<&mut NeighborEntry> {
        match self {
            PeerEntry::Neighbor(entry) => Some(entry),
            _ => None,
        }
    }
}

/// Peer table plus one tagged entry per live peer-id (spec §3 invariants 1-4).
pub struct InformationBase {
    peers: PeerTable,
    entries: Vec<Option<PeerEntry>>,
    neighbor_ids: Vec<PeerId>,
    two_hop_ids: Vec<PeerId>,
    remote_ids: Vec<PeerId>,
}

impl InformationBase {
    pub fn new(max_peer: usize) -> Self {
        Self {
            peers: PeerTable::new(max_peer),
            entries: Vec::new(),
            neighbor_ids: Vec::new(),
            two_hop_ids: Vec::new(),
            remote_ids: Vec::new(),
        }
    }

    pub fn get_or_create_id(&mut self, addr: LinkAddr) -> Result<(PeerId, bool), CoreError> {
        let (id, created) = self.peers.get_or_create(addr)?;
        self.ensure_slot(id);
        Ok((id, created))
    }

    pub fn id_of(&self, addr: LinkAddr) -> Option<PeerId> {
        self.peers.get(addr)
    }

    pub fn addr_of(&self, id: PeerId) -> Option<LinkAddr> {
        self.peers.addr_of(id)
    }

    fn ensure_slot(&mut self, id: PeerId) {
        let index = id.get() as usize - 1;
        if self.entries.len() <= index {
            self.entries.resize_with(index + 1, || None);
        }
    }

    pub fn entry(&self, id: PeerId) -> Option<&PeerEntry> {
        self.entries.get(id.get() as usize - 1)?.as_ref()
    }

    pub fn entry_mut(&mut self, id: PeerId) -> Option<&mut PeerEntry> {
        self.entries.get_mut(id.get() as usize - 1)?.as_mut()
    }

    /// Installs (or overwrites) the entry for `entry.peer()`. Drives the tag-transition rules of
    /// spec §4.4: callers decide *what* to install, this just keeps the id-lists in sync.
    pub fn set_entry(&mut self, entry: PeerEntry) {
        self.ensure_slot(entry.peer());
        let index = entry.peer().get() as usize - 1;
        self.entries[index] = Some(entry);
        self.update_id_lists();
    }

    pub fn remove(&mut self, id: PeerId) {
        if let Some(slot) = self.entries.get_mut(id.get() as usize - 1) {
            *slot = None;
        }
        self.update_id_lists();
    }

    /// Frees any entry whose validity has passed (spec §4.4 `check_validity`).
    pub fn check_validity(&mut self, now: u64) {
        let mut changed = false;
        for slot in self.entries.iter_mut() {
            if let Some(entry) = slot {
                if entry.valid_until() < now {
                    log::debug!("peer {} expired at tick {now}", entry.peer());
                    *slot = None;
                    changed = true;
                }
            }
        }
        if changed {
            self.update_id_lists();
        }
    }

    /// Rebuilds the three id-lists by scanning tags (spec §4.4 `update_id_lists`, O(peer_num)).
    pub fn update_id_lists(&mut self) {
        self.neighbor_ids.clear();
        self.two_hop_ids.clear();
        self.remote_ids.clear();
        for (index, slot) in self.entries.iter().enumerate() {
            let Some(entry) = slot else { continue };
            let id = PeerId::new((index + 1) as u8).expect("index + 1 is never zero");
            match entry {
                PeerEntry::Neighbor(_) => self.neighbor_ids.push(id),
                PeerEntry::TwoHop(_) => self.two_hop_ids.push(id),
                PeerEntry::Remote(_) => self.remote_ids.push(id),
            }
        }
    }

    pub fn neighbor_ids(&self) -> &[PeerId] {
        &self.neighbor_ids
    }

    pub fn two_hop_ids(&self) -> &[PeerId] {
        &self.two_hop_ids
    }

    pub fn remote_ids(&self) -> &[PeerId] {
        &self.remote_ids
    }

    pub fn live_ids(&self) -> impl Iterator<Item = PeerId> + '_ {
        self.entries.iter().enumerate().filter_map(|(index, slot)| {
            slot.as_ref().map(|_| PeerId::new((index + 1) as u8).expect("index + 1 is never zero"))
        })
    }

    /// Builds (or returns the existing) neighbor entry for `id`, retaining `valid_until`/seqno
    /// from a prior two-hop or remote entry (spec §4.5 HELLO receive step 1).
    pub fn promote_to_neighbor(&mut self, id: PeerId, domain_count: usize, now: u64, willingness: u8) -> NeighborEntry {
        let index = id.get() as usize - 1;
        match self.entries.get(index).and_then(Option::as_ref) {
            Some(PeerEntry::Neighbor(existing)) => existing.clone(),
            Some(PeerEntry::TwoHop(two_hop)) => NeighborEntry {
                peer: id,
                link_status: LinkStatus::Pending,
                willingness,
                flooding_mpr_status: MprStatus::default(),
                domains: vec![PerDomainLink::default(); domain_count],
                last_seen_tick: now,
                valid_until_tick: two_hop.valid_until_tick,
                last_seq_num: 0,
                link_info: Vec::new(),
                routing_info: RoutingInfo {
                    next_hop: Some(id),
                    hop_count: 1,
                    path_metric: 0,
                },
            },
            Some(PeerEntry::Remote(remote)) => NeighborEntry {
                peer: id,
                link_status: LinkStatus::Pending,
                willingness,
                flooding_mpr_status: MprStatus::default(),
                domains: vec![PerDomainLink::default(); domain_count],
                last_seen_tick: now,
                valid_until_tick: remote.valid_until_tick,
                last_seq_num: remote.last_seq_num,
                link_info: Vec::new(),
                routing_info: RoutingInfo {
                    next_hop: Some(id),
                    hop_count: 1,
                    path_metric: 0,
                },
            },
            None => NeighborEntry {
                peer: id,
                link_status: LinkStatus::Pending,
                willingness,
                flooding_mpr_status: MprStatus::default(),
                domains: vec![PerDomainLink::default(); domain_count],
                last_seen_tick: now,
                valid_until_tick: now,
                last_seq_num: 0,
                link_info: Vec::new(),
                routing_info: RoutingInfo {
                    next_hop: Some(id),
                    hop_count: 1,
                    path_metric: 0,
                },
            },
        }
    }

    /// Creates/refreshes a two-hop entry for `id`, unless `id` already names a direct neighbor —
    /// a NEIGHBOR never downgrades via a third party's HELLO (spec §4.4).
    pub fn refresh_two_hop(&mut self, id: PeerId, link_info: Vec<NeighborLink>, valid_until: u64) {
        let index = id.get() as usize - 1;
        if matches!(self.entries.get(index), Some(Some(PeerEntry::Neighbor(_)))) {
            return;
        }
        self.set_entry(PeerEntry::TwoHop(TwoHopEntry {
            peer: id,
            link_info,
            valid_until_tick: valid_until,
            routing_info: RoutingInfo::default(),
        }));
    }

    /// Creates/refreshes a remote entry for `id`, unless it already names a neighbor or two-hop
    /// peer (TC only supplements topology the node doesn't already know more directly).
    pub fn refresh_remote(&mut self, id: PeerId, link_info: Vec<NeighborLink>, valid_until: u64, seq_num: u16) {
        let index = id.get() as usize - 1;
        if matches!(self.entries.get(index), Some(Some(PeerEntry::Neighbor(_) | PeerEntry::TwoHop(_)))) {
            return;
        }
        self.set_entry(PeerEntry::Remote(RemoteEntry {
            peer: id,
            link_info,
            valid_until_tick: valid_until,
            last_seq_num: seq_num,
            routing_info: RoutingInfo::default(),
        }));
    }
}
