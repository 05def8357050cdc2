//! Topology Control build/parse (spec §4.5 "TC contents"/"TC receive"): advertises this node's
//! routing-MPR selectors so remote peers can build routes to them, and decides whether an
//! incoming TC should be relayed further (the flooding reduction).

use std::collections::BTreeSet;

use manet_common::{
    LinkAddr,
    PeerId,
};
use manet_wire::{
    AddrBlock,
    Message,
    Tlv,
    TlvBlock,
};

use crate::domain::DomainManager;
use crate::duplicate::{
    DuplicateKey,
    DuplicateSet,
};
use crate::error::CoreError;
use crate::hello::HelloParams;
use crate::ib::{
    InformationBase,
    LinkStatus,
    NeighborLink,
    PeerEntry,
};
use crate::tlv_types::{
    read_u16,
    MSG_TC,
    TLV_INTERVAL_TIME,
    TLV_LINK_METRIC,
    TLV_MPR_WILLING,
    TLV_VALIDITY_TIME,
};

/// Whether a received TC should be relayed on, and with which `hop_count` already incremented
/// (spec §4.5 step 4).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TcOutcome {
    Drop,
    Forward { hop_count: u8 },
}

/// Builds a TC covering this node's routing-MPR selectors across every configured domain, or
/// `None` if it isn't a routing MPR of any neighbor (spec §4.5 step 4: only build when needed).
pub fn build(self_addr: LinkAddr, addr_len: u8, seq_num: u16, hop_limit: u8, params: HelloParams, ib: &InformationBase, domains: &DomainManager) -> Option<Message> {
    let selector_ids: BTreeSet<PeerId> = ib
        .neighbor_ids()
        .iter()
        .copied()
        .filter(|&id| {
            ib.entry(id)
                .and_then(|entry| entry.as_neighbor())
                .is_some_and(|neighbor| neighbor.domains.iter().any(|per_domain| per_domain.routing_mpr_status.is_selector()))
        })
        .collect();

    if selector_ids.is_empty() {
        return None;
    }

    let mut msg_tlvs = TlvBlock::default();
    msg_tlvs.push(Tlv::single(TLV_VALIDITY_TIME, 0, params.validity_time.to_be_bytes().to_vec()));
    msg_tlvs.push(Tlv::single(TLV_INTERVAL_TIME, 0, params.interval_time.to_be_bytes().to_vec()));
    msg_tlvs.push(Tlv::single(TLV_MPR_WILLING, 0, vec![params.willingness]));

    let mut addr_blocks = Vec::new();
    for id in selector_ids {
        let (Some(addr), Some(neighbor)) = (ib.addr_of(id), ib.entry(id).and_then(|entry| entry.as_neighbor())) else { continue };

        let block = AddrBlock { addresses: vec![addr], prefix_lengths: None };
        let mut addr_tlvs = TlvBlock::default();
        for domain in 0..domains.domain_count() {
            let Some(ext) = domains.ext_of(domain) else { continue };
            let Some(per_domain) = neighbor.domains.get(domain) else { continue };
            // Data model carries one metric per link, not separate in/out values; both halves of
            // the wire pair repeat it (spec §4.5 "LINK_METRIC carrying both outgoing and incoming
            // metric").
            addr_tlvs.push(Tlv::single(TLV_LINK_METRIC, ext, vec![per_domain.metric, per_domain.metric]));
        }
        addr_blocks.push((block, addr_tlvs));
    }

    Some(Message {
        msg_type: MSG_TC,
        addr_len,
        originator: Some(self_addr),
        hop_limit: Some(hop_limit),
        hop_count: Some(0),
        seq_num: Some(seq_num),
        msg_tlvs,
        addr_blocks,
    })
}

/// Applies a received TC (spec §4.5 "TC receive" steps 1-5). `prev_hop` is the link-layer sender
/// of the frame carrying this message — not necessarily the TC's originator, since a TC may
/// already have been relayed — and is what the flooding-reduction check (step 5) is keyed on.
pub fn receive(
    ib: &mut InformationBase,
    domains: &DomainManager,
    dup: &mut DuplicateSet,
    self_addr: LinkAddr,
    prev_hop: LinkAddr,
    message: &Message,
    now: u64,
) -> Result<TcOutcome, CoreError> {
    let Some(originator) = message.originator else { return Ok(TcOutcome::Drop) };
    if originator == self_addr {
        return Ok(TcOutcome::Drop);
    }

    let seq_num = message.seq_num.unwrap_or(0);
    let (id, _created) = ib.get_or_create_id(originator)?;

    let validity_time = read_u16(&message.msg_tlvs, TLV_VALIDITY_TIME).unwrap_or(0) as u64;
    let key = DuplicateKey { originator: id, msg_type: MSG_TC };
    if !dup.classify(key, seq_num, now, validity_time).is_fresh() {
        return Ok(TcOutcome::Drop);
    }

    let is_direct_neighbor = matches!(ib.entry(id), Some(PeerEntry::Neighbor(_)));
    if !is_direct_neighbor {
        let valid_until = now + validity_time;
        let mut link_info = Vec::new();
        for (addr_block, addr_tlvs) in &message.addr_blocks {
            for addr in &addr_block.addresses {
                let (peer_id, _) = ib.get_or_create_id(*addr)?;
                let metric = domains
                    .ext_of(0)
                    .and_then(|ext| addr_tlvs.get_value(TLV_LINK_METRIC, ext))
                    .and_then(|bytes| bytes.first().copied())
                    .unwrap_or(0);
                link_info.push(NeighborLink { peer: peer_id, status: LinkStatus::Symmetric, metric });
            }
        }
        ib.refresh_remote(id, link_info, valid_until, seq_num);
    }

    let hop_count = message.hop_count.unwrap_or(0).saturating_add(1);
    let hop_limit = message.hop_limit.unwrap_or(0);
    if hop_count >= hop_limit {
        return Ok(TcOutcome::Drop);
    }

    let should_forward = ib
        .id_of(prev_hop)
        .and_then(|id| ib.entry(id))
        .and_then(|entry| entry.as_neighbor())
        .is_some_and(|neighbor| neighbor.flooding_mpr_status.is_selector());

    Ok(if should_forward { TcOutcome::Forward { hop_count } } else { TcOutcome::Drop })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ib::{
        MprStatus,
        NeighborEntry,
        PerDomainLink,
        RoutingInfo,
    };

    fn addr(last: u8) -> LinkAddr {
        LinkAddr::from_mac([0, 0, 0, 0, 0, last])
    }

    #[test]
    fn build_returns_none_when_not_a_routing_mpr() {
        let domains = DomainManager::new(vec![0], 0).unwrap();
        let ib = InformationBase::new(16);
        let params = HelloParams { validity_time: 10, interval_time: 2, willingness: 3 };
        assert!(build(addr(1), 6, 1, 8, params, &ib, &domains).is_none());
    }

    #[test]
    fn build_includes_selectors_with_their_metric() {
        let domains = DomainManager::new(vec![0], 0).unwrap();
        let mut ib = InformationBase::new(16);
        let (neighbor_id, _) = ib.get_or_create_id(addr(1)).unwrap();
        ib.set_entry(PeerEntry::Neighbor(NeighborEntry {
            peer: neighbor_id,
            link_status: LinkStatus::Symmetric,
            willingness: 3,
            flooding_mpr_status: MprStatus::None,
            domains: vec![PerDomainLink { metric: 4, routing_mpr_status: MprStatus::From }],
            last_seen_tick: 0,
            valid_until_tick: 100,
            last_seq_num: 0,
            link_info: Vec::new(),
            routing_info: RoutingInfo::default(),
        }));

        let params = HelloParams { validity_time: 10, interval_time: 2, willingness: 3 };
        let message = build(addr(9), 6, 1, 8, params, &ib, &domains).unwrap();
        assert_eq!(message.addr_blocks.len(), 1);
        let (_, addr_tlvs) = &message.addr_blocks[0];
        assert_eq!(addr_tlvs.get_value(TLV_LINK_METRIC, 0), Some([4u8, 4u8].as_slice()));
    }

    #[test]
    fn forward_decision_follows_flooding_selector_status_of_previous_hop() {
        let domains = DomainManager::new(vec![0], 0).unwrap();
        let mut ib = InformationBase::new(16);
        let mut dup = DuplicateSet::new(32);
        let self_addr = addr(255);
        let relay_addr = addr(1);

        ib.set_entry(PeerEntry::Neighbor(NeighborEntry {
            peer: ib.get_or_create_id(relay_addr).unwrap().0,
            link_status: LinkStatus::Symmetric,
            willingness: 3,
            flooding_mpr_status: MprStatus::From,
            domains: vec![PerDomainLink::default()],
            last_seen_tick: 0,
            valid_until_tick: 100,
            last_seq_num: 0,
            link_info: Vec::new(),
            routing_info: RoutingInfo::default(),
        }));

        let message = Message {
            msg_type: MSG_TC,
            addr_len: 6,
            originator: Some(addr(2)),
            hop_limit: Some(8),
            hop_count: Some(0),
            seq_num: Some(1),
            msg_tlvs: {
                let mut block = TlvBlock::default();
                block.push(Tlv::single(TLV_VALIDITY_TIME, 0, 10u16.to_be_bytes().to_vec()));
                block
            },
            addr_blocks: Vec::new(),
        };

        let outcome = receive(&mut ib, &domains, &mut dup, self_addr, relay_addr, &message, 0).unwrap();
        assert_eq!(outcome, TcOutcome::Forward { hop_count: 1 });
    }
}
