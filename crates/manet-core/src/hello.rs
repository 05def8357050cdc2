//! HELLO build/parse (spec §4.5): one-hop status exchange driving NEIGHBOR promotion, two-hop
//! discovery, and the flooding/routing MPR-selector bits neighbors report back about us.

use manet_common::LinkAddr;
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
use crate::ib::{
    InformationBase,
    LinkStatus,
    MprStatus,
    NeighborLink,
};
use crate::tlv_types::{
    read_u16,
    MSG_HELLO,
    TLV_INTERVAL_TIME,
    TLV_LINK_METRIC,
    TLV_LINK_STATUS,
    TLV_MPR_STATUS,
    TLV_MPR_WILLING,
    TLV_VALIDITY_TIME,
};

pub struct HelloParams {
    pub validity_time: u16,
    pub interval_time: u16,
    pub willingness: u8,
}

/// Builds this node's periodic HELLO (spec §4.5 "HELLO contents"): one address per current
/// neighbor, carrying that neighbor's link status plus one `LINK_METRIC`/`MPR_STATUS` pair per
/// configured domain (tagged by that domain's TLV extension).
pub fn build(self_addr: LinkAddr, addr_len: u8, seq_num: u16, params: HelloParams, ib: &InformationBase, domains: &DomainManager) -> Message {
    let mut msg_tlvs = TlvBlock::default();
    msg_tlvs.push(Tlv::single(TLV_VALIDITY_TIME, 0, params.validity_time.to_be_bytes().to_vec()));
    msg_tlvs.push(Tlv::single(TLV_INTERVAL_TIME, 0, params.interval_time.to_be_bytes().to_vec()));
    msg_tlvs.push(Tlv::single(TLV_MPR_WILLING, 0, vec![params.willingness]));

    let mut addr_blocks = Vec::new();
    for &id in ib.neighbor_ids() {
        let Some(neighbor) = ib.entry(id).and_then(|entry| entry.as_neighbor()) else { continue };
        let Some(addr) = ib.addr_of(id) else { continue };

        let block = AddrBlock { addresses: vec![addr], prefix_lengths: None };
        let mut addr_tlvs = TlvBlock::default();
        addr_tlvs.push(Tlv::single(TLV_LINK_STATUS, 0, vec![neighbor.link_status.to_wire()]));

        for domain in 0..domains.domain_count() {
            let Some(ext) = domains.ext_of(domain) else { continue };
            let Some(per_domain) = neighbor.domains.get(domain) else { continue };
            addr_tlvs.push(Tlv::single(TLV_LINK_METRIC, ext, vec![per_domain.metric]));
            addr_tlvs.push(Tlv::single(
                TLV_MPR_STATUS,
                ext,
                vec![neighbor.flooding_mpr_status.to_wire(), per_domain.routing_mpr_status.to_wire()],
            ));
        }
        addr_blocks.push((block, addr_tlvs));
    }

    Message {
        msg_type: MSG_HELLO,
        addr_len,
        originator: Some(self_addr),
        hop_limit: None,
        hop_count: None,
        seq_num: Some(seq_num),
        msg_tlvs,
        addr_blocks,
    }
}

/// Applies a received HELLO (spec §4.5 "HELLO receive" steps 1-6). Silently no-ops on a stale or
/// malformed message rather than erroring — a neighbor's bad packet shouldn't disrupt ours.
pub fn receive(
    ib: &mut InformationBase,
    domains: &DomainManager,
    dup: &mut DuplicateSet,
    self_addr: LinkAddr,
    message: &Message,
    now: u64,
) -> Result<(), CoreError> {
    let Some(originator) = message.originator else { return Ok(()) };
    if originator == self_addr {
        return Ok(());
    }
    let seq_num = message.seq_num.unwrap_or(0);

    let (id, _created) = ib.get_or_create_id(originator)?;

    let validity_time = read_u16(&message.msg_tlvs, TLV_VALIDITY_TIME).unwrap_or(0) as u64;
    let key = DuplicateKey { originator: id, msg_type: MSG_HELLO };
    if !dup.classify(key, seq_num, now, validity_time).is_fresh() {
        return Ok(());
    }

    let willingness = message.msg_tlvs.get_value(TLV_MPR_WILLING, 0).and_then(|bytes| bytes.first().copied()).unwrap_or(0);
    let valid_until = now + validity_time;

    let mut neighbor = ib.promote_to_neighbor(id, domains.domain_count(), now, willingness);
    neighbor.willingness = willingness;
    neighbor.valid_until_tick = valid_until;
    neighbor.last_seen_tick = now;
    neighbor.last_seq_num = seq_num;

    let mut found_self = false;
    for (addr_block, addr_tlvs) in &message.addr_blocks {
        for addr in &addr_block.addresses {
            if *addr == self_addr {
                found_self = true;
                apply_self_entry(&mut neighbor, domains, addr_tlvs);
                continue;
            }

            let their_status = addr_tlvs.get_value(TLV_LINK_STATUS, 0).and_then(|bytes| bytes.first().copied()).map(LinkStatus::from_wire);
            if their_status != Some(LinkStatus::Symmetric) {
                continue;
            }

            let (two_hop_id, _) = ib.get_or_create_id(*addr)?;
            let metric = domains
                .ext_of(0)
                .and_then(|ext| addr_tlvs.get_value(TLV_LINK_METRIC, ext))
                .and_then(|bytes| bytes.first().copied())
                .unwrap_or(0);
            neighbor.link_info.push(NeighborLink { peer: two_hop_id, status: LinkStatus::Symmetric, metric });
            ib.refresh_two_hop(two_hop_id, vec![NeighborLink { peer: id, status: LinkStatus::Symmetric, metric }], valid_until);
        }
    }

    if !found_self && neighbor.link_status == LinkStatus::Pending {
        neighbor.link_status = LinkStatus::Heard;
    }

    ib.set_entry(crate::ib::PeerEntry::Neighbor(neighbor));
    Ok(())
}

/// Step 4's self-address branch: mark the link symmetric (unless the sender itself reports it
/// lost, spec §3 invariant 5) and record their MPR-selector bits for us.
fn apply_self_entry(neighbor: &mut crate::ib::NeighborEntry, domains: &DomainManager, addr_tlvs: &TlvBlock) {
    let their_status = addr_tlvs.get_value(TLV_LINK_STATUS, 0).and_then(|bytes| bytes.first().copied()).map(LinkStatus::from_wire);
    neighbor.link_status = if their_status == Some(LinkStatus::Lost) { LinkStatus::Heard } else { LinkStatus::Symmetric };

    for domain in 0..domains.domain_count() {
        let Some(ext) = domains.ext_of(domain) else { continue };
        let Some(status_bytes) = addr_tlvs.get_value(TLV_MPR_STATUS, ext) else { continue };
        let selects_flooding = status_bytes.first().is_some_and(|byte| MprStatus::from_wire(*byte).is_selected());
        let selects_routing = status_bytes.get(1).is_some_and(|byte| MprStatus::from_wire(*byte).is_selected());

        if domains.flooding_domain() == domain {
            neighbor.flooding_mpr_status = neighbor.flooding_mpr_status.with_from(selects_flooding);
        }
        if let Some(per_domain) = neighbor.domains.get_mut(domain) {
            per_domain.routing_mpr_status = per_domain.routing_mpr_status.with_from(selects_routing);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ib::PeerEntry;

    fn addrs() -> (LinkAddr, LinkAddr, LinkAddr) {
        (LinkAddr::from_mac([0, 0, 0, 0, 0, 1]), LinkAddr::from_mac([0, 0, 0, 0, 0, 2]), LinkAddr::from_mac([0, 0, 0, 0, 0, 3]))
    }

    #[test]
    fn receiving_hello_listing_self_marks_link_symmetric() {
        let (self_addr, peer_addr, _) = addrs();
        let domains = DomainManager::new(vec![0], 0).unwrap();
        let mut ib = InformationBase::new(16);
        let mut dup = DuplicateSet::new(32);

        let params = HelloParams { validity_time: 10, interval_time: 2, willingness: 3 };
        let mut built = build(peer_addr, 6, 1, params, &InformationBase::new(16), &domains);
        // Simulate peer_addr's HELLO listing self_addr as a symmetric neighbor.
        let block = AddrBlock { addresses: vec![self_addr], prefix_lengths: None };
        let mut addr_tlvs = TlvBlock::default();
        addr_tlvs.push(Tlv::single(TLV_LINK_STATUS, 0, vec![LinkStatus::Symmetric.to_wire()]));
        addr_tlvs.push(Tlv::single(TLV_LINK_METRIC, 0, vec![2]));
        addr_tlvs.push(Tlv::single(TLV_MPR_STATUS, 0, vec![MprStatus::None.to_wire(), MprStatus::To.to_wire()]));
        built.addr_blocks.push((block, addr_tlvs));

        receive(&mut ib, &domains, &mut dup, self_addr, &built, 0).unwrap();

        let id = ib.id_of(peer_addr).unwrap();
        let PeerEntry::Neighbor(neighbor) = ib.entry(id).unwrap() else { panic!("expected neighbor") };
        assert_eq!(neighbor.link_status, LinkStatus::Symmetric);
        assert!(neighbor.domains[0].routing_mpr_status.is_selector());
    }

    #[test]
    fn stale_seqno_is_dropped_without_mutating_state() {
        let (self_addr, peer_addr, _) = addrs();
        let domains = DomainManager::new(vec![0], 0).unwrap();
        let mut ib = InformationBase::new(16);
        let mut dup = DuplicateSet::new(32);

        let params = HelloParams { validity_time: 10, interval_time: 2, willingness: 3 };
        let fresh = build(peer_addr, 6, 5, params, &InformationBase::new(16), &domains);
        receive(&mut ib, &domains, &mut dup, self_addr, &fresh, 0).unwrap();

        let stale_params = HelloParams { validity_time: 10, interval_time: 2, willingness: 7 };
        let stale = build(peer_addr, 6, 1, stale_params, &InformationBase::new(16), &domains);
        receive(&mut ib, &domains, &mut dup, self_addr, &stale, 0).unwrap();

        let id = ib.id_of(peer_addr).unwrap();
        let PeerEntry::Neighbor(neighbor) = ib.entry(id).unwrap() else { panic!("expected neighbor") };
        assert_eq!(neighbor.willingness, 3); // not overwritten by the stale willingness=7
    }

    #[test]
    fn two_hop_peer_is_recorded_from_address_block() {
        let (self_addr, peer_addr, two_hop_addr) = addrs();
        let domains = DomainManager::new(vec![0], 0).unwrap();
        let mut ib = InformationBase::new(16);
        let mut dup = DuplicateSet::new(32);

        let params = HelloParams { validity_time: 10, interval_time: 2, willingness: 3 };
        let mut built = build(peer_addr, 6, 1, params, &InformationBase::new(16), &domains);
        let block = AddrBlock { addresses: vec![two_hop_addr], prefix_lengths: None };
        let mut addr_tlvs = TlvBlock::default();
        addr_tlvs.push(Tlv::single(TLV_LINK_STATUS, 0, vec![LinkStatus::Symmetric.to_wire()]));
        addr_tlvs.push(Tlv::single(TLV_LINK_METRIC, 0, vec![3]));
        built.addr_blocks.push((block, addr_tlvs));

        receive(&mut ib, &domains, &mut dup, self_addr, &built, 0).unwrap();

        let id = ib.id_of(peer_addr).unwrap();
        let PeerEntry::Neighbor(neighbor) = ib.entry(id).unwrap() else { panic!("expected neighbor") };
        let two_hop_id = ib.id_of(two_hop_addr).unwrap();
        assert!(neighbor.link_info.iter().any(|link| link.peer == two_hop_id && link.metric == 3));

        assert!(ib.two_hop_ids().contains(&two_hop_id));
        let PeerEntry::TwoHop(two_hop) = ib.entry(two_hop_id).unwrap() else { panic!("expected a two-hop entry") };
        assert!(two_hop.link_info.iter().any(|link| link.peer == id));
    }
}
