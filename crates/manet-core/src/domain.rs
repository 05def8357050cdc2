//! Multiplexes independent (metric, MPR-algorithm) pairs over one HELLO/TC signalling channel
//! (spec §4.9): up to `max_domains` domains identified by an 8-bit TLV extension value, one of
//! them designated the flooding domain.
//!
//! Flooding MPR status is computed exactly once, from the flooding domain's coverage view, and
//! written to `NeighborEntry::flooding_mpr_status`. Routing MPR status is computed once per
//! domain and written to that domain's `PerDomainLink::routing_mpr_status`. Both runs share the
//! same [`mpr::select`] algorithm; only the coverage view and the output field differ.

use manet_common::PeerId;

use crate::error::CoreError;
use crate::ib::InformationBase;
use crate::mpr;

/// One configured domain: the TLV extension value that tags it on the wire, and whether it is
/// this node's flooding domain.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DomainConfig {
    pub ext: u8,
    pub flooding: bool,
}

/// Owns the domain list and knows how to drive MPR recomputation across all of them.
pub struct DomainManager {
    domains: Vec<DomainConfig>,
    flooding_domain: usize,
}

impl DomainManager {
    /// `exts` lists the TLV extension value for each domain, in domain-index order. Exactly one
    /// domain, `flooding_domain`, is marked as the flooding domain.
    pub fn new(exts: Vec<u8>, flooding_domain: usize) -> Result<Self, CoreError> {
        if flooding_domain >= exts.len() {
            return Err(CoreError::UnknownDomain(flooding_domain as u8));
        }
        let domains = exts
            .iter()
            .enumerate()
            .map(|(index, &ext)| DomainConfig { ext, flooding: index == flooding_domain })
            .collect();
        Ok(Self { domains, flooding_domain })
    }

    pub fn domain_count(&self) -> usize {
        self.domains.len()
    }

    pub fn flooding_domain(&self) -> usize {
        self.flooding_domain
    }

    pub fn ext_of(&self, domain: usize) -> Option<u8> {
        self.domains.get(domain).map(|config| config.ext)
    }

    pub fn domain_of_ext(&self, ext: u8) -> Option<usize> {
        self.domains.iter().position(|config| config.ext == ext)
    }

    /// Recomputes every domain's routing MPR set plus the single flooding MPR set, writing
    /// results back into `ib`. Call after the information base settles from a HELLO/TC batch,
    /// before the next Dijkstra run (spec §4.9, §4.10).
    pub fn recompute_mprs(&self, ib: &mut InformationBase) {
        for domain in 0..self.domains.len() {
            let selected = mpr::select_from_ib(ib, domain);
            self.write_routing_mpr_status(ib, domain, &selected);
        }

        let flooding_selected = mpr::select_from_ib(ib, self.flooding_domain);
        self.write_flooding_mpr_status(ib, &flooding_selected);
    }

    fn write_routing_mpr_status(
        &self,
        ib: &mut InformationBase,
        domain: usize,
        selected: &std::collections::BTreeSet<PeerId>,
    ) {
        for &id in ib.neighbor_ids().to_vec().iter() {
            let is_selected = selected.contains(&id);
            if let Some(neighbor) = ib.entry_mut(id).and_then(|entry| entry.as_neighbor_mut()) {
                if let Some(per_domain) = neighbor.domains.get_mut(domain) {
                    per_domain.routing_mpr_status = per_domain.routing_mpr_status.with_to(is_selected);
                }
            }
        }
    }

    fn write_flooding_mpr_status(&self, ib: &mut InformationBase, selected: &std::collections::BTreeSet<PeerId>) {
        for &id in ib.neighbor_ids().to_vec().iter() {
            let is_selected = selected.contains(&id);
            if let Some(neighbor) = ib.entry_mut(id).and_then(|entry| entry.as_neighbor_mut()) {
                neighbor.flooding_mpr_status = neighbor.flooding_mpr_status.with_to(is_selected);
            }
        }
    }

    /// Records that `selector` (a neighbor) has selected the local node as its MPR for `domain`,
    /// or for flooding when `domain` is `None` (spec §4.5: the MPR-selector bit read out of a
    /// peer's HELLO). Call once per parsed HELLO neighbor-status TLV.
    pub fn record_selector(&self, ib: &mut InformationBase, selector: PeerId, domain: Option<usize>, selects_us: bool) {
        let Some(neighbor) = ib.entry_mut(selector).and_then(|entry| entry.as_neighbor_mut()) else { return };
        match domain {
            Some(domain) => {
                if let Some(per_domain) = neighbor.domains.get_mut(domain) {
                    per_domain.routing_mpr_status = per_domain.routing_mpr_status.with_from(selects_us);
                }
            }
            None => {
                neighbor.flooding_mpr_status = neighbor.flooding_mpr_status.with_from(selects_us);
            }
        }
    }
}
