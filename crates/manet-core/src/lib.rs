// Copyright 2025 The Manet Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The MANET routing core: information base, MPR selection, Dijkstra, duplicate suppression, and
//! the domain manager, wired together behind two driver-facing entry points (spec §4.10).

pub mod config;
pub mod dijkstra;
pub mod domain;
pub mod duplicate;
pub mod error;
pub mod hello;
pub mod ib;
pub mod mpr;
pub mod routes;
pub mod tc;
mod tlv_types;

use manet_common::LinkAddr;
use manet_link::{
    Reassembler,
    Segmenter,
};
use manet_wire::{
    Message,
    MessageSchema,
    Packet,
};

pub use config::NodeConfig;
pub use domain::DomainManager;
pub use duplicate::DuplicateSet;
pub use error::CoreError;
pub use hello::HelloParams;
pub use ib::InformationBase;
pub use routes::{
    Route,
    RouteSink,
};
pub use tc::TcOutcome;
pub use tlv_types::{
    MSG_HELLO,
    MSG_TC,
};

/// A fully assembled node: information base, domain manager, duplicate suppression, and the frame
/// layer, advanced by the two driver entry points of spec §4.10.
pub struct RoutingNode {
    self_addr: LinkAddr,
    config: NodeConfig,
    ib: InformationBase,
    domains: DomainManager,
    dup: DuplicateSet,
    segmenter: Segmenter,
    reassembler: Reassembler,
    hello_seq: u16,
    tc_seq: u16,
}

impl RoutingNode {
    /// `domain_exts` lists the TLV extension value for each configured domain, in domain-index
    /// order; `config.flooding_domain` names which of them floods.
    pub fn new(self_addr: LinkAddr, config: NodeConfig, domain_exts: Vec<u8>) -> Result<Self, CoreError> {
        let domains = DomainManager::new(domain_exts, config.flooding_domain as usize)?;
        Ok(Self {
            self_addr,
            ib: InformationBase::new(config.max_peer),
            dup: DuplicateSet::new(config.duplicate_window),
            segmenter: Segmenter::new(),
            reassembler: Reassembler::new(config.packet_max),
            hello_seq: 0,
            tc_seq: 0,
            domains,
            config,
        })
    }

    pub fn information_base(&self) -> &InformationBase {
        &self.ib
    }

    /// Feeds one received frame through the frame layer, then the message codec, then the
    /// HELLO/TC handlers (spec §4.10 `on_packet`). Returns the frames (already segmented and
    /// encoded) that should be sent back out as a result — empty when there's nothing to do.
    pub fn on_packet(&mut self, sender: LinkAddr, bytes: &[u8], now: u64) -> Result<Vec<Vec<u8>>, CoreError> {
        let Some(packet_bytes) = self.reassembler.on_frame(sender, bytes)? else {
            return Ok(Vec::new());
        };
        let packet = Packet::decode(&packet_bytes, MessageSchema::default())?;

        let mut forward_messages = Vec::new();
        for message in &packet.messages {
            self.handle_message(sender, message, now, &mut forward_messages)?;
        }

        if forward_messages.is_empty() {
            return Ok(Vec::new());
        }
        self.encode_and_segment(Packet { seq_num: None, messages: forward_messages })
    }

    fn handle_message(&mut self, sender: LinkAddr, message: &Message, now: u64, forward: &mut Vec<Message>) -> Result<(), CoreError> {
        match message.msg_type {
            MSG_HELLO => hello::receive(&mut self.ib, &self.domains, &mut self.dup, self.self_addr, message, now),
            MSG_TC => {
                let outcome = tc::receive(&mut self.ib, &self.domains, &mut self.dup, self.self_addr, sender, message, now)?;
                if let TcOutcome::Forward { hop_count } = outcome {
                    let mut relayed = message.clone();
                    relayed.hop_count = Some(hop_count);
                    forward.push(relayed);
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Drives the periodic work of spec §4.5/§4.10 `on_tick`: validity sweep, MPR recompute,
    /// HELLO/TC generation on their respective intervals, and Dijkstra on its own. Returns the
    /// frames that should be sent.
    pub fn on_tick(&mut self, now: u64) -> Result<Vec<Vec<u8>>, CoreError> {
        self.ib.check_validity(now);
        self.domains.recompute_mprs(&mut self.ib);

        let mut out = Vec::new();

        if now % self.config.hello_interval.max(1) == 0 {
            out.extend(self.build_hello()?);
        }

        if now % self.config.tc_interval.max(1) == 0 {
            if let Some(frames) = self.build_tc()? {
                out.extend(frames);
            }
        }

        if now % self.config.routing_interval.max(1) == 0 {
            for domain in 0..self.domains.domain_count() {
                dijkstra::run(&mut self.ib, domain);
            }
        }

        Ok(out)
    }

    fn build_hello(&mut self) -> Result<Vec<Vec<u8>>, CoreError> {
        self.hello_seq = self.hello_seq.wrapping_add(1);
        let params = HelloParams {
            validity_time: (self.config.hello_interval * 3) as u16,
            interval_time: self.config.hello_interval as u16,
            willingness: self.config.default_willingness,
        };
        let message = hello::build(self.self_addr, self.config.addr_len, self.hello_seq, params, &self.ib, &self.domains);
        self.encode_and_segment(Packet { seq_num: None, messages: vec![message] })
    }

    fn build_tc(&mut self) -> Result<Option<Vec<Vec<u8>>>, CoreError> {
        let params = HelloParams {
            validity_time: (self.config.tc_interval * 3) as u16,
            interval_time: self.config.tc_interval as u16,
            willingness: self.config.default_willingness,
        };
        self.tc_seq = self.tc_seq.wrapping_add(1);
        let Some(message) = tc::build(self.self_addr, self.config.addr_len, self.tc_seq, self.config.hop_limit, params, &self.ib, &self.domains) else {
            return Ok(None);
        };
        self.encode_and_segment(Packet { seq_num: None, messages: vec![message] }).map(Some)
    }

    fn encode_and_segment(&mut self, packet: Packet) -> Result<Vec<Vec<u8>>, CoreError> {
        let bytes = packet.encode();
        let frames = self.segmenter.segment(&bytes, self.config.frame_payload_max)?;
        Ok(frames.into_iter().map(|frame| frame.encode()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(last: u8) -> LinkAddr {
        LinkAddr::from_mac([0, 0, 0, 0, 0, last])
    }

    #[test]
    fn on_tick_produces_a_hello_frame_on_the_hello_interval() {
        let mut node = RoutingNode::new(addr(1), NodeConfig::default(), vec![0]).unwrap();
        let frames = node.on_tick(2).unwrap();
        assert!(!frames.is_empty());
    }

    #[test]
    fn a_hello_sent_to_itself_round_trips_through_on_packet() {
        let mut sender = RoutingNode::new(addr(1), NodeConfig::default(), vec![0]).unwrap();
        let mut receiver = RoutingNode::new(addr(2), NodeConfig::default(), vec![0]).unwrap();

        let frames = sender.on_tick(2).unwrap();
        assert!(!frames.is_empty());
        for frame in frames {
            receiver.on_packet(addr(1), &frame, 2).unwrap();
        }

        assert!(receiver.information_base().id_of(addr(1)).is_some());
    }
}
