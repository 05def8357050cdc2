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

//! Shared types for the manet workspace: the opaque link-layer address used as a peer's wire
//! identity, and the dense `PeerId` the routing core uses internally instead of copying that
//! address around. Kept `no_std` so `manet-wire` (the RFC5444-style codec) can depend on it
//! without pulling in `std`.

#![no_std]
extern crate alloc;

pub mod macros;

use alloc::vec::Vec;
use core::fmt::{
    Debug,
    Display,
    Formatter,
};

/// Upper bound on an opaque link-layer address. Six bytes covers the compact ESP-NOW port's MAC;
/// the larger RFC5444 port allows up to 16 to cover IPv6-sized originator addresses.
pub const MAX_LINK_ADDR_LEN: usize = 16;

/// An opaque link-layer peer identity. The routing core never interprets these bytes; it only
/// compares them for equality and hashes them to assign a `PeerId`.
#[derive(Eq, PartialEq, Ord, PartialOrd, Hash, Clone, Copy)]
pub struct LinkAddr {
    len: u8,
    bytes: [u8; MAX_LINK_ADDR_LEN],
}

impl LinkAddr {
    pub fn new(slice: &[u8]) -> Option<Self> {
        if slice.is_empty() || slice.len() > MAX_LINK_ADDR_LEN {
            return None;
        }
        let mut bytes = [0u8; MAX_LINK_ADDR_LEN];
        bytes[..slice.len()].copy_from_slice(slice);
        Some(Self {
            len: slice.len() as u8,
            bytes,
        })
    }

    /// A fixed six-byte MAC address, as used by the compact ESP-NOW port.
    pub fn from_mac(mac: [u8; 6]) -> Self {
        Self::new(&mac).expect("six bytes is always within MAX_LINK_ADDR_LEN")
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Debug for LinkAddr {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> core::fmt::Result {
        Display::fmt(self, formatter)
    }
}

impl Display for LinkAddr {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> core::fmt::Result {
        let bytes = self.as_bytes();
        for (index, byte) in bytes.iter().enumerate() {
            if index != 0 {
                write!(formatter, ":")?;
            }
            write!(formatter, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// A dense index into the information base's peer table (spec §3 "Peer identifier"). `0` is
/// reserved to mean "self" or "unused" on the wire; `PeerId::new` rejects it so the type itself
/// can never accidentally name an entry slot.
#[derive(Eq, PartialEq, Ord, PartialOrd, Hash, Clone, Copy, Debug)]
pub struct PeerId(u8);

impl PeerId {
    /// The reserved id meaning "self" when it appears in a link-info list, or "none" when it
    /// appears as a next-hop before a route has been computed.
    pub const SELF: PeerId = PeerId(0);

    pub fn new(raw: u8) -> Option<Self> {
        if raw == 0 {
            None
        } else {
            Some(PeerId(raw))
        }
    }

    /// Constructs a `PeerId` without checking for zero. Used only where the caller has already
    /// distinguished the self/none case.
    pub(crate) fn new_unchecked(raw: u8) -> Self {
        PeerId(raw)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn is_self(self) -> bool {
        self.0 == 0
    }
}

impl Display for PeerId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> core::fmt::Result {
        write!(formatter, "#{}", self.0)
    }
}

/// A dense, append-only table mapping `PeerId` to the `LinkAddr` first observed for it. Mirrors
/// the reference implementation's `peer_addr_list`/`get_or_create_id` (spec §4.4): id 0 is never
/// assigned, ids are dense in `1..=len()`, and addresses are never reassigned to a different id
/// once bound (deleted entries leave a stable id, matched by address only).
pub struct PeerTable {
    addrs: Vec<LinkAddr>,
    max: usize,
}

#[derive(thiserror::Error, Debug, Clone, Copy, Eq, PartialEq)]
pub enum PeerTableError {
    #[error("peer table is full (max {0} peers)")]
    Full(usize),
}

impl PeerTable {
    pub fn new(max: usize) -> Self {
        Self {
            addrs: Vec::new(),
            max,
        }
    }

    pub fn len(&self) -> usize {
        self.addrs.len()
    }

    pub fn addr_of(&self, id: PeerId) -> Option<LinkAddr> {
        self.addrs.get(id.get() as usize - 1).copied()
    }

    /// Linear search of the known addresses, the way the reference `get_or_create_id` does;
    /// `PeerId` allocation is append-only so the search is over a dense prefix `[0, len())`.
    pub fn get_or_create(&mut self, addr: LinkAddr) -> Result<(PeerId, bool), PeerTableError> {
        if let Some(index) = self.addrs.iter().position(|known| *known == addr) {
            return Ok((PeerId::new_unchecked(index as u8 + 1), false));
        }
        if self.addrs.len() >= self.max {
            return Err(PeerTableError::Full(self.max));
        }
        self.addrs.push(addr);
        Ok((PeerId::new_unchecked(self.addrs.len() as u8), true))
    }

    pub fn get(&self, addr: LinkAddr) -> Option<PeerId> {
        self.addrs
            .iter()
            .position(|known| *known == addr)
            .map(|index| PeerId::new_unchecked(index as u8 + 1))
    }
}
