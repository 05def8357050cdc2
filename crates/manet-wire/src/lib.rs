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

//! Wire codec for the RFC5444-style packet format: bit-level primitives, TLV blocks, address
//! blocks, messages and packets. Internally built on `nom` parser combinators; every public
//! decode function collapses parse failures to a [`WireError`] rather than leaking `nom`'s error
//! type across the crate boundary.

#![no_std]
extern crate alloc;

pub mod addr_block;
pub mod bitstream;
pub mod error;
pub mod message;
pub mod packet;
pub mod tlv;

pub use addr_block::{
    AddrBlock,
    AddrBlockFlags,
};
pub use bitstream::{
    BitReader,
    BitWriter,
};
pub use error::WireError;
pub use message::{
    Message,
    MessageFlags,
    MessageSchema,
};
pub use packet::{
    Packet,
    PacketFlags,
};
pub use tlv::{
    Tlv,
    TlvBlock,
    TlvFlags,
    TlvSchema,
    TlvTypeSpec,
};
