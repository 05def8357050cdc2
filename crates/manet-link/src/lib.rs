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

//! Frame segmentation and reassembly for links whose MTU is smaller than a full RFC5444-style
//! packet. Sits between the packet/message codec (`manet-wire`) and whatever transport the driver
//! uses to actually send bytes.

#![no_std]
extern crate alloc;

pub mod crc16;
pub mod error;
pub mod segmenter;

pub use error::LinkError;
pub use segmenter::{
    Frame,
    Reassembler,
    SegmentState,
    Segmenter,
    DEFAULT_MAX_FRAME,
    HEADER_LEN,
    MAX_SEGMENTS,
};
