//! Packets (spec §4.2): a one-byte header followed by zero or more messages back to back. The
//! header carries an optional packet sequence number, used only for link-layer diagnostics — the
//! duplicate-set and routing logic key off each message's own originator/seq-num instead.

use crate::{
    error::WireError,
    message::{
        Message,
        MessageSchema,
    },
};
use alloc::vec::Vec;
use bitflags::bitflags;
use nom::number::complete::{
    be_u16,
    be_u8,
};

bitflags! {
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct PacketFlags: u8 {
        const HAS_SEQ_NUM = 0b1000_0000;
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Packet {
    pub seq_num: Option<u16>,
    pub messages: Vec<Message>,
}

impl Packet {
    pub fn decode(input: &[u8], schema: MessageSchema<'_>) -> Result<Self, WireError> {
        let (mut cursor, flags_raw) = be_u8::<_, nom::error::Error<&[u8]>>(input).map_err(|_| WireError::IncompleteTlv)?;
        let flags = PacketFlags::from_bits_truncate(flags_raw);

        let seq_num = if flags.contains(PacketFlags::HAS_SEQ_NUM) {
            let (next, value) = be_u16::<_, nom::error::Error<&[u8]>>(cursor).map_err(|_| WireError::IncompleteTlv)?;
            cursor = next;
            Some(value)
        } else {
            None
        };

        let mut messages = Vec::new();
        while !cursor.is_empty() {
            let (next, message) = Message::decode(cursor, schema)?;
            messages.push(message);
            cursor = next;
        }

        Ok(Packet { seq_num, messages })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut flags = PacketFlags::empty();
        if self.seq_num.is_some() {
            flags |= PacketFlags::HAS_SEQ_NUM;
        }

        let mut out = Vec::new();
        out.push(flags.bits());
        if let Some(seq_num) = self.seq_num {
            out.extend_from_slice(&seq_num.to_be_bytes());
        }
        for message in &self.messages {
            out.extend(message.encode());
        }
        out
    }
}
