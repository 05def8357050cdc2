//! Message header and body (spec §4.2). A message's `msg-size` field bounds how many bytes of
//! the packet belong to it, so a malformed size can never let decoding run past the message's own
//! region into the next message or off the end of the buffer.

use crate::{
    addr_block::AddrBlock,
    error::WireError,
    tlv::{
        TlvBlock,
        TlvSchema,
    },
};
use alloc::vec::Vec;
use bitflags::bitflags;
use manet_common::LinkAddr;
use nom::{
    bytes::complete::take,
    number::complete::{
        be_u16,
        be_u8,
    },
    IResult,
};

bitflags! {
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct MessageFlags: u8 {
        const HAS_ORIGINATOR = 0b1000_0000;
        const HAS_HOP_LIMIT = 0b0100_0000;
        const HAS_HOP_COUNT = 0b0010_0000;
        const HAS_SEQ_NUM = 0b0001_0000;
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Message {
    pub msg_type: u8,
    pub addr_len: u8,
    pub originator: Option<LinkAddr>,
    pub hop_limit: Option<u8>,
    pub hop_count: Option<u8>,
    pub seq_num: Option<u16>,
    pub msg_tlvs: TlvBlock,
    pub addr_blocks: Vec<(AddrBlock, TlvBlock)>,
}

/// Schemas to apply while decoding one message: the message-level TLV block has a different
/// mandatory/length whitelist than each address block's TLV block (spec §4.2, "per-session
/// whitelist").
#[derive(Clone, Copy, Default)]
pub struct MessageSchema<'a> {
    pub msg_tlvs: Option<&'a TlvSchema>,
    pub addr_tlvs: Option<&'a TlvSchema>,
}

impl Message {
    pub fn decode<'a>(input: &'a [u8], schema: MessageSchema<'_>) -> Result<(&'a [u8], Self), WireError> {
        let (rest, (msg_type, flags_raw, addr_len, msg_size)) = parse_header(input).map_err(|_| WireError::IncompleteTlv)?;

        if (msg_size as usize) < 5 {
            return Err(WireError::Terminated);
        }
        let body_len = msg_size as usize - 5;
        let (leftover, body) = take::<_, _, nom::error::Error<&[u8]>>(body_len)(rest).map_err(|_| WireError::Terminated)?;

        let flags = MessageFlags::from_bits_truncate(flags_raw);
        let mut cursor = body;

        let originator = if flags.contains(MessageFlags::HAS_ORIGINATOR) {
            let (next, bytes) =
                take::<_, _, nom::error::Error<&[u8]>>(addr_len as usize)(cursor).map_err(|_| WireError::IncompleteTlv)?;
            cursor = next;
            Some(LinkAddr::new(bytes).ok_or(WireError::AddressLengthMismatch)?)
        } else {
            None
        };

        let hop_limit = if flags.contains(MessageFlags::HAS_HOP_LIMIT) {
            let (next, value) = be_u8::<_, nom::error::Error<&[u8]>>(cursor).map_err(|_| WireError::IncompleteTlv)?;
            cursor = next;
            Some(value)
        } else {
            None
        };

        let hop_count = if flags.contains(MessageFlags::HAS_HOP_COUNT) {
            let (next, value) = be_u8::<_, nom::error::Error<&[u8]>>(cursor).map_err(|_| WireError::IncompleteTlv)?;
            cursor = next;
            Some(value)
        } else {
            None
        };

        let seq_num = if flags.contains(MessageFlags::HAS_SEQ_NUM) {
            let (next, value) = be_u16::<_, nom::error::Error<&[u8]>>(cursor).map_err(|_| WireError::IncompleteTlv)?;
            cursor = next;
            Some(value)
        } else {
            None
        };

        let (mut cursor, msg_tlvs) = TlvBlock::decode(cursor, schema.msg_tlvs)?;

        let mut addr_blocks = Vec::new();
        while !cursor.is_empty() {
            let (next, addr_block) = AddrBlock::decode(cursor, addr_len)?;
            let (next, addr_tlvs) = TlvBlock::decode(next, schema.addr_tlvs)?;
            addr_blocks.push((addr_block, addr_tlvs));
            cursor = next;
        }

        Ok((
            leftover,
            Message {
                msg_type,
                addr_len,
                originator,
                hop_limit,
                hop_count,
                seq_num,
                msg_tlvs,
                addr_blocks,
            },
        ))
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut flags = MessageFlags::empty();
        let mut body = Vec::new();

        if let Some(originator) = &self.originator {
            flags |= MessageFlags::HAS_ORIGINATOR;
            body.extend_from_slice(originator.as_bytes());
        }
        if let Some(hop_limit) = self.hop_limit {
            flags |= MessageFlags::HAS_HOP_LIMIT;
            body.push(hop_limit);
        }
        if let Some(hop_count) = self.hop_count {
            flags |= MessageFlags::HAS_HOP_COUNT;
            body.push(hop_count);
        }
        if let Some(seq_num) = self.seq_num {
            flags |= MessageFlags::HAS_SEQ_NUM;
            body.extend_from_slice(&seq_num.to_be_bytes());
        }

        body.extend(self.msg_tlvs.encode());
        for (addr_block, addr_tlvs) in &self.addr_blocks {
            body.extend(addr_block.encode(self.addr_len));
            body.extend(addr_tlvs.encode());
        }

        let mut out = Vec::with_capacity(5 + body.len());
        out.push(self.msg_type);
        out.push(flags.bits());
        out.push(self.addr_len);
        out.extend_from_slice(&((5 + body.len()) as u16).to_be_bytes());
        out.extend(body);
        out
    }
}

fn parse_header(input: &[u8]) -> IResult<&[u8], (u8, u8, u8, u16)> {
    let (input, msg_type) = be_u8(input)?;
    let (input, flags) = be_u8(input)?;
    let (input, addr_len) = be_u8(input)?;
    let (input, msg_size) = be_u16(input)?;
    Ok((input, (msg_type, flags, addr_len, msg_size)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tlv::Tlv;

    #[test]
    fn decode_encode_is_idempotent_without_addresses() {
        let mut msg_tlvs = TlvBlock::default();
        msg_tlvs.push(Tlv::single(1, 0, alloc::vec![5]));

        let message = Message {
            msg_type: 1,
            addr_len: 6,
            originator: Some(LinkAddr::from_mac([1, 2, 3, 4, 5, 6])),
            hop_limit: None,
            hop_count: None,
            seq_num: Some(42),
            msg_tlvs,
            addr_blocks: Vec::new(),
        };

        let bytes = message.encode();
        let (rest, decoded) = Message::decode(&bytes, MessageSchema::default()).unwrap();
        assert!(rest.is_empty());
        assert_eq!(decoded, message);
    }

    #[test]
    fn decode_encode_is_idempotent_with_addresses() {
        let addr_block = AddrBlock {
            addresses: alloc::vec![LinkAddr::from_mac([2, 0, 0, 0, 0, 1]), LinkAddr::from_mac([2, 0, 0, 0, 0, 2])],
            prefix_lengths: None,
        };
        let mut addr_tlvs = TlvBlock::default();
        addr_tlvs.push(Tlv::single(3, 0, alloc::vec![1, 1]));

        let message = Message {
            msg_type: 2,
            addr_len: 6,
            originator: Some(LinkAddr::from_mac([9, 9, 9, 9, 9, 9])),
            hop_limit: Some(4),
            hop_count: Some(1),
            seq_num: Some(7),
            msg_tlvs: TlvBlock::default(),
            addr_blocks: alloc::vec![(addr_block, addr_tlvs)],
        };

        let bytes = message.encode();
        let (rest, decoded) = Message::decode(&bytes, MessageSchema::default()).unwrap();
        assert!(rest.is_empty());
        assert_eq!(decoded, message);
    }

    #[test]
    fn truncated_msg_size_fails() {
        let bytes = [1u8, 0, 6, 0, 200];
        let err = Message::decode(&bytes, MessageSchema::default()).unwrap_err();
        assert_eq!(err, WireError::Terminated);
    }
}
