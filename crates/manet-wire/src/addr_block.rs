//! Address blocks (spec §4.2, "RFC5444 head/mid/tail compression"). Addresses in one block share
//! a common prefix ("head"); only the differing suffix ("mid") is stored per address. An optional
//! per-address prefix-length list rides along for attached-network endpoints in the full port
//! (spec §3 "Attached-network endpoints... are leaf edges with a prefix instead of a peer-id").

use crate::error::WireError;
use alloc::vec::Vec;
use bitflags::bitflags;
use manet_common::LinkAddr;
use nom::{
    bytes::complete::take,
    number::complete::be_u8,
    IResult,
};

bitflags! {
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct AddrBlockFlags: u8 {
        const HAS_PREFIX_LENGTHS = 0b1000_0000;
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AddrBlock {
    pub addresses: Vec<LinkAddr>,
    pub prefix_lengths: Option<Vec<u8>>,
}

impl AddrBlock {
    pub fn decode(input: &[u8], addr_len: u8) -> Result<(&[u8], Self), WireError> {
        let addr_len = addr_len as usize;
        let (input, (num, flags_raw, head_len)) = parse_header(input).map_err(|_| WireError::IncompleteTlv)?;
        let flags = AddrBlockFlags::from_bits_truncate(flags_raw);
        let head_len = head_len as usize;

        if head_len > addr_len {
            return Err(WireError::AddressLengthMismatch);
        }
        let mid_len = addr_len - head_len;

        let (input, head) = take::<_, _, nom::error::Error<&[u8]>>(head_len)(input).map_err(|_| WireError::IncompleteTlv)?;
        let (input, mid) =
            take::<_, _, nom::error::Error<&[u8]>>(mid_len * num as usize)(input).map_err(|_| WireError::IncompleteTlv)?;

        let mut addresses = Vec::with_capacity(num as usize);
        let mut full = [0u8; manet_common::MAX_LINK_ADDR_LEN];
        for index in 0..num as usize {
            full[..head_len].copy_from_slice(head);
            full[head_len..head_len + mid_len].copy_from_slice(&mid[index * mid_len..(index + 1) * mid_len]);
            addresses.push(LinkAddr::new(&full[..addr_len]).ok_or(WireError::AddressLengthMismatch)?);
        }

        let (input, prefix_lengths) = if flags.contains(AddrBlockFlags::HAS_PREFIX_LENGTHS) {
            let (input, bytes) = take::<_, _, nom::error::Error<&[u8]>>(num as usize)(input).map_err(|_| WireError::IncompleteTlv)?;
            (input, Some(bytes.to_vec()))
        } else {
            (input, None)
        };

        Ok((input, AddrBlock { addresses, prefix_lengths }))
    }

    pub fn encode(&self, addr_len: u8) -> Vec<u8> {
        let addr_len = addr_len as usize;
        let head_len = common_prefix_len(&self.addresses, addr_len);

        let mut flags = AddrBlockFlags::empty();
        if self.prefix_lengths.is_some() {
            flags |= AddrBlockFlags::HAS_PREFIX_LENGTHS;
        }

        let mut out = Vec::new();
        out.push(self.addresses.len() as u8);
        out.push(flags.bits());
        out.push(head_len as u8);
        if let Some(first) = self.addresses.first() {
            out.extend_from_slice(&first.as_bytes()[..head_len]);
        }
        for addr in &self.addresses {
            out.extend_from_slice(&addr.as_bytes()[head_len..]);
        }
        if let Some(lengths) = &self.prefix_lengths {
            out.extend_from_slice(lengths);
        }
        out
    }
}

fn parse_header(input: &[u8]) -> IResult<&[u8], (u8, u8, u8)> {
    let (input, num) = be_u8(input)?;
    let (input, flags) = be_u8(input)?;
    let (input, head_len) = be_u8(input)?;
    Ok((input, (num, flags, head_len)))
}

fn common_prefix_len(addresses: &[LinkAddr], addr_len: usize) -> usize {
    if addresses.len() < 2 {
        return 0;
    }
    let first = addresses[0].as_bytes();
    let mut len = 0;
    'outer: while len < addr_len {
        for addr in &addresses[1..] {
            if addr.as_bytes()[len] != first[len] {
                break 'outer;
            }
        }
        len += 1;
    }
    len
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trip_shares_head() {
        let block = AddrBlock {
            addresses: alloc::vec![
                LinkAddr::from_mac([2, 0, 0, 0, 0, 1]),
                LinkAddr::from_mac([2, 0, 0, 0, 0, 2]),
                LinkAddr::from_mac([2, 0, 0, 0, 0, 3]),
            ],
            prefix_lengths: None,
        };
        let bytes = block.encode(6);
        // head is the shared "02:00:00:00:00" prefix (5 bytes), one differing mid byte each.
        assert_eq!(bytes[2], 5);

        let (rest, decoded) = AddrBlock::decode(&bytes, 6).unwrap();
        assert!(rest.is_empty());
        assert_eq!(decoded, block);
    }

    #[test]
    fn single_address_has_no_head() {
        let block = AddrBlock {
            addresses: alloc::vec![LinkAddr::from_mac([1, 2, 3, 4, 5, 6])],
            prefix_lengths: None,
        };
        let bytes = block.encode(6);
        assert_eq!(bytes[2], 0);
        let (_, decoded) = AddrBlock::decode(&bytes, 6).unwrap();
        assert_eq!(decoded, block);
    }

    #[test]
    fn prefix_lengths_round_trip() {
        let block = AddrBlock {
            addresses: alloc::vec![LinkAddr::from_mac([9, 9, 9, 9, 9, 9])],
            prefix_lengths: Some(alloc::vec![24]),
        };
        let bytes = block.encode(6);
        let (_, decoded) = AddrBlock::decode(&bytes, 6).unwrap();
        assert_eq!(decoded.prefix_lengths, Some(alloc::vec![24]));
    }
}
