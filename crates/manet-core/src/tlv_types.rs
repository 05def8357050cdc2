//! Message-type and TLV-kind constants for the HELLO/TC wire schema (spec §6). Per-domain TLVs
//! (`LINK_METRIC`, `MPR_STATUS`) are disambiguated by the TLV extension byte carrying the domain's
//! configured ext value (spec §4.9); domain-independent TLVs (`LINK_STATUS`, `VALIDITY_TIME`,
//! `INTERVAL_TIME`, `MPR_WILLING`) always use extension 0.

use manet_wire::TlvBlock;

pub const MSG_HELLO: u8 = 1;
pub const MSG_TC: u8 = 2;

pub const TLV_VALIDITY_TIME: u8 = 1;
pub const TLV_INTERVAL_TIME: u8 = 2;
pub const TLV_LINK_STATUS: u8 = 3;
pub const TLV_LINK_METRIC: u8 = 4;
pub const TLV_MPR_WILLING: u8 = 5;
pub const TLV_MPR_STATUS: u8 = 6;

pub(crate) fn read_u16(block: &TlvBlock, kind: u8) -> Option<u16> {
    let bytes = block.get_value(kind, 0)?;
    Some(u16::from_be_bytes([*bytes.first()?, *bytes.get(1)?]))
}
