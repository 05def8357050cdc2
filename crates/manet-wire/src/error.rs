use thiserror::Error;

/// Decode/encode failures for the TLV codec (spec §4.2 "Decode policy") and the bit-level stream
/// (spec §4.1). All are local-return, never panics, matching §7's error taxonomy: a malformed
/// packet is dropped wholesale rather than partially consumed.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum WireError {
    #[error("attempted to read/write past the end of the buffer")]
    BufferExhausted,

    #[error("bit width must be in 1..=56, got {0}")]
    InvalidBitWidth(u32),

    #[error("TLV header or block declares a size beyond the remaining buffer")]
    IncompleteTlv,

    #[error("packet or message was truncated before its declared size")]
    Terminated,

    #[error("TLV (type={kind}, ext={ext}) length {len} outside allowed [{min}, {max}]")]
    IllegalTlvLength { kind: u8, ext: u8, len: u16, min: u16, max: u16 },

    #[error("mandatory TLV (type={kind}, ext={ext}) is missing")]
    MissingMandatoryTlv { kind: u8, ext: u8 },

    #[error("address block declares an address length that does not divide its mid-byte region")]
    AddressLengthMismatch,
}
