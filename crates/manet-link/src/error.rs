use thiserror::Error;

/// Failures from the frame layer (spec §7). All are silent, best-effort drops from the driver's
/// point of view — the caller logs and moves on, there is nothing to retry.
#[derive(Debug, Error, Clone, Copy, Eq, PartialEq)]
pub enum LinkError {
    #[error("frame shorter than the 6-byte header")]
    Truncated,

    #[error("frame declares total_len {declared} but {actual} bytes were received")]
    LengthMismatch { declared: u8, actual: usize },

    #[error("frame CRC16 {computed:#06x} does not match the header's {declared:#06x}")]
    CrcFail { declared: u16, computed: u16 },

    #[error("unknown segment-state tag {0}")]
    UnknownSegmentState(u8),

    #[error("packet of {0} bytes needs more than 15 frames to segment")]
    PacketTooLarge(usize),

    #[error("reassembled packet would exceed the {0}-byte reassembly bound")]
    ReassemblyOverflow(usize),
}
