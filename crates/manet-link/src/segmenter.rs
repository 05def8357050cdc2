//! Splits an oversized RFC5444-style packet into frames no larger than the link MTU, and
//! reassembles frames back into packets on the receive side (spec §4.3).
//!
//! Each sender gets exactly one reassembly slot: a `START` mid-reassembly replaces whatever was
//! in progress, and any sequence gap in `MORE`/`END` discards the in-flight packet outright
//! rather than trying to patch around it.

use crate::{
    crc16,
    error::LinkError,
};
use alloc::{
    collections::BTreeMap,
    vec::Vec,
};
use manet_common::LinkAddr;

pub const HEADER_LEN: usize = 6;
pub const DEFAULT_MAX_FRAME: usize = 250;
pub const MAX_SEGMENTS: usize = 15;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SegmentState {
    Start,
    More,
    End,
    Single,
}

impl SegmentState {
    fn to_u8(self) -> u8 {
        match self {
            SegmentState::Start => 0,
            SegmentState::More => 1,
            SegmentState::End => 2,
            SegmentState::Single => 3,
        }
    }

    fn from_u8(value: u8) -> Result<Self, LinkError> {
        match value {
            0 => Ok(SegmentState::Start),
            1 => Ok(SegmentState::More),
            2 => Ok(SegmentState::End),
            3 => Ok(SegmentState::Single),
            other => Err(LinkError::UnknownSegmentState(other)),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Frame {
    pub seq_num: u16,
    pub state: SegmentState,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn encode(&self) -> Vec<u8> {
        let total_len = HEADER_LEN + self.payload.len();
        let mut out = Vec::with_capacity(total_len);
        out.extend_from_slice(&self.seq_num.to_be_bytes());
        out.push(self.state.to_u8());
        out.extend_from_slice(&[0, 0]); // crc16, filled in below
        out.push(total_len as u8);
        out.extend_from_slice(&self.payload);

        let crc = crc16::crc16_le(crc16::INIT, &out);
        out[3..5].copy_from_slice(&crc.to_be_bytes());
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, LinkError> {
        if bytes.len() < HEADER_LEN {
            return Err(LinkError::Truncated);
        }
        let declared_len = bytes[5];
        if declared_len as usize != bytes.len() {
            return Err(LinkError::LengthMismatch { declared: declared_len, actual: bytes.len() });
        }

        let declared_crc = u16::from_be_bytes([bytes[3], bytes[4]]);
        let mut zeroed = Vec::from(bytes);
        zeroed[3] = 0;
        zeroed[4] = 0;
        let computed_crc = crc16::crc16_le(crc16::INIT, &zeroed);
        if computed_crc != declared_crc {
            return Err(LinkError::CrcFail { declared: declared_crc, computed: computed_crc });
        }

        let seq_num = u16::from_be_bytes([bytes[0], bytes[1]]);
        let state = SegmentState::from_u8(bytes[2])?;
        let payload = bytes[HEADER_LEN..].to_vec();
        Ok(Frame { seq_num, state, payload })
    }
}

/// Outgoing-side sequence counter. One per node: frame sequence numbers increase across every
/// packet this node segments, not just within one packet.
pub struct Segmenter {
    next_seq: u16,
}

impl Segmenter {
    pub fn new() -> Self {
        Self { next_seq: 0 }
    }

    pub fn segment(&mut self, packet: &[u8], frame_payload_max: usize) -> Result<Vec<Frame>, LinkError> {
        let segment_count = if packet.is_empty() { 1 } else { packet.len().div_ceil(frame_payload_max) };
        if segment_count == 0 || segment_count > MAX_SEGMENTS {
            return Err(LinkError::PacketTooLarge(packet.len()));
        }

        let mut frames = Vec::with_capacity(segment_count);
        if segment_count == 1 {
            frames.push(Frame { seq_num: self.next_seq, state: SegmentState::Single, payload: packet.to_vec() });
            self.next_seq = self.next_seq.wrapping_add(1);
            return Ok(frames);
        }

        for (index, chunk) in packet.chunks(frame_payload_max).enumerate() {
            let state = if index == 0 {
                SegmentState::Start
            } else if index == segment_count - 1 {
                SegmentState::End
            } else {
                SegmentState::More
            };
            frames.push(Frame { seq_num: self.next_seq, state, payload: chunk.to_vec() });
            self.next_seq = self.next_seq.wrapping_add(1);
        }
        Ok(frames)
    }
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new()
    }
}

struct InFlight {
    last_seq: u16,
    buffer: Vec<u8>,
}

/// Per-sender reassembly state, bounded at `max_packet_len` bytes total (spec: `PACKET_MAX = 16 *
/// F`).
pub struct Reassembler {
    slots: BTreeMap<LinkAddr, InFlight>,
    max_packet_len: usize,
}

impl Reassembler {
    pub fn new(max_packet_len: usize) -> Self {
        Self {
            slots: BTreeMap::new(),
            max_packet_len,
        }
    }

    /// Feeds one received frame. Returns `Ok(Some(packet))` when a frame completes a packet,
    /// `Ok(None)` when the frame was accepted but a packet is still in progress (or the frame was
    /// silently discarded per the gap rule), and `Err` for frames that fail decode — those never
    /// touch this sender's reassembly state.
    pub fn on_frame(&mut self, sender: LinkAddr, bytes: &[u8]) -> Result<Option<Vec<u8>>, LinkError> {
        let frame = Frame::decode(bytes)?;

        match frame.state {
            SegmentState::Single => Ok(Some(frame.payload)),
            SegmentState::Start => {
                if self.slots.remove(&sender).is_some() {
                    log::warn!("frame reassembly reset for {sender}: START arrived mid-reassembly");
                }
                if frame.payload.len() > self.max_packet_len {
                    return Err(LinkError::ReassemblyOverflow(self.max_packet_len));
                }
                self.slots.insert(
                    sender,
                    InFlight {
                        last_seq: frame.seq_num,
                        buffer: frame.payload,
                    },
                );
                Ok(None)
            }
            SegmentState::More | SegmentState::End => {
                let in_progress = self
                    .slots
                    .get_mut(&sender)
                    .filter(|slot| frame.seq_num == slot.last_seq.wrapping_add(1));

                let Some(slot) = in_progress else {
                    self.slots.remove(&sender);
                    return Ok(None);
                };

                if slot.buffer.len() + frame.payload.len() > self.max_packet_len {
                    self.slots.remove(&sender);
                    return Err(LinkError::ReassemblyOverflow(self.max_packet_len));
                }
                slot.buffer.extend_from_slice(&frame.payload);
                slot.last_seq = frame.seq_num;

                if frame.state == SegmentState::End {
                    let finished = self.slots.remove(&sender).expect("slot checked present above");
                    Ok(Some(finished.buffer))
                } else {
                    Ok(None)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_frame_round_trip() {
        // spec §8 scenario S2.
        let sender = LinkAddr::from_mac([2, 0, 0, 0, 0, 1]);
        let packet = alloc::vec![7u8; 80];

        let mut segmenter = Segmenter::new();
        let frames = segmenter.segment(&packet, 244).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].state, SegmentState::Single);

        let mut reassembler = Reassembler::new(16 * 244);
        let delivered = reassembler.on_frame(sender, &frames[0].encode()).unwrap();
        assert_eq!(delivered, Some(packet));
    }

    #[test]
    fn two_frame_round_trip() {
        // spec §8 scenario S3.
        let sender = LinkAddr::from_mac([2, 0, 0, 0, 0, 2]);
        let frame_payload_max = 32;
        let packet: Vec<u8> = (0..(2 * frame_payload_max) as u16).map(|v| v as u8).collect();

        let mut segmenter = Segmenter::new();
        let frames = segmenter.segment(&packet, frame_payload_max).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].state, SegmentState::Start);
        assert_eq!(frames[1].state, SegmentState::End);

        let mut reassembler = Reassembler::new(16 * frame_payload_max);
        assert_eq!(reassembler.on_frame(sender, &frames[0].encode()).unwrap(), None);
        assert_eq!(reassembler.on_frame(sender, &frames[1].encode()).unwrap(), Some(packet));
    }

    #[test]
    fn gap_discards_in_flight_packet() {
        // spec §8 scenario S4 / testable property #3.
        let sender = LinkAddr::from_mac([2, 0, 0, 0, 0, 3]);
        let frame_payload_max = 16;
        let packet = alloc::vec![1u8; frame_payload_max * 3];

        let mut segmenter = Segmenter::new();
        let frames = segmenter.segment(&packet, frame_payload_max).unwrap();
        assert_eq!(frames.len(), 3);

        let mut reassembler = Reassembler::new(16 * frame_payload_max);
        assert_eq!(reassembler.on_frame(sender, &frames[0].encode()).unwrap(), None);
        // frames[1] (MORE, seq=1) is lost.
        assert_eq!(reassembler.on_frame(sender, &frames[2].encode()).unwrap(), None);
        assert!(reassembler.slots.is_empty());
    }

    #[test]
    fn start_mid_reassembly_drops_the_old_one() {
        let sender = LinkAddr::from_mac([2, 0, 0, 0, 0, 4]);
        let frame_payload_max = 16;
        let first = alloc::vec![9u8; frame_payload_max * 3];
        let second = alloc::vec![5u8; frame_payload_max * 2];

        let mut segmenter = Segmenter::new();
        let first_frames = segmenter.segment(&first, frame_payload_max).unwrap();
        let second_frames = segmenter.segment(&second, frame_payload_max).unwrap();

        let mut reassembler = Reassembler::new(16 * frame_payload_max);
        reassembler.on_frame(sender, &first_frames[0].encode()).unwrap();
        let delivered = reassembler.on_frame(sender, &second_frames[0].encode()).unwrap();
        assert_eq!(delivered, None);
        let delivered = reassembler.on_frame(sender, &second_frames[1].encode()).unwrap();
        assert_eq!(delivered, Some(second));
    }

    #[test]
    fn corrupt_crc_is_rejected_without_touching_state() {
        let sender = LinkAddr::from_mac([2, 0, 0, 0, 0, 5]);
        let mut segmenter = Segmenter::new();
        let frames = segmenter.segment(&alloc::vec![1u8; 4], 64).unwrap();
        let mut bytes = frames[0].encode();
        *bytes.last_mut().unwrap() ^= 0xFF;

        let mut reassembler = Reassembler::new(1024);
        let err = reassembler.on_frame(sender, &bytes).unwrap_err();
        assert!(matches!(err, LinkError::CrcFail { .. }));
        assert!(reassembler.slots.is_empty());
    }

    #[test]
    fn too_many_segments_is_rejected() {
        let mut segmenter = Segmenter::new();
        let err = segmenter.segment(&alloc::vec![0u8; 1000], 10).unwrap_err();
        assert!(matches!(err, LinkError::PacketTooLarge(1000)));
    }
}
