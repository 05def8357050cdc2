//! TLV blocks (spec §4.2). A block is a length-prefixed run of `(type, ext-type, flags, [length],
//! value)` tuples. Unknown types are preserved as opaque `(kind, ext, bytes)`; repeated
//! occurrences of the same `(kind, ext)` pair append to that TLV's `values` in order of
//! appearance rather than producing separate `Tlv`s, matching spec §4.2's "duplicate TLVs ...
//! stored in a linked list hanging off the first".

use crate::error::WireError;
use alloc::vec::Vec;
use bitflags::bitflags;
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
    pub struct TlvFlags: u8 {
        /// Extension-type byte follows the base type byte.
        const HAS_TYPE_EXT = 0b1000_0000;
        /// A value (and its length prefix) follows the flags/ext bytes.
        const HAS_VALUE = 0b0100_0000;
        /// The value's length is a 2-byte field instead of 1-byte.
        const EXTENDED_LENGTH = 0b0010_0000;
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Tlv {
    pub kind: u8,
    pub ext: u8,
    pub values: Vec<Vec<u8>>,
}

impl Tlv {
    pub fn single(kind: u8, ext: u8, value: Vec<u8>) -> Self {
        Self {
            kind,
            ext,
            values: alloc::vec![value],
        }
    }

    /// The first value, which is the only value for a non-repeated TLV.
    pub fn value(&self) -> Option<&[u8]> {
        self.values.first().map(Vec::as_slice)
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TlvBlock(pub Vec<Tlv>);

impl TlvBlock {
    pub fn get(&self, kind: u8, ext: u8) -> Option<&Tlv> {
        self.0.iter().find(|tlv| tlv.kind == kind && tlv.ext == ext)
    }

    pub fn get_value(&self, kind: u8, ext: u8) -> Option<&[u8]> {
        self.get(kind, ext).and_then(Tlv::value)
    }

    pub fn push(&mut self, tlv: Tlv) {
        self.0.push(tlv);
    }

    pub fn decode(input: &[u8], schema: Option<&TlvSchema>) -> Result<(&[u8], Self), WireError> {
        let (rest, len) = be_u16::<_, nom::error::Error<&[u8]>>(input).map_err(|_| WireError::IncompleteTlv)?;
        let (rest, body) = take::<_, _, nom::error::Error<&[u8]>>(len)(rest).map_err(|_| WireError::IncompleteTlv)?;

        let mut block = TlvBlock::default();
        let mut cursor = body;
        while !cursor.is_empty() {
            let (next_cursor, (kind, ext, value)) = parse_one_tlv(cursor).map_err(|_| WireError::IncompleteTlv)?;
            cursor = next_cursor;

            if let Some(schema) = schema {
                if let Some(spec) = schema.lookup(kind, ext) {
                    let value_len = value.len() as u16;
                    if value_len < spec.min_len || value_len > spec.max_len {
                        return Err(WireError::IllegalTlvLength {
                            kind,
                            ext,
                            len: value_len,
                            min: spec.min_len,
                            max: spec.max_len,
                        });
                    }
                }
            }

            match block.0.iter_mut().find(|tlv| tlv.kind == kind && tlv.ext == ext) {
                Some(existing) => existing.values.push(value),
                None => block.0.push(Tlv::single(kind, ext, value)),
            }
        }

        if let Some(schema) = schema {
            for spec in schema.mandatory() {
                if block.get(spec.kind, spec.ext).is_none() {
                    return Err(WireError::MissingMandatoryTlv { kind: spec.kind, ext: spec.ext });
                }
            }
        }

        Ok((rest, block))
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut body = Vec::new();
        for tlv in &self.0 {
            for value in &tlv.values {
                encode_one_tlv(&mut body, tlv.kind, tlv.ext, value);
            }
        }
        let mut out = Vec::with_capacity(body.len() + 2);
        out.extend_from_slice(&(body.len() as u16).to_be_bytes());
        out.extend(body);
        out
    }
}

fn parse_one_tlv(input: &[u8]) -> IResult<&[u8], (u8, u8, Vec<u8>)> {
    let (input, kind) = be_u8(input)?;
    let (input, flags_raw) = be_u8(input)?;
    let flags = TlvFlags::from_bits_truncate(flags_raw);

    let (input, ext) = if flags.contains(TlvFlags::HAS_TYPE_EXT) {
        be_u8(input)?
    } else {
        (input, 0)
    };

    if !flags.contains(TlvFlags::HAS_VALUE) {
        return Ok((input, (kind, ext, Vec::new())));
    }

    let (input, len) = if flags.contains(TlvFlags::EXTENDED_LENGTH) {
        be_u16(input)?
    } else {
        let (input, len) = be_u8(input)?;
        (input, len as u16)
    };

    let (input, value) = take(len)(input)?;
    Ok((input, (kind, ext, value.to_vec())))
}

fn encode_one_tlv(out: &mut Vec<u8>, kind: u8, ext: u8, value: &[u8]) {
    let mut flags = TlvFlags::empty();
    if ext != 0 {
        flags |= TlvFlags::HAS_TYPE_EXT;
    }
    if !value.is_empty() {
        flags |= TlvFlags::HAS_VALUE;
    }
    let extended = value.len() > u8::MAX as usize;
    if extended {
        flags |= TlvFlags::EXTENDED_LENGTH;
    }

    out.push(kind);
    out.push(flags.bits());
    if flags.contains(TlvFlags::HAS_TYPE_EXT) {
        out.push(ext);
    }
    if flags.contains(TlvFlags::HAS_VALUE) {
        if extended {
            out.extend_from_slice(&(value.len() as u16).to_be_bytes());
        } else {
            out.push(value.len() as u8);
        }
        out.extend_from_slice(value);
    }
}

/// Describes the allowed length range and mandatory-ness of one `(type, ext-type)` pair, for one
/// message context (a HELLO's msg-tlv-block has a different schema than its addr-tlv-block).
/// Spec §4.2: "Mandatory-but-absent TLVs named by a per-session whitelist fail decode... TLV
/// length outside [min,max] advertised by the extension for that id fails decode".
#[derive(Clone, Copy, Debug)]
pub struct TlvTypeSpec {
    pub kind: u8,
    pub ext: u8,
    pub min_len: u16,
    pub max_len: u16,
    pub mandatory: bool,
}

#[derive(Clone, Debug, Default)]
pub struct TlvSchema(pub Vec<TlvTypeSpec>);

impl TlvSchema {
    pub fn lookup(&self, kind: u8, ext: u8) -> Option<&TlvTypeSpec> {
        self.0.iter().find(|spec| spec.kind == kind && spec.ext == ext)
    }

    pub fn mandatory(&self) -> impl Iterator<Item = &TlvTypeSpec> {
        self.0.iter().filter(|spec| spec.mandatory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trip() {
        let mut block = TlvBlock::default();
        block.push(Tlv::single(1, 0, alloc::vec![5]));
        block.push(Tlv::single(3, 0, alloc::vec![1, 1]));

        let bytes = block.encode();
        let (rest, decoded) = TlvBlock::decode(&bytes, None).unwrap();
        assert!(rest.is_empty());
        assert_eq!(decoded, block);
    }

    #[test]
    fn duplicate_tlvs_append_to_values() {
        let mut body = Vec::new();
        encode_one_tlv(&mut body, 3, 0, &[1]);
        encode_one_tlv(&mut body, 3, 0, &[2]);
        let mut framed = Vec::new();
        framed.extend_from_slice(&(body.len() as u16).to_be_bytes());
        framed.extend(body);

        let (_, block) = TlvBlock::decode(&framed, None).unwrap();
        assert_eq!(block.0.len(), 1);
        assert_eq!(block.0[0].values, alloc::vec![alloc::vec![1u8], alloc::vec![2u8]]);
    }

    #[test]
    fn missing_mandatory_tlv_fails() {
        let block = TlvBlock::default();
        let bytes = block.encode();
        let schema = TlvSchema(alloc::vec![TlvTypeSpec { kind: 1, ext: 0, min_len: 1, max_len: 1, mandatory: true }]);
        let err = TlvBlock::decode(&bytes, Some(&schema)).unwrap_err();
        assert_eq!(err, WireError::MissingMandatoryTlv { kind: 1, ext: 0 });
    }

    #[test]
    fn illegal_tlv_length_fails() {
        let mut block = TlvBlock::default();
        block.push(Tlv::single(1, 0, alloc::vec![1, 2]));
        let bytes = block.encode();
        let schema = TlvSchema(alloc::vec![TlvTypeSpec { kind: 1, ext: 0, min_len: 1, max_len: 1, mandatory: true }]);
        let err = TlvBlock::decode(&bytes, Some(&schema)).unwrap_err();
        assert_eq!(err, WireError::IllegalTlvLength { kind: 1, ext: 0, len: 2, min: 1, max: 1 });
    }
}
