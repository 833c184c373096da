//! Canonical (extension) blocks: block type codes, block control flags,
//! and the polymorphic extension-block value carried by each block.

pub mod bundle_age;
pub mod generic;
pub mod hop_count;
pub mod payload;
pub mod previous_node;
pub mod signature;

use crate::crc::CrcType;
use crate::error::{CaptureFieldErr, Error};
use crate::registry::Registry;
use dtn_cbor::decode::Value;
use std::any::Any;
use std::fmt::Debug;

pub use bundle_age::BundleAgeData;
pub use generic::GenericData;
pub use hop_count::HopCountData;
pub use payload::PayloadData;
pub use previous_node::PreviousNodeData;
pub use signature::SignatureData;

/// Well-known block type codes (spec §3).
pub const TYPE_PAYLOAD: u64 = 1;
pub const TYPE_PREVIOUS_NODE: u64 = 6;
pub const TYPE_BUNDLE_AGE: u64 = 7;
pub const TYPE_HOP_COUNT: u64 = 9;

/// A suggested private-use type code for the signature block. The code is
/// not fixed by the protocol; a deployment may register it under any
/// unused code instead.
pub const TYPE_SIGNATURE_DEFAULT: u64 = 192;

/// The block-specific control flags (spec §4.A, block control flag bits).
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Flags {
    pub replicate_block: bool,
    pub remove_block: bool,
    pub status_report_block: bool,
    pub delete_bundle: bool,
    pub unrecognised: u64,
}

impl Flags {
    /// Flags appropriate for blocks that must survive fragmentation
    /// (Bundle Age, Hop Count, Previous Node default to this).
    pub fn replicated() -> Self {
        Self {
            replicate_block: true,
            ..Default::default()
        }
    }
}

impl From<&Flags> for u64 {
    fn from(value: &Flags) -> Self {
        let mut bits = value.unrecognised;
        if value.replicate_block {
            bits |= 0x01;
        }
        if value.remove_block {
            bits |= 0x02;
        }
        if value.status_report_block {
            bits |= 0x04;
        }
        if value.delete_bundle {
            bits |= 0x08;
        }
        bits
    }
}

impl From<u64> for Flags {
    fn from(value: u64) -> Self {
        Self {
            replicate_block: value & 0x01 != 0,
            remove_block: value & 0x02 != 0,
            status_report_block: value & 0x04 != 0,
            delete_bundle: value & 0x08 != 0,
            unrecognised: value & !0x0F,
        }
    }
}

impl dtn_cbor::encode::ToCbor for Flags {
    type Result = ();

    fn to_cbor(&self, encoder: &mut dtn_cbor::encode::Encoder) -> Self::Result {
        encoder.emit(&u64::from(self))
    }
}

impl dtn_cbor::decode::FromCbor for Flags {
    type Error = dtn_cbor::decode::Error;

    fn from_cbor(data: &[u8]) -> Result<(Self, bool, usize), Self::Error> {
        u64::from_cbor(data).map(|(v, shortest, len)| (v.into(), shortest, len))
    }
}

/// The decoded, type-specific value of a canonical block.
pub trait ExtensionBlockData: Debug + Send + Sync {
    /// Serializes the block-specific value to its inner CBOR encoding (the
    /// bytes that are themselves wrapped in the canonical block's outer
    /// CBOR byte string).
    fn to_cbor_bytes(&self) -> Vec<u8>;

    fn as_any(&self) -> &dyn Any;

    /// The block type code this value should be written under if it was
    /// not decoded from the wire (used by the builder).
    fn block_type(&self) -> u64;
}

/// A fully decoded canonical block.
#[derive(Debug)]
pub struct CanonicalBlock {
    pub block_type: u64,
    pub block_number: u64,
    pub flags: Flags,
    pub crc_type: CrcType,
    pub data: Box<dyn ExtensionBlockData>,
}

impl CanonicalBlock {
    pub(crate) fn emit(&self, array: &mut dtn_cbor::encode::Array) {
        let inner = self.data.to_cbor_bytes();
        let body = dtn_cbor::encode::emit_array(
            Some(if self.crc_type.is_none() { 5 } else { 6 }),
            |a| {
                a.emit(&self.block_type);
                a.emit(&self.block_number);
                a.emit(&self.flags);
                a.emit(&self.crc_type);
                a.emit(&dtn_cbor::encode::Bytes(&inner));
                if !self.crc_type.is_none() {
                    a.skip_value();
                }
            },
        );
        array.emit(&dtn_cbor::encode::Raw(&crate::crc::append(
            self.crc_type,
            body,
        )));
    }

    /// Parses a single canonical block, looking up its type code in
    /// `registry` to construct the concrete extension value.
    pub(crate) fn parse(data: &[u8], registry: &Registry) -> Result<(Self, bool, usize), Error> {
        let mut crc_type = CrcType::None;
        let result = dtn_cbor::decode::parse_array(data, |arr, shortest, tags| {
            let mut shortest = shortest && tags.is_empty() && arr.is_definite();

            let (block_type, s) = arr.parse::<u64>().map_field_err("block type code")?;
            shortest = shortest && s;

            let (block_number, s) = arr.parse::<u64>().map_field_err("block number")?;
            shortest = shortest && s;
            if block_number == 0 {
                return Err(Error::DuplicateBlock("block number 0 is reserved"));
            }
            if (block_number == 1) != (block_type == TYPE_PAYLOAD) {
                return Err(Error::DuplicateBlock("payload block must be block number 1"));
            }

            let (flags, s) = arr.parse::<Flags>().map_field_err("block flags")?;
            shortest = shortest && s;
            if flags.unrecognised != 0 {
                return Err(Error::InvalidFlagBits);
            }

            let (parsed_crc_type, s) = arr.parse::<CrcType>().map_field_err("CRC type")?;
            crc_type = parsed_crc_type;
            shortest = shortest && s;

            let (inner, s) = arr
                .parse_value(|value, s, tags| match value {
                    Value::Bytes(r) => Ok((r, s && tags.is_empty())),
                    v => Err(dtn_cbor::decode::Error::IncorrectType(
                        "Byte String".to_string(),
                        v.type_name(!tags.is_empty()),
                    )),
                })
                .map_field_err("block data")?;
            shortest = shortest && s;

            if !crc_type.is_none() {
                arr.skip_value()?;
            }

            let ext_data = registry.construct(block_type, &data[inner.clone()])?;

            Ok::<_, Error>((
                CanonicalBlock {
                    block_type,
                    block_number,
                    flags,
                    crc_type,
                    data: ext_data,
                },
                shortest,
            ))
        })?;
        let ((block, shortest), len) = result;
        crate::crc::verify(crc_type, &data[..len])?;
        Ok((block, shortest, len))
    }
}
