//! The bundle: a primary block plus its canonical (extension) blocks,
//! and the small, stable key ([`Id`]) used to identify one across stores
//! and fragments.

use crate::block::{self, CanonicalBlock};
use crate::creation_timestamp::CreationTimestamp;
use crate::eid::Eid;
use crate::error::{CaptureFieldErr, Error};
use crate::primary::{FragmentInfo, PrimaryBlock};
use crate::registry::Registry;
use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD;

/// The stable identity of a bundle: its source, creation timestamp, and
/// (for a fragment) the offset and total length it was cut from. Two
/// bundles with the same `Id` are the same bundle, or fragments of it.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct Id {
    pub source: Eid,
    pub timestamp: CreationTimestamp,
    pub fragment_info: Option<FragmentInfo>,
}

impl Id {
    /// A compact, URL-safe textual key suitable for use as a store lookup
    /// key (base64, no padding, of the CBOR encoding of the id's fields).
    pub fn to_key(&self) -> String {
        let bytes = if let Some(frag) = &self.fragment_info {
            dtn_cbor::encode::emit_array(Some(4), |a| {
                a.emit(&self.source);
                a.emit(&self.timestamp);
                a.emit(&frag.offset);
                a.emit(&frag.total_data_length);
            })
        } else {
            dtn_cbor::encode::emit_array(Some(2), |a| {
                a.emit(&self.source);
                a.emit(&self.timestamp);
            })
        };
        STANDARD_NO_PAD.encode(bytes)
    }

    pub fn from_key(key: &str) -> Result<Self, Error> {
        let bytes = STANDARD_NO_PAD
            .decode(key)
            .map_err(|e| Error::InvalidField {
                field: "bundle id key",
                source: Box::new(e),
            })?;
        dtn_cbor::decode::parse_array(&bytes, |a, _, _| {
            let (source, _) = a.parse::<Eid>().map_field_err("source")?;
            let (timestamp, _) = a.parse::<CreationTimestamp>().map_field_err("timestamp")?;
            let fragment_info = if a.len() == Some(4) {
                let (offset, _) = a.parse::<u64>().map_field_err("fragment offset")?;
                let (total_data_length, _) =
                    a.parse::<u64>().map_field_err("total data length")?;
                Some(FragmentInfo {
                    offset,
                    total_data_length,
                })
            } else {
                None
            };
            Ok::<_, Error>(Self {
                source,
                timestamp,
                fragment_info,
            })
        })
        .map(|(v, _)| v)
    }
}

/// A fully parsed bundle: a primary block and its ordered canonical blocks.
#[derive(Debug)]
pub struct Bundle {
    pub primary: PrimaryBlock,
    pub blocks: Vec<CanonicalBlock>,
}

impl Bundle {
    pub fn id(&self) -> Id {
        Id {
            source: self.primary.source.clone(),
            timestamp: self.primary.creation_timestamp,
            fragment_info: self.primary.fragment_info,
        }
    }

    pub fn payload(&self) -> Option<&block::PayloadData> {
        self.blocks
            .iter()
            .find(|b| b.block_type == block::TYPE_PAYLOAD)
            .and_then(|b| b.data.as_any().downcast_ref())
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        self.primary.validate()?;

        let mut numbers = std::collections::HashSet::with_capacity(self.blocks.len());
        let mut unique_seen = std::collections::HashSet::with_capacity(4);
        for (i, b) in self.blocks.iter().enumerate() {
            if !numbers.insert(b.block_number) {
                return Err(Error::DuplicateBlock("duplicate block number"));
            }
            let is_unique_type = matches!(
                b.block_type,
                block::TYPE_PAYLOAD
                    | block::TYPE_PREVIOUS_NODE
                    | block::TYPE_BUNDLE_AGE
                    | block::TYPE_HOP_COUNT
            );
            if is_unique_type && !unique_seen.insert(b.block_type) {
                return Err(Error::DuplicateBlock(
                    "duplicate Payload/PreviousNode/BundleAge/HopCount block",
                ));
            }
            if b.block_type == block::TYPE_PAYLOAD && i != self.blocks.len() - 1 {
                return Err(Error::MissingPayload);
            }
        }
        if !self
            .blocks
            .iter()
            .any(|b| b.block_type == block::TYPE_PAYLOAD)
        {
            return Err(Error::MissingPayload);
        }
        if self.primary.creation_timestamp.creation_time().is_none()
            && !self
                .blocks
                .iter()
                .any(|b| b.block_type == block::TYPE_BUNDLE_AGE)
        {
            return Err(Error::InvalidField {
                field: "bundle age block",
                source: "required when the creation timestamp has no reliable clock".into(),
            });
        }
        Ok(())
    }

    /// Serializes the bundle as the indefinite-length CBOR array the wire
    /// format uses: `0x9F`, primary block, each canonical block in order,
    /// `0xFF`.
    pub fn to_cbor(&self) -> Vec<u8> {
        dtn_cbor::encode::emit_array(None, |array| {
            self.primary.emit(array);
            for block in &self.blocks {
                block.emit(array);
            }
        })
    }

    /// Parses a bundle from its wire encoding, constructing extension
    /// block values via `registry`.
    pub fn from_cbor(data: &[u8], registry: &Registry) -> Result<Self, Error> {
        let (bundle, len) = dtn_cbor::decode::parse_array(data, |array, _shortest, _tags| {
            let block_start = array.offset();
            let (primary, _, _) = PrimaryBlock::parse(&data[block_start..])?;
            array.skip_value()?;

            let mut blocks = Vec::new();
            while array.end()?.is_none() {
                let block_start = array.offset();
                let (block, _, _) = CanonicalBlock::parse(&data[block_start..], registry)?;
                array.skip_value()?;
                blocks.push(block);
            }

            Ok::<_, Error>(Bundle { primary, blocks })
        })?;
        if len != data.len() {
            return Err(Error::InvalidField {
                field: "bundle",
                source: "trailing data after bundle array".into(),
            });
        }
        bundle.validate()?;
        Ok(bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{BundleAgeData, PayloadData};
    use crate::primary::Flags as BundleFlags;
    use core::str::FromStr;

    fn simple_bundle() -> Bundle {
        Bundle {
            primary: PrimaryBlock {
                flags: BundleFlags::default(),
                crc_type: crate::crc::CrcType::Crc32Castagnoli,
                destination: Eid::from_str("ipn:2.1").unwrap(),
                source: Eid::from_str("ipn:1.1").unwrap(),
                report_to: Eid::null(),
                creation_timestamp: CreationTimestamp::epoch(),
                lifetime: 3600_000,
                fragment_info: None,
            },
            blocks: vec![
                CanonicalBlock {
                    block_type: block::TYPE_BUNDLE_AGE,
                    block_number: 2,
                    flags: block::Flags::replicated(),
                    crc_type: crate::crc::CrcType::None,
                    data: Box::new(BundleAgeData(0)),
                },
                CanonicalBlock {
                    block_type: block::TYPE_PAYLOAD,
                    block_number: 1,
                    flags: block::Flags::default(),
                    crc_type: crate::crc::CrcType::None,
                    data: Box::new(PayloadData(b"hello".to_vec())),
                },
            ],
        }
    }

    #[test]
    fn round_trips_cbor() {
        let bundle = simple_bundle();
        let bytes = bundle.to_cbor();
        let registry = Registry::new();
        let decoded = Bundle::from_cbor(&bytes, &registry).unwrap();
        assert_eq!(decoded.blocks.len(), 2);
        assert_eq!(
            decoded.payload().unwrap().0,
            b"hello"
        );
    }

    #[test]
    fn id_round_trips_through_key() {
        let id = simple_bundle().id();
        let key = id.to_key();
        assert_eq!(Id::from_key(&key).unwrap(), id);
    }

    #[test]
    fn rejects_payload_not_last() {
        let mut bundle = simple_bundle();
        bundle.blocks.reverse();
        let bytes = bundle.to_cbor();
        let registry = Registry::new();
        assert!(Bundle::from_cbor(&bytes, &registry).is_err());
    }
}
