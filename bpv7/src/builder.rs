//! A fluent builder for constructing well-formed bundles.

use crate::block::{
    BundleAgeData, CanonicalBlock, Flags as BlockFlags, HopCountData, PayloadData,
    PreviousNodeData, TYPE_PAYLOAD,
};
use crate::bundle::Bundle;
use crate::creation_timestamp::CreationTimestamp;
use crate::crc::CrcType;
use crate::eid::Eid;
use crate::error::Error;
use crate::primary::{Flags as BundleFlags, PrimaryBlock};

const DEFAULT_CRC_TYPE: CrcType = CrcType::Crc32Castagnoli;
const DEFAULT_LIFETIME_MS: u64 = 24 * 60 * 60 * 1000;

/// Builds a [`Bundle`] field by field, defaulting the CRC type to
/// CRC-32/Castagnoli and the lifetime to 24 hours, as most deployments do.
///
/// Per spec §7, the source and destination are mandatory and the payload
/// is mandatory; `build()` reports the first missing one rather than
/// defaulting silently or panicking.
pub struct Builder {
    flags: BundleFlags,
    crc_type: CrcType,
    source: Option<Eid>,
    destination: Option<Eid>,
    report_to: Option<Eid>,
    creation_timestamp: Option<CreationTimestamp>,
    lifetime: u64,
    payload: Option<CanonicalBlock>,
    extensions: Vec<CanonicalBlock>,
    next_block_number: u64,
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            flags: BundleFlags::default(),
            crc_type: DEFAULT_CRC_TYPE,
            source: None,
            destination: None,
            report_to: None,
            creation_timestamp: None,
            lifetime: DEFAULT_LIFETIME_MS,
            payload: None,
            extensions: Vec::new(),
            next_block_number: 2,
        }
    }
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(mut self, source: Eid) -> Self {
        self.source = Some(source);
        self
    }

    pub fn destination(mut self, destination: Eid) -> Self {
        self.destination = Some(destination);
        self
    }

    pub fn report_to(mut self, report_to: Eid) -> Self {
        self.report_to = Some(report_to);
        self
    }

    pub fn creation_timestamp(mut self, timestamp: CreationTimestamp) -> Self {
        self.creation_timestamp = Some(timestamp);
        self
    }

    pub fn creation_timestamp_now(self) -> Self {
        self.creation_timestamp(CreationTimestamp::now())
    }

    pub fn creation_timestamp_epoch(self) -> Self {
        self.creation_timestamp(CreationTimestamp::epoch())
    }

    pub fn creation_timestamp_time(self, time: time::OffsetDateTime) -> Self {
        self.creation_timestamp(CreationTimestamp::new_sequential(time))
    }

    pub fn lifetime(mut self, lifetime: u64) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn bundle_ctrl_flags(mut self, flags: BundleFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn crc(mut self, crc_type: CrcType) -> Self {
        self.crc_type = crc_type;
        self
    }

    fn next_number(&mut self) -> u64 {
        let n = self.next_block_number;
        self.next_block_number += 1;
        n
    }

    /// Adds an arbitrary canonical block carrying `data`, with explicit
    /// block control flags.
    pub fn canonical_with_flags(
        mut self,
        data: Box<dyn crate::block::ExtensionBlockData>,
        flags: BlockFlags,
    ) -> Self {
        let block_type = data.block_type();
        let block_number = self.next_number();
        self.extensions.push(CanonicalBlock {
            block_type,
            block_number,
            flags,
            crc_type: self.crc_type,
            data,
        });
        self
    }

    /// Adds an arbitrary canonical block carrying `data`, with default
    /// (non-replicated) block control flags.
    pub fn canonical(self, data: Box<dyn crate::block::ExtensionBlockData>) -> Self {
        self.canonical_with_flags(data, BlockFlags::default())
    }

    pub fn bundle_age_block_with_flags(self, age_millisecs: u64, flags: BlockFlags) -> Self {
        self.canonical_with_flags(Box::new(BundleAgeData(age_millisecs)), flags)
    }

    pub fn bundle_age_block(self, age_millisecs: u64) -> Self {
        self.bundle_age_block_with_flags(age_millisecs, BlockFlags::replicated())
    }

    pub fn hop_count_block_with_flags(self, limit: u64, flags: BlockFlags) -> Self {
        self.canonical_with_flags(Box::new(HopCountData { limit, count: 0 }), flags)
    }

    pub fn hop_count_block(self, limit: u64) -> Self {
        self.hop_count_block_with_flags(limit, BlockFlags::replicated())
    }

    pub fn previous_node_block_with_flags(self, node: Eid, flags: BlockFlags) -> Self {
        self.canonical_with_flags(Box::new(PreviousNodeData(node)), flags)
    }

    pub fn previous_node_block(self, node: Eid) -> Self {
        self.previous_node_block_with_flags(node, BlockFlags::replicated())
    }

    pub fn payload_block_with_flags(mut self, data: Vec<u8>, flags: BlockFlags) -> Self {
        self.payload = Some(CanonicalBlock {
            block_type: TYPE_PAYLOAD,
            block_number: 1,
            flags,
            crc_type: self.crc_type,
            data: Box::new(PayloadData(data)),
        });
        self
    }

    pub fn payload_block(self, data: Vec<u8>) -> Self {
        self.payload_block_with_flags(data, BlockFlags::default())
    }

    /// Assembles the accumulated fields into a [`Bundle`], with the
    /// payload block emitted last as block number 1.
    ///
    /// Returns the first of: a missing source, a missing destination, or a
    /// missing payload block, per spec §7/§4.D — none of these are
    /// defaulted or allowed to panic.
    pub fn build(self) -> Result<Bundle, Error> {
        let source = self.source.ok_or(Error::InvalidField {
            field: "source",
            source: "source endpoint is mandatory".into(),
        })?;
        let destination = self.destination.ok_or(Error::InvalidField {
            field: "destination",
            source: "destination endpoint is mandatory".into(),
        })?;
        let payload = self.payload.ok_or(Error::MissingPayload)?;

        let report_to = self.report_to.unwrap_or_else(|| source.clone());
        let primary = PrimaryBlock {
            flags: self.flags,
            crc_type: self.crc_type,
            destination,
            source,
            report_to,
            creation_timestamp: self.creation_timestamp.unwrap_or_else(CreationTimestamp::now),
            lifetime: self.lifetime,
            fragment_info: None,
        };

        let mut blocks = self.extensions;
        blocks.push(payload);

        Ok(Bundle { primary, blocks })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;

    #[test]
    fn builds_minimal_bundle() {
        let bundle = Builder::new()
            .source(Eid::from_str("ipn:1.0").unwrap())
            .destination(Eid::from_str("ipn:2.0").unwrap())
            .creation_timestamp(CreationTimestamp::epoch())
            .bundle_age_block(0)
            .payload_block(b"hello".to_vec())
            .build()
            .unwrap();

        assert_eq!(bundle.blocks.len(), 2);
        assert_eq!(bundle.blocks.last().unwrap().block_number, 1);
        assert!(bundle.to_cbor().len() > 0);
    }

    #[test]
    fn build_without_payload_fails() {
        let err = Builder::new()
            .source(Eid::from_str("ipn:1.0").unwrap())
            .destination(Eid::from_str("ipn:2.0").unwrap())
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::MissingPayload));
    }

    #[test]
    fn build_without_source_fails() {
        let err = Builder::new()
            .destination(Eid::from_str("ipn:2.0").unwrap())
            .payload_block(b"hello".to_vec())
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidField { field: "source", .. }));
    }

    #[test]
    fn build_without_destination_fails() {
        let err = Builder::new()
            .source(Eid::from_str("ipn:1.0").unwrap())
            .payload_block(b"hello".to_vec())
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidField {
                field: "destination",
                ..
            }
        ));
    }

    #[test]
    fn creation_timestamp_epoch_sets_no_reliable_clock() {
        let bundle = Builder::new()
            .source(Eid::from_str("ipn:1.0").unwrap())
            .destination(Eid::from_str("ipn:2.0").unwrap())
            .creation_timestamp_epoch()
            .bundle_age_block(0)
            .payload_block(b"hello".to_vec())
            .build()
            .unwrap();
        assert!(bundle.primary.creation_timestamp.creation_time().is_none());
    }
}
