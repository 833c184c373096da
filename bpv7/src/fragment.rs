//! Splitting an oversized bundle into MTU-bounded fragments, and
//! reassembling a complete bundle from the fragments that arrive.
//!
//! A fragment is a bundle in its own right: its primary block carries the
//! offset and total application data length of the slice it holds, and
//! its extension blocks are either replicated into every fragment (those
//! flagged [`crate::block::Flags::replicate_block`]) or carried only in
//! the first fragment.

use std::collections::BTreeMap;

use crate::block::{CanonicalBlock, Flags as BlockFlags, PayloadData, TYPE_PAYLOAD};
use crate::bundle::Bundle;
use crate::error::Error;
use crate::primary::FragmentInfo;
use crate::registry::Registry;

fn clone_block(block: &CanonicalBlock, registry: &Registry) -> Result<CanonicalBlock, Error> {
    let data = registry.construct(block.block_type, &block.data.to_cbor_bytes())?;
    Ok(CanonicalBlock {
        block_type: block.block_type,
        block_number: block.block_number,
        flags: block.flags,
        crc_type: block.crc_type,
        data,
    })
}

fn clone_bundle(bundle: &Bundle, registry: &Registry) -> Result<Bundle, Error> {
    let blocks = bundle
        .blocks
        .iter()
        .map(|b| clone_block(b, registry))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Bundle {
        primary: bundle.primary.clone(),
        blocks,
    })
}

/// Computes the wire size of a fragment carrying `chunk_len` payload bytes,
/// without allocating a copy of the real payload (the content of a CBOR
/// byte string doesn't affect its length prefix, only the count does).
fn probe_fragment_len(
    primary: &crate::primary::PrimaryBlock,
    extensions: &[&CanonicalBlock],
    payload_flags: BlockFlags,
    crc_type: crate::crc::CrcType,
    chunk_len: usize,
) -> usize {
    let payload_block = CanonicalBlock {
        block_type: TYPE_PAYLOAD,
        block_number: 1,
        flags: payload_flags,
        crc_type,
        data: Box::new(PayloadData(vec![0u8; chunk_len])),
    };
    dtn_cbor::encode::emit_array(None, |a| {
        primary.emit(a);
        for b in extensions {
            b.emit(a);
        }
        payload_block.emit(a);
    })
    .len()
}

/// Returns the largest `n <= remaining` such that a fragment built from
/// `primary`/`extensions` with an `n`-byte payload chunk fits in `mtu`
/// bytes, or `None` if even an empty chunk doesn't fit.
fn largest_chunk_that_fits(
    primary: &crate::primary::PrimaryBlock,
    extensions: &[&CanonicalBlock],
    payload_flags: BlockFlags,
    crc_type: crate::crc::CrcType,
    remaining: usize,
    mtu: usize,
) -> Option<usize> {
    if probe_fragment_len(primary, extensions, payload_flags, crc_type, 0) > mtu {
        return None;
    }
    let (mut lo, mut hi) = (0usize, remaining);
    while lo < hi {
        let mid = lo + (hi - lo + 1) / 2;
        if probe_fragment_len(primary, extensions, payload_flags, crc_type, mid) <= mtu {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    Some(lo)
}

/// Splits `bundle` into a sequence of fragments, none of which encodes to
/// more than `mtu` bytes. If `bundle` already fits within `mtu`, returns a
/// single-element vector holding an unfragmented copy.
pub fn fragment(bundle: &Bundle, mtu: usize, registry: &Registry) -> Result<Vec<Bundle>, Error> {
    if bundle.primary.flags.must_not_fragment {
        return Err(Error::MustNotFragmented);
    }
    if bundle.to_cbor().len() <= mtu {
        return Ok(vec![clone_bundle(bundle, registry)?]);
    }

    let payload_block = bundle
        .blocks
        .iter()
        .find(|b| b.block_type == TYPE_PAYLOAD)
        .ok_or(Error::MissingPayload)?;
    let payload = &payload_block
        .data
        .as_any()
        .downcast_ref::<PayloadData>()
        .ok_or(Error::MissingPayload)?
        .0;
    let whole_length = payload.len() as u64;

    let replicated: Vec<&CanonicalBlock> = bundle
        .blocks
        .iter()
        .filter(|b| b.block_type != TYPE_PAYLOAD && b.flags.replicate_block)
        .collect();
    let first_only: Vec<&CanonicalBlock> = bundle
        .blocks
        .iter()
        .filter(|b| b.block_type != TYPE_PAYLOAD && !b.flags.replicate_block)
        .collect();

    let mut fragments = Vec::new();
    let mut offset = 0usize;
    while (offset as u64) < whole_length {
        let extensions: Vec<&CanonicalBlock> = if offset == 0 {
            first_only.iter().chain(replicated.iter()).copied().collect()
        } else {
            replicated.clone()
        };

        let mut primary = bundle.primary.clone();
        primary.flags.is_fragment = true;
        primary.fragment_info = Some(FragmentInfo {
            offset: offset as u64,
            total_data_length: whole_length,
        });

        let remaining = payload.len() - offset;
        let chunk_len = largest_chunk_that_fits(
            &primary,
            &extensions,
            payload_block.flags,
            payload_block.crc_type,
            remaining,
            mtu,
        )
        .ok_or(Error::FragmentOverhead(mtu))?;
        if chunk_len == 0 {
            return Err(Error::FragmentOverhead(mtu));
        }

        let mut blocks = extensions
            .iter()
            .map(|b| clone_block(b, registry))
            .collect::<Result<Vec<_>, _>>()?;
        blocks.push(CanonicalBlock {
            block_type: TYPE_PAYLOAD,
            block_number: 1,
            flags: payload_block.flags,
            crc_type: payload_block.crc_type,
            data: Box::new(PayloadData(payload[offset..offset + chunk_len].to_vec())),
        });

        fragments.push(Bundle { primary, blocks });
        offset += chunk_len;
    }

    Ok(fragments)
}

/// Accumulates fragments of a single bundle until the whole payload has
/// arrived, then rebuilds the original.
#[derive(Debug, Default)]
pub struct Reassembler {
    total_length: Option<u64>,
    parts: BTreeMap<u64, Vec<u8>>,
    payload_flags: Option<BlockFlags>,
    primary_template: Option<crate::primary::PrimaryBlock>,
    extension_blocks: Option<Vec<CanonicalBlock>>,
}

impl Reassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a single fragment into the reassembler. `fragment` must carry
    /// fragment info (`Bundle::primary::fragment_info`); fragments of
    /// different bundles must not be mixed into the same reassembler.
    pub fn add_fragment(&mut self, fragment: Bundle) -> Result<(), Error> {
        let info = fragment
            .primary
            .fragment_info
            .ok_or(Error::InvalidFlagBits)?;
        if let Some(total) = self.total_length {
            if total != info.total_data_length {
                return Err(Error::TransmissionSequence);
            }
        } else {
            self.total_length = Some(info.total_data_length);
        }

        let Bundle {
            mut primary,
            mut blocks,
        } = fragment;
        let payload_pos = blocks
            .iter()
            .position(|b| b.block_type == TYPE_PAYLOAD)
            .ok_or(Error::MissingPayload)?;
        let payload_block = blocks.remove(payload_pos);
        let payload = payload_block
            .data
            .as_any()
            .downcast_ref::<PayloadData>()
            .ok_or(Error::MissingPayload)?
            .0
            .clone();
        self.payload_flags = Some(payload_block.flags);
        self.parts.insert(info.offset, payload);

        if info.offset == 0 {
            primary.flags.is_fragment = false;
            primary.fragment_info = None;
            self.primary_template = Some(primary);
            self.extension_blocks = Some(blocks);
        }

        Ok(())
    }

    /// `true` once every byte of the original payload has arrived with no
    /// gaps or overlaps.
    pub fn is_complete(&self) -> bool {
        let Some(total) = self.total_length else {
            return false;
        };
        let mut expect = 0u64;
        for (&offset, data) in &self.parts {
            if offset != expect {
                return false;
            }
            expect += data.len() as u64;
        }
        expect == total
    }

    /// Rebuilds the original, unfragmented bundle. Fails if fragments are
    /// still missing, or if the first fragment (offset 0, which alone
    /// carries the non-replicated extension blocks) hasn't arrived yet.
    pub fn reassemble(self) -> Result<Bundle, Error> {
        if !self.is_complete() {
            return Err(Error::TransmissionSequence);
        }
        let primary = self
            .primary_template
            .ok_or(Error::TransmissionStateUnknown)?;
        let mut blocks = self
            .extension_blocks
            .ok_or(Error::TransmissionStateUnknown)?;
        let total_length = self.total_length.unwrap_or(0) as usize;
        let mut payload = Vec::with_capacity(total_length);
        for (_, data) in self.parts {
            payload.extend(data);
        }
        blocks.push(CanonicalBlock {
            block_type: TYPE_PAYLOAD,
            block_number: 1,
            flags: self.payload_flags.unwrap_or_default(),
            crc_type: primary.crc_type,
            data: Box::new(PayloadData(payload)),
        });

        let bundle = Bundle { primary, blocks };
        bundle.validate()?;
        Ok(bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;
    use crate::creation_timestamp::CreationTimestamp;
    use crate::eid::Eid;
    use core::str::FromStr;

    fn big_bundle() -> Bundle {
        Builder::new()
            .source(Eid::from_str("ipn:1.1").unwrap())
            .destination(Eid::from_str("ipn:2.1").unwrap())
            .creation_timestamp(CreationTimestamp::epoch())
            .bundle_age_block(0)
            .hop_count_block(32)
            .payload_block(vec![b'x'; 500])
            .build()
            .unwrap()
    }

    #[test]
    fn small_bundle_is_not_fragmented() {
        let bundle = big_bundle();
        let registry = Registry::new();
        let fragments = fragment(&bundle, 4096, &registry).unwrap();
        assert_eq!(fragments.len(), 1);
        assert!(!fragments[0].primary.flags.is_fragment);
    }

    #[test]
    fn fragments_and_reassembles() {
        let bundle = big_bundle();
        let registry = Registry::new();
        let fragments = fragment(&bundle, 120, &registry).unwrap();
        assert!(fragments.len() > 1);
        for f in &fragments {
            assert!(f.to_cbor().len() <= 120);
            assert!(f.primary.flags.is_fragment);
        }

        // Feed the fragments to the reassembler out of order.
        let mut shuffled: Vec<Bundle> = fragments;
        shuffled.reverse();
        let mut reassembler = Reassembler::new();
        for (i, f) in shuffled.into_iter().enumerate() {
            reassembler.add_fragment(f).unwrap();
            if i == 0 {
                assert!(!reassembler.is_complete());
            }
        }
        assert!(reassembler.is_complete());
        let rebuilt = reassembler.reassemble().unwrap();
        assert_eq!(rebuilt.payload().unwrap().0, vec![b'x'; 500]);
        assert!(
            rebuilt
                .blocks
                .iter()
                .any(|b| b.block_type == crate::block::TYPE_HOP_COUNT)
        );
    }

    #[test]
    fn must_not_fragment_is_honored() {
        let mut bundle = big_bundle();
        bundle.primary.flags.must_not_fragment = true;
        let registry = Registry::new();
        assert!(matches!(
            fragment(&bundle, 100, &registry),
            Err(Error::MustNotFragmented)
        ));
    }

    #[test]
    fn must_not_fragment_rejects_even_when_it_would_already_fit() {
        let mut bundle = big_bundle();
        bundle.primary.flags.must_not_fragment = true;
        let registry = Registry::new();
        // The bundle comfortably fits under this MTU; must_not_fragment
        // still has to take precedence over the already-fits shortcut.
        assert!(matches!(
            fragment(&bundle, 100_000, &registry),
            Err(Error::MustNotFragmented)
        ));
    }

    #[test]
    fn mtu_too_small_for_overhead_errors() {
        let bundle = big_bundle();
        let registry = Registry::new();
        assert!(fragment(&bundle, 10, &registry).is_err());
    }
}
