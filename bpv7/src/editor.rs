//! A small editor for rewriting a bundle's fragment framing and block
//! contents in place, used by the fragmentation and reassembly engine.

use crate::block::{CanonicalBlock, ExtensionBlockData, PayloadData, TYPE_PAYLOAD};
use crate::bundle::Bundle;
use crate::primary::FragmentInfo;

/// Consumes a [`Bundle`] and rebuilds it with edited fragment framing
/// and/or block contents.
pub struct Editor {
    primary: crate::primary::PrimaryBlock,
    blocks: Vec<CanonicalBlock>,
}

impl Editor {
    pub fn new(bundle: Bundle) -> Self {
        Self {
            primary: bundle.primary,
            blocks: bundle.blocks,
        }
    }

    /// Sets (or clears) the primary block's fragment offset/total length,
    /// updating the `IsFragment` flag to match.
    pub fn with_fragment_info(mut self, info: Option<FragmentInfo>) -> Self {
        self.primary.flags.is_fragment = info.is_some();
        self.primary.fragment_info = info;
        self
    }

    /// Replaces the payload block's data.
    pub fn with_payload(mut self, data: Vec<u8>) -> Self {
        if let Some(b) = self
            .blocks
            .iter_mut()
            .find(|b| b.block_type == TYPE_PAYLOAD)
        {
            b.data = Box::new(PayloadData(data));
        }
        self
    }

    /// Begins editing the canonical block numbered `block_number`. The
    /// block must already exist; use [`Editor::with_payload`] to add the
    /// mandatory payload block.
    pub fn update_block(self, block_number: u64) -> BlockEditor {
        BlockEditor {
            editor: self,
            block_number,
        }
    }

    /// Removes the canonical block numbered `block_number`, if present.
    pub fn remove_block(mut self, block_number: u64) -> Self {
        self.blocks.retain(|b| b.block_number != block_number);
        self
    }

    pub fn rebuild(self) -> Bundle {
        Bundle {
            primary: self.primary,
            blocks: self.blocks,
        }
    }
}

/// A handle for replacing the data of a single canonical block, returned
/// by [`Editor::update_block`].
pub struct BlockEditor {
    editor: Editor,
    block_number: u64,
}

impl BlockEditor {
    /// Replaces the targeted block's extension data, returning control to
    /// the [`Editor`].
    pub fn with_data(mut self, data: Box<dyn ExtensionBlockData>) -> Editor {
        if let Some(b) = self
            .editor
            .blocks
            .iter_mut()
            .find(|b| b.block_number == self.block_number)
        {
            b.data = data;
        }
        self.editor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BundleAgeData;
    use crate::builder::Builder;
    use crate::creation_timestamp::CreationTimestamp;
    use crate::eid::Eid;
    use core::str::FromStr;

    fn sample() -> Bundle {
        Builder::new()
            .source(Eid::from_str("ipn:1.1").unwrap())
            .destination(Eid::from_str("ipn:2.1").unwrap())
            .creation_timestamp(CreationTimestamp::epoch())
            .bundle_age_block(0)
            .payload_block(b"0123456789".to_vec())
            .build()
            .unwrap()
    }

    #[test]
    fn sets_fragment_info() {
        let bundle = Editor::new(sample())
            .with_fragment_info(Some(FragmentInfo {
                offset: 0,
                total_data_length: 10,
            }))
            .rebuild();
        assert!(bundle.primary.flags.is_fragment);
        assert_eq!(bundle.primary.fragment_info.unwrap().total_data_length, 10);
    }

    #[test]
    fn replaces_payload() {
        let bundle = Editor::new(sample()).with_payload(b"short".to_vec()).rebuild();
        assert_eq!(bundle.payload().unwrap().0, b"short");
    }

    #[test]
    fn updates_named_block() {
        let bundle = sample();
        let age_block_number = bundle
            .blocks
            .iter()
            .find(|b| b.block_type == crate::block::TYPE_BUNDLE_AGE)
            .unwrap()
            .block_number;
        let bundle = Editor::new(bundle)
            .update_block(age_block_number)
            .with_data(Box::new(BundleAgeData(42)))
            .rebuild();
        let age = bundle
            .blocks
            .iter()
            .find(|b| b.block_type == crate::block::TYPE_BUNDLE_AGE)
            .unwrap();
        assert_eq!(
            age.data.as_any().downcast_ref::<BundleAgeData>().unwrap().0,
            42
        );
    }
}
