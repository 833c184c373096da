//! The extension-block registry: a process-wide map from block type code
//! to a constructor for that block's concrete value. Unregistered codes
//! fall back to a generic, opaque block rather than failing to decode.

use crate::block::ExtensionBlockData;
use crate::error::Error;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// A constructor for a block type's concrete value from its inner CBOR
/// encoding (the content of the canonical block's byte string field).
pub type Factory = Arc<dyn Fn(&[u8]) -> Result<Box<dyn ExtensionBlockData>, Error> + Send + Sync>;

struct Inner {
    factories: HashMap<u64, Factory>,
}

impl Default for Inner {
    fn default() -> Self {
        let mut factories: HashMap<u64, Factory> = HashMap::new();
        factories.insert(crate::block::TYPE_PAYLOAD, Arc::new(crate::block::payload::factory));
        factories.insert(
            crate::block::TYPE_PREVIOUS_NODE,
            Arc::new(crate::block::previous_node::factory),
        );
        factories.insert(
            crate::block::TYPE_BUNDLE_AGE,
            Arc::new(crate::block::bundle_age::factory),
        );
        factories.insert(
            crate::block::TYPE_HOP_COUNT,
            Arc::new(crate::block::hop_count::factory),
        );
        Self { factories }
    }
}

/// The extension-block type registry. Default-constructs with the four
/// well-known block types registered (spec §4.C); the signature block and
/// any application-specific blocks must be registered explicitly before
/// decoding bundles that contain them.
pub struct Registry {
    inner: RwLock<Inner>,
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory for `block_type`. Fails if the code is already
    /// registered.
    pub fn register(&self, block_type: u64, factory: Factory) -> Result<(), Error> {
        let mut inner = self.inner.write().expect("registry lock poisoned");
        if inner.factories.contains_key(&block_type) {
            return Err(Error::RegistryConflict(block_type));
        }
        inner.factories.insert(block_type, factory);
        Ok(())
    }

    /// Registers the Ed25519 signature block factory under `block_type`
    /// (see [`crate::block::TYPE_SIGNATURE_DEFAULT`] for a suggested code).
    pub fn register_signature_block(&self, block_type: u64) -> Result<(), Error> {
        self.register(block_type, Arc::new(crate::block::signature::factory))
    }

    /// Removes a previously registered factory, returning whether one was
    /// present.
    pub fn deregister(&self, block_type: u64) -> bool {
        let mut inner = self.inner.write().expect("registry lock poisoned");
        inner.factories.remove(&block_type).is_some()
    }

    /// Constructs the concrete value for `block_type` from its inner CBOR
    /// bytes, falling back to [`crate::block::GenericData`] when no
    /// factory is registered.
    pub fn construct(
        &self,
        block_type: u64,
        data: &[u8],
    ) -> Result<Box<dyn ExtensionBlockData>, Error> {
        let factory = {
            let inner = self.inner.read().expect("registry lock poisoned");
            inner.factories.get(&block_type).cloned()
        };
        match factory {
            Some(f) => f(data),
            None => crate::block::generic::factory(block_type, data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registrations_are_present() {
        let r = Registry::new();
        assert!(matches!(
            r.register(crate::block::TYPE_PAYLOAD, Arc::new(crate::block::payload::factory)),
            Err(Error::RegistryConflict(1))
        ));
    }

    #[test]
    fn unknown_code_falls_back_to_generic() {
        let r = Registry::new();
        let (bytes, _) = dtn_cbor::encode::emit(&dtn_cbor::encode::Bytes(&b"hi"[..]));
        let block = r.construct(200, &bytes).unwrap();
        let generic = block
            .as_any()
            .downcast_ref::<crate::block::GenericData>()
            .unwrap();
        assert_eq!(generic.raw, b"hi");
    }
}
