use super::ExtensionBlockData;
use crate::error::Error;
use dtn_cbor::decode::FromCbor;
use std::any::Any;

/// The Bundle Age Block (type 7): milliseconds since creation, for nodes
/// without a reliable clock.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BundleAgeData(pub u64);

impl ExtensionBlockData for BundleAgeData {
    fn to_cbor_bytes(&self) -> Vec<u8> {
        dtn_cbor::encode::emit(&self.0).0
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn block_type(&self) -> u64 {
        super::TYPE_BUNDLE_AGE
    }
}

pub(crate) fn factory(data: &[u8]) -> Result<Box<dyn ExtensionBlockData>, Error> {
    let (age, _, _) = u64::from_cbor(data).map_err(Error::MalformedCbor)?;
    Ok(Box::new(BundleAgeData(age)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_cbor() {
        let original = BundleAgeData(123_456);
        let bytes = original.to_cbor_bytes();
        let decoded = factory(&bytes).unwrap();
        let decoded = decoded.as_any().downcast_ref::<BundleAgeData>().unwrap();
        assert_eq!(decoded, &original);
    }

    #[test]
    fn zero_age_round_trips() {
        let original = BundleAgeData(0);
        let bytes = original.to_cbor_bytes();
        let decoded = factory(&bytes).unwrap();
        let decoded = decoded.as_any().downcast_ref::<BundleAgeData>().unwrap();
        assert_eq!(decoded.0, 0);
    }

    #[test]
    fn reports_own_block_type() {
        let data = BundleAgeData(1);
        assert_eq!(data.block_type(), super::super::TYPE_BUNDLE_AGE);
    }
}
