use super::ExtensionBlockData;
use crate::error::Error;
use dtn_cbor::decode::Value;
use std::any::Any;

/// The fallback extension block for an unregistered type code: preserves
/// the raw byte string payload without interpreting it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericData {
    pub block_type: u64,
    pub raw: Vec<u8>,
}

impl ExtensionBlockData for GenericData {
    fn to_cbor_bytes(&self) -> Vec<u8> {
        dtn_cbor::encode::emit(&dtn_cbor::encode::Bytes(&self.raw)).0
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn block_type(&self) -> u64 {
        self.block_type
    }
}

pub(crate) fn factory(block_type: u64, data: &[u8]) -> Result<Box<dyn ExtensionBlockData>, Error> {
    let ((raw, _), _) = dtn_cbor::decode::parse_value(data, |value, shortest, tags| match value {
        Value::Bytes(r) => Ok((data[r].to_vec(), shortest && tags.is_empty())),
        _ => Ok((data.to_vec(), false)),
    })
    .map_err(Error::MalformedCbor)?;
    Ok(Box::new(GenericData { block_type, raw }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_byte_string() {
        let original = GenericData {
            block_type: 200,
            raw: vec![0xde, 0xad, 0xbe, 0xef],
        };
        let bytes = original.to_cbor_bytes();
        let decoded = factory(200, &bytes).unwrap();
        let decoded = decoded.as_any().downcast_ref::<GenericData>().unwrap();
        assert_eq!(decoded, &original);
    }

    #[test]
    fn preserves_unrecognised_block_type_number() {
        let bytes = dtn_cbor::encode::emit(&dtn_cbor::encode::Bytes(b"payload")).0;
        let decoded = factory(999, &bytes).unwrap();
        assert_eq!(decoded.block_type(), 999);
    }
}
