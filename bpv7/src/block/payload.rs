use super::ExtensionBlockData;
use crate::error::Error;
use dtn_cbor::decode::Value;
use std::any::Any;

/// The Payload Block (type 1): the bundle's application data unit, carried
/// as an opaque byte string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadData(pub Vec<u8>);

impl ExtensionBlockData for PayloadData {
    fn to_cbor_bytes(&self) -> Vec<u8> {
        dtn_cbor::encode::emit(&dtn_cbor::encode::Bytes(&self.0)).0
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn block_type(&self) -> u64 {
        super::TYPE_PAYLOAD
    }
}

pub(crate) fn factory(data: &[u8]) -> Result<Box<dyn ExtensionBlockData>, Error> {
    let ((bytes, _shortest), _len) =
        dtn_cbor::decode::parse_value(data, |value, shortest, tags| match value {
            Value::Bytes(r) => Ok((data[r].to_vec(), shortest && tags.is_empty())),
            v => Err(dtn_cbor::decode::Error::IncorrectType(
                "Byte String".to_string(),
                v.type_name(!tags.is_empty()),
            )),
        })
        .map_err(Error::MalformedCbor)?;
    Ok(Box::new(PayloadData(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_cbor() {
        let original = PayloadData(b"hello, dtn".to_vec());
        let bytes = original.to_cbor_bytes();
        let decoded = factory(&bytes).unwrap();
        let decoded = decoded.as_any().downcast_ref::<PayloadData>().unwrap();
        assert_eq!(decoded, &original);
    }

    #[test]
    fn empty_payload_round_trips() {
        let original = PayloadData(Vec::new());
        let bytes = original.to_cbor_bytes();
        let decoded = factory(&bytes).unwrap();
        let decoded = decoded.as_any().downcast_ref::<PayloadData>().unwrap();
        assert_eq!(decoded.0, Vec::<u8>::new());
    }

    #[test]
    fn rejects_non_byte_string() {
        let bytes = dtn_cbor::encode::emit(&42u64).0;
        assert!(factory(&bytes).is_err());
    }

    #[test]
    fn reports_own_block_type() {
        let data = PayloadData(vec![1, 2, 3]);
        assert_eq!(data.block_type(), super::super::TYPE_PAYLOAD);
    }
}
