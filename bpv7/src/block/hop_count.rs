use super::ExtensionBlockData;
use crate::error::{CaptureFieldErr, Error};
use std::any::Any;

/// The Hop Count Block (type 9): a hop limit and a hop counter,
/// incremented by every forwarding node.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct HopCountData {
    pub limit: u64,
    pub count: u64,
}

impl ExtensionBlockData for HopCountData {
    fn to_cbor_bytes(&self) -> Vec<u8> {
        dtn_cbor::encode::emit(&(&self.limit, &self.count)).0
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn block_type(&self) -> u64 {
        super::TYPE_HOP_COUNT
    }
}

pub(crate) fn factory(data: &[u8]) -> Result<Box<dyn ExtensionBlockData>, Error> {
    dtn_cbor::decode::parse_array(data, |a, shortest, tags| {
        let (limit, s1) = a.parse().map_field_err("hop limit")?;
        let (count, s2) = a.parse().map_field_err("hop count")?;
        Ok::<_, Error>((
            HopCountData { limit, count },
            shortest && tags.is_empty() && a.is_definite() && s1 && s2,
        ))
    })
    .map(|((v, _), _)| Box::new(v) as Box<dyn ExtensionBlockData>)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_cbor() {
        let original = HopCountData {
            limit: 30,
            count: 0,
        };
        let bytes = original.to_cbor_bytes();
        let decoded = factory(&bytes).unwrap();
        let decoded = decoded.as_any().downcast_ref::<HopCountData>().unwrap();
        assert_eq!(decoded, &original);
    }

    #[test]
    fn incremented_count_round_trips() {
        let original = HopCountData {
            limit: 10,
            count: 9,
        };
        let bytes = original.to_cbor_bytes();
        let decoded = factory(&bytes).unwrap();
        let decoded = decoded.as_any().downcast_ref::<HopCountData>().unwrap();
        assert_eq!(decoded.count, 9);
        assert_eq!(decoded.limit, 10);
    }

    #[test]
    fn rejects_missing_second_field() {
        let bytes = dtn_cbor::encode::emit_array(Some(1), |a| {
            a.emit(&30u64);
        });
        assert!(factory(&bytes).is_err());
    }

    #[test]
    fn reports_own_block_type() {
        let data = HopCountData {
            limit: 1,
            count: 0,
        };
        assert_eq!(data.block_type(), super::super::TYPE_HOP_COUNT);
    }
}
