use super::ExtensionBlockData;
use crate::eid::Eid;
use crate::error::Error;
use dtn_cbor::decode::FromCbor;
use std::any::Any;

/// The Previous Node Block (type 6): the EID of the node that forwarded
/// this bundle most recently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviousNodeData(pub Eid);

impl ExtensionBlockData for PreviousNodeData {
    fn to_cbor_bytes(&self) -> Vec<u8> {
        dtn_cbor::encode::emit(&self.0).0
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn block_type(&self) -> u64 {
        super::TYPE_PREVIOUS_NODE
    }
}

pub(crate) fn factory(data: &[u8]) -> Result<Box<dyn ExtensionBlockData>, Error> {
    let (eid, _, _) = Eid::from_cbor(data)?;
    Ok(Box::new(PreviousNodeData(eid)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;

    #[test]
    fn round_trips_an_ipn_eid() {
        let original = PreviousNodeData(Eid::from_str("ipn:1.1").unwrap());
        let bytes = original.to_cbor_bytes();
        let decoded = factory(&bytes).unwrap();
        let decoded = decoded
            .as_any()
            .downcast_ref::<PreviousNodeData>()
            .unwrap();
        assert_eq!(decoded, &original);
    }

    #[test]
    fn round_trips_a_dtn_eid() {
        let original = PreviousNodeData(Eid::from_str("dtn://node1/inbox").unwrap());
        let bytes = original.to_cbor_bytes();
        let decoded = factory(&bytes).unwrap();
        let decoded = decoded
            .as_any()
            .downcast_ref::<PreviousNodeData>()
            .unwrap();
        assert_eq!(decoded, &original);
    }

    #[test]
    fn reports_own_block_type() {
        let data = PreviousNodeData(Eid::from_str("dtn:none").unwrap());
        assert_eq!(data.block_type(), super::super::TYPE_PREVIOUS_NODE);
    }
}
