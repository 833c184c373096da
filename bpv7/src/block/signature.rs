//! The Ed25519 signature extension block (spec §4.G): signs the
//! concatenated CBOR of the primary block and the payload block.

use super::ExtensionBlockData;
use crate::error::{CaptureFieldErr, Error};
use dtn_cbor::decode::Value;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use std::any::Any;

/// A `{public_key, signature}` pair carried by the signature block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureData {
    pub public_key: [u8; 32],
    pub signature: [u8; 64],
}

impl SignatureData {
    /// Signs `message` (the concatenated primary+payload CBOR) with
    /// `signing_key`, producing the block's wire value.
    pub fn sign(signing_key: &SigningKey, message: &[u8]) -> Self {
        let signature = signing_key.sign(message);
        Self {
            public_key: signing_key.verifying_key().to_bytes(),
            signature: signature.to_bytes(),
        }
    }

    /// Verifies `message` against this block's embedded public key.
    pub fn verify(&self, message: &[u8]) -> Result<(), Error> {
        let key = VerifyingKey::from_bytes(&self.public_key)
            .map_field_err::<Error>("signature public key")?;
        let sig = Signature::from_bytes(&self.signature);
        key.verify(message, &sig)
            .map_field_err::<Error>("signature value")
    }
}

impl ExtensionBlockData for SignatureData {
    fn to_cbor_bytes(&self) -> Vec<u8> {
        dtn_cbor::encode::emit_array(Some(2), |a| {
            a.emit(&dtn_cbor::encode::Bytes(&self.public_key[..]));
            a.emit(&dtn_cbor::encode::Bytes(&self.signature[..]));
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn block_type(&self) -> u64 {
        super::TYPE_SIGNATURE_DEFAULT
    }
}

fn parse_fixed_bytes<const N: usize>(
    source: &[u8],
    value: Value,
    shortest: bool,
    tags: &[u64],
) -> Result<([u8; N], bool), Error> {
    match value {
        Value::Bytes(r) => {
            let bytes: [u8; N] = source[r].try_into().map_err(|_| Error::InvalidField {
                field: "signature field",
                source: "unexpected byte string length".into(),
            })?;
            Ok((bytes, shortest && tags.is_empty()))
        }
        v => Err(Error::MalformedCbor(dtn_cbor::decode::Error::IncorrectType(
            "Byte String".to_string(),
            v.type_name(!tags.is_empty()),
        ))),
    }
}

pub(crate) fn factory(data: &[u8]) -> Result<Box<dyn ExtensionBlockData>, Error> {
    dtn_cbor::decode::parse_array(data, |a, shortest, tags| {
        let ((public_key, s1), _) = a.parse_value(|v, s, t| parse_fixed_bytes::<32>(data, v, s, t))?;
        let ((signature, s2), _) = a.parse_value(|v, s, t| parse_fixed_bytes::<64>(data, v, s, t))?;
        Ok::<_, Error>((
            SignatureData {
                public_key,
                signature,
            },
            shortest && tags.is_empty() && a.is_definite() && s1 && s2,
        ))
    })
    .map(|((v, _), _)| Box::new(v) as Box<dyn ExtensionBlockData>)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;

    fn signing_key() -> SigningKey {
        SigningKey::from_bytes(&[7u8; 32])
    }

    #[test]
    fn verifies_its_own_signature() {
        let key = signing_key();
        let message = b"primary+payload cbor bytes";
        let block = SignatureData::sign(&key, message);
        assert!(block.verify(message).is_ok());
    }

    #[test]
    fn rejects_a_tampered_message() {
        let key = signing_key();
        let block = SignatureData::sign(&key, b"original message");
        assert!(block.verify(b"tampered message").is_err());
    }

    #[test]
    fn round_trips_cbor() {
        let key = signing_key();
        let original = SignatureData::sign(&key, b"some bundle bytes");
        let bytes = original.to_cbor_bytes();
        let decoded = factory(&bytes).unwrap();
        let decoded = decoded.as_any().downcast_ref::<SignatureData>().unwrap();
        assert_eq!(decoded, &original);
    }

    #[test]
    fn rejects_wrong_length_public_key() {
        let bytes = dtn_cbor::encode::emit_array(Some(2), |a| {
            a.emit(&dtn_cbor::encode::Bytes(&[0u8; 16]));
            a.emit(&dtn_cbor::encode::Bytes(&[0u8; 64]));
        });
        assert!(factory(&bytes).is_err());
    }

    #[test]
    fn reports_own_block_type() {
        let key = signing_key();
        let data = SignatureData::sign(&key, b"x");
        assert_eq!(data.block_type(), super::super::TYPE_SIGNATURE_DEFAULT);
    }
}
