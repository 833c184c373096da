//! CRC-16 (CCITT/X.25) and CRC-32 (Castagnoli) computation and verification
//! over a block's CBOR encoding with the CRC field zeroed out.

use thiserror::Error as ThisError;

const X25: crc::Crc<u16> = crc::Crc::<u16>::new(&crc::CRC_16_IBM_SDLC);
const CASTAGNOLI: crc::Crc<u32> = crc::Crc::<u32>::new(&crc::CRC_32_ISCSI);

#[derive(ThisError, Debug)]
pub enum Error {
    #[error("invalid CRC type {0}")]
    InvalidType(u64),

    #[error("invalid CRC byte string length {0}")]
    InvalidLength(usize),

    #[error("CRC value present but CRC type is None")]
    UnexpectedCrcValue,

    #[error("CRC mismatch")]
    IncorrectCrc,

    #[error("CRC type set but no CRC value present")]
    MissingCrc,

    #[error(transparent)]
    InvalidCbor(#[from] dtn_cbor::decode::Error),
}

/// The three CRC types a primary or canonical block may declare.
#[derive(Debug, Default, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum CrcType {
    #[default]
    None,
    Crc16X25,
    Crc32Castagnoli,
    Unrecognised(u64),
}

impl CrcType {
    pub fn code(&self) -> u64 {
        match self {
            CrcType::None => 0,
            CrcType::Crc16X25 => 1,
            CrcType::Crc32Castagnoli => 2,
            CrcType::Unrecognised(v) => *v,
        }
    }

    /// Length in bytes of the CRC field this type implies, or `None` for
    /// [`CrcType::None`].
    pub fn len(&self) -> Option<usize> {
        match self {
            CrcType::None => None,
            CrcType::Crc16X25 => Some(2),
            CrcType::Crc32Castagnoli => Some(4),
            CrcType::Unrecognised(_) => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, CrcType::None)
    }
}

impl From<u64> for CrcType {
    fn from(v: u64) -> Self {
        match v {
            0 => CrcType::None,
            1 => CrcType::Crc16X25,
            2 => CrcType::Crc32Castagnoli,
            v => CrcType::Unrecognised(v),
        }
    }
}

impl dtn_cbor::encode::ToCbor for CrcType {
    type Result = ();

    fn to_cbor(&self, encoder: &mut dtn_cbor::encode::Encoder) -> Self::Result {
        encoder.emit(&self.code())
    }
}

impl dtn_cbor::decode::FromCbor for CrcType {
    type Error = dtn_cbor::decode::Error;

    fn from_cbor(data: &[u8]) -> Result<(Self, bool, usize), Self::Error> {
        u64::from_cbor(data).map(|(v, shortest, len)| (v.into(), shortest, len))
    }
}

fn digest(crc_type: CrcType, data: &[u8]) -> Vec<u8> {
    match crc_type {
        CrcType::Crc16X25 => X25.checksum(data).to_be_bytes().to_vec(),
        CrcType::Crc32Castagnoli => CASTAGNOLI.checksum(data).to_be_bytes().to_vec(),
        CrcType::None | CrcType::Unrecognised(_) => Vec::new(),
    }
}

/// Recomputes the CRC over `data` with its trailing `crc_len` bytes zeroed,
/// and compares it against those trailing bytes. `data` must already
/// contain the CRC value as its final `crc_len` bytes.
pub fn verify(crc_type: CrcType, data: &[u8]) -> Result<(), Error> {
    let Some(crc_len) = crc_type.len() else {
        return Ok(());
    };
    if data.len() < crc_len {
        return Err(Error::InvalidLength(data.len()));
    }
    let split = data.len() - crc_len;
    let mut zeroed = data[..split].to_vec();
    zeroed.extend(core::iter::repeat_n(0u8, crc_len));
    if digest(crc_type, &zeroed) != data[split..] {
        return Err(Error::IncorrectCrc);
    }
    Ok(())
}

/// Appends the CRC of `data` (with a zeroed placeholder of the same length
/// already conceptually present) to `data`, returning the extended buffer.
/// `data` must NOT yet contain a CRC field.
pub fn append(crc_type: CrcType, data: Vec<u8>) -> Vec<u8> {
    let Some(crc_len) = crc_type.len() else {
        return data;
    };
    let mut zeroed = data.clone();
    zeroed.extend(core::iter::repeat_n(0u8, crc_len));
    let d = digest(crc_type, &zeroed);
    let mut out = data;
    out.extend(d);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_crc32() {
        let body = b"payload bytes".to_vec();
        let with_crc = append(CrcType::Crc32Castagnoli, body);
        assert!(verify(CrcType::Crc32Castagnoli, &with_crc).is_ok());
    }

    #[test]
    fn tamper_detected() {
        let body = b"payload bytes".to_vec();
        let mut with_crc = append(CrcType::Crc32Castagnoli, body);
        let last = with_crc.len() - 1;
        with_crc[last] ^= 0xFF;
        assert!(verify(CrcType::Crc32Castagnoli, &with_crc).is_err());
    }

    #[test]
    fn none_is_always_valid() {
        assert!(verify(CrcType::None, b"anything").is_ok());
    }
}
