//! The primary block: the fixed header every bundle carries exactly once.

use crate::crc::CrcType;
use crate::creation_timestamp::CreationTimestamp;
use crate::eid::Eid;
use crate::error::{CaptureFieldErr, Error};

/// The BPv7 protocol version this library implements (RFC 9171).
pub const PROTOCOL_VERSION: u64 = 7;

/// Bundle-wide processing control flags (spec §6).
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Flags {
    pub is_fragment: bool,
    pub administrative_record_payload: bool,
    pub must_not_fragment: bool,
    pub request_user_application_ack: bool,
    pub request_status_time: bool,
    pub status_request_reception: bool,
    pub status_request_forward: bool,
    pub status_request_delivery: bool,
    pub status_request_deletion: bool,
    pub unrecognised: u64,
}

impl Flags {
    /// `true` if any of the four status-report-request flags are set.
    pub fn requests_any_status_report(&self) -> bool {
        self.status_request_reception
            || self.status_request_forward
            || self.status_request_delivery
            || self.status_request_deletion
    }
}

impl From<&Flags> for u64 {
    fn from(f: &Flags) -> Self {
        let mut bits = f.unrecognised;
        if f.is_fragment {
            bits |= 0x0001;
        }
        if f.administrative_record_payload {
            bits |= 0x0002;
        }
        if f.must_not_fragment {
            bits |= 0x0004;
        }
        if f.request_user_application_ack {
            bits |= 0x0020;
        }
        if f.request_status_time {
            bits |= 0x0040;
        }
        if f.status_request_reception {
            bits |= 0x4000;
        }
        if f.status_request_forward {
            bits |= 0x10000;
        }
        if f.status_request_delivery {
            bits |= 0x20000;
        }
        if f.status_request_deletion {
            bits |= 0x40000;
        }
        bits
    }
}

const KNOWN_BITS: u64 =
    0x0001 | 0x0002 | 0x0004 | 0x0020 | 0x0040 | 0x4000 | 0x10000 | 0x20000 | 0x40000;

impl From<u64> for Flags {
    fn from(value: u64) -> Self {
        Self {
            is_fragment: value & 0x0001 != 0,
            administrative_record_payload: value & 0x0002 != 0,
            must_not_fragment: value & 0x0004 != 0,
            request_user_application_ack: value & 0x0020 != 0,
            request_status_time: value & 0x0040 != 0,
            status_request_reception: value & 0x4000 != 0,
            status_request_forward: value & 0x10000 != 0,
            status_request_delivery: value & 0x20000 != 0,
            status_request_deletion: value & 0x40000 != 0,
            unrecognised: value & !KNOWN_BITS,
        }
    }
}

impl dtn_cbor::encode::ToCbor for Flags {
    type Result = ();

    fn to_cbor(&self, encoder: &mut dtn_cbor::encode::Encoder) -> Self::Result {
        encoder.emit(&u64::from(self))
    }
}

impl dtn_cbor::decode::FromCbor for Flags {
    type Error = dtn_cbor::decode::Error;

    fn from_cbor(data: &[u8]) -> Result<(Self, bool, usize), Self::Error> {
        u64::from_cbor(data).map(|(v, shortest, len)| (v.into(), shortest, len))
    }
}

/// The fragment-specific fields of a primary block, present only when
/// [`Flags::is_fragment`] is set.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FragmentInfo {
    pub offset: u64,
    pub total_data_length: u64,
}

/// The primary block (spec §3/§4.D).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryBlock {
    pub flags: Flags,
    pub crc_type: CrcType,
    pub destination: Eid,
    pub source: Eid,
    pub report_to: Eid,
    pub creation_timestamp: CreationTimestamp,
    pub lifetime: u64,
    pub fragment_info: Option<FragmentInfo>,
}

impl PrimaryBlock {
    /// Validates the cross-field invariants spec §3 places on a primary
    /// block (flag combinations, null-source fragmentation rule).
    pub fn validate(&self) -> Result<(), Error> {
        if self.flags.unrecognised != 0 {
            return Err(Error::InvalidFlagBits);
        }
        if !self.flags.is_fragment && self.fragment_info.is_some() {
            return Err(Error::InvalidFlagBits);
        }
        if self.flags.administrative_record_payload && self.flags.requests_any_status_report() {
            return Err(Error::InvalidFlagBits);
        }
        if self.source.is_null() {
            if !self.flags.must_not_fragment || self.flags.requests_any_status_report() {
                return Err(Error::InvalidFlagBits);
            }
        }
        Ok(())
    }

    pub(crate) fn emit(&self, array: &mut dtn_cbor::encode::Array) -> usize {
        let crc_type = if self.crc_type.is_none() {
            CrcType::Crc32Castagnoli
        } else {
            self.crc_type
        };
        let len = if self.fragment_info.is_some() { 10 } else { 8 } + if crc_type.is_none() { 0 } else { 1 };
        let body = dtn_cbor::encode::emit_array(Some(len), |a| {
            a.emit(&PROTOCOL_VERSION);
            a.emit(&self.flags);
            a.emit(&crc_type);
            a.emit(&self.destination);
            a.emit(&self.source);
            a.emit(&self.report_to);
            a.emit(&self.creation_timestamp);
            a.emit(&self.lifetime);
            if let Some(frag) = &self.fragment_info {
                a.emit(&frag.offset);
                a.emit(&frag.total_data_length);
            }
            if !crc_type.is_none() {
                a.skip_value();
            }
        });
        let with_crc = crate::crc::append(crc_type, body);
        let n = with_crc.len();
        array.emit(&dtn_cbor::encode::Raw(&with_crc));
        n
    }

    pub(crate) fn parse(data: &[u8]) -> Result<(Self, bool, usize), Error> {
        let result = dtn_cbor::decode::parse_array(data, |arr, shortest, tags| {
            let mut shortest = shortest && tags.is_empty() && arr.is_definite();
            let Some(count) = arr.len() else {
                return Err(Error::MalformedCbor(dtn_cbor::decode::Error::NeedMoreData(1)));
            };
            if !(8..=11).contains(&count) {
                return Err(Error::MalformedCbor(dtn_cbor::decode::Error::IncorrectType(
                    "primary block array of length 8..=11".to_string(),
                    format!("array of length {count}"),
                )));
            }

            let (version, s) = arr.parse::<u64>().map_field_err("version")?;
            shortest = shortest && s;
            if version != PROTOCOL_VERSION {
                return Err(Error::VersionMismatch(version));
            }

            let (flags, s) = arr.parse::<Flags>().map_field_err("bundle flags")?;
            shortest = shortest && s;

            let (mut crc_type, s) = arr.parse::<CrcType>().map_field_err("CRC type")?;
            shortest = shortest && s;

            let (destination, s) = arr.parse::<Eid>().map_field_err("destination")?;
            shortest = shortest && s;
            let (source, s) = arr.parse::<Eid>().map_field_err("source")?;
            shortest = shortest && s;
            let (report_to, s) = arr.parse::<Eid>().map_field_err("report-to")?;
            shortest = shortest && s;
            let (creation_timestamp, s) = arr
                .parse::<CreationTimestamp>()
                .map_field_err("creation timestamp")?;
            shortest = shortest && s;
            let (lifetime, s) = arr.parse::<u64>().map_field_err("lifetime")?;
            shortest = shortest && s;

            let expects_fragment = count >= 10;
            let fragment_info = if expects_fragment {
                let (offset, s) = arr.parse::<u64>().map_field_err("fragment offset")?;
                shortest = shortest && s;
                let (total_data_length, s) = arr
                    .parse::<u64>()
                    .map_field_err("total application data length")?;
                shortest = shortest && s;
                Some(FragmentInfo {
                    offset,
                    total_data_length,
                })
            } else {
                None
            };
            if flags.is_fragment != fragment_info.is_some() {
                return Err(Error::InvalidFlagBits);
            }

            let expects_crc = count == 9 || count == 11;
            if !expects_crc {
                crc_type = CrcType::None;
            }
            if expects_crc {
                arr.skip_value()?;
            }

            Ok::<_, Error>((
                PrimaryBlock {
                    flags,
                    crc_type,
                    destination,
                    source,
                    report_to,
                    creation_timestamp,
                    lifetime,
                    fragment_info,
                },
                shortest,
            ))
        })?;
        let ((block, shortest), len) = result;
        crate::crc::verify(block.crc_type, &data[..len])?;
        block.validate()?;
        Ok((block, shortest, len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;

    fn sample() -> PrimaryBlock {
        PrimaryBlock {
            flags: Flags::default(),
            crc_type: CrcType::Crc32Castagnoli,
            destination: Eid::from_str("ipn:2.1").unwrap(),
            source: Eid::from_str("ipn:1.1").unwrap(),
            report_to: Eid::from_str("ipn:1.1").unwrap(),
            creation_timestamp: CreationTimestamp::epoch(),
            lifetime: 3_600_000,
            fragment_info: None,
        }
    }

    #[test]
    fn round_trips_cbor() {
        let block = sample();
        let bytes = dtn_cbor::encode::emit_array(None, |a| {
            block.emit(a);
        });
        let block_start = {
            // skip the outer indefinite-array header byte to hand the
            // primary block parser a slice starting at its own array.
            1
        };
        let (decoded, _, _) = PrimaryBlock::parse(&bytes[block_start..]).unwrap();
        assert_eq!(decoded, block);
    }

    #[test]
    fn rejects_wrong_version() {
        let block = sample();
        let mut bytes = dtn_cbor::encode::emit_array(None, |a| {
            block.emit(a);
        });
        // The primary block's inner array starts right after the 0x9F
        // indefinite-array marker; its first element is the version u64.
        bytes[2] = 6;
        let err = PrimaryBlock::parse(&bytes[1..]);
        assert!(matches!(err, Err(Error::VersionMismatch(6))));
    }

    #[test]
    fn fragment_flag_must_match_fragment_info() {
        let mut block = sample();
        block.fragment_info = Some(FragmentInfo {
            offset: 0,
            total_data_length: 10,
        });
        assert!(block.validate().is_err());
        block.flags.is_fragment = true;
        assert!(block.validate().is_ok());
    }

    #[test]
    fn null_source_requires_must_not_fragment() {
        let mut block = sample();
        block.source = Eid::null();
        assert!(block.validate().is_err());
        block.flags.must_not_fragment = true;
        assert!(block.validate().is_ok());
    }

    #[test]
    fn flags_round_trip_through_u64() {
        let flags = Flags {
            is_fragment: true,
            status_request_delivery: true,
            ..Default::default()
        };
        let bits = u64::from(&flags);
        assert_eq!(Flags::from(bits), flags);
    }
}
