//! `DtnTime`: milliseconds since the DTN epoch (2000-01-01 00:00:00 UTC).

const DTN_EPOCH: time::OffsetDateTime = time::macros::datetime!(2000-01-01 00:00:00 UTC);

/// A DTN timestamp: milliseconds since the DTN epoch.
#[derive(Debug, Default, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DtnTime(u64);

impl DtnTime {
    pub fn now() -> Self {
        Self(((time::OffsetDateTime::now_utc() - DTN_EPOCH).whole_milliseconds()) as u64)
    }

    pub fn new(millisecs: u64) -> Self {
        Self(millisecs)
    }

    pub fn millisecs(&self) -> u64 {
        self.0
    }

    pub fn saturating_from(t: time::OffsetDateTime) -> Self {
        let millisecs = (t - DTN_EPOCH).whole_milliseconds();
        if millisecs < 0 {
            Self::new(0)
        } else if millisecs > u64::MAX as i128 {
            Self::new(u64::MAX)
        } else {
            Self(millisecs as u64)
        }
    }
}

impl dtn_cbor::encode::ToCbor for DtnTime {
    type Result = ();

    fn to_cbor(&self, encoder: &mut dtn_cbor::encode::Encoder) -> Self::Result {
        encoder.emit(&self.0)
    }
}

impl dtn_cbor::decode::FromCbor for DtnTime {
    type Error = dtn_cbor::decode::Error;

    fn from_cbor(data: &[u8]) -> Result<(Self, bool, usize), Self::Error> {
        dtn_cbor::decode::parse_value(data, |value, shortest, tags| match value {
            dtn_cbor::decode::Value::UnsignedInteger(n) => Ok((n, shortest && tags.is_empty())),
            v => Err(dtn_cbor::decode::Error::IncorrectType(
                "Unsigned Integer".to_string(),
                v.type_name(!tags.is_empty()),
            )),
        })
        .map(|((millisecs, shortest), len)| (Self(millisecs), shortest, len))
    }
}

impl TryFrom<time::OffsetDateTime> for DtnTime {
    type Error = time::error::ConversionRange;

    fn try_from(instant: time::OffsetDateTime) -> Result<Self, Self::Error> {
        let millisecs = (instant - DTN_EPOCH).whole_milliseconds();
        if millisecs < 0 || millisecs > u64::MAX as i128 {
            Err(time::error::ConversionRange)
        } else {
            Ok(Self(millisecs as u64))
        }
    }
}

impl From<DtnTime> for time::OffsetDateTime {
    fn from(dtn_time: DtnTime) -> Self {
        DTN_EPOCH.saturating_add(time::Duration::new(
            (dtn_time.0 / 1000) as i64,
            (dtn_time.0 % 1000 * 1_000_000) as i32,
        ))
    }
}

impl core::fmt::Display for DtnTime {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", time::OffsetDateTime::from(*self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_is_zero() {
        assert_eq!(DtnTime::try_from(DTN_EPOCH).unwrap(), DtnTime::new(0));
    }

    #[test]
    fn round_trips_through_offset_date_time() {
        let t = DtnTime::new(123_456_789);
        let odt: time::OffsetDateTime = t.into();
        assert_eq!(DtnTime::try_from(odt).unwrap(), t);
    }
}
