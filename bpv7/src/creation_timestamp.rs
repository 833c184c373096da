//! The bundle creation timestamp: `(dtn_time, sequence_number)`.

use crate::dtn_time::DtnTime;
use core::sync::atomic::{AtomicU64, Ordering};

static GLOBAL_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A bundle's creation timestamp. `creation_time` is `None` when the node
/// has no reliable clock (encoded on the wire as dtn_time 0).
#[derive(Debug, Default, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CreationTimestamp {
    creation_time: Option<DtnTime>,
    sequence_number: u64,
}

impl CreationTimestamp {
    /// A timestamp with no reliable clock: dtn_time 0, sequence 0.
    pub fn epoch() -> Self {
        Self {
            creation_time: None,
            sequence_number: 0,
        }
    }

    /// The current wall-clock time, with a sub-millisecond-derived sequence
    /// number to disambiguate bundles created within the same millisecond.
    pub fn now() -> Self {
        let now = time::OffsetDateTime::now_utc();
        Self {
            creation_time: Some(DtnTime::saturating_from(now)),
            sequence_number: (now.nanosecond() % 1_000_000) as u64,
        }
    }

    /// A timestamp from an explicit wall-clock instant, with a
    /// process-global monotonically increasing sequence number so that two
    /// calls at the same instant still sort distinctly.
    pub fn new_sequential(time: time::OffsetDateTime) -> Self {
        Self {
            creation_time: DtnTime::try_from(time).ok(),
            sequence_number: GLOBAL_COUNTER.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn from_parts(creation_time: Option<DtnTime>, sequence_number: u64) -> Self {
        Self {
            creation_time,
            sequence_number,
        }
    }

    pub fn into_parts(self) -> (Option<DtnTime>, u64) {
        (self.creation_time, self.sequence_number)
    }

    pub fn creation_time(&self) -> Option<DtnTime> {
        self.creation_time
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    /// `true` when the creation time reflects a reliable clock reading.
    pub fn is_clocked(&self) -> bool {
        self.creation_time.is_some()
    }

    pub fn as_datetime(&self) -> Option<time::OffsetDateTime> {
        self.creation_time.map(Into::into)
    }
}

impl core::fmt::Display for CreationTimestamp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.creation_time {
            Some(t) => write!(f, "{t}/{}", self.sequence_number),
            None => write!(f, "no-clock/{}", self.sequence_number),
        }
    }
}

impl dtn_cbor::encode::ToCbor for CreationTimestamp {
    type Result = ();

    fn to_cbor(&self, encoder: &mut dtn_cbor::encode::Encoder) -> Self::Result {
        encoder.emit_array(Some(2), |a| {
            a.emit(&self.creation_time.map(|t| t.millisecs()).unwrap_or(0));
            a.emit(&self.sequence_number);
        })
    }
}

impl dtn_cbor::decode::FromCbor for CreationTimestamp {
    type Error = dtn_cbor::decode::Error;

    fn from_cbor(data: &[u8]) -> Result<(Self, bool, usize), Self::Error> {
        dtn_cbor::decode::parse_array(data, |a, shortest, tags| {
            let (millisecs, s1) = a.parse::<u64>()?;
            let (sequence_number, s2) = a.parse::<u64>()?;
            Ok::<_, dtn_cbor::decode::Error>((
                CreationTimestamp {
                    creation_time: (millisecs != 0).then(|| DtnTime::new(millisecs)),
                    sequence_number,
                },
                shortest && tags.is_empty() && a.is_definite() && s1 && s2,
            ))
        })
        .map(|((v, s), len)| (v, s, len))
    }
}

impl TryFrom<time::OffsetDateTime> for CreationTimestamp {
    type Error = time::error::ConversionRange;

    fn try_from(instant: time::OffsetDateTime) -> Result<Self, Self::Error> {
        Ok(Self {
            creation_time: Some(DtnTime::try_from(instant)?),
            sequence_number: 0,
        })
    }
}
