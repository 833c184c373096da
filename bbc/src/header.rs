//! The 2-octet fragment header every BBC fragment carries ahead of its
//! payload (spec §4.F): a transmission ID, a 5-bit sequence counter, and
//! the start/end/fail bits.

use crate::error::Error;

/// The fixed size of a fragment header, in octets.
pub const HEADER_LEN: usize = 2;

/// The header prefixed to every fragment on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentHeader {
    pub transmission_id: u8,
    /// A 5-bit counter (0..32), advancing by 1 modulo 32 per fragment.
    pub seq: u8,
    pub start: bool,
    pub end: bool,
    pub fail: bool,
}

impl FragmentHeader {
    pub fn next_seq(seq: u8) -> u8 {
        (seq + 1) % 32
    }

    pub fn to_bytes(self) -> [u8; HEADER_LEN] {
        let mut octet1 = (self.seq & 0x1F) << 3;
        if self.start {
            octet1 |= 0x04;
        }
        if self.end {
            octet1 |= 0x02;
        }
        if self.fail {
            octet1 |= 0x01;
        }
        [self.transmission_id, octet1]
    }

    /// Parses the header from the front of `data`, returning it along with
    /// the remaining payload bytes.
    pub fn parse(data: &[u8]) -> Result<(Self, &[u8]), Error> {
        if data.len() < HEADER_LEN {
            return Err(Error::Truncated);
        }
        let octet1 = data[1];
        let header = Self {
            transmission_id: data[0],
            seq: (octet1 >> 3) & 0x1F,
            start: octet1 & 0x04 != 0,
            end: octet1 & 0x02 != 0,
            fail: octet1 & 0x01 != 0,
        };
        Ok((header, &data[HEADER_LEN..]))
    }
}
