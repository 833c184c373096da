//! The outgoing and incoming transmission state machines (spec §4.F):
//! `Idle -> Sending -> (Finished | Failed)` for a send in progress, and
//! `New -> Partial -> (Delivered | Errored)` for each tracked incoming
//! transmission ID.

use crate::error::Error;
use crate::header::FragmentHeader;

/// A bundle's compressed octet stream, being framed into fragments no
/// larger than `mtu - HEADER_LEN` bytes.
pub struct OutgoingTransmission {
    transmission_id: u8,
    remainder: Vec<u8>,
    offset: usize,
    next_seq: u8,
    mtu: usize,
    started: bool,
}

impl OutgoingTransmission {
    pub fn new(transmission_id: u8, compressed: Vec<u8>, mtu: usize, initial_seq: u8) -> Self {
        Self {
            transmission_id,
            remainder: compressed,
            offset: 0,
            next_seq: initial_seq,
            mtu,
            started: false,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.started && self.offset >= self.remainder.len()
    }

    /// Produces the next fragment to send, or `None` if the transmission
    /// has already emitted its last (end) fragment.
    pub fn next_fragment(&mut self) -> Option<Vec<u8>> {
        if self.is_finished() {
            return None;
        }
        let max_payload = self.mtu.saturating_sub(crate::header::HEADER_LEN);
        let remaining = self.remainder.len() - self.offset;
        let chunk_len = remaining.min(max_payload.max(1));
        let chunk = &self.remainder[self.offset..self.offset + chunk_len];

        let start = !self.started;
        let seq = self.next_seq;
        self.offset += chunk_len;
        self.started = true;
        let end = self.offset >= self.remainder.len();
        self.next_seq = FragmentHeader::next_seq(seq);

        let header = FragmentHeader {
            transmission_id: self.transmission_id,
            seq,
            start,
            end,
            fail: false,
        };
        let mut fragment = header.to_bytes().to_vec();
        fragment.extend_from_slice(chunk);
        Some(fragment)
    }
}

/// The reassembly state for a single transmission ID being received.
pub struct IncomingTransmission {
    transmission_id: u8,
    buffer: Vec<u8>,
    prev_seq: u8,
    finished: bool,
}

impl IncomingTransmission {
    /// Creates fresh state from a start fragment (`header.start` must be
    /// `true`; checked by the caller before construction).
    pub fn new(header: &FragmentHeader, payload: &[u8]) -> Self {
        Self {
            transmission_id: header.transmission_id,
            buffer: payload.to_vec(),
            prev_seq: header.seq,
            finished: header.end,
        }
    }

    pub fn transmission_id(&self) -> u8 {
        self.transmission_id
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn into_buffer(self) -> Vec<u8> {
        self.buffer
    }

    /// Folds in a subsequent (non-start) fragment. Returns `Ok(true)` once
    /// the transmission's end fragment has been accepted.
    pub fn accept(&mut self, header: &FragmentHeader, payload: &[u8]) -> Result<bool, Error> {
        if self.finished || header.start || header.seq != FragmentHeader::next_seq(self.prev_seq) {
            return Err(Error::TransmissionSequence);
        }
        self.buffer.extend_from_slice(payload);
        self.prev_seq = header.seq;
        self.finished = header.end;
        Ok(self.finished)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outgoing_frames_within_mtu() {
        let mut out = OutgoingTransmission::new(5, vec![0u8; 50], 10, 0);
        let mut fragments = Vec::new();
        while let Some(f) = out.next_fragment() {
            assert!(f.len() <= 10);
            fragments.push(f);
        }
        assert!(fragments.len() >= 6);
        let (first, _) = FragmentHeader::parse(&fragments[0]).unwrap();
        assert!(first.start);
        let (last, _) = FragmentHeader::parse(fragments.last().unwrap()).unwrap();
        assert!(last.end);
    }

    #[test]
    fn single_fragment_is_both_start_and_end() {
        let mut out = OutgoingTransmission::new(1, vec![1, 2, 3], 64, 0);
        let fragment = out.next_fragment().unwrap();
        let (header, payload) = FragmentHeader::parse(&fragment).unwrap();
        assert!(header.start && header.end);
        assert_eq!(payload, &[1, 2, 3]);
        assert!(out.next_fragment().is_none());
    }

    #[test]
    fn incoming_rejects_out_of_sequence() {
        let start = FragmentHeader {
            transmission_id: 1,
            seq: 0,
            start: true,
            end: false,
            fail: false,
        };
        let mut incoming = IncomingTransmission::new(&start, b"ab");
        let bad = FragmentHeader {
            transmission_id: 1,
            seq: 2,
            start: false,
            end: true,
            fail: false,
        };
        assert!(matches!(
            incoming.accept(&bad, b"cd"),
            Err(Error::TransmissionSequence)
        ));
    }

    #[test]
    fn incoming_reassembles_in_order() {
        let start = FragmentHeader {
            transmission_id: 1,
            seq: 9,
            start: true,
            end: false,
            fail: false,
        };
        let mut incoming = IncomingTransmission::new(&start, b"ab");
        let next = FragmentHeader {
            transmission_id: 1,
            seq: 10,
            start: false,
            end: true,
            fail: false,
        };
        assert!(incoming.accept(&next, b"cd").unwrap());
        assert_eq!(incoming.into_buffer(), b"abcd");
    }
}
