//! Errors raised while fragmenting, transmitting, or reassembling bundles
//! over a broadcast modem.

use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// The bundle itself is malformed, or could not be fragmented.
    #[error(transparent)]
    Bundle(#[from] dtn_bpv7::Error),

    /// A fragment was shorter than the 2-octet header.
    #[error("fragment shorter than the 2-octet header")]
    Truncated,

    /// A fragment arrived out of sequence for a transmission already in
    /// progress (wrong sequence number, or a duplicate start fragment).
    #[error("fragment sequencing violation")]
    TransmissionSequence,

    /// A fragment referenced an unknown transmission and could not be used
    /// to start one (a non-start fragment for an unseen transmission ID).
    #[error("unknown transmission state")]
    TransmissionStateUnknown,

    /// The peer emitted a failure fragment for an in-flight send.
    #[error("peer reported a transmission failure")]
    PeerReportedFailure,

    /// xz compression or decompression of the bundle octet stream failed.
    #[error("xz (de)compression failed: {0}")]
    Compression(#[from] std::io::Error),

    /// The underlying modem reported an error.
    #[error("modem error: {0}")]
    Modem(Box<dyn std::error::Error + Send + Sync>),

    /// The connector has been closed and no longer accepts sends.
    #[error("connector is closed")]
    Closed,
}
