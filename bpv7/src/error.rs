//! The primary error type for the `dtn-bpv7` crate.
//!
//! The [`Error`] enum distinguishes the error kinds named in the bundle
//! protocol's error handling design: malformed CBOR, version mismatches,
//! flag violations, endpoint parse failures, CRC mismatches, registry
//! misses, duplicate blocks, and the two fragmentation-specific failures.

use thiserror::Error as ThisError;

/// Errors raised while parsing, validating, building, or fragmenting a bundle.
#[derive(ThisError, Debug)]
pub enum Error {
    /// The CBOR encoding of a bundle or block could not be parsed.
    #[error(transparent)]
    MalformedCbor(#[from] dtn_cbor::decode::Error),

    /// The primary block declared a protocol version other than 7.
    #[error("unsupported bundle protocol version {0}")]
    VersionMismatch(u64),

    /// A bundle or block control flag field set a reserved bit.
    #[error("invalid bundle or block flag bits")]
    InvalidFlagBits,

    /// An endpoint identifier failed to parse or violated EID semantics.
    #[error(transparent)]
    InvalidEndpoint(#[from] crate::eid::Error),

    /// A block's CRC did not match its recomputed value.
    #[error("CRC mismatch")]
    CrcMismatch,

    /// A CRC-related decode failure (unsupported CRC type, wrong length).
    #[error(transparent)]
    Crc(#[from] crate::crc::Error),

    /// A canonical block's type code has no registered factory and no
    /// generic fallback could be constructed.
    #[error("no factory registered for block type {0}")]
    BlockRegistryMiss(u64),

    /// A block type code was registered twice.
    #[error("block type {0} is already registered")]
    RegistryConflict(u64),

    /// Two canonical blocks share a block number, or a block that must be
    /// unique (Bundle Age, Hop Count, Previous Node) appears more than once.
    #[error("duplicate block: {0}")]
    DuplicateBlock(&'static str),

    /// The bundle has no payload block, or the payload block is not block 1
    /// or is not the final block on the wire.
    #[error("missing or misplaced payload block")]
    MissingPayload,

    /// Fragmentation was requested on a bundle with `MustNotFragmented` set.
    #[error("bundle must not be fragmented")]
    MustNotFragmented,

    /// The MTU is too small to fit even the per-fragment overhead.
    #[error("fragment {0} overhead exceeds MTU")]
    FragmentOverhead(usize),

    /// A fragment arrived for a transmission/bundle whose tracked state
    /// does not admit it (wrong sequence, duplicate start, etc).
    #[error("fragment sequencing violation")]
    TransmissionSequence,

    /// A fragment referenced an unknown transmission and could not be
    /// used to start one (e.g. a non-start fragment for an unseen ID).
    #[error("unknown transmission state")]
    TransmissionStateUnknown,

    /// A generic error for when parsing a specific field fails, carrying
    /// the field name and the underlying cause.
    #[error("failed to parse {field}: {source}")]
    InvalidField {
        field: &'static str,
        source: Box<dyn core::error::Error + Send + Sync>,
    },
}

/// Trait for error types that can represent an invalid-field error.
pub trait HasInvalidField: Sized {
    fn invalid_field(field: &'static str, source: Box<dyn core::error::Error + Send + Sync>)
    -> Self;
}

impl HasInvalidField for Error {
    fn invalid_field(
        field: &'static str,
        source: Box<dyn core::error::Error + Send + Sync>,
    ) -> Self {
        Error::InvalidField { field, source }
    }
}

/// Extension trait mapping a `Result`'s error into an `InvalidField` variant,
/// attaching the name of the field being parsed.
pub trait CaptureFieldErr<T> {
    fn map_field_err<E: HasInvalidField>(self, field: &'static str) -> Result<T, E>;
}

impl<T, Err> CaptureFieldErr<T> for Result<T, Err>
where
    Err: Into<Box<dyn core::error::Error + Send + Sync>>,
{
    fn map_field_err<E: HasInvalidField>(self, field: &'static str) -> Result<T, E> {
        self.map_err(|e| E::invalid_field(field, e.into()))
    }
}
