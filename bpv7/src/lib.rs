//! A BPv7 (RFC 9171) bundle format library: the data model, CBOR wire
//! codec, extension-block registry, fluent builder, and fragmentation
//! engine for delay-tolerant networking bundles.

pub mod block;
pub mod builder;
pub mod bundle;
pub mod crc;
pub mod creation_timestamp;
pub mod dtn_time;
pub mod editor;
pub mod eid;
pub mod error;
pub mod fragment;
pub mod primary;
pub mod registry;

pub use bundle::Bundle;
pub use builder::Builder;
pub use creation_timestamp::CreationTimestamp;
pub use dtn_time::DtnTime;
pub use eid::Eid;
pub use error::Error;
pub use registry::Registry;
