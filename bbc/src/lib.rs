//! The Bundle Broadcasting Connector (BBC): a transmission protocol that
//! carries BPv7 bundles, compressed and fragmented, over a low-MTU
//! broadcast modem (e.g. a LoRa radio), with a start/end/fail signaling
//! scheme in place of link-layer retransmission.

pub mod connector;
pub mod error;
pub mod header;
pub mod modem;
pub mod transmission;

pub use connector::Connector;
pub use error::Error;
pub use header::FragmentHeader;
pub use modem::Modem;
