//! The collaborator contract a broadcast transport must satisfy (spec §6).
//! A LoRa radio or any other low-MTU broadcast medium implements this
//! trait; the connector consumes it and never concerns itself with the
//! underlying transport.

use dtn_async::async_trait;

use crate::error::Error;

/// A broadcast modem: a fixed MTU, and blocking send/receive/close.
#[async_trait]
pub trait Modem: Send + Sync {
    /// The maximum size, in bytes, of a single fragment this modem can
    /// carry, header included.
    fn mtu(&self) -> usize;

    /// Sends one fragment. May block until the outgoing medium is free.
    async fn send(&self, fragment: &[u8]) -> Result<(), Error>;

    /// Waits for and returns the next fragment to arrive. May block
    /// arbitrarily until a fragment arrives or the modem is closed, in
    /// which case it returns [`Error::Closed`].
    async fn receive(&self) -> Result<Vec<u8>, Error>;

    /// Closes the modem, unblocking any pending `receive`.
    async fn close(&self) -> Result<(), Error>;
}
