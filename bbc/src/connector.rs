//! The Bundle Broadcasting Connector: owns the two long-running tasks
//! (`handler_read`, `handler_write`) that cooperate through bounded
//! channels to drive outgoing sends and incoming reassembly over a
//! [`Modem`].

use std::collections::{HashSet, VecDeque};
use std::io::Read;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace, warn};

use dtn_bpv7::{Bundle, Registry};

use crate::error::Error;
use crate::header::FragmentHeader;
use crate::modem::Modem;
use crate::transmission::{IncomingTransmission, OutgoingTransmission};

/// Default capacity of the bounded channels connecting the connector's
/// public API to its handler tasks (spec §5).
pub const CHANNEL_CAPACITY: usize = 64;

fn compress(data: &[u8]) -> Result<Vec<u8>, Error> {
    let mut encoder = xz2::read::XzEncoder::new(data, 6);
    let mut out = Vec::new();
    encoder.read_to_end(&mut out)?;
    Ok(out)
}

fn decompress(data: &[u8]) -> Result<Vec<u8>, Error> {
    let mut decoder = xz2::read::XzDecoder::new(data);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

struct SendRequest {
    transmission_id: u8,
    compressed: Vec<u8>,
    mtu: usize,
}

/// Shared state handed to both handler tasks: the completion channel for
/// in-flight outgoing sends, keyed by transmission ID.
type PendingSends = Arc<Mutex<std::collections::HashMap<u8, oneshot::Sender<Result<(), Error>>>>>;

/// A running BBC connection over a single modem.
pub struct Connector {
    to_write: mpsc::Sender<(SendRequest, oneshot::Sender<Result<(), Error>>)>,
    pool: dtn_async::TaskPool,
    next_transmission_id: AtomicU8,
    modem: Arc<dyn Modem>,
}

impl Connector {
    /// Starts the connector's handler tasks and returns it along with the
    /// channel on which reassembled bundles are delivered.
    pub fn new(modem: Arc<dyn Modem>, registry: Arc<Registry>) -> (Self, mpsc::Receiver<Bundle>) {
        let (to_write, from_write) = mpsc::channel(CHANNEL_CAPACITY);
        let (deliver_tx, deliver_rx) = mpsc::channel(CHANNEL_CAPACITY);

        let pending: PendingSends = Arc::new(Mutex::new(std::collections::HashMap::new()));
        let pool = dtn_async::TaskPool::new();

        pool.spawn(handler_write(
            modem.clone(),
            from_write,
            pending.clone(),
            pool.cancel_token().clone(),
        ));
        pool.spawn(handler_read(
            modem.clone(),
            registry,
            deliver_tx,
            pending,
            pool.cancel_token().clone(),
        ));

        let next_transmission_id = AtomicU8::new(rand::random());
        (
            Self {
                to_write,
                pool,
                next_transmission_id,
                modem,
            },
            deliver_rx,
        )
    }

    /// Serializes, compresses, and transmits `bundle`, blocking until every
    /// fragment has been enqueued or a failure fragment matching this
    /// transmission is observed.
    pub async fn send(&self, bundle: &Bundle) -> Result<(), Error> {
        let compressed = compress(&bundle.to_cbor())?;
        let transmission_id = self.next_transmission_id.fetch_add(1, Ordering::Relaxed);
        let mtu = self.modem.mtu();

        let (completion_tx, completion_rx) = oneshot::channel();
        self.to_write
            .send((
                SendRequest {
                    transmission_id,
                    compressed,
                    mtu,
                },
                completion_tx,
            ))
            .await
            .map_err(|_| Error::Closed)?;

        completion_rx.await.map_err(|_| Error::Closed)?
    }

    /// Signals both handler tasks to stop, closes the modem, and waits for
    /// both to acknowledge.
    pub async fn close(&self) {
        let _ = self.modem.close().await;
        self.pool.shutdown().await;
    }
}

async fn handler_write(
    modem: Arc<dyn Modem>,
    mut from_write: mpsc::Receiver<(SendRequest, oneshot::Sender<Result<(), Error>>)>,
    pending: PendingSends,
    cancel: dtn_async::CancellationToken,
) {
    loop {
        let (request, completion) = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            item = from_write.recv() => match item {
                Some(item) => item,
                None => break,
            },
        };

        pending
            .lock()
            .expect("pending sends lock poisoned")
            .insert(request.transmission_id, completion);

        let initial_seq = rand::random::<u8>() % 32;
        let mut outgoing = OutgoingTransmission::new(
            request.transmission_id,
            request.compressed,
            request.mtu,
            initial_seq,
        );

        let result = loop {
            if !pending
                .lock()
                .expect("pending sends lock poisoned")
                .contains_key(&request.transmission_id)
            {
                // handler_read already resolved this send (peer failure).
                break None;
            }
            let Some(fragment) = outgoing.next_fragment() else {
                break Some(Ok(()));
            };
            if let Err(e) = modem.send(&fragment).await {
                break Some(Err(e));
            }
        };

        if let Some(result) = result {
            if let Some(tx) = pending
                .lock()
                .expect("pending sends lock poisoned")
                .remove(&request.transmission_id)
            {
                let _ = tx.send(result);
            }
        }
    }
    debug!("BBC write handler exiting");
}

async fn handler_read(
    modem: Arc<dyn Modem>,
    registry: Arc<Registry>,
    deliver: mpsc::Sender<Bundle>,
    pending: PendingSends,
    cancel: dtn_async::CancellationToken,
) {
    let mut incoming: std::collections::HashMap<u8, IncomingTransmission> =
        std::collections::HashMap::new();
    // Bounds the set of recently delivered transmission IDs so a duplicate
    // start fragment doesn't recreate state (spec §4.F).
    let mut delivered: HashSet<u8> = HashSet::new();
    let mut delivered_order: VecDeque<u8> = VecDeque::new();

    loop {
        let fragment = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            fragment = modem.receive() => fragment,
        };

        let fragment = match fragment {
            Ok(f) => f,
            Err(Error::Closed) => break,
            Err(e) => {
                warn!("BBC modem receive failed: {e}");
                continue;
            }
        };

        let (header, payload) = match FragmentHeader::parse(&fragment) {
            Ok(v) => v,
            Err(e) => {
                warn!("BBC dropped malformed fragment: {e}");
                continue;
            }
        };

        if header.fail {
            if let Some(tx) = pending
                .lock()
                .expect("pending sends lock poisoned")
                .remove(&header.transmission_id)
            {
                let _ = tx.send(Err(Error::PeerReportedFailure));
            }
            incoming.remove(&header.transmission_id);
            continue;
        }

        let outcome = process_incoming_fragment(&mut incoming, &delivered, &header, payload);
        match outcome {
            Ok(None) => {}
            Ok(Some(buffer)) => {
                incoming.remove(&header.transmission_id);
                delivered.insert(header.transmission_id);
                delivered_order.push_back(header.transmission_id);
                if delivered_order.len() > CHANNEL_CAPACITY {
                    if let Some(oldest) = delivered_order.pop_front() {
                        delivered.remove(&oldest);
                    }
                }
                match decompress(&buffer).and_then(|cbor| {
                    Bundle::from_cbor(&cbor, &registry).map_err(Error::Bundle)
                }) {
                    Ok(bundle) => {
                        trace!(transmission_id = header.transmission_id, "BBC delivered bundle");
                        let _ = deliver.send(bundle).await;
                    }
                    Err(e) => {
                        warn!("BBC failed to decode reassembled bundle: {e}");
                        send_failure(&modem, &header).await;
                    }
                }
            }
            // An out-of-sequence or duplicate-start fragment for a
            // transmission already in progress: the peer needs to know to
            // restart, so a failure fragment is sent (spec §4.F/§7).
            Err(Error::TransmissionSequence) => {
                incoming.remove(&header.transmission_id);
                send_failure(&modem, &header).await;
            }
            // A non-start fragment with no matching transmission: per
            // spec §4.F ("if S=0, drop the fragment"), this is dropped
            // silently with no failure fragment, since there is no
            // transmission on this side for the peer to restart.
            Err(Error::TransmissionStateUnknown) => {
                warn!(
                    transmission_id = header.transmission_id,
                    "BBC dropped non-start fragment for unknown transmission"
                );
            }
            Err(e) => {
                incoming.remove(&header.transmission_id);
                warn!("BBC failed to process incoming fragment: {e}");
                send_failure(&modem, &header).await;
            }
        }
    }
    debug!("BBC read handler exiting");
}

/// Folds a non-fail fragment into the incoming-transmission table, returning
/// the completed buffer once the transmission's end fragment has arrived.
fn process_incoming_fragment(
    incoming: &mut std::collections::HashMap<u8, IncomingTransmission>,
    delivered: &HashSet<u8>,
    header: &FragmentHeader,
    payload: &[u8],
) -> Result<Option<Vec<u8>>, Error> {
    match incoming.get_mut(&header.transmission_id) {
        Some(transmission) => {
            if transmission.accept(header, payload)? {
                let transmission = incoming.remove(&header.transmission_id).unwrap();
                Ok(Some(transmission.into_buffer()))
            } else {
                Ok(None)
            }
        }
        None => {
            if !header.start {
                return Err(Error::TransmissionStateUnknown);
            }
            if delivered.contains(&header.transmission_id) {
                // Stale retransmission of an already-delivered transmission.
                return Ok(None);
            }
            let transmission = IncomingTransmission::new(header, payload);
            if transmission.is_finished() {
                Ok(Some(transmission.into_buffer()))
            } else {
                incoming.insert(header.transmission_id, transmission);
                Ok(None)
            }
        }
    }
}

async fn send_failure(modem: &Arc<dyn Modem>, header: &FragmentHeader) {
    let fail = FragmentHeader {
        transmission_id: header.transmission_id,
        seq: header.seq,
        start: false,
        end: false,
        fail: true,
    };
    if let Err(e) = modem.send(&fail.to_bytes()).await {
        warn!("BBC failed to send failure fragment: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;
    use dtn_bpv7::Eid;
    use std::collections::VecDeque as Queue;
    use tokio::sync::Mutex as AsyncMutex;

    struct LoopbackModem {
        mtu: usize,
        inbox: AsyncMutex<Queue<Vec<u8>>>,
        outbox: AsyncMutex<Vec<Vec<u8>>>,
        notify: dtn_async::Notify,
        closed: std::sync::atomic::AtomicBool,
    }

    impl LoopbackModem {
        fn new(mtu: usize) -> Self {
            Self {
                mtu,
                inbox: AsyncMutex::new(Queue::new()),
                outbox: AsyncMutex::new(Vec::new()),
                notify: dtn_async::Notify::new(),
                closed: std::sync::atomic::AtomicBool::new(false),
            }
        }

        async fn deliver(&self, fragment: Vec<u8>) {
            self.inbox.lock().await.push_back(fragment);
            self.notify.notify_one();
        }

        /// Polls the outbox until at least `n` fragments have been sent, or
        /// panics after a second of waiting.
        async fn wait_for_sent(&self, n: usize) -> Vec<Vec<u8>> {
            for _ in 0..200 {
                {
                    let outbox = self.outbox.lock().await;
                    if outbox.len() >= n {
                        return outbox.clone();
                    }
                }
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
            panic!("timed out waiting for {n} sent fragment(s)");
        }
    }

    #[dtn_async::async_trait]
    impl Modem for LoopbackModem {
        fn mtu(&self) -> usize {
            self.mtu
        }

        async fn send(&self, fragment: &[u8]) -> Result<(), Error> {
            self.outbox.lock().await.push(fragment.to_vec());
            Ok(())
        }

        async fn receive(&self) -> Result<Vec<u8>, Error> {
            loop {
                if let Some(fragment) = self.inbox.lock().await.pop_front() {
                    return Ok(fragment);
                }
                if self.closed.load(Ordering::Relaxed) {
                    return Err(Error::Closed);
                }
                self.notify.notified().await;
            }
        }

        async fn close(&self) -> Result<(), Error> {
            self.closed.store(true, Ordering::Relaxed);
            self.notify.notify_one();
            Ok(())
        }
    }

    #[tokio::test]
    async fn delivers_a_single_fragment_transmission() {
        let modem = Arc::new(LoopbackModem::new(64));
        let registry = Arc::new(Registry::new());
        let (_connector, mut deliver_rx) = Connector::new(modem.clone(), registry.clone());

        let bundle = dtn_bpv7::Builder::new()
            .source(Eid::from_str("ipn:1.1").unwrap())
            .destination(Eid::from_str("ipn:2.1").unwrap())
            .creation_timestamp(dtn_bpv7::CreationTimestamp::epoch())
            .bundle_age_block(0)
            .payload_block(b"hi".to_vec())
            .build()
            .unwrap();
        let compressed = compress(&bundle.to_cbor()).unwrap();

        let header = FragmentHeader {
            transmission_id: 7,
            seq: 0,
            start: true,
            end: true,
            fail: false,
        };
        let mut fragment = header.to_bytes().to_vec();
        fragment.extend_from_slice(&compressed);
        modem.deliver(fragment).await;

        let delivered = tokio::time::timeout(std::time::Duration::from_secs(1), deliver_rx.recv())
            .await
            .expect("delivery timed out")
            .expect("channel closed");
        assert_eq!(delivered.payload().unwrap().0, b"hi");
    }

    /// A middle fragment goes missing (sequence jumps from 3 straight to
    /// 5): per spec §4.F/§7 this must produce exactly one failure fragment
    /// sent back, and the broken transmission must never be delivered.
    #[tokio::test]
    async fn dropped_middle_fragment_emits_exactly_one_failure_fragment() {
        let modem = Arc::new(LoopbackModem::new(64));
        let registry = Arc::new(Registry::new());
        let (_connector, mut deliver_rx) = Connector::new(modem.clone(), registry.clone());

        let start = FragmentHeader {
            transmission_id: 9,
            seq: 3,
            start: true,
            end: false,
            fail: false,
        };
        let mut start_fragment = start.to_bytes().to_vec();
        start_fragment.extend_from_slice(b"ab");
        modem.deliver(start_fragment).await;

        // Fragment for sequence 4 never arrives; this one (sequence 5)
        // should be rejected as out-of-sequence.
        let skipped = FragmentHeader {
            transmission_id: 9,
            seq: 5,
            start: false,
            end: true,
            fail: false,
        };
        let mut skipped_fragment = skipped.to_bytes().to_vec();
        skipped_fragment.extend_from_slice(b"cd");
        modem.deliver(skipped_fragment).await;

        let sent = modem.wait_for_sent(1).await;
        assert_eq!(sent.len(), 1);
        let (header, _payload) = FragmentHeader::parse(&sent[0]).unwrap();
        assert_eq!(header.transmission_id, 9);
        assert!(header.fail);

        assert!(deliver_rx.try_recv().is_err());
    }

    /// When the peer reports a failure for an in-flight transmission, the
    /// caller blocked in `Connector::send` must observe `PeerReportedFailure`
    /// rather than hang or succeed.
    #[tokio::test]
    async fn peer_failure_fragment_resolves_pending_send() {
        let modem = Arc::new(LoopbackModem::new(10));
        let registry = Arc::new(Registry::new());
        let (connector, _deliver_rx) = Connector::new(modem.clone(), registry.clone());
        let connector = Arc::new(connector);

        let bundle = dtn_bpv7::Builder::new()
            .source(Eid::from_str("ipn:1.1").unwrap())
            .destination(Eid::from_str("ipn:2.1").unwrap())
            .creation_timestamp(dtn_bpv7::CreationTimestamp::epoch())
            .bundle_age_block(0)
            .payload_block(vec![b'x'; 200])
            .build()
            .unwrap();

        let send_task = {
            let connector = connector.clone();
            tokio::spawn(async move { connector.send(&bundle).await })
        };

        let sent = modem.wait_for_sent(1).await;
        let (header, _payload) = FragmentHeader::parse(&sent[0]).unwrap();

        let fail = FragmentHeader {
            transmission_id: header.transmission_id,
            seq: 0,
            start: false,
            end: false,
            fail: true,
        };
        modem.deliver(fail.to_bytes().to_vec()).await;

        let result = tokio::time::timeout(std::time::Duration::from_secs(1), send_task)
            .await
            .expect("send task timed out")
            .expect("send task panicked");
        assert!(matches!(result, Err(Error::PeerReportedFailure)));
    }
}
