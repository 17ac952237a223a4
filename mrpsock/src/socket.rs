//! The MRP socket: a socket-like API with at-least-once delivery over
//! UDP.
//!
//! Each socket owns two background tasks spawned at bind time: the
//! *receiver* drains the transport, acknowledges DATA frames and clears
//! acknowledged entries from the unacknowledged-send table; the
//! *retransmitter* wakes every period and resends entries whose age
//! exceeds the timeout. The user-facing operations feed and drain the
//! two tables and block until they can make progress.
//!
//! Locking discipline: each table has its own mutex, no actor ever
//! holds both, and no guard is held across an await. The retransmitter
//! releases the table mutex around each transport send so a slow
//! syscall never stalls ACK processing.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::net::UdpSocket;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::error::{MrpSockError, Result};
use crate::frame::{Frame, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE};
use crate::loss::{LossPolicy, ProbabilisticLoss};
use crate::ready::{ReadyMessage, ReadyQueue};
use crate::unacked::{PendingMessage, UnackedTable};

/// Socket-type marker that `create` requires.
pub const SOCK_MRP: u32 = 15;

/// Back-off while `close` waits for the unacknowledged table to drain.
const DRAIN_BACKOFF: Duration = Duration::from_micros(100);

/// Back-off while the receiver waits for space in a full ready queue.
const QUEUE_FULL_BACKOFF: Duration = Duration::from_micros(100);

/// Address family a socket is created for; `bind` enforces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    Ipv4,
    Ipv6,
}

impl Domain {
    fn matches(self, addr: SocketAddr) -> bool {
        match self {
            Domain::Ipv4 => addr.is_ipv4(),
            Domain::Ipv6 => addr.is_ipv6(),
        }
    }
}

/// Tunable protocol parameters.
///
/// The defaults are the wire-contract constants: retransmit period
/// T = 2 s, timeout 2·T, loss probability P = 0.05, per-table capacity
/// 100. Tests shrink the timers to keep scenarios fast.
#[derive(Debug, Clone)]
pub struct SocketConfig {
    /// How long the retransmitter sleeps between passes (T).
    pub retransmit_period: Duration,
    /// Age beyond which an unacknowledged entry is resent.
    pub retransmit_timeout: Duration,
    /// Drop probability of the default loss policy.
    pub loss_probability: f64,
    /// Capacity of both the unacknowledged-send table and the ready queue.
    pub table_capacity: usize,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            retransmit_period: Duration::from_secs(2),
            retransmit_timeout: Duration::from_secs(4),
            loss_probability: 0.05,
            table_capacity: 100,
        }
    }
}

/// State shared between the user task and the two workers.
struct Shared {
    config: SocketConfig,
    unacked: Mutex<UnackedTable>,
    ready: Mutex<ReadyQueue>,
    /// Signalled by the receiver after every ready-queue enqueue.
    ready_notify: Notify,
    loss: Mutex<Box<dyn LossPolicy>>,
    /// Message-id mint; wraps mod 2^16 with no collision guard.
    next_msg_id: AtomicU16,
    /// Successful outbound DATA transmissions (initial + retransmit).
    total_transmissions: AtomicU64,
}

/// Transport socket plus worker handles; exists only while bound.
struct Io {
    socket: Arc<UdpSocket>,
    receiver: JoinHandle<()>,
    retransmitter: JoinHandle<()>,
}

/// A reliable-messaging socket over UDP.
///
/// Created unbound; `bind` opens the transport and spawns the workers.
/// `send_to` returns once the frame is handed to the transport; the
/// retransmitter keeps resending it until the matching ACK arrives, so
/// a successful send does not imply delivery. `recv_from` blocks until
/// an accepted payload is available. Duplicates are delivered as-is and
/// delivery order is acceptance order, not send order.
///
/// All per-socket state (message-id mint, transmission counter, tables,
/// loss policy) is owned by the instance; two sockets in one process
/// share nothing.
pub struct MrpSocket {
    domain: Domain,
    shared: Arc<Shared>,
    io: Option<Io>,
}

impl MrpSocket {
    /// Create an MRP socket with the default configuration.
    ///
    /// Fails with `InvalidSocketType` unless `socket_type` is
    /// [`SOCK_MRP`]. `protocol` is accepted for signature parity with
    /// the datagram layer and ignored.
    pub fn create(domain: Domain, socket_type: u32, protocol: u32) -> Result<Self> {
        Self::create_with_config(domain, socket_type, protocol, SocketConfig::default())
    }

    /// Create an MRP socket with explicit parameters.
    pub fn create_with_config(
        domain: Domain,
        socket_type: u32,
        protocol: u32,
        config: SocketConfig,
    ) -> Result<Self> {
        if socket_type != SOCK_MRP {
            return Err(MrpSockError::InvalidSocketType(socket_type));
        }
        tracing::debug!(?domain, protocol, "creating MRP socket");

        let capacity = config.table_capacity;
        let loss: Box<dyn LossPolicy> = Box::new(ProbabilisticLoss::new(config.loss_probability));
        let shared = Arc::new(Shared {
            unacked: Mutex::new(UnackedTable::new(capacity)),
            ready: Mutex::new(ReadyQueue::new(capacity)),
            ready_notify: Notify::new(),
            loss: Mutex::new(loss),
            next_msg_id: AtomicU16::new(0),
            total_transmissions: AtomicU64::new(0),
            config,
        });

        Ok(Self {
            domain,
            shared,
            io: None,
        })
    }

    /// Replace the loss policy (testability hook).
    pub fn set_loss_policy(&self, policy: Box<dyn LossPolicy>) {
        *self.shared.loss.lock() = policy;
    }

    /// Bind the underlying transport and spawn the receiver and
    /// retransmitter workers.
    pub async fn bind(&mut self, addr: SocketAddr) -> Result<()> {
        if self.io.is_some() {
            return Err(MrpSockError::AlreadyBound);
        }
        if !self.domain.matches(addr) {
            return Err(MrpSockError::AddressFamilyMismatch {
                domain: self.domain,
            });
        }

        let socket = Arc::new(UdpSocket::bind(addr).await.map_err(MrpSockError::Init)?);
        let receiver = tokio::spawn(receiver_loop(self.shared.clone(), socket.clone()));
        let retransmitter = tokio::spawn(retransmit_loop(self.shared.clone(), socket.clone()));
        self.io = Some(Io {
            socket,
            receiver,
            retransmitter,
        });
        Ok(())
    }

    /// Send `buf` reliably to `dest`; returns the payload byte count.
    ///
    /// Fails with `PayloadTooLarge` above [`MAX_PAYLOAD_SIZE`] and with
    /// `TableFull` when the unacknowledged-send table has no free slot
    /// (checked before anything reaches the transport, so a failed call
    /// has no side effects). Message ids wrap mod 2^16 without a
    /// collision guard for still-outstanding entries.
    pub async fn send_to(&mut self, buf: &[u8], dest: SocketAddr) -> Result<usize> {
        let io = self.io.as_ref().ok_or(MrpSockError::NotBound)?;
        if buf.len() > MAX_PAYLOAD_SIZE {
            return Err(MrpSockError::PayloadTooLarge {
                size: buf.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }
        {
            let unacked = self.shared.unacked.lock();
            if unacked.is_full() {
                return Err(MrpSockError::TableFull {
                    capacity: unacked.capacity(),
                });
            }
        }

        let msg_id = self.shared.next_msg_id.fetch_add(1, Ordering::Relaxed);
        let frame = Frame::Data {
            msg_id,
            payload: Bytes::copy_from_slice(buf),
        }
        .encode();

        io.socket.send_to(&frame, dest).await?;
        self.shared
            .total_transmissions
            .fetch_add(1, Ordering::Relaxed);
        self.shared
            .unacked
            .lock()
            .insert(PendingMessage::new(msg_id, frame, dest))?;
        Ok(buf.len())
    }

    /// Receive the next accepted payload, blocking until one is
    /// available.
    ///
    /// Copies up to `buf.len()` bytes and returns the copied count with
    /// the source address. Zero is a valid count: the peer sent an
    /// empty payload, or the transport delivered a zero-length datagram
    /// (enqueued as an empty message, not treated as a close).
    pub async fn recv_from(&mut self, buf: &mut [u8]) -> Result<(usize, SocketAddr)> {
        if self.io.is_none() {
            return Err(MrpSockError::NotBound);
        }
        loop {
            {
                let mut ready = self.shared.ready.lock();
                if let Some(entry) = ready.dequeue() {
                    let copied = buf.len().min(entry.payload.len());
                    buf[..copied].copy_from_slice(&entry.payload[..copied]);
                    return Ok((copied, entry.src));
                }
            }
            self.shared.ready_notify.notified().await;
        }
    }

    /// Close the socket: wait until every outstanding message is
    /// acknowledged, then stop both workers and release the transport.
    ///
    /// Blocks for as long as any entry remains unacknowledged; with an
    /// unreachable peer this never returns. Closing an unbound socket
    /// is a no-op.
    pub async fn close(mut self) -> Result<()> {
        let Some(io) = self.io.take() else {
            return Ok(());
        };

        loop {
            let drained = self.shared.unacked.lock().is_empty();
            if drained {
                break;
            }
            tokio::time::sleep(DRAIN_BACKOFF).await;
        }

        let Io {
            socket,
            receiver,
            retransmitter,
        } = io;
        receiver.abort();
        retransmitter.abort();
        let _ = receiver.await;
        let _ = retransmitter.await;
        drop(socket);
        Ok(())
    }

    /// Local address of the bound transport.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        let io = self.io.as_ref().ok_or(MrpSockError::NotBound)?;
        Ok(io.socket.local_addr()?)
    }

    /// Number of sent messages still awaiting acknowledgement.
    pub fn unacked_len(&self) -> usize {
        self.shared.unacked.lock().len()
    }

    /// Number of accepted payloads not yet consumed by `recv_from`.
    pub fn ready_len(&self) -> usize {
        self.shared.ready.lock().len()
    }

    /// Successful outbound DATA transmissions so far (initial sends plus
    /// retransmits).
    pub fn total_transmissions(&self) -> u64 {
        self.shared.total_transmissions.load(Ordering::Relaxed)
    }
}

impl Drop for MrpSocket {
    fn drop(&mut self) {
        if let Some(io) = &self.io {
            io.receiver.abort();
            io.retransmitter.abort();
        }
    }
}

/// Receiver worker: drains the transport, acks DATA, clears acked
/// entries.
async fn receiver_loop(shared: Arc<Shared>, socket: Arc<UdpSocket>) {
    let mut buf = [0u8; MAX_FRAME_SIZE];
    loop {
        let (len, src) = match socket.recv_from(&mut buf).await {
            Ok(read) => read,
            Err(error) => {
                tracing::warn!(%error, "transport receive failed");
                continue;
            }
        };

        // The loss policy sees every non-empty frame, DATA and ACK
        // alike, before any acknowledgement or table mutation.
        if len > 0 && shared.loss.lock().should_drop() {
            tracing::trace!(len, %src, "inbound frame dropped by loss policy");
            continue;
        }

        if len == 0 {
            // Zero-length transport read: sentinel entry, no ack.
            enqueue_ready(&shared, ReadyMessage::sentinel(src)).await;
            continue;
        }

        match Frame::decode(&buf[..len]) {
            Ok(Frame::Data { msg_id, payload }) => {
                enqueue_ready(&shared, ReadyMessage::new(msg_id, payload, src)).await;
                let ack = Frame::Ack { msg_id }.encode();
                if let Err(error) = socket.send_to(&ack, src).await {
                    tracing::warn!(%error, msg_id, "failed to send acknowledgement");
                }
            }
            Ok(Frame::Ack { msg_id }) => {
                // No-op if the entry was already removed by an earlier
                // duplicate ACK.
                shared.unacked.lock().remove(msg_id);
            }
            Err(error) => {
                tracing::debug!(%error, len, %src, "discarding malformed frame");
            }
        }
    }
}

/// Enqueue an accepted payload, backing off while the queue is full.
async fn enqueue_ready(shared: &Shared, mut msg: ReadyMessage) {
    loop {
        {
            let mut ready = shared.ready.lock();
            match ready.enqueue(msg) {
                Ok(()) => break,
                Err(rejected) => {
                    tracing::trace!(capacity = ready.capacity(), "ready queue full, backing off");
                    msg = rejected;
                }
            }
        }
        tokio::time::sleep(QUEUE_FULL_BACKOFF).await;
    }
    shared.ready_notify.notify_one();
}

/// Retransmitter worker: wakes every period and resends every entry
/// whose age exceeds the timeout, stamping its send time first.
async fn retransmit_loop(shared: Arc<Shared>, socket: Arc<UdpSocket>) {
    let period = shared.config.retransmit_period;
    let timeout = shared.config.retransmit_timeout;
    loop {
        tokio::time::sleep(period).await;

        let mut cursor = 0;
        loop {
            // The snapshot is taken and the entry re-stamped under the
            // lock; the transport send happens with the lock released.
            let expired = shared
                .unacked
                .lock()
                .next_expired(cursor, Instant::now(), timeout);
            let Some(expired) = expired else { break };
            cursor = expired.slot + 1;

            match socket.send_to(&expired.frame, expired.dest).await {
                Ok(_) => {
                    shared
                        .total_transmissions
                        .fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(msg_id = expired.msg_id, "retransmitted unacknowledged frame");
                }
                Err(error) => {
                    tracing::warn!(%error, msg_id = expired.msg_id, "retransmission failed");
                }
            }
        }
    }
}
