//! Received-ready table: accepted payloads awaiting delivery to the
//! caller, in acceptance order.
//!
//! Bounded FIFO. The receiver worker backs off while the queue is full
//! (bounded busy-wait with a short sleep) rather than dropping accepted
//! frames; `recv_from` pops the head. Duplicates are not suppressed:
//! a retransmission whose original ACK was lost is delivered again.

use std::collections::VecDeque;
use std::net::SocketAddr;

use bytes::Bytes;

/// An accepted payload waiting for the caller.
///
/// `msg_id` is kept for diagnostics only; it is `None` for the
/// zero-length sentinel (a 0-byte transport read enqueued without
/// passing through the codec).
#[derive(Debug, Clone)]
pub struct ReadyMessage {
    pub msg_id: Option<u16>,
    pub payload: Bytes,
    pub src: SocketAddr,
}

impl ReadyMessage {
    pub fn new(msg_id: u16, payload: Bytes, src: SocketAddr) -> Self {
        Self {
            msg_id: Some(msg_id),
            payload,
            src,
        }
    }

    /// Entry for a zero-length transport read.
    pub fn sentinel(src: SocketAddr) -> Self {
        Self {
            msg_id: None,
            payload: Bytes::new(),
            src,
        }
    }
}

/// Bounded FIFO ring of accepted payloads.
pub struct ReadyQueue {
    entries: VecDeque<ReadyMessage>,
    capacity: usize,
}

impl ReadyQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() == self.capacity
    }

    /// Append at the tail, or hand the message back when full so the
    /// caller can back off and retry.
    pub fn enqueue(&mut self, msg: ReadyMessage) -> std::result::Result<(), ReadyMessage> {
        if self.is_full() {
            return Err(msg);
        }
        self.entries.push_back(msg);
        Ok(())
    }

    /// Remove and return the head, preserving acceptance order.
    pub fn dequeue(&mut self) -> Option<ReadyMessage> {
        self.entries.pop_front()
    }
}
