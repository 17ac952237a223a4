//! Unacknowledged-send table: every transmitted DATA frame lives here
//! until its matching ACK arrives.
//!
//! Fixed-capacity slot array addressed by linear scan. All access goes
//! through the engine's per-table mutex; the retransmitter re-stamps an
//! entry's send time *before* releasing the mutex around the actual
//! transport send, so a slow syscall never blocks ACK processing.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use bytes::Bytes;

use crate::error::{MrpSockError, Result};

/// A transmitted frame awaiting acknowledgement.
///
/// `frame` is an owned copy of the encoded bytes actually handed to the
/// transport, so a retransmission is byte-identical to the original.
#[derive(Debug, Clone)]
pub struct PendingMessage {
    pub msg_id: u16,
    pub frame: Bytes,
    pub dest: SocketAddr,
    pub sent_at: Instant,
}

impl PendingMessage {
    pub fn new(msg_id: u16, frame: Bytes, dest: SocketAddr) -> Self {
        Self {
            msg_id,
            frame,
            dest,
            sent_at: Instant::now(),
        }
    }
}

/// Snapshot handed to the retransmitter for one timed-out entry.
///
/// Cloning out of the table lets the caller drop the table mutex for the
/// duration of the transport send. `slot` is the position the walk
/// resumes after.
#[derive(Debug)]
pub struct Retransmit {
    pub slot: usize,
    pub msg_id: u16,
    pub frame: Bytes,
    pub dest: SocketAddr,
}

/// Fixed-capacity unacknowledged-send table.
pub struct UnackedTable {
    slots: Vec<Option<PendingMessage>>,
    count: usize,
}

impl UnackedTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            count: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == self.slots.len()
    }

    /// Place `entry` in the first empty slot.
    ///
    /// Returns `TableFull` when every slot is occupied; the caller
    /// surfaces this to the user rather than dropping the entry.
    pub fn insert(&mut self, entry: PendingMessage) -> Result<()> {
        for slot in self.slots.iter_mut() {
            if slot.is_none() {
                *slot = Some(entry);
                self.count += 1;
                return Ok(());
            }
        }
        Err(MrpSockError::TableFull {
            capacity: self.slots.len(),
        })
    }

    /// Remove the first entry whose id matches.
    ///
    /// Returns `false` if no entry matched; ACKs for already-removed ids
    /// are no-ops.
    pub fn remove(&mut self, msg_id: u16) -> bool {
        for slot in self.slots.iter_mut() {
            if slot.as_ref().is_some_and(|e| e.msg_id == msg_id) {
                *slot = None;
                self.count -= 1;
                return true;
            }
        }
        false
    }

    /// Find the first entry at or after `cursor` whose age exceeds
    /// `timeout`, stamp its send time to `now`, and return a snapshot
    /// for retransmission.
    ///
    /// The retransmitter walks the table one entry at a time through
    /// this method so it can release the table mutex around each
    /// transport send and resume from `slot + 1`.
    pub fn next_expired(
        &mut self,
        cursor: usize,
        now: Instant,
        timeout: Duration,
    ) -> Option<Retransmit> {
        for slot in cursor..self.slots.len() {
            if let Some(entry) = self.slots[slot].as_mut() {
                if now.saturating_duration_since(entry.sent_at) > timeout {
                    entry.sent_at = now;
                    return Some(Retransmit {
                        slot,
                        msg_id: entry.msg_id,
                        frame: entry.frame.clone(),
                        dest: entry.dest,
                    });
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dest() -> SocketAddr {
        "127.0.0.1:9999".parse().unwrap()
    }

    fn entry(msg_id: u16) -> PendingMessage {
        PendingMessage::new(msg_id, Bytes::from_static(b"\x44\x00\x00x"), dest())
    }

    #[test]
    fn insert_and_remove() {
        let mut tbl = UnackedTable::new(4);
        tbl.insert(entry(1)).unwrap();
        tbl.insert(entry(2)).unwrap();
        assert_eq!(tbl.len(), 2);

        assert!(tbl.remove(1));
        assert_eq!(tbl.len(), 1);
        assert!(!tbl.remove(1)); // already gone
        assert!(tbl.remove(2));
        assert!(tbl.is_empty());
    }

    #[test]
    fn insert_full_surfaces_error() {
        let mut tbl = UnackedTable::new(2);
        tbl.insert(entry(1)).unwrap();
        tbl.insert(entry(2)).unwrap();
        assert!(tbl.is_full());
        assert!(matches!(
            tbl.insert(entry(3)),
            Err(MrpSockError::TableFull { capacity: 2 })
        ));
        assert_eq!(tbl.len(), 2);
    }

    #[test]
    fn remove_reuses_freed_slot() {
        let mut tbl = UnackedTable::new(2);
        tbl.insert(entry(1)).unwrap();
        tbl.insert(entry(2)).unwrap();
        assert!(tbl.remove(1));
        tbl.insert(entry(3)).unwrap();
        assert!(tbl.is_full());
    }

    #[test]
    fn wrapped_ids_are_independent() {
        // Ids minted around the 2^16 wrap must ack independently.
        let mut tbl = UnackedTable::new(4);
        tbl.insert(entry(65535)).unwrap();
        tbl.insert(entry(0)).unwrap();

        assert!(tbl.remove(0));
        assert_eq!(tbl.len(), 1);
        assert!(tbl.remove(65535));
        assert!(tbl.is_empty());
    }

    #[test]
    fn next_expired_stamps_and_resumes() {
        let timeout = Duration::from_millis(50);
        let mut tbl = UnackedTable::new(4);
        tbl.insert(entry(10)).unwrap();
        tbl.insert(entry(11)).unwrap();

        let later = Instant::now() + Duration::from_millis(200);
        let first = tbl.next_expired(0, later, timeout).unwrap();
        assert_eq!(first.msg_id, 10);

        // Resuming past the first slot finds the second entry.
        let second = tbl.next_expired(first.slot + 1, later, timeout).unwrap();
        assert_eq!(second.msg_id, 11);

        // Both entries were re-stamped to `later`, so a fresh walk at the
        // same instant finds nothing.
        assert!(tbl.next_expired(0, later, timeout).is_none());
    }

    #[test]
    fn next_expired_skips_fresh_entries() {
        let mut tbl = UnackedTable::new(2);
        tbl.insert(entry(1)).unwrap();
        assert!(tbl
            .next_expired(0, Instant::now(), Duration::from_secs(4))
            .is_none());
    }
}
