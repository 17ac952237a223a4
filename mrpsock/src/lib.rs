//! MRP -- reliable messaging over an unreliable datagram transport.
//!
//! A socket-like API (create, bind, send-to, receive-from, close) with
//! at-least-once delivery, duplicate-tolerant reception and automatic
//! retransmission hidden behind the calls. Two background workers per
//! socket keep delivery progressing: the receiver acknowledges inbound
//! DATA frames and clears acknowledged sends, the retransmitter resends
//! whatever stays unacknowledged past the timeout.
//!
//! Deliberately **not** provided: ordered delivery, exactly-once
//! semantics, congestion or flow control, fragmentation of payloads
//! above the 100-byte frame cap.

pub mod error;
pub mod frame;
pub mod loss;
pub mod ready;
pub mod socket;
pub mod unacked;

// Re-export key public types at crate root.
pub use error::{MrpSockError, Result};
pub use frame::{Frame, FrameType, HEADER_SIZE, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE};
pub use loss::{AlwaysDrop, DropList, LossPolicy, NeverDrop, ProbabilisticLoss};
pub use ready::{ReadyMessage, ReadyQueue};
pub use socket::{Domain, MrpSocket, SocketConfig, SOCK_MRP};
pub use unacked::{PendingMessage, UnackedTable};
