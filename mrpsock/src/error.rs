use thiserror::Error;

use crate::socket::Domain;

/// All errors produced by the MRP socket layer.
#[derive(Debug, Error)]
pub enum MrpSockError {
    #[error("invalid socket type {0}: MRP sockets must be created with SOCK_MRP (15)")]
    InvalidSocketType(u32),

    #[error("transport initialisation failed: {0}")]
    Init(#[source] std::io::Error),

    #[error("address family mismatch: socket was created for {domain:?}")]
    AddressFamilyMismatch { domain: Domain },

    #[error("socket is already bound")]
    AlreadyBound,

    #[error("socket is not bound")]
    NotBound,

    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort { expected: usize, actual: usize },

    #[error("unknown frame type: 0x{0:02x}")]
    UnknownFrameType(u8),

    #[error("payload too large: {size} bytes exceeds maximum {max}")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("unacknowledged-send table full: {capacity} messages in flight")]
    TableFull { capacity: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MrpSockError>;
