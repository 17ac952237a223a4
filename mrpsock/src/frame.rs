use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{MrpSockError, Result};

/// Maximum payload carried by a single DATA frame.
pub const MAX_PAYLOAD_SIZE: usize = 100;

/// Fixed header: 1-byte type tag + 2-byte message id.
pub const HEADER_SIZE: usize = 3;

/// Largest frame that can appear on the wire.
pub const MAX_FRAME_SIZE: usize = HEADER_SIZE + MAX_PAYLOAD_SIZE;

/// Frame type identifiers carried on the wire.
///
/// The wire values are the ASCII bytes `'D'` and `'A'`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameType {
    Data = 0x44,
    Ack = 0x41,
}

impl TryFrom<u8> for FrameType {
    type Error = MrpSockError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x44 => Ok(FrameType::Data),
            0x41 => Ok(FrameType::Ack),
            other => Err(MrpSockError::UnknownFrameType(other)),
        }
    }
}

/// MRP wire frame.
///
/// Binary layout (msg_id big-endian):
///
/// ```text
/// +-------+-----------+---- variable ----+
/// | type  |  msg_id   | payload (DATA    |
/// | (1B)  |  (2B BE)  | only, 0..=100B)  |
/// +-------+-----------+------------------+
/// ```
///
/// ACK frames carry no payload. A zero-length DATA payload is legal and
/// round-trips as a 0-byte delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// DATA: msg_id(2) + payload(N), N <= MAX_PAYLOAD_SIZE
    Data { msg_id: u16, payload: Bytes },
    /// ACK: msg_id(2)
    Ack { msg_id: u16 },
}

impl Frame {
    /// Return the frame type discriminant.
    pub fn frame_type(&self) -> FrameType {
        match self {
            Frame::Data { .. } => FrameType::Data,
            Frame::Ack { .. } => FrameType::Ack,
        }
    }

    /// Return the message id carried by this frame.
    pub fn msg_id(&self) -> u16 {
        match self {
            Frame::Data { msg_id, .. } => *msg_id,
            Frame::Ack { msg_id } => *msg_id,
        }
    }

    /// Encode this frame into a byte buffer.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode_into(&mut buf);
        buf.freeze()
    }

    /// Encode into a pre-allocated `BytesMut`.
    pub fn encode_into(&self, buf: &mut BytesMut) {
        match self {
            Frame::Data { msg_id, payload } => {
                buf.put_u8(FrameType::Data as u8);
                buf.put_u16(*msg_id);
                buf.put_slice(payload);
            }
            Frame::Ack { msg_id } => {
                buf.put_u8(FrameType::Ack as u8);
                buf.put_u16(*msg_id);
            }
        }
    }

    /// The total number of bytes this frame will occupy when encoded.
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE
            + match self {
                Frame::Data { payload, .. } => payload.len(),
                Frame::Ack { .. } => 0,
            }
    }

    /// Decode a frame from the given byte buffer.
    ///
    /// Fails with `FrameTooShort` for buffers shorter than the fixed
    /// header, with `UnknownFrameType` for a type byte other than
    /// `'D'`/`'A'`, and with `PayloadTooLarge` for a DATA frame whose
    /// payload exceeds [`MAX_PAYLOAD_SIZE`]. Zero-length transport reads
    /// are a sentinel handled above the codec and never reach `decode`.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(MrpSockError::FrameTooShort {
                expected: HEADER_SIZE,
                actual: data.len(),
            });
        }

        let frame_type = FrameType::try_from(data[0])?;
        let msg_id = (&data[1..HEADER_SIZE]).get_u16();

        match frame_type {
            FrameType::Data => {
                let payload = &data[HEADER_SIZE..];
                if payload.len() > MAX_PAYLOAD_SIZE {
                    return Err(MrpSockError::PayloadTooLarge {
                        size: payload.len(),
                        max: MAX_PAYLOAD_SIZE,
                    });
                }
                Ok(Frame::Data {
                    msg_id,
                    payload: Bytes::copy_from_slice(payload),
                })
            }
            // Trailing bytes after an ACK header are ignored.
            FrameType::Ack => Ok(Frame::Ack { msg_id }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_wire_bytes_exact() {
        let frame = Frame::Data {
            msg_id: 0x0102,
            payload: Bytes::from_static(b"hi"),
        };
        let encoded = frame.encode();
        assert_eq!(&encoded[..], &[0x44, 0x01, 0x02, b'h', b'i']);
    }

    #[test]
    fn ack_wire_bytes_exact() {
        let frame = Frame::Ack { msg_id: 0xBEEF };
        let encoded = frame.encode();
        assert_eq!(&encoded[..], &[0x41, 0xBE, 0xEF]);
    }

    #[test]
    fn encoded_len_matches_encode() {
        let frames = [
            Frame::Data {
                msg_id: 7,
                payload: Bytes::from_static(b"payload"),
            },
            Frame::Data {
                msg_id: 0,
                payload: Bytes::new(),
            },
            Frame::Ack { msg_id: 65535 },
        ];
        for frame in &frames {
            assert_eq!(frame.encode().len(), frame.encoded_len());
        }
    }

    #[test]
    fn decode_rejects_short_buffer() {
        assert!(Frame::decode(&[0x44, 0x00]).is_err());
        assert!(Frame::decode(&[0x44]).is_err());
        assert!(Frame::decode(&[]).is_err());
    }

    #[test]
    fn decode_rejects_unknown_type() {
        let result = Frame::decode(&[0xFF, 0x00, 0x01]);
        assert!(matches!(result, Err(MrpSockError::UnknownFrameType(0xFF))));
    }

    #[test]
    fn decode_rejects_oversized_payload() {
        let mut raw = vec![0x44, 0x00, 0x01];
        raw.extend(std::iter::repeat(0xAB).take(MAX_PAYLOAD_SIZE + 1));
        assert!(matches!(
            Frame::decode(&raw),
            Err(MrpSockError::PayloadTooLarge { .. })
        ));
    }
}
