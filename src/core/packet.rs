//! Packet type and binary codec.
//!
//! A packet is a 16-byte header followed by a payload of 32-bit words.
//! The header carries `client_id` and `sequence` (both echoed verbatim from
//! request to response), the command or response `code`, and the payload
//! byte length. Field order and the length invariants are fixed by the wire
//! format; byte order is fixed little-endian on both ends.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{ProtocolError, Result};

/// Byte length of the fixed packet header.
pub const HEADER_SIZE: usize = 16;

/// Get-challenge command code.
pub const CMD_GET_CHALLENGE: i32 = 0x2700;

/// Challenge response code. Deliberately the same value as the request code;
/// the field is interpreted per direction.
pub const RESPONSE_CHALLENGE: i32 = 0x2700;

/// Response code for requests carrying an unrecognized command code.
/// Never valid as a request code from a well-behaved client.
pub const RESPONSE_UNKNOWN_PACKET: i32 = -1;

/// One self-contained protocol message.
///
/// The wire-level `payload_len` field is computed on encode and validated on
/// decode; it is never stored here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Echoed verbatim from request to response; not validated against
    /// connection identity.
    pub client_id: u32,
    /// Caller-assigned correlation token, echoed verbatim.
    pub sequence: u32,
    /// Command identifier on requests, response kind on responses.
    pub code: i32,
    /// Command-specific data words.
    pub payload: Vec<u32>,
}

impl Packet {
    pub fn new(client_id: u32, sequence: u32, code: i32, payload: Vec<u32>) -> Self {
        Self {
            client_id,
            sequence,
            code,
            payload,
        }
    }

    /// Payload byte length as carried in the header.
    pub fn payload_len(&self) -> u32 {
        (self.payload.len() * 4) as u32
    }

    /// Decode one packet from the bytes of one transport message.
    ///
    /// Fails if the message is shorter than a header, not word-aligned, or
    /// its declared payload length disagrees with the actual remainder.
    /// These are the framing invariants; callers treat any such failure as
    /// a malformed packet to be discarded.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let size = bytes.len();

        if size < HEADER_SIZE {
            return Err(ProtocolError::TruncatedPacket(size));
        }

        if size % 4 != 0 {
            return Err(ProtocolError::MisalignedPacket(size));
        }

        let declared = read_word(bytes, 12);
        let actual = (size - HEADER_SIZE) as u32;

        if declared != actual {
            return Err(ProtocolError::PayloadLengthMismatch { declared, actual });
        }

        let payload = bytes[HEADER_SIZE..]
            .chunks_exact(4)
            .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
            .collect();

        Ok(Self {
            client_id: read_word(bytes, 0),
            sequence: read_word(bytes, 4),
            code: read_word(bytes, 8) as i32,
            payload,
        })
    }

    /// Encode this packet into the bytes of one transport message.
    ///
    /// The `payload_len` header field is always computed from the payload.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_SIZE + self.payload.len() * 4);

        buf.put_u32_le(self.client_id);
        buf.put_u32_le(self.sequence);
        buf.put_i32_le(self.code);
        buf.put_u32_le(self.payload_len());

        for word in &self.payload {
            buf.put_u32_le(*word);
        }

        buf.freeze()
    }
}

fn read_word(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn encode_layout_is_little_endian() {
        let packet = Packet::new(7, 1, CMD_GET_CHALLENGE, vec![0xAABBCCDD]);
        let bytes = packet.encode();

        assert_eq!(bytes.len(), 20);
        assert_eq!(&bytes[0..4], &[7, 0, 0, 0]);
        assert_eq!(&bytes[4..8], &[1, 0, 0, 0]);
        assert_eq!(&bytes[8..12], &[0x00, 0x27, 0, 0]);
        assert_eq!(&bytes[12..16], &[4, 0, 0, 0]);
        assert_eq!(&bytes[16..20], &[0xDD, 0xCC, 0xBB, 0xAA]);
    }

    #[test]
    fn negative_code_round_trips() {
        let packet = Packet::new(3, 9, RESPONSE_UNKNOWN_PACKET, vec![0x1234]);
        let decoded = Packet::decode(&packet.encode()).unwrap();

        assert_eq!(decoded, packet);
        assert_eq!(decoded.code, -1);
    }

    #[test]
    fn empty_payload_is_a_bare_header() {
        let packet = Packet::new(1, 2, 3, vec![]);
        let bytes = packet.encode();

        assert_eq!(bytes.len(), HEADER_SIZE);
        assert_eq!(Packet::decode(&bytes).unwrap().payload, Vec::<u32>::new());
    }

    #[test]
    fn payload_len_is_computed_not_trusted() {
        let mut bytes = Packet::new(1, 2, 3, vec![5]).encode().to_vec();

        // Corrupt the declared length; decode must reject the message.
        bytes[12] = 8;
        let err = Packet::decode(&bytes).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::PayloadLengthMismatch {
                declared: 8,
                actual: 4
            }
        ));
    }
}
