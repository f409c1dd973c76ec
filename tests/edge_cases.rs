#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Boundary tests for packet framing and session recovery.

use ws_packet_server::core::packet::{Packet, CMD_GET_CHALLENGE, HEADER_SIZE};
use ws_packet_server::error::ProtocolError;
use ws_packet_server::protocol::session::{ChallengeGenerator, Session};

// ============================================================================
// PACKET CODEC EDGE CASES
// ============================================================================

#[test]
fn test_empty_buffer_rejected() {
    let result = Packet::decode(&[]);
    assert!(
        matches!(result, Err(ProtocolError::TruncatedPacket(0))),
        "Should reject empty buffer"
    );
}

#[test]
fn test_truncated_header_rejected() {
    for size in [1, 4, 12, 15] {
        let bytes = vec![0u8; size];
        let result = Packet::decode(&bytes);
        assert!(
            matches!(result, Err(ProtocolError::TruncatedPacket(s)) if s == size),
            "Should reject {size}-byte buffer"
        );
    }
}

#[test]
fn test_misaligned_length_rejected() {
    // Long enough for a header but not word-aligned.
    for size in [17, 18, 19, 21] {
        let bytes = vec![0u8; size];
        let result = Packet::decode(&bytes);
        assert!(
            matches!(result, Err(ProtocolError::MisalignedPacket(s)) if s == size),
            "Should reject {size}-byte buffer"
        );
    }
}

#[test]
fn test_declared_length_mismatch_rejected_in_both_directions() {
    // Claims more payload than present.
    let mut over = Packet::new(1, 1, 0, vec![]).encode().to_vec();
    over[12] = 4;
    assert!(matches!(
        Packet::decode(&over),
        Err(ProtocolError::PayloadLengthMismatch {
            declared: 4,
            actual: 0
        })
    ));

    // Claims less payload than present.
    let mut under = Packet::new(1, 1, 0, vec![0xAA, 0xBB]).encode().to_vec();
    under[12] = 4;
    assert!(matches!(
        Packet::decode(&under),
        Err(ProtocolError::PayloadLengthMismatch {
            declared: 4,
            actual: 8
        })
    ));
}

#[test]
fn test_header_only_packet_decodes() {
    let bytes = Packet::new(7, 1, CMD_GET_CHALLENGE, vec![]).encode();
    assert_eq!(bytes.len(), HEADER_SIZE);

    let packet = Packet::decode(&bytes).expect("bare header should decode");
    assert_eq!(packet.client_id, 7);
    assert_eq!(packet.sequence, 1);
    assert_eq!(packet.code, CMD_GET_CHALLENGE);
    assert!(packet.payload.is_empty());
}

#[test]
fn test_largest_transport_message_decodes() {
    // 64 KiB message: header plus 16380 payload words.
    let words = (65536 - HEADER_SIZE) / 4;
    let packet = Packet::new(1, 1, 0x42, vec![0xDEAD_BEEF; words]);
    let bytes = packet.encode();
    assert_eq!(bytes.len(), 65536);

    let decoded = Packet::decode(&bytes).expect("max-size packet should decode");
    assert_eq!(decoded.payload.len(), words);
    assert_eq!(decoded, packet);
}

// ============================================================================
// SESSION RECOVERY EDGE CASES
// ============================================================================

fn test_session() -> Session {
    let peer = "127.0.0.1:6502".parse().unwrap();
    Session::new(1, peer, &ChallengeGenerator::seeded(99), 64)
}

#[test]
fn test_malformed_input_queues_nothing() {
    let mut session = test_session();

    for bad in [
        &[][..],
        &[0u8; 10][..],
        &[0u8; 15][..],
        &[0u8; 18][..],
        // Aligned, but the length field disagrees with the actual size.
        &[0u8; 24][..],
    ] {
        session.receive(bad).expect("malformed input is not fatal");
        assert!(session.pop_outbound().is_none(), "no response for {bad:?}");
    }
}

#[test]
fn test_session_recovers_after_malformed_input() {
    let mut session = test_session();

    session.receive(&[0u8; 10]).unwrap();
    session
        .receive(&Packet::new(7, 1, CMD_GET_CHALLENGE, vec![]).encode())
        .unwrap();

    let response = session.pop_outbound().expect("valid request still answered");
    assert_eq!(response.sequence, 1);
    assert_eq!(
        response.payload,
        vec![
            session.challenge() as u32,
            (session.challenge() >> 32) as u32
        ]
    );
}

#[test]
fn test_request_payload_does_not_affect_dispatch() {
    // The get-challenge command ignores any payload words it is sent.
    let mut session = test_session();

    session
        .receive(&Packet::new(7, 1, CMD_GET_CHALLENGE, vec![1, 2, 3]).encode())
        .unwrap();

    let response = session.pop_outbound().expect("response queued");
    assert_eq!(response.payload.len(), 2);
}
