//! The two JSON shapes exchanged with the server under test.
//!
//! Clients send a [`ClientMessage`] per binary frame; the server answers every
//! one of them with several [`ServerMessage`]s, in text or binary frames.

use crate::error::Error;
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientMessage {
    pub client_id: usize,
    pub msg_id: usize,
    #[serde(rename = "msg")]
    pub payload: String,
    /// Unix time in milliseconds when the message was built.
    pub created_at: u64,
}

impl ClientMessage {
    pub fn new(client_id: usize, msg_id: usize, payload: String) -> Self {
        Self {
            client_id,
            msg_id,
            payload,
            created_at: now_millis(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerMessage {
    pub client_id: usize,
    pub msg_id: usize,
    #[serde(rename = "msg")]
    pub payload: String,
    pub created_at: i64,
    pub client_ts: i64,
    pub server_latency: i64,
}

pub fn encode_client_message(message: &ClientMessage) -> Result<Vec<u8>, Error> {
    serde_json::to_vec(message).map_err(|source| Error::EncodeError { source })
}

pub fn decode_server_message(bytes: &[u8]) -> Result<ServerMessage, Error> {
    serde_json::from_slice(bytes).map_err(|source| Error::DecodeError { source })
}

// A clock before 1970 is reported as 0 rather than failing the send
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}

/// Random alphanumeric payload, used when a specific message size is requested.
pub fn random_payload(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_client_message_wire_format() {
        let message = ClientMessage {
            client_id: 3,
            msg_id: 7,
            payload: String::from("hello"),
            created_at: 1_700_000_000_000,
        };

        let encoded = encode_client_message(&message).unwrap();
        let value: Value = serde_json::from_slice(&encoded).unwrap();

        assert_eq!(
            value,
            json!({
                "client_id": 3,
                "msg_id": 7,
                "msg": "hello",
                "created_at": 1_700_000_000_000u64,
            })
        );
    }

    #[test]
    fn test_decode_server_message() {
        let raw = br#"{"client_id":1,"msg_id":0,"msg":"echo","created_at":10,"client_ts":8,"server_latency":2}"#;

        let message = decode_server_message(raw).unwrap();
        assert_eq!(message.client_id, 1);
        assert_eq!(message.payload, "echo");
        assert_eq!(message.server_latency, 2);
    }

    #[test]
    fn test_decode_rejects_malformed_input() {
        let truncated = br#"{"client_id":1,"msg_id":0,"msg":"ec"#;
        assert!(matches!(
            decode_server_message(truncated),
            Err(Error::DecodeError { .. })
        ));

        // a client message lacks the fields only the server adds
        let client_shaped = br#"{"client_id":1,"msg_id":0,"msg":"x","created_at":1}"#;
        assert!(decode_server_message(client_shaped).is_err());
    }

    #[test]
    fn test_random_payload() {
        let payload = random_payload(1024);
        assert_eq!(payload.len(), 1024);
        assert!(payload.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
