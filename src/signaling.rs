use crate::peer::types::PendingCandidate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The payload could not be decoded into a signaling message. The message is
/// dropped and reported; the state machine is never touched.
#[derive(Debug, Error)]
#[error("malformed signaling message: {0}")]
pub struct MalformedMessage(#[from] serde_json::Error);

/// One message on the relay channel. Transient: built for a single
/// send or receive, never retained.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SignalingMessage {
    /// Local side is ready to negotiate
    Ready,
    Offer {
        sdp: String,
    },
    Answer {
        sdp: String,
    },
    /// Connectivity candidate; an absent `candidate` field means
    /// end-of-candidates
    Candidate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        candidate: Option<String>,
        #[serde(
            rename = "sdpMid",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        sdp_mid: Option<String>,
        #[serde(
            rename = "sdpMLineIndex",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        sdp_mline_index: Option<u16>,
    },
    /// Session termination notice
    Bye,
}

impl From<PendingCandidate> for SignalingMessage {
    fn from(c: PendingCandidate) -> Self {
        SignalingMessage::Candidate {
            candidate: c.candidate,
            sdp_mid: c.sdp_mid,
            sdp_mline_index: c.sdp_mline_index,
        }
    }
}

/// Decode a raw relay payload into a typed message.
pub fn decode(raw: &str) -> Result<SignalingMessage, MalformedMessage> {
    Ok(serde_json::from_str(raw)?)
}

/// Serialize a message for the relay channel.
pub fn encode(message: &SignalingMessage) -> Result<String, MalformedMessage> {
    Ok(serde_json::to_string(message)?)
}
