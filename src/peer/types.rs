use serde::{Deserialize, Serialize};
use std::sync::Arc;
use webrtc::track::track_local::TrackLocal;

/// Which half of the offer/answer exchange a description belongs to
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdpKind {
    Offer,
    Answer,
}

/// Session description handed between the state machine and the transport
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription {
    pub kind: SdpKind,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Answer,
            sdp: sdp.into(),
        }
    }
}

/// ICE candidate waiting to be applied to the transport.
/// `candidate == None` is the end-of-candidates sentinel.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PendingCandidate {
    pub candidate: Option<String>,
    pub sdp_mid: Option<String>,
    pub sdp_mline_index: Option<u16>,
}

impl PendingCandidate {
    pub fn end_of_candidates() -> Self {
        Self {
            candidate: None,
            sdp_mid: None,
            sdp_mline_index: None,
        }
    }

    pub fn is_end(&self) -> bool {
        self.candidate.is_none()
    }
}

/// Local media stream handle produced by the capture collaborator
#[derive(Clone, Default)]
pub struct LocalStream {
    pub tracks: Vec<Arc<dyn TrackLocal + Send + Sync>>,
}

impl LocalStream {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// ICE server configuration
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ServerConfig {
    pub id: String,
    pub r#type: String, // 'stun' or 'turn'
    pub url: String,
    pub username: Option<String>,
    pub credential: Option<String>,
}
