use crate::peer::connection::MediaTransport;
use crate::peer::ice::CandidateBuffer;
use crate::peer::types::SessionDescription;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

/// ========== SESSION STATE ==========

/// Lifecycle of the single negotiation owned by this endpoint
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session; initial and terminal
    Idle,
    /// Local offer sent, waiting for the answer
    Offering,
    /// Remote offer held, waiting for the local accept
    Answering,
    /// Both descriptions applied
    Connected,
}

/// Which side initiated the negotiation. Fixed for the session's lifetime.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Caller,
    Callee,
}

/// The one negotiation in progress. Created on a local start or an accepted
/// inbound offer, destroyed on bye/hangup/fatal error. Owns the transport
/// handle and the candidate buffer exclusively.
pub struct Session {
    pub state: SessionState,
    pub role: Role,
    pub has_remote_description: bool,
    pub local_stream_attached: bool,
    /// Remote offer held until the local side accepts (callee only)
    pub pending_offer: Option<SessionDescription>,
    pub transport: Box<dyn MediaTransport>,
    pub buffer: CandidateBuffer,
    /// Pump forwarding locally gathered candidates to the relay
    pub candidate_pump: Option<JoinHandle<()>>,
}

impl Session {
    pub fn new(role: Role, state: SessionState, transport: Box<dyn MediaTransport>) -> Self {
        Self {
            state,
            role,
            has_remote_description: false,
            local_stream_attached: false,
            pending_offer: None,
            transport,
            buffer: CandidateBuffer::new(),
            candidate_pump: None,
        }
    }
}
