pub mod connection;
pub mod ice;
pub mod state;
pub mod types;

pub use connection::{
    CaptureSource, MediaTransport, NegotiationError, RtcTransport, RtcTransportFactory,
    TransportFactory,
};
pub use ice::CandidateBuffer;
pub use state::{Role, Session, SessionState};
pub use types::{LocalStream, PendingCandidate, SdpKind, ServerConfig, SessionDescription};
