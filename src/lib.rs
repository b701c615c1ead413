//! Offer/answer negotiation core for two-party WebRTC calls.
//!
//! Two endpoints that cannot address each other directly exchange
//! connection-setup metadata through a relay channel of the host's choosing.
//! The crate owns the negotiation state machine: drive it with
//! [`SessionHandle`], forward everything it emits on the outbound stream to
//! your relay, and feed every relay payload back in with
//! [`SessionHandle::deliver`].

pub mod config;
pub mod logger;
pub mod peer;
pub mod session;
pub mod signaling;
pub mod utils;

pub use logger::Notifier;
pub use peer::{
    CandidateBuffer, CaptureSource, LocalStream, MediaTransport, NegotiationError,
    PendingCandidate, Role, RtcTransportFactory, SdpKind, ServerConfig, SessionDescription,
    SessionState, TransportFactory,
};
pub use session::{LifecycleEvent, SessionDriver, SessionError, SessionHandle};
pub use signaling::{decode, encode, MalformedMessage, SignalingMessage};
pub use utils::random_id;
