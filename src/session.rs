use crate::logger::{log, Notifier};
use crate::peer::connection::{CaptureSource, MediaTransport, NegotiationError, TransportFactory};
use crate::peer::state::{Role, Session, SessionState};
use crate::peer::types::{PendingCandidate, SessionDescription};
use crate::signaling::{self, SignalingMessage};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Notifications for the hosting layer (UI, automation)
#[derive(Debug)]
pub enum LifecycleEvent {
    /// The remote endpoint announced it is ready to negotiate
    PeerReady,
    /// A remote offer is being held; call `SessionHandle::accept` to answer
    IncomingOffer { peer: String },
    Connected,
    /// The session was destroyed (bye, hangup or fatal error)
    Disconnected,
    /// A rejected or dropped event; the session survives unless the error
    /// was a negotiation failure
    Error(SessionError),
}

/// Everything that can go wrong while driving a session
#[derive(Debug, Error)]
pub enum SessionError {
    /// Undecodable relay payload, dropped without touching the session
    #[error("malformed signaling message: {0}")]
    Malformed(String),
    /// A valid message arrived in a state that cannot accept it
    #[error("{event} not acceptable while {state:?}")]
    ProtocolViolation {
        event: &'static str,
        state: SessionState,
    },
    /// Simultaneous offers; the losing offer was dropped
    #[error("offer glare with {peer}, losing offer dropped")]
    GlareConflict { peer: String },
    /// The transport rejected an operation; session-fatal
    #[error(transparent)]
    Negotiation(#[from] NegotiationError),
}

/// Local intents and inbound relay payloads, funneled through one queue
enum SessionEvent {
    AnnounceReady,
    Start,
    Accept,
    Inbound(String),
    /// Queued twin of `Control::HangUp`; guarantees the teardown happens at
    /// its position in the queue even when the control copy arrives early
    HangUp,
}

/// Hangup travels on its own channel so it can preempt an in-flight transition
enum Control {
    HangUp,
}

/// Cheap cloneable front door to the driver
#[derive(Clone)]
pub struct SessionHandle {
    events: mpsc::UnboundedSender<SessionEvent>,
    control: mpsc::UnboundedSender<Control>,
    state: watch::Receiver<SessionState>,
}

impl SessionHandle {
    /// Announce local readiness to the peer (only meaningful while idle).
    pub fn announce_ready(&self) {
        let _ = self.events.send(SessionEvent::AnnounceReady);
    }

    /// Initiate a call as the caller.
    pub fn start(&self) {
        let _ = self.events.send(SessionEvent::Start);
    }

    /// Answer the remote offer announced via `LifecycleEvent::IncomingOffer`.
    pub fn accept(&self) {
        let _ = self.events.send(SessionEvent::Accept);
    }

    /// Feed one raw payload received from the relay channel.
    pub fn deliver(&self, raw: impl Into<String>) {
        let _ = self.events.send(SessionEvent::Inbound(raw.into()));
    }

    /// Tear the session down. Preempts any transition still in flight and is
    /// idempotent; also the way to reject an incoming offer.
    pub fn hang_up(&self) {
        // two copies: the queued one tears down after any intent sent before
        // it, the control one interrupts whatever is in flight right now
        let _ = self.events.send(SessionEvent::HangUp);
        let _ = self.control.send(Control::HangUp);
    }

    /// Current state of the negotiation.
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }
}

/// Owns the single `Session` and serializes every event applied to it.
///
/// WebRTC negotiation is strictly sequential, so the driver applies at most
/// one transition at a time; the only thing allowed to interrupt one is a
/// hangup, whose in-flight transition is discarded before teardown.
pub struct SessionDriver {
    local_id: String,
    peer_id: String,
    factory: Box<dyn TransportFactory>,
    capture: Box<dyn CaptureSource>,
    session: Option<Session>,
    outbound: mpsc::UnboundedSender<SignalingMessage>,
    notifier: Notifier,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    control: Option<mpsc::UnboundedReceiver<Control>>,
    state_tx: watch::Sender<SessionState>,
}

impl SessionDriver {
    /// Build a driver plus its handle, the outbound message stream for the
    /// host to relay, and the lifecycle notification stream.
    pub fn new(
        local_id: impl Into<String>,
        peer_id: impl Into<String>,
        factory: Box<dyn TransportFactory>,
        capture: Box<dyn CaptureSource>,
    ) -> (
        SessionDriver,
        SessionHandle,
        mpsc::UnboundedReceiver<SignalingMessage>,
        mpsc::UnboundedReceiver<LifecycleEvent>,
    ) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (notifier, lifecycle_rx) = Notifier::new();
        let (state_tx, state_rx) = watch::channel(SessionState::Idle);

        let driver = SessionDriver {
            local_id: local_id.into(),
            peer_id: peer_id.into(),
            factory,
            capture,
            session: None,
            outbound: outbound_tx,
            notifier,
            events: events_rx,
            control: Some(control_rx),
            state_tx,
        };
        let handle = SessionHandle {
            events: events_tx,
            control: control_tx,
            state: state_rx,
        };
        (driver, handle, outbound_rx, lifecycle_rx)
    }

    /// Consume the driver and process events until every handle is gone.
    pub async fn run(mut self) {
        let Some(mut control) = self.control.take() else {
            return;
        };
        loop {
            tokio::select! {
                biased;
                ctrl = control.recv() => match ctrl {
                    Some(Control::HangUp) => self.local_hangup().await,
                    None => break,
                },
                event = self.events.recv() => {
                    let Some(event) = event else { break };
                    let preempted = tokio::select! {
                        biased;
                        ctrl = control.recv() => Some(ctrl),
                        _ = self.apply(event) => None,
                    };
                    match preempted {
                        Some(Some(Control::HangUp)) => {
                            log("Hangup preempted an in-flight transition, result discarded");
                            self.local_hangup().await;
                        }
                        Some(None) => break,
                        None => {}
                    }
                }
            }
        }
        log("Session driver stopped");
    }

    async fn apply(&mut self, event: SessionEvent) {
        let result = match event {
            SessionEvent::AnnounceReady => self.announce_ready(),
            SessionEvent::Start => self.start_call().await,
            SessionEvent::Accept => self.accept_call().await,
            SessionEvent::Inbound(raw) => self.inbound(raw).await,
            SessionEvent::HangUp => {
                self.local_hangup().await;
                Ok(())
            }
        };
        if let Err(err) = result {
            let fatal = matches!(err, SessionError::Negotiation(_));
            self.notifier.error(err);
            if fatal {
                self.teardown(false).await;
            }
        }
    }

    fn announce_ready(&mut self) -> Result<(), SessionError> {
        if self.session.is_some() {
            log("Ready announcement skipped, negotiation already in progress");
            return Ok(());
        }
        self.send(SignalingMessage::Ready);
        Ok(())
    }

    async fn start_call(&mut self) -> Result<(), SessionError> {
        if let Some(session) = &self.session {
            return Err(SessionError::ProtocolViolation {
                event: "start",
                state: session.state,
            });
        }

        let (transport, pump) = self.open_transport().await?;
        let mut session = Session::new(Role::Caller, SessionState::Offering, transport);
        session.candidate_pump = Some(pump);
        // stored before the async steps so any failure closes it exactly once
        self.session = Some(session);
        self.set_state(SessionState::Offering);

        let stream = self.capture.acquire().await?;
        let offer = {
            let session = self.session_mut("start")?;
            session.transport.attach_local_stream(stream).await?;
            session.local_stream_attached = true;
            session.transport.create_offer().await?
        };
        self.send(SignalingMessage::Offer { sdp: offer.sdp });
        Ok(())
    }

    async fn accept_call(&mut self) -> Result<(), SessionError> {
        let state = self.session.as_ref().map(|s| s.state);
        if state != Some(SessionState::Answering) {
            return Err(SessionError::ProtocolViolation {
                event: "accept",
                state: state.unwrap_or(SessionState::Idle),
            });
        }

        let stream = self.capture.acquire().await?;
        let answer = {
            let session = self.session_mut("accept")?;
            let offer = session.pending_offer.take().ok_or_else(|| {
                NegotiationError::new("answering session holds no remote offer")
            })?;
            session.transport.attach_local_stream(stream).await?;
            session.local_stream_attached = true;
            session.transport.apply_remote_description(offer).await?;
            session.has_remote_description = true;
            for candidate in session.buffer.drain_all() {
                session.transport.apply_candidate(candidate).await?;
            }
            session.transport.create_answer().await?
        };
        self.send(SignalingMessage::Answer { sdp: answer.sdp });
        self.set_state(SessionState::Connected);
        self.notifier.connected();
        Ok(())
    }

    async fn inbound(&mut self, raw: String) -> Result<(), SessionError> {
        let message =
            signaling::decode(&raw).map_err(|err| SessionError::Malformed(err.to_string()))?;
        match message {
            SignalingMessage::Ready => self.ready_received(),
            SignalingMessage::Offer { sdp } => {
                self.offer_received(SessionDescription::offer(sdp)).await
            }
            SignalingMessage::Answer { sdp } => {
                self.answer_received(SessionDescription::answer(sdp)).await
            }
            SignalingMessage::Candidate {
                candidate,
                sdp_mid,
                sdp_mline_index,
            } => {
                self.candidate_received(PendingCandidate {
                    candidate,
                    sdp_mid,
                    sdp_mline_index,
                })
                .await
            }
            SignalingMessage::Bye => {
                self.bye_received().await;
                Ok(())
            }
        }
    }

    fn ready_received(&mut self) -> Result<(), SessionError> {
        if self.session.is_some() {
            log("Peer ready ignored, negotiation already in progress");
            return Ok(());
        }
        self.notifier.peer_ready();
        Ok(())
    }

    async fn offer_received(&mut self, offer: SessionDescription) -> Result<(), SessionError> {
        let Some(session) = &self.session else {
            self.begin_callee(offer).await?;
            self.notifier.incoming_offer(&self.peer_id);
            return Ok(());
        };

        // Glare: an offer arrived while a negotiation already exists. The
        // lexicographically lesser endpoint id keeps its offer; exactly one
        // side ever adopts.
        if session.state == SessionState::Offering && self.local_id > self.peer_id {
            log("Glare: local offer lost the tie-break, adopting the remote offer");
            self.notifier.error(SessionError::GlareConflict {
                peer: self.peer_id.clone(),
            });
            self.teardown(false).await;
            self.begin_callee(offer).await?;
            // the host already asked for this call, no point prompting again
            return self.accept_call().await;
        }

        Err(SessionError::GlareConflict {
            peer: self.peer_id.clone(),
        })
    }

    async fn answer_received(&mut self, answer: SessionDescription) -> Result<(), SessionError> {
        let state = self.session.as_ref().map(|s| s.state);
        if state != Some(SessionState::Offering) {
            return Err(SessionError::ProtocolViolation {
                event: "answer",
                state: state.unwrap_or(SessionState::Idle),
            });
        }
        {
            let session = self.session_mut("answer")?;
            session.transport.apply_remote_description(answer).await?;
            session.has_remote_description = true;
            for candidate in session.buffer.drain_all() {
                session.transport.apply_candidate(candidate).await?;
            }
        }
        self.set_state(SessionState::Connected);
        self.notifier.connected();
        Ok(())
    }

    async fn candidate_received(
        &mut self,
        candidate: PendingCandidate,
    ) -> Result<(), SessionError> {
        let Some(session) = self.session.as_mut() else {
            // no session to attach the candidate to
            return Err(SessionError::ProtocolViolation {
                event: "candidate",
                state: SessionState::Idle,
            });
        };
        if session.has_remote_description {
            session.transport.apply_candidate(candidate).await?;
        } else {
            log("Remote description not set yet, queuing candidate");
            session.buffer.enqueue(candidate);
        }
        Ok(())
    }

    async fn bye_received(&mut self) {
        if self.session.is_none() {
            log("Bye while idle is a no-op");
            return;
        }
        self.teardown(false).await;
    }

    async fn local_hangup(&mut self) {
        if self.session.is_none() {
            log("Hangup while idle is a no-op");
            return;
        }
        self.teardown(true).await;
    }

    /// Create a session holding the remote offer until the local side accepts.
    async fn begin_callee(&mut self, offer: SessionDescription) -> Result<(), SessionError> {
        let (transport, pump) = self.open_transport().await?;
        let mut session = Session::new(Role::Callee, SessionState::Answering, transport);
        session.candidate_pump = Some(pump);
        session.pending_offer = Some(offer);
        self.session = Some(session);
        self.set_state(SessionState::Answering);
        Ok(())
    }

    /// Fresh transport per session; locally gathered candidates are pumped
    /// straight to the relay as candidate messages.
    async fn open_transport(
        &mut self,
    ) -> Result<(Box<dyn MediaTransport>, JoinHandle<()>), SessionError> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let transport = self.factory.open(tx).await?;
        let outbound = self.outbound.clone();
        let pump = tokio::spawn(async move {
            while let Some(candidate) = rx.recv().await {
                if outbound.send(SignalingMessage::from(candidate)).is_err() {
                    break;
                }
            }
        });
        Ok((transport, pump))
    }

    /// Destroy the session: stop the candidate pump, release the transport
    /// exactly once, drop the buffer, return to Idle.
    async fn teardown(&mut self, notify_peer: bool) {
        let Some(mut session) = self.session.take() else {
            log("Teardown requested with no session, ignoring");
            return;
        };
        if let Some(pump) = session.candidate_pump.take() {
            pump.abort();
        }
        if notify_peer {
            self.send(SignalingMessage::Bye);
        }
        if let Err(err) = session.transport.close().await {
            log(&format!("Transport close failed: {err}"));
        }
        self.set_state(SessionState::Idle);
        self.notifier.disconnected();
        // candidate buffer and any held offer die with the session
    }

    fn session_mut(&mut self, event: &'static str) -> Result<&mut Session, SessionError> {
        self.session.as_mut().ok_or(SessionError::ProtocolViolation {
            event,
            state: SessionState::Idle,
        })
    }

    fn send(&self, message: SignalingMessage) {
        if self.outbound.send(message).is_err() {
            log("Outbound receiver dropped, relay message lost");
        }
    }

    fn set_state(&mut self, state: SessionState) {
        if let Some(session) = self.session.as_mut() {
            session.state = state;
        }
        let _ = self.state_tx.send_replace(state);
        log(&format!("Session state -> {state:?}"));
    }
}
