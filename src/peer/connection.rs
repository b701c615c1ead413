use crate::logger::{dump_candidate, log};
use crate::peer::types::{LocalStream, PendingCandidate, SdpKind, ServerConfig, SessionDescription};
use crate::utils::add_ice_url_scheme;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::peer_connection::policy::bundle_policy::RTCBundlePolicy;
use webrtc::peer_connection::policy::rtcp_mux_policy::RTCRtcpMuxPolicy;
use webrtc::{
    api::APIBuilder,
    ice_transport::ice_server::RTCIceServer,
    peer_connection::{
        configuration::RTCConfiguration, peer_connection_state::RTCPeerConnectionState,
        sdp::session_description::RTCSessionDescription, RTCPeerConnection,
    },
};

/// The underlying transport rejected an operation. Session-fatal: the state
/// machine tears down to Idle instead of retrying.
#[derive(Debug, Error)]
#[error("negotiation rejected: {0}")]
pub struct NegotiationError(String);

impl NegotiationError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl From<webrtc::Error> for NegotiationError {
    fn from(err: webrtc::Error) -> Self {
        Self(err.to_string())
    }
}

/// Capability set the state machine drives the media transport through.
/// Polymorphic so the machine never depends on a concrete transport.
#[async_trait]
pub trait MediaTransport: Send + Sync {
    async fn create_offer(&self) -> Result<SessionDescription, NegotiationError>;
    async fn create_answer(&self) -> Result<SessionDescription, NegotiationError>;
    async fn apply_remote_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), NegotiationError>;
    async fn apply_candidate(&self, candidate: PendingCandidate) -> Result<(), NegotiationError>;
    async fn attach_local_stream(&self, stream: LocalStream) -> Result<(), NegotiationError>;
    async fn close(&self) -> Result<(), NegotiationError>;
}

/// Builds one fresh transport per session. Locally gathered candidates are
/// pushed into `local_candidates` as they trickle in.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn open(
        &self,
        local_candidates: mpsc::UnboundedSender<PendingCandidate>,
    ) -> Result<Box<dyn MediaTransport>, NegotiationError>;
}

/// Device-capture collaborator returning the local media stream handle
#[async_trait]
pub trait CaptureSource: Send + Sync {
    async fn acquire(&self) -> Result<LocalStream, NegotiationError>;
}

/// ========== webrtc-rs BACKED IMPLEMENTATION ==========

/// `TransportFactory` over webrtc-rs peer connections
pub struct RtcTransportFactory {
    ice_servers: Option<Vec<ServerConfig>>,
}

impl RtcTransportFactory {
    pub fn new() -> Self {
        Self { ice_servers: None }
    }

    /// Use custom ICE servers instead of the built-in STUN defaults.
    pub fn with_ice_servers(servers: Vec<ServerConfig>) -> Result<Self, NegotiationError> {
        for server in &servers {
            if server.url.is_empty() {
                return Err(NegotiationError::new("server URL cannot be empty"));
            }
            if server.r#type == "turn" && (server.username.is_none() || server.credential.is_none())
            {
                return Err(NegotiationError::new(
                    "TURN servers require username and credential",
                ));
            }
        }
        // Валидация прошла, серверы можно использовать
        log(&format!("Using {} custom ICE servers", servers.len()));
        Ok(Self {
            ice_servers: Some(servers),
        })
    }
}

impl Default for RtcTransportFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransportFactory for RtcTransportFactory {
    async fn open(
        &self,
        local_candidates: mpsc::UnboundedSender<PendingCandidate>,
    ) -> Result<Box<dyn MediaTransport>, NegotiationError> {
        let pc = new_peer(self.ice_servers.clone(), local_candidates).await?;
        Ok(Box::new(RtcTransport { pc }))
    }
}

/// Media transport backed by one `RTCPeerConnection`
pub struct RtcTransport {
    pc: Arc<RTCPeerConnection>,
}

#[async_trait]
impl MediaTransport for RtcTransport {
    async fn create_offer(&self) -> Result<SessionDescription, NegotiationError> {
        let offer = self.pc.create_offer(None).await?;
        self.pc.set_local_description(offer).await?;
        let local = self
            .pc
            .local_description()
            .await
            .ok_or_else(|| NegotiationError::new("local description missing after offer"))?;
        Ok(SessionDescription::offer(local.sdp))
    }

    async fn create_answer(&self) -> Result<SessionDescription, NegotiationError> {
        let answer = self.pc.create_answer(None).await?;
        self.pc.set_local_description(answer).await?;
        let local = self
            .pc
            .local_description()
            .await
            .ok_or_else(|| NegotiationError::new("local description missing after answer"))?;
        Ok(SessionDescription::answer(local.sdp))
    }

    async fn apply_remote_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), NegotiationError> {
        let remote = match desc.kind {
            SdpKind::Offer => RTCSessionDescription::offer(desc.sdp)?,
            SdpKind::Answer => RTCSessionDescription::answer(desc.sdp)?,
        };
        self.pc.set_remote_description(remote).await?;
        Ok(())
    }

    async fn apply_candidate(&self, candidate: PendingCandidate) -> Result<(), NegotiationError> {
        let Some(text) = candidate.candidate else {
            // end-of-candidates marker; webrtc-rs finishes gathering on its own
            log("Remote signalled end of candidates");
            return Ok(());
        };
        let init = RTCIceCandidateInit {
            candidate: text,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_mline_index,
            username_fragment: None,
        };
        self.pc.add_ice_candidate(init).await?;
        Ok(())
    }

    async fn attach_local_stream(&self, stream: LocalStream) -> Result<(), NegotiationError> {
        for track in stream.tracks {
            self.pc.add_track(track).await?;
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), NegotiationError> {
        self.pc.close().await?;
        Ok(())
    }
}

/// создаём Peer; кандидаты уходят в `local_candidates` по мере появления
async fn new_peer(
    custom_servers: Option<Vec<ServerConfig>>,
    local_candidates: mpsc::UnboundedSender<PendingCandidate>,
) -> Result<Arc<RTCPeerConnection>, NegotiationError> {
    let api = APIBuilder::new().build();
    let config = rtc_config(custom_servers);

    let pc = Arc::new(api.new_peer_connection(config).await?);

    // Обработчик для сбора локальных кандидатов
    pc.on_ice_candidate(Box::new(move |cand: Option<RTCIceCandidate>| {
        let tx = local_candidates.clone();
        if let Some(c) = cand {
            tokio::spawn(async move {
                dump_candidate("LOCAL", &c).await;
                if let Ok(init) = c.to_json() {
                    let _ = tx.send(PendingCandidate {
                        candidate: Some(init.candidate),
                        sdp_mid: init.sdp_mid,
                        sdp_mline_index: init.sdp_mline_index,
                    });
                }
            });
        } else {
            // cand == None означает конец сбора
            log("ICE candidate gathering completed (null candidate received)");
            let _ = tx.send(PendingCandidate::end_of_candidates());
        }
        Box::pin(async {})
    }));

    // Добавляем обработчик ICE gathering state для отладки
    pc.on_ice_gathering_state_change(Box::new(move |state| {
        log(&format!("ICE gathering state changed to: {:?}", state));
        Box::pin(async {})
    }));

    pc.on_peer_connection_state_change(Box::new(move |st: RTCPeerConnectionState| {
        log(&format!("Peer connection state changed to: {:?}", st));
        Box::pin(async {})
    }));

    Ok(pc)
}

/// Создает конфигурацию для peer connection
fn rtc_config(custom_servers: Option<Vec<ServerConfig>>) -> RTCConfiguration {
    let ice_servers = if let Some(servers) = custom_servers {
        get_user_ice_servers(servers)
    } else {
        vec![RTCIceServer {
            urls: vec![
                "stun:stun.l.google.com:19302".into(),
                "stun:stun1.l.google.com:19302".into(),
            ],
            ..Default::default()
        }]
    };

    RTCConfiguration {
        ice_servers,
        ice_candidate_pool_size: 10,
        bundle_policy: RTCBundlePolicy::MaxBundle,
        rtcp_mux_policy: RTCRtcpMuxPolicy::Require,
        ..Default::default()
    }
}

/// Преобразует пользовательские серверы в формат RTCIceServer
fn get_user_ice_servers(servers: Vec<ServerConfig>) -> Vec<RTCIceServer> {
    servers
        .into_iter()
        .map(|config| {
            let url = add_ice_url_scheme(&config);

            RTCIceServer {
                urls: vec![url],
                username: config.username.unwrap_or_default(),
                credential: config.credential.unwrap_or_default(),
            }
        })
        .collect()
}
