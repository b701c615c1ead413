use crate::session::{LifecycleEvent, SessionError};
use tokio::sync::mpsc;
use webrtc::ice_transport::ice_candidate::RTCIceCandidate;

/// Логирование с временными метками
pub fn log(msg: &str) {
    // Проверяем конфигурацию логирования
    if crate::config::LOGGING_ENABLED {
        #[cfg(debug_assertions)]
        {
            // В режиме разработки дополнительно проверяем dev::ENABLE_LOGGING
            if !crate::config::dev::ENABLE_LOGGING {
                return;
            }
        }

        let now = chrono::Local::now();
        println!("PAIRCALL: [{}] {}", now.format("%Y-%m-%d %H:%M:%S%.3f"), msg);
    }
}

/// Печать ICE-candidate при появлении (Trickle-ICE)
pub async fn dump_candidate(label: &str, cand: &RTCIceCandidate) {
    if let Ok(init) = cand.to_json() {
        log(&format!(
            "Trickle {label}: candidate={} sdp_mid={:?} sdp_mline_index={:?} username_fragment={:?}",
            init.candidate, init.sdp_mid, init.sdp_mline_index, init.username_fragment
        ));
    }
}

/// Publishes session lifecycle notifications for the hosting layer.
/// Every dropped or rejected event is surfaced here as well; nothing is
/// swallowed silently.
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<LifecycleEvent>,
}

impl Notifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<LifecycleEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn emit(&self, event: LifecycleEvent) {
        if self.tx.send(event).is_err() {
            log("Lifecycle receiver dropped, notification lost");
        }
    }

    pub fn peer_ready(&self) {
        log("Peer signalled readiness");
        self.emit(LifecycleEvent::PeerReady);
    }

    pub fn incoming_offer(&self, peer: &str) {
        log(&format!("Incoming offer from {peer}"));
        self.emit(LifecycleEvent::IncomingOffer {
            peer: peer.to_string(),
        });
    }

    pub fn connected(&self) {
        log("Session connected");
        self.emit(LifecycleEvent::Connected);
    }

    pub fn disconnected(&self) {
        log("Session disconnected");
        self.emit(LifecycleEvent::Disconnected);
    }

    pub fn error(&self, err: SessionError) {
        log(&format!("Session error: {err}"));
        self.emit(LifecycleEvent::Error(err));
    }
}
