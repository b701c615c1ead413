use crate::peer::types::PendingCandidate;

/// Candidates received before the remote description is in place.
///
/// Owned by a single `Session` and dropped with it, so candidates from a
/// finished negotiation can never leak into the next one.
#[derive(Debug, Default)]
pub struct CandidateBuffer {
    pending: Vec<PendingCandidate>,
}

impl CandidateBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a candidate in receipt order.
    pub fn enqueue(&mut self, candidate: PendingCandidate) {
        self.pending.push(candidate);
    }

    /// Take every queued candidate, oldest first, leaving the buffer empty.
    /// Called once the remote description has been applied.
    pub fn drain_all(&mut self) -> Vec<PendingCandidate> {
        self.pending.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand(s: &str) -> PendingCandidate {
        PendingCandidate {
            candidate: Some(s.to_string()),
            sdp_mid: Some("0".to_string()),
            sdp_mline_index: Some(0),
        }
    }

    #[test]
    fn drains_in_insertion_order() {
        let mut buf = CandidateBuffer::new();
        buf.enqueue(cand("c1"));
        buf.enqueue(cand("c2"));
        buf.enqueue(PendingCandidate::end_of_candidates());
        assert_eq!(buf.len(), 3);

        let drained = buf.drain_all();
        assert_eq!(drained[0].candidate.as_deref(), Some("c1"));
        assert_eq!(drained[1].candidate.as_deref(), Some("c2"));
        assert!(drained[2].is_end());
        assert!(buf.is_empty());
    }

    #[test]
    fn drain_on_empty_buffer_yields_nothing() {
        let mut buf = CandidateBuffer::new();
        assert!(buf.drain_all().is_empty());
        assert!(buf.is_empty());
    }
}
