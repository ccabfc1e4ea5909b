use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use super::{Oracle, OracleError, OracleReply, OracleRequest};

/// Replays queued replies in order. Used by tests and offline demos.
///
/// Every request is kept so callers can inspect what the engine sent.
/// When the queue runs dry the oracle reports itself unavailable.
#[derive(Default)]
pub struct ScriptedOracle {
    replies: Mutex<VecDeque<Result<OracleReply, OracleError>>>,
    requests: Mutex<Vec<OracleRequest>>,
    delay: Option<Duration>,
}

impl ScriptedOracle {
    pub fn new(replies: Vec<Result<OracleReply, OracleError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Sleep before answering, to simulate a slow service.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push(&self, reply: Result<OracleReply, OracleError>) {
        if let Ok(mut queue) = self.replies.lock() {
            queue.push_back(reply);
        }
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().map(|q| q.len()).unwrap_or(0)
    }

    pub fn requests(&self) -> Vec<OracleRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl Oracle for ScriptedOracle {
    fn interpret(&self, request: &OracleRequest) -> Result<OracleReply, OracleError> {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if let Ok(mut seen) = self.requests.lock() {
            seen.push(request.clone());
        }
        let mut queue = self
            .replies
            .lock()
            .map_err(|_| OracleError::Unavailable("script lock poisoned".to_string()))?;
        queue
            .pop_front()
            .unwrap_or_else(|| Err(OracleError::Unavailable("script exhausted".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::phase::Phase;
    use crate::models::InterviewRecord;
    use crate::oracle::{ConsentDecision, PhaseContext};

    fn request() -> OracleRequest {
        OracleRequest {
            context: PhaseContext {
                phase: Phase::AwaitingConsent,
                role: None,
                pending_vital: None,
                pending_detail: None,
            },
            record: InterviewRecord::new(),
            recent_turns: vec![],
            message: "ok".into(),
        }
    }

    #[test]
    fn replays_in_order_then_runs_dry() {
        let oracle = ScriptedOracle::new(vec![
            Ok(OracleReply::Consent(ConsentDecision::Unclear)),
            Err(OracleError::Timeout(1)),
        ]);
        oracle.push(Ok(OracleReply::Consent(ConsentDecision::Agree)));
        assert_eq!(oracle.remaining(), 3);

        assert_eq!(
            oracle.interpret(&request()),
            Ok(OracleReply::Consent(ConsentDecision::Unclear))
        );
        assert_eq!(oracle.interpret(&request()), Err(OracleError::Timeout(1)));
        assert_eq!(
            oracle.interpret(&request()),
            Ok(OracleReply::Consent(ConsentDecision::Agree))
        );
        assert!(matches!(
            oracle.interpret(&request()),
            Err(OracleError::Unavailable(_))
        ));
        assert_eq!(oracle.requests().len(), 4);
    }
}
