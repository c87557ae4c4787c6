use anyhow::{Result, anyhow};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// Identity and one-way `stopped` latch of a playback session.
///
/// Every scheduled fetch and every audio handle carries a clone; completions
/// compare it against the live session before touching any state.
#[derive(Clone, Debug)]
pub struct SessionToken {
    id: u64,
    stopped: Arc<AtomicBool>,
}

impl SessionToken {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// True when `other` belongs to this session and the session is still running.
    pub fn admits(&self, other: &SessionToken) -> bool {
        self.id == other.id && !self.is_stopped()
    }

    pub fn check_cancelled(&self, stage: &'static str) -> Result<()> {
        if self.is_stopped() {
            return Err(anyhow!("session {} stopped at stage={stage}", self.id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_is_shared_between_clones() {
        let token = SessionToken::new(3);
        let clone = token.clone();
        assert!(token.admits(&clone));
        clone.stop();
        assert!(token.is_stopped());
        assert!(!token.admits(&clone));
        assert!(token.check_cancelled("fetch").is_err());
    }

    #[test]
    fn different_sessions_never_admit_each_other() {
        let first = SessionToken::new(1);
        let second = SessionToken::new(2);
        assert!(!second.admits(&first));
        assert!(second.check_cancelled("fetch").is_ok());
    }
}
