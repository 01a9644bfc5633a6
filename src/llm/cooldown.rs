// src/llm/cooldown.rs
// Process-wide "do not call the model until T" state, set after a hard
// rate-limit response and shared by every clone of the model client.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};

/// Time source, injectable so cooldown behavior is testable with a fixed now
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock implementation used in production
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Shared cooldown deadline. Staleness after expiry only costs one extra
/// network attempt, so a single mutex-guarded value is enough.
#[derive(Debug, Clone, Default)]
pub struct CooldownGate {
    until: Arc<Mutex<Option<DateTime<Utc>>>>,
}

impl CooldownGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deadline if the gate is still engaged at `now`, None otherwise
    pub fn active_until(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let Ok(guard) = self.until.lock() else {
            return None; // poisoned mutex: allow the request
        };
        guard.filter(|until| now < *until)
    }

    /// Engage the gate until the given deadline
    pub fn engage(&self, until: DateTime<Utc>) {
        let Ok(mut guard) = self.until.lock() else {
            return;
        };
        *guard = Some(until);
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;

    /// Clock pinned to a fixed instant
    #[derive(Debug, Clone, Copy)]
    pub struct FixedClock(pub DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_fresh_gate_is_inactive() {
        let gate = CooldownGate::new();
        assert!(gate.active_until(Utc::now()).is_none());
    }

    #[test]
    fn test_engaged_gate_blocks_until_deadline() {
        let now = Utc::now();
        let deadline = now + Duration::seconds(3600);
        let gate = CooldownGate::new();
        gate.engage(deadline);

        assert_eq!(gate.active_until(now), Some(deadline));
        assert_eq!(gate.active_until(deadline - Duration::seconds(1)), Some(deadline));
    }

    #[test]
    fn test_gate_expires_at_deadline() {
        let now = Utc::now();
        let deadline = now + Duration::seconds(60);
        let gate = CooldownGate::new();
        gate.engage(deadline);

        assert!(gate.active_until(deadline).is_none());
        assert!(gate.active_until(deadline + Duration::seconds(1)).is_none());
    }

    #[test]
    fn test_clones_share_state() {
        let now = Utc::now();
        let gate = CooldownGate::new();
        let other = gate.clone();
        other.engage(now + Duration::seconds(30));

        assert!(gate.active_until(now).is_some());
    }
}
