use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::debug;

use crate::services::poller::StatusTracker;
use crate::services::workflow::{NavigationPolicy, WorkflowStepper};

/// Workflow state owned by one authenticated user.
#[derive(Debug)]
pub struct UserSession {
    pub stepper: Mutex<WorkflowStepper>,
    pub tracker: StatusTracker,
}

impl UserSession {
    fn new(policy: NavigationPolicy) -> Self {
        Self {
            stepper: Mutex::new(WorkflowStepper::new(policy)),
            tracker: StatusTracker::new(),
        }
    }
}

struct Entry {
    session: Arc<UserSession>,
    last_access: Instant,
}

/// Per-user sessions, dropped after `idle_ttl` without a request.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Entry>>,
    policy: NavigationPolicy,
    idle_ttl: Duration,
}

impl SessionRegistry {
    pub fn new(policy: NavigationPolicy, idle_ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            policy,
            idle_ttl,
        }
    }

    /// The user's session, started fresh when none is live.
    pub async fn session(&self, user: &str) -> Arc<UserSession> {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;
        let evicted = Self::sweep(&mut sessions, now, self.idle_ttl);
        if evicted > 0 {
            debug!(evicted, "Evicted idle sessions");
        }

        let entry = sessions.entry(user.to_string()).or_insert_with(|| Entry {
            session: Arc::new(UserSession::new(self.policy)),
            last_access: now,
        });
        entry.last_access = now;
        let session = Arc::clone(&entry.session);

        metrics::gauge!("active_sessions").set(sessions.len() as f64);
        session
    }

    /// Drop every session idle for longer than the TTL. Returns how many went.
    pub async fn evict_idle(&self) -> usize {
        let mut sessions = self.sessions.lock().await;
        let evicted = Self::sweep(&mut sessions, Instant::now(), self.idle_ttl);
        metrics::gauge!("active_sessions").set(sessions.len() as f64);
        evicted
    }

    fn sweep(sessions: &mut HashMap<String, Entry>, now: Instant, idle_ttl: Duration) -> usize {
        let before = sessions.len();
        sessions.retain(|_, entry| now.duration_since(entry.last_access) <= idle_ttl);
        before - sessions.len()
    }
}
