//! Per-user rolling conversation windows.
//!
//! Sessions expire lazily: any access to a session idle for longer than
//! `expiry_minutes` sees a fresh, empty one. `sweep_expired` only reclaims
//! memory.

use chrono::{DateTime, Duration, Utc};
use quotarelay_config::SessionConfig;
use quotarelay_core::{Clock, Role, Turn, UserId};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tracing::debug;

#[derive(Debug)]
struct Session {
    turns: VecDeque<Turn>,
    last_active: DateTime<Utc>,
}

impl Session {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            turns: VecDeque::new(),
            last_active: now,
        }
    }
}

/// In-memory session store shared by all request handlers.
pub struct SessionStore {
    sessions: Mutex<HashMap<UserId, Session>>,
    expiry: Duration,
    max_turns: usize,
    clock: Arc<dyn Clock>,
}

impl SessionStore {
    pub fn new(config: &SessionConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            expiry: i64::try_from(config.expiry_minutes)
                .ok()
                .and_then(Duration::try_minutes)
                .unwrap_or(Duration::MAX),
            max_turns: config.max_exchanges.saturating_mul(2),
            clock,
        }
    }

    fn is_expired(&self, session: &Session, now: DateTime<Utc>) -> bool {
        now - session.last_active > self.expiry
    }

    /// Fetch the user's session, replacing it if it has expired.
    fn resolve<'a>(
        &self,
        sessions: &'a mut HashMap<UserId, Session>,
        user: &UserId,
        now: DateTime<Utc>,
    ) -> &'a mut Session {
        let session = sessions
            .entry(user.clone())
            .or_insert_with(|| Session::new(now));
        if self.is_expired(session, now) {
            debug!(user = %user, "Session expired, starting fresh");
            *session = Session::new(now);
        }
        session
    }

    /// Append a turn, dropping the oldest ones beyond the window.
    pub fn append_turn(&self, user: &UserId, role: Role, text: impl Into<String>) {
        let now = self.clock.now();
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let session = self.resolve(&mut sessions, user, now);
        session.turns.push_back(Turn {
            role,
            text: text.into(),
        });
        while session.turns.len() > self.max_turns {
            session.turns.pop_front();
        }
        session.last_active = now;
    }

    /// The user's turns, oldest first.
    pub fn read_turns(&self, user: &UserId) -> Vec<Turn> {
        let now = self.clock.now();
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        self.resolve(&mut sessions, user, now)
            .turns
            .iter()
            .cloned()
            .collect()
    }

    /// Drop every expired session. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let before = sessions.len();
        sessions.retain(|_, s| !self.is_expired(s, now));
        let removed = before - sessions.len();
        if removed > 0 {
            debug!(removed, remaining = sessions.len(), "Swept expired sessions");
        }
        removed
    }

    /// Number of sessions that have not expired.
    pub fn active_sessions(&self) -> usize {
        let now = self.clock.now();
        let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions
            .values()
            .filter(|s| !self.is_expired(s, now))
            .count()
    }

    /// Forget a user's session. Returns whether one existed.
    pub fn clear(&self, user: &UserId) -> bool {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.remove(user).is_some()
    }
}
