//! Session coordinator: code validation, registry lookup and per-session
//! serialization of transitions.

use std::sync::Arc;

use parking_lot::Mutex;
use regex::Regex;
use tracing::{debug, info};
use worksession_cache::{CacheConfig, KeyedCache, MemoryCache};
use worksession_config::{ResetRoster, SessionConfig};

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::session::Session;
use crate::store::UserStore;
use crate::user::User;

/// Namespace of the session registry.
pub const SESSION_NAMESPACE: &str = "session";

/// One session behind its own lock.
pub type SharedSession = Arc<Mutex<Session>>;

/// Registry of sessions keyed by code. Entries are never expired here.
pub type SessionStore = MemoryCache<String, SharedSession>;

/// Compiled session-code format.
#[derive(Debug, Clone)]
pub struct SessionCodeFormat {
    pattern: Regex,
}

impl SessionCodeFormat {
    pub fn from_config(config: &SessionConfig) -> Result<Self> {
        let pattern = config
            .compile_code_pattern()
            .map_err(|e| Error::InvalidArgument(e.to_string()))?;
        Ok(Self { pattern })
    }

    /// Reject codes that do not match the whole pattern.
    pub fn validate(&self, code: &str) -> Result<()> {
        if self.pattern.is_match(code) {
            Ok(())
        } else {
            Err(Error::InvalidArgument(format!(
                "session code '{}' does not match {}",
                code,
                self.pattern.as_str()
            )))
        }
    }
}

/// Routes session operations to the right [`Session`].
///
/// Every operation validates the code before touching the registry, then
/// applies its transition while holding that session's lock, so concurrent
/// callers on one code are linearized and exactly one of two racing
/// resolutions wins. Sessions with different codes never contend.
pub struct SessionCoordinator<S: UserStore> {
    sessions: SessionStore,
    users: S,
    format: SessionCodeFormat,
    reset_roster: ResetRoster,
    clock: Arc<dyn Clock>,
}

impl<S: UserStore> SessionCoordinator<S> {
    /// Create a coordinator with its own session registry.
    pub fn new(config: &SessionConfig, users: S, clock: Arc<dyn Clock>) -> Result<Self> {
        Ok(Self {
            sessions: SessionStore::new(CacheConfig::new(SESSION_NAMESPACE)),
            users,
            format: SessionCodeFormat::from_config(config)?,
            reset_roster: config.reset_roster,
            clock,
        })
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn users(&self) -> &S {
        &self.users
    }

    fn existing(&self, code: &str) -> Result<SharedSession> {
        self.format.validate(code)?;
        self.sessions
            .select(&code.to_string())
            .ok_or_else(|| Error::NotFound(format!("session {}", code)))
    }

    fn lookup_user(&self, username: &str) -> Result<User> {
        self.users
            .get_by_username(username)?
            .ok_or_else(|| Error::NotFound(format!("user {}", username)))
    }

    /// Join `code`, creating the session on first use.
    ///
    /// A finished session is reset before the user is added. Joining an
    /// ACTIVE session fails with `InvalidState`.
    pub fn join(&self, code: &str, user: User) -> Result<Session> {
        self.format.validate(code)?;
        let username = user.username.clone();
        let (shared, created) = self.sessions.select_or_insert_with(code.to_string(), || {
            Arc::new(Mutex::new(Session::new(code, user.clone(), self.reset_roster)))
        });
        if created {
            debug!(code = %code, user = %username, "Session created");
            return Ok(shared.lock().clone());
        }

        let mut session = shared.lock();
        let before = session.status();
        session.join(user)?;
        debug!(code = %code, user = %username, from = %before, "Joined session");
        Ok(session.clone())
    }

    /// Leave `code`.
    ///
    /// Leaving an ACTIVE session fails it and blames the leaver. A user not on
    /// the roster leaves the session unchanged.
    pub fn leave(&self, code: &str, username: &str) -> Result<Session> {
        let shared = self.existing(code)?;
        let mut session = shared.lock();
        let before = session.status();
        if session.leave(username).is_some() {
            if session.status() != before {
                info!(code = %code, blamed = %username, "Session failed: participant left");
            } else {
                debug!(code = %code, user = %username, "Left session");
            }
        }
        Ok(session.clone())
    }

    /// Start a WAITING session with the given goal.
    pub fn start(&self, code: &str, target: i64) -> Result<Session> {
        let shared = self.existing(code)?;
        let now = self.clock.now();
        let mut session = shared.lock();
        session.start(target, now)?;
        debug!(code = %code, target, "Session started");
        Ok(session.clone())
    }

    /// Resolve an ACTIVE session as successful.
    pub fn success(&self, code: &str) -> Result<Session> {
        let shared = self.existing(code)?;
        let mut session = shared.lock();
        session.success()?;
        info!(code = %code, "Session succeeded");
        Ok(session.clone())
    }

    /// Resolve an ACTIVE session as failed, blaming `username`.
    pub fn fail(&self, code: &str, username: &str) -> Result<Session> {
        let shared = self.existing(code)?;
        // Resolve the user before taking the session lock.
        let user = self.lookup_user(username)?;
        let mut session = shared.lock();
        session.fail(user)?;
        info!(code = %code, blamed = %username, "Session failed");
        Ok(session.clone())
    }

    /// Return a finished session to WAITING.
    pub fn reset(&self, code: &str) -> Result<Session> {
        let shared = self.existing(code)?;
        let mut session = shared.lock();
        session.reset()?;
        debug!(code = %code, "Session reset");
        Ok(session.clone())
    }

    /// Current state of `code`, if it exists.
    pub fn get(&self, code: &str) -> Result<Option<Session>> {
        self.format.validate(code)?;
        Ok(self
            .sessions
            .select(&code.to_string())
            .map(|shared| shared.lock().clone()))
    }

    /// Current state of `code`; `NotFound` if unknown.
    pub fn get_existing(&self, code: &str) -> Result<Session> {
        Ok(self.existing(code)?.lock().clone())
    }
}
