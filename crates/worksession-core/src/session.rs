//! Session state machine.
//!
//! ```text
//!            join ─┐        start          success
//!   (new) ──► WAITING ───────────► ACTIVE ─────────► SUCCESS
//!              ▲  ▲                  │                 │
//!              │  │   fail / leave   ▼                 │
//!              │  └─────────────── FAIL ◄──            │
//!              └──── reset / join ──┴──────────────────┘
//! ```
//!
//! Every transition checks the current status and reports `InvalidState`
//! when it does not apply. Callers serialize access per session (see
//! [`SessionCoordinator`](crate::SessionCoordinator)), so the check and the
//! write form one step.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use worksession_config::ResetRoster;

use crate::error::{Error, Result};
use crate::user::User;

/// Lifecycle status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Waiting,
    Active,
    Success,
    Fail,
}

impl SessionStatus {
    /// SUCCESS or FAIL.
    pub fn is_finished(self) -> bool {
        matches!(self, SessionStatus::Success | SessionStatus::Fail)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::Waiting => "WAITING",
            SessionStatus::Active => "ACTIVE",
            SessionStatus::Success => "SUCCESS",
            SessionStatus::Fail => "FAIL",
        };
        f.write_str(s)
    }
}

/// Operations that can be applied to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Join,
    Leave,
    Start,
    Success,
    Fail,
    Reset,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::Join => "join",
            Operation::Leave => "leave",
            Operation::Start => "start",
            Operation::Success => "success",
            Operation::Fail => "fail",
            Operation::Reset => "reset",
        };
        f.write_str(s)
    }
}

/// One shared work session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    code: String,
    status: SessionStatus,
    roster: BTreeMap<String, User>,
    target: Option<i64>,
    started_at: Option<DateTime<Utc>>,
    blamed_user: Option<User>,
    #[serde(skip)]
    reset_roster: ResetRoster,
}

impl Session {
    /// A WAITING session whose roster holds just `first`.
    pub fn new(code: impl Into<String>, first: User, reset_roster: ResetRoster) -> Self {
        let mut roster = BTreeMap::new();
        roster.insert(first.username.clone(), first);
        Self {
            code: code.into(),
            status: SessionStatus::Waiting,
            roster,
            target: None,
            started_at: None,
            blamed_user: None,
            reset_roster,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn roster(&self) -> &BTreeMap<String, User> {
        &self.roster
    }

    pub fn has_member(&self, username: &str) -> bool {
        self.roster.contains_key(username)
    }

    /// Goal recorded by the last `start`, cleared on reset.
    pub fn target(&self) -> Option<i64> {
        self.target
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Set exactly when the status is FAIL.
    pub fn blamed_user(&self) -> Option<&User> {
        self.blamed_user.as_ref()
    }

    fn invalid(&self, operation: Operation) -> Error {
        Error::InvalidState {
            code: self.code.clone(),
            status: self.status,
            operation,
        }
    }

    fn require(&self, expected: SessionStatus, operation: Operation) -> Result<()> {
        if self.status == expected {
            Ok(())
        } else {
            Err(self.invalid(operation))
        }
    }

    fn clear_completion(&mut self) {
        self.status = SessionStatus::Waiting;
        self.target = None;
        self.started_at = None;
        self.blamed_user = None;
        if self.reset_roster == ResetRoster::Clear {
            self.roster.clear();
        }
    }

    /// Add `user`, first resetting a finished session.
    pub fn join(&mut self, user: User) -> Result<()> {
        match self.status {
            SessionStatus::Active => return Err(self.invalid(Operation::Join)),
            SessionStatus::Success | SessionStatus::Fail => self.clear_completion(),
            SessionStatus::Waiting => {}
        }
        self.roster.insert(user.username.clone(), user);
        Ok(())
    }

    /// Remove `username` from the roster.
    ///
    /// Leaving an ACTIVE session fails it and blames the leaver. Returns the
    /// departed user, or `None` if they were not on the roster (no change).
    pub fn leave(&mut self, username: &str) -> Option<User> {
        let user = self.roster.remove(username)?;
        if self.status == SessionStatus::Active {
            self.status = SessionStatus::Fail;
            self.blamed_user = Some(user.clone());
        }
        Some(user)
    }

    /// WAITING → ACTIVE, recording the goal.
    pub fn start(&mut self, target: i64, now: DateTime<Utc>) -> Result<()> {
        self.require(SessionStatus::Waiting, Operation::Start)?;
        self.status = SessionStatus::Active;
        self.target = Some(target);
        self.started_at = Some(now);
        Ok(())
    }

    /// ACTIVE → SUCCESS.
    pub fn success(&mut self) -> Result<()> {
        self.require(SessionStatus::Active, Operation::Success)?;
        self.status = SessionStatus::Success;
        Ok(())
    }

    /// ACTIVE → FAIL, blaming `user`.
    pub fn fail(&mut self, user: User) -> Result<()> {
        self.require(SessionStatus::Active, Operation::Fail)?;
        self.status = SessionStatus::Fail;
        self.blamed_user = Some(user);
        Ok(())
    }

    /// SUCCESS/FAIL → WAITING. A no-op on a WAITING session.
    pub fn reset(&mut self) -> Result<()> {
        match self.status {
            SessionStatus::Active => Err(self.invalid(Operation::Reset)),
            SessionStatus::Waiting => Ok(()),
            SessionStatus::Success | SessionStatus::Fail => {
                self.clear_completion();
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64, name: &str) -> User {
        User::new(id, name, 0, 0)
    }

    fn session(policy: ResetRoster) -> Session {
        Session::new("123456", user(1, "alice"), policy)
    }

    fn active(policy: ResetRoster) -> Session {
        let mut s = session(policy);
        s.join(user(2, "bob")).unwrap();
        s.start(1500, Utc::now()).unwrap();
        s
    }

    #[test]
    fn test_new_session_is_waiting_with_one_member() {
        let s = session(ResetRoster::Keep);
        assert_eq!(s.status(), SessionStatus::Waiting);
        assert_eq!(s.roster().len(), 1);
        assert!(s.has_member("alice"));
        assert!(s.blamed_user().is_none());
    }

    #[test]
    fn test_join_waiting_adds_member() {
        let mut s = session(ResetRoster::Keep);
        s.join(user(2, "bob")).unwrap();
        assert_eq!(s.roster().len(), 2);
        assert_eq!(s.status(), SessionStatus::Waiting);
    }

    #[test]
    fn test_join_is_idempotent_per_username() {
        let mut s = session(ResetRoster::Keep);
        s.join(user(1, "alice")).unwrap();
        assert_eq!(s.roster().len(), 1);
    }

    #[test]
    fn test_join_active_is_rejected() {
        let mut s = active(ResetRoster::Keep);
        let err = s.join(user(3, "carol")).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidState {
                status: SessionStatus::Active,
                operation: Operation::Join,
                ..
            }
        ));
        assert!(!s.has_member("carol"));
    }

    #[test]
    fn test_join_finished_resets_first() {
        for policy in [ResetRoster::Keep, ResetRoster::Clear] {
            let mut s = active(policy);
            s.fail(user(2, "bob")).unwrap();

            s.join(user(3, "carol")).unwrap();

            assert_eq!(s.status(), SessionStatus::Waiting);
            assert!(s.blamed_user().is_none());
            assert!(s.target().is_none());
            assert!(s.has_member("carol"));
            assert_eq!(s.has_member("alice"), policy == ResetRoster::Keep);
        }
    }

    #[test]
    fn test_start_records_target() {
        let s = active(ResetRoster::Keep);
        assert_eq!(s.status(), SessionStatus::Active);
        assert_eq!(s.target(), Some(1500));
        assert!(s.started_at().is_some());
    }

    #[test]
    fn test_start_requires_waiting() {
        let mut s = active(ResetRoster::Keep);
        assert!(matches!(
            s.start(10, Utc::now()),
            Err(Error::InvalidState { operation: Operation::Start, .. })
        ));
        assert_eq!(s.target(), Some(1500));
    }

    #[test]
    fn test_success_and_fail_require_active() {
        let mut s = session(ResetRoster::Keep);
        assert!(s.success().is_err());
        assert!(s.fail(user(1, "alice")).is_err());
        assert_eq!(s.status(), SessionStatus::Waiting);
        assert!(s.blamed_user().is_none());
    }

    #[test]
    fn test_second_resolution_is_rejected() {
        let mut s = active(ResetRoster::Keep);
        s.success().unwrap();
        assert!(matches!(
            s.success(),
            Err(Error::InvalidState { status: SessionStatus::Success, .. })
        ));
        assert!(s.fail(user(1, "alice")).is_err());
        assert_eq!(s.status(), SessionStatus::Success);
    }

    #[test]
    fn test_fail_sets_blame() {
        let mut s = active(ResetRoster::Keep);
        s.fail(user(2, "bob")).unwrap();
        assert_eq!(s.status(), SessionStatus::Fail);
        assert_eq!(s.blamed_user().map(|u| u.username.as_str()), Some("bob"));
    }

    #[test]
    fn test_leave_active_fails_and_blames() {
        let mut s = active(ResetRoster::Keep);
        let left = s.leave("alice").unwrap();

        assert_eq!(left.username, "alice");
        assert_eq!(s.status(), SessionStatus::Fail);
        assert_eq!(s.blamed_user(), Some(&left));
        assert!(!s.has_member("alice"));
    }

    #[test]
    fn test_leave_outside_active_only_removes() {
        let mut s = session(ResetRoster::Keep);
        s.join(user(2, "bob")).unwrap();

        s.leave("alice").unwrap();
        assert_eq!(s.status(), SessionStatus::Waiting);
        assert!(s.blamed_user().is_none());
        assert_eq!(s.roster().len(), 1);

        let mut done = active(ResetRoster::Keep);
        done.success().unwrap();
        done.leave("bob").unwrap();
        assert_eq!(done.status(), SessionStatus::Success);
    }

    #[test]
    fn test_leave_non_member_changes_nothing() {
        let mut s = active(ResetRoster::Keep);
        let before = s.clone();
        assert!(s.leave("mallory").is_none());
        assert_eq!(s, before);
    }

    #[test]
    fn test_reset_from_fail_keeps_roster() {
        let mut s = active(ResetRoster::Keep);
        s.leave("alice");
        s.reset().unwrap();

        assert_eq!(s.status(), SessionStatus::Waiting);
        assert!(s.blamed_user().is_none());
        assert_eq!(s.roster().keys().collect::<Vec<_>>(), vec!["bob"]);
    }

    #[test]
    fn test_reset_from_success_clears_roster() {
        let mut s = active(ResetRoster::Clear);
        s.success().unwrap();
        s.reset().unwrap();

        assert_eq!(s.status(), SessionStatus::Waiting);
        assert!(s.roster().is_empty());
    }

    #[test]
    fn test_reset_waiting_is_noop() {
        let mut s = session(ResetRoster::Clear);
        let before = s.clone();
        s.reset().unwrap();
        assert_eq!(s, before);
    }

    #[test]
    fn test_reset_active_is_rejected() {
        let mut s = active(ResetRoster::Keep);
        assert!(matches!(
            s.reset(),
            Err(Error::InvalidState { operation: Operation::Reset, .. })
        ));
    }

    #[test]
    fn test_serializes_status_and_blame() {
        let mut s = active(ResetRoster::Keep);
        s.fail(user(2, "bob")).unwrap();
        let json = serde_json::to_value(&s).unwrap();

        assert_eq!(json["status"], "FAIL");
        assert_eq!(json["blamed_user"]["username"], "bob");
        assert_eq!(json["target"], 1500);
        assert!(json.get("reset_roster").is_none());
    }
}
