//! Work-session coordination.
//!
//! Participants join a session named by a short numeric code, one caller
//! starts it, and exactly one later call resolves it to success or failure.
//! Around it sit a memoized leaderboard read path and an optimistic
//! concurrency protocol for the shared score field.
//!
//! # Architecture
//!
//! ```text
//! SessionCoordinator ──► SessionStore (MemoryCache<code, Arc<Mutex<Session>>>)
//!        │
//!        └──► UserStore (persistence port; blame lookup)
//!
//! RankingCache ──► MemoryCache<n, Arc<RankingSnapshot>> ──miss/stale──► UserStore::top_by_score
//!
//! ScoreKeeper (bounded retry) ──► OptimisticScoreUpdater ──► UserStore::update_optimistic
//! ```

pub mod clock;
pub mod coordinator;
pub mod error;
pub mod ranking;
pub mod response;
pub mod score;
pub mod session;
pub mod store;
pub mod user;

pub use clock::{Clock, ManualClock, SystemClock};
pub use coordinator::{
    SESSION_NAMESPACE, SessionCodeFormat, SessionCoordinator, SessionStore, SharedSession,
};
pub use error::{Error, Result};
pub use ranking::{RANKING_NAMESPACE, RankEntry, RankingCache, RankingSnapshot};
pub use response::Response;
pub use score::{DEFAULT_MAX_ATTEMPTS, OptimisticScoreUpdater, ScoreKeeper};
pub use session::{Operation, Session, SessionStatus};
pub use store::{MemoryUserStore, UserStore};
pub use user::{User, UserId};
