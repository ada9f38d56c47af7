//! Store trait definitions for testability and dependency injection.
//!
//! The engines never touch a concrete database: every read goes through
//! [`OlympiadStore`] and every atomic mutation through a [`StoreSession`]
//! opened from it. This replaces the implicit per-collection singletons of
//! the original platform with explicit interfaces that can be substituted
//! in tests.

use async_trait::async_trait;
use thiserror::Error;

use crate::bracket::{Match, MatchId, Tournament, TournamentId};
use crate::ranking::{
    ClassType, ClassTypeId, Olympiad, OlympiadId, Student, StudentAnswer, StudentId,
};

/// Storage-layer errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Concurrent write conflict; expected to succeed on retry
    #[error("write conflict: {0}")]
    Conflict(String),

    /// Storage operation timed out
    #[error("storage operation timed out: {0}")]
    Timeout(String),

    /// Storage host unreachable
    #[error("storage host unreachable: {0}")]
    Unavailable(String),

    /// Network interface error
    #[error("storage i/o error: {0}")]
    Io(String),

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Document (de)serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Whether a retry of the enclosing transaction may succeed.
    ///
    /// Conflicts, timeouts, unreachable hosts, and network-interface errors
    /// are transient; Postgres serialization failures (40001) and deadlocks
    /// (40P01) count as conflicts.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Conflict(_)
            | StoreError::Timeout(_)
            | StoreError::Unavailable(_)
            | StoreError::Io(_) => true,
            StoreError::Database(e) => match e {
                sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => true,
                sqlx::Error::Database(db) => {
                    matches!(db.code().as_deref(), Some("40001") | Some("40P01"))
                }
                _ => false,
            },
            StoreError::Serialization(_) => false,
        }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// An atomic scope over the document store.
///
/// All writes made through one session become visible together at
/// [`commit`](StoreSession::commit) or not at all. Sessions provide
/// read-after-write consistency for their own writes.
#[async_trait]
pub trait StoreSession: Send {
    /// Commit every write made through this session
    async fn commit(self: Box<Self>) -> StoreResult<()>;

    /// Discard every write made through this session
    async fn rollback(self: Box<Self>) -> StoreResult<()>;

    // Tournaments

    async fn get_tournament(&mut self, id: TournamentId) -> StoreResult<Option<Tournament>>;

    async fn insert_tournament(&mut self, tournament: &Tournament) -> StoreResult<()>;

    async fn update_tournament(&mut self, tournament: &Tournament) -> StoreResult<()>;

    /// Atomically claim round advancement for `round` within a tournament.
    ///
    /// Appends the label to the tournament's `advanced_rounds` only if it is
    /// not already present. Returns `false` when the round was already
    /// claimed; exactly one concurrent caller observes `true`.
    async fn claim_round_advance(
        &mut self,
        tournament_id: TournamentId,
        round: &str,
    ) -> StoreResult<bool>;

    // Matches

    async fn get_match(&mut self, id: MatchId) -> StoreResult<Option<Match>>;

    async fn insert_match(&mut self, m: &Match) -> StoreResult<()>;

    async fn update_match(&mut self, m: &Match) -> StoreResult<()>;

    /// Matches of one round within a tournament, in persistence order
    async fn list_round_matches(
        &mut self,
        tournament_id: TournamentId,
        round: &str,
    ) -> StoreResult<Vec<Match>>;

    // Class types and students

    async fn get_class_type(&mut self, id: ClassTypeId) -> StoreResult<Option<ClassType>>;

    async fn update_class_type(&mut self, class_type: &ClassType) -> StoreResult<()>;

    /// Score records for a class type with score > 0, score-descending;
    /// ties keep retrieval order
    async fn list_scored_answers(
        &mut self,
        class_type_id: ClassTypeId,
    ) -> StoreResult<Vec<StudentAnswer>>;

    async fn get_student(&mut self, id: StudentId) -> StoreResult<Option<Student>>;

    async fn update_student(&mut self, student: &Student) -> StoreResult<()>;

    /// Bulk student update; backends may override with a batched write
    async fn update_students(&mut self, students: &[Student]) -> StoreResult<()> {
        for student in students {
            self.update_student(student).await?;
        }
        Ok(())
    }
}

/// The document store consumed by both engines.
///
/// Plain reads run against the pool; mutations go through a session opened
/// with [`begin`](OlympiadStore::begin).
#[async_trait]
pub trait OlympiadStore: Send + Sync {
    /// Open an atomic session
    async fn begin(&self) -> StoreResult<Box<dyn StoreSession>>;

    async fn get_tournament(&self, id: TournamentId) -> StoreResult<Option<Tournament>>;

    async fn get_match(&self, id: MatchId) -> StoreResult<Option<Match>>;

    /// Every match of a tournament, in persistence order
    async fn list_tournament_matches(&self, id: TournamentId) -> StoreResult<Vec<Match>>;

    async fn get_olympiad(&self, id: OlympiadId) -> StoreResult<Option<Olympiad>>;

    async fn get_class_type(&self, id: ClassTypeId) -> StoreResult<Option<ClassType>>;

    /// Score records for a class type with score > 0, score-descending
    async fn list_scored_answers(
        &self,
        class_type_id: ClassTypeId,
    ) -> StoreResult<Vec<StudentAnswer>>;

    async fn get_student(&self, id: StudentId) -> StoreResult<Option<Student>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(StoreError::Conflict("version mismatch".into()).is_transient());
        assert!(StoreError::Timeout("commit".into()).is_transient());
        assert!(StoreError::Unavailable("primary down".into()).is_transient());
        assert!(StoreError::Io("connection reset".into()).is_transient());
    }

    #[test]
    fn test_non_transient_classification() {
        let err = StoreError::Serialization(serde_json::from_str::<i32>("oops").unwrap_err());
        assert!(!err.is_transient());
        assert!(!StoreError::Database(sqlx::Error::RowNotFound).is_transient());
    }

    #[test]
    fn test_pool_timeout_is_transient() {
        assert!(StoreError::Database(sqlx::Error::PoolTimedOut).is_transient());
    }
}
