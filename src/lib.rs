//! # Olympiad Core
//!
//! Competition-platform core engines: single-elimination bracket progression,
//! ranking with medal distribution, and PiPoints allocation, backed by a
//! transactional document store with bounded retry on transient failures.
//!
//! ## Architecture
//!
//! Two engines sit on one storage abstraction:
//!
//! - **Bracket progression**: tournaments advance round by round as match
//!   winners are recorded. Completed matches are terminal, odd participant
//!   counts produce byes, and round advancement is claimed atomically so
//!   concurrent recorders cannot generate a round twice.
//! - **Ranking and medals**: class-type cohorts are ranked score-descending
//!   and sliced into positional gold/silver/bronze/top-10 bands, written
//!   idempotently to both the class type and per-student medal mirrors.
//! - **PiPoints**: a pure placement-to-points table applied to a finished
//!   bracket's final standings.
//!
//! Every mutating step runs inside a storage session driven by
//! [`db::TxRetryExecutor`], which retries transient failures (write
//! conflicts, timeouts, unreachable hosts) with linear backoff and a bounded
//! budget, and surfaces everything else immediately.
//!
//! ## Core Modules
//!
//! - [`bracket`]: tournament bracket engine and models
//! - [`ranking`]: ranking engine, medal bands, and models
//! - [`points`]: PiPoints placement-to-points allocation
//! - [`db`]: store traits, PostgreSQL and in-memory backends, retry executor
//! - [`requests`]: validated request payloads for every engine operation
//!
//! ## Example
//!
//! ```no_run
//! use olympiad_core::bracket::BracketEngine;
//! use olympiad_core::db::{MemoryStore, OlympiadStore};
//! use olympiad_core::requests::{CreateTournamentRequest, RecordWinnerRequest};
//! use std::sync::Arc;
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemoryStore::new());
//!     let engine = BracketEngine::new(store.clone());
//!
//!     let tournament = engine
//!         .create_tournament(CreateTournamentRequest {
//!             participants: (0..4).map(|_| Uuid::new_v4()).collect(),
//!             task: None,
//!             schedule_at: None,
//!         })
//!         .await?;
//!
//!     let first = store.get_match(tournament.rounds[0]).await?.unwrap();
//!     let outcome = engine
//!         .record_winner(RecordWinnerRequest {
//!             match_id: first.id,
//!             winner_id: first.slot_a,
//!         })
//!         .await?;
//!     println!("{:?}", outcome.progress);
//!
//!     Ok(())
//! }
//! ```

/// Bracket progression engine for single-elimination tournaments.
pub mod bracket;
pub use bracket::{BracketEngine, BracketError, RecordWinnerOutcome, RoundProgress};

/// Storage layer: store traits, backends, and the transaction retry executor.
pub mod db;
pub use db::{MemoryStore, OlympiadStore, PgStore, StoreError, TxRetryExecutor};

/// PiPoints allocation for finished tournaments.
pub mod points;
pub use points::{PiPointsAward, allocate};

/// Ranking and medal distribution engine.
pub mod ranking;
pub use ranking::{RankingEngine, RankingError, RankingOptions};

/// Validated request payloads for engine operations.
pub mod requests;
pub use requests::EngineRequest;
