//! Bracket module for single-elimination tournament progression.
//!
//! This module provides bracket management functionality including:
//! - Tournament creation and first-round pairing
//! - Match result recording with terminal completed state
//! - Round completion detection and race-free advancement
//! - Bye handling for odd participant counts
//! - Final placement derivation and PiPoints awards
//!
//! ## Example
//!
//! ```no_run
//! use olympiad_core::bracket::BracketEngine;
//! use olympiad_core::db::MemoryStore;
//! use olympiad_core::requests::CreateTournamentRequest;
//! use std::sync::Arc;
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemoryStore::new());
//!     let engine = BracketEngine::new(store);
//!
//!     let tournament = engine
//!         .create_tournament(CreateTournamentRequest {
//!             participants: (0..8).map(|_| Uuid::new_v4()).collect(),
//!             task: None,
//!             schedule_at: None,
//!         })
//!         .await?;
//!     println!("Created tournament: {}", tournament.id);
//!
//!     Ok(())
//! }
//! ```

pub mod engine;
pub mod models;

pub use engine::{
    BracketEngine, BracketError, BracketResult, RecordWinnerOutcome, RoundProgress,
};
pub use models::{
    Match, MatchId, MatchStatus, ParticipantId, TaskId, Tournament, TournamentId,
    TournamentStatus, pair_round, round_name,
};
