//! Ranking module for olympiad medal distribution.
//!
//! This module provides ranking functionality including:
//! - Score-descending rank computation per class type
//! - Positional gold/silver/bronze/top-10 band slicing
//! - Idempotent clear-then-write of class-type and student medal mirrors
//! - Olympiad-wide fan-out with per-class-type failure isolation
//! - Read-only ranking statistics
//!
//! ## Example
//!
//! ```no_run
//! use olympiad_core::ranking::RankingEngine;
//! use olympiad_core::db::MemoryStore;
//! use olympiad_core::requests::ProcessClassTypeRankingsRequest;
//! use std::sync::Arc;
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemoryStore::new());
//!     let engine = RankingEngine::new(store);
//!
//!     let result = engine
//!         .process_class_type_rankings(ProcessClassTypeRankingsRequest {
//!             class_type_id: Uuid::new_v4(),
//!             options: Default::default(),
//!         })
//!         .await?;
//!     println!("ranked {} students", result.student_count());
//!
//!     Ok(())
//! }
//! ```

pub mod engine;
pub mod errors;
pub mod models;

pub use engine::RankingEngine;
pub use errors::{RankingError, RankingResult};
pub use models::{
    ClassType, ClassTypeFailure, ClassTypeId, ClassTypeRankingResult, Medal, MedalBands, Olympiad,
    OlympiadId, OlympiadRankingResult, RankAssignment, RankingOptions, RankingStats, Student,
    StudentAnswer, StudentId, compute_bands,
};
