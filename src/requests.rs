//! Typed request payloads for the engine operations.
//!
//! The API layer outside this crate deserializes untrusted payloads into
//! these structures; each request validates itself before any storage work
//! happens, replacing the ad hoc untyped payloads of the original resolver
//! boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bracket::{MatchId, ParticipantId, TaskId};
use crate::ranking::{ClassTypeId, OlympiadId, RankingOptions};

/// A request that failed validation before reaching storage
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid {field}: {reason}")]
pub struct RequestValidationError {
    /// Offending field
    pub field: &'static str,
    /// What the field violated
    pub reason: String,
}

impl RequestValidationError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Create a tournament and generate its first round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTournamentRequest {
    /// Participants in registration order
    pub participants: Vec<ParticipantId>,
    /// Task the tournament's matches are played on
    #[serde(default)]
    pub task: Option<TaskId>,
    /// Scheduled play time applied to the generated matches
    pub schedule_at: Option<DateTime<Utc>>,
}

impl CreateTournamentRequest {
    pub fn validate(&self) -> Result<(), RequestValidationError> {
        if self.participants.len() < 2 {
            return Err(RequestValidationError::new(
                "participants",
                format!("need at least 2, have {}", self.participants.len()),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        if !self.participants.iter().all(|p| seen.insert(p)) {
            return Err(RequestValidationError::new(
                "participants",
                "duplicate participant",
            ));
        }
        Ok(())
    }
}

/// Record a match result and advance the bracket if the round completes
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RecordWinnerRequest {
    pub match_id: MatchId,
    pub winner_id: ParticipantId,
}

/// Recompute medal bands for one class type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessClassTypeRankingsRequest {
    pub class_type_id: ClassTypeId,
    #[serde(default)]
    pub options: RankingOptions,
}

/// Recompute medal bands for every class type of an olympiad
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessOlympiadRankingsRequest {
    pub olympiad_id: OlympiadId,
    #[serde(default)]
    pub options: RankingOptions,
}

/// Read-only ranking statistics for a class type
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RankingStatsRequest {
    pub class_type_id: ClassTypeId,
}

impl RankingOptions {
    pub fn validate(&self) -> Result<(), RequestValidationError> {
        if self.batch_size == 0 {
            return Err(RequestValidationError::new("batch_size", "must be >= 1"));
        }
        Ok(())
    }
}

/// Every operation the core exposes, one tagged variant per operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EngineRequest {
    CreateTournament(CreateTournamentRequest),
    RecordWinner(RecordWinnerRequest),
    ProcessClassTypeRankings(ProcessClassTypeRankingsRequest),
    ProcessOlympiadRankings(ProcessOlympiadRankingsRequest),
    GetClassTypeRankingStats(RankingStatsRequest),
}

impl EngineRequest {
    /// Validate the payload before dispatch
    pub fn validate(&self) -> Result<(), RequestValidationError> {
        match self {
            EngineRequest::CreateTournament(req) => req.validate(),
            EngineRequest::RecordWinner(_) => Ok(()),
            EngineRequest::ProcessClassTypeRankings(req) => req.options.validate(),
            EngineRequest::ProcessOlympiadRankings(req) => req.options.validate(),
            EngineRequest::GetClassTypeRankingStats(_) => Ok(()),
        }
    }
}
