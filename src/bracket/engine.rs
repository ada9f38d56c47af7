//! Bracket progression engine for single-elimination tournaments.

use log::info;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use super::models::{
    Match, MatchId, MatchStatus, ParticipantId, Tournament, TournamentId, TournamentStatus,
    pair_round, round_name,
};
use crate::db::{
    OlympiadStore, RetryError, RetryOptions, StoreError, TransientError, TxRetryExecutor,
};
use crate::points::{self, PiPointsAward};
use crate::requests::{CreateTournamentRequest, RecordWinnerRequest};

/// Bracket errors
#[derive(Debug, Error)]
pub enum BracketError {
    #[error("match not found: {0}")]
    MatchNotFound(MatchId),

    #[error("tournament not found: {0}")]
    TournamentNotFound(TournamentId),

    #[error("winner {winner} is not a participant of match {match_id}")]
    InvalidWinner {
        match_id: MatchId,
        winner: ParticipantId,
    },

    #[error("match already completed: {0}")]
    AlreadyCompleted(MatchId),

    #[error("tournament not in correct state: expected {expected:?}, got {actual:?}")]
    InvalidState {
        expected: TournamentStatus,
        actual: TournamentStatus,
    },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("transaction failed after {attempts} attempts: {source}")]
    TransactionFailed {
        attempts: u32,
        source: Box<BracketError>,
    },

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

impl BracketError {
    /// Stable error code for the API layer
    pub fn code(&self) -> &'static str {
        match self {
            BracketError::MatchNotFound(_) | BracketError::TournamentNotFound(_) => "NOT_FOUND",
            BracketError::InvalidWinner { .. } | BracketError::Validation(_) => "VALIDATION_ERROR",
            BracketError::AlreadyCompleted(_) | BracketError::InvalidState { .. } => "CONFLICT",
            BracketError::TransactionFailed { .. } => "TRANSACTION_FAILED",
            BracketError::Store(_) => "STORE_ERROR",
        }
    }

    /// Structured diagnostics carried alongside the code
    pub fn context(&self) -> HashMap<&'static str, String> {
        let mut ctx = HashMap::new();
        match self {
            BracketError::MatchNotFound(id) | BracketError::AlreadyCompleted(id) => {
                ctx.insert("match_id", id.to_string());
            }
            BracketError::TournamentNotFound(id) => {
                ctx.insert("tournament_id", id.to_string());
            }
            BracketError::InvalidWinner { match_id, winner } => {
                ctx.insert("match_id", match_id.to_string());
                ctx.insert("winner_id", winner.to_string());
            }
            BracketError::InvalidState { expected, actual } => {
                ctx.insert("expected", format!("{expected:?}"));
                ctx.insert("actual", format!("{actual:?}"));
            }
            BracketError::Validation(reason) => {
                ctx.insert("reason", reason.clone());
            }
            BracketError::TransactionFailed { attempts, source } => {
                ctx.insert("attempts", attempts.to_string());
                ctx.insert("cause", source.to_string());
            }
            BracketError::Store(e) => {
                ctx.insert("cause", e.to_string());
            }
        }
        ctx
    }
}

impl TransientError for BracketError {
    fn is_transient(&self) -> bool {
        matches!(self, BracketError::Store(e) if e.is_transient())
    }
}

impl From<RetryError<BracketError>> for BracketError {
    fn from(err: RetryError<BracketError>) -> Self {
        match err {
            RetryError::Exhausted { attempts, source } => BracketError::TransactionFailed {
                attempts,
                source: Box::new(source),
            },
            RetryError::Aborted(source) => source,
        }
    }
}

pub type BracketResult<T> = Result<T, BracketError>;

/// What recording one winner did to the bracket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundProgress {
    /// The match's round still has pending matches
    RoundPending { completed: usize, total: usize },
    /// The round completed but another caller already claimed advancement
    AlreadyAdvanced,
    /// The round completed and the next round was generated
    NextRoundGenerated { round: String, matches: Vec<MatchId> },
    /// The round completed with a single winner; the bracket is done
    TournamentFinished { champion: ParticipantId },
}

/// Result of a `record_winner` call
#[derive(Debug, Clone)]
pub struct RecordWinnerOutcome {
    pub match_id: MatchId,
    pub round: String,
    pub winner: ParticipantId,
    pub loser: Option<ParticipantId>,
    pub progress: RoundProgress,
}

/// Bracket progression engine
#[derive(Clone)]
pub struct BracketEngine {
    store: Arc<dyn OlympiadStore>,
    executor: TxRetryExecutor,
}

impl BracketEngine {
    /// Create an engine with the default retry budget
    pub fn new(store: Arc<dyn OlympiadStore>) -> Self {
        Self {
            store,
            executor: TxRetryExecutor::with_defaults(),
        }
    }

    /// Create an engine with an explicit retry budget
    pub fn with_retry_options(store: Arc<dyn OlympiadStore>, options: RetryOptions) -> Self {
        Self {
            store,
            executor: TxRetryExecutor::new(options),
        }
    }

    /// Create a tournament and generate its first round.
    ///
    /// Participants are paired sequentially; an odd leftover receives an
    /// immediately-completed bye. The tournament is persisted `Ongoing`
    /// with the generated matches appended to its round history.
    pub async fn create_tournament(
        &self,
        request: CreateTournamentRequest,
    ) -> BracketResult<Tournament> {
        request
            .validate()
            .map_err(|e| BracketError::Validation(e.to_string()))?;

        let mut tournament = Tournament::new(request.participants.clone());
        let label = round_name(tournament.participants.len());
        let mut matches = pair_round(tournament.id, &label, &tournament.participants);
        for m in &mut matches {
            m.task = request.task;
            m.schedule_at = request.schedule_at;
        }
        tournament.rounds = matches.iter().map(|m| m.id).collect();
        tournament.status = TournamentStatus::Ongoing;

        let created = self
            .executor
            .run(self.store.as_ref(), |session| {
                let tournament = tournament.clone();
                let matches = matches.clone();
                Box::pin(async move {
                    session.insert_tournament(&tournament).await?;
                    for m in &matches {
                        session.insert_match(m).await?;
                    }
                    Ok::<_, BracketError>(tournament)
                })
            })
            .await
            .map_err(BracketError::from)?;

        info!(
            "created tournament {} with {} participants, round '{}' ({} matches)",
            created.id,
            created.participants.len(),
            label,
            created.rounds.len()
        );
        Ok(created)
    }

    /// Record a match winner and advance the bracket if its round completed.
    ///
    /// For a regular match the winner must occupy one of the two slots; the
    /// other slot becomes the loser. For a bye match the supplied winner is
    /// ignored and `slot_a` wins without a loser. Completed matches are
    /// terminal: a second call is rejected rather than overwritten.
    ///
    /// When the last match of a round completes, advancement is claimed
    /// atomically before any next-round match is generated, so concurrent
    /// callers finishing the same round cannot duplicate it.
    pub async fn record_winner(
        &self,
        request: RecordWinnerRequest,
    ) -> BracketResult<RecordWinnerOutcome> {
        let RecordWinnerRequest { match_id, winner_id } = request;

        let outcome = self
            .executor
            .run(self.store.as_ref(), move |session| {
                Box::pin(async move {
                    let mut m = session
                        .get_match(match_id)
                        .await?
                        .ok_or(BracketError::MatchNotFound(match_id))?;

                    if m.status == MatchStatus::Completed {
                        return Err(BracketError::AlreadyCompleted(match_id));
                    }

                    match m.slot_b {
                        Some(slot_b) if winner_id == m.slot_a => {
                            m.winner = Some(m.slot_a);
                            m.loser = Some(slot_b);
                        }
                        Some(slot_b) if winner_id == slot_b => {
                            m.winner = Some(slot_b);
                            m.loser = Some(m.slot_a);
                        }
                        Some(_) => {
                            return Err(BracketError::InvalidWinner {
                                match_id,
                                winner: winner_id,
                            });
                        }
                        // Bye: the supplied winner is ignored
                        None => {
                            m.winner = Some(m.slot_a);
                            m.loser = None;
                        }
                    }
                    m.status = MatchStatus::Completed;
                    session.update_match(&m).await?;

                    let progress = advance_if_complete(session, &m).await?;

                    Ok::<_, BracketError>(RecordWinnerOutcome {
                        match_id,
                        round: m.round,
                        winner: m.winner.unwrap_or(m.slot_a),
                        loser: m.loser,
                        progress,
                    })
                })
            })
            .await
            .map_err(BracketError::from)?;

        match &outcome.progress {
            RoundProgress::NextRoundGenerated { round, matches } => {
                info!(
                    "round '{}' complete, generated '{}' with {} matches",
                    outcome.round,
                    round,
                    matches.len()
                );
            }
            RoundProgress::TournamentFinished { champion } => {
                info!("tournament finished, champion {champion}");
            }
            _ => {}
        }
        Ok(outcome)
    }

    /// Derive the final placement list of a finished tournament and turn it
    /// into PiPoints awards.
    ///
    /// Placements come from the bracket itself: the final's winner, then its
    /// loser, then each earlier round's losers in reverse round order (match
    /// order within a round). Byes contribute no loser.
    pub async fn award_pi_points(
        &self,
        tournament_id: TournamentId,
        total_points: i64,
    ) -> BracketResult<Vec<PiPointsAward>> {
        let placements = self.final_placements(tournament_id).await?;
        Ok(points::allocate(&placements, total_points))
    }

    /// Final standings of a finished tournament, best place first
    pub async fn final_placements(
        &self,
        tournament_id: TournamentId,
    ) -> BracketResult<Vec<ParticipantId>> {
        let tournament = self
            .store
            .get_tournament(tournament_id)
            .await?
            .ok_or(BracketError::TournamentNotFound(tournament_id))?;

        if tournament.status != TournamentStatus::Finished {
            return Err(BracketError::InvalidState {
                expected: TournamentStatus::Finished,
                actual: tournament.status,
            });
        }

        let matches = self.store.list_tournament_matches(tournament_id).await?;

        // Group into rounds, first-seen label order
        let mut rounds: Vec<(String, Vec<&Match>)> = Vec::new();
        for m in &matches {
            match rounds.iter_mut().find(|(label, _)| *label == m.round) {
                Some((_, ms)) => ms.push(m),
                None => rounds.push((m.round.clone(), vec![m])),
            }
        }

        let mut placements = Vec::new();
        for (i, (_, ms)) in rounds.iter().enumerate().rev() {
            if i == rounds.len() - 1 {
                placements.extend(ms.iter().filter_map(|m| m.winner));
            }
            placements.extend(ms.iter().filter_map(|m| m.loser));
        }
        Ok(placements)
    }
}

/// Recompute round completion for `completed_match`'s round and advance the
/// bracket when the round is done.
async fn advance_if_complete(
    session: &mut (dyn crate::db::StoreSession + '_),
    completed_match: &Match,
) -> BracketResult<RoundProgress> {
    let tournament_id = completed_match.tournament_id;
    let round_matches = session
        .list_round_matches(tournament_id, &completed_match.round)
        .await?;

    let total = round_matches.len();
    let completed = round_matches
        .iter()
        .filter(|m| m.status == MatchStatus::Completed)
        .count();
    if completed < total {
        return Ok(RoundProgress::RoundPending { completed, total });
    }

    // Winners in match persistence order
    let winners: Vec<ParticipantId> = round_matches.iter().filter_map(|m| m.winner).collect();

    session
        .get_tournament(tournament_id)
        .await?
        .ok_or(BracketError::TournamentNotFound(tournament_id))?;

    if !session
        .claim_round_advance(tournament_id, &completed_match.round)
        .await?
    {
        return Ok(RoundProgress::AlreadyAdvanced);
    }

    // Re-read after the claim so its write is not lost on update
    let mut tournament = session
        .get_tournament(tournament_id)
        .await?
        .ok_or(BracketError::TournamentNotFound(tournament_id))?;

    if winners.len() <= 1 {
        tournament.status = TournamentStatus::Finished;
        session.update_tournament(&tournament).await?;
        let champion = winners
            .first()
            .copied()
            .unwrap_or(completed_match.slot_a);
        return Ok(RoundProgress::TournamentFinished { champion });
    }

    let label = round_name(winners.len());
    let mut next_matches = pair_round(tournament_id, &label, &winners);
    // Next-round matches stay on the tournament's task
    for m in &mut next_matches {
        m.task = completed_match.task;
    }
    for m in &next_matches {
        session.insert_match(m).await?;
    }
    tournament.rounds.extend(next_matches.iter().map(|m| m.id));
    session.update_tournament(&tournament).await?;

    Ok(RoundProgress::NextRoundGenerated {
        round: label,
        matches: next_matches.iter().map(|m| m.id).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_error_codes() {
        assert_eq!(BracketError::MatchNotFound(Uuid::new_v4()).code(), "NOT_FOUND");
        assert_eq!(
            BracketError::AlreadyCompleted(Uuid::new_v4()).code(),
            "CONFLICT"
        );
        assert_eq!(
            BracketError::Validation("bad".into()).code(),
            "VALIDATION_ERROR"
        );
    }

    #[test]
    fn test_context_carries_structured_diagnostics() {
        let match_id = Uuid::new_v4();
        let winner = Uuid::new_v4();
        let ctx = BracketError::InvalidWinner { match_id, winner }.context();
        assert_eq!(ctx.get("match_id"), Some(&match_id.to_string()));
        assert_eq!(ctx.get("winner_id"), Some(&winner.to_string()));

        let err = BracketError::TransactionFailed {
            attempts: 4,
            source: Box::new(BracketError::Store(StoreError::Timeout("commit".into()))),
        };
        let ctx = err.context();
        assert_eq!(ctx.get("attempts"), Some(&"4".to_string()));
        assert!(ctx.contains_key("cause"));
    }
}
