//! Bracket data models for single-elimination tournaments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tournament ID type
pub type TournamentId = Uuid;

/// Match ID type
pub type MatchId = Uuid;

/// Participant ID type (a student in the surrounding platform)
pub type ParticipantId = Uuid;

/// Task ID type (the problem set a match is played on)
pub type TaskId = Uuid;

/// Tournament lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TournamentStatus {
    /// Created, bracket not yet generated
    Opening,
    /// Bracket in progress
    Ongoing,
    /// Single winner determined
    Finished,
}

/// Match status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStatus {
    /// Waiting for a result
    Pending,
    /// Result recorded; terminal
    Completed,
}

/// A single-elimination tournament document.
///
/// `rounds` is the append-only, ordered list of every match generated for
/// this tournament. `advanced_rounds` holds the round labels whose
/// advancement has already been claimed, backing the compare-and-set guard
/// against duplicate next-round generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tournament {
    /// Tournament ID
    pub id: TournamentId,
    /// Participants in registration order
    pub participants: Vec<ParticipantId>,
    /// Ordered list of match references across all rounds
    pub rounds: Vec<MatchId>,
    /// Round labels already claimed for advancement
    pub advanced_rounds: Vec<String>,
    /// Lifecycle status
    pub status: TournamentStatus,
    /// Created at timestamp
    pub created_at: DateTime<Utc>,
}

impl Tournament {
    /// Create a new tournament in the `Opening` state
    pub fn new(participants: Vec<ParticipantId>) -> Self {
        Self {
            id: Uuid::new_v4(),
            participants,
            rounds: Vec::new(),
            advanced_rounds: Vec::new(),
            status: TournamentStatus::Opening,
            created_at: Utc::now(),
        }
    }
}

/// A bracket match document.
///
/// `slot_b` absent signals a bye: the match is created already completed
/// with `winner = slot_a` and no loser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    /// Match ID
    pub id: MatchId,
    /// Owning tournament
    pub tournament_id: TournamentId,
    /// Task the match is played on, if any
    pub task: Option<TaskId>,
    /// Round label (e.g. "Semifinal")
    pub round: String,
    /// First participant slot
    pub slot_a: ParticipantId,
    /// Second participant slot; `None` marks a bye
    pub slot_b: Option<ParticipantId>,
    /// Winning participant, set on completion
    pub winner: Option<ParticipantId>,
    /// Losing participant, set on completion (never set for byes)
    pub loser: Option<ParticipantId>,
    /// Match status
    pub status: MatchStatus,
    /// Scheduled play time, if any
    pub schedule_at: Option<DateTime<Utc>>,
}

impl Match {
    /// Create a pending match between two participants
    pub fn new(
        tournament_id: TournamentId,
        round: &str,
        slot_a: ParticipantId,
        slot_b: ParticipantId,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tournament_id,
            task: None,
            round: round.to_string(),
            slot_a,
            slot_b: Some(slot_b),
            winner: None,
            loser: None,
            status: MatchStatus::Pending,
            schedule_at: None,
        }
    }

    /// Create a bye match, completed on creation with `slot_a` as winner
    pub fn bye(tournament_id: TournamentId, round: &str, slot_a: ParticipantId) -> Self {
        Self {
            id: Uuid::new_v4(),
            tournament_id,
            task: None,
            round: round.to_string(),
            slot_a,
            slot_b: None,
            winner: Some(slot_a),
            loser: None,
            status: MatchStatus::Completed,
            schedule_at: None,
        }
    }

    /// Schedule the match for a specific time
    pub fn with_schedule(mut self, schedule_at: DateTime<Utc>) -> Self {
        self.schedule_at = Some(schedule_at);
        self
    }

    /// Attach the task the match is played on
    pub fn with_task(mut self, task: TaskId) -> Self {
        self.task = Some(task);
        self
    }

    /// Whether this match is a bye
    pub fn is_bye(&self) -> bool {
        self.slot_b.is_none()
    }
}

/// Name the round played by `participant_count` participants.
///
/// 2 → "Final", 4 → "Semifinal", 8 → "Quarterfinal"; any other count falls
/// back to "Round {log2(count)}". Non-power-of-two counts yield a
/// non-integer label; that quirk is preserved deliberately.
pub fn round_name(participant_count: usize) -> String {
    match participant_count {
        2 => "Final".to_string(),
        4 => "Semifinal".to_string(),
        8 => "Quarterfinal".to_string(),
        n => format!("Round {}", (n as f64).log2()),
    }
}

/// Pair an ordered winner list into next-round matches.
///
/// Winners are paired two at a time in order; an odd leftover receives an
/// immediately-completed bye.
pub fn pair_round(
    tournament_id: TournamentId,
    round: &str,
    winners: &[ParticipantId],
) -> Vec<Match> {
    winners
        .chunks(2)
        .map(|pair| match pair {
            [a, b] => Match::new(tournament_id, round, *a, *b),
            [a] => Match::bye(tournament_id, round, *a),
            _ => unreachable!("chunks(2) yields one- or two-element slices"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_name_named_rounds() {
        assert_eq!(round_name(2), "Final");
        assert_eq!(round_name(4), "Semifinal");
        assert_eq!(round_name(8), "Quarterfinal");
    }

    #[test]
    fn test_round_name_power_of_two_fallback() {
        assert_eq!(round_name(16), "Round 4");
        assert_eq!(round_name(32), "Round 5");
    }

    #[test]
    fn test_round_name_non_power_of_two() {
        // Non-integer label, kept as-is
        let name = round_name(6);
        assert!(name.starts_with("Round 2.58"), "unexpected label: {name}");
    }

    #[test]
    fn test_bye_match_completed_on_creation() {
        let t = Uuid::new_v4();
        let a = Uuid::new_v4();
        let m = Match::bye(t, "Final", a);
        assert_eq!(m.status, MatchStatus::Completed);
        assert_eq!(m.winner, Some(a));
        assert_eq!(m.loser, None);
        assert!(m.is_bye());
    }

    #[test]
    fn test_match_builders() {
        let t = Uuid::new_v4();
        let task = Uuid::new_v4();
        let when = Utc::now();
        let m = Match::new(t, "Final", Uuid::new_v4(), Uuid::new_v4())
            .with_task(task)
            .with_schedule(when);
        assert_eq!(m.task, Some(task));
        assert_eq!(m.schedule_at, Some(when));
    }

    #[test]
    fn test_pair_round_even() {
        let t = Uuid::new_v4();
        let winners: Vec<_> = (0..4).map(|_| Uuid::new_v4()).collect();
        let matches = pair_round(t, "Semifinal", &winners);
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].slot_a, winners[0]);
        assert_eq!(matches[0].slot_b, Some(winners[1]));
        assert_eq!(matches[1].slot_a, winners[2]);
        assert_eq!(matches[1].slot_b, Some(winners[3]));
        assert!(matches.iter().all(|m| m.status == MatchStatus::Pending));
    }

    #[test]
    fn test_pair_round_odd_leftover_gets_bye() {
        let t = Uuid::new_v4();
        let winners: Vec<_> = (0..5).map(|_| Uuid::new_v4()).collect();
        let matches = pair_round(t, "Round 3", &winners);
        assert_eq!(matches.len(), 3);
        let bye = &matches[2];
        assert!(bye.is_bye());
        assert_eq!(bye.winner, Some(winners[4]));
        assert_eq!(bye.status, MatchStatus::Completed);
    }
}
