//! In-memory store implementation with optimistic concurrency.
//!
//! Used by tests and local tooling in place of Postgres. A session clones
//! the whole store state at `begin`; `commit` installs the clone only if no
//! other session committed in between, otherwise it fails with a
//! [`StoreError::Conflict`]. That gives the retry executor and the
//! round-advancement guard real conflict semantics to exercise.
//!
//! Commit failures can additionally be injected to simulate transient
//! storage outages.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use super::repository::{OlympiadStore, StoreError, StoreResult, StoreSession};
use crate::bracket::{Match, MatchId, Tournament, TournamentId};
use crate::ranking::{
    ClassType, ClassTypeId, Olympiad, OlympiadId, Student, StudentAnswer, StudentId,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    version: u64,
    tournaments: HashMap<TournamentId, Tournament>,
    matches: HashMap<MatchId, Match>,
    /// Global match persistence order
    match_order: Vec<MatchId>,
    olympiads: HashMap<OlympiadId, Olympiad>,
    class_types: HashMap<ClassTypeId, ClassType>,
    /// Answers in retrieval order
    answers: Vec<StudentAnswer>,
    students: HashMap<StudentId, Student>,
}

impl MemoryState {
    fn scored_answers(&self, class_type_id: ClassTypeId) -> Vec<StudentAnswer> {
        let mut answers: Vec<StudentAnswer> = self
            .answers
            .iter()
            .filter(|a| a.class_type_id == class_type_id && a.total_score > 0.0)
            .cloned()
            .collect();
        // Stable sort: ties keep retrieval order
        answers.sort_by(|a, b| b.total_score.total_cmp(&a.total_score));
        answers
    }

    fn round_matches(&self, tournament_id: TournamentId, round: &str) -> Vec<Match> {
        self.match_order
            .iter()
            .filter_map(|id| self.matches.get(id))
            .filter(|m| m.tournament_id == tournament_id && m.round == round)
            .cloned()
            .collect()
    }
}

#[derive(Debug, Default)]
struct FaultPlan {
    /// One-shot errors returned by the next commits, in order
    commit_errors: VecDeque<StoreError>,
    /// When set, every commit fails with `Unavailable` carrying this message
    always_fail: Option<String>,
    commit_attempts: u64,
}

/// Shared in-memory document store
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    faults: Arc<Mutex<FaultPlan>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Seeding helpers for tests and fixtures

    pub fn seed_tournament(&self, tournament: Tournament) {
        let mut state = self.state.lock().unwrap();
        state.tournaments.insert(tournament.id, tournament);
    }

    pub fn seed_match(&self, m: Match) {
        let mut state = self.state.lock().unwrap();
        state.match_order.push(m.id);
        state.matches.insert(m.id, m);
    }

    pub fn seed_olympiad(&self, olympiad: Olympiad) {
        let mut state = self.state.lock().unwrap();
        state.olympiads.insert(olympiad.id, olympiad);
    }

    pub fn seed_class_type(&self, class_type: ClassType) {
        let mut state = self.state.lock().unwrap();
        state.class_types.insert(class_type.id, class_type);
    }

    pub fn seed_answer(&self, answer: StudentAnswer) {
        self.state.lock().unwrap().answers.push(answer);
    }

    pub fn seed_student(&self, student: Student) {
        let mut state = self.state.lock().unwrap();
        state.students.insert(student.id, student);
    }

    // Fault injection

    /// Queue a one-shot error for an upcoming commit
    pub fn inject_commit_error(&self, error: StoreError) {
        self.faults.lock().unwrap().commit_errors.push_back(error);
    }

    /// Fail every commit with `Unavailable` until cleared
    pub fn fail_commits_with(&self, message: &str) {
        self.faults.lock().unwrap().always_fail = Some(message.to_string());
    }

    /// Clear injected failures
    pub fn clear_commit_failures(&self) {
        let mut faults = self.faults.lock().unwrap();
        faults.commit_errors.clear();
        faults.always_fail = None;
    }

    /// Total commit attempts observed, including failed ones
    pub fn commit_attempts(&self) -> u64 {
        self.faults.lock().unwrap().commit_attempts
    }
}

#[async_trait]
impl OlympiadStore for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreSession>> {
        let state = self.state.lock().unwrap();
        Ok(Box::new(MemorySession {
            store: self.clone(),
            base_version: state.version,
            working: state.clone(),
        }))
    }

    async fn get_tournament(&self, id: TournamentId) -> StoreResult<Option<Tournament>> {
        Ok(self.state.lock().unwrap().tournaments.get(&id).cloned())
    }

    async fn get_match(&self, id: MatchId) -> StoreResult<Option<Match>> {
        Ok(self.state.lock().unwrap().matches.get(&id).cloned())
    }

    async fn list_tournament_matches(&self, id: TournamentId) -> StoreResult<Vec<Match>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .match_order
            .iter()
            .filter_map(|mid| state.matches.get(mid))
            .filter(|m| m.tournament_id == id)
            .cloned()
            .collect())
    }

    async fn get_olympiad(&self, id: OlympiadId) -> StoreResult<Option<Olympiad>> {
        Ok(self.state.lock().unwrap().olympiads.get(&id).cloned())
    }

    async fn get_class_type(&self, id: ClassTypeId) -> StoreResult<Option<ClassType>> {
        Ok(self.state.lock().unwrap().class_types.get(&id).cloned())
    }

    async fn list_scored_answers(
        &self,
        class_type_id: ClassTypeId,
    ) -> StoreResult<Vec<StudentAnswer>> {
        Ok(self.state.lock().unwrap().scored_answers(class_type_id))
    }

    async fn get_student(&self, id: StudentId) -> StoreResult<Option<Student>> {
        Ok(self.state.lock().unwrap().students.get(&id).cloned())
    }
}

/// A snapshot session over [`MemoryStore`]
struct MemorySession {
    store: MemoryStore,
    base_version: u64,
    working: MemoryState,
}

#[async_trait]
impl StoreSession for MemorySession {
    async fn commit(self: Box<Self>) -> StoreResult<()> {
        {
            let mut faults = self.store.faults.lock().unwrap();
            faults.commit_attempts += 1;
            if let Some(error) = faults.commit_errors.pop_front() {
                return Err(error);
            }
            if let Some(message) = &faults.always_fail {
                return Err(StoreError::Unavailable(message.clone()));
            }
        }

        let mut state = self.store.state.lock().unwrap();
        if state.version != self.base_version {
            return Err(StoreError::Conflict(format!(
                "store advanced from version {} to {} since session began",
                self.base_version, state.version
            )));
        }
        let mut working = self.working;
        working.version = state.version + 1;
        *state = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        // Snapshot is simply dropped
        Ok(())
    }

    async fn get_tournament(&mut self, id: TournamentId) -> StoreResult<Option<Tournament>> {
        Ok(self.working.tournaments.get(&id).cloned())
    }

    async fn insert_tournament(&mut self, tournament: &Tournament) -> StoreResult<()> {
        self.working
            .tournaments
            .insert(tournament.id, tournament.clone());
        Ok(())
    }

    async fn update_tournament(&mut self, tournament: &Tournament) -> StoreResult<()> {
        self.working
            .tournaments
            .insert(tournament.id, tournament.clone());
        Ok(())
    }

    async fn claim_round_advance(
        &mut self,
        tournament_id: TournamentId,
        round: &str,
    ) -> StoreResult<bool> {
        match self.working.tournaments.get_mut(&tournament_id) {
            Some(t) if t.advanced_rounds.iter().any(|r| r == round) => Ok(false),
            Some(t) => {
                t.advanced_rounds.push(round.to_string());
                Ok(true)
            }
            // A missing tournament cannot be claimed
            None => Ok(false),
        }
    }

    async fn get_match(&mut self, id: MatchId) -> StoreResult<Option<Match>> {
        Ok(self.working.matches.get(&id).cloned())
    }

    async fn insert_match(&mut self, m: &Match) -> StoreResult<()> {
        self.working.match_order.push(m.id);
        self.working.matches.insert(m.id, m.clone());
        Ok(())
    }

    async fn update_match(&mut self, m: &Match) -> StoreResult<()> {
        self.working.matches.insert(m.id, m.clone());
        Ok(())
    }

    async fn list_round_matches(
        &mut self,
        tournament_id: TournamentId,
        round: &str,
    ) -> StoreResult<Vec<Match>> {
        Ok(self.working.round_matches(tournament_id, round))
    }

    async fn get_class_type(&mut self, id: ClassTypeId) -> StoreResult<Option<ClassType>> {
        Ok(self.working.class_types.get(&id).cloned())
    }

    async fn update_class_type(&mut self, class_type: &ClassType) -> StoreResult<()> {
        self.working
            .class_types
            .insert(class_type.id, class_type.clone());
        Ok(())
    }

    async fn list_scored_answers(
        &mut self,
        class_type_id: ClassTypeId,
    ) -> StoreResult<Vec<StudentAnswer>> {
        Ok(self.working.scored_answers(class_type_id))
    }

    async fn get_student(&mut self, id: StudentId) -> StoreResult<Option<Student>> {
        Ok(self.working.students.get(&id).cloned())
    }

    async fn update_student(&mut self, student: &Student) -> StoreResult<()> {
        self.working.students.insert(student.id, student.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_commit_makes_writes_visible() {
        let store = MemoryStore::new();
        let tournament = Tournament::new(vec![uuid::Uuid::new_v4(), uuid::Uuid::new_v4()]);
        let id = tournament.id;

        let mut session = store.begin().await.unwrap();
        session.insert_tournament(&tournament).await.unwrap();
        session.commit().await.unwrap();

        assert!(store.get_tournament(id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rollback_discards_writes() {
        let store = MemoryStore::new();
        let tournament = Tournament::new(vec![uuid::Uuid::new_v4(), uuid::Uuid::new_v4()]);
        let id = tournament.id;

        let mut session = store.begin().await.unwrap();
        session.insert_tournament(&tournament).await.unwrap();
        session.rollback().await.unwrap();

        assert!(store.get_tournament(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_commit_conflicts() {
        let store = MemoryStore::new();
        let t1 = Tournament::new(vec![uuid::Uuid::new_v4(), uuid::Uuid::new_v4()]);
        let t2 = Tournament::new(vec![uuid::Uuid::new_v4(), uuid::Uuid::new_v4()]);

        let mut first = store.begin().await.unwrap();
        let mut second = store.begin().await.unwrap();
        first.insert_tournament(&t1).await.unwrap();
        second.insert_tournament(&t2).await.unwrap();

        first.commit().await.unwrap();
        let err = second.commit().await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_claim_round_advance_is_single_shot() {
        let store = MemoryStore::new();
        let tournament = Tournament::new(vec![uuid::Uuid::new_v4(), uuid::Uuid::new_v4()]);
        let id = tournament.id;
        store.seed_tournament(tournament);

        let mut session = store.begin().await.unwrap();
        assert!(session.claim_round_advance(id, "Final").await.unwrap());
        assert!(!session.claim_round_advance(id, "Final").await.unwrap());
        session.commit().await.unwrap();

        let mut session = store.begin().await.unwrap();
        assert!(!session.claim_round_advance(id, "Final").await.unwrap());
    }

    #[tokio::test]
    async fn test_injected_commit_error_is_one_shot() {
        let store = MemoryStore::new();
        store.inject_commit_error(StoreError::Timeout("simulated".into()));

        let session = store.begin().await.unwrap();
        assert!(session.commit().await.is_err());

        let session = store.begin().await.unwrap();
        assert!(session.commit().await.is_ok());
        assert_eq!(store.commit_attempts(), 2);
    }
}
