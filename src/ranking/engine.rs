//! Ranking engine: medal band recomputation and distribution.

use log::{info, warn};
use std::sync::Arc;
use std::time::Instant;

use super::errors::{RankingError, RankingResult};
use super::models::{
    ClassType, ClassTypeFailure, ClassTypeId, ClassTypeRankingResult, Medal, MedalBands,
    OlympiadRankingResult, RankAssignment, RankingOptions, RankingStats, Student, StudentAnswer,
    StudentId, compute_bands,
};
use crate::db::{
    OlympiadStore, RetryOptions, StoreSession, TxRetryExecutor,
};
use crate::requests::{ProcessClassTypeRankingsRequest, ProcessOlympiadRankingsRequest};

/// Ranking and medal distribution engine
#[derive(Clone)]
pub struct RankingEngine {
    store: Arc<dyn OlympiadStore>,
    retry: RetryOptions,
}

impl RankingEngine {
    /// Create an engine with the default retry backoff
    pub fn new(store: Arc<dyn OlympiadStore>) -> Self {
        Self {
            store,
            retry: RetryOptions::default(),
        }
    }

    /// Create an engine with an explicit retry backoff.
    ///
    /// The per-request `retry_count` still controls the retry budget; this
    /// only sets the base delay between attempts.
    pub fn with_retry_options(store: Arc<dyn OlympiadStore>, retry: RetryOptions) -> Self {
        Self { store, retry }
    }

    fn executor(&self, options: &RankingOptions) -> TxRetryExecutor {
        TxRetryExecutor::new(RetryOptions {
            max_retries: options.retry_count,
            base_delay: self.retry.base_delay,
        })
    }

    /// Recompute one class type's medal bands from its score records.
    ///
    /// Score records are read score-descending, sliced into positional bands
    /// sized by the class type's `medalists` count, and written back to both
    /// the class type and the per-student medal mirrors. The write is
    /// clear-then-write: every student leaving a band is removed from it, so
    /// reprocessing the same cohort is idempotent.
    ///
    /// With `use_transactions` set (the default) the whole recomputation is
    /// one atomic scope retried on transient failure. Without it each student
    /// batch commits on its own, trading atomicity for smaller transactions
    /// on very large cohorts.
    pub async fn process_class_type_rankings(
        &self,
        request: ProcessClassTypeRankingsRequest,
    ) -> RankingResult<ClassTypeRankingResult> {
        let started = Instant::now();
        let ProcessClassTypeRankingsRequest {
            class_type_id,
            options,
        } = request;
        options
            .validate()
            .map_err(|e| RankingError::Validation(e.to_string()))?;

        let class_type = self
            .store
            .get_class_type(class_type_id)
            .await?
            .ok_or(RankingError::ClassTypeNotFound(class_type_id))?;
        if !options.skip_validation {
            validate_medal_config(&class_type)?;
        }

        let executor = self.executor(&options);
        let batch_size = options.batch_size;

        let (bands, assignments) = if options.use_transactions {
            executor
                .run(self.store.as_ref(), move |session| {
                    Box::pin(async move {
                        let class_type = session
                            .get_class_type(class_type_id)
                            .await?
                            .ok_or(RankingError::ClassTypeNotFound(class_type_id))?;
                        let ranked = session.list_scored_answers(class_type_id).await?;
                        let bands = compute_bands(&ranked, class_type.medalists);
                        let assignments = build_assignments(&ranked, &bands);
                        apply_bands(session, class_type, &bands, batch_size).await?;
                        Ok::<_, RankingError>((bands, assignments))
                    })
                })
                .await
                .map_err(RankingError::from)?
        } else {
            self.process_unbatched(&executor, class_type, batch_size)
                .await?
        };

        let result = ClassTypeRankingResult {
            class_type_id,
            bands,
            assignments,
            elapsed: started.elapsed(),
        };
        info!(
            "ranked class type {} ({} students, {} gold) in {:?}",
            class_type_id,
            result.student_count(),
            result.bands.gold.len(),
            result.elapsed
        );
        Ok(result)
    }

    /// Clear-then-write with per-batch sessions instead of one atomic scope.
    /// Each batch commits independently; a failure mid-way leaves earlier
    /// batches committed.
    async fn process_unbatched(
        &self,
        executor: &TxRetryExecutor,
        class_type: ClassType,
        batch_size: usize,
    ) -> RankingResult<(MedalBands<StudentId>, Vec<RankAssignment>)> {
        let class_type_id = class_type.id;
        let ranked = self.store.list_scored_answers(class_type_id).await?;
        let bands = compute_bands(&ranked, class_type.medalists);
        let assignments = build_assignments(&ranked, &bands);

        let updated = {
            let mut students = Vec::new();
            for student_id in affected_students(&class_type.bands, &bands) {
                if let Some(mut student) = self.store.get_student(student_id).await? {
                    rewrite_mirror(&mut student, class_type_id, &bands);
                    students.push(student);
                }
            }
            students
        };

        for chunk in updated.chunks(batch_size) {
            let chunk = chunk.to_vec();
            executor
                .run(self.store.as_ref(), move |session| {
                    let chunk = chunk.clone();
                    Box::pin(async move {
                        session.update_students(&chunk).await?;
                        Ok::<_, RankingError>(())
                    })
                })
                .await
                .map_err(RankingError::from)?;
        }

        let final_bands = bands.clone();
        let final_class_type = {
            let mut ct = class_type.clone();
            ct.bands = final_bands;
            ct
        };
        executor
            .run(self.store.as_ref(), move |session| {
                let class_type = final_class_type.clone();
                Box::pin(async move {
                    session.update_class_type(&class_type).await?;
                    Ok::<_, RankingError>(())
                })
            })
            .await
            .map_err(RankingError::from)?;

        Ok((bands, assignments))
    }

    /// Recompute every class type of an olympiad.
    ///
    /// Class types are processed sequentially; a failure in one is recorded
    /// and does not roll back or skip the others.
    pub async fn process_olympiad_rankings(
        &self,
        request: ProcessOlympiadRankingsRequest,
    ) -> RankingResult<OlympiadRankingResult> {
        let started = Instant::now();
        let ProcessOlympiadRankingsRequest {
            olympiad_id,
            options,
        } = request;

        let olympiad = self
            .store
            .get_olympiad(olympiad_id)
            .await?
            .ok_or(RankingError::OlympiadNotFound(olympiad_id))?;

        let mut class_types = Vec::new();
        let mut failed = Vec::new();
        for class_type_id in olympiad.class_types {
            let result = self
                .process_class_type_rankings(ProcessClassTypeRankingsRequest {
                    class_type_id,
                    options: options.clone(),
                })
                .await;
            match result {
                Ok(result) => class_types.push(result),
                Err(e) => {
                    warn!("class type {class_type_id} ranking failed: {e}");
                    failed.push(ClassTypeFailure {
                        class_type_id,
                        code: e.code(),
                        message: e.to_string(),
                    });
                }
            }
        }

        let total_students = class_types.iter().map(|r| r.student_count()).sum();
        let result = OlympiadRankingResult {
            olympiad_id,
            class_types,
            failed,
            total_students,
            elapsed: started.elapsed(),
        };
        info!(
            "ranked olympiad {} ({} class types, {} failed, {} students) in {:?}",
            olympiad_id,
            result.class_types.len(),
            result.failed.len(),
            result.total_students,
            result.elapsed
        );
        Ok(result)
    }

    /// Read-only statistics over a class type's current bands and scores
    pub async fn get_class_type_ranking_stats(
        &self,
        class_type_id: ClassTypeId,
    ) -> RankingResult<RankingStats> {
        let class_type = self
            .store
            .get_class_type(class_type_id)
            .await?
            .ok_or(RankingError::ClassTypeNotFound(class_type_id))?;
        let ranked = self.store.list_scored_answers(class_type_id).await?;

        let participant_count = ranked.len();
        let (min_score, max_score, sum) = ranked.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY, 0.0),
            |(min, max, sum), a| {
                (min.min(a.total_score), max.max(a.total_score), sum + a.total_score)
            },
        );

        Ok(RankingStats {
            class_type_id,
            participant_count,
            gold_count: class_type.bands.gold.len(),
            silver_count: class_type.bands.silver.len(),
            bronze_count: class_type.bands.bronze.len(),
            top10_count: class_type.bands.top10.len(),
            average_score: if participant_count == 0 {
                0.0
            } else {
                sum / participant_count as f64
            },
            min_score: if participant_count == 0 { 0.0 } else { min_score },
            max_score: if participant_count == 0 { 0.0 } else { max_score },
        })
    }
}

fn validate_medal_config(class_type: &ClassType) -> RankingResult<()> {
    if class_type.medalists == 0 {
        return Err(RankingError::InvalidMedalDistribution {
            reason: format!("class type {} has zero medalists per tier", class_type.id),
        });
    }
    Ok(())
}

/// Per-student rank and medal assignments for a score-descending record list
fn build_assignments(
    ranked: &[StudentAnswer],
    bands: &MedalBands<StudentId>,
) -> Vec<RankAssignment> {
    ranked
        .iter()
        .enumerate()
        .map(|(i, answer)| {
            let medal = if bands.gold.contains(&answer.student_id) {
                Some(Medal::Gold)
            } else if bands.silver.contains(&answer.student_id) {
                Some(Medal::Silver)
            } else if bands.bronze.contains(&answer.student_id) {
                Some(Medal::Bronze)
            } else {
                None
            };
            RankAssignment {
                student_id: answer.student_id,
                rank: i + 1,
                medal,
                top10: bands.top10.contains(&answer.student_id),
                score: answer.total_score,
            }
        })
        .collect()
}

/// Students touched by a band rewrite: previous members plus new members,
/// deduplicated, previous first
fn affected_students(
    old: &MedalBands<StudentId>,
    new: &MedalBands<StudentId>,
) -> Vec<StudentId> {
    let mut affected: Vec<StudentId> = Vec::new();
    let bands = [
        &old.gold, &old.silver, &old.bronze, &old.top10,
        &new.gold, &new.silver, &new.bronze, &new.top10,
    ];
    for band in bands {
        for id in band {
            if !affected.contains(id) {
                affected.push(*id);
            }
        }
    }
    affected
}

/// Clear-then-write one student's medal mirror for a class type
fn rewrite_mirror(student: &mut Student, class_type_id: ClassTypeId, bands: &MedalBands<StudentId>) {
    student.medals.remove(&class_type_id);
    if bands.gold.contains(&student.id) {
        student.medals.gold.push(class_type_id);
    }
    if bands.silver.contains(&student.id) {
        student.medals.silver.push(class_type_id);
    }
    if bands.bronze.contains(&student.id) {
        student.medals.bronze.push(class_type_id);
    }
    if bands.top10.contains(&student.id) {
        student.medals.top10.push(class_type_id);
    }
}

/// Apply new bands inside one session: rewrite affected student mirrors in
/// batches, then persist the class type
async fn apply_bands(
    session: &mut (dyn StoreSession + '_),
    mut class_type: ClassType,
    bands: &MedalBands<StudentId>,
    batch_size: usize,
) -> RankingResult<()> {
    let mut updated = Vec::new();
    for student_id in affected_students(&class_type.bands, bands) {
        if let Some(mut student) = session.get_student(student_id).await? {
            rewrite_mirror(&mut student, class_type.id, bands);
            updated.push(student);
        }
    }
    for chunk in updated.chunks(batch_size) {
        session.update_students(chunk).await?;
    }

    class_type.bands = bands.clone();
    session.update_class_type(&class_type).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn answer(class_type_id: ClassTypeId, score: f64) -> StudentAnswer {
        StudentAnswer {
            id: Uuid::new_v4(),
            class_type_id,
            student_id: Uuid::new_v4(),
            total_score: score,
        }
    }

    #[test]
    fn test_build_assignments_marks_medals_and_ranks() {
        let ct = Uuid::new_v4();
        let ranked: Vec<_> = [90.0, 80.0, 70.0, 60.0].map(|s| answer(ct, s)).into();
        let bands = compute_bands(&ranked, 1);
        let assignments = build_assignments(&ranked, &bands);

        assert_eq!(assignments[0].rank, 1);
        assert_eq!(assignments[0].medal, Some(Medal::Gold));
        assert_eq!(assignments[1].medal, Some(Medal::Silver));
        assert_eq!(assignments[2].medal, Some(Medal::Bronze));
        assert_eq!(assignments[3].medal, None);
        assert!(assignments.iter().all(|a| a.top10));
    }

    #[test]
    fn test_affected_students_unions_old_and_new() {
        let stays = Uuid::new_v4();
        let leaves = Uuid::new_v4();
        let joins = Uuid::new_v4();
        let old = MedalBands {
            gold: vec![stays, leaves],
            ..Default::default()
        };
        let new = MedalBands {
            gold: vec![stays, joins],
            ..Default::default()
        };
        let affected = affected_students(&old, &new);
        assert_eq!(affected, vec![stays, leaves, joins]);
    }

    #[test]
    fn test_rewrite_mirror_is_clear_then_write() {
        let ct = Uuid::new_v4();
        let mut student = Student::new("test");
        student.medals.gold.push(ct);
        student.medals.top10.push(ct);

        // Demoted from gold to bronze, still top10
        let bands = MedalBands {
            bronze: vec![student.id],
            top10: vec![student.id],
            ..Default::default()
        };
        rewrite_mirror(&mut student, ct, &bands);

        assert!(student.medals.gold.is_empty());
        assert_eq!(student.medals.bronze, vec![ct]);
        assert_eq!(student.medals.top10, vec![ct]);
    }

    #[test]
    fn test_rewrite_mirror_preserves_other_class_types() {
        let ct = Uuid::new_v4();
        let other = Uuid::new_v4();
        let mut student = Student::new("test");
        student.medals.gold.push(other);
        student.medals.gold.push(ct);

        rewrite_mirror(&mut student, ct, &MedalBands::default());
        assert_eq!(student.medals.gold, vec![other]);
    }

    #[test]
    fn test_validate_medal_config_rejects_zero() {
        let class_type = ClassType {
            id: Uuid::new_v4(),
            olympiad_id: Uuid::new_v4(),
            name: "Grade 9".into(),
            medalists: 0,
            bands: MedalBands::default(),
        };
        assert!(matches!(
            validate_medal_config(&class_type),
            Err(RankingError::InvalidMedalDistribution { .. })
        ));
    }
}
