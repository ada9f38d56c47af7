//! PostgreSQL implementation of the store traits.
//!
//! Documents keep their list-valued fields (participants, rounds, medal
//! bands) as JSONB columns; match and answer retrieval order is pinned by a
//! `seq` bigserial. Sessions map onto sqlx transactions opened at
//! SERIALIZABLE isolation, so concurrent round advancement or band writes
//! surface as serialization failures, which classify as transient conflicts
//! and are absorbed by the retry executor.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgExecutor, PgPool, Postgres, Row, Transaction};

use super::repository::{OlympiadStore, StoreResult, StoreSession};
use crate::bracket::{Match, MatchId, MatchStatus, Tournament, TournamentId, TournamentStatus};
use crate::ranking::{
    ClassType, ClassTypeId, MedalBands, Olympiad, OlympiadId, Student, StudentAnswer, StudentId,
};

/// PostgreSQL-backed document store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn tournament_status_str(status: TournamentStatus) -> &'static str {
    match status {
        TournamentStatus::Opening => "opening",
        TournamentStatus::Ongoing => "ongoing",
        TournamentStatus::Finished => "finished",
    }
}

fn match_status_str(status: MatchStatus) -> &'static str {
    match status {
        MatchStatus::Pending => "pending",
        MatchStatus::Completed => "completed",
    }
}

fn tournament_from_row(row: &PgRow) -> StoreResult<Tournament> {
    let status = match row.get::<String, _>("status").as_str() {
        "ongoing" => TournamentStatus::Ongoing,
        "finished" => TournamentStatus::Finished,
        _ => TournamentStatus::Opening,
    };

    Ok(Tournament {
        id: row.get("id"),
        participants: serde_json::from_value(row.get("participants"))?,
        rounds: serde_json::from_value(row.get("rounds"))?,
        advanced_rounds: serde_json::from_value(row.get("advanced_rounds"))?,
        status,
        created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
    })
}

fn match_from_row(row: &PgRow) -> Match {
    let status = match row.get::<String, _>("status").as_str() {
        "completed" => MatchStatus::Completed,
        _ => MatchStatus::Pending,
    };

    Match {
        id: row.get("id"),
        tournament_id: row.get("tournament_id"),
        task: row.get("task"),
        round: row.get("round"),
        slot_a: row.get("slot_a"),
        slot_b: row.get("slot_b"),
        winner: row.get("winner"),
        loser: row.get("loser"),
        status,
        schedule_at: row
            .get::<Option<chrono::NaiveDateTime>, _>("schedule_at")
            .map(|dt| dt.and_utc()),
    }
}

fn class_type_from_row(row: &PgRow) -> StoreResult<ClassType> {
    Ok(ClassType {
        id: row.get("id"),
        olympiad_id: row.get("olympiad_id"),
        name: row.get("name"),
        medalists: row.get::<i32, _>("medalists") as usize,
        bands: MedalBands {
            gold: serde_json::from_value(row.get("gold"))?,
            silver: serde_json::from_value(row.get("silver"))?,
            bronze: serde_json::from_value(row.get("bronze"))?,
            top10: serde_json::from_value(row.get("top10"))?,
        },
    })
}

fn student_from_row(row: &PgRow) -> StoreResult<Student> {
    Ok(Student {
        id: row.get("id"),
        name: row.get("name"),
        medals: MedalBands {
            gold: serde_json::from_value(row.get("gold"))?,
            silver: serde_json::from_value(row.get("silver"))?,
            bronze: serde_json::from_value(row.get("bronze"))?,
            top10: serde_json::from_value(row.get("top10"))?,
        },
    })
}

async fn fetch_tournament<'e>(
    exec: impl PgExecutor<'e>,
    id: TournamentId,
) -> StoreResult<Option<Tournament>> {
    let row = sqlx::query(
        "SELECT id, participants, rounds, advanced_rounds, status, created_at
         FROM tournaments WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(exec)
    .await?;

    row.as_ref().map(tournament_from_row).transpose()
}

async fn upsert_tournament<'e>(
    exec: impl PgExecutor<'e>,
    tournament: &Tournament,
) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO tournaments (id, participants, rounds, advanced_rounds, status, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (id) DO UPDATE SET
            participants = EXCLUDED.participants,
            rounds = EXCLUDED.rounds,
            advanced_rounds = EXCLUDED.advanced_rounds,
            status = EXCLUDED.status
        "#,
    )
    .bind(tournament.id)
    .bind(serde_json::to_value(&tournament.participants)?)
    .bind(serde_json::to_value(&tournament.rounds)?)
    .bind(serde_json::to_value(&tournament.advanced_rounds)?)
    .bind(tournament_status_str(tournament.status))
    .bind(tournament.created_at.naive_utc())
    .execute(exec)
    .await?;

    Ok(())
}

async fn fetch_match<'e>(exec: impl PgExecutor<'e>, id: MatchId) -> StoreResult<Option<Match>> {
    let row = sqlx::query(
        "SELECT id, tournament_id, task, round, slot_a, slot_b, winner, loser, status, schedule_at
         FROM matches WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(exec)
    .await?;

    Ok(row.as_ref().map(match_from_row))
}

async fn fetch_tournament_matches<'e>(
    exec: impl PgExecutor<'e>,
    tournament_id: TournamentId,
) -> StoreResult<Vec<Match>> {
    let rows = sqlx::query(
        "SELECT id, tournament_id, task, round, slot_a, slot_b, winner, loser, status, schedule_at
         FROM matches WHERE tournament_id = $1
         ORDER BY seq",
    )
    .bind(tournament_id)
    .fetch_all(exec)
    .await?;

    Ok(rows.iter().map(match_from_row).collect())
}

async fn fetch_round_matches<'e>(
    exec: impl PgExecutor<'e>,
    tournament_id: TournamentId,
    round: &str,
) -> StoreResult<Vec<Match>> {
    let rows = sqlx::query(
        "SELECT id, tournament_id, task, round, slot_a, slot_b, winner, loser, status, schedule_at
         FROM matches WHERE tournament_id = $1 AND round = $2
         ORDER BY seq",
    )
    .bind(tournament_id)
    .bind(round)
    .fetch_all(exec)
    .await?;

    Ok(rows.iter().map(match_from_row).collect())
}

async fn fetch_class_type<'e>(
    exec: impl PgExecutor<'e>,
    id: ClassTypeId,
) -> StoreResult<Option<ClassType>> {
    let row = sqlx::query(
        "SELECT id, olympiad_id, name, medalists, gold, silver, bronze, top10
         FROM class_types WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(exec)
    .await?;

    row.as_ref().map(class_type_from_row).transpose()
}

async fn fetch_scored_answers<'e>(
    exec: impl PgExecutor<'e>,
    class_type_id: ClassTypeId,
) -> StoreResult<Vec<StudentAnswer>> {
    let rows = sqlx::query(
        "SELECT id, class_type_id, student_id, total_score
         FROM student_answers
         WHERE class_type_id = $1 AND total_score > 0
         ORDER BY total_score DESC, seq",
    )
    .bind(class_type_id)
    .fetch_all(exec)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| StudentAnswer {
            id: row.get("id"),
            class_type_id: row.get("class_type_id"),
            student_id: row.get("student_id"),
            total_score: row.get("total_score"),
        })
        .collect())
}

async fn fetch_student<'e>(
    exec: impl PgExecutor<'e>,
    id: StudentId,
) -> StoreResult<Option<Student>> {
    let row = sqlx::query("SELECT id, name, gold, silver, bronze, top10 FROM students WHERE id = $1")
        .bind(id)
        .fetch_optional(exec)
        .await?;

    row.as_ref().map(student_from_row).transpose()
}

#[async_trait]
impl OlympiadStore for PgStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreSession>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;
        Ok(Box::new(PgSession { tx }))
    }

    async fn get_tournament(&self, id: TournamentId) -> StoreResult<Option<Tournament>> {
        fetch_tournament(&self.pool, id).await
    }

    async fn get_match(&self, id: MatchId) -> StoreResult<Option<Match>> {
        fetch_match(&self.pool, id).await
    }

    async fn list_tournament_matches(&self, id: TournamentId) -> StoreResult<Vec<Match>> {
        fetch_tournament_matches(&self.pool, id).await
    }

    async fn get_olympiad(&self, id: OlympiadId) -> StoreResult<Option<Olympiad>> {
        let row = sqlx::query("SELECT id, name, class_types FROM olympiads WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            Ok(Olympiad {
                id: row.get("id"),
                name: row.get("name"),
                class_types: serde_json::from_value(row.get("class_types"))?,
            })
        })
        .transpose()
    }

    async fn get_class_type(&self, id: ClassTypeId) -> StoreResult<Option<ClassType>> {
        fetch_class_type(&self.pool, id).await
    }

    async fn list_scored_answers(
        &self,
        class_type_id: ClassTypeId,
    ) -> StoreResult<Vec<StudentAnswer>> {
        fetch_scored_answers(&self.pool, class_type_id).await
    }

    async fn get_student(&self, id: StudentId) -> StoreResult<Option<Student>> {
        fetch_student(&self.pool, id).await
    }
}

/// One sqlx transaction wrapped as a store session
struct PgSession {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreSession for PgSession {
    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }

    async fn get_tournament(&mut self, id: TournamentId) -> StoreResult<Option<Tournament>> {
        fetch_tournament(&mut *self.tx, id).await
    }

    async fn insert_tournament(&mut self, tournament: &Tournament) -> StoreResult<()> {
        upsert_tournament(&mut *self.tx, tournament).await
    }

    async fn update_tournament(&mut self, tournament: &Tournament) -> StoreResult<()> {
        upsert_tournament(&mut *self.tx, tournament).await
    }

    async fn claim_round_advance(
        &mut self,
        tournament_id: TournamentId,
        round: &str,
    ) -> StoreResult<bool> {
        // Append-if-absent; exactly one concurrent transaction sees a row
        // update here, the rest conflict or observe the claimed label.
        let result = sqlx::query(
            "UPDATE tournaments
             SET advanced_rounds = advanced_rounds || to_jsonb($2::text)
             WHERE id = $1 AND NOT advanced_rounds @> to_jsonb($2::text)",
        )
        .bind(tournament_id)
        .bind(round)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn get_match(&mut self, id: MatchId) -> StoreResult<Option<Match>> {
        fetch_match(&mut *self.tx, id).await
    }

    async fn insert_match(&mut self, m: &Match) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO matches (id, tournament_id, task, round, slot_a, slot_b, winner, loser, status, schedule_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(m.id)
        .bind(m.tournament_id)
        .bind(m.task)
        .bind(&m.round)
        .bind(m.slot_a)
        .bind(m.slot_b)
        .bind(m.winner)
        .bind(m.loser)
        .bind(match_status_str(m.status))
        .bind(m.schedule_at.map(|dt| dt.naive_utc()))
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn update_match(&mut self, m: &Match) -> StoreResult<()> {
        sqlx::query(
            "UPDATE matches
             SET winner = $1, loser = $2, status = $3, schedule_at = $4
             WHERE id = $5",
        )
        .bind(m.winner)
        .bind(m.loser)
        .bind(match_status_str(m.status))
        .bind(m.schedule_at.map(|dt| dt.naive_utc()))
        .bind(m.id)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn list_round_matches(
        &mut self,
        tournament_id: TournamentId,
        round: &str,
    ) -> StoreResult<Vec<Match>> {
        fetch_round_matches(&mut *self.tx, tournament_id, round).await
    }

    async fn get_class_type(&mut self, id: ClassTypeId) -> StoreResult<Option<ClassType>> {
        fetch_class_type(&mut *self.tx, id).await
    }

    async fn update_class_type(&mut self, class_type: &ClassType) -> StoreResult<()> {
        sqlx::query(
            "UPDATE class_types
             SET medalists = $1, gold = $2, silver = $3, bronze = $4, top10 = $5
             WHERE id = $6",
        )
        .bind(class_type.medalists as i32)
        .bind(serde_json::to_value(&class_type.bands.gold)?)
        .bind(serde_json::to_value(&class_type.bands.silver)?)
        .bind(serde_json::to_value(&class_type.bands.bronze)?)
        .bind(serde_json::to_value(&class_type.bands.top10)?)
        .bind(class_type.id)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn list_scored_answers(
        &mut self,
        class_type_id: ClassTypeId,
    ) -> StoreResult<Vec<StudentAnswer>> {
        fetch_scored_answers(&mut *self.tx, class_type_id).await
    }

    async fn get_student(&mut self, id: StudentId) -> StoreResult<Option<Student>> {
        fetch_student(&mut *self.tx, id).await
    }

    async fn update_student(&mut self, student: &Student) -> StoreResult<()> {
        sqlx::query(
            "UPDATE students
             SET gold = $1, silver = $2, bronze = $3, top10 = $4
             WHERE id = $5",
        )
        .bind(serde_json::to_value(&student.medals.gold)?)
        .bind(serde_json::to_value(&student.medals.silver)?)
        .bind(serde_json::to_value(&student.medals.bronze)?)
        .bind(serde_json::to_value(&student.medals.top10)?)
        .bind(student.id)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }
}
