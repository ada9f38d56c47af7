//! Ranking data models for olympiad medal distribution.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Olympiad ID type
pub type OlympiadId = Uuid;

/// Class type ID type (a scored competition cohort)
pub type ClassTypeId = Uuid;

/// Student ID type
pub type StudentId = Uuid;

/// Medal tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Medal {
    Gold,
    Silver,
    Bronze,
}

/// Medal-band membership lists, generic over the member id type.
///
/// A `ClassType` holds bands of student ids; a `Student` mirrors the same
/// shape with the class-type ids it medaled in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedalBands<T> {
    pub gold: Vec<T>,
    pub silver: Vec<T>,
    pub bronze: Vec<T>,
    pub top10: Vec<T>,
}

impl<T: PartialEq> MedalBands<T> {
    /// Remove every occurrence of `member` from all four bands
    pub fn remove(&mut self, member: &T) {
        self.gold.retain(|m| m != member);
        self.silver.retain(|m| m != member);
        self.bronze.retain(|m| m != member);
        self.top10.retain(|m| m != member);
    }

    /// Whether no band has any member
    pub fn is_empty(&self) -> bool {
        self.gold.is_empty()
            && self.silver.is_empty()
            && self.bronze.is_empty()
            && self.top10.is_empty()
    }
}

/// An olympiad document, owning its class types
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Olympiad {
    /// Olympiad ID
    pub id: OlympiadId,
    /// Display name
    pub name: String,
    /// Class types belonging to this olympiad
    pub class_types: Vec<ClassTypeId>,
}

/// A class-type document: one scored cohort with its medal configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassType {
    /// Class type ID
    pub id: ClassTypeId,
    /// Owning olympiad
    pub olympiad_id: OlympiadId,
    /// Display name (e.g. a grade-level track)
    pub name: String,
    /// Members per medal tier (a count, not a percentage)
    pub medalists: usize,
    /// Current medal-band membership
    pub bands: MedalBands<StudentId>,
}

/// A cohort score record: one student's total score within a class type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentAnswer {
    /// Record ID
    pub id: Uuid,
    /// Owning class type
    pub class_type_id: ClassTypeId,
    /// Scored student
    pub student_id: StudentId,
    /// Total score across all tasks
    pub total_score: f64,
}

/// A student document with mirrored per-class-type medal membership
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    /// Student ID
    pub id: StudentId,
    /// Display name
    pub name: String,
    /// Class types this student currently medals in, per band
    pub medals: MedalBands<ClassTypeId>,
}

impl Student {
    /// Create a student with no medal membership
    pub fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            medals: MedalBands::default(),
        }
    }
}

/// Options controlling a ranking recomputation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingOptions {
    /// Student writes per storage batch
    pub batch_size: usize,
    /// Run the clear-then-write sequence inside one atomic scope
    pub use_transactions: bool,
    /// Retry budget for transient storage failures
    pub retry_count: u32,
    /// Skip medal-configuration validation
    pub skip_validation: bool,
}

impl Default for RankingOptions {
    fn default() -> Self {
        Self {
            batch_size: 100,
            use_transactions: true,
            retry_count: 3,
            skip_validation: false,
        }
    }
}

/// One student's computed rank and medal assignment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankAssignment {
    /// Student ID
    pub student_id: StudentId,
    /// 1-based rank in score-descending order
    pub rank: usize,
    /// Medal tier, if within a medal band
    pub medal: Option<Medal>,
    /// Whether the student is in the top-10 band
    pub top10: bool,
    /// The score that produced this rank
    pub score: f64,
}

/// Result of recomputing one class type's medal bands
#[derive(Debug, Clone)]
pub struct ClassTypeRankingResult {
    /// Class type ID
    pub class_type_id: ClassTypeId,
    /// New band membership, as written
    pub bands: MedalBands<StudentId>,
    /// Per-student rank and medal assignments, score-descending
    pub assignments: Vec<RankAssignment>,
    /// Elapsed processing time
    pub elapsed: Duration,
}

impl ClassTypeRankingResult {
    /// Number of scored students processed
    pub fn student_count(&self) -> usize {
        self.assignments.len()
    }
}

/// A class type that failed during an olympiad-wide recomputation
#[derive(Debug, Clone)]
pub struct ClassTypeFailure {
    /// Class type ID
    pub class_type_id: ClassTypeId,
    /// Stable error code
    pub code: &'static str,
    /// Human-readable failure message
    pub message: String,
}

/// Aggregate result of recomputing every class type of an olympiad
#[derive(Debug, Clone)]
pub struct OlympiadRankingResult {
    /// Olympiad ID
    pub olympiad_id: OlympiadId,
    /// Per-class-type results, in processing order
    pub class_types: Vec<ClassTypeRankingResult>,
    /// Class types whose recomputation failed; committed class types are
    /// unaffected
    pub failed: Vec<ClassTypeFailure>,
    /// Total scored students across processed class types
    pub total_students: usize,
    /// Elapsed processing time
    pub elapsed: Duration,
}

/// Read-only ranking statistics for a class type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingStats {
    /// Class type ID
    pub class_type_id: ClassTypeId,
    /// Students with a positive score
    pub participant_count: usize,
    /// Current gold-band size
    pub gold_count: usize,
    /// Current silver-band size
    pub silver_count: usize,
    /// Current bronze-band size
    pub bronze_count: usize,
    /// Current top-10-band size
    pub top10_count: usize,
    /// Average positive score (0 when the cohort is empty)
    pub average_score: f64,
    /// Minimum positive score
    pub min_score: f64,
    /// Maximum positive score
    pub max_score: f64,
}

/// Slice a score-descending record list into medal bands.
///
/// Bands are positional: gold takes the first `medalists` records, silver
/// the next `medalists`, bronze the next; top10 takes the first
/// `min(10, total)`. All slices clamp to the available record count, so a
/// `medalists` value whose 3x exceeds the cohort simply saturates the later
/// bands.
pub fn compute_bands(ranked: &[StudentAnswer], medalists: usize) -> MedalBands<StudentId> {
    let total = ranked.len();
    let ids = |from: usize, to: usize| -> Vec<StudentId> {
        ranked[from.min(total)..to.min(total)]
            .iter()
            .map(|a| a.student_id)
            .collect()
    };

    MedalBands {
        gold: ids(0, medalists),
        silver: ids(medalists, medalists * 2),
        bronze: ids(medalists * 2, medalists * 3),
        top10: ids(0, 10),
    }
}
