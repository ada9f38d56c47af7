//! PiPoints allocation for finished tournaments.
//!
//! A pure placement-to-points calculation: the percentage of the total pot
//! awarded to each place is looked up in an ordered band table keyed by
//! participant count. Awards are floored to whole points and never
//! renormalized, so under-distribution from flooring (and from the flat
//! fallback) is an accepted, exactly-reproducible property.

use serde::{Deserialize, Serialize};

use crate::bracket::ParticipantId;

/// One participant's point award
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PiPointsAward {
    /// Awarded participant
    pub participant_id: ParticipantId,
    /// 1-based final placement
    pub place: usize,
    /// Whole points awarded
    pub points: i64,
}

/// A percentage row matched by participant count
struct PercentageBand {
    min_count: usize,
    max_count: usize,
    /// Percentages for places 1..=len; later places award nothing
    percentages: &'static [f64],
}

/// Flat percentage for participant counts matching no band (3, 6, 7)
const FLAT_FALLBACK_PCT: f64 = 5.0;

const BANDS: &[PercentageBand] = &[
    PercentageBand {
        min_count: 8,
        max_count: usize::MAX,
        percentages: &[35.0, 20.0, 15.0, 15.0, 7.5, 7.5, 7.5, 7.5],
    },
    PercentageBand {
        min_count: 5,
        max_count: 5,
        percentages: &[35.0, 20.0, 15.0, 15.0, 7.5],
    },
    PercentageBand {
        min_count: 4,
        max_count: 4,
        percentages: &[35.0, 20.0, 15.0, 15.0],
    },
    PercentageBand {
        min_count: 2,
        max_count: 2,
        percentages: &[35.0, 20.0],
    },
    PercentageBand {
        min_count: 1,
        max_count: 1,
        percentages: &[35.0],
    },
];

/// Turn an ordered placement list into point awards.
///
/// `participants` is ordered best place first. Each place receives
/// `floor(total_points * percentage / 100)`. In the eight-or-more band only
/// the first eight places have a defined percentage; places beyond it are
/// guarded and award zero points.
pub fn allocate(participants: &[ParticipantId], total_points: i64) -> Vec<PiPointsAward> {
    let band = BANDS
        .iter()
        .find(|b| (b.min_count..=b.max_count).contains(&participants.len()));

    participants
        .iter()
        .enumerate()
        .map(|(i, participant_id)| {
            let percentage = match band {
                Some(b) => b.percentages.get(i).copied().unwrap_or(0.0),
                None => FLAT_FALLBACK_PCT,
            };
            PiPointsAward {
                participant_id: *participant_id,
                place: i + 1,
                points: (total_points as f64 * percentage / 100.0).floor() as i64,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn ids(n: usize) -> Vec<ParticipantId> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    fn points(participants: &[ParticipantId], total: i64) -> Vec<i64> {
        allocate(participants, total).iter().map(|a| a.points).collect()
    }

    #[test]
    fn test_two_participants() {
        let p = ids(2);
        assert_eq!(points(&p, 1000), vec![350, 200]);
    }

    #[test]
    fn test_flat_fallback_for_three() {
        let p = ids(3);
        assert_eq!(points(&p, 1000), vec![50, 50, 50]);
    }

    #[test]
    fn test_flat_fallback_for_six_and_seven() {
        assert_eq!(points(&ids(6), 200), vec![10; 6]);
        assert_eq!(points(&ids(7), 200), vec![10; 7]);
    }

    #[test]
    fn test_four_and_five_participants() {
        assert_eq!(points(&ids(4), 1000), vec![350, 200, 150, 150]);
        assert_eq!(points(&ids(5), 1000), vec![350, 200, 150, 150, 75]);
    }

    #[test]
    fn test_single_participant() {
        assert_eq!(points(&ids(1), 1000), vec![350]);
    }

    #[test]
    fn test_eight_participants() {
        assert_eq!(
            points(&ids(8), 1000),
            vec![350, 200, 150, 150, 75, 75, 75, 75]
        );
    }

    #[test]
    fn test_places_beyond_table_award_zero() {
        let awards = allocate(&ids(10), 1000);
        assert_eq!(awards[7].points, 75);
        assert_eq!(awards[8].points, 0);
        assert_eq!(awards[9].points, 0);
        assert_eq!(awards[9].place, 10);
    }

    #[test]
    fn test_flooring_is_not_renormalized() {
        // 7.5% of 1001 = 75.075, floored
        let awards = allocate(&ids(8), 1001);
        assert_eq!(awards[4].points, 75);
        // The flat fallback under-distributes and stays that way
        let distributed: i64 = allocate(&ids(3), 1000).iter().map(|a| a.points).sum();
        assert_eq!(distributed, 150);
    }

    #[test]
    fn test_exact_percentage_multiples_keep_full_share() {
        // 663800 * 35 / 100 divides exactly; the floor must not lose a point
        let awards = allocate(&ids(8), 663_800);
        assert_eq!(awards[0].points, 232_330);
        assert_eq!(awards[1].points, 132_760);
    }

    #[test]
    fn test_places_are_one_based_and_ordered() {
        let p = ids(5);
        let awards = allocate(&p, 100);
        for (i, award) in awards.iter().enumerate() {
            assert_eq!(award.place, i + 1);
            assert_eq!(award.participant_id, p[i]);
        }
    }
}
