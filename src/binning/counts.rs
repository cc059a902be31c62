// Per-bucket event counts (comment volume per lap)

use super::assign::LapAssignment;
use super::bucket::LapBucket;
use crate::laps::LapTable;
use serde::Serialize;
use std::collections::HashMap;

/// Number of events in one bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BucketCount {
    pub bucket: LapBucket,
    pub count: usize,
}

/// Count assignments per bucket
///
/// Every bucket of `table` is reported in boundary order, including empty
/// ones, so lap series line up across races.
pub fn count_by_bucket(assignments: &[LapAssignment], table: &LapTable) -> Vec<BucketCount> {
    let mut counts: HashMap<LapBucket, usize> = HashMap::new();
    for assignment in assignments {
        *counts.entry(assignment.bucket).or_insert(0) += 1;
    }

    std::iter::once(LapBucket::BeforeRace)
        .chain(table.iter().map(|lap| LapBucket::Lap(lap.lap_number)))
        .chain(std::iter::once(LapBucket::AfterRace))
        .map(|bucket| BucketCount {
            bucket,
            count: counts.get(&bucket).copied().unwrap_or(0),
        })
        .collect()
}
