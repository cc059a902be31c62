// Lap windows for logged race incidents
//
// Incident logs record the lap an incident happened on, not a time. The
// window is looked up by lap number; incidents on unknown laps get none.

use super::interval::LapTable;
use chrono::{DateTime, FixedOffset};

/// Start and end of the lap an incident belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LapWindow {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

/// Look up the lap window for each incident's lap number (left join)
pub fn attach_windows(lap_numbers: &[Option<u32>], table: &LapTable) -> Vec<Option<LapWindow>> {
    lap_numbers
        .iter()
        .map(|lap| {
            lap.and_then(|n| table.get(n)).map(|interval| LapWindow {
                start: interval.start_time,
                end: interval.end_time,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::laps::LapInterval;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(9 * 3600)
            .unwrap()
            .timestamp_opt(1_709_391_600 + secs, 0)
            .unwrap()
    }

    #[test]
    fn test_attach_windows_left_join() {
        let table = LapTable::new(vec![
            LapInterval::new(1, at(0), at(90)),
            LapInterval::new(2, at(90), at(180)),
        ])
        .unwrap();

        let windows = attach_windows(&[Some(2), None, Some(57), Some(1)], &table);
        assert_eq!(
            windows[0],
            Some(LapWindow {
                start: at(90),
                end: at(180)
            })
        );
        assert_eq!(windows[1], None);
        assert_eq!(windows[2], None);
        assert_eq!(windows[3].unwrap().start, at(0));
    }
}
