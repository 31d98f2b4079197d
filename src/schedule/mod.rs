// src/schedule/mod.rs
// The companion's simulated daily routine, used to flavor responses.

use chrono::{Datelike, Local, Timelike, Weekday};

// (start hour inclusive, end hour exclusive, activity)
type DaySchedule = &'static [(u32, u32, &'static str)];

const WEEKDAY_SCHEDULE: DaySchedule = &[
    (6, 8, "out on a morning run along the waterfront"),
    (8, 9, "having breakfast and reading ML papers"),
    (9, 12, "deep in model-training work at the office"),
    (12, 13, "grabbing lunch with coworkers"),
    (13, 17, "in technical meetings and pair-programming sessions"),
    (17, 19, "commuting home and decompressing with a podcast"),
    (19, 22, "cooking dinner and tinkering with a side project"),
];

const SATURDAY_SCHEDULE: DaySchedule = &[
    (8, 10, "having a slow breakfast and catching up on reading"),
    (10, 13, "wandering through a modern art exhibition"),
    (13, 15, "having lunch at the farmers market"),
    (15, 19, "working on a personal coding project at a cafe"),
    (19, 23, "out with friends for dinner"),
];

const SUNDAY_SCHEDULE: DaySchedule = &[
    (8, 11, "on a long hike outside the city"),
    (11, 14, "meal-prepping for the week"),
    (14, 18, "reading about astrobiology on the couch"),
    (18, 22, "planning the week ahead and winding down"),
];

/// The activity for a given weekday and hour; a resting default outside
/// scheduled hours.
pub fn activity_at(weekday: Weekday, hour: u32) -> &'static str {
    let schedule = match weekday {
        Weekday::Sat => SATURDAY_SCHEDULE,
        Weekday::Sun => SUNDAY_SCHEDULE,
        _ => WEEKDAY_SCHEDULE,
    };
    schedule
        .iter()
        .find(|(start, end, _)| hour >= *start && hour < *end)
        .map(|(_, _, activity)| *activity)
        .unwrap_or("sleeping")
}

/// The activity right now, by local wall clock.
pub fn current_activity() -> String {
    let now = Local::now();
    activity_at(now.weekday(), now.hour()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekday_work_hours() {
        assert_eq!(
            activity_at(Weekday::Tue, 10),
            "deep in model-training work at the office"
        );
    }

    #[test]
    fn off_hours_default_to_sleeping() {
        assert_eq!(activity_at(Weekday::Mon, 3), "sleeping");
    }

    #[test]
    fn every_hour_resolves() {
        for hour in 0..24 {
            assert!(!activity_at(Weekday::Sun, hour).is_empty());
        }
    }
}
