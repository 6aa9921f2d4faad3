use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::Vote;

pub const MS_PER_HOUR: i64 = 60 * 60 * 1000;
pub const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct TimeLeft {
    pub days: i64,
    pub hours: i64,
}

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct Results {
    pub yes: usize,
    pub no: usize,
    pub deadline: TimeLeft,
    pub over: bool,
}

pub fn tally(vote: &Vote, now: DateTime<Utc>) -> Results {
    let yes = vote.votes.iter().filter(|ballot| ballot.vote).count();
    let no = vote.votes.len() - yes;

    // Whole milliseconds on both sides before subtracting, as `Date` arithmetic does.
    let remaining = vote.deadline.timestamp_millis() - now.timestamp_millis();

    Results {
        yes,
        no,
        deadline: time_left(remaining),
        over: remaining <= 0,
    }
}

/// Both fields floor toward negative infinity. `hours` is then reduced with `%`,
/// which keeps the sign of the dividend, so an hour past the deadline is `-1d -1h`.
pub fn time_left(remaining_ms: i64) -> TimeLeft {
    TimeLeft {
        days: remaining_ms.div_euclid(MS_PER_DAY),
        hours: remaining_ms.div_euclid(MS_PER_HOUR) % 24,
    }
}
