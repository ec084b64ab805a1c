use std::str::FromStr;

use chrono::{Duration, NaiveDate};
use serde::Serialize;

/// Points needed per level grow quadratically: level n starts at 50·(n-1)².
pub const LEVEL_BASE_POINTS: i64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    EvaluationCompleted,
    StudySession,
    MaterialAdded,
    GroupJoined,
    EventCreated,
    /// At most once per UTC day, see the `daily_login_once` migration
    DailyLogin,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::EvaluationCompleted,
        Action::StudySession,
        Action::MaterialAdded,
        Action::GroupJoined,
        Action::EventCreated,
        Action::DailyLogin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::EvaluationCompleted => "evaluation_completed",
            Action::StudySession => "study_session",
            Action::MaterialAdded => "material_added",
            Action::GroupJoined => "group_joined",
            Action::EventCreated => "event_created",
            Action::DailyLogin => "daily_login",
        }
    }

    pub fn points(&self) -> i32 {
        match self {
            Action::EvaluationCompleted => 10,
            Action::StudySession => 5,
            Action::MaterialAdded => 2,
            Action::GroupJoined => 3,
            Action::EventCreated => 1,
            Action::DailyLogin => 1,
        }
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = Action::ALL.iter().map(Action::as_str).collect();
                format!("unknown action '{}', expected one of: {}", s, known.join(", "))
            })
    }
}

pub fn level_for(points: i64) -> u32 {
    if points <= 0 {
        return 1;
    }
    ((points as f64 / LEVEL_BASE_POINTS as f64).sqrt().floor() as u32) + 1
}

/// Total points at which `level` begins
pub fn level_threshold(level: u32) -> i64 {
    let n = level.saturating_sub(1) as i64;
    LEVEL_BASE_POINTS * n * n
}

/// Consecutive days with activity, counting back from today (or from
/// yesterday when nothing happened yet today). `days` may be unsorted and
/// contain duplicates.
pub fn streak(days: &[NaiveDate], today: NaiveDate) -> u32 {
    let mut days: Vec<NaiveDate> = days.iter().copied().filter(|d| *d <= today).collect();
    days.sort_unstable_by(|a, b| b.cmp(a));
    days.dedup();

    let mut expected = match days.first() {
        Some(first) if *first == today => today,
        Some(first) if *first == today - Duration::days(1) => *first,
        _ => return 0,
    };

    let mut count = 0;
    for day in days {
        if day != expected {
            break;
        }
        count += 1;
        expected -= Duration::days(1);
    }
    count
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Progress {
    pub total_points: i64,
    pub level: u32,
    pub level_starts_at: i64,
    pub next_level_at: i64,
    pub points_to_next_level: i64,
}

pub fn progress(total_points: i64) -> Progress {
    let level = level_for(total_points);
    let next_level_at = level_threshold(level + 1);
    Progress {
        total_points,
        level,
        level_starts_at: level_threshold(level),
        next_level_at,
        points_to_next_level: next_level_at - total_points.max(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn parses_known_actions() {
        assert_eq!("daily_login".parse::<Action>(), Ok(Action::DailyLogin));
        assert_eq!("study_session".parse::<Action>().unwrap().points(), 5);
        let err = "cheating".parse::<Action>().unwrap_err();
        assert!(err.contains("unknown action 'cheating'"));
        assert!(err.contains("evaluation_completed"));
    }

    #[test]
    fn levels_follow_quadratic_thresholds() {
        assert_eq!(level_for(0), 1);
        assert_eq!(level_for(49), 1);
        assert_eq!(level_for(50), 2);
        assert_eq!(level_for(199), 2);
        assert_eq!(level_for(200), 3);
        assert_eq!(level_threshold(1), 0);
        assert_eq!(level_threshold(3), 200);

        let p = progress(120);
        assert_eq!(p.level, 2);
        assert_eq!(p.level_starts_at, 50);
        assert_eq!(p.next_level_at, 200);
        assert_eq!(p.points_to_next_level, 80);
    }

    #[test]
    fn streak_counts_back_from_today() {
        let today = day("2025-03-10");
        let days = [day("2025-03-10"), day("2025-03-09"), day("2025-03-09"), day("2025-03-08"), day("2025-03-05")];
        assert_eq!(streak(&days, today), 3);
    }

    #[test]
    fn streak_survives_until_end_of_today() {
        let today = day("2025-03-10");
        assert_eq!(streak(&[day("2025-03-09"), day("2025-03-08")], today), 2);
        assert_eq!(streak(&[day("2025-03-07")], today), 0);
        assert_eq!(streak(&[], today), 0);
    }
}
