use crate::model::Task;
use chrono::{DateTime, NaiveDate, TimeZone};

/// Where a task's due date falls relative to a reference day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DueStatus {
    None,
    Overdue,
    Today,
    Future,
}

impl DueStatus {
    /// Classifies `task` against the calendar day of `now` in `now`'s own
    /// time zone. Time of day never matters.
    pub fn classify<Tz: TimeZone>(task: &Task, now: &DateTime<Tz>) -> Self {
        Self::for_date(task.due_date, now.date_naive())
    }

    pub fn for_date(due: Option<NaiveDate>, today: NaiveDate) -> Self {
        match due {
            None => DueStatus::None,
            Some(due) if due < today => DueStatus::Overdue,
            Some(due) if due == today => DueStatus::Today,
            Some(_) => DueStatus::Future,
        }
    }

    /// Today or overdue; what focus mode keeps.
    pub fn is_urgent(self) -> bool {
        matches!(self, DueStatus::Overdue | DueStatus::Today)
    }

    pub fn label(self) -> &'static str {
        match self {
            DueStatus::None => "No due date",
            DueStatus::Overdue => "Overdue",
            DueStatus::Today => "Due today",
            DueStatus::Future => "Upcoming",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Priority, Task};
    use chrono::{FixedOffset, Utc};

    fn task_due(due: Option<NaiveDate>) -> Task {
        Task {
            id: "1".into(),
            title: "t".into(),
            description: String::new(),
            category: "Work".into(),
            priority: Priority::Medium,
            completed: false,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            due_date: due,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn no_due_date_is_none() {
        let now = Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap();
        assert_eq!(DueStatus::classify(&task_due(None), &now), DueStatus::None);
    }

    #[test]
    fn compares_calendar_days() {
        let now = Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap();
        let status = |d| DueStatus::classify(&task_due(Some(d)), &now);
        assert_eq!(status(date(2024, 1, 9)), DueStatus::Overdue);
        assert_eq!(status(date(2024, 1, 10)), DueStatus::Today);
        assert_eq!(status(date(2024, 1, 11)), DueStatus::Future);
        assert_eq!(status(date(2023, 12, 31)), DueStatus::Overdue);
    }

    #[test]
    fn due_today_is_never_overdue_late_in_the_day() {
        let task = task_due(Some(date(2024, 1, 10)));
        for (h, m, s) in [(0, 0, 0), (0, 0, 1), (13, 45, 0), (23, 59, 59)] {
            let now = Utc.with_ymd_and_hms(2024, 1, 10, h, m, s).unwrap();
            assert_eq!(DueStatus::classify(&task, &now), DueStatus::Today);
        }
    }

    #[test]
    fn reference_day_is_taken_in_its_own_zone() {
        let task = task_due(Some(date(2024, 1, 10)));
        // 2024-01-09 23:30 in UTC-05:00 is already the 10th in UTC.
        let eastern = FixedOffset::west_opt(5 * 3600).unwrap();
        let now = eastern.with_ymd_and_hms(2024, 1, 9, 23, 30, 0).unwrap();
        assert_eq!(DueStatus::classify(&task, &now), DueStatus::Future);
        assert_eq!(
            DueStatus::classify(&task, &now.with_timezone(&Utc)),
            DueStatus::Today
        );
    }

    #[test]
    fn urgency_and_labels() {
        assert!(DueStatus::Overdue.is_urgent());
        assert!(DueStatus::Today.is_urgent());
        assert!(!DueStatus::Future.is_urgent());
        assert!(!DueStatus::None.is_urgent());
        assert_eq!(DueStatus::Today.label(), "Due today");
        assert_eq!(DueStatus::Future.label(), "Upcoming");
    }
}
