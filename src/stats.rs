use crate::models::{DAY_COUNT, DayProgress, TaskName};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressSummary {
    pub completed_days: u8,
    pub meditations: u8,
    pub videos: u8,
    pub rosaries: u8,
    pub percentage: u8,
    pub days_remaining: u8,
}

pub fn summarize(progress: &[DayProgress]) -> ProgressSummary {
    let mut completed_days = 0u8;
    let mut totals = [0u8; 3];

    for entry in progress.iter().filter(|entry| (1..=DAY_COUNT).contains(&entry.day)) {
        let flags = entry.flags();
        for (slot, task) in totals.iter_mut().zip(TaskName::ALL) {
            if flags.get(task) {
                *slot += 1;
            }
        }
        if flags.is_complete() {
            completed_days += 1;
        }
    }

    let done: u32 = totals.iter().map(|count| u32::from(*count)).sum();
    let max = u32::from(DAY_COUNT) * 3;
    let percentage = ((f64::from(done) / f64::from(max)) * 100.0).round().min(100.0) as u8;

    ProgressSummary {
        completed_days,
        meditations: totals[0],
        videos: totals[1],
        rosaries: totals[2],
        percentage,
        days_remaining: DAY_COUNT.saturating_sub(completed_days),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskFlags;

    #[test]
    fn summary_counts_tasks_and_days() {
        let progress = vec![
            DayProgress::new(1, TaskFlags { meditation: true, video: true, rosary: true }),
            DayProgress::new(2, TaskFlags { meditation: true, video: false, rosary: false }),
            DayProgress::new(3, TaskFlags::default()),
        ];

        let summary = summarize(&progress);
        assert_eq!(summary.completed_days, 1);
        assert_eq!(summary.meditations, 2);
        assert_eq!(summary.videos, 1);
        assert_eq!(summary.rosaries, 1);
        assert_eq!(summary.percentage, 4);
        assert_eq!(summary.days_remaining, 32);
    }

    #[test]
    fn empty_progress_is_zero_percent() {
        let summary = summarize(&[]);
        assert_eq!(summary.percentage, 0);
        assert_eq!(summary.days_remaining, 33);
    }

    #[test]
    fn full_program_is_one_hundred_percent() {
        let complete = TaskFlags { meditation: true, video: true, rosary: true };
        let progress: Vec<_> = (1..=33).map(|day| DayProgress::new(day, complete)).collect();
        let summary = summarize(&progress);
        assert_eq!(summary.percentage, 100);
        assert_eq!(summary.completed_days, 33);
        assert_eq!(summary.days_remaining, 0);
    }
}
