//! Maps the backend's available day onto the 33 calendar entries.
//!
//! The backend owns `available_day`; nothing here ever advances it. The
//! resolver only decides which days are selectable or completed and whether
//! an unlock countdown is running.

use crate::errors::ClientError;
use crate::models::{DAY_COUNT, DashboardData, DayProgress, is_valid_day};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct AvailabilityInput<'a> {
    pub start_day: u8,
    pub available_day: u8,
    pub progress: &'a [DayProgress],
    pub now: DateTime<Utc>,
    pub next_unlock_at: Option<DateTime<Utc>>,
    pub libre_mode: bool,
}

impl<'a> AvailabilityInput<'a> {
    pub fn from_dashboard(data: &'a DashboardData, now: DateTime<Utc>) -> Self {
        Self {
            start_day: data.user.start_day,
            available_day: data.available_day,
            progress: &data.progress,
            now,
            next_unlock_at: data.next_available_time,
            libre_mode: data.user.libre_mode,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayState {
    pub day: u8,
    pub is_available: bool,
    pub is_completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub available_day: u8,
    pub day_states: Vec<DayState>,
    pub countdown: Option<Duration>,
    /// The unlock instant has passed; the caller should refetch the dashboard.
    pub refresh_requested: bool,
}

pub fn resolve(input: &AvailabilityInput<'_>) -> Result<Resolution, ClientError> {
    let available_day = input.available_day;
    if !is_valid_day(available_day) {
        return Err(ClientError::DataInconsistency { day: available_day });
    }

    let current = input
        .progress
        .iter()
        .find(|entry| entry.day == available_day)
        .ok_or(ClientError::DataInconsistency { day: available_day })?;

    let day_states = (1..=DAY_COUNT)
        .map(|day| DayState {
            day,
            is_available: is_available(day, available_day, input.start_day),
            is_completed: input
                .progress
                .iter()
                .find(|entry| entry.day == day)
                .is_some_and(|entry| entry.flags().is_complete()),
        })
        .collect();

    let gated = current.flags().is_complete() && !input.libre_mode;
    let (countdown, refresh_requested) = match input.next_unlock_at {
        Some(unlock_at) if gated && unlock_at > input.now => (Some(unlock_at - input.now), false),
        Some(_) if gated => (None, true),
        _ => (None, false),
    };

    Ok(Resolution {
        available_day,
        day_states,
        countdown,
        refresh_requested,
    })
}

// Days before a non-1 start day belong to the wrapped part of the cycle.
fn is_available(day: u8, available_day: u8, start_day: u8) -> bool {
    day <= available_day || (start_day > 1 && day < start_day)
}
