use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DAY_COUNT: u8 = 33;

pub fn is_valid_day(day: u8) -> bool {
    (1..=DAY_COUNT).contains(&day)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskName {
    Meditation,
    Video,
    Rosary,
}

impl TaskName {
    pub const ALL: [TaskName; 3] = [TaskName::Meditation, TaskName::Video, TaskName::Rosary];

    pub fn label(self) -> &'static str {
        match self {
            TaskName::Meditation => "meditation",
            TaskName::Video => "video",
            TaskName::Rosary => "rosary",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaskFlags {
    pub meditation: bool,
    pub video: bool,
    pub rosary: bool,
}

impl TaskFlags {
    pub fn get(&self, task: TaskName) -> bool {
        match task {
            TaskName::Meditation => self.meditation,
            TaskName::Video => self.video,
            TaskName::Rosary => self.rosary,
        }
    }

    pub fn with(mut self, task: TaskName, value: bool) -> Self {
        match task {
            TaskName::Meditation => self.meditation = value,
            TaskName::Video => self.video = value,
            TaskName::Rosary => self.rosary = value,
        }
        self
    }

    pub fn completed_count(&self) -> u8 {
        TaskName::ALL.iter().filter(|task| self.get(**task)).count() as u8
    }

    pub fn is_complete(&self) -> bool {
        self.completed_count() == 3
    }
}

/// One entry of the per-user progress list returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayProgress {
    pub day: u8,
    pub meditation_completed: bool,
    pub video_completed: bool,
    pub rosary_completed: bool,
    #[serde(default)]
    pub total_completed: u8,
}

impl DayProgress {
    pub fn new(day: u8, flags: TaskFlags) -> Self {
        Self {
            day,
            meditation_completed: flags.meditation,
            video_completed: flags.video,
            rosary_completed: flags.rosary,
            total_completed: flags.completed_count(),
        }
    }

    pub fn flags(&self) -> TaskFlags {
        TaskFlags {
            meditation: self.meditation_completed,
            video: self.video_completed,
            rosary: self.rosary_completed,
        }
    }
}

/// Body of `POST /users/progress`: always carries all three flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub day: u8,
    pub meditation_completed: bool,
    pub video_completed: bool,
    pub rosary_completed: bool,
}

impl ProgressUpdate {
    pub fn new(day: u8, flags: TaskFlags) -> Self {
        Self {
            day,
            meditation_completed: flags.meditation,
            video_completed: flags.video,
            rosary_completed: flags.rosary,
        }
    }

    pub fn flags(&self) -> TaskFlags {
        TaskFlags {
            meditation: self.meditation_completed,
            video: self.video_completed,
            rosary: self.rosary_completed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    pub day: u8,
    pub meditation_completed: bool,
    pub video_completed: bool,
    pub rosary_completed: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub current_day: u8,
    #[serde(default = "default_start_day")]
    pub start_day: u8,
    #[serde(default)]
    pub has_chosen_start_day: bool,
    #[serde(default)]
    pub libre_mode: bool,
    #[serde(default)]
    pub is_active: bool,
}

fn default_start_day() -> u8 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub user: UserResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardData {
    pub user: UserResponse,
    pub available_day: u8,
    #[serde(default)]
    pub progress: Vec<DayProgress>,
    #[serde(default)]
    pub daily_content: serde_json::Value,
    #[serde(default)]
    pub next_available_time: Option<DateTime<Utc>>,
}

impl DashboardData {
    pub fn day(&self, day: u8) -> Option<&DayProgress> {
        self.progress.iter().find(|entry| entry.day == day)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteAccountResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub deleted: bool,
}

// Requests accepted by the local front end.

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub day: u8,
    pub task: TaskName,
    pub completed: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToggleResponse {
    pub outcome: String,
    pub pending: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LibreModeRequest {
    pub libre_mode: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartDayRequest {
    pub start_day: u8,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteAccountRequest {
    pub confirmation: String,
}
