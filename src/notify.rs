use crate::models::TaskName;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::time::Instant;

const BOARD_CAPACITY: usize = 20;
pub const NOTICE_TTL: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Saved { day: u8, task: TaskName, completed: bool },
    DayCompleted { day: u8 },
    RateLimited { message: String },
    SaveFailed { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Success,
    Error,
}

impl Notice {
    pub fn kind(&self) -> NoticeKind {
        match self {
            Notice::Saved { .. } | Notice::DayCompleted { .. } => NoticeKind::Success,
            Notice::RateLimited { .. } | Notice::SaveFailed { .. } => NoticeKind::Error,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Notice::Saved { day, task, completed: true } => {
                format!("Day {day}: {} marked as done", task.label())
            }
            Notice::Saved { day, task, completed: false } => {
                format!("Day {day}: {} marked as pending", task.label())
            }
            Notice::DayCompleted { day } => format!("Day {day} completed!"),
            Notice::RateLimited { message } | Notice::SaveFailed { message } => message.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NoticeView {
    pub kind: NoticeKind,
    pub message: String,
}

/// Recent notices shown by the front end; entries fade after [`NOTICE_TTL`].
#[derive(Clone, Default)]
pub struct NoticeBoard {
    entries: Arc<Mutex<VecDeque<(Instant, Notice)>>>,
}

impl NoticeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(&self, notice: Notice) {
        let mut entries = self.entries.lock().await;
        if entries.len() == BOARD_CAPACITY {
            entries.pop_front();
        }
        entries.push_back((Instant::now(), notice));
    }

    /// Returns the notices still visible and forgets the rest.
    pub async fn visible(&self) -> Vec<NoticeView> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        entries.retain(|(at, _)| now.duration_since(*at) < NOTICE_TTL);
        entries
            .iter()
            .map(|(_, notice)| NoticeView {
                kind: notice.kind(),
                message: notice.message(),
            })
            .collect()
    }

    /// Drains a coalescer notice channel into the board until it closes.
    pub fn collect(&self, mut rx: mpsc::UnboundedReceiver<Notice>) {
        let board = self.clone();
        tokio::spawn(async move {
            while let Some(notice) = rx.recv().await {
                board.push(notice).await;
            }
        });
    }
}
