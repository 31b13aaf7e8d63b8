//! User-facing notices queued by the session and drained by the UI.

use std::collections::VecDeque;
use std::fmt;

use serde::Serialize;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// FIFO of pending notices.
#[derive(Debug, Default)]
pub struct NoticeQueue {
    pending: VecDeque<Notice>,
}

impl NoticeQueue {
    pub fn push(&mut self, level: NoticeLevel, message: impl Into<String>) {
        let notice = Notice::new(level, message);
        tracing::debug!(level = ?notice.level, message = %notice.message, "Notice queued");
        self.pending.push_back(notice);
    }

    /// Remove and return everything queued so far, oldest first.
    pub fn drain(&mut self) -> Vec<Notice> {
        self.pending.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_is_fifo_and_empties() {
        let mut queue = NoticeQueue::default();
        queue.push(NoticeLevel::Info, "first");
        queue.push(NoticeLevel::Error, "second");
        assert_eq!(queue.len(), 2);

        let drained = queue.drain();
        assert_eq!(drained[0], Notice::new(NoticeLevel::Info, "first"));
        assert_eq!(drained[1].level, NoticeLevel::Error);
        assert!(queue.is_empty());
    }
}
