use parking_lot::Mutex;
use tracing::{info, warn};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub kind: NoticeKind,
}

/// Fire-and-forget sink for human-readable outcomes.
///
/// `notify` cannot fail, so reporting can never undo a committed mutation.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str, kind: NoticeKind);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, message: &str, kind: NoticeKind) {
        match kind {
            NoticeKind::Info => info!(target: "dealroom::notice", "{message}"),
            NoticeKind::Error => warn!(target: "dealroom::notice", "{message}"),
        }
    }
}

/// Keeps notices in memory until drained.
#[derive(Debug, Default)]
pub struct NoticeBuffer {
    notices: Mutex<Vec<Notice>>,
}

impl NoticeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.notices.lock())
    }

    pub fn snapshot(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    pub fn last(&self) -> Option<Notice> {
        self.notices.lock().last().cloned()
    }
}

impl Notifier for NoticeBuffer {
    fn notify(&self, message: &str, kind: NoticeKind) {
        self.notices.lock().push(Notice {
            message: message.to_string(),
            kind,
        });
    }
}
