//! Notification fan-out
//!
//! Reminders go to every configured sink on a blocking worker. A sink that
//! fails is logged and skipped; nothing here reports back to the scheduler.

mod desktop;
mod modal;

pub use desktop::DesktopNotifier;
pub use modal::ModalNotifier;

use std::sync::Arc;

use log::{debug, warn};
use tokio::task::JoinHandle;

use crate::error::NotifyError;
use crate::pipeline::Notification;

/// Something that can show a reminder to the user. Calls may block.
pub trait NotificationSink: Send + Sync {
    fn name(&self) -> &'static str;

    fn deliver(&self, title: &str, message: &str) -> Result<(), NotifyError>;
}

#[derive(Clone, Default)]
pub struct NotificationCenter {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Hand the notification to every sink without waiting for them.
    ///
    /// Must be called from within the runtime. The returned handles are only
    /// useful to callers that want to wait, such as tests.
    pub fn dispatch(&self, notification: &Notification) -> Vec<JoinHandle<()>> {
        self.sinks
            .iter()
            .map(|sink| {
                let sink = sink.clone();
                let title = notification.title;
                let message = notification.message;
                tokio::task::spawn_blocking(move || match sink.deliver(title, message) {
                    Ok(()) => debug!("Notifications: '{}' delivered via {}", title, sink.name()),
                    Err(e) => warn!("Notifications: {} failed: {}", sink.name(), e),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use std::sync::Mutex;

    /// Keeps every delivery for inspection.
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub delivered: Mutex<Vec<(String, String)>>,
    }

    impl NotificationSink for RecordingSink {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn deliver(&self, title: &str, message: &str) -> Result<(), NotifyError> {
            self.delivered
                .lock()
                .unwrap()
                .push((title.to_string(), message.to_string()));
            Ok(())
        }
    }

    struct BrokenSink;

    impl NotificationSink for BrokenSink {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn deliver(&self, _title: &str, _message: &str) -> Result<(), NotifyError> {
            Err(NotifyError::Unavailable("no notification daemon".into()))
        }
    }

    pub(crate) fn reminder() -> Notification {
        Notification {
            title: "Rest your eyes",
            message: "Look away from the screen.",
            level: 1,
            fired_at: Local::now(),
        }
    }

    #[tokio::test]
    async fn test_failing_sink_does_not_stop_others() {
        let recording = Arc::new(RecordingSink::default());
        let center = NotificationCenter::new()
            .with_sink(Arc::new(BrokenSink))
            .with_sink(recording.clone());
        assert_eq!(center.sinks.len(), 2);

        for handle in center.dispatch(&reminder()) {
            handle.await.unwrap();
        }

        let delivered = recording.delivered.lock().unwrap();
        assert_eq!(
            *delivered,
            vec![("Rest your eyes".to_string(), "Look away from the screen.".to_string())]
        );
    }

    #[tokio::test]
    async fn test_empty_center_is_a_no_op() {
        assert!(NotificationCenter::new().dispatch(&reminder()).is_empty());
    }
}
