//! Always-on-top message box that stays until the user acknowledges it.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use native_dialog::{DialogBuilder, MessageLevel};

use super::NotificationSink;
use crate::error::NotifyError;

pub struct ModalNotifier {
    open: Arc<AtomicUsize>,
}

impl ModalNotifier {
    pub fn new() -> Self {
        Self {
            open: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of dialogs currently waiting for acknowledgment.
    pub fn open_dialogs(&self) -> Arc<AtomicUsize> {
        self.open.clone()
    }
}

impl Default for ModalNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationSink for ModalNotifier {
    fn name(&self) -> &'static str {
        "modal"
    }

    fn deliver(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        self.open.fetch_add(1, Ordering::Relaxed);
        // blocks this worker until dismissed
        let shown = DialogBuilder::message()
            .set_title(title)
            .set_text(message)
            .set_level(MessageLevel::Info)
            .alert()
            .show();
        self.open.fetch_sub(1, Ordering::Relaxed);
        shown.map_err(|e| NotifyError::Unavailable(e.to_string()))
    }
}
