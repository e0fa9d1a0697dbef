//! Presentation surfaces
//!
//! Every update is a full replacement of what was shown before, so a surface
//! may skip updates that would not change anything.

mod terminal;

pub use terminal::TerminalSurface;

use crate::pipeline::{FrameUpdate, Notification};

/// Where the interactive thread puts what the user sees.
pub trait DisplaySurface: Send {
    fn show_frame(&mut self, update: &FrameUpdate);

    fn show_status(&mut self, text: &str);

    fn show_timer(&mut self, label: &str);

    fn show_notification(&mut self, notification: &Notification);

    /// Answer to an explicit `status` request.
    fn show_report(&mut self, report: &str);
}
