use std::io::{self, Write};

use log::warn;

use super::DisplaySurface;
use crate::pipeline::{FrameUpdate, Notification};
use crate::posture::PostureVerdict;

/// Line-oriented surface for a terminal.
///
/// The timer label is redrawn in place on its own line; verdicts are only
/// printed when they change.
pub struct TerminalSurface<W: Write + Send> {
    out: W,
    last_verdict: Option<PostureVerdict>,
    last_timer: Option<String>,
    /// The cursor sits at the end of an in-place timer line
    inline: bool,
    bell: bool,
}

impl TerminalSurface<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> TerminalSurface<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            last_verdict: None,
            last_timer: None,
            inline: false,
            bell: true,
        }
    }

    fn line(&mut self, text: &str) {
        let result = (|| -> io::Result<()> {
            if self.inline {
                writeln!(self.out)?;
                self.inline = false;
            }
            writeln!(self.out, "{}", text)?;
            self.out.flush()
        })();
        if let Err(e) = result {
            warn!("TerminalSurface: {}", e);
        }
    }
}

impl<W: Write + Send> DisplaySurface for TerminalSurface<W> {
    fn show_frame(&mut self, update: &FrameUpdate) {
        if self.last_verdict == Some(update.verdict) {
            return;
        }
        self.last_verdict = Some(update.verdict);
        let marker = if update.verdict.is_incorrect() { "!" } else { " " };
        self.line(&format!(
            "{} Posture: {} [{}] {:.1} fps",
            marker,
            update.verdict,
            update.verdict.color(),
            update.fps
        ));
    }

    fn show_status(&mut self, text: &str) {
        // a status replaces the preview, so the next verdict is news again
        self.last_verdict = None;
        self.line(text);
    }

    fn show_timer(&mut self, label: &str) {
        if self.last_timer.as_deref() == Some(label) {
            return;
        }
        self.last_timer = Some(label.to_string());
        let result = write!(self.out, "\rTimer {}", label).and_then(|_| self.out.flush());
        match result {
            Ok(()) => self.inline = true,
            Err(e) => warn!("TerminalSurface: {}", e),
        }
    }

    fn show_notification(&mut self, notification: &Notification) {
        if self.bell {
            let _ = write!(self.out, "\x07");
        }
        self.line(&format!(
            "[{}] {}: {}",
            notification.fired_at.format("%H:%M:%S"),
            notification.title,
            notification.message
        ));
    }

    fn show_report(&mut self, report: &str) {
        self.line(report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::Frame;
    use chrono::Local;

    fn frame(verdict: PostureVerdict) -> FrameUpdate {
        FrameUpdate {
            frame: Frame::blank(1, 1, 0),
            verdict,
            fps: 25.0,
            bbox: None,
        }
    }

    fn printed(surface: TerminalSurface<Vec<u8>>) -> String {
        String::from_utf8(surface.out).unwrap()
    }

    #[test]
    fn test_verdicts_are_deduplicated() {
        let mut surface = TerminalSurface::new(Vec::new());
        surface.show_frame(&frame(PostureVerdict::Correct));
        surface.show_frame(&frame(PostureVerdict::Correct));
        surface.show_frame(&frame(PostureVerdict::IncorrectLeaning));
        surface.show_frame(&frame(PostureVerdict::Correct));

        let out = printed(surface);
        assert_eq!(out.lines().count(), 3);
        assert!(out.lines().nth(1).unwrap().starts_with('!'));
    }

    #[test]
    fn test_status_resets_verdict() {
        let mut surface = TerminalSurface::new(Vec::new());
        surface.show_frame(&frame(PostureVerdict::Correct));
        surface.show_status("Camera stream ended: end of stream");
        surface.show_frame(&frame(PostureVerdict::Correct));
        assert_eq!(printed(surface).lines().count(), 3);
    }

    #[test]
    fn test_timer_is_redrawn_in_place() {
        let mut surface = TerminalSurface::new(Vec::new());
        surface.bell = false;
        surface.show_timer("00:00:01");
        surface.show_timer("00:00:01");
        surface.show_timer("00:00:02");
        surface.show_notification(&Notification {
            title: "Change position",
            message: "Stand up.",
            level: 0,
            fired_at: Local::now(),
        });

        let out = printed(surface);
        assert_eq!(out.matches("\rTimer").count(), 2);
        assert!(out.contains("00:00:02\n["));
        assert!(out.ends_with("Change position: Stand up.\n"));
        assert!(!out.contains('\x07'));
    }
}
