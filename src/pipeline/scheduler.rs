//! Escalating reminder scheduler
//!
//! Ticks once per second while running. Every tick publishes the elapsed time;
//! every full interval fires the next entry of the severity table. The table
//! index saturates at the last entry and only goes back to zero when the timer
//! is stopped and started again.

use std::time::Duration;

use chrono::Local;
use log::{debug, info};
use tokio::time::{Instant, MissedTickBehavior};

use super::bus::{Notification, UiBus, UiEvent};
use super::flag::RunningFlag;
use super::state::{ActivityState, SharedState};
use crate::assets::TIMER_RESET_LABEL;

/// A reminder template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Severity {
    pub title: &'static str,
    pub message: &'static str,
}

/// Ordered from gentle to urgent.
pub static SEVERITY_TABLE: SeverityTable = SeverityTable(&[
    Severity {
        title: "Change position",
        message: "How about standing up for a stretch, or at least changing position for a bit?",
    },
    Severity {
        title: "Rest your eyes",
        message: "Give your eyes a break. Look at something far away or close them for a minute or two.",
    },
    Severity {
        title: "Time to move",
        message: "Time to get up: grab some water, walk around, do something small to get your body moving.",
    },
    Severity {
        title: "Health warning",
        message: "Sitting for long stretches is bad for your health. Get up and move around!",
    },
    Severity {
        title: "Stretch now!",
        message: "Your body needs a real break. Get up and stretch your back, shoulders and neck to keep office syndrome away.",
    },
    Severity {
        title: "Danger! Stop now",
        message: "You have been sitting and working for far too long. Stop now and rest for at least 15 to 30 minutes before getting back to work.",
    },
]);

/// Immutable, non-empty list of reminder templates.
#[derive(Debug)]
pub struct SeverityTable(&'static [Severity]);

impl SeverityTable {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entry at `index`, clamped to the most severe one.
    pub fn get(&self, index: usize) -> Severity {
        self.0[index.min(self.last_index())]
    }

    pub fn last_index(&self) -> usize {
        self.0.len().saturating_sub(1)
    }
}

/// Output of one scheduler tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub label: String,
    pub fired: Option<Notification>,
}

/// Per-run timer state, owned by the scheduler task.
#[derive(Debug, Clone)]
pub struct TimerState {
    elapsed: u64,
    interval_secs: u64,
    cycle_index: usize,
    table: &'static SeverityTable,
}

impl TimerState {
    pub fn new(interval_secs: u64) -> Self {
        Self::with_table(interval_secs, &SEVERITY_TABLE)
    }

    pub fn with_table(interval_secs: u64, table: &'static SeverityTable) -> Self {
        Self {
            elapsed: 0,
            interval_secs,
            cycle_index: 0,
            table,
        }
    }

    pub fn elapsed(&self) -> u64 {
        self.elapsed
    }

    pub fn cycle_index(&self) -> usize {
        self.cycle_index
    }

    /// Advance by one second.
    pub fn tick(&mut self) -> Tick {
        self.elapsed += 1;
        let label = format_hms(self.elapsed);

        let fired = if self.interval_secs > 0 && self.elapsed % self.interval_secs == 0 {
            let level = self.cycle_index;
            let entry = self.table.get(level);
            self.cycle_index = (self.cycle_index + 1).min(self.table.last_index());
            Some(Notification {
                title: entry.title,
                message: entry.message,
                level,
                fired_at: Local::now(),
            })
        } else {
            None
        };

        Tick { label, fired }
    }

    pub fn reset(&mut self) {
        self.elapsed = 0;
        self.cycle_index = 0;
    }
}

/// `HH:MM:SS`; hours keep counting past 99.
pub fn format_hms(total_secs: u64) -> String {
    let (mins, secs) = (total_secs / 60, total_secs % 60);
    let (hours, mins) = (mins / 60, mins % 60);
    format!("{:02}:{:02}:{:02}", hours, mins, secs)
}

/// Scheduler task body. Returns when the flag is lowered or the interactive
/// thread has gone away.
pub async fn run(mut timer: TimerState, flag: RunningFlag, bus: UiBus, state: SharedState) {
    info!(
        "Scheduler: running, reminder every {}s",
        timer.interval_secs
    );
    let period = Duration::from_secs(1);
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

    loop {
        tokio::select! {
            biased;
            _ = flag.stopped() => break,
            _ = ticker.tick() => {}
        }
        if !flag.is_running() {
            break;
        }

        let tick = timer.tick();
        if bus.post(UiEvent::TimerUpdate(tick.label)).is_closed() {
            break;
        }
        if let Some(notification) = tick.fired {
            info!(
                "Scheduler: firing level {} '{}' at {}",
                notification.level,
                notification.title,
                timer.elapsed()
            );
            bus.post(UiEvent::NotificationEvent(notification));
        }
    }

    timer.reset();
    debug!("Scheduler: cleared at cycle {}", timer.cycle_index());
    bus.post(UiEvent::TimerUpdate(TIMER_RESET_LABEL.to_string()));
    state.transition(ActivityState::Idle);
    info!("Scheduler: stopped");
}
