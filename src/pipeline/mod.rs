//! Background activities and their coordination
//!
//! Two independently paced activities run next to the interactive thread:
//! - the capture/classify loop, on a blocking worker
//! - the reminder scheduler, as an async task ticking once per second
//!
//! The `Coordinator` owns their lifecycle. Each activity has its own
//! `RunningFlag` and `SharedState`; the two never share data. Everything they
//! produce reaches the interactive thread through the `bus` queue.

pub mod bus;
pub mod capture_loop;
pub mod coordinator;
pub mod flag;
pub mod health;
pub mod scheduler;
pub mod state;

pub use bus::{FrameUpdate, Notification, SendResult, UiBus, UiEvent, UiQueue, ui_channel};
pub use coordinator::{Coordinator, StartOutcome};
pub use flag::RunningFlag;
pub use health::{CaptureHealth, HealthSummary};
pub use scheduler::{SEVERITY_TABLE, Severity, SeverityTable, TimerState};
pub use state::{ActivityState, SharedState};
