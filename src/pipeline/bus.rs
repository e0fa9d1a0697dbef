//! Delivery from background activities to the interactive thread
//!
//! Every value a background activity produces travels through one unbounded
//! single-consumer queue. Posting never blocks, so an activity can keep
//! running while the interactive thread waits for it to finish.
//!
//! Frames are coalesced: at most one frame is pending at any time and a newer
//! frame replaces it, so the consumer always sees the latest one.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Local};
use tokio::sync::mpsc;

use crate::capture::{BoundingBox, Frame};
use crate::posture::PostureVerdict;

/// An annotated frame and the verdict it was drawn with.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameUpdate {
    pub frame: Frame,
    pub verdict: PostureVerdict,
    pub fps: f64,
    pub bbox: Option<BoundingBox>,
}

/// One firing of the reminder scheduler.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub title: &'static str,
    pub message: &'static str,
    /// Position in the severity table
    pub level: usize,
    pub fired_at: DateTime<Local>,
}

/// Presentation updates, applied only by the interactive thread.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    FrameUpdate(FrameUpdate),
    StatusUpdate(String),
    TimerUpdate(String),
    NotificationEvent(Notification),
}

/// Result of posting to the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendResult {
    /// Value was queued.
    Sent,
    /// A pending frame was overwritten by this one.
    Replaced,
    /// The consumer is gone.
    Closed,
}

impl SendResult {
    #[inline]
    pub fn is_replaced(self) -> bool {
        matches!(self, SendResult::Replaced)
    }

    #[inline]
    pub fn is_closed(self) -> bool {
        matches!(self, SendResult::Closed)
    }
}

enum Envelope {
    Event(UiEvent),
    /// The frame slot was filled
    Frame,
}

type FrameSlot = Arc<Mutex<Option<FrameUpdate>>>;

fn lock_slot(slot: &FrameSlot) -> MutexGuard<'_, Option<FrameUpdate>> {
    // the slot holds plain data, a panic mid-write cannot leave it inconsistent
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Producer side, cloned into each background activity.
#[derive(Clone)]
pub struct UiBus {
    tx: mpsc::UnboundedSender<Envelope>,
    slot: FrameSlot,
}

/// Consumer side, owned by the interactive thread.
pub struct UiQueue {
    rx: mpsc::UnboundedReceiver<Envelope>,
    slot: FrameSlot,
}

pub fn ui_channel() -> (UiBus, UiQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    let slot: FrameSlot = Arc::new(Mutex::new(None));
    (
        UiBus {
            tx,
            slot: slot.clone(),
        },
        UiQueue { rx, slot },
    )
}

impl UiBus {
    pub fn post(&self, event: UiEvent) -> SendResult {
        match self.tx.send(Envelope::Event(event)) {
            Ok(()) => SendResult::Sent,
            Err(_) => SendResult::Closed,
        }
    }

    /// Post a status text, logging if nobody is listening any more.
    pub fn post_status(&self, text: impl Into<String>, context: &str) -> SendResult {
        let result = self.post(UiEvent::StatusUpdate(text.into()));
        if result.is_closed() {
            log::warn!("{}: ui queue closed", context);
        }
        result
    }

    /// Latest-frame-wins delivery.
    pub fn post_frame(&self, update: FrameUpdate) -> SendResult {
        if self.tx.is_closed() {
            return SendResult::Closed;
        }
        let mut slot = lock_slot(&self.slot);
        if slot.replace(update).is_some() {
            return SendResult::Replaced;
        }
        drop(slot);
        match self.tx.send(Envelope::Frame) {
            Ok(()) => SendResult::Sent,
            Err(_) => {
                lock_slot(&self.slot).take();
                SendResult::Closed
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl UiQueue {
    /// Next event, or `None` once every producer is gone.
    pub async fn recv(&mut self) -> Option<UiEvent> {
        loop {
            let envelope = self.rx.recv().await?;
            if let Some(event) = self.open(envelope) {
                return Some(event);
            }
        }
    }

    /// Non-blocking variant used when draining before exit.
    pub fn try_recv(&mut self) -> Option<UiEvent> {
        loop {
            let envelope = self.rx.try_recv().ok()?;
            if let Some(event) = self.open(envelope) {
                return Some(event);
            }
        }
    }

    fn open(&self, envelope: Envelope) -> Option<UiEvent> {
        match envelope {
            Envelope::Event(event) => Some(event),
            Envelope::Frame => lock_slot(&self.slot).take().map(UiEvent::FrameUpdate),
        }
    }
}
