//! Events delivered to the UI layer.
//!
//! The GUI proper lives outside this crate; it consumes these events for
//! display and produces work items and device changes through the
//! [`RouterHandle`](crate::router::RouterHandle). The dev console and the
//! headless main loop are the in-tree consumers.

use crate::config::DevicePair;
use tokio::sync::mpsc;

/// Notification fanned out to the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// The authoritative device pair changed (or was loaded at startup)
    Devices(DevicePair),
    /// One-line status message for the status bar
    Status(String),
    /// Parameter state changed; the UI should repaint its controls
    Redraw,
}

/// Sender half of the UI event channel.
pub type UiEventSender = mpsc::UnboundedSender<UiEvent>;

/// Receiver half of the UI event channel.
pub type UiEventReceiver = mpsc::UnboundedReceiver<UiEvent>;
