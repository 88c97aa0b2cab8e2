//! Work router - the arbiter between MIDI input, the editor worker, and the UI.
//!
//! The router is an actor that owns the persisted [`Configuration`] and the
//! [`WorkQueue`]. It guarantees that exactly one work item is dispatched to
//! the editor worker at a time, that accepted work is delivered in strict
//! FIFO order, and that device changes are broadcast to every observer and
//! persisted before the next event is handled.
//!
//! All state access is serialized through the actor's command channel, so no
//! locks are needed: external actors interact only through [`RouterHandle`].

#[cfg(test)]
mod tests;

use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::config::{ConfigStore, Configuration, DevicePair};
use crate::editor::EditorHandle;
use crate::midi::worker::MidiWorkerHandle;
use crate::queue::{WorkItem, WorkQueue};
use crate::ui::{UiEvent, UiEventSender};

/// Commands accepted by the router actor.
///
/// Every cross-thread interaction with the router is one of these, sent
/// fire-and-forget; the sender never blocks waiting on the router.
#[derive(Debug)]
pub enum RouterCommand {
    /// Accept one unit of editor work (from the UI or the MIDI worker)
    Enqueue(WorkItem),
    /// The editor worker completed the most recent dispatch
    WorkerFinished,
    /// A new device pair was selected (UI) or actually bound (MIDI worker)
    DeviceChanged(DevicePair),
    /// Stop accepting and dispatching work; pending items are discarded
    Shutdown,
}

/// Handle for interacting with the router actor.
///
/// Clone-able; all methods are fire-and-forget sends into the router's
/// inbox. Sends to a dead router are silently ignored, which matches the
/// disabled-state semantics.
#[derive(Clone)]
pub struct RouterHandle {
    cmd_tx: mpsc::UnboundedSender<RouterCommand>,
}

impl RouterHandle {
    pub fn new(cmd_tx: mpsc::UnboundedSender<RouterCommand>) -> Self {
        Self { cmd_tx }
    }

    /// Submit one unit of editor work.
    pub fn enqueue(&self, item: WorkItem) {
        let _ = self.cmd_tx.send(RouterCommand::Enqueue(item));
    }

    /// Signal that the editor worker finished the current item.
    pub fn worker_finished(&self) {
        let _ = self.cmd_tx.send(RouterCommand::WorkerFinished);
    }

    /// Report a new device pair (user selection or actual binding).
    pub fn device_changed(&self, devices: DevicePair) {
        let _ = self.cmd_tx.send(RouterCommand::DeviceChanged(devices));
    }

    /// Request the router to stop. Pending queued work is discarded.
    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(RouterCommand::Shutdown);
    }

    /// Whether the router actor is still accepting commands.
    pub fn is_alive(&self) -> bool {
        !self.cmd_tx.is_closed()
    }
}

/// The router actor.
///
/// State machine: Disabled (initial) -> Idle <-> Busy, with Disabled
/// reachable again from any state on shutdown. `enabled == false` means no
/// dispatch ever happens; `busy == true` means exactly one dispatch is
/// outstanding at the editor worker.
pub struct Router {
    enabled: bool,
    busy: bool,
    queue: WorkQueue,
    config: Configuration,
    store: ConfigStore,

    editor: EditorHandle,
    midi: MidiWorkerHandle,
    ui: UiEventSender,

    cmd_rx: mpsc::UnboundedReceiver<RouterCommand>,

    /// Total items handed to the editor worker, for the shutdown log line
    dispatched: u64,
}

impl Router {
    pub fn new(
        store: ConfigStore,
        editor: EditorHandle,
        midi: MidiWorkerHandle,
        ui: UiEventSender,
        cmd_rx: mpsc::UnboundedReceiver<RouterCommand>,
    ) -> Self {
        Self {
            enabled: false,
            busy: false,
            queue: WorkQueue::new(),
            config: Configuration::default(),
            store,
            editor,
            midi,
            ui,
            cmd_rx,
            dispatched: 0,
        }
    }

    /// Run the actor until shutdown or until every handle is dropped.
    ///
    /// Commands are processed one at a time, which is the entire
    /// synchronization discipline: no other code touches the queue or the
    /// configuration.
    pub async fn run(mut self) {
        self.start();

        while let Some(cmd) = self.cmd_rx.recv().await {
            trace!(?cmd, "Router command");
            match cmd {
                RouterCommand::Enqueue(item) => self.handle_enqueue(item),
                RouterCommand::WorkerFinished => self.handle_worker_finished(),
                RouterCommand::DeviceChanged(devices) => self.handle_device_changed(devices),
                RouterCommand::Shutdown => {
                    self.disable();
                    break;
                }
            }
        }

        info!(dispatched = self.dispatched, "Router loop terminated");
    }

    /// Load the configuration, announce the devices, and go Idle.
    fn start(&mut self) {
        self.config = self.store.load();
        info!(
            devices = %self.config.devices(),
            channel = self.config.midi_channel,
            "Router starting"
        );

        self.broadcast_devices(self.config.devices());
        self.enabled = true;
        self.busy = false;
    }

    /// Accept one work item.
    ///
    /// Disabled: dropped. Busy: buffered. Idle: dispatched directly,
    /// bypassing the queue for the zero-depth common case.
    fn handle_enqueue(&mut self, item: WorkItem) {
        if !self.enabled {
            debug!(?item.origin, "Dropping work item while disabled");
            return;
        }

        if self.busy {
            self.queue.push_back(item);
            trace!(queued = self.queue.len(), "Work item buffered");
        } else {
            self.busy = true;
            self.dispatch(item);
        }
    }

    /// The editor worker signaled completion: dispatch the next buffered
    /// item or go Idle.
    fn handle_worker_finished(&mut self) {
        if !self.enabled {
            return;
        }

        match self.queue.pop_front() {
            Some(item) => self.dispatch(item),
            None => self.busy = false,
        }
    }

    /// Broadcast the pair to every observer, then persist if it differs
    /// from the held configuration.
    ///
    /// The broadcast is unconditional so all observers stay in sync even
    /// when the value is unchanged; the save is strictly change-driven.
    fn handle_device_changed(&mut self, devices: DevicePair) {
        self.broadcast_devices(devices.clone());

        if self.config.set_devices(&devices) {
            debug!(devices = %devices, "Device configuration changed, saving");
            if let Err(e) = self.store.save(&self.config) {
                // Not surfaced to the user: the in-memory config is still
                // authoritative for this session
                warn!("Failed to save config: {e:#}");
            }
        }
    }

    /// Enter the terminal Disabled state.
    ///
    /// An in-flight dispatch is not retracted; the router just stops
    /// accepting and dispatching further work.
    fn disable(&mut self) {
        self.enabled = false;
        if !self.queue.is_empty() {
            let dropped = self.queue.clear();
            debug!(dropped, "Discarded queued work on shutdown");
        }
        if self.busy {
            warn!("Shutting down with a dispatch still outstanding");
        }
    }

    fn dispatch(&mut self, item: WorkItem) {
        trace!(?item.origin, bytes = item.payload.len(), "Dispatching to editor worker");
        self.editor.process(item);
        self.dispatched += 1;
    }

    fn broadcast_devices(&self, devices: DevicePair) {
        self.editor.set_devices(devices.clone());
        self.midi.set_devices(devices.clone());
        let _ = self.ui.send(UiEvent::Devices(devices));
    }
}
