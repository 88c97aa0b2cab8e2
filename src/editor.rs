//! Editor worker - sequential processor for parameter-change work.
//!
//! From the router's point of view this is an opaque, stateless processor:
//! it accepts exactly one work item at a time and signals completion through
//! [`RouterHandle::worker_finished`]. The completion signal is sent for every
//! item, including ones the worker could not make sense of; the single-flight
//! invariant depends on it.

use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::config::DevicePair;
use crate::midi::worker::MidiWorkerHandle;
use crate::midi::{format_hex, MidiMessage};
use crate::queue::{WorkItem, WorkOrigin};
use crate::router::RouterHandle;
use crate::ui::{UiEvent, UiEventSender};

/// Commands accepted by the editor worker.
#[derive(Debug)]
pub enum EditorCommand {
    /// Process one work item (at most one outstanding at a time)
    Process(WorkItem),
    /// Observe the authoritative device pair
    SetDevices(DevicePair),
    /// Stop the worker
    Shutdown,
}

/// Handle for dispatching work to the editor worker.
#[derive(Clone)]
pub struct EditorHandle {
    cmd_tx: mpsc::UnboundedSender<EditorCommand>,
}

impl EditorHandle {
    pub fn new(cmd_tx: mpsc::UnboundedSender<EditorCommand>) -> Self {
        Self { cmd_tx }
    }

    pub fn process(&self, item: WorkItem) {
        let _ = self.cmd_tx.send(EditorCommand::Process(item));
    }

    pub fn set_devices(&self, devices: DevicePair) {
        let _ = self.cmd_tx.send(EditorCommand::SetDevices(devices));
    }

    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(EditorCommand::Shutdown);
    }
}

/// The editor worker actor.
pub struct EditorWorker {
    cmd_rx: mpsc::UnboundedReceiver<EditorCommand>,
    router: RouterHandle,
    midi: MidiWorkerHandle,
    ui: UiEventSender,
    /// Last observed device pair, kept for status display only
    devices: DevicePair,
}

impl EditorWorker {
    pub fn new(
        cmd_rx: mpsc::UnboundedReceiver<EditorCommand>,
        router: RouterHandle,
        midi: MidiWorkerHandle,
        ui: UiEventSender,
    ) -> Self {
        Self {
            cmd_rx,
            router,
            midi,
            ui,
            devices: DevicePair::default(),
        }
    }

    pub async fn run(mut self) {
        debug!("Editor worker started");

        while let Some(cmd) = self.cmd_rx.recv().await {
            match cmd {
                EditorCommand::Process(item) => {
                    self.process(item);
                    // Always signal completion, success or not
                    self.router.worker_finished();
                }
                EditorCommand::SetDevices(devices) => {
                    trace!(devices = %devices, "Editor worker observed devices");
                    self.devices = devices;
                }
                EditorCommand::Shutdown => break,
            }
        }

        info!("Editor worker terminated");
    }

    /// Handle one work item.
    ///
    /// UI-originated items are outbound parameter changes: forward them to
    /// the device. Device-originated items update the editor's view of the
    /// patch, which the UI is told to repaint.
    fn process(&mut self, item: WorkItem) {
        let parsed = MidiMessage::parse(&item.payload);

        match item.origin {
            WorkOrigin::Ui => {
                match &parsed {
                    Some(msg) => trace!(%msg, "Sending to device"),
                    None => warn!(
                        "Unparseable outbound payload: {}",
                        format_hex(&item.payload)
                    ),
                }
                self.midi.send_raw(item.payload);
                if let Some(msg) = parsed {
                    let target = self.devices.output.as_deref().unwrap_or("<unbound>");
                    let _ = self
                        .ui
                        .send(UiEvent::Status(format!("Sent {msg} to {target}")));
                }
            }
            WorkOrigin::Device => match parsed {
                Some(msg) => {
                    trace!(%msg, "Received from device");
                    let _ = self.ui.send(UiEvent::Status(format!("Received {msg}")));
                    let _ = self.ui.send(UiEvent::Redraw);
                }
                None => {
                    debug!(
                        "Ignoring unparseable device payload: {}",
                        format_hex(&item.payload)
                    );
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_process_signals_finished_exactly_once() {
        let (editor_tx, editor_rx) = mpsc::unbounded_channel();
        let (router_tx, mut router_rx) = mpsc::unbounded_channel();
        let (midi_tx, _midi_rx) = mpsc::unbounded_channel();
        let (ui_tx, _ui_rx) = mpsc::unbounded_channel();

        let worker = EditorWorker::new(
            editor_rx,
            RouterHandle::new(router_tx),
            MidiWorkerHandle::new(midi_tx),
            ui_tx,
        );
        let task = tokio::spawn(worker.run());

        let handle = EditorHandle::new(editor_tx);
        handle.process(WorkItem::from_device(vec![0xB0, 7, 99]));
        handle.process(WorkItem::from_device(vec![0xFF])); // unparseable
        handle.shutdown();
        task.await.unwrap();

        // One WorkerFinished per item, parseable or not
        assert!(matches!(
            router_rx.try_recv(),
            Ok(crate::router::RouterCommand::WorkerFinished)
        ));
        assert!(matches!(
            router_rx.try_recv(),
            Ok(crate::router::RouterCommand::WorkerFinished)
        ));
        assert!(router_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_ui_item_forwarded_to_device() {
        let (editor_tx, editor_rx) = mpsc::unbounded_channel();
        let (router_tx, _router_rx) = mpsc::unbounded_channel();
        let (midi_tx, mut midi_rx) = mpsc::unbounded_channel();
        let (ui_tx, _ui_rx) = mpsc::unbounded_channel();

        let worker = EditorWorker::new(
            editor_rx,
            RouterHandle::new(router_tx),
            MidiWorkerHandle::new(midi_tx),
            ui_tx,
        );
        let task = tokio::spawn(worker.run());

        let handle = EditorHandle::new(editor_tx);
        handle.process(WorkItem::from_ui(vec![0xB0, 42, 64]));
        handle.shutdown();
        task.await.unwrap();

        match midi_rx.try_recv() {
            Ok(crate::midi::worker::MidiCommand::SendRaw(data)) => {
                assert_eq!(data, vec![0xB0, 42, 64]);
            }
            other => panic!("expected SendRaw, got {other:?}"),
        }
    }
}
