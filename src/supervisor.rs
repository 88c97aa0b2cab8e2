//! Lifecycle supervision for the three actor tasks.
//!
//! Creates the channels, wires the handles, spawns the MIDI worker, the
//! editor worker, and the router in that fixed order, and performs bounded
//! best-effort shutdown: each task gets a stop request and up to
//! [`SHUTDOWN_TIMEOUT`] to exit before the supervisor moves on.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::config::ConfigStore;
use crate::editor::{EditorHandle, EditorWorker};
use crate::midi::worker::{MidiWorker, MidiWorkerHandle};
use crate::router::{Router, RouterHandle};
use crate::ui::UiEventReceiver;

/// How long to wait for each task to honor its stop request
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Handles and join handles for the running actor tasks.
pub struct Supervisor {
    router: RouterHandle,
    editor: EditorHandle,
    midi: MidiWorkerHandle,

    router_task: JoinHandle<()>,
    editor_task: JoinHandle<()>,
    midi_task: JoinHandle<()>,
}

impl Supervisor {
    /// Spawn the three actor tasks and wire their event connections.
    ///
    /// Returns the supervisor plus the UI event receiver; the caller (GUI or
    /// console) consumes the latter and talks back through
    /// [`Supervisor::router`].
    pub fn start(store: ConfigStore) -> (Self, UiEventReceiver) {
        // All channels and handles exist before any task runs, so spawn
        // order only affects who is ready to receive first
        let (router_tx, router_rx) = mpsc::unbounded_channel();
        let (editor_tx, editor_rx) = mpsc::unbounded_channel();
        let (midi_tx, midi_rx) = mpsc::unbounded_channel();
        let (ui_tx, ui_rx) = mpsc::unbounded_channel();

        let router = RouterHandle::new(router_tx);
        let editor = EditorHandle::new(editor_tx);
        let midi = MidiWorkerHandle::new(midi_tx);

        let midi_task = tokio::spawn(MidiWorker::new(midi_rx, router.clone()).run());
        let editor_task = tokio::spawn(
            EditorWorker::new(editor_rx, router.clone(), midi.clone(), ui_tx.clone()).run(),
        );
        let router_task = tokio::spawn(
            Router::new(store, editor.clone(), midi.clone(), ui_tx, router_rx).run(),
        );

        info!("Supervisor started MIDI worker, editor worker, and router");

        (
            Self {
                router,
                editor,
                midi,
                router_task,
                editor_task,
                midi_task,
            },
            ui_rx,
        )
    }

    /// Handle for the UI and other collaborators to reach the router.
    pub fn router(&self) -> RouterHandle {
        self.router.clone()
    }

    /// Stop all three tasks, waiting up to [`SHUTDOWN_TIMEOUT`] for each.
    ///
    /// A task that does not stop in time is abandoned, not awaited further;
    /// shutdown never blocks indefinitely.
    pub async fn shutdown(self) {
        info!("Shutting down");

        self.router.shutdown();
        Self::join("router", self.router_task).await;

        self.editor.shutdown();
        Self::join("editor worker", self.editor_task).await;

        self.midi.shutdown();
        Self::join("MIDI worker", self.midi_task).await;

        info!("Shutdown complete");
    }

    async fn join(name: &str, task: JoinHandle<()>) {
        match timeout(SHUTDOWN_TIMEOUT, task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("{name} task panicked: {e}"),
            Err(_) => warn!("{name} did not stop within {SHUTDOWN_TIMEOUT:?}, continuing"),
        }
    }
}
