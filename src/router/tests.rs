//! Tests for the router state machine.
//!
//! The router's outbound seams are plain channels, so these tests construct
//! the actor struct directly, drive its event handlers, and inspect what
//! each observer received.

use super::*;
use crate::editor::EditorCommand;
use crate::midi::worker::MidiCommand;
use crate::queue::WorkItem;
use tempfile::TempDir;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};

struct Harness {
    router: Router,
    editor_rx: UnboundedReceiver<EditorCommand>,
    midi_rx: UnboundedReceiver<MidiCommand>,
    ui_rx: UnboundedReceiver<UiEvent>,
    // Kept alive so the router's inbox stays open
    _cmd_tx: UnboundedSender<RouterCommand>,
    _dir: TempDir,
}

fn harness() -> Harness {
    harness_with_config(None)
}

fn harness_with_config(seed: Option<Configuration>) -> Harness {
    let dir = TempDir::new().unwrap();
    let store = ConfigStore::new(dir.path().join("config.yaml"));
    if let Some(config) = seed {
        store.save(&config).unwrap();
    }

    let (editor_tx, editor_rx) = mpsc::unbounded_channel();
    let (midi_tx, midi_rx) = mpsc::unbounded_channel();
    let (ui_tx, ui_rx) = mpsc::unbounded_channel();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

    let router = Router::new(
        store,
        EditorHandle::new(editor_tx),
        MidiWorkerHandle::new(midi_tx),
        ui_tx,
        cmd_rx,
    );

    Harness {
        router,
        editor_rx,
        midi_rx,
        ui_rx,
        _cmd_tx: cmd_tx,
        _dir: dir,
    }
}

/// Next work item dispatched to the editor worker, skipping device
/// broadcasts. Panics if the next non-broadcast command is not a dispatch.
fn next_dispatch(rx: &mut UnboundedReceiver<EditorCommand>) -> Option<WorkItem> {
    loop {
        match rx.try_recv() {
            Ok(EditorCommand::Process(item)) => return Some(item),
            Ok(EditorCommand::SetDevices(_)) => continue,
            Ok(other) => panic!("unexpected editor command: {other:?}"),
            // Disconnected still yields buffered messages first, so a
            // drained channel means no further dispatch happened — the
            // async test awaits the actor, which closes the channel.
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return None,
        }
    }
}

fn item(byte: u8) -> WorkItem {
    WorkItem::from_ui(vec![0xB0, byte, 0])
}

#[test]
fn test_start_with_empty_storage_goes_idle_with_defaults() {
    let mut h = harness();
    h.router.start();

    assert!(h.router.enabled);
    assert!(!h.router.busy);
    assert_eq!(h.router.config, Configuration::default());

    // Both the MIDI worker and the UI observed one broadcast of the
    // (default) device pair
    match h.midi_rx.try_recv() {
        Ok(MidiCommand::SetDevices(pair)) => assert_eq!(pair, DevicePair::default()),
        other => panic!("expected SetDevices, got {other:?}"),
    }
    assert!(h.midi_rx.try_recv().is_err());

    assert_eq!(
        h.ui_rx.try_recv(),
        Ok(UiEvent::Devices(DevicePair::default()))
    );
    assert!(h.ui_rx.try_recv().is_err());
}

#[test]
fn test_fifo_dispatch_and_single_flight() {
    let mut h = harness();
    h.router.start();

    // Idle: first item bypasses the queue and is dispatched directly
    h.router.handle_enqueue(item(1));
    assert!(h.router.busy);
    assert_eq!(next_dispatch(&mut h.editor_rx), Some(item(1)));

    // Busy: further items are buffered, not dispatched
    h.router.handle_enqueue(item(2));
    h.router.handle_enqueue(item(3));
    assert_eq!(h.router.queue.len(), 2);
    assert_eq!(next_dispatch(&mut h.editor_rx), None);

    // Completions drain the queue one item per signal, in order
    h.router.handle_worker_finished();
    assert_eq!(next_dispatch(&mut h.editor_rx), Some(item(2)));
    assert!(h.router.busy);

    h.router.handle_worker_finished();
    assert_eq!(next_dispatch(&mut h.editor_rx), Some(item(3)));
    assert!(h.router.busy);
    assert!(h.router.queue.is_empty());

    h.router.handle_worker_finished();
    assert!(!h.router.busy);
    assert_eq!(next_dispatch(&mut h.editor_rx), None);
}

#[test]
fn test_enqueue_while_disabled_is_dropped_forever() {
    let mut h = harness();

    // Not started yet: Disabled
    h.router.handle_enqueue(item(1));
    assert_eq!(next_dispatch(&mut h.editor_rx), None);

    // Starting later must not resurrect the dropped item
    h.router.start();
    assert_eq!(next_dispatch(&mut h.editor_rx), None);

    h.router.handle_worker_finished();
    assert_eq!(next_dispatch(&mut h.editor_rx), None);
    assert!(!h.router.busy);
}

#[test]
fn test_device_change_updates_config_and_broadcasts_to_all() {
    let mut h = harness_with_config(Some(Configuration {
        midi_input_device: Some("old in".into()),
        midi_output_device: Some("old out".into()),
        midi_channel: 5,
    }));
    h.router.start();

    // Drain the startup broadcast
    let _ = h.midi_rx.try_recv();
    let _ = h.ui_rx.try_recv();
    let _ = h.editor_rx.try_recv();

    let pair = DevicePair::new(Some("new in".into()), Some("new out".into()));
    h.router.handle_device_changed(pair.clone());

    assert_eq!(h.router.config.devices(), pair);
    // Channel is untouched by a device change
    assert_eq!(h.router.config.midi_channel, 5);
    // Saved durably before the next event
    assert_eq!(h.router.store.load().devices(), pair);

    assert!(matches!(
        h.editor_rx.try_recv(),
        Ok(EditorCommand::SetDevices(p)) if p == pair
    ));
    assert!(matches!(
        h.midi_rx.try_recv(),
        Ok(MidiCommand::SetDevices(p)) if p == pair
    ));
    assert_eq!(h.ui_rx.try_recv(), Ok(UiEvent::Devices(pair)));
}

#[test]
fn test_identical_device_change_broadcasts_but_saves_once() {
    let mut h = harness();
    h.router.start();
    let _ = h.ui_rx.try_recv();

    let pair = DevicePair::new(Some("a".into()), Some("b".into()));

    h.router.handle_device_changed(pair.clone());
    assert_eq!(h.ui_rx.try_recv(), Ok(UiEvent::Devices(pair.clone())));

    // Remove the saved file; an identical change must not write it again
    std::fs::remove_file(h.router.store.path()).unwrap();
    h.router.handle_device_changed(pair.clone());

    // Second broadcast happened regardless
    assert_eq!(h.ui_rx.try_recv(), Ok(UiEvent::Devices(pair)));
    assert!(!h.router.store.path().exists());
}

#[test]
fn test_shutdown_while_busy_discards_queue_and_goes_dark() {
    let mut h = harness();
    h.router.start();

    h.router.handle_enqueue(item(1));
    h.router.handle_enqueue(item(2));
    h.router.handle_enqueue(item(3));
    assert_eq!(next_dispatch(&mut h.editor_rx), Some(item(1)));
    assert_eq!(h.router.queue.len(), 2);

    h.router.disable();
    assert!(!h.router.enabled);
    assert!(h.router.queue.is_empty());

    // A late completion signal from the in-flight item dispatches nothing
    h.router.handle_worker_finished();
    assert_eq!(next_dispatch(&mut h.editor_rx), None);

    // And new work is dropped
    h.router.handle_enqueue(item(4));
    assert_eq!(next_dispatch(&mut h.editor_rx), None);
}

#[tokio::test]
async fn test_actor_loop_stops_on_shutdown_command() {
    let dir = TempDir::new().unwrap();
    let store = ConfigStore::new(dir.path().join("config.yaml"));

    let (editor_tx, mut editor_rx) = mpsc::unbounded_channel();
    let (midi_tx, _midi_rx) = mpsc::unbounded_channel();
    let (ui_tx, _ui_rx) = mpsc::unbounded_channel();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

    let router = Router::new(
        store,
        EditorHandle::new(editor_tx),
        MidiWorkerHandle::new(midi_tx),
        ui_tx,
        cmd_rx,
    );
    let task = tokio::spawn(router.run());

    let handle = RouterHandle::new(cmd_tx);
    handle.enqueue(item(1));
    handle.shutdown();
    // Arrives behind the shutdown command: dropped with it
    handle.worker_finished();
    handle.enqueue(item(2));

    task.await.unwrap();

    assert_eq!(next_dispatch(&mut editor_rx), Some(item(1)));
    assert_eq!(next_dispatch(&mut editor_rx), None);
}

#[tokio::test]
async fn test_handle_is_alive_tracks_actor() {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<RouterCommand>();
    let handle = RouterHandle::new(cmd_tx);
    assert!(handle.is_alive());

    drop(cmd_rx);
    assert!(!handle.is_alive());
}
