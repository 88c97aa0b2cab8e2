//! MIDI worker - owns the transport connections to the hardware.
//!
//! An actor that binds/rebinds midir ports when the router broadcasts a
//! device pair, reports the pair it actually managed to bind, feeds incoming
//! MIDI to the router as work items, and sends outbound bytes on behalf of
//! the editor worker.

use midir::{MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::config::DevicePair;
use crate::midi::format_hex;
use crate::queue::WorkItem;
use crate::router::RouterHandle;

/// Client name reported to the MIDI subsystem
const CLIENT_NAME: &str = "synth-editor";

/// Errors while binding a MIDI port. Logged, never fatal: a failed side is
/// simply left unbound.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("MIDI port '{0}' not found")]
    PortNotFound(String),
    #[error("MIDI init failed: {0}")]
    Init(#[from] midir::InitError),
    #[error("failed to open MIDI port '{0}': {1}")]
    Connect(String, String),
}

/// Commands accepted by the MIDI worker.
#[derive(Debug)]
pub enum MidiCommand {
    /// Bind (or rebind) to the given device pair
    SetDevices(DevicePair),
    /// Send raw bytes to the bound output device
    SendRaw(Vec<u8>),
    /// Stop the worker and drop the connections
    Shutdown,
}

/// Handle for interacting with the MIDI worker.
#[derive(Clone)]
pub struct MidiWorkerHandle {
    cmd_tx: mpsc::UnboundedSender<MidiCommand>,
}

impl MidiWorkerHandle {
    pub fn new(cmd_tx: mpsc::UnboundedSender<MidiCommand>) -> Self {
        Self { cmd_tx }
    }

    pub fn set_devices(&self, devices: DevicePair) {
        let _ = self.cmd_tx.send(MidiCommand::SetDevices(devices));
    }

    pub fn send_raw(&self, data: Vec<u8>) {
        let _ = self.cmd_tx.send(MidiCommand::SendRaw(data));
    }

    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(MidiCommand::Shutdown);
    }
}

/// The MIDI worker actor.
pub struct MidiWorker {
    cmd_rx: mpsc::UnboundedReceiver<MidiCommand>,
    router: RouterHandle,

    input_conn: Option<MidiInputConnection<()>>,
    output_conn: Option<MidiOutputConnection>,

    /// The pair actually bound right now (None on a side that failed)
    bound: DevicePair,
}

impl MidiWorker {
    pub fn new(cmd_rx: mpsc::UnboundedReceiver<MidiCommand>, router: RouterHandle) -> Self {
        Self {
            cmd_rx,
            router,
            input_conn: None,
            output_conn: None,
            bound: DevicePair::default(),
        }
    }

    pub async fn run(mut self) {
        debug!("MIDI worker started");

        while let Some(cmd) = self.cmd_rx.recv().await {
            match cmd {
                MidiCommand::SetDevices(requested) => self.rebind(requested),
                MidiCommand::SendRaw(data) => self.send_raw(&data),
                MidiCommand::Shutdown => break,
            }
        }

        self.input_conn = None;
        self.output_conn = None;
        info!("MIDI worker terminated");
    }

    /// Rebind the transport connections to the requested pair.
    ///
    /// Idempotent: a request matching the currently bound pair is ignored,
    /// which also terminates the router's rebroadcast of our own report.
    /// After an actual rebind the bound pair (with failed sides unset) is
    /// reported back through [`RouterHandle::device_changed`].
    fn rebind(&mut self, requested: DevicePair) {
        if requested == self.bound && (self.input_conn.is_some() || requested.input.is_none()) {
            trace!(devices = %requested, "Already bound, ignoring");
            return;
        }

        info!(devices = %requested, "Binding MIDI devices");
        self.input_conn = None;
        self.output_conn = None;

        self.bound.input = match requested.input.as_deref() {
            Some(pattern) => match self.bind_input(pattern) {
                Ok(name) => Some(name),
                Err(e) => {
                    warn!("Input binding failed: {e}");
                    None
                }
            },
            None => None,
        };

        self.bound.output = match requested.output.as_deref() {
            Some(pattern) => match self.bind_output(pattern) {
                Ok(name) => Some(name),
                Err(e) => {
                    warn!("Output binding failed: {e}");
                    None
                }
            },
            None => None,
        };

        self.router.device_changed(self.bound.clone());
    }

    /// Open the input port matching `pattern` and wire its callback to the
    /// router's inbox. The callback runs on the MIDI thread and must never
    /// block, so it only does an unbounded send.
    fn bind_input(&mut self, pattern: &str) -> Result<String, DeviceError> {
        let midi_in = MidiInput::new(CLIENT_NAME)?;
        let (port, name) = find_port(
            midi_in.ports(),
            |p| midi_in.port_name(p).ok(),
            pattern,
        )
        .ok_or_else(|| DeviceError::PortNotFound(pattern.to_string()))?;

        info!("Connecting to input port: {}", name);
        let router = self.router.clone();
        let conn = midi_in
            .connect(
                &port,
                CLIENT_NAME,
                move |_timestamp, data, _| {
                    // System realtime chatter (clock, active sensing) is not
                    // editor work
                    if data.first().is_some_and(|b| *b >= 0xF8) {
                        return;
                    }
                    router.enqueue(WorkItem::from_device(data.to_vec()));
                },
                (),
            )
            .map_err(|e| DeviceError::Connect(name.clone(), e.to_string()))?;

        self.input_conn = Some(conn);
        Ok(name)
    }

    /// Open the output port matching `pattern`.
    fn bind_output(&mut self, pattern: &str) -> Result<String, DeviceError> {
        let midi_out = MidiOutput::new(CLIENT_NAME)?;
        let (port, name) = find_port(
            midi_out.ports(),
            |p| midi_out.port_name(p).ok(),
            pattern,
        )
        .ok_or_else(|| DeviceError::PortNotFound(pattern.to_string()))?;

        info!("Connecting to output port: {}", name);
        let conn = midi_out
            .connect(&port, CLIENT_NAME)
            .map_err(|e| DeviceError::Connect(name.clone(), e.to_string()))?;

        self.output_conn = Some(conn);
        Ok(name)
    }

    fn send_raw(&mut self, data: &[u8]) {
        match self.output_conn.as_mut() {
            Some(conn) => {
                if let Err(e) = conn.send(data) {
                    warn!("Failed to send MIDI: {e}");
                } else {
                    trace!("Sent: {}", format_hex(data));
                }
            }
            None => debug!("No output device bound, dropping: {}", format_hex(data)),
        }
    }
}

/// Find a port whose name contains `pattern`, case-insensitively.
fn find_port<P>(
    ports: Vec<P>,
    port_name: impl Fn(&P) -> Option<String>,
    pattern: &str,
) -> Option<(P, String)> {
    let pattern = pattern.to_lowercase();
    for port in ports {
        if let Some(name) = port_name(&port) {
            if name.to_lowercase().contains(&pattern) {
                return Some((port, name));
            }
        }
    }
    None
}

/// List available input and output port names.
pub fn list_ports() -> Result<(Vec<String>, Vec<String>), DeviceError> {
    let midi_in = MidiInput::new(CLIENT_NAME)?;
    let inputs = midi_in
        .ports()
        .iter()
        .filter_map(|p| midi_in.port_name(p).ok())
        .collect();

    let midi_out = MidiOutput::new(CLIENT_NAME)?;
    let outputs = midi_out
        .ports()
        .iter()
        .filter_map(|p| midi_out.port_name(p).ok())
        .collect();

    Ok((inputs, outputs))
}

/// Print available ports, for `--list-ports` and the console.
pub fn print_ports() {
    use colored::*;

    match list_ports() {
        Ok((inputs, outputs)) => {
            println!("\n{}", "MIDI input ports:".bold());
            for (i, name) in inputs.iter().enumerate() {
                println!("  {}: {}", i, name.green());
            }
            println!("\n{}", "MIDI output ports:".bold());
            for (i, name) in outputs.iter().enumerate() {
                println!("  {}: {}", i, name.green());
            }
            println!();
        }
        Err(e) => eprintln!("Failed to enumerate MIDI ports: {e}"),
    }
}
