//! Interactive dev console.
//!
//! Stands in for the GUI: produces work items and device changes through the
//! router handle, and prints the UI events the router and editor worker fan
//! out. Useful for exercising the editor backend without a frontend.

use anyhow::Result;
use colored::*;
use rustyline::DefaultEditor;
use tracing::debug;

use crate::config::DevicePair;
use crate::midi::worker::print_ports;
use crate::midi::MidiMessage;
use crate::queue::WorkItem;
use crate::router::RouterHandle;
use crate::ui::{UiEvent, UiEventReceiver};

const HELP: &str = "\
Commands:
  ports                 list MIDI ports
  devices <in> <out>    bind devices by name substring ('-' to unbind a side)
  send <hex bytes>      enqueue an outbound message, e.g. send B0 2A 40
  cc <num> <value>      enqueue a control change on channel 1
  help                  show this help
  quit                  exit";

pub async fn run(router: RouterHandle, mut ui_rx: UiEventReceiver) -> Result<()> {
    // Print UI events as they arrive so the console doubles as a monitor
    let ui_task = tokio::spawn(async move {
        while let Some(event) = ui_rx.recv().await {
            match event {
                UiEvent::Devices(devices) => {
                    println!("{} {}", "devices:".cyan(), devices);
                }
                UiEvent::Status(text) => println!("{} {}", "status:".cyan(), text),
                UiEvent::Redraw => debug!("Redraw requested"),
            }
        }
    });

    let mut rl = DefaultEditor::new()?;
    println!("{}", HELP.dimmed());

    loop {
        match rl.readline("editor> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);
                if !handle_command(&router, line) || !router.is_alive() {
                    break;
                }
            }
            Err(_) => break,
        }
    }

    ui_task.abort();
    Ok(())
}

/// Execute one console command. Returns false when the loop should exit.
fn handle_command(router: &RouterHandle, line: &str) -> bool {
    let mut parts = line.split_whitespace();
    match parts.next() {
        Some("quit") | Some("exit") => return false,
        Some("help") => println!("{HELP}"),
        Some("ports") => print_ports(),
        Some("devices") => match (parts.next(), parts.next()) {
            (Some(input), Some(output)) => {
                let unset = |s: &str| (s != "-").then(|| s.to_string());
                router.device_changed(DevicePair::new(unset(input), unset(output)));
            }
            _ => println!("usage: devices <in> <out>"),
        },
        Some("send") => match parse_hex(parts) {
            Some(payload) if !payload.is_empty() => {
                router.enqueue(WorkItem::from_ui(payload));
            }
            _ => println!("usage: send <hex bytes>, e.g. send B0 2A 40"),
        },
        Some("cc") => {
            let parse = |s: Option<&str>| s.and_then(|v| v.parse::<u8>().ok());
            match (parse(parts.next()), parse(parts.next())) {
                (Some(cc), Some(value)) => {
                    let msg = MidiMessage::ControlChange {
                        channel: 0,
                        cc,
                        value,
                    };
                    router.enqueue(WorkItem::from_ui(msg.encode()));
                }
                _ => println!("usage: cc <num> <value>"),
            }
        }
        Some(other) => println!("unknown command '{other}', try 'help'"),
        None => {}
    }
    true
}

fn parse_hex<'a>(parts: impl Iterator<Item = &'a str>) -> Option<Vec<u8>> {
    parts
        .map(|p| u8::from_str_radix(p, 16).ok())
        .collect::<Option<Vec<u8>>>()
}
