//! MIDI message parsing and encoding.
//!
//! Covers the channel voice subset a hardware editor exchanges with its
//! device, plus SysEx for bulk parameter transfers. Payload semantics
//! (which CC maps to which synth parameter) are the editor worker's concern,
//! not this module's.

pub mod worker;

use std::fmt;

/// MIDI messages the editor cares about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MidiMessage {
    /// Note Off: channel (0-15), note (0-127), velocity (0-127)
    NoteOff { channel: u8, note: u8, velocity: u8 },

    /// Note On: channel (0-15), note (0-127), velocity (0-127)
    NoteOn { channel: u8, note: u8, velocity: u8 },

    /// Control Change: channel (0-15), cc (0-127), value (0-127)
    ControlChange { channel: u8, cc: u8, value: u8 },

    /// Program Change: channel (0-15), program (0-127)
    ProgramChange { channel: u8, program: u8 },

    /// Pitch Bend: channel (0-15), value (0-16383, 14-bit)
    PitchBend { channel: u8, value: u16 },

    /// System Exclusive: data bytes between 0xF0 and 0xF7
    SysEx { data: Vec<u8> },
}

impl MidiMessage {
    /// Parse a MIDI message from raw bytes.
    ///
    /// Returns None for truncated messages, running status, and system
    /// messages other than SysEx.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let status = *data.first()?;

        // Running status would need carried state; not supported
        if status < 0x80 {
            return None;
        }

        if status < 0xF0 {
            let channel = status & 0x0F;
            match status & 0xF0 {
                0x80 => {
                    if data.len() < 3 {
                        return None;
                    }
                    Some(MidiMessage::NoteOff {
                        channel,
                        note: data[1] & 0x7F,
                        velocity: data[2] & 0x7F,
                    })
                }
                0x90 => {
                    if data.len() < 3 {
                        return None;
                    }
                    let note = data[1] & 0x7F;
                    let velocity = data[2] & 0x7F;
                    // Note On with velocity 0 is a Note Off
                    if velocity == 0 {
                        Some(MidiMessage::NoteOff {
                            channel,
                            note,
                            velocity: 0,
                        })
                    } else {
                        Some(MidiMessage::NoteOn {
                            channel,
                            note,
                            velocity,
                        })
                    }
                }
                0xB0 => {
                    if data.len() < 3 {
                        return None;
                    }
                    Some(MidiMessage::ControlChange {
                        channel,
                        cc: data[1] & 0x7F,
                        value: data[2] & 0x7F,
                    })
                }
                0xC0 => {
                    if data.len() < 2 {
                        return None;
                    }
                    Some(MidiMessage::ProgramChange {
                        channel,
                        program: data[1] & 0x7F,
                    })
                }
                0xE0 => {
                    if data.len() < 3 {
                        return None;
                    }
                    let lsb = (data[1] & 0x7F) as u16;
                    let msb = (data[2] & 0x7F) as u16;
                    Some(MidiMessage::PitchBend {
                        channel,
                        value: (msb << 7) | lsb,
                    })
                }
                _ => None,
            }
        } else if status == 0xF0 {
            let end = data.iter().position(|&b| b == 0xF7)?;
            Some(MidiMessage::SysEx {
                data: data[1..end].to_vec(),
            })
        } else {
            None
        }
    }

    /// Encode the message to wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        match *self {
            MidiMessage::NoteOff {
                channel,
                note,
                velocity,
            } => vec![0x80 | (channel & 0x0F), note & 0x7F, velocity & 0x7F],
            MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            } => vec![0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F],
            MidiMessage::ControlChange { channel, cc, value } => {
                vec![0xB0 | (channel & 0x0F), cc & 0x7F, value & 0x7F]
            }
            MidiMessage::ProgramChange { channel, program } => {
                vec![0xC0 | (channel & 0x0F), program & 0x7F]
            }
            MidiMessage::PitchBend { channel, value } => {
                let lsb = (value & 0x7F) as u8;
                let msb = ((value >> 7) & 0x7F) as u8;
                vec![0xE0 | (channel & 0x0F), lsb, msb]
            }
            MidiMessage::SysEx { ref data } => {
                let mut bytes = vec![0xF0];
                bytes.extend_from_slice(data);
                bytes.push(0xF7);
                bytes
            }
        }
    }

}

impl fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MidiMessage::NoteOff {
                channel,
                note,
                velocity,
            } => write!(f, "NoteOff ch:{} n:{} v:{}", channel + 1, note, velocity),
            MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            } => write!(f, "NoteOn ch:{} n:{} v:{}", channel + 1, note, velocity),
            MidiMessage::ControlChange { channel, cc, value } => {
                write!(f, "CC ch:{} cc:{} v:{}", channel + 1, cc, value)
            }
            MidiMessage::ProgramChange { channel, program } => {
                write!(f, "ProgramChange ch:{} p:{}", channel + 1, program)
            }
            MidiMessage::PitchBend { channel, value } => {
                write!(f, "PitchBend ch:{} v:{}", channel + 1, value)
            }
            MidiMessage::SysEx { ref data } => write!(f, "SysEx {} bytes", data.len()),
        }
    }
}

/// Format MIDI bytes as a hex string for logs
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cc_parsing() {
        let msg = MidiMessage::parse(&[0xB2, 7, 100]).unwrap();
        assert_eq!(
            msg,
            MidiMessage::ControlChange {
                channel: 2,
                cc: 7,
                value: 100,
            }
        );
    }

    #[test]
    fn test_note_on_velocity_zero_is_note_off() {
        let msg = MidiMessage::parse(&[0x90, 60, 0]).unwrap();
        assert_eq!(
            msg,
            MidiMessage::NoteOff {
                channel: 0,
                note: 60,
                velocity: 0,
            }
        );
    }

    #[test]
    fn test_pitch_bend_14bit() {
        let msg = MidiMessage::parse(&[0xE0, 0x00, 0x40]).unwrap();
        assert_eq!(
            msg,
            MidiMessage::PitchBend {
                channel: 0,
                value: 8192,
            }
        );
    }

    #[test]
    fn test_sysex_requires_terminator() {
        assert!(MidiMessage::parse(&[0xF0, 0x01, 0x02]).is_none());

        let msg = MidiMessage::parse(&[0xF0, 0x01, 0x02, 0xF7]).unwrap();
        assert_eq!(msg, MidiMessage::SysEx { data: vec![1, 2] });
    }

    #[test]
    fn test_truncated_message() {
        assert!(MidiMessage::parse(&[0xB0, 7]).is_none());
        assert!(MidiMessage::parse(&[]).is_none());
    }

    #[test]
    fn test_encode_cc() {
        let msg = MidiMessage::ControlChange {
            channel: 0,
            cc: 42,
            value: 64,
        };
        assert_eq!(msg.encode(), vec![0xB0, 42, 64]);
    }

    #[test]
    fn test_format_hex() {
        assert_eq!(format_hex(&[0x90, 0x3C, 0x7F]), "90 3C 7F");
    }
}
