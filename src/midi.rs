//! The abstract MIDI output (and optional input) port contract the
//! evaluator depends on, per §6. `MidirPort` is the real, `midir`-backed
//! implementation; `NullPort` is a recording test double used by scheduler
//! unit tests so they don't require real hardware, grounded on the
//! `rothfield-editor` example's pairing of `midir`-flavored MIDI plumbing
//! with a plain Rust trait boundary.

use std::fmt;

pub trait MidiPort: fmt::Debug {
    fn name(&self) -> &str;
    fn send_note_on(&mut self, channel: u8, note: u8, velocity: u8);
    fn send_note_off(&mut self, channel: u8, note: u8, velocity: u8);
    fn send_program_change(&mut self, channel: u8, program: u8);
    fn send_controller_change(&mut self, channel: u8, controller: u8, value: u8);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MidiEvent {
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8, velocity: u8 },
    ProgramChange { channel: u8, program: u8 },
    ControllerChange { channel: u8, controller: u8, value: u8 },
}

/// Records every message sent to it; used by tests.
#[derive(Debug, Default)]
pub struct NullPort {
    pub name: String,
    pub sent: Vec<MidiEvent>,
}

impl NullPort {
    pub fn new(name: impl Into<String>) -> Self {
        NullPort {
            name: name.into(),
            sent: Vec::new(),
        }
    }
}

impl MidiPort for NullPort {
    fn name(&self) -> &str {
        &self.name
    }
    fn send_note_on(&mut self, channel: u8, note: u8, velocity: u8) {
        self.sent.push(MidiEvent::NoteOn { channel, note, velocity });
    }
    fn send_note_off(&mut self, channel: u8, note: u8, velocity: u8) {
        self.sent.push(MidiEvent::NoteOff { channel, note, velocity });
    }
    fn send_program_change(&mut self, channel: u8, program: u8) {
        self.sent.push(MidiEvent::ProgramChange { channel, program });
    }
    fn send_controller_change(&mut self, channel: u8, controller: u8, value: u8) {
        self.sent.push(MidiEvent::ControllerChange {
            channel,
            controller,
            value,
        });
    }
}

/// Real MIDI output backed by `midir`. Input callbacks are registered
/// separately at connection time (`midir::MidiInput::connect`) by the CLI
/// front-end, not by this port object, matching §6's framing of input as
/// optional and callback-driven.
pub struct MidirPort {
    name: String,
    connection: midir::MidiOutputConnection,
}

impl fmt::Debug for MidirPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MidirPort").field("name", &self.name).finish()
    }
}

impl MidirPort {
    pub fn open(port_name_substring: &str) -> Result<Self, String> {
        let output = midir::MidiOutput::new("musique").map_err(|e| e.to_string())?;
        let ports = output.ports();
        let port = ports
            .iter()
            .find(|p| {
                output
                    .port_name(p)
                    .map(|n| n.contains(port_name_substring))
                    .unwrap_or(false)
            })
            .or_else(|| ports.first())
            .ok_or_else(|| "no MIDI output ports available".to_string())?;
        let name = output.port_name(port).unwrap_or_default();
        let connection = output.connect(port, "musique-out").map_err(|e| e.to_string())?;
        Ok(MidirPort { name, connection })
    }

    fn send(&mut self, bytes: &[u8]) {
        if let Err(e) = self.connection.send(bytes) {
            log::warn!("midi send failed: {}", e);
        }
    }
}

impl MidiPort for MidirPort {
    fn name(&self) -> &str {
        &self.name
    }
    fn send_note_on(&mut self, channel: u8, note: u8, velocity: u8) {
        self.send(&[0x90 | (channel & 0x0F), note, velocity]);
    }
    fn send_note_off(&mut self, channel: u8, note: u8, velocity: u8) {
        self.send(&[0x80 | (channel & 0x0F), note, velocity]);
    }
    fn send_program_change(&mut self, channel: u8, program: u8) {
        self.send(&[0xC0 | (channel & 0x0F), program]);
    }
    fn send_controller_change(&mut self, channel: u8, controller: u8, value: u8) {
        self.send(&[0xB0 | (channel & 0x0F), controller, value]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_port_records_events() {
        let mut port = NullPort::new("test");
        port.send_note_on(0, 60, 100);
        port.send_note_off(0, 60, 0);
        assert_eq!(
            port.sent,
            vec![
                MidiEvent::NoteOn { channel: 0, note: 60, velocity: 100 },
                MidiEvent::NoteOff { channel: 0, note: 60, velocity: 0 },
            ]
        );
    }
}
