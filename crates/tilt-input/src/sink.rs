use crate::ButtonEvent;
use anyhow::Result;
use serde::Serialize;
use std::io::Write;

/// Receiver of button transitions.
pub trait EventSink {
    fn send(&mut self, event: ButtonEvent) -> Result<()>;
}

/// Forward `events` in order. Stops at the first sink error.
pub fn dispatch<S, I>(sink: &mut S, events: I) -> Result<usize>
where
    S: EventSink + ?Sized,
    I: IntoIterator<Item = ButtonEvent>,
{
    let mut sent = 0;
    for event in events {
        sink.send(event)?;
        sent += 1;
    }
    Ok(sent)
}

/// Message shape posted to the simulator frame.
#[derive(Serialize)]
struct WireEvent {
    button: u8,
    pressed: bool,
}

/// Writes one JSON object per line: `{"button":5,"pressed":true}`.
pub struct JsonLineSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLineSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> EventSink for JsonLineSink<W> {
    fn send(&mut self, event: ButtonEvent) -> Result<()> {
        let wire = WireEvent {
            button: event.button.id(),
            pressed: event.pressed,
        };
        serde_json::to_writer(&mut self.writer, &wire)?;
        self.writer.write_all(b"\n")?;
        // Consumers react per event; don't let them sit in a buffer.
        self.writer.flush()?;
        Ok(())
    }
}

/// Logs every transition at info level.
#[derive(Debug, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn send(&mut self, event: ButtonEvent) -> Result<()> {
        tracing::info!(button = %event.button, pressed = event.pressed, "Button event");
        Ok(())
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct VecSink {
    pub events: Vec<ButtonEvent>,
}

impl EventSink for VecSink {
    fn send(&mut self, event: ButtonEvent) -> Result<()> {
        self.events.push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Button;

    struct FailingSink {
        accepted: usize,
    }

    impl EventSink for FailingSink {
        fn send(&mut self, _event: ButtonEvent) -> Result<()> {
            if self.accepted == 1 {
                anyhow::bail!("consumer went away");
            }
            self.accepted += 1;
            Ok(())
        }
    }

    #[test]
    fn json_lines_match_simulator_message() {
        let mut sink = JsonLineSink::new(Vec::new());
        let events = [
            ButtonEvent::press(Button::Right),
            ButtonEvent::release(Button::A),
        ];
        assert_eq!(dispatch(&mut sink, events).unwrap(), 2);

        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(
            output,
            "{\"button\":5,\"pressed\":true}\n{\"button\":0,\"pressed\":false}\n"
        );
    }

    #[test]
    fn dispatch_preserves_order() {
        let mut sink = VecSink::default();
        let events = vec![
            ButtonEvent::release(Button::Right),
            ButtonEvent::press(Button::Left),
            ButtonEvent::press(Button::A),
        ];
        dispatch(&mut sink, events.clone()).unwrap();
        assert_eq!(sink.events, events);
    }

    #[test]
    fn dispatch_stops_at_first_error() {
        let mut sink = FailingSink { accepted: 0 };
        let events = [
            ButtonEvent::press(Button::Left),
            ButtonEvent::press(Button::A),
            ButtonEvent::press(Button::B),
        ];
        assert!(dispatch(&mut sink, events).is_err());
        assert_eq!(sink.accepted, 1);
    }

    #[test]
    fn log_sink_accepts_everything() {
        let mut sink = LogSink;
        assert!(sink.send(ButtonEvent::press(Button::Menu)).is_ok());
    }
}
