/*!
`rtm.events`: consume the realtime event stream until it ends.

Lifecycle:

  Connecting -> Open -> Draining -> Closed

  Connecting  `RemoteApi::connect_events` negotiates the stream; a failure
              prints a failure envelope and exits 1.
  Open        one event per iteration, in arrival order.
  Draining    entered when a message's text is exactly "disconnect" (the
              disconnect signal is fired once) or when the source closes.
              Remaining events are still printed.
  Closed      the channel is exhausted; prints the stop line, exits 0.

There is no timeout: a source that never sends and never closes blocks
forever.
*/

use std::io::Write;

use tokio::sync::oneshot;

use super::EXIT_OK;
use super::dispatch::Context;
use super::render::render_failure;
use crate::slack::{Event, EventChannel};

/// In-band control text that ends the stream.
pub const DISCONNECT_TEXT: &str = "disconnect";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Connecting,
    Open,
    Draining,
    Closed,
}

/// Why the stream stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Disconnected,
    RemoteClosed,
}

impl StopReason {
    fn line(self) -> &'static str {
        match self {
            StopReason::Disconnected => "stopped; disconnect requested",
            StopReason::RemoteClosed => "stopped; closed by remote",
        }
    }
}

pub struct EventStreamConsumer {
    channel: EventChannel,
    state: StreamState,
}

impl EventStreamConsumer {
    /// Wrap a connected channel; the consumer starts in `Open`.
    pub fn new(channel: EventChannel) -> Self {
        Self {
            channel,
            state: StreamState::Open,
        }
    }

    /// Blocking receive loop. Returns once the channel is exhausted.
    pub fn run(self, out: &mut dyn Write) -> StopReason {
        let EventChannel { events, disconnect } = self.channel;
        let mut disconnect: Option<oneshot::Sender<()>> = Some(disconnect);
        let mut state = self.state;
        let mut reason = StopReason::RemoteClosed;

        for event in events.iter() {
            let line = match &event {
                Event::Message { user, channel, text } if text == DISCONNECT_TEXT => {
                    if let Some(signal) = disconnect.take() {
                        tracing::info!(%user, %channel, "disconnect requested");
                        // Err only means the source already stopped.
                        let _ = signal.send(());
                        reason = StopReason::Disconnected;
                        state = StreamState::Draining;
                    }
                    continue;
                }
                Event::Error { text } => {
                    tracing::warn!(error = %text, "stream error event");
                    event.to_string()
                }
                _ => event.to_string(),
            };
            if let Err(e) = writeln!(out, "{line}") {
                tracing::error!(error = %e, "failed to write event line");
            }
        }

        if state == StreamState::Open {
            tracing::info!("event stream closed by remote");
        }
        state = StreamState::Closed;
        tracing::debug!(?state, ?reason, "event stream finished");

        if let Err(e) = writeln!(out, "{}", reason.line()) {
            tracing::error!(error = %e, "failed to write stop line");
        }
        reason
    }
}

/// Handler for `rtm.events`.
pub fn rtm_events(ctx: &mut Context<'_>) -> i32 {
    tracing::debug!(state = ?StreamState::Connecting, "opening event stream");
    let channel = match ctx.api.connect_events() {
        Ok(channel) => channel,
        Err(e) => return render_failure(format!("rtm.events; {e}"), ctx.out),
    };

    EventStreamConsumer::new(channel).run(ctx.out);
    EXIT_OK
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::Registry;
    use crate::cmd::testing::{FakeApi, run_handler};
    use crate::slack::event::EventSink;
    use std::thread;
    use std::time::Duration;

    fn message(text: &str) -> Event {
        Event::Message {
            user: "U1".into(),
            channel: "C1".into(),
            text: text.into(),
        }
    }

    /// Feed `events` from a separate thread, then close. Fails if the
    /// consumer never fires the disconnect signal while `wait_for_disconnect`.
    fn source(
        events: Vec<Event>,
        wait_for_disconnect: bool,
    ) -> (EventChannel, thread::JoinHandle<bool>) {
        let (channel, sink) = EventChannel::open();
        let handle = thread::spawn(move || {
            let EventSink { events: tx, disconnect } = sink;
            for event in events {
                tx.send(event).unwrap();
            }
            if wait_for_disconnect {
                disconnect.blocking_recv().is_ok()
            } else {
                false
            }
        });
        (channel, handle)
    }

    fn consume(channel: EventChannel) -> (StopReason, String) {
        let mut out = Vec::new();
        let reason = EventStreamConsumer::new(channel).run(&mut out);
        (reason, String::from_utf8(out).unwrap())
    }

    #[test]
    fn events_are_printed_in_order() {
        let (channel, handle) = source(
            vec![
                Event::Hello,
                Event::PresenceChange {
                    user: "U2".into(),
                    presence: "away".into(),
                },
                message("hi there"),
                Event::Error {
                    text: "rate limited".into(),
                },
                Event::ReconnectUrl {
                    url: "wss://example/next".into(),
                },
                Event::Unknown {
                    type_name: "user_typing".into(),
                    raw: "{\"type\":\"user_typing\"}".into(),
                },
            ],
            false,
        );
        let (reason, out) = consume(channel);
        handle.join().unwrap();

        assert_eq!(reason, StopReason::RemoteClosed);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            [
                "hello; connection established",
                "presence; U2 => away",
                "message; U1@C1: \"hi there\"",
                "error; rate limited",
                "reconnect; wss://example/next",
                "user_typing; {\"type\":\"user_typing\"}",
                "stopped; closed by remote",
            ]
        );
    }

    #[test]
    fn disconnect_message_signals_source_and_stops_normally() {
        let (channel, handle) = source(vec![Event::Hello, message("disconnect")], true);
        let (reason, out) = consume(channel);
        assert!(handle.join().unwrap(), "source received the disconnect signal");

        assert_eq!(reason, StopReason::Disconnected);
        assert!(!out.contains("message;"), "control text is not echoed");
        assert!(out.ends_with("stopped; disconnect requested\n"));
    }

    #[test]
    fn events_after_disconnect_are_drained() {
        let (channel, handle) = source(
            vec![message("disconnect"), message("late"), message("disconnect")],
            false,
        );
        let (reason, out) = consume(channel);
        handle.join().unwrap();

        assert_eq!(reason, StopReason::Disconnected);
        assert_eq!(
            out,
            "message; U1@C1: \"late\"\nstopped; disconnect requested\n"
        );
    }

    #[test]
    fn error_events_do_not_end_the_stream() {
        let (channel, handle) = source(
            vec![
                Event::Error { text: "first".into() },
                Event::Error { text: "second".into() },
                Event::Hello,
            ],
            false,
        );
        let (_, out) = consume(channel);
        handle.join().unwrap();
        assert_eq!(out.lines().count(), 4);
    }

    #[test]
    fn silent_source_blocks_until_it_closes() {
        // No timeout exists: a source that neither sends nor closes keeps the
        // consumer waiting. Observe that, then release it by closing.
        let (channel, sink) = EventChannel::open();
        let consumer = thread::spawn(move || consume(channel));

        thread::sleep(Duration::from_millis(100));
        assert!(!consumer.is_finished(), "consumer waits on a silent source");

        drop(sink);
        let (reason, out) = consumer.join().unwrap();
        assert_eq!(reason, StopReason::RemoteClosed);
        assert_eq!(out, "stopped; closed by remote\n");
    }

    #[test]
    fn handler_reports_connect_failure_as_envelope() {
        let mut registry = Registry::new("slackcli");
        registry.register("rtm.events", rtm_events, &[], "");
        let command = registry.find("rtm.events").unwrap();

        let (code, out) = run_handler(&registry, command, &FakeApi::default(), &["rtm.events"]);
        assert_eq!(code, 1);
        assert_eq!(
            out,
            "{\"ok\":false,\"error\":\"rtm.events; missing websocket url\"}\n"
        );
    }

    #[test]
    fn handler_exits_zero_when_stream_ends() {
        let (channel, handle) = source(vec![Event::Hello, message("disconnect")], true);
        let api = FakeApi::default().with_events(channel);

        let mut registry = Registry::new("slackcli");
        registry.register("rtm.events", rtm_events, &[], "");
        let command = registry.find("rtm.events").unwrap();

        let (code, out) = run_handler(&registry, command, &api, &["rtm.events"]);
        assert!(handle.join().unwrap());
        assert_eq!(code, 0);
        assert_eq!(
            out,
            "hello; connection established\nstopped; disconnect requested\n"
        );
    }
}
