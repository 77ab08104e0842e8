//! RTM events and the channel that carries them from the source thread to
//! the consumer.
//!
//! Frames are parsed leniently: anything that is not one of the known kinds
//! (including malformed JSON) becomes `Event::Unknown` with the raw payload.

use std::fmt;
use std::sync::mpsc;

use serde_json::Value;
use tokio::sync::oneshot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Hello,
    PresenceChange {
        user: String,
        presence: String,
    },
    Message {
        user: String,
        channel: String,
        text: String,
    },
    Error {
        text: String,
    },
    ReconnectUrl {
        url: String,
    },
    Unknown {
        type_name: String,
        raw: String,
    },
}

impl Event {
    /// Parse one websocket text frame.
    pub fn parse(raw: &str) -> Self {
        let value: Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(_) => {
                return Event::Unknown {
                    type_name: "invalid".to_string(),
                    raw: raw.to_string(),
                };
            }
        };

        let field = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        // Acks to client sends carry `reply_to` instead of a type.
        let type_name = match value.get("type").and_then(Value::as_str) {
            Some(t) if !t.is_empty() => t,
            _ if value.get("reply_to").is_some() => "reply",
            _ => "untyped",
        };

        match type_name {
            "hello" => Event::Hello,
            "presence_change" => Event::PresenceChange {
                user: field("user"),
                presence: field("presence"),
            },
            "message" => Event::Message {
                user: field("user"),
                channel: field("channel"),
                text: field("text"),
            },
            "error" => Event::Error {
                text: value
                    .pointer("/error/msg")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| {
                        value
                            .get("error")
                            .map(Value::to_string)
                            .unwrap_or_default()
                    }),
            },
            "reconnect_url" => Event::ReconnectUrl { url: field("url") },
            other => Event::Unknown {
                type_name: other.to_string(),
                raw: raw.to_string(),
            },
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Hello => f.write_str("hello; connection established"),
            Event::PresenceChange { user, presence } => write!(f, "presence; {user} => {presence}"),
            Event::Message {
                user,
                channel,
                text,
            } => write!(f, "message; {user}@{channel}: {text:?}"),
            Event::Error { text } => write!(f, "error; {text}"),
            Event::ReconnectUrl { url } => write!(f, "reconnect; {url}"),
            Event::Unknown { type_name, raw } => write!(f, "{type_name}; {raw}"),
        }
    }
}

/// Consumer end of an event stream: the sole read end plus the disconnect signal.
#[derive(Debug)]
pub struct EventChannel {
    pub events: mpsc::Receiver<Event>,
    pub disconnect: oneshot::Sender<()>,
}

/// Producer end: the sole write end plus the disconnect listener.
#[derive(Debug)]
pub struct EventSink {
    pub events: mpsc::Sender<Event>,
    pub disconnect: oneshot::Receiver<()>,
}

impl EventChannel {
    pub fn open() -> (EventChannel, EventSink) {
        let (events_tx, events_rx) = mpsc::channel();
        let (disconnect_tx, disconnect_rx) = oneshot::channel();
        (
            EventChannel {
                events: events_rx,
                disconnect: disconnect_tx,
            },
            EventSink {
                events: events_tx,
                disconnect: disconnect_rx,
            },
        )
    }
}
