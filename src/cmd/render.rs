/*!
render.rs

Turns a handler's result into the single JSON payload written to stdout and
the process exit code.

Every result goes through the same rule, whatever its concrete type:

  1. serialize (pretty, two-space indent)
  2. re-parse the serialized text as an `Envelope` ({ok, error})
  3. decide:
       encode failure             -> {"ok":false,"error":"encode error: ..."}  exit 1
       decode failure             -> {"ok":false,"error":"decode error: ..."}  exit 1
       ok == false, error != ""   -> the envelope itself                       exit 1
       otherwise                  -> the original serialized text              exit 0

Failure payloads are always complete envelopes, never partial output.
*/

use std::io::Write;

use serde::{Deserialize, Serialize};

use super::{EXIT_FAILURE, EXIT_OK};

/// The subset of every remote response used to judge success.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub ok: bool,
    /// Absent and `null` both decode to `None`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Envelope {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
        }
    }

    /// Failure text, empty when there is none.
    pub fn error_text(&self) -> &str {
        self.error.as_deref().unwrap_or_default()
    }
}

/// Serialize `value`, judge it by its envelope, print it, return the exit code.
pub fn render<T>(value: &T, out: &mut dyn Write) -> i32
where
    T: Serialize + ?Sized,
{
    let serialized = match serde_json::to_string_pretty(value) {
        Ok(s) => s,
        Err(e) => return render_failure(format!("encode error: {e}"), out),
    };

    let envelope: Envelope = match serde_json::from_str(&serialized) {
        Ok(env) => env,
        Err(e) => return render_failure(format!("decode error: {e}"), out),
    };

    if !envelope.ok && !envelope.error_text().is_empty() {
        tracing::debug!(error = envelope.error_text(), "remote operation reported failure");
        emit_envelope(&envelope, out);
        return EXIT_FAILURE;
    }

    if let Err(e) = writeln!(out, "{serialized}") {
        tracing::error!(error = %e, "failed to write response");
        return EXIT_FAILURE;
    }
    EXIT_OK
}

/// Print a synthetic failure envelope carrying `message`; always exit 1.
pub fn render_failure(message: impl Into<String>, out: &mut dyn Write) -> i32 {
    emit_envelope(&Envelope::failure(message), out);
    EXIT_FAILURE
}

fn emit_envelope(envelope: &Envelope, out: &mut dyn Write) {
    // A bool plus an optional string cannot fail to serialize.
    let line = serde_json::to_string(envelope)
        .unwrap_or_else(|_| String::from(r#"{"ok":false}"#));
    if let Err(e) = writeln!(out, "{line}") {
        tracing::error!(error = %e, "failed to write failure envelope");
    }
}
