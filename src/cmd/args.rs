/*!
Positional argument access for command handlers.

The dispatcher hands every handler an immutable `Arguments` value built from
the trailing positional vector of the process:

  index 0   the command name (`chat.postMessage`, `help`, ...)
  index 1.. handler-specific parameters

Reads are "soft": a missing or empty slot yields the caller's default, and a
number that fails to parse also yields the default. Validation is left to the
remote API, which reports bad input through the response envelope.
*/

/// Immutable positional argument list (command name at index 0).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Arguments {
    values: Vec<String>,
}

impl Arguments {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// The requested command name, if one was given and is non-empty.
    pub fn command(&self) -> Option<&str> {
        self.values
            .first()
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Raw argument at `index`, or `""` when absent.
    pub fn get(&self, index: usize) -> &str {
        self.values.get(index).map(String::as_str).unwrap_or("")
    }

    /// Argument at `index`, or `default` when absent or empty.
    pub fn string(&self, index: usize, default: &str) -> String {
        match self.get(index) {
            "" => default.to_string(),
            s => s.to_string(),
        }
    }

    /// Base-10 integer at `index`; `default` when absent, empty or malformed.
    pub fn number(&self, index: usize, default: i64) -> i64 {
        self.get(index).parse::<i64>().unwrap_or(default)
    }

    /// `true` only when the argument is the literal `"true"`.
    pub fn flag(&self, index: usize) -> bool {
        self.get(index) == "true"
    }
}
