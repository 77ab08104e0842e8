/*!
Command registry: an ordered table of `{name, handler, params, help}` records.

Insertion order drives the help layout. Lookup goes through a name index
that is overwritten on every registration, so when a name is registered
more than once the LAST registration wins. `enumerate` still yields every
record in the order it was added.
*/

use std::collections::HashMap;
use std::io::{self, Write};

use super::dispatch::Context;

/// A command body. Reads everything it needs from the `Context`.
pub type Handler = Box<dyn Fn(&mut Context<'_>) -> i32>;

pub struct Command {
    pub name: String,
    pub handler: Handler,
    /// Labels shown in help only; never enforced at dispatch time.
    pub params: Vec<String>,
    pub help: String,
}

impl Command {
    /// `name [param1] [param2] ...`
    pub fn usage(&self) -> String {
        let mut line = self.name.clone();
        for param in &self.params {
            line.push_str(" [");
            line.push_str(param);
            line.push(']');
        }
        line
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("help", &self.help)
            .finish_non_exhaustive()
    }
}

pub struct Registry {
    binary: String,
    commands: Vec<Command>,
    index: HashMap<String, usize>,
}

impl Registry {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            commands: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Append a command. Re-registering a name shadows the earlier record.
    pub fn register<F>(&mut self, name: &str, handler: F, params: &[&str], help: &str)
    where
        F: Fn(&mut Context<'_>) -> i32 + 'static,
    {
        if self.index.contains_key(name) {
            tracing::debug!(command = name, "command registered twice; last registration wins");
        }
        self.index.insert(name.to_string(), self.commands.len());
        self.commands.push(Command {
            name: name.to_string(),
            handler: Box::new(handler),
            params: params.iter().map(|p| (*p).to_string()).collect(),
            help: help.to_string(),
        });
    }

    pub fn find(&self, name: &str) -> Option<&Command> {
        self.index.get(name).map(|&i| &self.commands[i])
    }

    /// All registrations, in registration order.
    pub fn enumerate(&self) -> &[Command] {
        &self.commands
    }

    /// Width of the usage column: the longest `name [param] ...` string.
    pub fn usage_width(&self) -> usize {
        self.commands
            .iter()
            .map(|c| c.usage().len())
            .max()
            .unwrap_or(0)
    }

    /// Usage banner plus one aligned line per command.
    pub fn write_help(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "Usage:")?;
        writeln!(out, "  {} [OPTIONS] [COMMAND] [PARAMS]...", self.binary)?;
        writeln!(out)?;
        writeln!(out, "Commands:")?;

        let width = self.usage_width();
        for command in self.enumerate() {
            writeln!(
                out,
                "  {} {:<width$} {}",
                self.binary,
                command.usage(),
                command.help,
            )?;
        }
        Ok(())
    }
}
