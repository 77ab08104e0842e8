/*!
Dispatch: resolve the requested command and run it.

  1. command = argument 0, or "help" when absent/empty
  2. look it up in the registry
  3. found     -> run the handler, its return value is the exit code
  4. not found -> run "help" (or the built-in help text) and exit 2

Exit code 2 is reserved for "command not recognized"; 1 means the command
ran and failed.
*/

use std::io::Write;

use super::args::Arguments;
use super::registry::Registry;
use super::{EXIT_OK, EXIT_USAGE, HELP_COMMAND};
use crate::config::Config;
use crate::slack::RemoteApi;

/// Everything a handler may read, passed explicitly on every invocation.
pub struct Context<'a> {
    pub args: &'a Arguments,
    pub registry: &'a Registry,
    pub api: &'a dyn RemoteApi,
    pub config: &'a Config,
    pub out: &'a mut dyn Write,
}

pub struct Dispatcher<'a> {
    registry: &'a Registry,
    api: &'a dyn RemoteApi,
    config: &'a Config,
}

impl<'a> Dispatcher<'a> {
    pub fn new(registry: &'a Registry, api: &'a dyn RemoteApi, config: &'a Config) -> Self {
        Self {
            registry,
            api,
            config,
        }
    }

    pub fn execute(&self, args: &Arguments, out: &mut dyn Write) -> i32 {
        let name = args.command().unwrap_or(HELP_COMMAND);
        let mut ctx = Context {
            args,
            registry: self.registry,
            api: self.api,
            config: self.config,
            out,
        };

        if let Some(command) = self.registry.find(name) {
            tracing::debug!(command = name, "dispatching");
            return (command.handler)(&mut ctx);
        }

        tracing::warn!(command = name, "unknown command; showing help");
        match self.registry.find(HELP_COMMAND) {
            Some(help) => {
                (help.handler)(&mut ctx);
            }
            None => {
                write_builtin_help(&mut ctx);
            }
        }
        EXIT_USAGE
    }
}

/// Help renderer used by the `help` command and when none is registered.
pub fn write_builtin_help(ctx: &mut Context<'_>) -> i32 {
    if let Err(e) = ctx.registry.write_help(ctx.out) {
        tracing::error!(error = %e, "failed to write help");
    }
    EXIT_OK
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::testing::FakeApi;
    use crate::cmd::{EXIT_FAILURE, EXIT_OK};

    fn registry() -> Registry {
        let mut registry = Registry::new("slackcli");
        registry.register(
            "auth.test",
            |ctx| {
                let _ = writeln!(ctx.out, "auth {}", ctx.args.get(1));
                EXIT_OK
            },
            &[],
            "Checks authentication and identity",
        );
        registry.register("broken", |_| EXIT_FAILURE, &[], "Always fails");
        registry.register(
            HELP_COMMAND,
            write_builtin_help,
            &[],
            "Displays usage and program options",
        );
        registry
    }

    fn run(registry: &Registry, argv: &[&str]) -> (i32, String) {
        let api = FakeApi::default();
        let config = Config::default();
        let mut out = Vec::new();
        let code = Dispatcher::new(registry, &api, &config)
            .execute(&Arguments::new(argv.iter().copied()), &mut out);
        (code, String::from_utf8(out).unwrap())
    }

    #[test]
    fn no_command_behaves_like_help() {
        let registry = registry();
        let explicit = run(&registry, &["help"]);
        assert_eq!(run(&registry, &[]), explicit);
        assert_eq!(run(&registry, &[""]), explicit);
        assert_eq!(explicit.0, EXIT_OK);
        assert!(explicit.1.contains("auth.test"));
    }

    #[test]
    fn unknown_command_shows_help_with_usage_code() {
        let registry = registry();
        let (_, help_text) = run(&registry, &["help"]);
        for name in ["auth.tset", "nope", "chat.postmessage"] {
            let (code, out) = run(&registry, &[name, "x"]);
            assert_eq!(code, EXIT_USAGE, "{name}");
            assert_eq!(out, help_text, "{name}");
        }
    }

    #[test]
    fn unknown_command_without_registered_help_uses_builtin() {
        let mut registry = Registry::new("slackcli");
        registry.register("auth.test", |_| EXIT_OK, &[], "Checks authentication");
        let (code, out) = run(&registry, &["missing"]);
        assert_eq!(code, EXIT_USAGE);
        assert!(out.starts_with("Usage:"));
        assert!(out.contains("slackcli auth.test"));
    }

    #[test]
    fn handler_exit_code_is_returned() {
        let registry = registry();
        assert_eq!(run(&registry, &["broken"]).0, EXIT_FAILURE);
        let (code, out) = run(&registry, &["auth.test", "T1"]);
        assert_eq!(code, EXIT_OK);
        assert_eq!(out, "auth T1\n");
    }
}
