/*!
Command layer.

  args.rs      positional argument access (`Arguments`)
  render.rs    result -> JSON payload + exit code
  registry.rs  ordered command table + help layout
  dispatch.rs  command resolution (`Dispatcher`, `Context`)
  handlers.rs  the remote operation table and bespoke commands
  events.rs    `rtm.events` consumer

Conventions:
  - Handlers return the process exit code; they never panic or bubble errors.
  - Everything printed on stdout by a request/response handler is exactly one
    JSON payload.
*/

pub mod args;
pub mod dispatch;
pub mod events;
pub mod handlers;
pub mod registry;
pub mod render;

pub use args::Arguments;
pub use dispatch::Dispatcher;
pub use registry::Registry;

pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_USAGE: i32 = 2;

pub const HELP_COMMAND: &str = "help";
