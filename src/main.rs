use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Parser;

mod cmd;
mod config;
mod slack;
mod utils;

use cmd::{Arguments, Dispatcher, EXIT_USAGE, Registry};
use config::{Config, Overrides};
use slack::SlackClient;

const BINARY: &str = "slackcli";

/// slackcli - call Slack Web API methods from the command line
///
/// Layout:
///   slackcli [OPTIONS] <command> [params...]
///
/// Every command maps to one remote method; params are positional and are
/// listed by `slackcli help`. Output is one JSON document on stdout
/// (exit 0 on success, 1 when the call failed, 2 for an unknown command).
///
/// `slackcli rtm.events` instead streams one line per realtime event until
/// a message with the text "disconnect" arrives or the server closes.
///
/// Environment:
///   SLACK_TOKEN        Bearer token (or --token)
///   SLACK_COOKIE       Session cookie `d` value (or --cookie)
///   SLACK_API_URL      API base URL (or --api-url)
///   SLACK_ROBOT_NAME   Display name for chat.robotMessage
///   SLACK_ROBOT_IMAGE  Emoji (:name:) or image URL for chat.robotMessage
///
/// Examples:
///   slackcli auth.test
///   slackcli chat.postMessage C024BE91L "hello world"
///   slackcli users.list 200
#[derive(Parser, Debug)]
#[command(
    name = "slackcli",
    version,
    about = "slackcli - call Slack Web API methods from the command line",
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,

    /// API token (falls back to SLACK_TOKEN)
    #[arg(long, value_name = "TOKEN")]
    token: Option<String>,

    /// Session cookie (falls back to SLACK_COOKIE)
    #[arg(long, value_name = "COOKIE")]
    cookie: Option<String>,

    /// API base URL (falls back to SLACK_API_URL)
    #[arg(long = "api-url", value_name = "URL")]
    api_url: Option<String>,

    /// Command name followed by its positional parameters
    #[arg(
        value_name = "COMMAND",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    args: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    utils::init_logging(utils::derive_level(cli.verbose, cli.quiet));

    let config = match Config::resolve(Overrides {
        token: cli.token,
        cookie: cli.cookie,
        api_url: cli.api_url,
    }) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e:#}");
            std::process::exit(EXIT_USAGE);
        }
    };
    if config.token.is_none() && config.cookie.is_none() {
        tracing::debug!("no credentials configured; remote calls will be unauthenticated");
    }

    let client = SlackClient::new(&config).context("Failed to create Tokio runtime")?;

    let mut registry = Registry::new(BINARY);
    cmd::handlers::register_all(&mut registry);

    let args = Arguments::new(cli.args);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let code = Dispatcher::new(&registry, &client, &config).execute(&args, &mut out);
    out.flush().context("Failed to flush stdout")?;
    drop(out);

    std::process::exit(code);
}
