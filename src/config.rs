//! Runtime configuration.
//!
//! Each value resolves as: command-line flag > non-blank environment
//! variable > built-in default. Resolution is done once in `main` and the
//! resulting `Config` is passed to handlers explicitly.

use anyhow::{Context, Result};
use url::Url;

pub const DEFAULT_API_URL: &str = "https://slack.com/api";
pub const DEFAULT_ROBOT_NAME: &str = "foobar";
pub const DEFAULT_ROBOT_IMAGE: &str = ":slack:";

pub const ENV_TOKEN: &str = "SLACK_TOKEN";
pub const ENV_COOKIE: &str = "SLACK_COOKIE";
pub const ENV_API_URL: &str = "SLACK_API_URL";
pub const ENV_ROBOT_NAME: &str = "SLACK_ROBOT_NAME";
pub const ENV_ROBOT_IMAGE: &str = "SLACK_ROBOT_IMAGE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub token: Option<String>,
    pub cookie: Option<String>,
    pub api_url: Url,
    /// Display name used by `chat.robotMessage`.
    pub robot_name: String,
    /// Emoji (`:name:`) or image URL used by `chat.robotMessage`.
    pub robot_image: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token: None,
            cookie: None,
            api_url: Url::parse(DEFAULT_API_URL).expect("default API URL is valid"),
            robot_name: DEFAULT_ROBOT_NAME.to_string(),
            robot_image: DEFAULT_ROBOT_IMAGE.to_string(),
        }
    }
}

/// Values supplied on the command line; `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub token: Option<String>,
    pub cookie: Option<String>,
    pub api_url: Option<String>,
}

impl Config {
    /// Resolve against the process environment.
    pub fn resolve(overrides: Overrides) -> Result<Self> {
        Self::resolve_with(overrides, |key| std::env::var(key).ok())
    }

    /// Resolve against an arbitrary variable lookup.
    pub fn resolve_with<F>(overrides: Overrides, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let pick = |flag: Option<String>, key: &str| {
            flag.filter(|v| !v.trim().is_empty())
                .or_else(|| env(key))
        };

        let raw_url = pick(overrides.api_url, ENV_API_URL)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_url = Url::parse(raw_url.trim())
            .with_context(|| format!("invalid API URL: '{raw_url}'"))?;
        if !matches!(api_url.scheme(), "http" | "https") {
            anyhow::bail!("API URL must use http or https: '{raw_url}'");
        }

        Ok(Self {
            token: pick(overrides.token, ENV_TOKEN),
            cookie: pick(overrides.cookie, ENV_COOKIE),
            api_url,
            robot_name: env(ENV_ROBOT_NAME).unwrap_or_else(|| DEFAULT_ROBOT_NAME.to_string()),
            robot_image: env(ENV_ROBOT_IMAGE).unwrap_or_else(|| DEFAULT_ROBOT_IMAGE.to_string()),
        })
    }
}
