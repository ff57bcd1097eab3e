use std::time::Duration;

use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "todo", version, about = "Terminal client for the todo service")]
pub struct Cli {
    /// Base URL of the todo API
    #[arg(long, env = "TODO_API_URL", default_value = "http://localhost:8000/api")]
    pub api_url: String,

    /// Request timeout in seconds
    #[arg(long, env = "TODO_TIMEOUT_SECS", default_value_t = 10)]
    pub timeout_secs: u64,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Fetch the list once and report whether the service answered
    Check,
}

impl Cli {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn flags_and_subcommand_parse() {
        let cli = Cli::try_parse_from([
            "todo",
            "--api-url",
            "http://todo.lan:9000/api",
            "--timeout-secs",
            "3",
            "check",
        ])
        .unwrap();

        assert_eq!(cli.api_url, "http://todo.lan:9000/api");
        assert_eq!(cli.timeout(), Duration::from_secs(3));
        assert_eq!(cli.command, Some(Command::Check));
    }

    #[test]
    fn rejects_non_numeric_timeout() {
        assert!(Cli::try_parse_from(["todo", "--timeout-secs", "soon"]).is_err());
    }
}
