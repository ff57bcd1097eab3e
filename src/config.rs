use std::net::SocketAddr;

use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "todo-server", version, about = "HTTP JSON API for todo records")]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(long, env = "TODO_BIND", default_value = "127.0.0.1:8000")]
    pub bind: SocketAddr,

    /// SQLite URL, e.g. `sqlite:todo.db?mode=rwc`. Defaults to a database in
    /// the platform state directory.
    #[arg(long, env = "TODO_DATABASE_URL")]
    pub database_url: Option<String>,

    /// Log level for this service's crates
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

impl ServerConfig {
    pub fn log_filter(&self) -> String {
        format!(
            "warn,todo_server={level},todo_core={level},tower_http={level}",
            level = self.log_level
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_flags_override_defaults() {
        let config = ServerConfig::try_parse_from([
            "todo-server",
            "--bind",
            "0.0.0.0:9000",
            "--database-url",
            "sqlite::memory:",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(config.bind, "0.0.0.0:9000".parse().unwrap());
        assert_eq!(config.database_url.as_deref(), Some("sqlite::memory:"));
        assert_eq!(
            config.log_filter(),
            "warn,todo_server=debug,todo_core=debug,tower_http=debug"
        );
    }

    #[test]
    fn rejects_unparseable_bind_address() {
        assert!(ServerConfig::try_parse_from(["todo-server", "--bind", "localhost"]).is_err());
    }
}
