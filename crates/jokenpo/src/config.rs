//! Server configuration.
//!
//! Every setting can be given as a command-line flag or as a `JOKENPO_*`
//! environment variable (a `.env` file is loaded first by the binary).
//! Flags win over the environment.

use std::num::ParseIntError;
use std::time::Duration;

use clap::Parser;

/// Settings for a Jokenpo server.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "jokenpo-server")]
#[command(about = "Rock-paper-scissors match server", long_about = None)]
#[command(version)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to
    #[arg(long = "bind", env = "JOKENPO_BIND", default_value = "0.0.0.0:8081")]
    pub bind_addr: String,

    /// Token required by the room provisioning messages. Unset or empty
    /// disables them entirely
    #[arg(long, env = "JOKENPO_ADMIN_TOKEN", hide_env_values = true)]
    pub admin_token: Option<String>,

    /// Seconds a finished room stays reachable so players can read the
    /// final result
    #[arg(
        long = "finished-grace-secs",
        env = "JOKENPO_FINISHED_GRACE_SECS",
        default_value = "30",
        value_parser = parse_secs
    )]
    pub finished_grace: Duration,

    /// Hard upper bound on a room's lifetime, in seconds. A match still
    /// unfinished after this long is evicted
    #[arg(
        long = "room-ttl-secs",
        env = "JOKENPO_ROOM_TTL_SECS",
        default_value = "3600",
        value_parser = parse_secs
    )]
    pub room_ttl: Duration,

    /// A connection that sends nothing for this many seconds is closed
    #[arg(
        long = "idle-timeout-secs",
        env = "JOKENPO_IDLE_TIMEOUT_SECS",
        default_value = "120",
        value_parser = parse_secs
    )]
    pub idle_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8081".to_string(),
            admin_token: None,
            finished_grace: Duration::from_secs(30),
            room_ttl: Duration::from_secs(60 * 60),
            idle_timeout: Duration::from_secs(120),
        }
    }
}

impl ServerConfig {
    /// The admin token, or `None` when provisioning is disabled.
    pub fn admin_token(&self) -> Option<&str> {
        self.admin_token.as_deref().filter(|token| !token.is_empty())
    }
}

fn parse_secs(value: &str) -> Result<Duration, ParseIntError> {
    value.trim().parse().map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_command_definition_is_valid() {
        ServerConfig::command().debug_assert();
    }

    #[test]
    fn test_parse_from_flags() {
        let config = ServerConfig::try_parse_from([
            "jokenpo-server",
            "--bind",
            "127.0.0.1:9000",
            "--admin-token",
            "s3cret",
            "--finished-grace-secs",
            "5",
            "--room-ttl-secs",
            " 600 ",
            "--idle-timeout-secs",
            "10",
        ])
        .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.admin_token.as_deref(), Some("s3cret"));
        assert_eq!(config.finished_grace, Duration::from_secs(5));
        assert_eq!(config.room_ttl, Duration::from_secs(600));
        assert_eq!(config.idle_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_parse_rejects_bad_duration() {
        let err = ServerConfig::try_parse_from(["jokenpo-server", "--room-ttl-secs", "an hour"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        assert!(err.to_string().contains("an hour"));
    }

    #[test]
    fn test_admin_token_empty_disables_provisioning() {
        let config = ServerConfig {
            admin_token: Some(String::new()),
            ..ServerConfig::default()
        };
        assert_eq!(config.admin_token(), None);

        let config = ServerConfig::try_parse_from(["jokenpo-server", "--admin-token", "t"]).unwrap();
        assert_eq!(config.admin_token(), Some("t"));
    }

    #[test]
    fn test_parse_secs() {
        assert_eq!(parse_secs("42").unwrap(), Duration::from_secs(42));
        assert!(parse_secs("-1").is_err());
        assert!(parse_secs("").is_err());
    }

    #[test]
    fn test_default_matches_documented_values() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, "0.0.0.0:8081");
        assert!(config.admin_token.is_none());
        assert_eq!(config.finished_grace, Duration::from_secs(30));
        assert_eq!(config.room_ttl, Duration::from_secs(3600));
        assert_eq!(config.idle_timeout, Duration::from_secs(120));
    }
}
