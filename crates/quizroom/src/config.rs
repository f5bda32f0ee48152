//! CLI configuration for the quiz room server binary.
//!
//! A single `clap`-derived struct with `env` fallbacks on every flag,
//! rather than a layered JSON-file config — the binary has a handful of
//! knobs, not a deployment matrix.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// Runtime configuration for `quizroom-server`.
#[derive(Parser, Debug, Clone)]
#[command(name = "quizroom-server")]
#[command(about = "Realtime multiplayer quiz room server")]
#[command(version)]
pub struct Config {
    /// Address to bind the combined HTTP + WebSocket listener on.
    #[arg(long, env = "QUIZROOM_BIND", default_value = "0.0.0.0:8080")]
    pub bind: SocketAddr,

    /// Directory the snapshot store writes its room-state document and
    /// critical-event log into. Created on startup if missing.
    #[arg(long, env = "QUIZROOM_SNAPSHOT_DIR", default_value = "./data")]
    pub snapshot_dir: PathBuf,

    /// How often the snapshot store exports every live room, in seconds
    /// (spec's periodic export cadence).
    #[arg(long, env = "QUIZROOM_SNAPSHOT_INTERVAL_SECS", default_value_t = 30)]
    pub snapshot_interval_secs: u64,

    /// How often the room registry sweeps for stale rooms, in seconds.
    #[arg(long, env = "QUIZROOM_SWEEP_INTERVAL_SECS", default_value_t = 1800)]
    pub sweep_interval_secs: u64,

    /// Allowed CORS origin. Repeat the flag for multiple origins; if
    /// omitted, no cross-origin requests are allowed.
    #[arg(long = "cors-origin", env = "QUIZROOM_CORS_ORIGIN", value_delimiter = ',')]
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn snapshot_interval(&self) -> Duration {
        Duration::from_secs(self.snapshot_interval_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.snapshot_dir.join("rooms.json")
    }

    pub fn critical_log_path(&self) -> PathBuf {
        self.snapshot_dir.join("events.jsonl")
    }

    pub fn analytics_log_path(&self) -> PathBuf {
        self.snapshot_dir.join("analytics.jsonl")
    }

    pub fn recap_archive_path(&self) -> PathBuf {
        self.snapshot_dir.join("recaps.jsonl")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bind_is_all_interfaces_on_8080() {
        let config = Config::parse_from(["quizroom-server"]);
        assert_eq!(config.bind, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert!(config.cors_origins.is_empty());
    }

    #[test]
    fn cors_origin_flag_can_repeat_via_delimiter() {
        let config = Config::parse_from([
            "quizroom-server",
            "--cors-origin",
            "https://a.example,https://b.example",
        ]);
        assert_eq!(config.cors_origins, vec!["https://a.example", "https://b.example"]);
    }

    #[test]
    fn snapshot_paths_are_nested_under_the_snapshot_dir() {
        let config = Config::parse_from(["quizroom-server", "--snapshot-dir", "/tmp/quizroom"]);
        assert_eq!(config.snapshot_path(), PathBuf::from("/tmp/quizroom/rooms.json"));
        assert_eq!(config.critical_log_path(), PathBuf::from("/tmp/quizroom/events.jsonl"));
    }
}
