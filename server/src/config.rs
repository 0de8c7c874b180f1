use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Relay server for the drawing game.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct ServerArgs {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8099")]
    pub bind: String,

    /// Participant name that always joins as ADMIN
    #[arg(long, default_value = "SYSTEM")]
    pub admin_name: String,

    /// Connections beyond this are refused
    #[arg(long, default_value_t = 30)]
    pub max_online: usize,

    /// Word list, one word per line. A built-in list is used when absent.
    #[arg(long)]
    pub words: Option<PathBuf>,

    /// Quiet period after a live stroke before anyone may take over drawing
    #[arg(long, default_value_t = 30)]
    pub draw_cooldown_secs: u64,

    #[arg(long, default_value_t = 1200)]
    pub max_actions: usize,

    #[arg(long, default_value_t = 40_000)]
    pub max_segments: usize,

    #[arg(long, default_value_t = 600)]
    pub max_action_age_secs: u64,

    /// CORS origin to allow; repeatable. Any origin when none is given.
    #[arg(long = "allowed-origin")]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrokeLimits {
    pub max_actions: usize,
    pub max_segments: usize,
    pub max_age: Duration,
}

impl Default for StrokeLimits {
    fn default() -> Self {
        Self {
            max_actions: 1200,
            max_segments: 40_000,
            max_age: Duration::from_secs(600),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomConfig {
    pub admin_name: String,
    pub max_online: usize,
    pub draw_cooldown: Duration,
    pub limits: StrokeLimits,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            admin_name: "SYSTEM".into(),
            max_online: 30,
            draw_cooldown: Duration::from_secs(30),
            limits: StrokeLimits::default(),
        }
    }
}

impl From<&ServerArgs> for RoomConfig {
    fn from(args: &ServerArgs) -> Self {
        Self {
            admin_name: args.admin_name.clone(),
            max_online: args.max_online,
            draw_cooldown: Duration::from_secs(args.draw_cooldown_secs),
            limits: StrokeLimits {
                max_actions: args.max_actions.max(1),
                max_segments: args.max_segments.max(1),
                max_age: Duration::from_secs(args.max_action_age_secs),
            },
        }
    }
}
