use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::submission::TeamId;
use crate::teams::{Team, TeamRegistry};

/// Main configuration structure for Drop Warden
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DropWardenConfig {
    /// Owner user ids allowed to wipe the ledger. Empty collections
    /// vanish when the defaults are fed back through the layered config
    /// builder, so absence must deserialize as empty.
    #[serde(default)]
    pub owners: Vec<String>,
    /// Recognized submission categories
    pub categories: Vec<String>,
    /// Channel names the workflow checks against
    pub channels: ChannelConfig,
    /// Staff role
    pub staff: StaffConfig,
    /// Store settings
    pub store: StoreConfig,
    /// Observability settings
    pub observability: ObservabilityConfig,
    /// Notification behavior
    pub notify: NotifyConfig,
    /// Export settings
    pub export: ExportConfig,
    /// Reset confirmation settings
    pub reset: ResetConfig,
    /// Team roster
    pub teams: Vec<Team>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChannelConfig {
    /// Channel submissions must originate from
    pub intake: String,
    /// Staff-only channel receiving submission announcements
    pub review: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StaffConfig {
    /// Role required to confirm/reject submissions
    pub role_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Directory holding the state file and process lock
    pub state_dir: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level used when RUST_LOG is not set
    pub log_level: String,
    /// Emit JSON-formatted log lines
    pub json_logs: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotifyConfig {
    /// Mention the staff role on each new review-channel announcement
    pub mention_staff_on_submit: bool,
    /// Also announce new submissions to the submitter's team channel
    pub broadcast_submissions_to_team: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExportConfig {
    /// Maximum rendered chunk size for text delivery
    pub max_message_len: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResetConfig {
    /// Seconds an owner has to confirm a pending wipe
    pub confirmation_window_seconds: u64,
}

fn default_team(slug: &str, display_name: &str) -> Team {
    Team {
        id: TeamId(slug.to_string()),
        display_name: display_name.to_string(),
        role_name: format!("Team {display_name}"),
        channel_name: format!("team-{slug}"),
    }
}

impl Default for DropWardenConfig {
    fn default() -> Self {
        Self {
            channels: ChannelConfig {
                intake: "drop-submissions".to_string(),
                review: "drop-review".to_string(),
            },
            staff: StaffConfig {
                role_name: "Event Staff".to_string(),
            },
            owners: Vec::new(),
            teams: vec![
                default_team("rocnars-ramblers", "Rocnars Ramblers"),
                default_team("the-noobs", "The Noobs"),
                default_team("tile-snipers", "Tile Snipers"),
                default_team("leagues-waiting-room", "Leagues Waiting Room"),
                default_team("always-the-nubs", "Always the Nubs"),
                default_team("who-are-we", "Who Are We"),
                default_team("shadowless-monkeys", "Shadowless Monkeys"),
            ],
            categories: [
                "abyssal_sire",
                "artio",
                "callisto",
                "calvarion",
                "chambers_of_xeric",
                "chaos_elemental",
                "commander_zilyana",
                "dagannoth_kings",
                "general_graardor",
                "kalphite_queen",
                "king_black_dragon",
                "kraken",
                "kreearra",
                "kril_tsutsaroth",
                "nex",
                "scurrius",
                "the_gauntlet",
                "the_hueycoatl",
                "theatre_of_blood",
                "thermonuclear_smoke_devil",
                "tombs_of_amascut",
                "venenatis",
                "vetion",
                "vorkath",
                "zulrah",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
            store: StoreConfig {
                state_dir: ".drop-warden".to_string(),
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                json_logs: false,
            },
            notify: NotifyConfig {
                mention_staff_on_submit: true,
                broadcast_submissions_to_team: false,
            },
            export: ExportConfig {
                max_message_len: 1900,
            },
            reset: ResetConfig {
                confirmation_window_seconds: 30,
            },
        }
    }
}

impl DropWardenConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration file (drop-warden.toml)
    /// 3. Environment variables (prefixed with DROP_WARDEN_)
    pub fn load() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if Path::new("drop-warden.toml").exists() {
            builder = builder.add_source(File::with_name("drop-warden"));
        }

        builder = builder.add_source(
            Environment::with_prefix("DROP_WARDEN")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }

    /// Build the team/category lookup surface from this configuration.
    pub fn registry(&self) -> TeamRegistry {
        TeamRegistry::new(self.teams.clone(), self.categories.clone())
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<DropWardenConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        let _ = DropWardenConfig::load_env_file();
        DropWardenConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static DropWardenConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

/// Initialize configuration (called at startup)
pub fn init_config() -> Result<()> {
    let _config = config()?;
    tracing::info!("Configuration loaded successfully");
    Ok(())
}
