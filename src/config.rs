//! Process-wide settings read from the environment (and `.env`).
//!
//! Every setting has a development default, so the server starts with no
//! configuration at all. Unparsable values are logged and replaced by the
//! default.

use log::warn;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

pub static CONFIG: LazyLock<AppConfig> = LazyLock::new(AppConfig::from_env);

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Env: `DATABASE_URL`
    pub database_url: String,
    /// Env: `DATABASE_MAX_CONNECTIONS`
    pub database_max_connections: u32,
    /// Env: `BIND_ADDR`
    pub bind_addr: SocketAddr,
    /// How often expired messages and stories are swept.
    /// Env: `SWEEP_INTERVAL_SECS`
    pub sweep_interval: Duration,
    /// Env: `MEDIA_DIR`
    pub media_dir: PathBuf,
    /// Prefix of the URLs handed out for uploaded media.
    /// Env: `MEDIA_BASE_URL`
    pub media_base_url: String,
    /// Env: `MAX_MEDIA_BYTES`
    pub max_media_bytes: usize,
    /// Env: `CORS_ORIGINS` (comma separated)
    pub cors_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:ephemeral.db?mode=rwc".to_owned(),
            database_max_connections: 5,
            bind_addr: ([0, 0, 0, 0], 3000).into(),
            sweep_interval: Duration::from_secs(300),
            media_dir: PathBuf::from("./media"),
            media_base_url: "/media/files".to_owned(),
            max_media_bytes: 50 * 1024 * 1024,
            cors_origins: vec![
                "http://localhost:3000".to_owned(),
                "http://localhost:5173".to_owned(),
            ],
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = AppConfig::default();

        let sweep_secs = parse_var("SWEEP_INTERVAL_SECS", defaults.sweep_interval.as_secs()).max(1);

        Self {
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            database_max_connections: parse_var(
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            )
            .max(1),
            bind_addr: parse_var("BIND_ADDR", defaults.bind_addr),
            sweep_interval: Duration::from_secs(sweep_secs),
            media_dir: env::var("MEDIA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.media_dir),
            media_base_url: env::var("MEDIA_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_owned())
                .unwrap_or(defaults.media_base_url),
            max_media_bytes: parse_var("MAX_MEDIA_BYTES", defaults.max_media_bytes),
            cors_origins: env::var("CORS_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(str::trim)
                        .filter(|origin| !origin.is_empty())
                        .map(str::to_owned)
                        .collect()
                })
                .unwrap_or(defaults.cors_origins),
        }
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{name}={raw:?} is not valid, using the default");
            default
        }),
        Err(_) => default,
    }
}
