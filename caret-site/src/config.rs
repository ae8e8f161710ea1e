//! Configuration loading for the site server.
//!
//! Loads configuration from TOML files and/or environment variables using figment.
//!
//! # Configuration Sources (in order of priority, lowest to highest)
//!
//! 1. Default values (from `#[serde(default)]` attributes)
//! 2. TOML config file (if provided)
//! 3. Environment variables (prefix: `CARET_`, nested with `__`)
//!
//! # Environment Variable Naming
//!
//! - `CARET_BACKEND__URL` → `backend.url`
//! - `CARET_BACKEND__ANON_KEY` → `backend.anon_key`
//! - `CARET_SERVER__LISTEN_ADDR` → `server.listen_addr`
//! - `CARET_SITE__BRAND` → `site.brand`
//! - `CARET_SITE__DARK_MODE` → `site.dark_mode`

use anyhow::{Context, Result, anyhow};
use chrono::{Duration, Utc};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::site::brand::BrandPreset;

/// Environment variable prefix for configuration overrides
const ENV_PREFIX: &str = "CARET_";

/// Main configuration for the site server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Hosted backend (Supabase project) settings
    pub backend: BackendConfig,

    /// Admin panel settings
    #[serde(default)]
    pub admin: AdminConfig,

    /// Public site settings (brand, theme)
    #[serde(default)]
    pub site: SiteConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Address to listen on
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

/// Supabase project configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Project URL, e.g. `https://abcd1234.supabase.co`
    pub url: String,

    /// Public anon key (row-level security decides what it may do)
    pub anon_key: String,

    /// Optional per-request timeout. Unset means the HTTP client's defaults.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

/// Admin panel configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AdminConfig {
    /// How long a server-side admin session lives without logging in again
    #[serde(default = "default_session_timeout")]
    pub session_timeout_secs: u64,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            session_timeout_secs: default_session_timeout(),
        }
    }
}

impl AdminConfig {
    /// Session lifetime as a duration that can be added to the current time.
    pub fn session_timeout(&self) -> Result<Duration> {
        let too_long = || {
            anyhow!(
                "admin.session_timeout_secs is too large: {}",
                self.session_timeout_secs
            )
        };

        let secs = i64::try_from(self.session_timeout_secs).map_err(|_| too_long())?;
        let timeout = Duration::try_seconds(secs).ok_or_else(too_long)?;
        Utc::now().checked_add_signed(timeout).ok_or_else(too_long)?;
        Ok(timeout)
    }
}

fn default_session_timeout() -> u64 {
    24 * 60 * 60
}

/// Public site configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SiteConfig {
    /// Which brand preset to render
    #[serde(default)]
    pub brand: BrandPreset,

    /// Theme for visitors without a theme cookie
    #[serde(default = "default_dark_mode")]
    pub dark_mode: bool,

    /// Optional overrides applied on top of the preset
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub site_url: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub social_handle: Option<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            brand: BrandPreset::default(),
            dark_mode: default_dark_mode(),
            name: None,
            tagline: None,
            description: None,
            site_url: None,
            contact_email: None,
            social_handle: None,
        }
    }
}

fn default_dark_mode() -> bool {
    true
}

impl Config {
    /// Load configuration from TOML file and environment variables.
    ///
    /// Configuration sources are merged in order (later sources override earlier):
    /// 1. TOML config file (if it exists)
    /// 2. Environment variables (prefix: `CARET_`, nested with `__`)
    pub fn load(path: &Path) -> Result<Self> {
        Self::extract(Self::layered(Figment::new(), path), path)
    }

    /// Configuration for dry-run mode, where no backend credentials are needed.
    ///
    /// Same layering as [`Config::load`] on top of placeholder backend
    /// settings, so a partial file still applies. A file that fails to parse
    /// is an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        let defaults = Config {
            server: ServerConfig::default(),
            backend: BackendConfig {
                url: "http://localhost:54321".to_string(),
                anon_key: "dry-run".to_string(),
                request_timeout_secs: None,
            },
            admin: AdminConfig::default(),
            site: SiteConfig::default(),
        };

        Self::extract(
            Self::layered(Figment::from(Serialized::defaults(defaults)), path),
            path,
        )
    }

    fn layered(mut figment: Figment, path: &Path) -> Figment {
        if path.exists() {
            figment = figment.merge(Toml::file(path));
        }

        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    fn extract(figment: Figment, path: &Path) -> Result<Self> {
        let config: Config = figment.extract().with_context(|| {
            format!(
                "Failed to load config from {} and environment",
                path.display()
            )
        })?;

        config
            .admin
            .session_timeout()
            .with_context(|| format!("Invalid config in {}", path.display()))?;

        Ok(config)
    }

    /// Get the default config file path
    /// - macOS: ~/Library/Application Support/caret-site/config.toml
    /// - Linux: ~/.config/caret-site/config.toml
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("caret-site")
            .join("config.toml")
    }

    /// Get the default data directory (logs)
    /// - macOS: ~/Library/Application Support/caret-site/
    /// - Linux: ~/.local/share/caret-site/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("caret-site")
    }
}

/// Create a default configuration template
pub fn default_config_template() -> String {
    r#"# Caret Site Configuration
#
# Every value can also be set through the environment, e.g.
#   CARET_BACKEND__ANON_KEY=... caret-site serve

[server]
listen_addr = "0.0.0.0:8080"

# =============================================================================
# Hosted backend (Supabase)
# =============================================================================
#
# Tables expected: contact_messages, newsletter_subscribers
# (newsletter_subscribers.email must carry a unique constraint).
# The admin operator signs in with an account from the project's auth users.

[backend]
url = "https://your-project.supabase.co"
anon_key = "your-anon-key"
# request_timeout_secs = 30   # unset: no client-side timeout

[admin]
session_timeout_secs = 86400

# =============================================================================
# Site
# =============================================================================
#
# brand selects the copy preset: "caret" or "sriracha".
# Any of the fields below overrides the preset's value.

[site]
brand = "caret"
dark_mode = true
# name = "Caret Design"
# tagline = "..."
# description = "..."
# site_url = "https://caretdesign.co"
# contact_email = "hello@caretdesign.co"
# social_handle = "@caretdesign"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::providers::Toml as TomlProvider;

    /// Helper to parse TOML config strings in tests
    fn parse_config(toml_str: &str) -> Config {
        Figment::new()
            .merge(TomlProvider::string(toml_str))
            .extract()
            .expect("Failed to parse test config")
    }

    #[test]
    fn test_parse_minimal_config() {
        let config = parse_config(
            r#"
[backend]
url = "https://abcd.supabase.co"
anon_key = "anon"
"#,
        );
        assert_eq!(config.backend.url, "https://abcd.supabase.co");
        assert_eq!(config.backend.request_timeout_secs, None);
        assert_eq!(config.server.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.admin.session_timeout_secs, 86400);
        assert_eq!(config.site.brand, BrandPreset::Caret);
        assert!(config.site.dark_mode);
    }

    #[test]
    fn test_parse_site_overrides() {
        let config = parse_config(
            r#"
[backend]
url = "https://abcd.supabase.co"
anon_key = "anon"
request_timeout_secs = 10

[site]
brand = "sriracha"
dark_mode = false
name = "Sriracha Studio"
"#,
        );
        assert_eq!(config.backend.request_timeout_secs, Some(10));
        assert_eq!(config.site.brand, BrandPreset::Sriracha);
        assert!(!config.site.dark_mode);
        assert_eq!(config.site.name.as_deref(), Some("Sriracha Studio"));
    }

    #[test]
    fn test_missing_backend_is_an_error() {
        let result: Result<Config, _> = Figment::new()
            .merge(TomlProvider::string("[server]\nlisten_addr = \"127.0.0.1:1\"\n"))
            .extract();
        assert!(result.is_err());
    }

    #[test]
    fn test_env_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
[backend]
url = "https://file.supabase.co"
anon_key = "from-file"
"#,
            )?;
            jail.set_env("CARET_BACKEND__ANON_KEY", "from-env");
            jail.set_env("CARET_SERVER__LISTEN_ADDR", "127.0.0.1:9000");

            let config = Config::load(Path::new("config.toml")).expect("config loads");
            assert_eq!(config.backend.url, "https://file.supabase.co");
            assert_eq!(config.backend.anon_key, "from-env");
            assert_eq!(config.server.listen_addr, "127.0.0.1:9000");
            Ok(())
        });
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[backend]\nurl = \"https://abcd.supabase.co\"\nanon_key = \"anon\"\n\n[admin]\nsession_timeout_secs = 600\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.admin.session_timeout_secs, 600);
    }

    #[test]
    fn test_dry_run_defaults_without_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = Config::load_or_default(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.server.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.backend.anon_key, "dry-run");
        assert_eq!(config.site.brand, BrandPreset::Caret);
    }

    #[test]
    fn test_dry_run_keeps_partial_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[site]\nbrand = \"sriracha\"\ndark_mode = false\n").unwrap();

        let config = Config::load_or_default(&path).unwrap();
        assert_eq!(config.site.brand, BrandPreset::Sriracha);
        assert!(!config.site.dark_mode);
        assert_eq!(config.backend.url, "http://localhost:54321");
    }

    #[test]
    fn test_dry_run_rejects_malformed_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[site\nbrand = \"sriracha\"\n").unwrap();

        assert!(Config::load_or_default(&path).is_err());
    }

    #[test]
    fn test_oversized_session_timeout_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[backend]\nurl = \"https://abcd.supabase.co\"\nanon_key = \"anon\"\n\n[admin]\nsession_timeout_secs = 9223372036854775807\n",
        )
        .unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("session_timeout_secs"));
    }

    #[test]
    fn test_session_timeout_duration() {
        let admin = AdminConfig {
            session_timeout_secs: 600,
        };
        assert_eq!(admin.session_timeout().unwrap(), Duration::minutes(10));

        let admin = AdminConfig {
            session_timeout_secs: u64::MAX,
        };
        assert!(admin.session_timeout().is_err());
    }

    #[test]
    fn test_default_template_parses() {
        let config = parse_config(&default_config_template());
        assert_eq!(config.site.brand, BrandPreset::Caret);
        assert_eq!(config.backend.anon_key, "your-anon-key");
    }
}
