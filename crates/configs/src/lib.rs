use anyhow::Result;
use serde::Deserialize;
use anyhow::{anyhow, Context};

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub mock: MockConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".into(), port: 8080, worker_threads: Some(4) }
    }
}

/// Client-side session settings: where the auth API lives and where the session is persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_storage_path")]
    pub storage_path: String,
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            storage_path: default_storage_path(),
            storage_key: default_storage_key(),
        }
    }
}

fn default_api_base_url() -> String { "http://127.0.0.1:8080".into() }
fn default_storage_path() -> String { "data/session.json".into() }
fn default_storage_key() -> String { "chapa-auth".into() }

/// Mock backend settings: simulated latency per endpoint and the user data file.
#[derive(Debug, Clone, Deserialize)]
pub struct MockConfig {
    #[serde(default = "default_login_delay")]
    pub login_delay_ms: u64,
    #[serde(default = "default_logout_delay")]
    pub logout_delay_ms: u64,
    #[serde(default = "default_signup_delay")]
    pub signup_delay_ms: u64,
    #[serde(default = "default_users_path")]
    pub users_path: String,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            login_delay_ms: default_login_delay(),
            logout_delay_ms: default_logout_delay(),
            signup_delay_ms: default_signup_delay(),
            users_path: default_users_path(),
        }
    }
}

fn default_login_delay() -> u64 { 1000 }
fn default_logout_delay() -> u64 { 500 }
fn default_signup_delay() -> u64 { 1500 }
fn default_users_path() -> String { "data/users.json".into() }

fn config_path() -> String {
    std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string())
}

/// Load the TOML file at `path`. A missing file yields the defaults; any
/// other read error and any parse error is returned.
pub fn load_from_file_or_default(path: &str) -> Result<AppConfig> {
    match std::fs::read_to_string(path) {
        Ok(content) => load_from_str(&content).with_context(|| format!("parse {path}")),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(e).with_context(|| format!("read {path}")),
    }
}

pub fn load_from_str(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Load `config.toml` when present, otherwise start from defaults; env overrides apply either way.
    /// A file that exists but does not parse is an error.
    pub fn load_or_default() -> Result<Self> {
        let mut cfg = load_from_file_or_default(&config_path())?;
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize_from_env();
        self.server.normalize()?;
        self.session.normalize_from_env();
        self.session.validate()?;
        Ok(())
    }
}

impl ServerConfig {
    fn normalize_from_env(&mut self) {
        if let Ok(host) = std::env::var("SERVER_HOST") {
            self.host = host;
        }
        if let Some(port) = std::env::var("SERVER_PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
            self.port = port;
        }
    }

    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be in 1..=65535"));
        }
        match self.worker_threads {
            Some(0) | None => self.worker_threads = Some(4),
            Some(_) => {}
        }
        Ok(())
    }
}

impl SessionConfig {
    pub fn normalize_from_env(&mut self) {
        if let Ok(url) = std::env::var("AUTH_API_URL") {
            self.api_base_url = url;
        }
        if let Ok(path) = std::env::var("SESSION_STORAGE_PATH") {
            self.storage_path = path;
        }
        self.api_base_url = self.api_base_url.trim_end_matches('/').to_string();
    }

    pub fn validate(&self) -> Result<()> {
        let lower = self.api_base_url.to_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            return Err(anyhow!("session.api_base_url must start with http:// or https://"));
        }
        if self.storage_key.trim().is_empty() {
            return Err(anyhow!("session.storage_key must not be empty"));
        }
        if self.storage_path.trim().is_empty() {
            return Err(anyhow!("session.storage_path must not be empty"));
        }
        Ok(())
    }
}
