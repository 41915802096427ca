use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const SUPABASE_URL_ENV: &str = "SUPABASE_URL";
pub const SUPABASE_KEY_ENV: &str = "SUPABASE_KEY";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    pub log_level: String,
    pub supabase_url: Option<String>,
    pub supabase_key: Option<String>,
    pub gateway_timeout_secs: u64,
    pub data_path: PathBuf,
    pub debug_console: bool,
    pub trace_spans: bool,
    pub session_file: bool,
}

#[derive(Default)]
pub struct AppConfigOverrides {
    pub log_level: Option<String>,
    pub supabase_url: Option<String>,
    pub supabase_key: Option<String>,
    pub gateway_timeout_secs: Option<u64>,
    pub data_path: Option<PathBuf>,
    pub debug_console: bool,
    pub trace_spans: bool,
    pub session_file: bool,
}

fn default_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".galleryze")
}

impl AppConfig {
    /// Read `~/.galleryze/config` (or `path`). Missing files and keys fall
    /// back to defaults; `SUPABASE_URL`/`SUPABASE_KEY` win over the file.
    pub fn load_from(path: Option<PathBuf>) -> Self {
        let path = path.unwrap_or_else(|| default_dir().join("config"));
        let cfg = config::Config::builder()
            .add_source(config::File::from(path).format(config::FileFormat::Toml).required(false))
            .build()
            .unwrap_or_default();

        let from_env = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        Self {
            log_level: cfg
                .get_string("log_level")
                .unwrap_or_else(|_| "info".to_string()),
            supabase_url: from_env(SUPABASE_URL_ENV).or_else(|| cfg.get_string("supabase_url").ok()),
            supabase_key: from_env(SUPABASE_KEY_ENV).or_else(|| cfg.get_string("supabase_key").ok()),
            gateway_timeout_secs: cfg
                .get_int("gateway_timeout_secs")
                .ok()
                .and_then(|v| u64::try_from(v).ok())
                .filter(|v| *v > 0)
                .unwrap_or(10),
            data_path: cfg
                .get_string("data_path")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_dir()),
            debug_console: cfg.get_bool("debug_console").unwrap_or(false),
            trace_spans: cfg.get_bool("trace_spans").unwrap_or(false),
            session_file: cfg.get_bool("session_file").unwrap_or(false),
        }
    }

    pub fn apply_overrides(mut self, ov: &AppConfigOverrides) -> Self {
        if let Some(l) = &ov.log_level {
            self.log_level = l.clone();
        }
        if let Some(u) = &ov.supabase_url {
            self.supabase_url = Some(u.clone());
        }
        if let Some(k) = &ov.supabase_key {
            self.supabase_key = Some(k.clone());
        }
        if let Some(t) = ov.gateway_timeout_secs {
            self.gateway_timeout_secs = t.max(1);
        }
        if let Some(p) = &ov.data_path {
            self.data_path = p.clone();
        }
        if ov.debug_console {
            self.debug_console = true;
        }
        if ov.trace_spans {
            self.trace_spans = true;
        }
        if ov.session_file {
            self.session_file = true;
        }
        self
    }

    /// Backend credentials, when both are configured.
    pub fn backend(&self) -> Option<(&str, &str)> {
        match (&self.supabase_url, &self.supabase_key) {
            (Some(url), Some(key)) => Some((url.as_str(), key.as_str())),
            _ => None,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.gateway_timeout_secs)
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_path.join("galleryze.sqlite")
    }

    pub fn session_path(&self) -> PathBuf {
        self.data_path.join("session.json")
    }

    pub fn save_to(&self, path: Option<PathBuf>) -> std::io::Result<()> {
        let path = path.unwrap_or_else(|| default_dir().join("config"));
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = toml::to_string(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let cfg = AppConfig::load_from(Some(dir.path().join("nope")));
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.gateway_timeout_secs, 10);
        assert!(!cfg.session_file);
    }

    #[test]
    fn test_save_and_reload_with_overrides() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config");
        let cfg = AppConfig::load_from(Some(path.clone())).apply_overrides(&AppConfigOverrides {
            log_level: Some("debug".into()),
            gateway_timeout_secs: Some(3),
            data_path: Some(dir.path().to_path_buf()),
            session_file: true,
            ..Default::default()
        });
        cfg.save_to(Some(path.clone())).unwrap();

        let reloaded = AppConfig::load_from(Some(path));
        assert_eq!(reloaded.log_level, "debug");
        assert_eq!(reloaded.gateway_timeout_secs, 3);
        assert_eq!(reloaded.data_path, dir.path());
        assert!(reloaded.session_file);
        assert_eq!(reloaded.db_path(), dir.path().join("galleryze.sqlite"));
    }
}
