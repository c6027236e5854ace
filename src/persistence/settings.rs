use std::fs;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::graph_utils::graph::MindmapId;
use crate::graph_utils::layout::RadialLayoutConfig;
use crate::graph_utils::text::NodeMetrics;

pub const ENV_BASE_URL: &str = "MIND_LOOM_BASE_URL";
pub const ENV_API_KEY: &str = "MIND_LOOM_API_KEY";
pub const ENV_MINDMAP: &str = "MIND_LOOM_MINDMAP";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    // If None, run against the in-memory store
    #[serde(default)]
    pub store_base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "AppSettings::default_timeout_secs")]
    pub request_timeout_secs: u64,
    // Opened when no mindmap id is given on the command line
    #[serde(default)]
    pub default_mindmap: Option<MindmapId>,
    #[serde(default)]
    pub layout: RadialLayoutConfig,
    #[serde(default)]
    pub metrics: NodeMetrics,
    // Slow drifting background blobs; costs a repaint every frame
    #[serde(default = "AppSettings::default_true")]
    pub ambient_motion: bool,
    #[serde(default = "AppSettings::default_generate_count")]
    pub generate_count: u32,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            store_base_url: None,
            api_key: None,
            request_timeout_secs: Self::default_timeout_secs(),
            default_mindmap: None,
            layout: RadialLayoutConfig::default(),
            metrics: NodeMetrics::default(),
            ambient_motion: true,
            generate_count: Self::default_generate_count(),
        }
    }
}

impl AppSettings {
    fn config_dir() -> PathBuf {
        // Cross-platform user config dir
        #[cfg(target_os = "macos")]
        {
            // ~/Library/Application Support/Mind-Loom
            let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("~"));
            return home.join("Library").join("Application Support").join("Mind-Loom");
        }
        #[cfg(target_os = "windows")]
        {
            // %APPDATA%\Mind-Loom
            if let Ok(appdata) = std::env::var("APPDATA") {
                return PathBuf::from(appdata).join("Mind-Loom");
            }
            return PathBuf::from("Mind-Loom");
        }
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            // $XDG_CONFIG_HOME/Mind-Loom or ~/.config/Mind-Loom
            if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
                return PathBuf::from(xdg).join("Mind-Loom");
            }
            let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("~"));
            return home.join(".config").join("Mind-Loom");
        }
    }

    /// Settings file contents, or defaults when there is no file yet.
    /// Environment overrides are applied on top either way.
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_dir().join("settings.json");
        let mut v = if path.exists() {
            let mut f = std::fs::File::open(&path)?;
            let mut s = String::new();
            f.read_to_string(&mut s)?;
            serde_json::from_str::<Self>(&s)?
        } else {
            Self::default()
        };
        v.apply_env(|k| std::env::var(k).ok());
        Ok(v)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let dir = Self::config_dir();
        fs::create_dir_all(&dir)?;
        let path = dir.join("settings.json");
        let s = serde_json::to_string_pretty(self)?;
        let mut f = std::fs::File::create(path)?;
        f.write_all(s.as_bytes())?;
        Ok(())
    }

    /// Overlay values from the environment. `lookup` is `std::env::var` in
    /// practice; tests pass a map.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_BASE_URL) {
            let url = url.trim().to_string();
            self.store_base_url = if url.is_empty() { None } else { Some(url) };
        }
        if let Some(key) = lookup(ENV_API_KEY).filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(raw) = lookup(ENV_MINDMAP) {
            match raw.trim().parse::<MindmapId>() {
                Ok(id) => self.default_mindmap = Some(id),
                Err(e) => log::warn!("ignoring {}={:?}: {}", ENV_MINDMAP, raw, e),
            }
        }
    }

    /// Return the directory where the settings file (settings.json) is stored.
    pub fn settings_dir() -> PathBuf {
        Self::config_dir()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub(crate) fn default_timeout_secs() -> u64 { 20 }
    pub(crate) fn default_generate_count() -> u32 { 3 }
    fn default_true() -> bool { true }
}
