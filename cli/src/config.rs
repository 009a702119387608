use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use fitlog_core::insight::DEFAULT_LANGUAGE;
use fitlog_core::models::Principal;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

const CONFIG_FILE: &str = "config.json";
const SESSION_FILE: &str = "session.json";
const INSIGHT_FILE: &str = "insight.json";

/// Optional `config.json` in the data directory. Every key may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileSettings {
    supabase_url: Option<String>,
    supabase_anon_key: Option<String>,
    gemini_api_key: Option<String>,
    gemini_model: Option<String>,
    insight_language: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CachedInsight {
    handle: String,
    text: String,
}

pub struct Config {
    pub data_dir: PathBuf,
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub insight_language: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "fitlog").context("Could not determine home directory")?;

        let data_dir = proj_dirs.data_dir().to_path_buf();
        Self::load_from(data_dir, |key| std::env::var(key).ok())
    }

    /// Read `config.json` under `data_dir`, then apply overrides from `env`.
    fn load_from(data_dir: PathBuf, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        let path = data_dir.join(CONFIG_FILE);
        let file: FileSettings = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("Invalid settings in {}", path.display()))?
        } else {
            FileSettings::default()
        };

        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        Ok(Config {
            supabase_url: env("FITLOG_SUPABASE_URL")
                .or(file.supabase_url)
                .map(|u| u.trim_end_matches('/').to_string()),
            supabase_anon_key: env("FITLOG_SUPABASE_ANON_KEY").or(file.supabase_anon_key),
            gemini_api_key: env("GEMINI_API_KEY").or(file.gemini_api_key),
            gemini_model: env("FITLOG_GEMINI_MODEL")
                .or(file.gemini_model)
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            insight_language: env("FITLOG_INSIGHT_LANGUAGE")
                .or(file.insight_language)
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            data_dir,
        })
    }

    /// Backend URL and anon key, or an error telling the user how to set them.
    pub fn backend(&self) -> Result<(&str, &str)> {
        match (&self.supabase_url, &self.supabase_anon_key) {
            (Some(url), Some(key)) => Ok((url.as_str(), key.as_str())),
            _ => bail!(
                "Backend not configured. Set FITLOG_SUPABASE_URL and FITLOG_SUPABASE_ANON_KEY \
                 or add supabase_url/supabase_anon_key to {}",
                self.data_dir.join(CONFIG_FILE).display()
            ),
        }
    }

    pub fn gemini_api_key(&self) -> Result<&str> {
        self.gemini_api_key
            .as_deref()
            .context("GEMINI_API_KEY is not set")
    }

    // --- Session ---

    pub fn load_session(&self) -> Result<Option<Principal>> {
        let path = self.data_dir.join(SESSION_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&path).context("Failed to read session file")?;
        let principal = serde_json::from_str(&raw).context("Session file is corrupt")?;
        Ok(Some(principal))
    }

    pub fn save_session(&self, principal: &Principal) -> Result<()> {
        let raw = serde_json::to_string_pretty(principal)?;
        write_private(&self.data_dir.join(SESSION_FILE), &raw)
            .context("Failed to write session file")
    }

    /// Remove the stored session and anything cached for it.
    pub fn clear_session(&self) -> Result<()> {
        remove_if_exists(&self.data_dir.join(SESSION_FILE)).context("Failed to remove session")?;
        self.clear_insight()
    }

    // --- Insight cache ---

    /// Last generated insight for `handle`, if one is cached.
    pub fn load_insight(&self, handle: &str) -> Option<String> {
        let raw = std::fs::read_to_string(self.data_dir.join(INSIGHT_FILE)).ok()?;
        let cached: CachedInsight = serde_json::from_str(&raw).ok()?;
        (cached.handle == handle).then_some(cached.text)
    }

    pub fn save_insight(&self, handle: &str, text: &str) -> Result<()> {
        let raw = serde_json::to_string(&CachedInsight {
            handle: handle.to_string(),
            text: text.to_string(),
        })?;
        write_private(&self.data_dir.join(INSIGHT_FILE), &raw)
            .context("Failed to write insight cache")
    }

    pub fn clear_insight(&self) -> Result<()> {
        remove_if_exists(&self.data_dir.join(INSIGHT_FILE)).context("Failed to clear insight cache")
    }
}

fn write_private(path: &Path, contents: &str) -> std::io::Result<()> {
    std::fs::write(path, contents)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}

fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
