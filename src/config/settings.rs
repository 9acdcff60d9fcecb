use serde::{ Deserialize, Serialize };
use std::fs;
use std::io::ErrorKind;
use std::path::{ Path, PathBuf };
use thiserror::Error;
use tokio::sync::RwLock as TokioRwLock;
use url::Url;
use log::info;
use crate::widget::DEFAULT_ENDPOINT_URL;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings file IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid API URL '{url}': {reason}")]
    InvalidApiUrl { url: String, reason: String },
}

fn default_api_url() -> String {
    DEFAULT_ENDPOINT_URL.to_string()
}

/// Operator-editable options, stored as JSON.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetSettings {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub target_page_slug: String,
}

impl Default for WidgetSettings {
    fn default() -> Self {
        Self { api_url: default_api_url(), target_page_slug: String::new() }
    }
}

impl WidgetSettings {
    /// Normalizes operator input: blank URL falls back to the default, the
    /// URL must be absolute http(s), the slug is trimmed.
    pub fn sanitized(self) -> Result<Self, SettingsError> {
        let api_url = match self.api_url.trim() {
            "" => default_api_url(),
            raw => {
                let parsed = Url::parse(raw).map_err(|e| SettingsError::InvalidApiUrl {
                    url: raw.to_string(),
                    reason: e.to_string(),
                })?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(SettingsError::InvalidApiUrl {
                        url: raw.to_string(),
                        reason: format!("unsupported scheme '{}'", parsed.scheme()),
                    });
                }
                raw.to_string()
            }
        };
        Ok(Self { api_url, target_page_slug: self.target_page_slug.trim().to_string() })
    }

    pub fn visibility_rule(&self) -> VisibilityRule {
        VisibilityRule::from_setting(&self.target_page_slug)
    }
}

/// Which pages get the widget.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VisibilityRule {
    pub target_page_slug: Option<String>,
}

impl VisibilityRule {
    pub fn from_setting(slug: &str) -> Self {
        let slug = slug.trim();
        Self { target_page_slug: (!slug.is_empty()).then(|| slug.to_string()) }
    }

    pub fn admits(&self, page_slug: &str) -> bool {
        match &self.target_page_slug {
            None => true,
            Some(target) => target == page_slug,
        }
    }
}

pub fn load_settings_from_file(path: &Path) -> Result<WidgetSettings, SettingsError> {
    match fs::read_to_string(path) {
        Ok(json_str) => Ok(serde_json::from_str(&json_str)?),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!("No settings file at {}, using defaults", path.display());
            Ok(WidgetSettings::default())
        }
        Err(e) => Err(e.into()),
    }
}

pub fn save_settings_to_file(path: &Path, settings: &WidgetSettings) -> Result<(), SettingsError> {
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json)?;
    Ok(())
}

/// Settings shared by request handlers, written through to disk on update.
pub struct SettingsStore {
    path: PathBuf,
    current: TokioRwLock<WidgetSettings>,
}

impl SettingsStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        let current = load_settings_from_file(&path)?;
        Ok(Self { path, current: TokioRwLock::new(current) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn get(&self) -> WidgetSettings {
        self.current.read().await.clone()
    }

    pub async fn update(&self, settings: WidgetSettings) -> Result<WidgetSettings, SettingsError> {
        let settings = settings.sanitized()?;
        let mut current = self.current.write().await;
        save_settings_to_file(&self.path, &settings)?;
        *current = settings.clone();
        info!(
            "Settings updated: api_url={} target_page_slug='{}'",
            settings.api_url,
            settings.target_page_slug
        );
        Ok(settings)
    }
}

/// A settings path inside a fresh directory that is removed when the guard drops.
#[cfg(test)]
pub(crate) fn temp_settings_path() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("create tempdir");
    let path = dir.path().join("lcw-settings.json");
    (dir, path)
}
