use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context};

pub const DEFAULT_CONFIG_FILE: &str = "chat_term.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub backend_url: String,
    pub anon_key: String,
    pub selection_path: PathBuf,
    pub log_filter: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:54321".into(),
            anon_key: String::new(),
            selection_path: default_selection_path(),
            log_filter: "info".into(),
        }
    }
}

fn default_selection_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("chat_term")
        .join("selection.json")
}

/// Defaults, then the TOML file (if readable), then environment overrides.
pub fn load_settings(config_path: Option<&Path>) -> anyhow::Result<ClientSettings> {
    let mut settings = ClientSettings::default();

    let path = config_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    match fs::read_to_string(path) {
        Ok(raw) => apply_file(&mut settings, &raw)
            .with_context(|| format!("invalid config file '{}'", path.display()))?,
        Err(err) if config_path.is_some() => {
            return Err(anyhow!("failed to read config '{}': {err}", path.display()));
        }
        Err(_) => {}
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn apply_file(settings: &mut ClientSettings, raw: &str) -> anyhow::Result<()> {
    let file_cfg = toml::from_str::<HashMap<String, String>>(raw)?;
    if let Some(v) = file_cfg.get("backend_url") {
        settings.backend_url = v.clone();
    }
    if let Some(v) = file_cfg.get("anon_key") {
        settings.anon_key = v.clone();
    }
    if let Some(v) = file_cfg.get("selection_path") {
        settings.selection_path = PathBuf::from(v);
    }
    if let Some(v) = file_cfg.get("log_filter") {
        settings.log_filter = v.clone();
    }
    Ok(())
}

fn apply_env(settings: &mut ClientSettings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("BACKEND_URL") {
        settings.backend_url = v;
    }
    if let Some(v) = var("APP__BACKEND_URL") {
        settings.backend_url = v;
    }

    if let Some(v) = var("BACKEND_ANON_KEY") {
        settings.anon_key = v;
    }
    if let Some(v) = var("APP__BACKEND_ANON_KEY") {
        settings.anon_key = v;
    }

    if let Some(v) = var("APP__SELECTION_PATH") {
        settings.selection_path = PathBuf::from(v);
    }
    if let Some(v) = var("APP__LOG_FILTER") {
        settings.log_filter = v;
    }
}

impl ClientSettings {
    pub fn validate(&self) -> anyhow::Result<()> {
        let url = self.backend_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(anyhow!(
                "backend_url must start with http:// or https://, got '{url}'"
            ));
        }
        url::Url::parse(url).with_context(|| format!("invalid backend_url '{url}'"))?;
        Ok(())
    }
}
