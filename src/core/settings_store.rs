use std::path::{Path, PathBuf};

use anyhow::Context;

use super::models::RuntimeSettings;

pub struct SettingsStore {
    file_path: PathBuf,
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore {
    pub fn new() -> Self {
        Self::new_with_path(settings_path())
    }

    pub fn new_with_path(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Missing file means first run: defaults. A present but unreadable
    /// file is an error so a typo does not silently reset settings.
    pub async fn load(&self) -> anyhow::Result<RuntimeSettings> {
        if !tokio::fs::try_exists(&self.file_path)
            .await
            .unwrap_or(false)
        {
            return Ok(RuntimeSettings::default());
        }

        let content = tokio::fs::read_to_string(&self.file_path)
            .await
            .with_context(|| {
                format!("failed to read settings file {}", self.file_path.display())
            })?;

        let parsed = serde_json::from_str::<RuntimeSettings>(&content).with_context(|| {
            format!("invalid JSON in settings file {}", self.file_path.display())
        })?;

        Ok(parsed.sanitized())
    }

    pub async fn save(&self, settings: &RuntimeSettings) -> anyhow::Result<RuntimeSettings> {
        if let Some(parent) = self.file_path.parent() {
            tokio::fs::create_dir_all(parent).await.with_context(|| {
                format!("failed to create settings directory {}", parent.display())
            })?;
        }

        let sanitized = settings.clone().sanitized();
        let json = serde_json::to_string_pretty(&sanitized)?;
        tokio::fs::write(&self.file_path, json)
            .await
            .with_context(|| {
                format!("failed to write settings file {}", self.file_path.display())
            })?;

        tracing::debug!(path = %self.file_path.display(), "settings saved");
        Ok(sanitized)
    }
}

fn settings_path() -> PathBuf {
    app_data_root().join("settings.json")
}

pub fn app_data_root() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Ok(local_app_data) = std::env::var("LOCALAPPDATA") {
            return PathBuf::from(local_app_data).join("ResumeIntake");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = dirs::home_dir() {
            return home
                .join("Library")
                .join("Application Support")
                .join("ResumeIntake");
        }
    }

    if let Some(path) = dirs::data_local_dir() {
        return path.join("ResumeIntake");
    }

    PathBuf::from(".").join("ResumeIntake")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new_with_path(dir.path().join("settings.json"));

        let settings = store.load().await.unwrap();
        assert_eq!(settings, RuntimeSettings::default());
    }

    #[tokio::test]
    async fn saved_settings_round_trip_sanitized() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new_with_path(dir.path().join("nested").join("settings.json"));

        let saved = store
            .save(&RuntimeSettings {
                auto_parse: false,
                max_retries: 0,
                ..RuntimeSettings::default()
            })
            .await
            .unwrap();
        assert_eq!(saved.max_retries, 1);

        let loaded = store.load().await.unwrap();
        assert!(!loaded.auto_parse);
        assert_eq!(loaded.max_retries, 1);
    }

    #[tokio::test]
    async fn partial_files_fill_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        tokio::fs::write(&path, r#"{ "autoParse": false, "renderScale": 2.0 }"#)
            .await
            .unwrap();

        let loaded = SettingsStore::new_with_path(path).load().await.unwrap();
        assert!(!loaded.auto_parse);
        assert_eq!(loaded.render_scale, 2.0);
        assert_eq!(loaded.gemini_model, "gemini-2.5-flash");
    }

    #[tokio::test]
    async fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();

        let err = SettingsStore::new_with_path(path).load().await.unwrap_err();
        assert!(err.to_string().contains("invalid JSON"));
    }
}
