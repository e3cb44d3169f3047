//! Settings Persistence
//!
//! Editor tunables stored as JSON with:
//! - Serde defaults for missing fields
//! - Normalization instead of failure for out-of-range values
//! - Atomic writes (temp file + rename) under an advisory lock
//!
//! Storage location: {config_dir}/tanto/settings.json

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::{
    timeline::{DEFAULT_AUDIO_BITRATE, DEFAULT_FADE_DURATION, DEFAULT_VIDEO_BITRATE},
    CoreError, CoreResult,
};

pub const SETTINGS_VERSION: u32 = 1;

pub const SETTINGS_FILE: &str = "settings.json";

/// Advisory lock held while reading or writing the settings file
pub const SETTINGS_LOCK_FILE: &str = "settings.json.lock";

const APP_DIR_NAME: &str = "tanto";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TantoSettings {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub editor: EditorSettings,

    #[serde(default)]
    pub playback: PlaybackSettings,

    #[serde(default)]
    pub export: ExportSettings,
}

fn default_version() -> u32 {
    SETTINGS_VERSION
}

impl Default for TantoSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            editor: EditorSettings::default(),
            playback: PlaybackSettings::default(),
            export: ExportSettings::default(),
        }
    }
}

impl TantoSettings {
    /// Clamps every value into its valid range, replacing garbage with defaults
    pub fn normalize(&mut self) {
        self.version = SETTINGS_VERSION;

        let editor = &mut self.editor;
        editor.num_workspaces = editor.num_workspaces.clamp(1, 16);
        editor.quiet_factor = clamp_f64(editor.quiet_factor, 0.0, 1.0, default_quiet_factor());
        editor.small_time_step =
            clamp_f64(editor.small_time_step, 0.01, 3600.0, default_small_time_step());
        editor.large_time_step =
            clamp_f64(editor.large_time_step, 0.01, 36_000.0, default_large_time_step());
        editor.volume_step = clamp_f64(editor.volume_step, 0.001, 10.0, default_volume_step());
        editor.fade_duration = clamp_f64(editor.fade_duration, 0.0, 10.0, DEFAULT_FADE_DURATION);
        editor.naming_retry_budget = editor.naming_retry_budget.clamp(26, 1_000_000);

        let playback = &mut self.playback;
        playback.audio_fps = playback.audio_fps.clamp(8_000, 192_000);
        playback.buffer_size = playback.buffer_size.clamp(64, 65_536);
        playback.ready_timeout_ms = playback.ready_timeout_ms.clamp(100, 60_000);

        if !is_bitrate(&self.export.video_bitrate) {
            self.export.video_bitrate = DEFAULT_VIDEO_BITRATE.to_string();
        }
        if !is_bitrate(&self.export.audio_bitrate) {
            self.export.audio_bitrate = DEFAULT_AUDIO_BITRATE.to_string();
        }
    }
}

fn clamp_f64(value: f64, min: f64, max: f64, fallback: f64) -> f64 {
    if !value.is_finite() {
        return fallback;
    }
    value.clamp(min, max)
}

/// `8000k`, `2M`, `128000`
fn is_bitrate(value: &str) -> bool {
    let digits = value.strip_suffix(['k', 'K', 'm', 'M']).unwrap_or(value);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Editing behaviour
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EditorSettings {
    #[serde(default = "default_num_workspaces")]
    pub num_workspaces: usize,

    /// Parent volume factor applied under a new voice-over
    #[serde(default = "default_quiet_factor")]
    pub quiet_factor: f64,

    /// Seconds per small seek step
    #[serde(default = "default_small_time_step")]
    pub small_time_step: f64,

    /// Seconds per large seek step
    #[serde(default = "default_large_time_step")]
    pub large_time_step: f64,

    #[serde(default = "default_volume_step")]
    pub volume_step: f64,

    /// Fade applied between clips when merging video tracks
    #[serde(default = "default_fade_duration")]
    pub fade_duration: f64,

    /// Candidates tried before giving up on a free track name
    #[serde(default = "default_naming_retry_budget")]
    pub naming_retry_budget: usize,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            num_workspaces: default_num_workspaces(),
            quiet_factor: default_quiet_factor(),
            small_time_step: default_small_time_step(),
            large_time_step: default_large_time_step(),
            volume_step: default_volume_step(),
            fade_duration: default_fade_duration(),
            naming_retry_budget: default_naming_retry_budget(),
        }
    }
}

fn default_num_workspaces() -> usize {
    4
}

fn default_quiet_factor() -> f64 {
    0.2
}

fn default_small_time_step() -> f64 {
    1.0
}

fn default_large_time_step() -> f64 {
    60.0
}

fn default_volume_step() -> f64 {
    0.1
}

fn default_fade_duration() -> f64 {
    DEFAULT_FADE_DURATION
}

fn default_naming_retry_budget() -> usize {
    10_000
}

/// Playback device parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSettings {
    #[serde(default = "default_audio_fps")]
    pub audio_fps: u32,

    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// How long starting playback waits for audio to come up
    #[serde(default = "default_ready_timeout_ms")]
    pub ready_timeout_ms: u64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            audio_fps: default_audio_fps(),
            buffer_size: default_buffer_size(),
            ready_timeout_ms: default_ready_timeout_ms(),
        }
    }
}

fn default_audio_fps() -> u32 {
    22_050
}

fn default_buffer_size() -> usize {
    3_000
}

fn default_ready_timeout_ms() -> u64 {
    5_000
}

/// Encoder hints for newly created tracks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportSettings {
    #[serde(default = "default_video_bitrate")]
    pub video_bitrate: String,

    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            video_bitrate: default_video_bitrate(),
            audio_bitrate: default_audio_bitrate(),
        }
    }
}

fn default_video_bitrate() -> String {
    DEFAULT_VIDEO_BITRATE.to_string()
}

fn default_audio_bitrate() -> String {
    DEFAULT_AUDIO_BITRATE.to_string()
}

// =============================================================================
// Manager
// =============================================================================

/// Loads, saves and resets the settings file
pub struct SettingsManager {
    settings_path: PathBuf,
}

impl SettingsManager {
    pub fn new(config_dir: PathBuf) -> Self {
        Self {
            settings_path: config_dir.join(SETTINGS_FILE),
        }
    }

    /// Manager rooted at the platform config directory, if there is one
    pub fn default_location() -> Option<Self> {
        dirs::config_dir().map(|dir| Self::new(dir.join(APP_DIR_NAME)))
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    fn lock_path(&self) -> PathBuf {
        self.settings_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(SETTINGS_LOCK_FILE)
    }

    fn with_lock<T>(&self, exclusive: bool, op: impl FnOnce() -> CoreResult<T>) -> CoreResult<T> {
        if let Some(parent) = self.settings_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let lock_file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path())?;

        if exclusive {
            fs2::FileExt::lock_exclusive(&lock_file)?;
        } else {
            fs2::FileExt::lock_shared(&lock_file)?;
        }

        let result = op();

        if let Err(e) = fs2::FileExt::unlock(&lock_file) {
            warn!("Failed to unlock settings lock file: {}", e);
        }

        result
    }

    /// Reads settings, falling back to defaults on any failure
    pub fn load(&self) -> TantoSettings {
        let result = self.with_lock(false, || {
            if !self.settings_path.exists() {
                info!("Settings file not found, using defaults");
                return Ok(TantoSettings::default());
            }

            let content = fs::read_to_string(&self.settings_path)?;
            let mut settings = serde_json::from_str::<TantoSettings>(&content)?;
            settings.normalize();
            Ok(settings)
        });

        match result {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Failed to load settings, using defaults: {}", e);
                TantoSettings::default()
            }
        }
    }

    /// Normalizes and writes settings, returning what was persisted
    pub fn save(&self, settings: &TantoSettings) -> CoreResult<TantoSettings> {
        self.with_lock(true, || {
            let mut normalized = settings.clone();
            normalized.normalize();

            let content = serde_json::to_string_pretty(&normalized)?;

            let temp_path = self.settings_path.with_extension("json.tmp");
            if temp_path.exists() {
                let _ = fs::remove_file(&temp_path);
            }

            let mut file = fs::File::create(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
            drop(file);

            fs::rename(&temp_path, &self.settings_path).map_err(|e| {
                let _ = fs::remove_file(&temp_path);
                CoreError::Internal(format!("Failed to finalize settings file: {}", e))
            })?;

            info!(path = %self.settings_path.display(), "Settings saved");
            Ok(normalized)
        })
    }

    /// Deletes the settings file and returns defaults
    pub fn reset(&self) -> CoreResult<TantoSettings> {
        self.with_lock(true, || {
            if self.settings_path.exists() {
                fs::remove_file(&self.settings_path)?;
                info!("Settings file deleted");
            }
            Ok(TantoSettings::default())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = TantoSettings::default();
        assert_eq!(settings.editor.num_workspaces, 4);
        assert_eq!(settings.editor.quiet_factor, 0.2);
        assert_eq!(settings.editor.small_time_step, 1.0);
        assert_eq!(settings.editor.large_time_step, 60.0);
        assert_eq!(settings.editor.volume_step, 0.1);
        assert_eq!(settings.playback.audio_fps, 22_050);
        assert_eq!(settings.playback.buffer_size, 3_000);
        assert_eq!(settings.export.video_bitrate, "8000k");
        assert_eq!(settings.export.audio_bitrate, "50000k");
    }

    #[test]
    fn test_load_nonexistent_returns_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let manager = SettingsManager::new(temp_dir.path().to_path_buf());
        assert_eq!(manager.load(), TantoSettings::default());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let manager = SettingsManager::new(temp_dir.path().to_path_buf());

        let mut settings = TantoSettings::default();
        settings.editor.num_workspaces = 6;
        settings.export.audio_bitrate = "192k".to_string();
        manager.save(&settings).unwrap();

        let loaded = manager.load();
        assert_eq!(loaded.editor.num_workspaces, 6);
        assert_eq!(loaded.export.audio_bitrate, "192k");
        assert!(!manager.settings_path().with_extension("json.tmp").exists());
    }

    #[test]
    fn test_invalid_json_returns_defaults() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(SETTINGS_FILE), "not json {{").unwrap();

        let manager = SettingsManager::new(temp_dir.path().to_path_buf());
        assert_eq!(manager.load(), TantoSettings::default());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join(SETTINGS_FILE),
            r#"{"editor": {"quietFactor": 0.5}}"#,
        )
        .unwrap();

        let manager = SettingsManager::new(temp_dir.path().to_path_buf());
        let settings = manager.load();
        assert_eq!(settings.editor.quiet_factor, 0.5);
        assert_eq!(settings.editor.num_workspaces, 4);
        assert_eq!(settings.playback, PlaybackSettings::default());
    }

    #[test]
    fn test_normalize_clamps_and_repairs() {
        let mut settings = TantoSettings::default();
        settings.editor.num_workspaces = 0;
        settings.editor.quiet_factor = f64::NAN;
        settings.editor.volume_step = -3.0;
        settings.export.video_bitrate = "fast".to_string();
        settings.playback.audio_fps = 1;
        settings.normalize();

        assert_eq!(settings.editor.num_workspaces, 1);
        assert_eq!(settings.editor.quiet_factor, 0.2);
        assert_eq!(settings.editor.volume_step, 0.001);
        assert_eq!(settings.export.video_bitrate, "8000k");
        assert_eq!(settings.playback.audio_fps, 8_000);
    }

    #[test]
    fn test_bitrate_format() {
        assert!(is_bitrate("8000k"));
        assert!(is_bitrate("2M"));
        assert!(is_bitrate("128000"));
        assert!(!is_bitrate("k"));
        assert!(!is_bitrate("12.5k"));
        assert!(!is_bitrate(""));
    }

    #[test]
    fn test_reset_deletes_file() {
        let temp_dir = TempDir::new().unwrap();
        let manager = SettingsManager::new(temp_dir.path().join("nested"));

        manager.save(&TantoSettings::default()).unwrap();
        assert!(manager.settings_path().exists());

        let reset = manager.reset().unwrap();
        assert!(!manager.settings_path().exists());
        assert_eq!(reset, TantoSettings::default());
    }
}
