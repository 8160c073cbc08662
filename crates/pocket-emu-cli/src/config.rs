use log::warn;
use pocket_emu_core::{apu::DEFAULT_SAMPLE_RATE, hardware::DmgRevision};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmuConfig {
    pub sample_rate: u32,
    pub mute: bool,
    /// One-based channel numbers (1-4) to silence.
    pub mute_channels: Vec<u8>,
    pub trace: bool,
    /// DMG revision name, e.g. "C" or "rev0".
    pub revision: Option<String>,
}

impl Default for EmuConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            mute: false,
            mute_channels: Vec::new(),
            trace: false,
            revision: None,
        }
    }
}

impl EmuConfig {
    /// The configured revision, or the default when unset or unknown.
    pub fn dmg_revision(&self) -> DmgRevision {
        match self.revision.as_deref() {
            None => DmgRevision::default(),
            Some(name) => DmgRevision::parse(name).unwrap_or_else(|| {
                warn!("Unknown DMG revision {name:?} in config; using default");
                DmgRevision::default()
            }),
        }
    }

    /// Zero-based indices of the muted channels, ignoring out-of-range entries.
    pub fn muted_channel_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.mute_channels.iter().filter_map(|&n| match n {
            1..=4 => Some(n as usize - 1),
            other => {
                warn!("Ignoring mute for nonexistent channel {other}");
                None
            }
        })
    }
}

pub fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata)
                .join("pocket-emu")
                .join("config.toml");
        }
    }

    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("pocket-emu").join("config.toml");
    }

    if let Some(home) = std::env::var_os("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join("pocket-emu")
            .join("config.toml");
    }

    PathBuf::from("config.toml")
}

/// Missing files and parse errors both yield the defaults.
pub fn load_from_file(path: &Path) -> EmuConfig {
    let text = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(_) => return EmuConfig::default(),
    };

    match toml::from_str::<EmuConfig>(&text) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(
                "Failed to parse config {}: {e}; using defaults",
                path.display()
            );
            EmuConfig::default()
        }
    }
}

pub fn save_to_file(path: &Path, cfg: &EmuConfig) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let text = toml::to_string_pretty(cfg).map_err(std::io::Error::other)?;
    std::fs::write(path, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_from_file(&dir.path().join("absent.toml"));
        assert_eq!(cfg, EmuConfig::default());
        assert_eq!(cfg.sample_rate, DEFAULT_SAMPLE_RATE);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "mute_channels = [2, 4]\nrevision = \"A\"\n").unwrap();
        let cfg = load_from_file(&path);
        assert_eq!(cfg.mute_channels, vec![2, 4]);
        assert!(!cfg.mute);
        assert_eq!(cfg.sample_rate, DEFAULT_SAMPLE_RATE);
        assert_eq!(cfg.dmg_revision(), DmgRevision::RevA);
        assert_eq!(cfg.muted_channel_indices().collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn malformed_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "sample_rate = \"fast\"").unwrap();
        assert_eq!(load_from_file(&path), EmuConfig::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let cfg = EmuConfig {
            sample_rate: 48_000,
            mute: true,
            mute_channels: vec![3],
            trace: true,
            revision: Some("rev0".into()),
        };
        save_to_file(&path, &cfg).unwrap();
        assert_eq!(load_from_file(&path), cfg);
    }

    #[test]
    fn out_of_range_channels_are_skipped() {
        let cfg = EmuConfig {
            mute_channels: vec![0, 1, 5],
            ..EmuConfig::default()
        };
        assert_eq!(cfg.muted_channel_indices().collect::<Vec<_>>(), vec![0]);
        assert_eq!(
            EmuConfig {
                revision: Some("Z".into()),
                ..EmuConfig::default()
            }
            .dmg_revision(),
            DmgRevision::RevC
        );
    }
}
