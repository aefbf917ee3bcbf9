use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    io,
    path::{Path, PathBuf},
};

use crate::error::CliError;

/// Classic green DMG shades, lightest first, as 0xRRGGBB.
pub const DMG_PALETTE: [u32; 4] = [0x9BBC0F, 0x8BAC0F, 0x306230, 0x0F380F];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Colors for shades 0-3.
    pub palette: [u32; 4],
    pub frames: u32,
    pub scale: u32,
    pub output: PathBuf,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            palette: DMG_PALETTE,
            frames: 60,
            scale: 1,
            output: PathBuf::from("frame.png"),
        }
    }
}

pub fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("dotmatrix").join("config.toml");
        }
    }

    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("dotmatrix").join("config.toml");
    }

    if let Some(home) = std::env::var_os("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join("dotmatrix")
            .join("config.toml");
    }

    PathBuf::from("config.toml")
}

/// Read a config file. A missing file yields the defaults.
pub fn read_config(path: &Path) -> Result<CliConfig, CliError> {
    let text = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(CliConfig::default()),
        Err(source) => {
            return Err(CliError::ConfigRead {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    toml::from_str(&text).map_err(|source| CliError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Like [`read_config`], but any failure is logged and replaced by defaults.
pub fn load_from_file(path: &Path) -> CliConfig {
    read_config(path).unwrap_or_else(|e| {
        warn!("{e}; using defaults");
        CliConfig::default()
    })
}

pub fn save_to_file(path: &Path, cfg: &CliConfig) -> Result<(), CliError> {
    let text = toml::to_string_pretty(cfg)?;
    let write_err = |source| CliError::ConfigWrite {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    std::fs::write(path, text).map_err(write_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let cfg = read_config(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg, CliConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "palette = [0xFFFFFF, 0xAAAAAA, 0x555555, 0x000000]\nscale = 3\n",
        )
        .unwrap();

        let cfg = read_config(&path).unwrap();
        assert_eq!(cfg.palette, [0xFFFFFF, 0xAAAAAA, 0x555555, 0x000000]);
        assert_eq!(cfg.scale, 3);
        assert_eq!(cfg.frames, 60);
        assert_eq!(cfg.output, PathBuf::from("frame.png"));
    }

    #[test]
    fn bad_toml_is_an_error_but_load_falls_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "frames = \"many\"").unwrap();

        assert!(matches!(
            read_config(&path),
            Err(CliError::ConfigParse { .. })
        ));
        assert_eq!(load_from_file(&path), CliConfig::default());
    }

    #[test]
    fn saved_config_reads_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let cfg = CliConfig {
            frames: 5,
            output: PathBuf::from("out.png"),
            ..CliConfig::default()
        };
        save_to_file(&path, &cfg).unwrap();
        assert_eq!(read_config(&path).unwrap(), cfg);
    }

    #[cfg(unix)]
    #[test]
    fn unserializable_config_is_an_error() {
        use std::{ffi::OsStr, os::unix::ffi::OsStrExt};

        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = CliConfig {
            output: PathBuf::from(OsStr::from_bytes(b"frame\xFF.png")),
            ..CliConfig::default()
        };
        assert!(matches!(
            save_to_file(&path, &cfg),
            Err(CliError::ConfigSerialize(_))
        ));
        assert!(!path.exists());
    }
}
