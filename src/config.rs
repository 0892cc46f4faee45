use crate::calendar::WeekStart;
use crate::model::Priority;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Shape of `config.yml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    week_start: Option<WeekStart>,
    data_dir: Option<PathBuf>,
    default_priority: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub week_start: WeekStart,
    pub data_dir: PathBuf,
    pub default_priority: Priority,
}

/// Values given on the command line or through the environment; they win
/// over the config file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub config_path: Option<PathBuf>,
    pub week_start: Option<WeekStart>,
    pub data_dir: Option<PathBuf>,
}

pub fn load(overrides: &Overrides) -> Result<Config> {
    let file = match &overrides.config_path {
        Some(path) => read_file_config(path)?,
        None => match default_config_path() {
            Some(path) if path.exists() => read_file_config(&path)?,
            _ => FileConfig::default(),
        },
    };
    resolve(file, overrides)
}

fn resolve(file: FileConfig, overrides: &Overrides) -> Result<Config> {
    let data_dir = match overrides.data_dir.clone().or(file.data_dir) {
        Some(dir) => dir,
        None => default_data_dir()?,
    };
    let config = Config {
        week_start: overrides.week_start.or(file.week_start).unwrap_or_default(),
        data_dir,
        default_priority: file
            .default_priority
            .as_deref()
            .map(Priority::parse_lenient)
            .unwrap_or_default(),
    };
    log::debug!("resolved config {:?}", config);
    Ok(config)
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    let data = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    if data.trim().is_empty() {
        return Ok(FileConfig::default());
    }
    serde_yaml::from_str(&data).with_context(|| format!("parsing config {:?}", path))
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "duecal")
}

fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("config.yml"))
}

fn default_data_dir() -> Result<PathBuf> {
    let dirs = project_dirs().context("locating data directory")?;
    Ok(dirs.data_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_values_apply() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(
            &path,
            "week_start: sunday\ndata_dir: /tmp/duecal-data\ndefault_priority: \"< 15 Minutes\"\n",
        )
        .unwrap();
        let config = load(&Overrides {
            config_path: Some(path),
            ..Overrides::default()
        })
        .unwrap();
        assert_eq!(config.week_start, WeekStart::Sunday);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/duecal-data"));
        assert_eq!(config.default_priority, Priority::Short);
    }

    #[test]
    fn overrides_win() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, "week_start: sunday\ndata_dir: /from/file\n").unwrap();
        let config = load(&Overrides {
            config_path: Some(path),
            week_start: Some(WeekStart::Monday),
            data_dir: Some(dir.path().to_path_buf()),
        })
        .unwrap();
        assert_eq!(config.week_start, WeekStart::Monday);
        assert_eq!(config.data_dir, dir.path());
        assert_eq!(config.default_priority, Priority::Medium);
    }

    #[test]
    fn empty_file_is_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, "").unwrap();
        let config = load(&Overrides {
            config_path: Some(path),
            data_dir: Some(dir.path().to_path_buf()),
            ..Overrides::default()
        })
        .unwrap();
        assert_eq!(config.week_start, WeekStart::Monday);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, "week_start: fortnightly\n").unwrap();
        let err = load(&Overrides {
            config_path: Some(path),
            ..Overrides::default()
        })
        .unwrap_err();
        assert!(format!("{:#}", err).contains("parsing config"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(load(&Overrides {
            config_path: Some(dir.path().join("absent.yml")),
            ..Overrides::default()
        })
        .is_err());
    }
}
