use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    pub database: String,
    /// Account id scoping the remote replica collections. None means the
    /// client runs local-only and never mirrors anything.
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default = "default_sync_enabled")]
    pub sync_enabled: bool,
    #[serde(default)]
    pub default_project: Option<String>,
}

fn default_sync_enabled() -> bool {
    false
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: Self::database_file().to_string_lossy().to_string(),
            owner_id: None,
            sync_enabled: default_sync_enabled(),
            default_project: None,
        }
    }
}

impl Config {
    /// Return the standard configuration directory depending on the platform.
    pub fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".tempolog")
    }

    /// Return the full path of the config file.
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("tempolog.conf")
    }

    /// Return the full path of the SQLite database.
    pub fn database_file() -> PathBuf {
        Self::config_dir().join("tempolog.sqlite")
    }

    /// Load configuration from file, or return defaults if not found.
    pub fn load() -> AppResult<Self> {
        let path = Self::config_file();

        if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_yaml::from_str(&content)
                .map_err(|e| AppError::Config(format!("failed to parse {}: {e}", path.display())))
        } else {
            Ok(Config::default())
        }
    }

    /// Initialize configuration and database files.
    pub fn init_all(custom_db: Option<String>, is_test: bool) -> AppResult<()> {
        let dir = Self::config_dir();

        // DB name: user provided or default
        let db_path = if let Some(name) = custom_db {
            let p = std::path::Path::new(&name);
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                dir.join(p)
            }
        } else {
            dir.join("tempolog.sqlite")
        };

        let config = Config {
            database: db_path.to_string_lossy().to_string(),
            ..Default::default()
        };

        // Write config file (skipped in test mode so test runs never touch
        // the user's real configuration)
        if !is_test {
            fs::create_dir_all(&dir)?;
            let yaml = serde_yaml::to_string(&config)
                .map_err(|e| AppError::Config(e.to_string()))?;
            let mut file = fs::File::create(Self::config_file())?;
            file.write_all(yaml.as_bytes())?;
            println!("✅ Config file: {:?}", Self::config_file());
        }

        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent)?;
        }
        if !db_path.exists() {
            fs::File::create(&db_path)?;
        }

        println!("✅ Database:    {:?}", db_path);

        Ok(())
    }
}
