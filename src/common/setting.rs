//! setting config file
//! reads `config_{ENV}.toml` from the working directory, ENV defaults to `dev`

use std::{fs::File, io::Read, path::Path};
use dotenv::dotenv;
use lazy_static::lazy_static;
use serde_derive::Deserialize;
use std::env;
use super::error::DriverError;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
pub const DEFAULT_DEVICE_ADDRESS: u8 = 0x20;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Env {
    pub debug: bool,
    pub env: String,
    pub log_level: String,
}

impl Default for Env {
    fn default() -> Self {
        Env {
            debug: false,
            env: String::from("dev"),
            log_level: String::from("info"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Board {
    // input polling interval in milliseconds
    pub poll_interval_ms: u64,
    // hardware address of the expander chip, 0x20 - 0x27
    pub device_address: u8,
}

impl Default for Board {
    fn default() -> Self {
        Board {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            device_address: DEFAULT_DEVICE_ADDRESS,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Settings {
    pub env: Env,
    pub board: Board,
}

impl Settings {
    pub fn get<'a>() -> &'a Self {
        lazy_static! {
            static ref CACHE: Settings = Settings::from_env();
        }
        &CACHE
    }

    /// load settings from the file selected by the ENV variable
    /// - falls back to defaults if the file is missing or broken
    pub fn from_env() -> Self {
        dotenv().ok();
        let env = match env::var("ENV") {
            Ok(e) => e,
            Err(_) => {
                log::warn!("no ENV set, use default: 'dev'");
                String::from("dev")
            }
        };

        let file_path = format!("config_{}.toml", env);
        match Settings::load(&file_path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("cannot load {}, use default settings: {}", file_path, e);
                Settings::default()
            }
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DriverError> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| {
            DriverError::Config(format!("no such file {}, exception: {}", path.display(), e))
        })?;

        let mut str_val = String::new();
        file.read_to_string(&mut str_val).map_err(|e| {
            DriverError::Config(format!("cannot read config file {}, exception: {}", path.display(), e))
        })?;

        Settings::parse(&str_val)
    }

    pub fn parse(content: &str) -> Result<Self, DriverError> {
        toml::from_str(content).map_err(|e| DriverError::Config(format!("config file format invalid: {}", e)))
    }
}
