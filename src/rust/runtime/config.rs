// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::runtime::fail::Fail;
use ::std::{
    fs::File,
    io::Read,
    ops::Index,
    str::FromStr,
    time::Duration,
};
use ::yaml_rust::{
    Yaml,
    YamlLoader,
};

//======================================================================================================================
// Constants
//======================================================================================================================

/// Log specification used when neither the environment nor the configuration file provide one.
pub const DEFAULT_LOG_SPEC: &str = "info";

// Options for the synchronous driver.
mod syncdrive_config {
    pub const SECTION_NAME: &str = "syncdrive";
    // Log specification handed to the logger.
    pub const LOG_SPEC: &str = "log_spec";
    // Upper bound on a single blocking poll of the default event list.
    pub const MAX_WAIT_MS: &str = "max_wait_ms";
}

//======================================================================================================================
// Structures
//======================================================================================================================

/// Synchronous driver configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Yaml);

//======================================================================================================================
// Associated Functions
//======================================================================================================================

impl Config {
    /// Reads a configuration file into a [Config] object.
    pub fn new(config_path: &str) -> Result<Self, Fail> {
        let mut config_s: String = String::new();
        File::open(config_path)?.read_to_string(&mut config_s)?;
        Self::from_yaml(&config_s)
    }

    /// Parses a configuration document.
    pub fn from_yaml(config_s: &str) -> Result<Self, Fail> {
        let config: Vec<Yaml> = match YamlLoader::load_from_str(config_s) {
            Ok(config) => config,
            Err(e) => {
                let cause: String = format!("malformed configuration: {}", e);
                return Err(Fail::new(libc::EINVAL, &cause));
            },
        };
        match &config[..] {
            [c] => Ok(Self(c.clone())),
            // An empty document is a valid, all-defaults configuration.
            [] => Ok(Self::default()),
            _ => Err(Fail::new(libc::EINVAL, "Wrong number of config objects")),
        }
    }

    /// Returns the driver section, if present.
    fn get_syncdrive_config(&self) -> Result<Option<&Yaml>, Fail> {
        let section: &Yaml = self.0.index(syncdrive_config::SECTION_NAME);
        match section {
            Yaml::BadValue => Ok(None),
            Yaml::Hash(_) => Ok(Some(section)),
            _ => {
                let message: String = format!("parameter \"{}\" has unexpected type", syncdrive_config::SECTION_NAME);
                Err(Fail::new(libc::EINVAL, message.as_str()))
            },
        }
    }

    /// Reads the log specification from the environment variable first and then the configuration file.
    pub fn log_spec(&self) -> Result<String, Fail> {
        if let Some(spec) = Self::get_typed_env_option::<String>(syncdrive_config::LOG_SPEC)? {
            return Ok(spec);
        }
        match self.get_syncdrive_config()? {
            Some(section) => match Self::get_optional(section, syncdrive_config::LOG_SPEC) {
                Some(option) => match option.as_str() {
                    Some(spec) => Ok(spec.to_string()),
                    None => {
                        let message: String = format!("parameter {} has unexpected type", syncdrive_config::LOG_SPEC);
                        Err(Fail::new(libc::EINVAL, message.as_str()))
                    },
                },
                None => Ok(DEFAULT_LOG_SPEC.to_string()),
            },
            None => Ok(DEFAULT_LOG_SPEC.to_string()),
        }
    }

    /// Reads the maximum time a blocking poll may sleep. `None` means until the next timer.
    pub fn max_wait(&self) -> Result<Option<Duration>, Fail> {
        if let Some(ms) = Self::get_typed_env_option::<u64>(syncdrive_config::MAX_WAIT_MS)? {
            return Ok(Some(Duration::from_millis(ms)));
        }
        match self.get_syncdrive_config()? {
            Some(section) => match Self::get_optional(section, syncdrive_config::MAX_WAIT_MS) {
                Some(_) => {
                    let ms: u64 = Self::get_int_option(section, syncdrive_config::MAX_WAIT_MS)?;
                    Ok(Some(Duration::from_millis(ms)))
                },
                None => Ok(None),
            },
            None => Ok(None),
        }
    }

    /// Index `yaml` to find the value at `index`, returning `None` when it is absent.
    fn get_optional<'a>(yaml: &'a Yaml, index: &str) -> Option<&'a Yaml> {
        match yaml.index(index) {
            Yaml::BadValue => None,
            value => Some(value),
        }
    }

    /// Get value where the environment value overrides the config file if it exists.
    fn get_typed_env_option<T: FromStr>(index: &str) -> Result<Option<T>, Fail> {
        if let Ok(var) = ::std::env::var(index.to_uppercase()) {
            if let Ok(value) = var.as_str().parse() {
                return Ok(Some(value));
            } else {
                let message: String = format!("parameter {} has unexpected type", index);
                return Err(Fail::new(libc::EINVAL, message.as_str()));
            }
        }
        Ok(None)
    }

    /// Reads an integer option and verifies that the destination type may hold the i64 value.
    fn get_int_option<T: TryFrom<i64>>(yaml: &Yaml, index: &str) -> Result<T, Fail> {
        let val: i64 = match yaml.index(index).as_i64() {
            Some(val) => val,
            None => {
                let message: String = format!("parameter {} has unexpected type", index);
                return Err(Fail::new(libc::EINVAL, message.as_str()));
            },
        };
        match T::try_from(val) {
            Ok(val) => Ok(val),
            _ => {
                let message: String = format!("parameter \"{}\" is out of range", index);
                Err(Fail::new(libc::ERANGE, message.as_str()))
            },
        }
    }
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

impl Default for Config {
    fn default() -> Self {
        Self(Yaml::Hash(Default::default()))
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================
