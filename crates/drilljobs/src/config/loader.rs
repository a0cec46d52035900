use std::path::Path;

use crate::config::schema::EngineConfig;
use crate::error::ConfigError;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<EngineConfig, ConfigError> {
    let config: EngineConfig = serde_json::from_str(content)?;

    validate_config(&config)?;

    log::debug!("Loaded engine config: {:?}", config);
    Ok(config)
}

pub(crate) fn validate_config(config: &EngineConfig) -> Result<(), ConfigError> {
    if config.event_capacity == 0 {
        return Err(ConfigError::Validation {
            message: "eventCapacity must be greater than 0".to_string(),
        });
    }

    if config.fanout_concurrency == Some(0) {
        return Err(ConfigError::Validation {
            message: "fanoutConcurrency must be greater than 0 when set".to_string(),
        });
    }

    match config.default_kill_after_secs {
        Some(0) => {
            return Err(ConfigError::Validation {
                message: "defaultKillAfterSecs must be greater than 0 when set".to_string(),
            })
        }
        Some(secs) if config.default_kill_after().is_none() => {
            return Err(ConfigError::Validation {
                message: format!("defaultKillAfterSecs {} is out of range", secs),
            })
        }
        _ => {}
    }

    if config.log_page_limit == 0 {
        return Err(ConfigError::Validation {
            message: "logPageLimit must be greater than 0".to_string(),
        });
    }

    Ok(())
}
