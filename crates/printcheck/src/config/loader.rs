use std::collections::HashSet;
use std::path::Path;

use crate::config::schema::SuiteConfig;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/suite-v1.json");

/// Loads a suite file. Relative paths inside it are resolved against the
/// directory containing the file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SuiteConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut config = load_config_from_str(&content)?;
    if let Some(base) = path.parent() {
        resolve_relative_paths(&mut config, base);
    }
    Ok(config)
}

pub fn load_config_from_str(content: &str) -> Result<SuiteConfig, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: SuiteConfig = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &SuiteConfig) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.drive.folder_id.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "drive.folderId must not be empty".to_string(),
        });
    }

    for (name, value) in config.timeouts.entries() {
        // settle is the only wait that may be skipped entirely
        if value == 0 && name != "settleMs" {
            return Err(ConfigError::Validation {
                message: format!("timeouts.{} must be greater than zero", name),
            });
        }
    }

    config
        .ui
        .validate()
        .map_err(|message| ConfigError::Validation { message })?;

    let mut names = HashSet::new();
    for fixture in &config.fixtures {
        if !names.insert(fixture.name.as_str()) {
            return Err(ConfigError::InvalidFixture {
                name: fixture.name.clone(),
                reason: "Duplicate fixture name".to_string(),
            });
        }

        // Uploads are named after the local file and located by fixture name,
        // so the two must agree or the file would never be found.
        let file_name = fixture.path.file_name().and_then(|n| n.to_str());
        if file_name != Some(fixture.name.as_str()) {
            return Err(ConfigError::InvalidFixture {
                name: fixture.name.clone(),
                reason: format!(
                    "name must equal the file name of path '{}'",
                    fixture.path.display()
                ),
            });
        }
    }

    Ok(())
}

fn resolve_relative_paths(config: &mut SuiteConfig, base: &Path) {
    let resolve = |path: &mut std::path::PathBuf| {
        if path.is_relative() {
            *path = base.join(&*path);
        }
    };

    resolve(&mut config.drive.credentials_path);
    resolve(&mut config.drive.token_path);
    resolve(&mut config.browser.download_dir);
    for fixture in &mut config.fixtures {
        resolve(&mut fixture.path);
    }
}
