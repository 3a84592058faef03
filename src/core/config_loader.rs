//! Configuration file loader for pypi-publisher
//!
//! This module provides configuration loading, merging and environment
//! variable expansion.

use super::config::*;
use crate::core::error::PublishError;
use crate::core::traits::StepCommand;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tokio::fs;

/// Configuration file name
pub const CONFIG_FILENAME: &str = ".publish-config.yaml";

/// Environment variable pattern (${VAR_NAME})
const ENV_VAR_PATTERN: &str = r"\$\{([A-Z_][A-Z0-9_]*)\}";

/// Maximum depth of `extends` chains
const MAX_EXTENDS_DEPTH: usize = 8;

type LoadFuture<'a> = Pin<Box<dyn Future<Output = Result<Option<PublishConfig>, PublishError>> + Send + 'a>>;

/// Configuration load options
#[derive(Debug, Clone, Default)]
pub struct ConfigLoadOptions {
    /// Project path to load config from
    pub project_path: PathBuf,

    /// CLI arguments (highest priority)
    pub cli_args: Option<PublishConfig>,

    /// Environment variables
    pub env: HashMap<String, String>,
}

/// Configuration file loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from multiple sources with priority
    ///
    /// Priority (high to low):
    /// 1. CLI arguments
    /// 2. Environment variables
    /// 3. Project config (./.publish-config.yaml)
    /// 4. Global config ($HOME/.publish-config.yaml)
    /// 5. Default values
    pub async fn load(options: ConfigLoadOptions) -> Result<PublishConfig, PublishError> {
        let mut configs: Vec<PublishConfig> = Vec::new();

        // 4. Global config
        if let Some(home) = options.env.get("HOME") {
            let global_config_path = PathBuf::from(home).join(CONFIG_FILENAME);
            if let Some(global_config) = Self::load_config_file(&global_config_path, 0).await? {
                tracing::debug!(path = %global_config_path.display(), "loaded global config");
                configs.push(global_config);
            }
        }

        // 3. Project config
        let project_config_path = options.project_path.join(CONFIG_FILENAME);
        if let Some(project_config) = Self::load_config_file(&project_config_path, 0).await? {
            tracing::debug!(path = %project_config_path.display(), "loaded project config");
            configs.push(project_config);
        }

        // 2. Environment variables
        if let Some(env_config) = Self::load_env_config(&options.env) {
            tracing::debug!("applied environment overrides");
            configs.push(env_config);
        }

        // 1. CLI arguments (highest priority)
        if let Some(cli_config) = options.cli_args {
            configs.push(cli_config);
        }

        let merged_config = Self::merge_configs(configs);

        Self::expand_env_vars(merged_config, &options.env)
    }

    /// Load configuration from a YAML file, following `extends`
    fn load_config_file(file_path: &Path, depth: usize) -> LoadFuture<'_> {
        Box::pin(async move {
            if !fs::try_exists(file_path).await.unwrap_or(false) {
                return Ok(None);
            }

            if depth > MAX_EXTENDS_DEPTH {
                return Err(PublishError::ConfigError(format!(
                    "extends chain too deep at {}",
                    file_path.display()
                )));
            }

            let content = fs::read_to_string(file_path).await.map_err(|e| {
                PublishError::ConfigError(format!(
                    "Failed to read {}: {}",
                    file_path.display(),
                    e
                ))
            })?;

            // An empty file is a valid, empty config
            if content.trim().is_empty() {
                return Ok(Some(PublishConfig::default()));
            }

            let config: PublishConfig = serde_yaml::from_str(&content).map_err(|e| {
                PublishError::ConfigError(format!(
                    "Failed to parse {}: {}",
                    file_path.display(),
                    e
                ))
            })?;

            if let Some(extends_path) = &config.extends {
                let base_path = file_path
                    .parent()
                    .ok_or_else(|| {
                        PublishError::ConfigError("Invalid config file path".to_string())
                    })?
                    .join(extends_path);

                match Self::load_config_file(&base_path, depth + 1).await? {
                    Some(base_config) => {
                        return Ok(Some(Self::merge_configs(vec![base_config, config])));
                    }
                    None => {
                        return Err(PublishError::ConfigError(format!(
                            "Base config not found: {}",
                            base_path.display()
                        )));
                    }
                }
            }

            Ok(Some(config))
        })
    }

    /// Load configuration from environment variables
    fn load_env_config(env: &HashMap<String, String>) -> Option<PublishConfig> {
        let mut config = PublishConfig::default();
        let mut has_changes = false;

        // PUBLISH_REPOSITORY -> repository
        if let Some(repository) = env.get("PUBLISH_REPOSITORY").filter(|r| !r.is_empty()) {
            config.repository = Some(repository.clone());
            has_changes = true;
        }

        // PUBLISH_PACKAGE_NAME -> package_name
        if let Some(name) = env.get("PUBLISH_PACKAGE_NAME").filter(|n| !n.is_empty()) {
            config.package_name = Some(name.clone());
            has_changes = true;
        }

        // PUBLISH_NON_INTERACTIVE -> confirm
        if env.get("PUBLISH_NON_INTERACTIVE").map(|s| s.as_str()) == Some("true") {
            config.confirm = Some(false);
            has_changes = true;
        }

        if has_changes { Some(config) } else { None }
    }

    /// Merge multiple configurations; later entries win
    fn merge_configs(configs: Vec<PublishConfig>) -> PublishConfig {
        let mut result = PublishConfig::default();

        for config in configs {
            Self::merge_into(&mut result, config);
        }

        result
    }

    /// Merge source config into target
    fn merge_into(target: &mut PublishConfig, source: PublishConfig) {
        if source.manifest.is_some() {
            target.manifest = source.manifest;
        }
        if source.dist_dir.is_some() {
            target.dist_dir = source.dist_dir;
        }
        if source.package_name.is_some() {
            target.package_name = source.package_name;
        }
        if source.repository.is_some() {
            target.repository = source.repository;
        }
        if source.confirm.is_some() {
            target.confirm = source.confirm;
        }
        if source.timeout_secs.is_some() {
            target.timeout_secs = source.timeout_secs;
        }

        // Commands merge per step
        if let Some(mut source_commands) = source.commands {
            let target_commands = target.commands.get_or_insert_with(CommandsConfig::default);
            for (target_step, source_step) in target_commands
                .steps_mut()
                .into_iter()
                .zip(source_commands.steps_mut())
            {
                if source_step.is_some() {
                    *target_step = source_step.take();
                }
            }
        }
    }

    /// Expand ${VAR} placeholders in commands, repository and package name
    fn expand_env_vars(
        mut config: PublishConfig,
        env: &HashMap<String, String>,
    ) -> Result<PublishConfig, PublishError> {
        let env_var_regex = Regex::new(ENV_VAR_PATTERN)
            .map_err(|e| PublishError::ConfigError(format!("Invalid variable pattern: {}", e)))?;

        config.repository = config
            .repository
            .map(|repository| Self::expand_string(&env_var_regex, &repository, env));
        config.package_name = config
            .package_name
            .map(|name| Self::expand_string(&env_var_regex, &name, env));

        if let Some(commands) = &mut config.commands {
            for command in commands.steps_mut().into_iter().flatten() {
                *command = Self::expand_command(&env_var_regex, command, env);
            }
        }

        Ok(config)
    }

    fn expand_command(
        regex: &Regex,
        command: &StepCommand,
        env: &HashMap<String, String>,
    ) -> StepCommand {
        StepCommand {
            program: Self::expand_string(regex, &command.program, env),
            args: command
                .args
                .iter()
                .map(|arg| Self::expand_string(regex, arg, env))
                .collect(),
        }
    }

    /// Expand environment variables in a single string
    ///
    /// Unknown variables are left untouched.
    fn expand_string(regex: &Regex, input: &str, env: &HashMap<String, String>) -> String {
        regex
            .replace_all(input, |caps: &Captures| match env.get(&caps[1]) {
                Some(value) => value.clone(),
                None => {
                    tracing::warn!(variable = &caps[1], "environment variable not found");
                    caps[0].to_string()
                }
            })
            .into_owned()
    }
}
