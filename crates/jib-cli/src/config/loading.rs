use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format as _, Json, Serialized},
};

use crate::config::AppConfig;
use crate::error::{ConfigError, Result};

impl AppConfig {
    /// Load configuration for a project.
    ///
    /// Priority: `JIB_` environment variables > jib.config.json > defaults.
    /// A missing config file is not an error; a malformed one is.
    pub fn load(config_file: &Path) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));

        if config_file.is_file() {
            figment = figment.merge(Json::file(config_file));
        }

        // JIB_PORT, JIB_PUBLIC_PATH, JIB_DOCKER_IMAGE, ... (snake_case env
        // keys match through the serde aliases on AppConfig).
        figment = figment.merge(Env::prefixed("JIB_").ignore(&["root"]));

        let config: AppConfig = figment.extract().map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !self.public_path.starts_with('/') {
            return Err(ConfigError::InvalidValue {
                field: "publicPath",
                value: self.public_path.clone(),
                hint: "The public path is a URL prefix and must start with '/'.",
            }
            .into());
        }
        if !self.globals.is_object() {
            return Err(ConfigError::InvalidValue {
                field: "globals",
                value: self.globals.to_string(),
                hint: "globals must be a JSON object of free variables.",
            }
            .into());
        }
        Ok(())
    }
}
