use std::collections::BTreeMap;
use std::path::Path;

use csm_store::ParamMap;
use serde::{Deserialize, Serialize};

use crate::error::{ServiceError, ServiceResult};

/// Key of the driver type tag inside a driver parameter table.
pub const TYPE_KEY: &str = "type";

/// Service configuration, usually loaded from TOML:
///
/// ```toml
/// default_driver = "main"
///
/// [shared]
/// strict = true
///
/// [drivers.main]
/// type = "filesystem"
/// resource_path = "/srv/resources"
/// resource_url = "/resources"
/// dir_mode = "775"
/// file_mode = "664"
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Driver used by [`DriverSelector::Default`](crate::DriverSelector::Default).
    pub default_driver: String,
    /// Named driver tables; each needs a `type` tag.
    pub drivers: BTreeMap<String, ParamMap>,
    /// Parameters merged into every named driver. They take precedence over
    /// the driver's own table.
    pub shared: ParamMap,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            default_driver: "main".into(),
            drivers: BTreeMap::new(),
            shared: ParamMap::new(),
        }
    }
}

impl ServiceConfig {
    pub fn from_toml_str(s: &str) -> ServiceResult<Self> {
        toml::from_str(s).map_err(|e| ServiceError::ConfigParse(e.to_string()))
    }

    pub fn from_path(path: impl AsRef<Path>) -> ServiceResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Builder: add or replace a named driver table.
    pub fn with_driver(mut self, name: impl Into<String>, params: ParamMap) -> Self {
        self.drivers.insert(name.into(), params);
        self
    }

    /// Effective parameters of driver `name`: its own table overlaid with the
    /// shared parameters.
    pub fn driver_params(&self, name: &str) -> ServiceResult<ParamMap> {
        let table = self.drivers.get(name).ok_or_else(|| {
            ServiceError::Configuration(format!(
                "driver \"{name}\" is not present in service config"
            ))
        })?;
        if !table.contains_key(TYPE_KEY) {
            return Err(ServiceError::Configuration(format!(
                "driver \"{name}\" has no type"
            )));
        }
        let mut params = table.clone();
        params.extend(self.shared.clone());
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SAMPLE: &str = r#"
default_driver = "files"

[shared]
strict = false

[drivers.files]
type = "filesystem"
resource_path = "/srv/resources"
dir_mode = 775
file_mode = "664"
strict = true

[drivers.void]
type = "hole"
"#;

    #[test]
    fn default_config() {
        let c = ServiceConfig::default();
        assert_eq!(c.default_driver, "main");
        assert!(c.drivers.is_empty());
        assert!(c.shared.is_empty());
    }

    #[test]
    fn parse_toml() {
        let c = ServiceConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(c.default_driver, "files");
        assert_eq!(c.drivers.len(), 2);
        assert_eq!(c.drivers["files"]["dir_mode"], json!(775));
        assert_eq!(c.drivers["void"][TYPE_KEY], json!("hole"));
    }

    #[test]
    fn shared_params_take_precedence() {
        let c = ServiceConfig::from_toml_str(SAMPLE).unwrap();
        let params = c.driver_params("files").unwrap();
        assert_eq!(params["strict"], json!(false));
        assert_eq!(params["resource_path"], json!("/srv/resources"));
    }

    #[test]
    fn unknown_driver_name() {
        let err = ServiceConfig::default().driver_params("x").unwrap_err();
        assert!(err
            .to_string()
            .contains("driver \"x\" is not present in service config"));
    }

    #[test]
    fn missing_type_tag() {
        let c = ServiceConfig::default().with_driver("main", ParamMap::new());
        let err = c.driver_params("main").unwrap_err();
        assert!(matches!(err, ServiceError::Configuration(_)));
    }

    #[test]
    fn invalid_toml() {
        let err = ServiceConfig::from_toml_str("default_driver = [").unwrap_err();
        assert!(matches!(err, ServiceError::ConfigParse(_)));
    }

    #[test]
    fn from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("csm.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        assert_eq!(ServiceConfig::from_path(&path).unwrap().default_driver, "files");
        assert!(matches!(
            ServiceConfig::from_path(dir.path().join("missing.toml")),
            Err(ServiceError::Io(_))
        ));
    }
}
