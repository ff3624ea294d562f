use std::collections::BTreeMap;

use csm_store::{Driver, FilesystemDriver, HoleDriver, MemoryDriver, ParamMap, StoreResult};
use tracing::debug;

use crate::config::TYPE_KEY;
use crate::error::{ServiceError, ServiceResult};

/// Named constructor of a driver from its parameters (without the `type` tag).
pub type DriverConstructor = fn(&ParamMap) -> StoreResult<Box<dyn Driver>>;

/// Maps driver type tags to constructors.
#[derive(Clone)]
pub struct DriverFactory {
    constructors: BTreeMap<String, DriverConstructor>,
}

impl DriverFactory {
    /// A factory with no constructors.
    pub fn empty() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    /// A factory with the `filesystem`, `hole` and `memory` drivers.
    pub fn with_builtins() -> Self {
        let mut factory = Self::empty();
        factory.register(FilesystemDriver::KIND, |p| {
            Ok(Box::new(FilesystemDriver::from_map(p)?))
        });
        factory.register(HoleDriver::KIND, |p| Ok(Box::new(HoleDriver::from_map(p)?)));
        factory.register(MemoryDriver::KIND, |p| {
            Ok(Box::new(MemoryDriver::from_map(p)?))
        });
        factory
    }

    /// Add or replace the constructor for `tag`.
    pub fn register(&mut self, tag: impl Into<String>, constructor: DriverConstructor) {
        self.constructors.insert(tag.into(), constructor);
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.constructors.contains_key(tag)
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }

    /// Build a driver from a parameter set carrying a `type` tag.
    pub fn create(&self, params: &ParamMap) -> ServiceResult<Box<dyn Driver>> {
        let tag = params
            .get(TYPE_KEY)
            .and_then(|v| v.as_str())
            .ok_or_else(|| ServiceError::Configuration("driver params have no type".into()))?;
        let constructor = self.constructors.get(tag).ok_or_else(|| {
            ServiceError::Configuration(format!("unknown driver type \"{tag}\""))
        })?;

        let mut rest = params.clone();
        rest.remove(TYPE_KEY);
        debug!(tag, "creating driver");
        Ok(constructor(&rest)?)
    }
}

impl Default for DriverFactory {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl std::fmt::Debug for DriverFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverFactory")
            .field("tags", &self.tags())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: serde_json::Value) -> ParamMap {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn builtins_are_registered() {
        let factory = DriverFactory::default();
        assert_eq!(factory.tags(), vec!["filesystem", "hole", "memory"]);
    }

    #[test]
    fn create_by_tag() {
        let factory = DriverFactory::with_builtins();
        let driver = factory.create(&map(json!({"type": "hole"}))).unwrap();
        assert_eq!(driver.kind(), "hole");

        let dir = tempfile::tempdir().unwrap();
        let driver = factory
            .create(&map(json!({
                "type": "filesystem",
                "resource_path": dir.path(),
                "dir_mode": "775",
                "file_mode": "775",
            })))
            .unwrap();
        assert_eq!(driver.kind(), "filesystem");
    }

    #[test]
    fn missing_or_unknown_type() {
        let factory = DriverFactory::with_builtins();
        let err = factory.create(&ParamMap::new()).unwrap_err();
        assert!(err.to_string().contains("no type"));
        let err = factory.create(&map(json!({"type": "s3"}))).unwrap_err();
        assert!(err.to_string().contains("unknown driver type \"s3\""));
    }

    #[test]
    fn constructor_errors_propagate() {
        let err = DriverFactory::with_builtins()
            .create(&map(json!({"type": "filesystem"})))
            .unwrap_err();
        assert!(matches!(err, ServiceError::Store(_)));
    }

    #[test]
    fn register_custom_driver() {
        let mut factory = DriverFactory::empty();
        assert!(!factory.contains("null"));
        factory.register("null", |_| Ok(Box::new(HoleDriver::new(false))));
        let driver = factory.create(&map(json!({"type": "null"}))).unwrap();
        assert_eq!(driver.kind(), "hole");
    }
}
