use std::collections::HashMap;

use csm_store::{Driver, ParamMap};
use csm_types::Identifier;
use tracing::{debug, info};

use crate::config::ServiceConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::hash::params_key;
use crate::registry::DriverFactory;

/// Which driver a [`ContentService`] call should use.
pub enum DriverSelector {
    /// The driver named by `default_driver`.
    Default,
    /// A driver named in the service configuration.
    Named(String),
    /// An ad-hoc parameter set with a `type` tag.
    Params(ParamMap),
    /// A caller-built driver, registered under the key of its `params()`.
    Instance(Box<dyn Driver>),
}

impl From<&str> for DriverSelector {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

impl From<ParamMap> for DriverSelector {
    fn from(params: ParamMap) -> Self {
        Self::Params(params)
    }
}

impl From<Box<dyn Driver>> for DriverSelector {
    fn from(driver: Box<dyn Driver>) -> Self {
        Self::Instance(driver)
    }
}

impl std::fmt::Debug for DriverSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Default => write!(f, "Default"),
            Self::Named(name) => f.debug_tuple("Named").field(name).finish(),
            Self::Params(params) => f.debug_tuple("Params").field(params).finish(),
            Self::Instance(driver) => write!(f, "Instance({})", driver.kind()),
        }
    }
}

/// Resolves drivers from configuration and forwards content operations.
///
/// Drivers are created once per distinct parameter set and reused: two
/// names with identical effective parameters share one instance. The cache
/// key is computed when the driver is created; later `set_param` calls on
/// the returned driver do not re-key it.
pub struct ContentService {
    config: ServiceConfig,
    factory: DriverFactory,
    /// params key -> driver
    instances: HashMap<String, Box<dyn Driver>>,
    /// configured name -> params key
    names: HashMap<String, String>,
}

impl ContentService {
    /// Service with the built-in driver factory.
    pub fn new(config: ServiceConfig) -> ServiceResult<Self> {
        Self::with_factory(config, DriverFactory::with_builtins())
    }

    pub fn with_factory(config: ServiceConfig, factory: DriverFactory) -> ServiceResult<Self> {
        if config.default_driver.is_empty() {
            return Err(ServiceError::Configuration(
                "default driver is not set in service config".into(),
            ));
        }
        Ok(Self {
            config,
            factory,
            instances: HashMap::new(),
            names: HashMap::new(),
        })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn factory_mut(&mut self) -> &mut DriverFactory {
        &mut self.factory
    }

    /// Number of distinct driver instances created so far.
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Resolve `selector` to a driver, creating and caching it on first use.
    pub fn driver(&mut self, selector: DriverSelector) -> ServiceResult<&mut dyn Driver> {
        let key = match selector {
            DriverSelector::Default => {
                let name = self.config.default_driver.clone();
                self.named_key(&name)?
            }
            DriverSelector::Named(name) => self.named_key(&name)?,
            DriverSelector::Params(mut params) => {
                params.extend(self.config.shared.clone());
                self.params_key_for(&params)?
            }
            DriverSelector::Instance(driver) => {
                let key = params_key(&driver.params())?;
                debug!(kind = driver.kind(), key = %key, "registering driver instance");
                self.instances.insert(key.clone(), driver);
                key
            }
        };
        match self.instances.get_mut(&key) {
            Some(driver) => Ok(driver.as_mut()),
            None => Err(ServiceError::Configuration(format!(
                "driver instance {key} is not registered"
            ))),
        }
    }

    fn named_key(&mut self, name: &str) -> ServiceResult<String> {
        if let Some(key) = self.names.get(name) {
            return Ok(key.clone());
        }
        let params = self.config.driver_params(name)?;
        let key = self.params_key_for(&params)?;
        info!(name, key = %key, "driver resolved");
        self.names.insert(name.to_string(), key.clone());
        Ok(key)
    }

    fn params_key_for(&mut self, params: &ParamMap) -> ServiceResult<String> {
        let key = params_key(params)?;
        if !self.instances.contains_key(&key) {
            let driver = self.factory.create(params)?;
            self.instances.insert(key.clone(), driver);
        }
        Ok(key)
    }

    // -----------------------------------------------------------------------
    // Forwarding
    // -----------------------------------------------------------------------

    pub fn get(
        &mut self,
        selector: DriverSelector,
        ident: &Identifier,
        name: &str,
    ) -> ServiceResult<Option<Vec<u8>>> {
        Ok(self.driver(selector)?.get(ident, name)?)
    }

    pub fn set(
        &mut self,
        selector: DriverSelector,
        ident: &Identifier,
        content: &[u8],
        name: &str,
    ) -> ServiceResult<bool> {
        Ok(self.driver(selector)?.set(ident, content, name)?)
    }

    pub fn delete(
        &mut self,
        selector: DriverSelector,
        ident: &Identifier,
        name: &str,
    ) -> ServiceResult<bool> {
        Ok(self.driver(selector)?.delete(ident, name)?)
    }

    /// Existence check. Fails only when the driver can not be resolved.
    pub fn exists(
        &mut self,
        selector: DriverSelector,
        ident: &Identifier,
        name: &str,
    ) -> ServiceResult<bool> {
        Ok(self.driver(selector)?.exists(ident, name))
    }

    pub fn resolve_prepared_url(
        &mut self,
        selector: DriverSelector,
        ident: &Identifier,
        name: &str,
    ) -> ServiceResult<Option<String>> {
        Ok(self.driver(selector)?.resolve_prepared_url(ident, name)?)
    }

    pub fn copy(
        &mut self,
        selector: DriverSelector,
        source: &Identifier,
        dest: &Identifier,
        name: &str,
        dest_name: Option<&str>,
    ) -> ServiceResult<bool> {
        Ok(self.driver(selector)?.copy(source, dest, name, dest_name)?)
    }
}

impl std::fmt::Debug for ContentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentService")
            .field("default_driver", &self.config.default_driver)
            .field("instances", &self.instances.len())
            .finish()
    }
}
