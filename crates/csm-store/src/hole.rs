use csm_types::Identifier;
use serde::Deserialize;

use crate::error::{StoreError, StoreResult};
use crate::policy::Strictness;
use crate::traits::{Driver, DriverParam, ParamMap};

/// Logical name that makes every [`HoleDriver`] operation fail.
pub const FAILING_NAME: &str = "error";

/// Fixed content returned by [`HoleDriver::get`].
pub const HOLE_CONTENT: &[u8] = b"content";

/// Fixed URL returned by [`HoleDriver::resolve_prepared_url`].
pub const HOLE_URL: &str = "http://url";

/// Null backend for wiring tests: stores nothing.
///
/// Every operation on a name other than [`FAILING_NAME`] succeeds with canned
/// results; operations on [`FAILING_NAME`] fail under the strict policy.
#[derive(Debug, Clone)]
pub struct HoleDriver {
    strict: bool,
}

#[derive(Deserialize)]
struct HoleConfig {
    #[serde(default = "strict_default")]
    strict: bool,
}

fn strict_default() -> bool {
    true
}

impl HoleDriver {
    pub const KIND: &'static str = "hole";

    pub fn new(strict: bool) -> Self {
        Self { strict }
    }

    pub fn from_map(map: &ParamMap) -> StoreResult<Self> {
        let value = serde_json::Value::Object(map.clone().into_iter().collect());
        let config: HoleConfig = serde_json::from_value(value)
            .map_err(|e| StoreError::Configuration(format!("hole params: {e}")))?;
        Ok(Self::new(config.strict))
    }

    fn strictness(&self) -> Strictness {
        Strictness::from_flag(self.strict)
    }

    fn check(name: &str) -> StoreResult<()> {
        if name == FAILING_NAME {
            return Err(StoreError::Configuration(format!(
                "hole driver refuses name {name:?}"
            )));
        }
        Ok(())
    }
}

impl Default for HoleDriver {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Driver for HoleDriver {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn get(&self, _ident: &Identifier, name: &str) -> StoreResult<Option<Vec<u8>>> {
        self.strictness()
            .settle("get", Self::check(name).map(|()| HOLE_CONTENT.to_vec()))
    }

    fn set(&self, _ident: &Identifier, _content: &[u8], name: &str) -> StoreResult<bool> {
        self.strictness().settle_flag("set", Self::check(name))
    }

    fn delete(&self, _ident: &Identifier, name: &str) -> StoreResult<bool> {
        self.strictness().settle_flag("delete", Self::check(name))
    }

    fn exists(&self, _ident: &Identifier, name: &str) -> bool {
        name != FAILING_NAME
    }

    fn resolve_prepared_url(&self, _ident: &Identifier, name: &str) -> StoreResult<Option<String>> {
        if name == FAILING_NAME {
            return Ok(None);
        }
        Ok(Some(HOLE_URL.to_string()))
    }

    fn copy(
        &self,
        _source: &Identifier,
        _dest: &Identifier,
        name: &str,
        _dest_name: Option<&str>,
    ) -> StoreResult<bool> {
        self.strictness().settle_flag("copy", Self::check(name))
    }

    fn params(&self) -> ParamMap {
        let mut map = ParamMap::new();
        map.insert("type".into(), Self::KIND.into());
        map.insert("strict".into(), self.strict.into());
        map
    }

    fn set_param(&mut self, param: DriverParam) -> StoreResult<()> {
        match param {
            DriverParam::Strict(strict) => {
                self.strict = strict;
                Ok(())
            }
            // Accepted and ignored: nothing is stored.
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident() -> Identifier {
        Identifier::default().directory("any")
    }

    #[test]
    fn canned_results() {
        let hole = HoleDriver::default();
        assert_eq!(hole.get(&ident(), "a").unwrap().unwrap(), b"content");
        assert!(hole.set(&ident(), b"ignored", "a").unwrap());
        assert!(hole.delete(&ident(), "a").unwrap());
        assert!(hole.copy(&ident(), &ident(), "a", Some("b")).unwrap());
        assert!(hole.exists(&ident(), "a"));
        assert_eq!(
            hole.resolve_prepared_url(&ident(), "a").unwrap().unwrap(),
            "http://url"
        );
    }

    #[test]
    fn error_name_fails_strictly() {
        let hole = HoleDriver::new(true);
        assert!(hole.get(&ident(), "error").is_err());
        assert!(hole.set(&ident(), b"x", "error").is_err());
        assert!(hole.delete(&ident(), "error").is_err());
        assert!(hole.copy(&ident(), &ident(), "error", Some("b")).is_err());
        assert!(!hole.exists(&ident(), "error"));
        assert_eq!(hole.resolve_prepared_url(&ident(), "error").unwrap(), None);
    }

    #[test]
    fn copy_checks_only_source_name() {
        let hole = HoleDriver::new(true);
        assert!(hole.copy(&ident(), &ident(), "a", Some("error")).unwrap());
    }

    #[test]
    fn error_name_is_sentinel_when_lenient() {
        let hole = HoleDriver::new(false);
        assert_eq!(hole.get(&ident(), "error").unwrap(), None);
        assert!(!hole.set(&ident(), b"x", "error").unwrap());
    }

    #[test]
    fn from_map_and_set_param() {
        let mut map = ParamMap::new();
        map.insert("strict".into(), false.into());
        let mut hole = HoleDriver::from_map(&map).unwrap();
        assert_eq!(hole.params()["strict"], false);
        hole.set_param(DriverParam::Strict(true)).unwrap();
        hole.set_param(DriverParam::ChainSize(1)).unwrap();
        assert_eq!(hole.params()["strict"], true);
    }
}
