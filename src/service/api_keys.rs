use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

/// Registered API keys and the defaults each one carries
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    keys: Arc<HashMap<String, Value>>,
}

impl ApiKeys {
    pub fn new(keys: HashMap<String, Value>) -> Self {
        Self { keys: Arc::new(keys) }
    }

    pub fn check(&self, key: &str) -> bool {
        self.keys.contains_key(key)
    }

    /// Defaults object of `key`, or a single option from it. Keys whose
    /// defaults are not an object have none.
    pub fn defaults(&self, key: &str, option: Option<&str>) -> Option<Value> {
        let defaults = self.keys.get(key)?.as_object()?;
        match option {
            Some(option) => defaults.get(option).filter(|v| !v.is_null()).cloned(),
            None => Some(Value::Object(defaults.clone())),
        }
    }
}
