use crate::define_component;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Objects held by an entity, keyed by object id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    pub objects: BTreeMap<String, Value>,
}

define_component!(Inventory, super::INVENTORY_ID, "Inventory");

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(mut self, name: impl Into<String>, data: Value) -> Self {
        self.objects.insert(name.into(), data);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.objects.contains_key(name)
    }

    pub fn add(&mut self, name: impl Into<String>, data: Value) -> Option<Value> {
        self.objects.insert(name.into(), data)
    }

    pub fn take(&mut self, name: &str) -> Option<Value> {
        self.objects.remove(name)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
