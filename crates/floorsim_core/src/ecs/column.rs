// column.rs - Per-variant component storage

use crate::ecs::{Component, ComponentValue, Entity};
use std::any::Any;
use std::collections::btree_map::{self, BTreeMap};

/// Dense-by-entity storage for one component variant.
///
/// Rows are kept in a `BTreeMap` keyed by entity so iteration order is
/// creation order.
#[derive(Debug, Clone)]
pub struct Column<T: Component> {
    rows: BTreeMap<Entity, T>,
}

impl<T: Component> Column<T> {
    pub fn new() -> Self {
        Self {
            rows: BTreeMap::new(),
        }
    }

    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.rows.get(&entity)
    }

    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        self.rows.get_mut(&entity)
    }

    /// Insert or overwrite, returning the previous value.
    pub fn insert(&mut self, entity: Entity, value: T) -> Option<T> {
        self.rows.insert(entity, value)
    }

    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        self.rows.remove(&entity)
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.rows.contains_key(&entity)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, Entity, T> {
        self.rows.iter()
    }

    pub fn iter_mut(&mut self) -> btree_map::IterMut<'_, Entity, T> {
        self.rows.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<T: Component> Default for Column<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Type-erased column interface used by the world.
pub(crate) trait ErasedColumn: Any {
    fn component_name(&self) -> &'static str;
    fn contains(&self, entity: Entity) -> bool;
    fn remove_entity(&mut self, entity: Entity) -> bool;
    fn value(&self, entity: Entity) -> Option<&dyn ComponentValue>;
    fn snapshot(&self) -> Vec<(Entity, Box<dyn ComponentValue>)>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> ErasedColumn for Column<T> {
    fn component_name(&self) -> &'static str {
        T::NAME
    }

    fn contains(&self, entity: Entity) -> bool {
        self.rows.contains_key(&entity)
    }

    fn remove_entity(&mut self, entity: Entity) -> bool {
        self.rows.remove(&entity).is_some()
    }

    fn value(&self, entity: Entity) -> Option<&dyn ComponentValue> {
        self.rows.get(&entity).map(|v| v as &dyn ComponentValue)
    }

    fn snapshot(&self) -> Vec<(Entity, Box<dyn ComponentValue>)> {
        self.rows
            .iter()
            .map(|(e, v)| (*e, v.clone_boxed()))
            .collect()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
