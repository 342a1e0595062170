// world.rs - ECS World with entity management and column access

use crate::components;
use crate::ecs::column::ErasedColumn;
use crate::ecs::{Column, Component, ComponentId, ComponentValue, Entity};
use std::cell::{Ref, RefCell, RefMut};
use std::collections::{hash_map::Entry, BTreeSet, HashMap};
use thiserror::Error;
use tracing::warn;

/// Errors returned by world accessors.
#[derive(Debug, Error)]
pub enum WorldError {
    #[error("entity {0} does not exist")]
    EntityNotFound(Entity),

    #[error("entity {entity} has no {component} component")]
    ComponentNotFound {
        entity: Entity,
        component: &'static str,
    },

    #[error("component {component} is not registered")]
    NotRegistered { component: &'static str },

    #[error("column {component} is already borrowed")]
    BorrowConflict { component: &'static str },

    #[error("component id {id} is already registered for {component}")]
    TypeMismatch {
        id: ComponentId,
        component: &'static str,
    },
}

/// The main ECS world containing all entities and components.
pub struct World {
    next_entity_id: u64,
    alive: BTreeSet<Entity>,
    columns: HashMap<ComponentId, RefCell<Box<dyn ErasedColumn>>>,
    names: HashMap<&'static str, ComponentId>,
}

impl World {
    /// Create a world with every built-in component variant registered.
    pub fn new() -> Self {
        let mut world = Self {
            next_entity_id: 1,
            alive: BTreeSet::new(),
            columns: HashMap::new(),
            names: HashMap::new(),
        };
        world.register_unchecked::<components::Position>();
        world.register_unchecked::<components::Velocity>();
        world.register_unchecked::<components::Path>();
        world.register_unchecked::<components::Script>();
        world.register_unchecked::<components::Map>();
        world.register_unchecked::<components::Inventory>();
        world.register_unchecked::<components::Collidable>();
        world
    }

    fn register_unchecked<T: Component>(&mut self) {
        self.columns
            .insert(T::ID, RefCell::new(Box::new(Column::<T>::new())));
        self.names.insert(T::NAME, T::ID);
    }

    /// Register a component variant. Registering the same type twice is a
    /// no-op; reusing an id for a different type is an error.
    pub fn register<T: Component>(&mut self) -> Result<(), WorldError> {
        match self.columns.entry(T::ID) {
            Entry::Occupied(o) => {
                let column = o.get().borrow();
                if column.as_any().is::<Column<T>>() {
                    Ok(())
                } else {
                    Err(WorldError::TypeMismatch {
                        id: T::ID,
                        component: column.component_name(),
                    })
                }
            }
            Entry::Vacant(v) => {
                v.insert(RefCell::new(Box::new(Column::<T>::new())));
                self.names.insert(T::NAME, T::ID);
                Ok(())
            }
        }
    }

    pub fn is_registered<T: Component>(&self) -> bool {
        self.columns.contains_key(&T::ID)
    }

    /// Allocate a new entity handle.
    pub fn spawn(&mut self) -> Entity {
        let entity = Entity::from_raw(self.next_entity_id);
        self.next_entity_id += 1;
        self.alive.insert(entity);
        entity
    }

    /// Remove the entity and all of its components.
    pub fn despawn(&mut self, entity: Entity) -> bool {
        if !self.alive.remove(&entity) {
            return false;
        }
        for column in self.columns.values_mut() {
            column.get_mut().remove_entity(entity);
        }
        true
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.alive.contains(&entity)
    }

    /// Live entities in creation order.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.alive.iter().copied()
    }

    /// Attach a component, overwriting any existing one of the same variant.
    pub fn insert<T: Component>(
        &mut self,
        entity: Entity,
        component: T,
    ) -> Result<Option<T>, WorldError> {
        if !self.alive.contains(&entity) {
            return Err(WorldError::EntityNotFound(entity));
        }
        let mut column = self.column_mut::<T>()?;
        let previous = column.insert(entity, component);
        Ok(previous)
    }

    pub fn remove<T: Component>(&mut self, entity: Entity) -> Option<T> {
        self.column_mut::<T>().ok()?.remove(entity)
    }

    /// Borrow a component of an entity.
    pub fn get<T: Component>(&self, entity: Entity) -> Result<Ref<'_, T>, WorldError> {
        if !self.alive.contains(&entity) {
            return Err(WorldError::EntityNotFound(entity));
        }
        let column = self.column::<T>()?;
        Ref::filter_map(column, |c| c.get(entity)).map_err(|_| WorldError::ComponentNotFound {
            entity,
            component: T::NAME,
        })
    }

    /// Mutably borrow a component of an entity.
    pub fn get_mut<T: Component>(&self, entity: Entity) -> Result<RefMut<'_, T>, WorldError> {
        if !self.alive.contains(&entity) {
            return Err(WorldError::EntityNotFound(entity));
        }
        let column = self.column_mut::<T>()?;
        RefMut::filter_map(column, |c| c.get_mut(entity)).map_err(|_| {
            WorldError::ComponentNotFound {
                entity,
                component: T::NAME,
            }
        })
    }

    /// Whether `entity` holds a `T`. A column mutably borrowed elsewhere
    /// reads as absent and logs a warning; [`World::try_has`] reports the
    /// conflict instead.
    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.has_id(entity, T::ID)
    }

    pub fn try_has<T: Component>(&self, entity: Entity) -> Result<bool, WorldError> {
        self.try_has_id(entity, T::ID)
    }

    fn has_id(&self, entity: Entity, id: ComponentId) -> bool {
        self.try_has_id(entity, id).unwrap_or_else(|err| {
            warn!(%entity, %err, "membership test on a borrowed column");
            false
        })
    }

    fn try_has_id(&self, entity: Entity, id: ComponentId) -> Result<bool, WorldError> {
        let Some(cell) = self.columns.get(&id) else {
            return Ok(false);
        };
        let column = cell.try_borrow().map_err(|_| WorldError::BorrowConflict {
            component: self.name_of(id),
        })?;
        Ok(column.contains(entity))
    }

    fn name_of(&self, id: ComponentId) -> &'static str {
        self.names
            .iter()
            .find(|(_, known)| **known == id)
            .map_or("<unregistered>", |(name, _)| *name)
    }

    pub fn has_all(&self, entity: Entity, ids: &[ComponentId]) -> bool {
        self.alive.contains(&entity) && ids.iter().all(|&id| self.has_id(entity, id))
    }

    /// Entities holding every listed variant, in creation order. Same
    /// borrow caveat as [`World::has`].
    pub fn query(&self, ids: &[ComponentId]) -> Vec<Entity> {
        self.alive
            .iter()
            .copied()
            .filter(|&e| ids.iter().all(|&id| self.has_id(e, id)))
            .collect()
    }

    /// [`World::query`] that fails on a column held mutably elsewhere.
    pub fn try_query(&self, ids: &[ComponentId]) -> Result<Vec<Entity>, WorldError> {
        let mut found = Vec::new();
        'entities: for &entity in &self.alive {
            for &id in ids {
                if !self.try_has_id(entity, id)? {
                    continue 'entities;
                }
            }
            found.push(entity);
        }
        Ok(found)
    }

    /// Typed read access to a whole column.
    pub fn column<T: Component>(&self) -> Result<Ref<'_, Column<T>>, WorldError> {
        let cell = self
            .columns
            .get(&T::ID)
            .ok_or(WorldError::NotRegistered { component: T::NAME })?;
        let column = cell
            .try_borrow()
            .map_err(|_| WorldError::BorrowConflict { component: T::NAME })?;
        Ref::filter_map(column, |c| c.as_any().downcast_ref::<Column<T>>()).map_err(|_| {
            WorldError::TypeMismatch {
                id: T::ID,
                component: T::NAME,
            }
        })
    }

    /// Typed write access to a whole column.
    pub fn column_mut<T: Component>(&self) -> Result<RefMut<'_, Column<T>>, WorldError> {
        let cell = self
            .columns
            .get(&T::ID)
            .ok_or(WorldError::NotRegistered { component: T::NAME })?;
        let column = cell
            .try_borrow_mut()
            .map_err(|_| WorldError::BorrowConflict { component: T::NAME })?;
        RefMut::filter_map(column, |c| c.as_any_mut().downcast_mut::<Column<T>>()).map_err(|_| {
            WorldError::TypeMismatch {
                id: T::ID,
                component: T::NAME,
            }
        })
    }

    /// Clone every value of one variant, in entity order.
    pub fn snapshot_column(&self, id: ComponentId) -> Vec<(Entity, Box<dyn ComponentValue>)> {
        self.columns
            .get(&id)
            .and_then(|c| c.try_borrow().ok().map(|c| c.snapshot()))
            .unwrap_or_default()
    }

    /// Clone a single component value by variant id.
    pub fn component_value(
        &self,
        entity: Entity,
        id: ComponentId,
    ) -> Option<Box<dyn ComponentValue>> {
        let column = self.columns.get(&id)?.try_borrow().ok()?;
        column.value(entity).map(|v| v.clone_boxed())
    }

    pub fn component_id_by_name(&self, name: &str) -> Option<ComponentId> {
        self.names.get(name).copied()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
