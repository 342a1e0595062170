// component.rs - Component trait and type-erased component values
//
// Components are identified by u32 IDs rather than Rust TypeIds so that
// snapshots, diffs and the control bridge can talk about a component
// variant by id or by name without knowing its concrete type.

use serde::Serialize;
use std::any::Any;
use std::fmt;

pub type ComponentId = u32;

/// Trait implemented by every component variant.
///
/// Equality is part of the contract: the observer diffs snapshots by
/// value, so `PartialEq` must compare the fields that make up the
/// component's observable state.
pub trait Component: 'static + Clone + PartialEq + fmt::Debug + Serialize {
    /// Globally unique component ID.
    const ID: ComponentId;

    /// Human-readable name, also used by bridge snapshots.
    const NAME: &'static str;
}

/// Helper macro to implement the Component trait.
///
/// # Example
/// ```ignore
/// #[derive(Clone, Debug, PartialEq, Serialize)]
/// struct Battery { charge: f64 }
///
/// define_component!(Battery, 100, "Battery");
/// ```
#[macro_export]
macro_rules! define_component {
    ($ty:ty, $id:expr, $name:expr) => {
        impl $crate::ecs::Component for $ty {
            const ID: $crate::ecs::ComponentId = $id;
            const NAME: &'static str = $name;
        }
    };
}

/// Object-safe view of a component value.
///
/// Snapshots hold `Box<dyn ComponentValue>` so components of different
/// variants can share one ordered list.
pub trait ComponentValue: fmt::Debug {
    fn component_id(&self) -> ComponentId;
    fn component_name(&self) -> &'static str;
    fn as_any(&self) -> &dyn Any;
    fn clone_boxed(&self) -> Box<dyn ComponentValue>;
    /// Field-wise equality; values of different variants are never equal.
    fn eq_value(&self, other: &dyn ComponentValue) -> bool;
    fn to_json(&self) -> serde_json::Value;
}

impl<T: Component> ComponentValue for T {
    fn component_id(&self) -> ComponentId {
        T::ID
    }

    fn component_name(&self) -> &'static str {
        T::NAME
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_boxed(&self) -> Box<dyn ComponentValue> {
        Box::new(self.clone())
    }

    fn eq_value(&self, other: &dyn ComponentValue) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl dyn ComponentValue {
    /// Downcast to a concrete component variant.
    pub fn downcast_ref<T: Component>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn is<T: Component>(&self) -> bool {
        self.component_id() == T::ID && self.as_any().is::<T>()
    }
}

impl PartialEq for dyn ComponentValue {
    fn eq(&self, other: &Self) -> bool {
        self.eq_value(other)
    }
}

impl Clone for Box<dyn ComponentValue> {
    fn clone(&self) -> Self {
        (**self).clone_boxed()
    }
}
