//! Waypoint graph and route planning.

mod graph;
mod route;

pub use graph::{NavGraph, NodeId, SearchTree};
pub use route::{route, NavigationFn, PathNotFound};
