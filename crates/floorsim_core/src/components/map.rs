use crate::define_component;
use crate::math::Point;
use crate::navigation::NavGraph;
use serde::Serialize;
use std::collections::BTreeMap;

/// Navigation graph plus named points of interest. Lives on the world
/// entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Map {
    pub graph: NavGraph,
    pub pois: BTreeMap<String, Point>,
}

define_component!(Map, super::MAP_ID, "Map");

impl Map {
    pub fn new(graph: NavGraph) -> Self {
        Self {
            graph,
            pois: BTreeMap::new(),
        }
    }

    pub fn with_poi(mut self, name: impl Into<String>, point: Point) -> Self {
        self.pois.insert(name.into(), point);
        self
    }

    pub fn poi(&self, name: &str) -> Option<Point> {
        self.pois.get(name).copied()
    }
}
