//! JSON scenario files: floorplan, robots, scripts and requirements.

use anyhow::{anyhow, bail, Context, Result};
use floorsim_core::components::{Collidable, Inventory, Map, Position, Velocity};
use floorsim_core::des::standard_script;
use floorsim_core::glam::DVec2;
use floorsim_core::navigation::NavGraph;
use floorsim_core::processes::{changed_inventory, near_position, InventoryChange, TesterProcess};
use floorsim_core::{Entity, ProcessId, Simulation, SimulationConfig, World, WORLD_ENTITY};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub config: SimulationConfig,
    pub pois: BTreeMap<String, [f64; 2]>,
    /// Undirected corridor segments of the navigation graph.
    pub edges: Vec<[[f64; 2]; 2]>,
    pub walls: Vec<Rect>,
    pub robots: Vec<RobotSpec>,
    /// Objects lying around in the world inventory.
    pub world_objects: BTreeMap<String, Value>,
    pub requirements: Vec<RequirementSpec>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RobotSpec {
    pub name: String,
    pub x: f64,
    pub y: f64,
    #[serde(default = "default_robot_size")]
    pub width: f64,
    #[serde(default = "default_robot_size")]
    pub height: f64,
    #[serde(default)]
    pub script: Vec<String>,
    #[serde(default)]
    pub inventory: BTreeMap<String, Value>,
    #[serde(default = "default_true")]
    pub collidable: bool,
}

fn default_robot_size() -> f64 {
    10.0
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventoryChangeSpec {
    Added,
    Removed,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequirementSpec {
    NearPosition {
        label: String,
        robot: String,
        x: f64,
        y: f64,
        tolerance: f64,
    },
    ChangedInventory {
        label: String,
        /// Robot name, or `world` for the world inventory.
        owner: String,
        object: String,
        change: InventoryChangeSpec,
    },
}

/// Simulation built from a scenario, plus what the runtime needs to report.
pub struct Loaded {
    pub sim: Simulation,
    pub tester: ProcessId,
    pub robots: BTreeMap<String, Entity>,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        let scenario: Scenario = serde_json::from_str(&text)
            .with_context(|| format!("parsing scenario {}", path.display()))?;
        scenario
            .config
            .validate()
            .with_context(|| format!("invalid config in scenario {}", path.display()))?;
        debug!(
            robots = scenario.robots.len(),
            edges = scenario.edges.len(),
            "scenario loaded"
        );
        Ok(scenario)
    }

    fn world(&self) -> Result<(World, BTreeMap<String, Entity>)> {
        let mut world = World::new();
        let root = world.spawn();
        if root != WORLD_ENTITY {
            bail!("world entity must be the first entity");
        }

        let graph = NavGraph::from_edges(
            self.edges
                .iter()
                .map(|[a, b]| (DVec2::from_array(*a), DVec2::from_array(*b))),
        );
        let map = self
            .pois
            .iter()
            .fold(Map::new(graph), |map, (name, at)| {
                map.with_poi(name.clone(), DVec2::from_array(*at))
            });
        world.insert(root, map)?;
        world.insert(root, Inventory { objects: self.world_objects.clone() })?;

        for wall in &self.walls {
            let e = world.spawn();
            world.insert(e, Position::new(wall.x, wall.y, wall.width, wall.height).fixed())?;
            world.insert(e, Collidable)?;
        }

        let mut robots = BTreeMap::new();
        for spec in &self.robots {
            let e = world.spawn();
            world.insert(e, Position::new(spec.x, spec.y, spec.width, spec.height))?;
            world.insert(e, Velocity::default())?;
            world.insert(e, Inventory { objects: spec.inventory.clone() })?;
            world.insert(e, standard_script(spec.script.iter().cloned()))?;
            if spec.collidable {
                world.insert(e, Collidable)?;
            }
            if robots.insert(spec.name.clone(), e).is_some() {
                bail!("duplicate robot name '{}'", spec.name);
            }
        }
        Ok((world, robots))
    }

    fn tester(&self, robots: &BTreeMap<String, Entity>) -> Result<TesterProcess> {
        let lookup = |name: &str| -> Result<Entity> {
            if name == "world" {
                return Ok(WORLD_ENTITY);
            }
            robots
                .get(name)
                .copied()
                .ok_or_else(|| anyhow!("requirement refers to unknown robot '{name}'"))
        };

        let mut tester = TesterProcess::new().stop_on_verdict(true);
        for requirement in &self.requirements {
            tester = match requirement {
                RequirementSpec::NearPosition {
                    label,
                    robot,
                    x,
                    y,
                    tolerance,
                } => tester.with_requirement(
                    label.clone(),
                    near_position(lookup(robot)?, DVec2::new(*x, *y), *tolerance),
                ),
                RequirementSpec::ChangedInventory {
                    label,
                    owner,
                    object,
                    change,
                } => {
                    let change = match change {
                        InventoryChangeSpec::Added => InventoryChange::Added,
                        InventoryChangeSpec::Removed => InventoryChange::Removed,
                    };
                    tester.with_requirement(
                        label.clone(),
                        changed_inventory(lookup(owner)?, object.clone(), change),
                    )
                }
            };
        }
        Ok(tester)
    }

    /// Standard simulation for this scenario with the verifier attached.
    pub fn build(&self) -> Result<Loaded> {
        let (world, robots) = self.world()?;
        let tester = self.tester(&robots)?;
        let (mut sim, _) = Simulation::with_standard_systems(world, self.config.clone())?;
        let tester = sim.add_process(tester);
        info!(
            name = %self.config.name,
            robots = robots.len(),
            walls = self.walls.len(),
            requirements = self.requirements.len(),
            "scenario ready"
        );
        Ok(Loaded {
            sim,
            tester,
            robots,
        })
    }
}
