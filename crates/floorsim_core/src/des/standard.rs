// standard.rs - Default wiring of tick systems and processes
use crate::components::Script;
use crate::config::SimulationConfig;
use crate::des::{ProcessId, Simulation};
use crate::ecs::World;
use crate::error::SimError;
use crate::events::PATH_ERROR;
use crate::processes::{
    path_error_handler, ClawProcess, GotoProcess, InstructionSet, ScriptInterpreter,
    StopCollisionProcess,
};
use crate::systems::{CollisionSystem, MovementSystem, ObserverSystem, PathFollowSystem};

/// Ids of the processes registered by [`Simulation::with_standard_systems`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StandardHandles {
    pub goto: ProcessId,
    pub stop_collision: ProcessId,
    pub claw: ProcessId,
    pub interpreter: ProcessId,
}

impl Simulation {
    /// Simulation with the usual frame order (observer, movement, collision,
    /// path follow) and the navigation, collision, claw and script
    /// processes. Verifiers and telemetry are added by the caller.
    pub fn with_standard_systems(
        world: World,
        config: SimulationConfig,
    ) -> Result<(Self, StandardHandles), SimError> {
        let movement = MovementSystem::new(&config);
        let collision = CollisionSystem::new(&config);
        let mut sim = Simulation::new(world, config);

        sim.add_system(ObserverSystem::standard())?;
        sim.add_system(movement)?;
        sim.add_system(collision)?;
        sim.add_system(PathFollowSystem::new())?;

        let handles = StandardHandles {
            goto: sim.add_process(GotoProcess::new()),
            stop_collision: sim.add_process(StopCollisionProcess::new()),
            claw: sim.add_process(ClawProcess::new()),
            interpreter: sim.add_process(ScriptInterpreter::new(InstructionSet::standard())),
        };
        Ok((sim, handles))
    }
}

/// Script that recovers from unreachable targets by following the best
/// partial path.
pub fn standard_script<I, S>(instructions: I) -> Script
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Script::new(instructions).with_error_handler(PATH_ERROR, path_error_handler())
}
