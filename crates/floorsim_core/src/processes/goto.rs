//! Navigation requests: `Go` instruction, goto process and the default
//! recovery for failed routes.

use crate::components::{ErrorHandler, Map, Position, Script, ScriptState};
use crate::des::{Process, SimContext, Wake, Yield};
use crate::ecs::{Entity, WORLD_ENTITY};
use crate::error::{InstructionError, SimError};
use crate::events::{
    Event, EventFilter, EventStore, PathErrorKind, PathErrorPayload, Payload, END_OF_PATH,
    GOTO_POI, GOTO_POS, PATH_ERROR,
};
use crate::math::{same_place, Point};
use crate::navigation::{route, NavigationFn};
use tracing::{debug, error, info, warn};

/// Plans routes for goto requests and attaches them as Path components.
pub struct GotoProcess {
    navigate: NavigationFn,
}

impl GotoProcess {
    pub fn new() -> Self {
        Self::with_navigation(route)
    }

    pub fn with_navigation(navigate: NavigationFn) -> Self {
        Self { navigate }
    }

    fn filter() -> EventFilter {
        EventFilter::tags([GOTO_POI, GOTO_POS])
    }

    fn handle(&self, ctx: &mut SimContext, event: &Event) -> Result<(), SimError> {
        let map = ctx
            .world
            .get::<Map>(WORLD_ENTITY)
            .map_err(|_| SimError::MissingContext("Map on the world entity"))?;

        let (entity, target) = match event.payload() {
            Payload::GotoPoi { entity, target } => match map.poi(target) {
                Some(point) => (*entity, point),
                None => {
                    drop(map);
                    error!(%entity, poi = %target, "POI does not exist in map");
                    ctx.publish(Event::error(
                        PATH_ERROR,
                        *entity,
                        Payload::PathError(PathErrorPayload {
                            entity: *entity,
                            error: PathErrorKind::PoiNotFound {
                                poi: target.clone(),
                            },
                        }),
                    ));
                    return Ok(());
                }
            },
            Payload::GotoPos { entity, target } => (*entity, *target),
            other => {
                warn!(tag = event.tag(), payload = ?other, "goto request with unexpected payload");
                return Ok(());
            }
        };

        let Some(source) = ctx.world.get::<Position>(entity).ok().map(|p| p.center()) else {
            warn!(%entity, "goto request for entity without position");
            return Ok(());
        };

        if same_place(source, target) {
            drop(map);
            warn!(%entity, "already at destination");
            ctx.publish(Event::signal(
                END_OF_PATH,
                Payload::EndOfPath {
                    entity,
                    timestamp: ctx.now(),
                    path: Vec::new(),
                },
            ));
            return Ok(());
        }

        let planned = (self.navigate)(&map, source, target);
        drop(map);

        match planned {
            Ok(mut path) => {
                path.speed = ctx.config.path_speed;
                ctx.world
                    .get_mut::<Map>(WORLD_ENTITY)?
                    .graph
                    .add_nodes_from_points(&path.points);
                debug!(%entity, waypoints = path.points.len(), "path attached");
                ctx.world.insert(entity, path)?;
            }
            Err(err) => {
                warn!(%entity, %err, best = ?err.partial_path.points, "failed to go to point");
                let mut best_path = err.partial_path;
                best_path.speed = ctx.config.path_speed;
                ctx.publish(Event::error(
                    PATH_ERROR,
                    entity,
                    Payload::PathError(PathErrorPayload {
                        entity,
                        error: PathErrorKind::PathNotFound { best_path },
                    }),
                ));
            }
        }
        Ok(())
    }
}

impl Default for GotoProcess {
    fn default() -> Self {
        Self::new()
    }
}

impl Process for GotoProcess {
    fn name(&self) -> &str {
        "goto"
    }

    fn resume(&mut self, ctx: &mut SimContext, wake: Wake) -> Result<Yield, SimError> {
        match wake {
            Wake::Start => {
                if !ctx.world.has::<Map>(WORLD_ENTITY) {
                    return Err(SimError::MissingContext("Map on the world entity"));
                }
            }
            Wake::Event(event) => self.handle(ctx, &event)?,
            Wake::Timeout => {}
        }
        Ok(Yield::WaitEvent(Self::filter()))
    }
}

/// `Go <poi>` or `Go <x> <y>`. Blocks until the path ends.
pub fn go_instruction(
    entity: Entity,
    args: &[&str],
    script: &mut Script,
    events: &mut EventStore,
) -> Result<ScriptState, InstructionError> {
    let event = match args {
        [poi] => Event::signal(
            GOTO_POI,
            Payload::GotoPoi {
                entity,
                target: poi.to_string(),
            },
        ),
        [x, y] => Event::signal(
            GOTO_POS,
            Payload::GotoPos {
                entity,
                target: Point::new(parse_coord(x)?, parse_coord(y)?),
            },
        ),
        _ => {
            return Err(InstructionError::Arity {
                opcode: "Go".to_string(),
                usage: "<poi> or <x> <y>",
                got: args.len(),
            })
        }
    };
    events.put(event);
    script.expect(END_OF_PATH);
    Ok(ScriptState::Blocked)
}

fn parse_coord(value: &str) -> Result<f64, InstructionError> {
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(InstructionError::InvalidArgument {
            opcode: "Go".to_string(),
            value: value.to_string(),
        }),
    }
}

/// Recovery for `PathError`: follow the best partial path instead, so the
/// blocked `Go` still completes when that path ends. An empty best path
/// ends the `Go` on the spot.
pub fn path_error_handler() -> ErrorHandler {
    ErrorHandler::new(|event, ctx| {
        let Payload::PathError(PathErrorPayload { entity, error: kind }) = event.payload() else {
            return Ok(());
        };
        match kind {
            PathErrorKind::PathNotFound { best_path } if best_path.is_empty() => {
                warn!(entity = %entity, "no closer point reachable, staying put");
                if let Ok(mut script) = ctx.world.get_mut::<Script>(*entity) {
                    script.log("No best path.");
                }
                ctx.publish(Event::signal(
                    END_OF_PATH,
                    Payload::EndOfPath {
                        entity: *entity,
                        timestamp: ctx.now(),
                        path: Vec::new(),
                    },
                ));
            }
            PathErrorKind::PathNotFound { best_path } => {
                info!(entity = %entity, best = ?best_path.points, "adopting best path");
                ctx.world.insert(*entity, best_path.clone())?;
                if let Ok(mut script) = ctx.world.get_mut::<Script>(*entity) {
                    script.log(format!("Add best path {:?}.", best_path.points));
                }
            }
            PathErrorKind::PoiNotFound { poi } => {
                error!(entity = %entity, poi = %poi, "cannot recover from missing POI");
            }
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Path;
    use crate::config::SimulationConfig;
    use crate::ecs::World;
    use crate::navigation::NavGraph;

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    fn world() -> (World, Entity) {
        let mut world = World::new();
        let root = world.spawn();
        let map = Map::new(NavGraph::from_edges([(p(0.0, 0.0), p(10.0, 0.0))]))
            .with_poi("dock", p(10.0, 0.0))
            .with_poi("island", p(90.0, 90.0));
        world.insert(root, map).unwrap();
        let robot = world.spawn();
        world.insert(robot, Position::centered(p(0.0, 0.0), 2.0, 2.0)).unwrap();
        (world, robot)
    }

    fn ctx() -> (SimContext, Entity) {
        let (world, robot) = world();
        (SimContext::new(world, SimulationConfig::default()), robot)
    }

    #[test]
    fn go_parses_poi_and_coordinates() {
        let mut events = EventStore::new();
        let mut script = Script::new(["Go dock"]);
        let robot = Entity::from_raw(2);
        assert_eq!(
            go_instruction(robot, &["dock"], &mut script, &mut events),
            Ok(ScriptState::Blocked)
        );
        assert_eq!(
            go_instruction(robot, &["1.5", "2"], &mut script, &mut events),
            Ok(ScriptState::Blocked)
        );
        assert_eq!(script.expecting.len(), 2);
        let tags: Vec<&str> = events.pending().map(Event::tag).collect();
        assert_eq!(tags, vec![GOTO_POI, GOTO_POS]);
    }

    #[test]
    fn go_rejects_bad_arguments() {
        let mut events = EventStore::new();
        let mut script = Script::new(["Go"]);
        let robot = Entity::from_raw(2);
        assert!(matches!(
            go_instruction(robot, &[], &mut script, &mut events),
            Err(InstructionError::Arity { got: 0, .. })
        ));
        assert!(matches!(
            go_instruction(robot, &["x", "1"], &mut script, &mut events),
            Err(InstructionError::InvalidArgument { .. })
        ));
        for bad in [["NaN", "10"], ["inf", "0"], ["0", "-inf"]] {
            assert!(matches!(
                go_instruction(robot, &bad, &mut script, &mut events),
                Err(InstructionError::InvalidArgument { .. })
            ));
        }
        assert!(events.is_empty());
        assert!(script.expecting.is_empty());
    }

    #[test]
    fn reachable_target_attaches_path_and_grows_graph() {
        let (mut ctx, robot) = ctx();
        let goto = GotoProcess::new();
        let request = Event::signal(
            GOTO_POS,
            Payload::GotoPos {
                entity: robot,
                target: p(12.0, 3.0),
            },
        );
        goto.handle(&mut ctx, &request).unwrap();

        let path = ctx.world.get::<Path>(robot).unwrap().clone();
        assert_eq!(path.points, vec![p(10.0, 0.0), p(12.0, 3.0)]);
        assert_eq!(path.speed, ctx.config.path_speed);
        let map = ctx.world.get::<Map>(WORLD_ENTITY).unwrap();
        assert!(map.graph.node_at(p(12.0, 3.0)).is_some());
    }

    #[test]
    fn missing_poi_is_reported_as_error_event() {
        let (mut ctx, robot) = ctx();
        let request = Event::signal(
            GOTO_POI,
            Payload::GotoPoi {
                entity: robot,
                target: "nowhere".to_string(),
            },
        );
        GotoProcess::new().handle(&mut ctx, &request).unwrap();
        let event = ctx.events.try_take(&EventFilter::tag(PATH_ERROR)).unwrap();
        assert!(event.is_error());
        assert!(matches!(
            event.payload(),
            Payload::PathError(PathErrorPayload {
                error: PathErrorKind::PoiNotFound { .. },
                ..
            })
        ));
        assert!(!ctx.world.has::<Path>(robot));
    }

    fn no_route(_: &Map, from: Point, to: Point) -> Result<Path, crate::navigation::PathNotFound> {
        Err(crate::navigation::PathNotFound {
            from,
            to,
            partial_path: Path::new(vec![p(10.0, 0.0)]),
        })
    }

    #[test]
    fn failed_route_publishes_best_path_and_handler_adopts_it() {
        let (mut ctx, robot) = ctx();
        let request = Event::signal(
            GOTO_POI,
            Payload::GotoPoi {
                entity: robot,
                target: "island".to_string(),
            },
        );
        GotoProcess::with_navigation(no_route)
            .handle(&mut ctx, &request)
            .unwrap();
        let event = ctx.events.try_take(&EventFilter::tag(PATH_ERROR)).unwrap();
        assert_eq!(event.entity(), Some(robot));

        path_error_handler().call(&event, &mut ctx).unwrap();
        let path = ctx.world.get::<Path>(robot).unwrap();
        assert_eq!(path.points, vec![p(10.0, 0.0)]);
    }

    #[test]
    fn empty_best_path_is_never_attached() {
        let (mut world, robot) = world();
        world
            .get_mut::<Map>(WORLD_ENTITY)
            .unwrap()
            .graph
            .add_node(p(-50.0, 0.0));
        world.insert(robot, Script::new(["Go -50 40"])).unwrap();
        let mut ctx = SimContext::new(world, SimulationConfig::default());

        let request = Event::signal(
            GOTO_POS,
            Payload::GotoPos {
                entity: robot,
                target: p(-50.0, 40.0),
            },
        );
        GotoProcess::new().handle(&mut ctx, &request).unwrap();
        let event = ctx.events.try_take(&EventFilter::tag(PATH_ERROR)).unwrap();
        let Payload::PathError(PathErrorPayload {
            error: PathErrorKind::PathNotFound { best_path },
            ..
        }) = event.payload()
        else {
            panic!("expected PathNotFound, got {:?}", event.payload());
        };
        assert!(best_path.is_empty());

        path_error_handler().call(&event, &mut ctx).unwrap();
        assert!(!ctx.world.has::<Path>(robot));
        let end = ctx.events.try_take(&EventFilter::tag(END_OF_PATH)).unwrap();
        assert_eq!(end.entity(), Some(robot));
        assert_eq!(
            ctx.world.get::<Script>(robot).unwrap().logs,
            vec!["No best path.".to_string()]
        );
    }

    #[test]
    fn already_there_ends_immediately() {
        let (mut ctx, robot) = ctx();
        let request = Event::signal(
            GOTO_POS,
            Payload::GotoPos {
                entity: robot,
                target: p(0.0, 0.0),
            },
        );
        GotoProcess::new().handle(&mut ctx, &request).unwrap();
        assert!(!ctx.world.has::<Path>(robot));
        assert!(ctx.events.try_take(&EventFilter::tag(END_OF_PATH)).is_some());
    }

    #[test]
    fn start_without_map_is_fatal() {
        let mut ctx = SimContext::new(World::new(), SimulationConfig::default());
        let err = GotoProcess::new().resume(&mut ctx, Wake::Start).unwrap_err();
        assert!(matches!(err, SimError::MissingContext(_)));
    }
}
