//! Convenience macros for entity spawning and iteration

/// Spawn an entity with components.
///
/// Evaluates to `Result<Entity, WorldError>`; the first failed insert
/// stops the remaining ones.
///
/// # Examples
///
/// ```ignore
/// let robot = spawn!(world,
///     Position::new(0.0, 0.0, 2.0, 2.0),
///     Velocity::default(),
/// )?;
/// ```
#[macro_export]
macro_rules! spawn {
    ($world:expr, $($component:expr),+ $(,)?) => {{
        let entity = $world.spawn();
        let mut result: ::std::result::Result<$crate::ecs::Entity, $crate::ecs::WorldError> =
            Ok(entity);
        $(
            if result.is_ok() {
                if let Err(err) = $world.insert(entity, $component) {
                    result = Err(err);
                }
            }
        )+
        result
    }};
}

/// Iterate every entity holding all listed components, in creation order.
///
/// Each listed column is borrowed mutably for the whole loop, so the body
/// may read other columns but must not borrow the listed ones again. The
/// enclosing function must return a `Result` whose error converts from
/// `WorldError`.
///
/// # Examples
///
/// ```ignore
/// for_each_entity!(ctx.world, [Position, Velocity], |entity, (pos, vel)| {
///     pos.set_xy(pos.x() + vel.x, pos.y() + vel.y);
/// });
/// ```
#[macro_export]
macro_rules! for_each_entity {
    ($world:expr, [$($Component:ty),+ $(,)?], |$entity:ident, ($($var:ident),+ $(,)?)| $body:block) => {{
        let world: &$crate::ecs::World = &$world;
        let entities = world.query(&[$(<$Component as $crate::ecs::Component>::ID),+]);
        $(
            #[allow(unused_mut)]
            let mut $var = world.column_mut::<$Component>()?;
        )+
        for $entity in entities {
            $(
                let $var = match $var.get_mut($entity) {
                    Some(component) => component,
                    None => continue,
                };
            )+
            $body
        }
    }};
}

#[cfg(test)]
mod tests {
    use crate::components::{Position, Velocity};
    use crate::ecs::{World, WorldError};

    fn step(world: &World) -> Result<usize, WorldError> {
        let mut visited = 0;
        for_each_entity!(world, [Position, Velocity], |_entity, (pos, vel)| {
            let (x, y) = (pos.x() + vel.x, pos.y() + vel.y);
            pos.set_xy(x, y);
            visited += 1;
        });
        Ok(visited)
    }

    #[test]
    fn for_each_visits_only_full_matches() {
        let mut world = World::new();
        let mover = spawn!(
            world,
            Position::new(0.0, 0.0, 1.0, 1.0),
            Velocity::new(2.0, 3.0)
        )
        .unwrap();
        let still = spawn!(world, Position::new(5.0, 5.0, 1.0, 1.0)).unwrap();

        assert_eq!(step(&world).unwrap(), 1);
        let pos = world.get::<Position>(mover).unwrap();
        assert_eq!((pos.x(), pos.y()), (2.0, 3.0));
        assert_eq!(world.get::<Position>(still).unwrap().x(), 5.0);
    }

    #[test]
    fn spawn_attaches_components() {
        let mut world = World::new();
        let e = spawn!(world, Velocity::default()).unwrap();
        assert!(world.has::<Velocity>(e));
    }
}
