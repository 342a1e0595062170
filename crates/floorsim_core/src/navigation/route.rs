use crate::components::{Map, Path};
use crate::math::{same_place, Point};
use crate::navigation::NodeId;
use thiserror::Error;

/// No route between two points. `partial_path` gets as close to the target
/// as the graph allows and is empty when no reachable node beats staying
/// put.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("no route from ({}, {}) to ({}, {})", from.x, from.y, to.x, to.y)]
pub struct PathNotFound {
    pub from: Point,
    pub to: Point,
    pub partial_path: Path,
}

/// Signature shared by route planners so the goto process can be handed a
/// different one.
pub type NavigationFn = fn(&Map, Point, Point) -> Result<Path, PathNotFound>;

/// Plan a route over the map graph.
///
/// Both endpoints are attached to their nearest graph node; the returned
/// path walks the graph between those anchors and ends on the exact target.
pub fn route(map: &Map, source: Point, target: Point) -> Result<Path, PathNotFound> {
    let graph = &map.graph;
    let (Some(start), Some(goal)) = (graph.nearest_node(source), graph.nearest_node(target))
    else {
        return Err(PathNotFound {
            from: source,
            to: target,
            partial_path: Path::new(Vec::new()),
        });
    };

    let tree = graph.astar(start, goal);
    if tree.found() {
        let mut points = to_points(map, &tree.path_to(goal), source);
        if points.last().map_or(true, |&last| !same_place(last, target)) {
            points.push(target);
        }
        return Ok(Path::new(points));
    }

    let baseline = source.distance(target);
    let best = tree
        .reached_nodes()
        .filter_map(|id| graph.node(id).map(|p| (id, p.distance(target))))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .filter(|&(_, d)| d < baseline);

    let points = match best {
        Some((id, _)) => to_points(map, &tree.path_to(id), source),
        None => Vec::new(),
    };
    Err(PathNotFound {
        from: source,
        to: target,
        partial_path: Path::new(points),
    })
}

fn to_points(map: &Map, nodes: &[NodeId], source: Point) -> Vec<Point> {
    let mut points: Vec<Point> = nodes.iter().filter_map(|&id| map.graph.node(id)).collect();
    if points.first().is_some_and(|&first| same_place(first, source)) {
        points.remove(0);
    }
    points
}
