// graph.rs - Waypoint graph stored as an arena

use crate::math::{Point, PointKey};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

pub type NodeId = usize;

/// Directed waypoint graph. Nodes are keyed by coordinate so inserting the
/// same point twice yields the same node.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NavGraph {
    nodes: Vec<Point>,
    adjacency: Vec<Vec<NodeId>>,
    #[serde(skip)]
    lookup: HashMap<PointKey, NodeId>,
}

impl PartialEq for NavGraph {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes && self.adjacency == other.adjacency
    }
}

/// Result of a graph search from one start node.
#[derive(Debug, Clone)]
pub struct SearchTree {
    pub(crate) came_from: Vec<Option<NodeId>>,
    pub(crate) cost: Vec<f64>,
    pub(crate) reached: Vec<bool>,
    pub(crate) found: bool,
}

impl SearchTree {
    pub fn found(&self) -> bool {
        self.found
    }

    pub fn reached(&self, node: NodeId) -> bool {
        self.reached.get(node).copied().unwrap_or(false)
    }

    pub fn cost(&self, node: NodeId) -> Option<f64> {
        self.reached(node).then(|| self.cost[node])
    }

    /// Nodes from the start to `node`, both included.
    pub fn path_to(&self, node: NodeId) -> Vec<NodeId> {
        if !self.reached(node) {
            return Vec::new();
        }
        let mut path = vec![node];
        let mut current = node;
        while let Some(prev) = self.came_from[current] {
            path.push(prev);
            current = prev;
        }
        path.reverse();
        path
    }

    pub fn reached_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.reached
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.then_some(i))
    }
}

#[derive(Debug)]
struct OpenEntry {
    estimate: f64,
    node: NodeId,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    // Min-heap on the estimate; lower node index wins ties.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .estimate
            .total_cmp(&self.estimate)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl NavGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from undirected edges.
    pub fn from_edges<I>(edges: I) -> Self
    where
        I: IntoIterator<Item = (Point, Point)>,
    {
        let mut graph = Self::new();
        for (a, b) in edges {
            let a = graph.add_node(a);
            let b = graph.add_node(b);
            graph.connect(a, b);
        }
        graph
    }

    /// Insert a node, or return the existing one at the same coordinate.
    pub fn add_node(&mut self, point: Point) -> NodeId {
        let key = PointKey::from(point);
        if let Some(&id) = self.lookup.get(&key) {
            return id;
        }
        let id = self.nodes.len();
        self.nodes.push(point);
        self.adjacency.push(Vec::new());
        self.lookup.insert(key, id);
        id
    }

    /// Directed edge `from -> to`. Duplicates and self loops are ignored.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) {
        if from == to || to >= self.nodes.len() {
            return;
        }
        if let Some(list) = self.adjacency.get_mut(from) {
            if !list.contains(&to) {
                list.push(to);
            }
        }
    }

    pub fn connect(&mut self, a: NodeId, b: NodeId) {
        self.add_edge(a, b);
        self.add_edge(b, a);
    }

    /// Add every point and chain consecutive ones in both directions.
    pub fn add_nodes_from_points(&mut self, points: &[Point]) {
        let mut previous: Option<NodeId> = None;
        for &point in points {
            let id = self.add_node(point);
            if let Some(prev) = previous {
                self.connect(prev, id);
            }
            previous = Some(id);
        }
    }

    pub fn node(&self, id: NodeId) -> Option<Point> {
        self.nodes.get(id).copied()
    }

    pub fn node_at(&self, point: Point) -> Option<NodeId> {
        self.lookup.get(&PointKey::from(point)).copied()
    }

    pub fn neighbors(&self, id: NodeId) -> &[NodeId] {
        self.adjacency.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn nodes(&self) -> &[Point] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Closest node to `point`; the lowest id wins ties.
    pub fn nearest_node(&self, point: Point) -> Option<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.distance(point).total_cmp(&b.distance(point)))
            .map(|(id, _)| id)
    }

    /// A* with Euclidean edge cost and heuristic.
    ///
    /// When `goal` is unreachable the search exhausts the start's component,
    /// so `reached` then lists every node reachable from `start`.
    pub fn astar(&self, start: NodeId, goal: NodeId) -> SearchTree {
        let n = self.nodes.len();
        let mut tree = SearchTree {
            came_from: vec![None; n],
            cost: vec![f64::INFINITY; n],
            reached: vec![false; n],
            found: false,
        };
        if start >= n || goal >= n {
            return tree;
        }
        let target = self.nodes[goal];
        let mut closed = vec![false; n];
        let mut open = BinaryHeap::new();
        tree.cost[start] = 0.0;
        tree.reached[start] = true;
        open.push(OpenEntry {
            estimate: self.nodes[start].distance(target),
            node: start,
        });

        while let Some(OpenEntry { node, .. }) = open.pop() {
            if closed[node] {
                continue;
            }
            closed[node] = true;
            if node == goal {
                tree.found = true;
                break;
            }
            let here = self.nodes[node];
            for &next in self.neighbors(node) {
                if closed[next] {
                    continue;
                }
                let cost = tree.cost[node] + here.distance(self.nodes[next]);
                if cost < tree.cost[next] {
                    tree.cost[next] = cost;
                    tree.came_from[next] = Some(node);
                    tree.reached[next] = true;
                    open.push(OpenEntry {
                        estimate: cost + self.nodes[next].distance(target),
                        node: next,
                    });
                }
            }
        }
        tree
    }
}
