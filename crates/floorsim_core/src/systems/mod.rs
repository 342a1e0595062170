//! Tick systems run once per frame.

mod collision;
mod movement;
mod observer;
mod path_follow;

pub use collision::CollisionSystem;
pub use movement::MovementSystem;
pub use observer::{diff_components, diff_snapshots, ObserverSystem, Snapshot};
pub use path_follow::PathFollowSystem;
