use crate::define_component;
use crate::math::Point;
use serde::Serialize;

/// Linear sector index (`row * columns + column`).
pub type SectorId = i64;

/// Square tiling of the floorplan used for broad-phase lookups.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct SectorGrid {
    pub sector_size: f64,
    pub columns: i64,
}

impl SectorGrid {
    pub fn new(sector_size: f64, width: f64) -> Self {
        let sector_size = if sector_size > 0.0 { sector_size } else { 1.0 };
        let columns = ((width / sector_size).ceil() as i64).max(1);
        Self {
            sector_size,
            columns,
        }
    }

    /// Grid cell `(column, row)` containing a point. Points off the
    /// floorplan land in the nearest edge cell.
    pub fn cell_of(&self, p: Point) -> (i64, i64) {
        let column = (p.x / self.sector_size).floor() as i64;
        let row = (p.y / self.sector_size).floor() as i64;
        (column.clamp(0, self.columns - 1), row.max(0))
    }

    pub fn contains_cell(&self, (column, row): (i64, i64)) -> bool {
        (0..self.columns).contains(&column) && row >= 0
    }

    pub fn sector_of_cell(&self, (column, row): (i64, i64)) -> SectorId {
        row * self.columns + column
    }

    pub fn cell_of_sector(&self, sector: SectorId) -> (i64, i64) {
        (sector.rem_euclid(self.columns), sector.div_euclid(self.columns))
    }

    pub fn sector_of(&self, p: Point) -> SectorId {
        self.sector_of_cell(self.cell_of(p))
    }

    /// Sectors around `sector` that lie on the grid, up to eight.
    pub fn neighbors(&self, sector: SectorId) -> Vec<SectorId> {
        let (column, row) = self.cell_of_sector(sector);
        let mut out = Vec::with_capacity(8);
        for dy in -1..=1 {
            for dx in -1..=1 {
                let cell = (column + dx, row + dy);
                if (dx, dy) != (0, 0) && self.contains_cell(cell) {
                    out.push(self.sector_of_cell(cell));
                }
            }
        }
        out
    }
}

impl Default for SectorGrid {
    fn default() -> Self {
        Self::new(50.0, 1280.0)
    }
}

/// Axis-aligned box in floorplan coordinates.
///
/// Geometry is private so the derived fields (center, sector and adjacent
/// sectors) can only change together with x/y/w/h.
#[derive(Debug, Clone, Serialize)]
pub struct Position {
    x: f64,
    y: f64,
    w: f64,
    h: f64,
    angle: f64,
    center: Point,
    sector: SectorId,
    adjacent_sectors: Vec<SectorId>,
    /// Geometry was rewritten during the current frame.
    pub changed: bool,
    pub movable: bool,
    #[serde(skip)]
    grid: SectorGrid,
}

define_component!(Position, super::POSITION_ID, "Position");

impl Position {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        let mut pos = Self {
            x,
            y,
            w,
            h,
            angle: 0.0,
            center: Point::ZERO,
            sector: 0,
            adjacent_sectors: Vec::new(),
            changed: false,
            movable: true,
            grid: SectorGrid::default(),
        };
        pos.recompute();
        pos
    }

    /// Box of size `w x h` centered on `center`.
    pub fn centered(center: Point, w: f64, h: f64) -> Self {
        Self::new(center.x - w / 2.0, center.y - h / 2.0, w, h)
    }

    pub fn with_grid(mut self, grid: SectorGrid) -> Self {
        self.set_grid(grid);
        self
    }

    pub fn fixed(mut self) -> Self {
        self.movable = false;
        self
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn w(&self) -> f64 {
        self.w
    }

    pub fn h(&self) -> f64 {
        self.h
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn center(&self) -> Point {
        self.center
    }

    pub fn sector(&self) -> SectorId {
        self.sector
    }

    pub fn adjacent_sectors(&self) -> &[SectorId] {
        &self.adjacent_sectors
    }

    pub fn grid(&self) -> SectorGrid {
        self.grid
    }

    /// Corners `(min, max)` of the box.
    pub fn bounds(&self) -> (Point, Point) {
        (
            Point::new(self.x, self.y),
            Point::new(self.x + self.w, self.y + self.h),
        )
    }

    /// Strict overlap; touching edges do not count.
    pub fn overlaps(&self, other: &Position) -> bool {
        self.x < other.x + other.w
            && other.x < self.x + self.w
            && self.y < other.y + other.h
            && other.y < self.y + self.h
    }

    pub fn set_xy(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
        self.recompute();
        self.changed = true;
    }

    pub fn set_size(&mut self, w: f64, h: f64) {
        self.w = w;
        self.h = h;
        self.recompute();
        self.changed = true;
    }

    pub fn set_angle(&mut self, angle: f64) {
        self.angle = angle.rem_euclid(360.0);
        self.changed = true;
    }

    pub fn rotate(&mut self, delta: f64) {
        self.set_angle(self.angle + delta);
    }

    /// Re-tile without marking the position as moved.
    pub fn set_grid(&mut self, grid: SectorGrid) {
        self.grid = grid;
        self.recompute();
    }

    fn recompute(&mut self) {
        self.center = Point::new(self.x + self.w / 2.0, self.y + self.h / 2.0);
        self.sector = self.grid.sector_of(self.center);
        self.adjacent_sectors = self.grid.neighbors(self.sector);
    }
}

impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x
            && self.y == other.y
            && self.w == other.w
            && self.h == other.h
            && self.angle == other.angle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_fields_follow_geometry() {
        let grid = SectorGrid::new(10.0, 100.0);
        let mut pos = Position::new(0.0, 0.0, 4.0, 4.0).with_grid(grid);
        assert_eq!(pos.center(), Point::new(2.0, 2.0));
        assert_eq!(pos.sector(), 0);
        assert!(!pos.changed);

        pos.set_xy(18.0, 28.0);
        assert_eq!(pos.center(), Point::new(20.0, 30.0));
        assert_eq!(pos.sector(), 3 * 10 + 2);
        assert_eq!(pos.adjacent_sectors().len(), 8);
        assert!(pos.adjacent_sectors().contains(&(2 * 10 + 1)));
        assert!(pos.adjacent_sectors().contains(&(4 * 10 + 3)));
        assert!(pos.changed);
    }

    #[test]
    fn edge_sectors_do_not_wrap_into_other_rows() {
        let grid = SectorGrid::new(10.0, 100.0);

        let mut left = grid.neighbors(grid.sector_of_cell((0, 1)));
        left.sort();
        assert_eq!(left, vec![0, 1, 11, 20, 21]);
        assert!(!left.contains(&9) && !left.contains(&19));

        let mut right = grid.neighbors(grid.sector_of_cell((9, 1)));
        right.sort();
        assert_eq!(right, vec![8, 9, 18, 28, 29]);
        assert!(!right.contains(&20));

        assert_eq!(grid.neighbors(0).len(), 3);
    }

    #[test]
    fn off_grid_points_clamp_to_edge_cells() {
        let grid = SectorGrid::new(10.0, 100.0);
        assert_eq!(grid.cell_of(Point::new(-5.0, -5.0)), (0, 0));
        assert_eq!(grid.cell_of(Point::new(100.0, 15.0)), (9, 1));
        assert_eq!(grid.sector_of(Point::new(-5.0, 15.0)), 10);
    }

    #[test]
    fn equality_ignores_derived_state() {
        let a = Position::new(1.0, 2.0, 3.0, 4.0);
        let mut b = Position::new(1.0, 2.0, 3.0, 4.0).with_grid(SectorGrid::new(5.0, 50.0));
        b.changed = true;
        assert_eq!(a, b);
        b.rotate(10.0);
        assert_ne!(a, b);
    }

    #[test]
    fn angle_wraps() {
        let mut pos = Position::new(0.0, 0.0, 1.0, 1.0);
        pos.rotate(350.0);
        pos.rotate(20.0);
        assert_eq!(pos.angle(), 10.0);
    }

    #[test]
    fn touching_boxes_do_not_overlap() {
        let a = Position::new(0.0, 0.0, 2.0, 2.0);
        let b = Position::new(2.0, 0.0, 2.0, 2.0);
        let c = Position::new(1.0, 1.0, 2.0, 2.0);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
    }
}
