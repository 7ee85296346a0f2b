use crate::chart::ChartConfig;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Grid and sizing constants for the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutOptions {
    pub grid_unit: f64,
    pub min_width: f64,
    pub min_height: f64,
    pub columns: usize,
    pub column_width: f64,
    pub row_height: f64,
    pub gutter: f64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            grid_unit: 20.0,
            min_width: 200.0,
            min_height: 160.0,
            columns: 2,
            column_width: 600.0,
            row_height: 400.0,
            gutter: 20.0,
        }
    }
}

impl LayoutOptions {
    /// Round the minimum floor up to whole grid cells so clamped sizes stay aligned.
    fn normalized(mut self) -> Self {
        if !(self.grid_unit > 0.0) {
            self.grid_unit = 1.0;
        }
        self.columns = self.columns.max(1);
        self.min_width = (self.min_width.max(self.grid_unit) / self.grid_unit).ceil() * self.grid_unit;
        self.min_height = (self.min_height.max(self.grid_unit) / self.grid_unit).ceil() * self.grid_unit;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileId(u64);

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tile-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Geometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Geometry {
    pub fn size(&self) -> Size {
        Size {
            width: self.width,
            height: self.height,
        }
    }
}

/// Partial geometry update; unset fields are left alone.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeometryPatch {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

/// A pinned chart with its placement on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tile {
    pub id: TileId,
    pub config: ChartConfig,
    pub geometry: Geometry,
    pub locked: bool,
    pub z_index: u32,
}

/// Which part of a tile a press landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handle {
    Header,
    Resize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Press {
        tile: TileId,
        handle: Handle,
        position: Point,
    },
    Move {
        position: Point,
    },
    Release,
}

/// The single in-progress interaction. Holds only the tile id and the
/// snapshot taken at press time, never a reference into the arena.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActiveOperation {
    Dragging {
        id: TileId,
        grab_offset: Point,
        start: Geometry,
    },
    Resizing {
        id: TileId,
        start_size: Size,
        start_pointer: Point,
        start: Geometry,
    },
}

impl ActiveOperation {
    pub fn tile(&self) -> TileId {
        match self {
            ActiveOperation::Dragging { id, .. } | ActiveOperation::Resizing { id, .. } => *id,
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            ActiveOperation::Dragging { .. } => OperationKind::Drag,
            ActiveOperation::Resizing { .. } => OperationKind::Resize,
        }
    }

    fn start(&self) -> Geometry {
        match self {
            ActiveOperation::Dragging { start, .. } | ActiveOperation::Resizing { start, .. } => *start,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Drag,
    Resize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileState {
    Idle,
    Dragging,
    Resizing,
}

/// Geometry before and after a finished drag or resize.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompletedOperation {
    pub id: TileId,
    pub kind: OperationKind,
    pub before: Geometry,
    pub after: Geometry,
}

/// Outcome of feeding one pointer event to the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CanvasEffect {
    Started { id: TileId, kind: OperationKind },
    Moved { id: TileId, geometry: Geometry },
    Completed(CompletedOperation),
    Ignored,
}

fn snap(value: f64, grid: f64) -> f64 {
    (value / grid).round() * grid
}

/// Free-form dashboard canvas: owns tile geometry and turns pointer motion
/// into grid-aligned updates.
#[derive(Debug, Clone)]
pub struct Canvas {
    options: LayoutOptions,
    tiles: IndexMap<TileId, Tile>,
    next_id: u64,
    next_z: u32,
    locked: bool,
    active: Option<ActiveOperation>,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(LayoutOptions::default())
    }
}

impl Canvas {
    pub fn new(options: LayoutOptions) -> Self {
        Self {
            options: options.normalized(),
            tiles: IndexMap::new(),
            next_id: 1,
            next_z: 1,
            locked: false,
            active: None,
        }
    }

    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    // -------------------------------------------------------------------------
    // Tile collection
    // -------------------------------------------------------------------------

    /// Place a chart on the canvas in the next free layout slot.
    pub fn pin(&mut self, config: ChartConfig) -> TileId {
        let id = TileId(self.next_id);
        self.next_id += 1;
        let z_index = self.next_z;
        self.next_z += 1;

        let geometry = self.slot_geometry(self.tiles.len());
        tracing::debug!(%id, kind = %config.kind, ?geometry, "pinned tile");
        self.tiles.insert(
            id,
            Tile {
                id,
                config,
                geometry,
                locked: false,
                z_index,
            },
        );
        id
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.values()
    }

    pub fn tile(&self, id: TileId) -> Option<&Tile> {
        self.tiles.get(&id)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn set_config(&mut self, id: TileId, config: ChartConfig) -> bool {
        match self.tiles.get_mut(&id) {
            Some(tile) => {
                tile.config = config;
                true
            }
            None => false,
        }
    }

    /// Apply a partial geometry update, clamped and snapped like pointer input.
    pub fn update_geometry(&mut self, id: TileId, patch: GeometryPatch) -> bool {
        let grid = self.options.grid_unit;
        let (min_w, min_h) = (self.options.min_width, self.options.min_height);
        let Some(tile) = self.tiles.get_mut(&id) else {
            return false;
        };

        let g = &mut tile.geometry;
        if let Some(x) = patch.x {
            g.x = snap(x.max(0.0), grid);
        }
        if let Some(y) = patch.y {
            g.y = snap(y.max(0.0), grid);
        }
        if let Some(width) = patch.width {
            g.width = snap(width, grid).max(min_w);
        }
        if let Some(height) = patch.height {
            g.height = snap(height, grid).max(min_h);
        }
        true
    }

    pub fn remove(&mut self, id: TileId) -> Option<Tile> {
        if self.active.map(|op| op.tile()) == Some(id) {
            self.active = None;
        }
        let removed = self.tiles.shift_remove(&id);
        if removed.is_some() {
            tracing::debug!(%id, "removed tile");
        }
        removed
    }

    /// Remove every tile. Returns how many were removed.
    pub fn clear(&mut self) -> usize {
        let n = self.tiles.len();
        self.tiles.clear();
        self.active = None;
        tracing::debug!(removed = n, "cleared canvas");
        n
    }

    // -------------------------------------------------------------------------
    // Locking
    // -------------------------------------------------------------------------

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    pub fn toggle_locked(&mut self) -> bool {
        self.locked = !self.locked;
        self.locked
    }

    pub fn set_tile_locked(&mut self, id: TileId, locked: bool) -> bool {
        match self.tiles.get_mut(&id) {
            Some(tile) => {
                tile.locked = locked;
                true
            }
            None => false,
        }
    }

    /// Flip a tile's lock; `None` if the tile does not exist.
    pub fn toggle_tile_locked(&mut self, id: TileId) -> Option<bool> {
        let tile = self.tiles.get_mut(&id)?;
        tile.locked = !tile.locked;
        Some(tile.locked)
    }

    // -------------------------------------------------------------------------
    // Pointer interaction
    // -------------------------------------------------------------------------

    pub fn active(&self) -> Option<&ActiveOperation> {
        self.active.as_ref()
    }

    pub fn tile_state(&self, id: TileId) -> TileState {
        match self.active {
            Some(ActiveOperation::Dragging { id: active, .. }) if active == id => TileState::Dragging,
            Some(ActiveOperation::Resizing { id: active, .. }) if active == id => TileState::Resizing,
            _ => TileState::Idle,
        }
    }

    pub fn handle(&mut self, event: PointerEvent) -> CanvasEffect {
        match event {
            PointerEvent::Press {
                tile,
                handle: Handle::Header,
                position,
            } => self.begin_drag(tile, position),
            PointerEvent::Press {
                tile,
                handle: Handle::Resize,
                position,
            } => self.begin_resize(tile, position),
            PointerEvent::Move { position } => self.pointer_move(position),
            PointerEvent::Release => match self.release() {
                Some(done) => CanvasEffect::Completed(done),
                None => CanvasEffect::Ignored,
            },
        }
    }

    /// Tile id if a new operation may start on it.
    fn startable(&self, id: TileId) -> Option<&Tile> {
        if self.active.is_some() {
            tracing::debug!(%id, "press ignored: another operation is active");
            return None;
        }
        if self.locked {
            tracing::debug!(%id, "press ignored: canvas is locked");
            return None;
        }
        let tile = self.tiles.get(&id)?;
        if tile.locked {
            tracing::debug!(%id, "press ignored: tile is locked");
            return None;
        }
        Some(tile)
    }

    pub fn begin_drag(&mut self, id: TileId, pointer: Point) -> CanvasEffect {
        let Some(tile) = self.startable(id) else {
            return CanvasEffect::Ignored;
        };
        let start = tile.geometry;
        self.active = Some(ActiveOperation::Dragging {
            id,
            grab_offset: Point::new(pointer.x - start.x, pointer.y - start.y),
            start,
        });
        tracing::debug!(%id, "drag started");
        CanvasEffect::Started {
            id,
            kind: OperationKind::Drag,
        }
    }

    pub fn begin_resize(&mut self, id: TileId, pointer: Point) -> CanvasEffect {
        let Some(tile) = self.startable(id) else {
            return CanvasEffect::Ignored;
        };
        let start = tile.geometry;
        self.active = Some(ActiveOperation::Resizing {
            id,
            start_size: start.size(),
            start_pointer: pointer,
            start,
        });
        tracing::debug!(%id, "resize started");
        CanvasEffect::Started {
            id,
            kind: OperationKind::Resize,
        }
    }

    /// Motion outside an active operation is ignored.
    pub fn pointer_move(&mut self, pointer: Point) -> CanvasEffect {
        let Some(op) = self.active else {
            return CanvasEffect::Ignored;
        };
        let grid = self.options.grid_unit;
        let (min_w, min_h) = (self.options.min_width, self.options.min_height);
        let Some(tile) = self.tiles.get_mut(&op.tile()) else {
            self.active = None;
            return CanvasEffect::Ignored;
        };

        match op {
            ActiveOperation::Dragging { grab_offset, .. } => {
                let x = (pointer.x - grab_offset.x).max(0.0);
                let y = (pointer.y - grab_offset.y).max(0.0);
                tile.geometry.x = snap(x, grid);
                tile.geometry.y = snap(y, grid);
            }
            ActiveOperation::Resizing {
                start_size,
                start_pointer,
                ..
            } => {
                let width = start_size.width + (pointer.x - start_pointer.x);
                let height = start_size.height + (pointer.y - start_pointer.y);
                tile.geometry.width = snap(width, grid).max(min_w);
                tile.geometry.height = snap(height, grid).max(min_h);
            }
        }

        tracing::trace!(id = %tile.id, geometry = ?tile.geometry, "pointer moved");
        CanvasEffect::Moved {
            id: tile.id,
            geometry: tile.geometry,
        }
    }

    /// End the active operation, returning before/after geometry.
    pub fn release(&mut self) -> Option<CompletedOperation> {
        let op = self.active.take()?;
        let id = op.tile();
        let after = self.tiles.get(&id)?.geometry;
        tracing::debug!(%id, kind = ?op.kind(), "operation completed");
        Some(CompletedOperation {
            id,
            kind: op.kind(),
            before: op.start(),
            after,
        })
    }

    // -------------------------------------------------------------------------
    // Bulk reflow
    // -------------------------------------------------------------------------

    fn slot_geometry(&self, index: usize) -> Geometry {
        let o = &self.options;
        let col = (index % o.columns) as f64;
        let row = (index / o.columns) as f64;
        Geometry {
            x: snap(col * (o.column_width + o.gutter), o.grid_unit),
            y: snap(row * (o.row_height + o.gutter), o.grid_unit),
            width: snap(o.column_width, o.grid_unit).max(o.min_width),
            height: snap(o.row_height, o.grid_unit).max(o.min_height),
        }
    }

    /// Lay every tile out, in current order, on the column grid.
    pub fn auto_layout(&mut self) {
        let slots: Vec<Geometry> = (0..self.tiles.len()).map(|i| self.slot_geometry(i)).collect();
        for (tile, geometry) in self.tiles.values_mut().zip(slots) {
            tile.geometry = geometry;
        }
        tracing::debug!(tiles = self.tiles.len(), "auto layout applied");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ChartKind;

    fn canvas_with(n: usize) -> (Canvas, Vec<TileId>) {
        let mut canvas = Canvas::default();
        let ids = (0..n).map(|_| canvas.pin(ChartConfig::new(ChartKind::Bar))).collect();
        (canvas, ids)
    }

    fn press(tile: TileId, handle: Handle, x: f64, y: f64) -> PointerEvent {
        PointerEvent::Press {
            tile,
            handle,
            position: Point::new(x, y),
        }
    }

    fn moved(x: f64, y: f64) -> PointerEvent {
        PointerEvent::Move {
            position: Point::new(x, y),
        }
    }

    #[test]
    fn test_pin_assigns_slots_and_z() {
        let (canvas, ids) = canvas_with(3);
        let g: Vec<Geometry> = ids.iter().map(|id| canvas.tile(*id).unwrap().geometry).collect();
        assert_eq!((g[0].x, g[0].y), (0.0, 0.0));
        assert_eq!((g[1].x, g[1].y), (620.0, 0.0));
        assert_eq!((g[2].x, g[2].y), (0.0, 420.0));
        let z: Vec<u32> = canvas.tiles().map(|t| t.z_index).collect();
        assert_eq!(z, vec![1, 2, 3]);
    }

    #[test]
    fn test_drag_snaps_to_grid() {
        let (mut canvas, ids) = canvas_with(1);
        canvas.handle(press(ids[0], Handle::Header, 10.0, 10.0));
        assert_eq!(canvas.tile_state(ids[0]), TileState::Dragging);
        canvas.handle(moved(17.0, 23.0));
        let g = canvas.tile(ids[0]).unwrap().geometry;
        assert_eq!((g.x, g.y), (0.0, 20.0));
    }

    #[test]
    fn test_drag_never_negative() {
        let (mut canvas, ids) = canvas_with(1);
        canvas.begin_drag(ids[0], Point::new(50.0, 50.0));
        canvas.pointer_move(Point::new(-300.0, 10.0));
        let g = canvas.tile(ids[0]).unwrap().geometry;
        assert_eq!((g.x, g.y), (0.0, 0.0));
    }

    #[test]
    fn test_resize_snaps_and_clamps() {
        let (mut canvas, ids) = canvas_with(1);
        canvas.handle(press(ids[0], Handle::Resize, 600.0, 400.0));
        canvas.handle(moved(633.0, 389.0));
        let g = canvas.tile(ids[0]).unwrap().geometry;
        assert_eq!((g.width, g.height), (640.0, 380.0));

        canvas.handle(moved(-1000.0, -1000.0));
        let g = canvas.tile(ids[0]).unwrap().geometry;
        assert_eq!((g.width, g.height), (200.0, 160.0));
    }

    #[test]
    fn test_release_reports_before_and_after() {
        let (mut canvas, ids) = canvas_with(1);
        canvas.handle(press(ids[0], Handle::Header, 0.0, 0.0));
        canvas.handle(moved(100.0, 40.0));
        match canvas.handle(PointerEvent::Release) {
            CanvasEffect::Completed(done) => {
                assert_eq!(done.kind, OperationKind::Drag);
                assert_eq!((done.before.x, done.before.y), (0.0, 0.0));
                assert_eq!((done.after.x, done.after.y), (100.0, 40.0));
            }
            other => panic!("expected completion, got {:?}", other),
        }
        assert!(canvas.active().is_none());
        assert_eq!(canvas.handle(moved(500.0, 500.0)), CanvasEffect::Ignored);
        assert_eq!(canvas.tile(ids[0]).unwrap().geometry.x, 100.0);
    }

    #[test]
    fn test_locks_suppress_press() {
        let (mut canvas, ids) = canvas_with(2);
        canvas.set_locked(true);
        assert_eq!(canvas.handle(press(ids[0], Handle::Header, 1.0, 1.0)), CanvasEffect::Ignored);
        canvas.set_locked(false);

        assert_eq!(canvas.toggle_tile_locked(ids[1]), Some(true));
        assert_eq!(canvas.handle(press(ids[1], Handle::Resize, 1.0, 1.0)), CanvasEffect::Ignored);
        assert_eq!(canvas.tile_state(ids[1]), TileState::Idle);
    }

    #[test]
    fn test_single_active_operation() {
        let (mut canvas, ids) = canvas_with(2);
        canvas.begin_drag(ids[0], Point::new(0.0, 0.0));
        assert_eq!(canvas.begin_resize(ids[1], Point::new(0.0, 0.0)), CanvasEffect::Ignored);
        assert_eq!(canvas.tile_state(ids[1]), TileState::Idle);
        assert_eq!(canvas.active().map(|op| op.tile()), Some(ids[0]));
    }

    #[test]
    fn test_update_geometry_clamps() {
        let (mut canvas, ids) = canvas_with(1);
        let patch = GeometryPatch {
            x: Some(-40.0),
            y: Some(55.0),
            width: Some(10.0),
            height: None,
        };
        assert!(canvas.update_geometry(ids[0], patch));
        let g = canvas.tile(ids[0]).unwrap().geometry;
        assert_eq!((g.x, g.y, g.width, g.height), (0.0, 60.0, 200.0, 400.0));
        assert!(!canvas.update_geometry(TileId(99), patch));
    }

    #[test]
    fn test_remove_and_clear() {
        let (mut canvas, ids) = canvas_with(3);
        canvas.begin_drag(ids[1], Point::default());
        assert!(canvas.remove(ids[1]).is_some());
        assert!(canvas.active().is_none());
        assert!(canvas.remove(ids[1]).is_none());
        assert_eq!(canvas.clear(), 2);
        assert!(canvas.is_empty());
    }

    #[test]
    fn test_auto_layout_recovers_overlap() {
        let (mut canvas, ids) = canvas_with(3);
        for id in &ids {
            canvas.update_geometry(*id, GeometryPatch { x: Some(0.0), y: Some(0.0), ..Default::default() });
        }
        canvas.auto_layout();
        let pos: Vec<(f64, f64)> = canvas.tiles().map(|t| (t.geometry.x, t.geometry.y)).collect();
        assert_eq!(pos, vec![(0.0, 0.0), (620.0, 0.0), (0.0, 420.0)]);
    }

    #[test]
    fn test_interaction_keeps_z_order() {
        let (mut canvas, ids) = canvas_with(2);
        canvas.begin_drag(ids[0], Point::default());
        canvas.release();
        assert_eq!(canvas.tile(ids[0]).unwrap().z_index, 1);
    }

    #[test]
    fn test_min_size_rounds_up_to_grid() {
        let canvas = Canvas::new(LayoutOptions {
            min_height: 150.0,
            ..Default::default()
        });
        assert_eq!(canvas.options().min_height, 160.0);
    }
}
