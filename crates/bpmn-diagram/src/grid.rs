//! A uniform-cell spatial index for proximity queries.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::Id;
use crate::geom::Rect;

/// The default cell extent, in pixels.
const DEFAULT_CELL_SIZE: f64 = 200.0;

/// A uniform 2D grid over shape bounding boxes.
///
/// Each shape is inserted into every cell its bounding box touches, so a
/// query only has to look at the cells overlapping the query rectangle
/// rather than at every shape in the diagram.
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    cell_size: f64,
    cells: FxHashMap<(i64, i64), Vec<Id>>,
    bounds: FxHashMap<Id, Rect>,
}

impl SpatialGrid {
    /// Create a grid with the default cell size of 200 px.
    pub fn new() -> Self {
        Self::with_cell_size(DEFAULT_CELL_SIZE)
    }

    /// Create a grid with a custom cell size.
    pub fn with_cell_size(cell_size: f64) -> Self {
        Self {
            cell_size: cell_size.max(1.0),
            cells: FxHashMap::default(),
            bounds: FxHashMap::default(),
        }
    }

    /// The cell coordinate range touched by a rectangle.
    fn cell_range(&self, rect: Rect) -> impl Iterator<Item = (i64, i64)> + use<> {
        let x0 = (rect.left() / self.cell_size).floor() as i64;
        let x1 = (rect.right() / self.cell_size).floor() as i64;
        let y0 = (rect.top() / self.cell_size).floor() as i64;
        let y1 = (rect.bottom() / self.cell_size).floor() as i64;
        (x0..=x1).flat_map(move |cx| (y0..=y1).map(move |cy| (cx, cy)))
    }

    /// Insert a shape, or update it if it is already present.
    pub fn insert(&mut self, id: Id, rect: Rect) {
        if self.bounds.contains_key(&id) {
            self.remove(&id);
        }
        for cell in self.cell_range(rect) {
            self.cells.entry(cell).or_default().push(id.clone());
        }
        self.bounds.insert(id, rect);
    }

    /// Remove a shape from the index.
    pub fn remove(&mut self, id: &Id) {
        let Some(rect) = self.bounds.remove(id) else { return };
        for cell in self.cell_range(rect) {
            if let Some(entries) = self.cells.get_mut(&cell) {
                entries.retain(|entry| entry != id);
            }
        }
    }

    /// All shapes whose cells overlap the query rectangle.
    ///
    /// The result is deduplicated and keeps first-insertion order within each
    /// visited cell, so queries are deterministic.
    pub fn candidates(&self, rect: Rect, exclude: Option<&Id>) -> Vec<Id> {
        let mut seen = FxHashSet::default();
        let mut out = Vec::new();
        for cell in self.cell_range(rect) {
            let Some(entries) = self.cells.get(&cell) else { continue };
            for id in entries {
                if exclude == Some(id) {
                    continue;
                }
                if seen.insert(id.clone()) {
                    out.push(id.clone());
                }
            }
        }
        out
    }

    /// Like [`candidates`](Self::candidates), with the query rectangle grown
    /// by `margin` on every side first.
    pub fn candidates_expanded(
        &self,
        rect: Rect,
        margin: f64,
        exclude: Option<&Id>,
    ) -> Vec<Id> {
        self.candidates(rect.expand(margin), exclude)
    }

    /// The indexed bounds of a shape, if present.
    pub fn bounds(&self, id: &Id) -> Option<Rect> {
        self.bounds.get(id).copied()
    }
}

impl Default for SpatialGrid {
    fn default() -> Self {
        Self::new()
    }
}
