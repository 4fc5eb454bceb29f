//! Uniform spatial grid for broad-phase collision
//!
//! Rebuilt from scratch every tick. Cells outside the field are skipped,
//! never wrapped or clamped into range.

use super::collision::Aabb;

pub struct SpatialGrid<K> {
    cell_size: f32,
    cols: usize,
    rows: usize,
    cells: Vec<Vec<K>>,
}

impl<K: Copy + PartialEq> SpatialGrid<K> {
    pub fn new(width: f32, height: f32, cell_size: f32) -> Self {
        let cols = (width / cell_size).ceil().max(1.0) as usize;
        let rows = (height / cell_size).ceil().max(1.0) as usize;
        Self {
            cell_size,
            cols,
            rows,
            cells: (0..cols * rows).map(|_| Vec::new()).collect(),
        }
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }

    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
    }

    /// Indices of the in-bounds cells an AABB overlaps (max edge inclusive)
    fn cells_for(&self, bounds: &Aabb) -> impl Iterator<Item = usize> + '_ {
        let min = bounds.min();
        let max = bounds.max();
        let col_start = (min.x / self.cell_size).floor() as i64;
        let col_end = (max.x / self.cell_size).floor() as i64;
        let row_start = (min.y / self.cell_size).floor() as i64;
        let row_end = (max.y / self.cell_size).floor() as i64;

        (row_start..=row_end).flat_map(move |row| {
            (col_start..=col_end).filter_map(move |col| self.cell_index(row, col))
        })
    }

    fn cell_index(&self, row: i64, col: i64) -> Option<usize> {
        if row < 0 || col < 0 || row as usize >= self.rows || col as usize >= self.cols {
            return None;
        }
        Some(row as usize * self.cols + col as usize)
    }

    pub fn insert(&mut self, key: K, bounds: &Aabb) {
        let cells: Vec<usize> = self.cells_for(bounds).collect();
        for index in cells {
            self.cells[index].push(key);
        }
    }

    pub fn remove(&mut self, key: K, bounds: &Aabb) {
        let cells: Vec<usize> = self.cells_for(bounds).collect();
        for index in cells {
            self.cells[index].retain(|k| *k != key);
        }
    }

    /// Everything sharing a cell with `bounds`, deduplicated in first-seen
    /// order, excluding `key` itself
    pub fn nearby(&self, key: K, bounds: &Aabb) -> Vec<K> {
        let mut found = Vec::new();
        for index in self.cells_for(bounds) {
            for &other in &self.cells[index] {
                if other != key && !found.contains(&other) {
                    found.push(other);
                }
            }
        }
        found
    }
}
