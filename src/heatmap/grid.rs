// Fixed-size intensity grid: binning, decay, blur and display normalization.

/// Cells at or above this survive decay; anything smaller snaps to 0.
pub const DECAY_FLOOR: f64 = 0.001;

const OPACITY_MIN: f64 = 0.12;
const OPACITY_SPAN: f64 = 0.78;

/// Row-major `rows x cols` grid of non-negative intensities.
#[derive(Debug, Clone, PartialEq)]
pub struct IntensityGrid {
    rows: usize,
    cols: usize,
    cells: Vec<f64>,
}

impl IntensityGrid {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![0.0; rows * cols],
        }
    }

    /// Bins `(x, y, value)` points into a fresh grid. Points sharing a cell add up.
    pub fn bin_points<I>(points: I, rows: usize, cols: usize) -> Self
    where
        I: IntoIterator<Item = (f64, f64, f64)>,
    {
        let mut grid = Self::new(rows, cols);
        for (x, y, value) in points {
            grid.add_point(x, y, value);
        }
        grid
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.rows && col < self.cols {
            Some(self.cells[row * self.cols + col])
        } else {
            None
        }
    }

    pub fn cells(&self) -> &[f64] {
        &self.cells
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cell for normalized coordinates: `round(coord * (n - 1))`, clamped into the grid.
    pub fn cell_for(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        if self.is_empty() {
            return None;
        }
        Some((snap(y, self.rows), snap(x, self.cols)))
    }

    /// Adds `value` at the cell for `(x, y)`. Negative or NaN weights are ignored.
    pub fn add_point(&mut self, x: f64, y: f64, value: f64) {
        if value.is_nan() || value < 0.0 {
            return;
        }
        if let Some((r, c)) = self.cell_for(x, y) {
            self.cells[r * self.cols + c] += value;
        }
    }

    /// Multiplies every cell by `factor`, then zeroes cells below [`DECAY_FLOOR`].
    pub fn decay(&mut self, factor: f64) {
        for cell in &mut self.cells {
            *cell *= factor;
            if *cell < DECAY_FLOOR {
                *cell = 0.0;
            }
        }
    }

    /// Cell-wise sum. Grids must share dimensions; a mismatched grid is ignored.
    pub fn accumulate(&mut self, other: &IntensityGrid) {
        if other.rows != self.rows || other.cols != self.cols {
            return;
        }
        for (cell, add) in self.cells.iter_mut().zip(&other.cells) {
            *cell += add;
        }
    }

    pub fn max_value(&self) -> Option<f64> {
        self.cells.iter().copied().reduce(f64::max)
    }

    /// `passes` rounds of a 3x3 mean over in-bounds neighbours.
    pub fn box_blur(&self, passes: usize) -> IntensityGrid {
        let mut out = self.clone();
        for _ in 0..passes {
            out = out.blur_pass();
        }
        out
    }

    fn blur_pass(&self) -> IntensityGrid {
        let mut out = IntensityGrid::new(self.rows, self.cols);
        for r in 0..self.rows {
            for c in 0..self.cols {
                let mut sum = 0.0;
                let mut count = 0usize;
                for rr in r.saturating_sub(1)..=(r + 1).min(self.rows - 1) {
                    for cc in c.saturating_sub(1)..=(c + 1).min(self.cols - 1) {
                        sum += self.cells[rr * self.cols + cc];
                        count += 1;
                    }
                }
                out.cells[r * self.cols + c] = sum / count as f64;
            }
        }
        out
    }

    /// Display opacity per cell in `[0.12, 0.9]`, scaled between `min` and `max`
    /// (`max` defaults to the largest cell, or 1 on an empty grid).
    pub fn normalized(&self, min: f64, max: Option<f64>) -> Vec<Vec<f64>> {
        let max = max.or_else(|| self.max_value()).unwrap_or(1.0);
        let span = max - min;
        self.map_rows(|v| {
            let t = if span == 0.0 { 0.0 } else { (v - min) / span };
            OPACITY_MIN + OPACITY_SPAN * t.clamp(0.0, 1.0)
        })
    }

    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.map_rows(|v| v)
    }

    fn map_rows(&self, f: impl Fn(f64) -> f64) -> Vec<Vec<f64>> {
        if self.cols == 0 {
            return vec![Vec::new(); self.rows];
        }
        self.cells
            .chunks(self.cols)
            .map(|row| row.iter().map(|&v| f(v)).collect())
            .collect()
    }
}

fn snap(coord: f64, n: usize) -> usize {
    let max = (n - 1) as f64;
    // NaN casts to 0
    (coord * max).round().clamp(0.0, max) as usize
}
