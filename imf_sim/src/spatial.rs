use crate::particle::Particle;

/// Uniform grid bucketing particle indices for neighbour queries.
///
/// Coordinates outside the container are clamped onto the border cells rather
/// than wrapped; the container has hard walls.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    cell_size: f64,
    cols: usize,
    rows: usize,
    cells: Vec<Vec<usize>>,
}

impl SpatialIndex {
    pub fn new(width: f64, height: f64, cell_size: f64) -> Self {
        let cols = ((width / cell_size).ceil() as usize).max(1);
        let rows = ((height / cell_size).ceil() as usize).max(1);
        SpatialIndex {
            cell_size,
            cols,
            rows,
            cells: vec![Vec::new(); cols * rows],
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

    #[inline]
    fn axis_cell(&self, v: f64, count: usize) -> usize {
        let c = (v / self.cell_size).floor();
        if c.is_nan() || c < 0.0 {
            0
        } else {
            (c as usize).min(count - 1)
        }
    }

    /// Clamped (column, row) of a point.
    pub fn cell_of(&self, x: f64, y: f64) -> (usize, usize) {
        (self.axis_cell(x, self.cols), self.axis_cell(y, self.rows))
    }

    pub fn insert(&mut self, index: usize, x: f64, y: f64) {
        let (cx, cy) = self.cell_of(x, y);
        self.cells[cx + cy * self.cols].push(index);
    }

    pub fn rebuild(&mut self, particles: &[Particle]) {
        self.clear();
        for (i, p) in particles.iter().enumerate() {
            self.insert(i, p.position.x, p.position.y);
        }
    }

    /// Calls `f` for every index bucketed in a cell overlapping the square of
    /// half-width `radius` around (x, y). This is a superset of the particles
    /// within `radius`; callers re-check the exact distance.
    pub fn for_each_neighbor<F>(&self, x: f64, y: f64, radius: f64, mut f: F)
    where
        F: FnMut(usize),
    {
        let (x0, y0) = self.cell_of(x - radius, y - radius);
        let (x1, y1) = self.cell_of(x + radius, y + radius);
        for cy in y0..=y1 {
            for cx in x0..=x1 {
                for &i in &self.cells[cx + cy * self.cols] {
                    f(i);
                }
            }
        }
    }
}
