use thiserror::Error;

/// Dimensions of a structured, layered model grid.
///
/// MARTHE models are structured grids: `nlay` stacked layers of `nrow` x
/// `ncol` cells. Arrays over the grid are indexed `[layer][row][column]`,
/// zero-based; file formats and user-facing names use one-based layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridShape {
    /// Number of model layers.
    pub nlay: usize,
    /// Number of rows (north to south).
    pub nrow: usize,
    /// Number of columns (west to east).
    pub ncol: usize,
}

impl GridShape {
    /// Total number of cells in the grid.
    pub fn cell_count(&self) -> usize {
        self.nlay * self.nrow * self.ncol
    }

    /// Number of cells in a single layer.
    pub fn layer_cell_count(&self) -> usize {
        self.nrow * self.ncol
    }

    /// One-based, row-major node number of a cell within its layer.
    ///
    /// This is the numbering PEST's grid utilities use when they refer to a
    /// cell of a layer as a single index.
    pub fn node_of(&self, row: usize, col: usize) -> usize {
        row * self.ncol + col + 1
    }

    /// Inverse of [`node_of`](Self::node_of).
    ///
    /// # Return
    ///
    /// Returns `Some((row, col))` for node numbers in
    /// `1..=layer_cell_count()`, otherwise `None`.
    pub fn node_rc(&self, node: usize) -> Option<(usize, usize)> {
        if node == 0 || node > self.layer_cell_count() {
            return None;
        }
        let zero_based = node - 1;
        Some((zero_based / self.ncol, zero_based % self.ncol))
    }
}

/// Cell-center coordinates of a structured grid.
///
/// `x_centers` runs west to east (strictly ascending) and `y_centers` runs
/// north to south (strictly descending), matching the order in which MARTHE
/// writes grid files: row 0 is the northern edge of the model.
#[derive(Debug, Clone, PartialEq)]
pub struct GridGeometry {
    x_centers: Vec<f64>,
    y_centers: Vec<f64>,
}

#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("Coordinate axis '{axis}' is empty")]
    EmptyAxis { axis: &'static str },
    #[error("Coordinate axis '{axis}' is not strictly {order} at position {position}")]
    NotMonotonic {
        axis: &'static str,
        order: &'static str,
        position: usize,
    },
}

impl GridGeometry {
    /// Builds a geometry from cell-center coordinates.
    ///
    /// # Errors
    ///
    /// Returns an error if either axis is empty, if `x_centers` is not
    /// strictly ascending, or if `y_centers` is not strictly descending.
    pub fn new(x_centers: Vec<f64>, y_centers: Vec<f64>) -> Result<Self, GeometryError> {
        if x_centers.is_empty() {
            return Err(GeometryError::EmptyAxis { axis: "x" });
        }
        if y_centers.is_empty() {
            return Err(GeometryError::EmptyAxis { axis: "y" });
        }
        if let Some(position) = x_centers.windows(2).position(|w| w[0] >= w[1]) {
            return Err(GeometryError::NotMonotonic {
                axis: "x",
                order: "ascending",
                position,
            });
        }
        if let Some(position) = y_centers.windows(2).position(|w| w[0] <= w[1]) {
            return Err(GeometryError::NotMonotonic {
                axis: "y",
                order: "descending",
                position,
            });
        }
        Ok(Self {
            x_centers,
            y_centers,
        })
    }

    pub fn ncol(&self) -> usize {
        self.x_centers.len()
    }

    pub fn nrow(&self) -> usize {
        self.y_centers.len()
    }

    pub fn x_centers(&self) -> &[f64] {
        &self.x_centers
    }

    pub fn y_centers(&self) -> &[f64] {
        &self.y_centers
    }

    /// Column of the cell whose center is nearest to `x`.
    ///
    /// Coordinates beyond the outer cell edges (half a cell spacing past the
    /// first or last center) return `None`. An axis with a single center
    /// accepts any coordinate. Ties go to the lower index.
    pub fn col_of(&self, x: f64) -> Option<usize> {
        nearest_ascending(&self.x_centers, x)
    }

    /// Row of the cell whose center is nearest to `y`.
    ///
    /// Same edge behavior as [`col_of`](Self::col_of), on the descending
    /// y axis.
    pub fn row_of(&self, y: f64) -> Option<usize> {
        nearest_descending(&self.y_centers, y)
    }

    /// Western edge of the grid (half a spacing before the first x center).
    pub fn x_left_edge(&self) -> f64 {
        match self.x_centers.len() {
            1 => self.x_centers[0],
            _ => self.x_centers[0] - (self.x_centers[1] - self.x_centers[0]) / 2.0,
        }
    }

    /// Southern edge of the grid (half a spacing below the last y center).
    pub fn y_lower_edge(&self) -> f64 {
        let n = self.y_centers.len();
        match n {
            1 => self.y_centers[0],
            _ => self.y_centers[n - 1] - (self.y_centers[n - 2] - self.y_centers[n - 1]) / 2.0,
        }
    }
}

fn nearest_ascending(centers: &[f64], value: f64) -> Option<usize> {
    let n = centers.len();
    if n == 1 {
        return Some(0);
    }
    let low = centers[0] - (centers[1] - centers[0]) / 2.0;
    let high = centers[n - 1] + (centers[n - 1] - centers[n - 2]) / 2.0;
    if value < low || value > high {
        return None;
    }
    let insert = centers.partition_point(|&c| c < value);
    Some(closer_of(centers, insert, value))
}

fn nearest_descending(centers: &[f64], value: f64) -> Option<usize> {
    let n = centers.len();
    if n == 1 {
        return Some(0);
    }
    let high = centers[0] + (centers[0] - centers[1]) / 2.0;
    let low = centers[n - 1] - (centers[n - 2] - centers[n - 1]) / 2.0;
    if value < low || value > high {
        return None;
    }
    let insert = centers.partition_point(|&c| c > value);
    Some(closer_of(centers, insert, value))
}

fn closer_of(centers: &[f64], insert: usize, value: f64) -> usize {
    if insert == 0 {
        return 0;
    }
    if insert == centers.len() {
        return centers.len() - 1;
    }
    let before = (value - centers[insert - 1]).abs();
    let after = (value - centers[insert]).abs();
    if before <= after { insert - 1 } else { insert }
}
