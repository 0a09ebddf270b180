//! Property fields defined over the model grid.
//!
//! A [`MartheField`] couples a 3-D value array with the grid geometry it is
//! defined on, so point sampling and zone-wise assignment stay consistent
//! with the cell layout read from disk.

use ndarray::{Array3, ArrayView2, ArrayViewMut2, Axis};
use thiserror::Error;

use crate::core::grid::{GridGeometry, GridShape};
use crate::core::models::izone::Izone;

/// Errors that can occur while constructing or mutating a property field.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    /// The value array does not match the expected grid dimensions.
    #[error(
        "Field shape mismatch: expected {expected_nlay}x{expected_nrow}x{expected_ncol}, got {got_nlay}x{got_nrow}x{got_ncol}"
    )]
    ShapeMismatch {
        expected_nlay: usize,
        expected_nrow: usize,
        expected_ncol: usize,
        got_nlay: usize,
        got_nrow: usize,
        got_ncol: usize,
    },
    /// A layer index is outside the model's layer range.
    #[error("Layer index {lay} out of range for a model with {nlay} layers")]
    LayerOutOfRange { lay: usize, nlay: usize },
    /// Zone code 0 marks inactive cells and cannot be assigned to.
    #[error("Zone code 0 marks inactive cells and cannot receive values")]
    InactiveZone,
    /// The number of provided values does not match the zone selection.
    #[error("Value count mismatch: zone selects {expected} cells, got {got} values")]
    ValueCountMismatch { expected: usize, got: usize },
}

/// A single model property (e.g. `permh`, `emmca`) over the full 3-D grid.
///
/// Values are stored layer-major: index order is `[layer][row][column]`,
/// with row 0 at the northern edge of the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct MartheField {
    name: String,
    geometry: GridGeometry,
    values: Array3<f64>,
}

impl MartheField {
    /// Creates a field, checking the value array against the grid geometry.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::ShapeMismatch`] if the array's row or column
    /// extent disagrees with the geometry, or if it has no layers.
    pub fn new(
        name: impl Into<String>,
        geometry: GridGeometry,
        values: Array3<f64>,
    ) -> Result<Self, FieldError> {
        let (nlay, nrow, ncol) = values.dim();
        if nlay == 0 || nrow != geometry.nrow() || ncol != geometry.ncol() {
            return Err(FieldError::ShapeMismatch {
                expected_nlay: nlay.max(1),
                expected_nrow: geometry.nrow(),
                expected_ncol: geometry.ncol(),
                got_nlay: nlay,
                got_nrow: nrow,
                got_ncol: ncol,
            });
        }
        Ok(Self {
            name: name.into(),
            geometry,
            values,
        })
    }

    /// Creates a field with every cell set to `value`.
    pub fn filled(
        name: impl Into<String>,
        geometry: GridGeometry,
        nlay: usize,
        value: f64,
    ) -> Result<Self, FieldError> {
        let values = Array3::from_elem((nlay, geometry.nrow(), geometry.ncol()), value);
        Self::new(name, geometry, values)
    }

    /// Returns the property name recorded in the field.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the same field under a different property name.
    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Returns the grid shape covered by this field.
    pub fn shape(&self) -> GridShape {
        let (nlay, nrow, ncol) = self.values.dim();
        GridShape { nlay, nrow, ncol }
    }

    /// Returns the grid geometry the field is defined on.
    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    /// Returns the full 3-D value array.
    pub fn values(&self) -> &Array3<f64> {
        &self.values
    }

    /// Returns a mutable reference to the full 3-D value array.
    pub fn values_mut(&mut self) -> &mut Array3<f64> {
        &mut self.values
    }

    /// Samples the field value at map coordinates `(x, y)` in layer `lay`.
    ///
    /// The value of the cell whose center lies closest to the point is
    /// returned. Points beyond half a cell spacing outside the grid, or a
    /// layer index outside the model, yield `None`.
    pub fn sample(&self, x: f64, y: f64, lay: usize) -> Option<f64> {
        if lay >= self.shape().nlay {
            return None;
        }
        let col = self.geometry.col_of(x)?;
        let row = self.geometry.row_of(y)?;
        Some(self.values[[lay, row, col]])
    }

    /// Returns a 2-D view of one layer, or `None` if `lay` is out of range.
    pub fn layer(&self, lay: usize) -> Option<ArrayView2<'_, f64>> {
        if lay >= self.shape().nlay {
            return None;
        }
        Some(self.values.index_axis(Axis(0), lay))
    }

    /// Returns a mutable 2-D view of one layer.
    pub fn layer_mut(&mut self, lay: usize) -> Option<ArrayViewMut2<'_, f64>> {
        if lay >= self.shape().nlay {
            return None;
        }
        Some(self.values.index_axis_mut(Axis(0), lay))
    }

    /// Assigns `value` to every cell of `zone` in layer `lay`.
    ///
    /// Returns the number of cells written, which may be zero when the zone
    /// has no cells in that layer.
    ///
    /// # Errors
    ///
    /// Fails when the zonation array does not match the field shape, the
    /// layer is out of range, or `zone` is 0.
    pub fn set_zone(
        &mut self,
        izone: &Izone,
        lay: usize,
        zone: i32,
        value: f64,
    ) -> Result<usize, FieldError> {
        self.check_zone_request(izone, lay, zone)?;
        let codes = izone.layer(lay);
        let mut layer = self.values.index_axis_mut(Axis(0), lay);
        let mut written = 0;
        for ((row, col), code) in codes.indexed_iter() {
            if *code == zone {
                layer[[row, col]] = value;
                written += 1;
            }
        }
        Ok(written)
    }

    /// Assigns one value per cell of `zone` in layer `lay`, in row-major
    /// cell order.
    ///
    /// # Errors
    ///
    /// In addition to the checks of [`set_zone`](Self::set_zone), fails with
    /// [`FieldError::ValueCountMismatch`] when `values` does not hold exactly
    /// one entry per selected cell.
    pub fn set_zone_values(
        &mut self,
        izone: &Izone,
        lay: usize,
        zone: i32,
        values: &[f64],
    ) -> Result<usize, FieldError> {
        self.check_zone_request(izone, lay, zone)?;
        let expected = izone.selection_count(lay, zone);
        if values.len() != expected {
            return Err(FieldError::ValueCountMismatch {
                expected,
                got: values.len(),
            });
        }
        let codes = izone.layer(lay);
        let mut layer = self.values.index_axis_mut(Axis(0), lay);
        let mut next = 0;
        for ((row, col), code) in codes.indexed_iter() {
            if *code == zone {
                layer[[row, col]] = values[next];
                next += 1;
            }
        }
        Ok(next)
    }

    /// Returns the mask of active cells, defined as cells holding a
    /// non-zero value.
    ///
    /// MARTHE encodes inactive cells as exact zeros in the `permh` field,
    /// which is why the comparison is exact rather than tolerance-based.
    pub fn active_mask(&self) -> Array3<bool> {
        self.values.mapv(|v| v != 0.0)
    }

    fn check_zone_request(&self, izone: &Izone, lay: usize, zone: i32) -> Result<(), FieldError> {
        let shape = self.shape();
        if izone.shape() != shape {
            let got = izone.shape();
            return Err(FieldError::ShapeMismatch {
                expected_nlay: shape.nlay,
                expected_nrow: shape.nrow,
                expected_ncol: shape.ncol,
                got_nlay: got.nlay,
                got_nrow: got.nrow,
                got_ncol: got.ncol,
            });
        }
        if lay >= shape.nlay {
            return Err(FieldError::LayerOutOfRange {
                lay,
                nlay: shape.nlay,
            });
        }
        if zone == 0 {
            return Err(FieldError::InactiveZone);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn geometry_3x4() -> GridGeometry {
        GridGeometry::new(vec![0.5, 1.5, 2.5, 3.5], vec![2.5, 1.5, 0.5]).unwrap()
    }

    fn ramp_field() -> MartheField {
        let values =
            Array3::from_shape_fn((2, 3, 4), |(l, r, c)| (l * 100 + r * 10 + c) as f64);
        MartheField::new("permh", geometry_3x4(), values).unwrap()
    }

    #[test]
    fn rejects_mismatched_value_array() {
        let values = Array3::zeros((2, 3, 5));
        let result = MartheField::new("permh", geometry_3x4(), values);
        assert!(matches!(result, Err(FieldError::ShapeMismatch { .. })));
    }

    #[test]
    fn samples_nearest_cell_center() {
        let field = ramp_field();
        assert_eq!(field.sample(1.4, 0.6, 0), Some(21.0));
        assert_eq!(field.sample(1.4, 0.6, 1), Some(121.0));
        assert_eq!(field.sample(-1.0, 0.6, 0), None);
        assert_eq!(field.sample(1.4, 0.6, 2), None);
    }

    #[test]
    fn layer_views_select_the_right_slice() {
        let field = ramp_field();
        let layer = field.layer(1).unwrap();
        assert_eq!(layer[[2, 3]], 123.0);
        assert!(field.layer(2).is_none());
    }

    #[test]
    fn set_zone_writes_only_matching_cells() {
        let mut field = ramp_field();
        let mut codes = Array3::zeros((2, 3, 4));
        codes[[0, 0, 0]] = -1;
        codes[[0, 2, 3]] = -1;
        codes[[1, 1, 1]] = -1;
        let imask = Array3::from_elem((2, 3, 4), true);
        let izone = Izone::from_codes(&imask, codes).unwrap();

        let written = field.set_zone(&izone, 0, -1, 7.5).unwrap();
        assert_eq!(written, 2);
        assert_eq!(field.values()[[0, 0, 0]], 7.5);
        assert_eq!(field.values()[[0, 2, 3]], 7.5);
        assert_eq!(field.values()[[1, 1, 1]], 111.0);
    }

    #[test]
    fn set_zone_values_follows_row_major_order() {
        let mut field = ramp_field();
        let mut codes = Array3::zeros((2, 3, 4));
        codes[[0, 0, 1]] = 2;
        codes[[0, 1, 0]] = 2;
        codes[[0, 2, 2]] = 2;
        let imask = Array3::from_elem((2, 3, 4), true);
        let izone = Izone::from_codes(&imask, codes).unwrap();

        field
            .set_zone_values(&izone, 0, 2, &[10.0, 20.0, 30.0])
            .unwrap();
        assert_eq!(field.values()[[0, 0, 1]], 10.0);
        assert_eq!(field.values()[[0, 1, 0]], 20.0);
        assert_eq!(field.values()[[0, 2, 2]], 30.0);

        let short = field.set_zone_values(&izone, 0, 2, &[1.0]);
        assert!(matches!(
            short,
            Err(FieldError::ValueCountMismatch {
                expected: 3,
                got: 1
            })
        ));
    }

    #[test]
    fn zone_zero_is_rejected() {
        let mut field = ramp_field();
        let imask = Array3::from_elem((2, 3, 4), true);
        let izone = Izone::uniform(&imask);
        assert_eq!(
            field.set_zone(&izone, 0, 0, 1.0),
            Err(FieldError::InactiveZone)
        );
    }

    #[test]
    fn active_mask_flags_nonzero_cells() {
        let mut values = Array3::zeros((1, 3, 4));
        values[[0, 1, 2]] = 3.2e-4;
        let field = MartheField::new("permh", geometry_3x4(), values).unwrap();
        let mask = field.active_mask();
        assert!(mask[[0, 1, 2]]);
        assert!(!mask[[0, 0, 0]]);
    }
}
