//! Integer zonation arrays controlling how a property is parameterized.

use std::collections::BTreeSet;

use ndarray::{Array3, ArrayView2, Axis};
use thiserror::Error;

use crate::core::grid::GridShape;

/// How a zone code is interpreted during parameterization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZoneKind {
    /// Code 0. The cell takes no part in estimation.
    Inactive,
    /// Negative codes. All cells of the zone share a single adjustable value.
    Constant,
    /// Positive codes. Cell values are interpolated from pilot points.
    Pilot,
}

impl ZoneKind {
    /// Classifies a zone code by its sign.
    pub fn of(code: i32) -> Self {
        match code.signum() {
            0 => ZoneKind::Inactive,
            -1 => ZoneKind::Constant,
            _ => ZoneKind::Pilot,
        }
    }
}

/// Errors raised while constructing a zonation array.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IzoneError {
    /// The code array does not match the active-cell mask.
    #[error("Zonation shape mismatch: mask is {mask_nlay}x{mask_nrow}x{mask_ncol}, codes are {code_nlay}x{code_nrow}x{code_ncol}")]
    ShapeMismatch {
        mask_nlay: usize,
        mask_nrow: usize,
        mask_ncol: usize,
        code_nlay: usize,
        code_nrow: usize,
        code_ncol: usize,
    },
}

/// Zone codes for one property over the full grid.
///
/// Inactive model cells always carry code 0, whatever the caller supplied;
/// active cells carry the user's codes. The default zonation marks every
/// active cell as a single zone of piecewise constancy per layer (code -1).
#[derive(Debug, Clone, PartialEq)]
pub struct Izone {
    codes: Array3<i32>,
}

impl Izone {
    /// Builds the default zonation from the active-cell mask: -1 on active
    /// cells, 0 elsewhere.
    pub fn uniform(imask: &Array3<bool>) -> Self {
        Self {
            codes: imask.mapv(|active| if active { -1 } else { 0 }),
        }
    }

    /// Builds a zonation from user codes, forcing inactive cells to 0.
    ///
    /// # Errors
    ///
    /// Returns [`IzoneError::ShapeMismatch`] when `codes` and `imask` do not
    /// share the same dimensions.
    pub fn from_codes(imask: &Array3<bool>, codes: Array3<i32>) -> Result<Self, IzoneError> {
        if imask.dim() != codes.dim() {
            let (mask_nlay, mask_nrow, mask_ncol) = imask.dim();
            let (code_nlay, code_nrow, code_ncol) = codes.dim();
            return Err(IzoneError::ShapeMismatch {
                mask_nlay,
                mask_nrow,
                mask_ncol,
                code_nlay,
                code_nrow,
                code_ncol,
            });
        }
        let mut masked = codes;
        masked.zip_mut_with(imask, |code, active| {
            if !active {
                *code = 0;
            }
        });
        Ok(Self { codes: masked })
    }

    /// Returns the grid shape of the zonation.
    pub fn shape(&self) -> GridShape {
        let (nlay, nrow, ncol) = self.codes.dim();
        GridShape { nlay, nrow, ncol }
    }

    /// Returns the full code array.
    pub fn codes(&self) -> &Array3<i32> {
        &self.codes
    }

    /// Returns a 2-D view of the codes in one layer.
    ///
    /// # Panics
    ///
    /// Panics if `lay` is out of range; callers are expected to have
    /// validated the layer against [`shape`](Self::shape).
    pub fn layer(&self, lay: usize) -> ArrayView2<'_, i32> {
        self.codes.index_axis(Axis(0), lay)
    }

    /// Returns the sorted distinct non-zero codes present in one layer.
    pub fn zones_in_layer(&self, lay: usize) -> Vec<i32> {
        self.layer(lay)
            .iter()
            .copied()
            .filter(|&code| code != 0)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Returns the zones of piecewise constancy (negative codes) in one
    /// layer, sorted ascending.
    pub fn constant_zones_in_layer(&self, lay: usize) -> Vec<i32> {
        self.zones_in_layer(lay)
            .into_iter()
            .filter(|&code| code < 0)
            .collect()
    }

    /// Returns the pilot-point zones (positive codes) in one layer, sorted
    /// ascending.
    pub fn pilot_zones_in_layer(&self, lay: usize) -> Vec<i32> {
        self.zones_in_layer(lay)
            .into_iter()
            .filter(|&code| code > 0)
            .collect()
    }

    /// Returns the layers containing at least one pilot-point zone.
    pub fn pilot_layers(&self) -> Vec<usize> {
        (0..self.shape().nlay)
            .filter(|&lay| !self.pilot_zones_in_layer(lay).is_empty())
            .collect()
    }

    /// Counts the cells of `zone` in layer `lay`.
    pub fn selection_count(&self, lay: usize, zone: i32) -> usize {
        self.layer(lay).iter().filter(|&&code| code == zone).count()
    }

    /// Returns the `(row, col)` indices of the cells of `zone` in layer
    /// `lay`, in row-major order.
    pub fn select(&self, lay: usize, zone: i32) -> Vec<(usize, usize)> {
        self.layer(lay)
            .indexed_iter()
            .filter(|&(_, &code)| code == zone)
            .map(|(idx, _)| idx)
            .collect()
    }
}
