//! Parameter groups over a model property.
//!
//! A group ties one MARTHE property to its estimation interface: the
//! zonation splitting the grid into zones of piecewise constancy (negative
//! codes) and pilot-point zones (positive codes), the named parameter
//! entries each zone contributes, and the data/template files PEST reads
//! and writes them through.
//!
//! Zones of piecewise constancy carry one parameter per (layer, zone).
//! Pilot-point zones carry one parameter per placed point; their cell
//! values are rebuilt by kriging-factor interpolation when the group is
//! applied back onto the field.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use tracing::warn;

use crate::core::grid::GridGeometry;
use crate::core::io::factors::InterpFactors;
use crate::core::models::field::MartheField;
use crate::core::models::izone::{Izone, ZoneKind};
use crate::core::models::model::{MartheModel, ModelError};
use crate::core::pest::control::{ParamTransform, PstParameter};
use crate::core::pest::fmt::{ffmt, ifmt, pp_name, sfmt, zpc_name};
use crate::core::pest::template;
use crate::engine::error::EngineError;

/// One zone-of-piecewise-constancy parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ZpcEntry {
    pub name: String,
    /// 0-based layer.
    pub lay: usize,
    /// Negative zonation code.
    pub zone: i32,
    pub value: f64,
}

/// One pilot-point parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct PpEntry {
    pub name: String,
    /// 0-based layer.
    pub lay: usize,
    /// Positive zonation code.
    pub zone: i32,
    pub x: f64,
    pub y: f64,
    pub row: usize,
    pub col: usize,
    pub value: f64,
}

/// Which ZPC entries an assignment addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZpcSelector {
    All,
    /// Every zone of one 0-based layer.
    Layer(usize),
    /// One zone of one layer.
    Zone { lay: usize, zone: i32 },
}

impl ZpcSelector {
    fn matches(self, entry: &ZpcEntry) -> bool {
        match self {
            ZpcSelector::All => true,
            ZpcSelector::Layer(lay) => entry.lay == lay,
            ZpcSelector::Zone { lay, zone } => entry.lay == lay && entry.zone == zone,
        }
    }
}

/// A parameterized property with its zonation and parameter tables.
#[derive(Debug, Clone)]
pub struct ParamGroup {
    name: String,
    transform: ParamTransform,
    default: f64,
    bounds: (f64, f64),
    izone: Izone,
    zpc: Vec<ZpcEntry>,
    pp: Vec<PpEntry>,
}

impl ParamGroup {
    /// Creates a group over `izone`, with one ZPC entry per constant zone
    /// per layer, all at the default value.
    pub fn new(
        name: impl Into<String>,
        default: f64,
        transform: ParamTransform,
        bounds: (f64, f64),
        izone: Izone,
    ) -> Self {
        let mut group = Self {
            name: name.into(),
            transform,
            default,
            bounds,
            izone,
            zpc: Vec::new(),
            pp: Vec::new(),
        };
        group.rebuild_zpc();
        group
    }

    /// The property name, doubling as the PEST parameter group name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn transform(&self) -> ParamTransform {
        self.transform
    }

    pub fn default(&self) -> f64 {
        self.default
    }

    pub fn bounds(&self) -> (f64, f64) {
        self.bounds
    }

    pub fn izone(&self) -> &Izone {
        &self.izone
    }

    pub fn zpc(&self) -> &[ZpcEntry] {
        &self.zpc
    }

    pub fn pp(&self) -> &[PpEntry] {
        &self.pp
    }

    pub fn has_zpc(&self) -> bool {
        !self.zpc.is_empty()
    }

    pub fn has_pp(&self) -> bool {
        !self.pp.is_empty()
    }

    /// 0-based layers carrying pilot-point zones.
    pub fn pilot_layers(&self) -> Vec<usize> {
        self.izone.pilot_layers()
    }

    /// 0-based layers holding placed pilot points, sorted.
    pub fn pp_layers(&self) -> Vec<usize> {
        let layers: std::collections::BTreeSet<usize> = self.pp.iter().map(|e| e.lay).collect();
        layers.into_iter().collect()
    }

    /// Replaces the zonation, rebuilding the ZPC table at the default value
    /// and discarding any placed pilot points.
    pub fn set_izone(&mut self, izone: Izone) {
        self.izone = izone;
        self.pp.clear();
        self.rebuild_zpc();
    }

    fn rebuild_zpc(&mut self) {
        self.zpc.clear();
        let nlay = self.izone.shape().nlay;
        for lay in 0..nlay {
            for zone in self.izone.constant_zones_in_layer(lay) {
                self.zpc.push(ZpcEntry {
                    name: zpc_name(&self.name, lay, zone),
                    lay,
                    zone,
                    value: self.default,
                });
            }
        }
    }

    /// Assigns `value` to the ZPC entries the selector matches and returns
    /// how many were touched.
    pub fn set_zpc_values(&mut self, selector: ZpcSelector, value: f64) -> usize {
        let mut touched = 0;
        for entry in self.zpc.iter_mut().filter(|e| selector.matches(e)) {
            entry.value = value;
            touched += 1;
        }
        touched
    }

    /// Places pilot points on a regular subgrid of layer `lay`, keeping
    /// every cell whose row and column indices are both multiples of
    /// `every`, zone by zone in row-major order.
    ///
    /// Previous placements on that layer are replaced, so the call is
    /// idempotent. Points start at the default value. Returns the number
    /// of points placed.
    pub fn pp_from_rgrid(
        &mut self,
        geometry: &GridGeometry,
        lay: usize,
        every: usize,
    ) -> Result<usize, EngineError> {
        let shape = self.izone.shape();
        if lay >= shape.nlay {
            return Err(EngineError::LayerOutOfRange {
                lay,
                nlay: shape.nlay,
            });
        }
        if every == 0 {
            return Err(EngineError::Internal(
                "pilot-point spacing must be at least 1".to_string(),
            ));
        }
        self.check_geometry(geometry)?;

        self.pp.retain(|e| e.lay != lay);
        let mut placed = 0;
        for zone in self.izone.pilot_zones_in_layer(lay) {
            let cells = self
                .izone
                .select(lay, zone)
                .into_iter()
                .filter(|&(row, col)| row % every == 0 && col % every == 0);
            for (index, (row, col)) in cells.enumerate() {
                self.pp.push(PpEntry {
                    name: pp_name(&self.name, lay, zone, index),
                    lay,
                    zone,
                    x: geometry.x_centers()[col],
                    y: geometry.y_centers()[row],
                    row,
                    col,
                    value: self.default,
                });
                placed += 1;
            }
        }
        Ok(placed)
    }

    /// Lists the interpolation targets of one zone as `(node, x, y)`
    /// triples with 1-based row-major node numbers, the inputs external
    /// kriging-factor generators expect.
    pub fn zone_interp_coords(
        &self,
        geometry: &GridGeometry,
        lay: usize,
        zone: i32,
    ) -> Result<Vec<(usize, f64, f64)>, EngineError> {
        let shape = self.izone.shape();
        if lay >= shape.nlay {
            return Err(EngineError::LayerOutOfRange {
                lay,
                nlay: shape.nlay,
            });
        }
        self.check_geometry(geometry)?;
        Ok(self
            .izone
            .select(lay, zone)
            .into_iter()
            .map(|(row, col)| {
                (
                    shape.node_of(row, col),
                    geometry.x_centers()[col],
                    geometry.y_centers()[row],
                )
            })
            .collect())
    }

    fn check_geometry(&self, geometry: &GridGeometry) -> Result<(), EngineError> {
        let shape = self.izone.shape();
        if geometry.nrow() != shape.nrow || geometry.ncol() != shape.ncol {
            return Err(EngineError::Internal(format!(
                "geometry {}x{} does not match the zonation grid {}x{}",
                geometry.nrow(),
                geometry.ncol(),
                shape.nrow,
                shape.ncol
            )));
        }
        Ok(())
    }

    /// File name of the ZPC data file.
    pub fn zpc_data_name(&self) -> String {
        format!("{}_zpc.dat", self.name)
    }

    /// File name of the ZPC template file.
    pub fn zpc_tpl_name(&self) -> String {
        format!("{}_zpc.tpl", self.name)
    }

    /// File name of one layer's pilot-point data file (1-based in the name).
    pub fn pp_data_name(&self, lay: usize) -> String {
        format!("{}_pp_l{:02}.dat", self.name, lay + 1)
    }

    /// File name of one layer's pilot-point template file.
    pub fn pp_tpl_name(&self, lay: usize) -> String {
        format!("{}_pp_l{:02}.tpl", self.name, lay + 1)
    }

    /// File name of one layer's kriging-factor file.
    pub fn pp_factors_name(&self, lay: usize) -> String {
        format!("{}_pp_l{:02}.fac", self.name, lay + 1)
    }

    fn zpc_prefix(entry: &ZpcEntry) -> String {
        format!("{} ", sfmt(&entry.name))
    }

    fn pp_prefix(entry: &PpEntry) -> String {
        format!(
            "{} {} {} {} ",
            sfmt(&entry.name),
            ffmt(entry.x),
            ffmt(entry.y),
            ifmt(i64::from(entry.zone))
        )
    }

    /// Writes the ZPC data file: one `name value` row per entry.
    pub fn write_zpc_data(&self, writer: &mut impl Write) -> io::Result<()> {
        for entry in &self.zpc {
            writeln!(writer, "{}{}", Self::zpc_prefix(entry), ffmt(entry.value))?;
        }
        Ok(())
    }

    /// Writes the template mirroring [`write_zpc_data`](Self::write_zpc_data).
    pub fn write_zpc_tpl(&self, writer: &mut impl Write) -> io::Result<()> {
        template::write_template(
            writer,
            self.zpc
                .iter()
                .map(|e| (Self::zpc_prefix(e), e.name.clone())),
        )
    }

    /// Writes one layer's pilot-point data file:
    /// `name x y zone value` rows.
    pub fn write_pp_data(&self, lay: usize, writer: &mut impl Write) -> io::Result<()> {
        for entry in self.pp.iter().filter(|e| e.lay == lay) {
            writeln!(writer, "{}{}", Self::pp_prefix(entry), ffmt(entry.value))?;
        }
        Ok(())
    }

    /// Writes the template mirroring [`write_pp_data`](Self::write_pp_data).
    pub fn write_pp_tpl(&self, lay: usize, writer: &mut impl Write) -> io::Result<()> {
        template::write_template(
            writer,
            self.pp
                .iter()
                .filter(|e| e.lay == lay)
                .map(|e| (Self::pp_prefix(e), e.name.clone())),
        )
    }

    /// Reads a ZPC data file back, merging values into the table by
    /// parameter name.
    ///
    /// Names the table does not know are logged and skipped; a table entry
    /// the file does not cover is an error, since the matching template
    /// guarantees every entry a row. Returns the number of merged values.
    pub fn read_zpc_data<P: AsRef<Path>>(&mut self, path: P) -> Result<usize, EngineError> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let mut seen = HashSet::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let text = line.trim();
            if text.is_empty() || text.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = text.split_whitespace().collect();
            let [name, value] = fields.as_slice() else {
                return Err(EngineError::ParamData {
                    path: path.to_path_buf(),
                    line: index + 1,
                    message: format!("expected 'name value', got {} fields", fields.len()),
                });
            };
            let value = parse_value(value, path, index + 1)?;
            match self.zpc.iter_mut().find(|e| e.name == *name) {
                Some(entry) => {
                    entry.value = value;
                    seen.insert(entry.name.clone());
                }
                None => warn!(
                    "Ignoring unknown parameter '{}' in '{}'",
                    name,
                    path.display()
                ),
            }
        }
        for entry in &self.zpc {
            if !seen.contains(&entry.name) {
                return Err(EngineError::MissingParameterValue {
                    name: entry.name.clone(),
                });
            }
        }
        Ok(seen.len())
    }

    /// Reads one layer's pilot-point data file back, merging values by
    /// name with the same rules as [`read_zpc_data`](Self::read_zpc_data).
    pub fn read_pp_data<P: AsRef<Path>>(
        &mut self,
        lay: usize,
        path: P,
    ) -> Result<usize, EngineError> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let mut seen = HashSet::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let text = line.trim();
            if text.is_empty() || text.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = text.split_whitespace().collect();
            let [name, _x, _y, _zone, value] = fields.as_slice() else {
                return Err(EngineError::ParamData {
                    path: path.to_path_buf(),
                    line: index + 1,
                    message: format!("expected 'name x y zone value', got {} fields", fields.len()),
                });
            };
            let value = parse_value(value, path, index + 1)?;
            match self.pp.iter_mut().find(|e| e.name == *name) {
                Some(entry) => {
                    entry.value = value;
                    seen.insert(entry.name.clone());
                }
                None => warn!(
                    "Ignoring unknown pilot point '{}' in '{}'",
                    name,
                    path.display()
                ),
            }
        }
        for entry in self.pp.iter().filter(|e| e.lay == lay) {
            if !seen.contains(&entry.name) {
                return Err(EngineError::MissingParameterValue {
                    name: entry.name.clone(),
                });
            }
        }
        Ok(seen.len())
    }

    /// Interpolates the current pilot-point values through a factor file,
    /// returning `(node, value)` pairs for the covered cells.
    pub fn interp_from_factors(
        &self,
        factors: &InterpFactors,
    ) -> Result<Vec<(usize, f64)>, EngineError> {
        let by_name: HashMap<&str, f64> =
            self.pp.iter().map(|e| (e.name.as_str(), e.value)).collect();
        let values = factors
            .pp_names()
            .iter()
            .map(|name| {
                by_name
                    .get(name.as_str())
                    .copied()
                    .ok_or_else(|| EngineError::UnknownPilotPoint { name: name.clone() })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(factors.interpolate(&values)?)
    }

    /// Pushes the ZPC values into the field, zone by zone. Returns the
    /// number of cells written.
    pub fn apply_zpc(&self, field: &mut MartheField) -> Result<usize, EngineError> {
        let mut written = 0;
        for entry in &self.zpc {
            written += field.set_zone(&self.izone, entry.lay, entry.zone, entry.value)?;
        }
        Ok(written)
    }

    /// Pushes interpolated pilot-point values into one layer of the field.
    ///
    /// Only cells sitting in a pilot zone of that layer are written; nodes
    /// the factor file covers outside those zones are left untouched.
    /// Returns the number of cells written.
    pub fn apply_factors(
        &self,
        field: &mut MartheField,
        lay: usize,
        factors: &InterpFactors,
    ) -> Result<usize, EngineError> {
        let shape = field.shape();
        if lay >= shape.nlay {
            return Err(EngineError::LayerOutOfRange {
                lay,
                nlay: shape.nlay,
            });
        }
        if self.izone.shape() != shape {
            return Err(EngineError::Internal(format!(
                "zonation grid {:?} does not match the field grid {:?}",
                self.izone.shape(),
                shape
            )));
        }
        let pairs = self.interp_from_factors(factors)?;
        let codes = self.izone.codes();
        let mut written = 0;
        for (node, value) in pairs {
            let (row, col) = shape.node_rc(node).ok_or_else(|| {
                EngineError::Internal(format!(
                    "factor node {} outside the {}x{} layer",
                    node, shape.nrow, shape.ncol
                ))
            })?;
            if ZoneKind::of(codes[[lay, row, col]]) == ZoneKind::Pilot {
                field.values_mut()[[lay, row, col]] = value;
                written += 1;
            }
        }
        Ok(written)
    }

    /// Pushes the whole group into the model's field: ZPC values first,
    /// then kriging-factor interpolation for every pilot layer.
    ///
    /// `factors_by_layer` must cover each 0-based pilot layer of the
    /// zonation. Returns the number of cells written.
    pub fn apply(
        &self,
        model: &mut MartheModel,
        factors_by_layer: &BTreeMap<usize, InterpFactors>,
    ) -> Result<usize, EngineError> {
        let field = model.prop_mut(&self.name).ok_or_else(|| {
            ModelError::PropertyNotLoaded {
                name: self.name.clone(),
            }
        })?;
        let mut written = self.apply_zpc(field)?;
        for lay in self.izone.pilot_layers() {
            let factors =
                factors_by_layer
                    .get(&lay)
                    .ok_or_else(|| EngineError::MissingFactors {
                        name: self.name.clone(),
                        lay: lay + 1,
                    })?;
            written += self.apply_factors(field, lay, factors)?;
        }
        Ok(written)
    }

    /// The group's rows for the PEST `* parameter data` section, ZPC
    /// entries first, then pilot points in placement order.
    pub fn pst_parameters(&self) -> Vec<PstParameter> {
        let (lower, upper) = self.bounds;
        let row = |name: &str, value: f64| PstParameter {
            name: name.to_string(),
            transform: self.transform,
            value,
            lower,
            upper,
            group: self.name.clone(),
        };
        self.zpc
            .iter()
            .map(|e| row(&e.name, e.value))
            .chain(self.pp.iter().map(|e| row(&e.name, e.value)))
            .collect()
    }
}

fn parse_value(token: &str, path: &Path, line: usize) -> Result<f64, EngineError> {
    token
        .parse::<f64>()
        .map_err(|_| EngineError::ParamData {
            path: path.to_path_buf(),
            line,
            message: format!("invalid value '{}'", token),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::grid::GridShape;
    use ndarray::Array3;
    use std::io::Cursor;
    use tempfile::tempdir;

    fn geometry_4x4() -> GridGeometry {
        GridGeometry::new(
            vec![0.5, 1.5, 2.5, 3.5],
            vec![3.5, 2.5, 1.5, 0.5],
        )
        .unwrap()
    }

    /// Layer 0 is one constant zone, layer 1 one pilot zone; the cell at
    /// (0, 3) is inactive on both layers.
    fn izone_fixture() -> Izone {
        let mut imask = Array3::from_elem((2, 4, 4), true);
        imask[[0, 0, 3]] = false;
        imask[[1, 0, 3]] = false;
        let mut codes = Array3::zeros((2, 4, 4));
        codes.index_axis_mut(ndarray::Axis(0), 0).fill(-1);
        codes.index_axis_mut(ndarray::Axis(0), 1).fill(1);
        Izone::from_codes(&imask, codes).unwrap()
    }

    fn group_fixture() -> ParamGroup {
        ParamGroup::new(
            "permh",
            1e-3,
            ParamTransform::Log,
            (1e-8, 1.0),
            izone_fixture(),
        )
    }

    #[test]
    fn new_group_builds_one_zpc_entry_per_constant_zone() {
        let group = group_fixture();
        assert_eq!(group.zpc().len(), 1);
        assert_eq!(group.zpc()[0].name, "permh_l01_zpc01");
        assert_eq!(group.zpc()[0].value, 1e-3);
        assert!(group.pp().is_empty());
        assert_eq!(group.pilot_layers(), vec![1]);
    }

    #[test]
    fn zpc_selectors_address_layers_and_zones() {
        let imask = Array3::from_elem((2, 2, 2), true);
        let mut codes = Array3::zeros((2, 2, 2));
        codes.index_axis_mut(ndarray::Axis(0), 0).fill(-1);
        codes[[0, 1, 1]] = -2;
        codes.index_axis_mut(ndarray::Axis(0), 1).fill(-1);
        let izone = Izone::from_codes(&imask, codes).unwrap();
        let mut group = ParamGroup::new("kepon", 0.1, ParamTransform::None, (0.0, 1.0), izone);
        // Zones sort ascending within a layer, so -2 comes first.
        assert_eq!(group.zpc().len(), 3);

        assert_eq!(group.set_zpc_values(ZpcSelector::All, 0.5), 3);
        assert_eq!(group.set_zpc_values(ZpcSelector::Layer(0), 0.2), 2);
        assert_eq!(
            group.set_zpc_values(ZpcSelector::Zone { lay: 0, zone: -2 }, 0.9),
            1
        );
        let values: Vec<f64> = group.zpc().iter().map(|e| e.value).collect();
        assert_eq!(values, vec![0.9, 0.2, 0.5]);
    }

    #[test]
    fn rgrid_placement_keeps_the_regular_subgrid() {
        let mut group = group_fixture();
        let placed = group.pp_from_rgrid(&geometry_4x4(), 1, 2).unwrap();
        assert_eq!(placed, 4);
        let names: Vec<&str> = group.pp().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "permh_l02_z01_001",
                "permh_l02_z01_002",
                "permh_l02_z01_003",
                "permh_l02_z01_004"
            ]
        );
        let first = &group.pp()[0];
        assert_eq!((first.row, first.col), (0, 0));
        assert_eq!((first.x, first.y), (0.5, 3.5));

        // Placing again replaces the layer instead of stacking.
        let placed = group.pp_from_rgrid(&geometry_4x4(), 1, 2).unwrap();
        assert_eq!(placed, 4);
        assert_eq!(group.pp().len(), 4);
    }

    #[test]
    fn rgrid_placement_skips_inactive_cells() {
        let mut group = group_fixture();
        group.pp_from_rgrid(&geometry_4x4(), 1, 1).unwrap();
        // 16 cells minus the inactive one.
        assert_eq!(group.pp().len(), 15);
        assert!(
            group
                .pp()
                .iter()
                .all(|e| !(e.row == 0 && e.col == 3))
        );
    }

    #[test]
    fn rgrid_placement_rejects_bad_layers() {
        let mut group = group_fixture();
        assert!(matches!(
            group.pp_from_rgrid(&geometry_4x4(), 5, 2),
            Err(EngineError::LayerOutOfRange { lay: 5, nlay: 2 })
        ));
    }

    #[test]
    fn interp_coords_number_nodes_row_major() {
        let group = group_fixture();
        let coords = group.zone_interp_coords(&geometry_4x4(), 1, 1).unwrap();
        assert_eq!(coords.len(), 15);
        assert_eq!(coords[0], (1, 0.5, 3.5));
        // Node 4 is the inactive (0, 3) cell, so the next entry jumps to 5.
        assert_eq!(coords[3], (5, 0.5, 2.5));
        let shape = GridShape {
            nlay: 2,
            nrow: 4,
            ncol: 4,
        };
        assert_eq!(coords.last().unwrap().0, shape.layer_cell_count());
    }

    #[test]
    fn data_and_template_rows_share_their_prefix() {
        let mut group = group_fixture();
        group.pp_from_rgrid(&geometry_4x4(), 1, 2).unwrap();

        let mut data = Vec::new();
        group.write_pp_data(1, &mut data).unwrap();
        let mut tpl = Vec::new();
        group.write_pp_tpl(1, &mut tpl).unwrap();

        let data = String::from_utf8(data).unwrap();
        let tpl = String::from_utf8(tpl).unwrap();
        let data_row = data.lines().next().unwrap();
        let tpl_row = tpl.lines().nth(1).unwrap();

        let prefix_len = data_row.len() - 20;
        assert_eq!(data_row[..prefix_len], tpl_row[..prefix_len]);
        assert!(tpl_row[prefix_len..].starts_with('~'));
        let fields: Vec<&str> = data_row.split_whitespace().collect();
        assert_eq!(fields.len(), 5);
        assert_eq!(fields[3], "1");
    }

    #[test]
    fn zpc_data_round_trips_through_the_file() {
        let dir = tempdir().unwrap();
        let mut group = group_fixture();
        let path = dir.path().join(group.zpc_data_name());

        group.set_zpc_values(ZpcSelector::All, 2.5e-4);
        let mut buffer = Vec::new();
        group.write_zpc_data(&mut buffer).unwrap();
        std::fs::write(&path, buffer).unwrap();

        group.set_zpc_values(ZpcSelector::All, 0.0);
        let merged = group.read_zpc_data(&path).unwrap();
        assert_eq!(merged, 1);
        assert_eq!(group.zpc()[0].value, 2.5e-4);
    }

    #[test]
    fn unknown_file_entries_are_skipped_and_gaps_are_errors() {
        let dir = tempdir().unwrap();
        let mut group = group_fixture();

        let path = dir.path().join("zpc.dat");
        std::fs::write(&path, "permh_l01_zpc01 4.0e-3\nother_param 1.0\n").unwrap();
        assert_eq!(group.read_zpc_data(&path).unwrap(), 1);
        assert_eq!(group.zpc()[0].value, 4.0e-3);

        let path = dir.path().join("empty.dat");
        std::fs::write(&path, "# nothing here\n").unwrap();
        assert!(matches!(
            group.read_zpc_data(&path),
            Err(EngineError::MissingParameterValue { .. })
        ));
    }

    #[test]
    fn malformed_rows_report_their_line() {
        let dir = tempdir().unwrap();
        let mut group = group_fixture();
        let path = dir.path().join("zpc.dat");
        std::fs::write(&path, "permh_l01_zpc01 2.0e-3\npermh_l01_zpc01 not_a_number\n").unwrap();
        match group.read_zpc_data(&path) {
            Err(EngineError::ParamData { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn zpc_application_writes_only_the_constant_zone() {
        let group = group_fixture();
        let mut field = MartheField::filled("permh", geometry_4x4(), 2, 1.0).unwrap();
        let written = group.apply_zpc(&mut field).unwrap();
        // Layer 0 has 15 active zone cells; layer 1 is pilot-only.
        assert_eq!(written, 15);
        assert_eq!(field.values()[[0, 0, 0]], 1e-3);
        assert_eq!(field.values()[[0, 0, 3]], 1.0);
        assert_eq!(field.values()[[1, 0, 0]], 1.0);
    }

    const FACTORS: &str = "\
points.dat
zones.dat
4 4
2
permh_l02_z01_001
permh_l02_z01_002
1 0 2 1 0.75 2 0.25
2 0 1 2 1.0
4 0 1 1 1.0
";

    #[test]
    fn factor_application_masks_on_the_pilot_zone() {
        let mut group = group_fixture();
        group.pp_from_rgrid(&geometry_4x4(), 1, 2).unwrap();
        group.pp[0].value = 4.0;
        group.pp[1].value = 8.0;

        let factors = InterpFactors::read_from(&mut Cursor::new(FACTORS)).unwrap();
        let mut field = MartheField::filled("permh", geometry_4x4(), 2, 0.0).unwrap();
        let written = group.apply_factors(&mut field, 1, &factors).unwrap();

        // Node 4 is the inactive cell, so only nodes 1 and 2 land.
        assert_eq!(written, 2);
        assert_eq!(field.values()[[1, 0, 0]], 0.75 * 4.0 + 0.25 * 8.0);
        assert_eq!(field.values()[[1, 0, 1]], 8.0);
        assert_eq!(field.values()[[1, 0, 3]], 0.0);
    }

    #[test]
    fn factor_files_naming_unknown_points_are_rejected() {
        let group = group_fixture();
        let factors = InterpFactors::read_from(&mut Cursor::new(FACTORS)).unwrap();
        assert!(matches!(
            group.interp_from_factors(&factors),
            Err(EngineError::UnknownPilotPoint { .. })
        ));
    }

    #[test]
    fn apply_requires_factors_for_every_pilot_layer() {
        let mut group = group_fixture();
        group.pp_from_rgrid(&geometry_4x4(), 1, 2).unwrap();
        let permh = MartheField::filled("permh", geometry_4x4(), 2, 1.0).unwrap();
        let mut model = MartheModel::from_permh(".", "m", permh);

        let empty = BTreeMap::new();
        assert!(matches!(
            group.apply(&mut model, &empty),
            Err(EngineError::MissingFactors { lay: 2, .. })
        ));

        let factors = InterpFactors::read_from(&mut Cursor::new(FACTORS)).unwrap();
        let mut by_layer = BTreeMap::new();
        by_layer.insert(1, factors);
        let written = group.apply(&mut model, &by_layer).unwrap();
        assert_eq!(written, 15 + 2);
    }

    #[test]
    fn pst_rows_cover_both_tables() {
        let mut group = group_fixture();
        group.pp_from_rgrid(&geometry_4x4(), 1, 2).unwrap();
        let rows = group.pst_parameters();
        assert_eq!(rows.len(), 1 + 4);
        assert!(rows.iter().all(|r| r.group == "permh"));
        assert!(rows.iter().all(|r| r.transform == ParamTransform::Log));
        assert_eq!(rows[0].name, "permh_l01_zpc01");
        assert_eq!(rows[1].name, "permh_l02_z01_001");
    }
}
