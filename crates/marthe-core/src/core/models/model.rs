//! The MARTHE model as it sits on disk.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::path::{Path, PathBuf};

use ndarray::Array3;
use thiserror::Error;
use tracing::debug;

use crate::core::grid::{GridGeometry, GridShape};
use crate::core::io::grid::{GridError, GridFile, GridMetadata};
use crate::core::io::traits::TextFile;
use crate::core::models::field::MartheField;
use crate::core::utils::keywords;

/// Errors that can occur while loading or writing model files.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The `.rma` path carries no usable model name.
    #[error("Invalid model file path '{path}': {reason}")]
    InvalidPath { path: PathBuf, reason: &'static str },
    /// A property grid file could not be read.
    #[error("Failed to read grid file '{path}'")]
    GridRead {
        path: PathBuf,
        #[source]
        source: GridError,
    },
    /// A property grid file could not be written.
    #[error("Failed to write grid file '{path}'")]
    GridWrite {
        path: PathBuf,
        #[source]
        source: GridError,
    },
    /// A property grid disagrees with the model's layer count or geometry.
    #[error("Property '{prop}' grid does not match the model grid")]
    GridMismatch { prop: String },
    /// The requested property has not been loaded.
    #[error("Property '{name}' is not loaded")]
    PropertyNotLoaded { name: String },
}

/// A MARTHE model anchored at its `.rma` file.
///
/// The model keeps the working directory and name the file paths derive
/// from, the grid geometry and active-cell mask established by the
/// permeability field, and the property fields loaded so far.
///
/// Property grid files follow the `<dir>/<name>.<prop>` convention; the
/// permeability field `permh` is always loaded because its non-zero cells
/// define the active domain.
#[derive(Debug, Clone)]
pub struct MartheModel {
    mldir: PathBuf,
    name: String,
    geometry: GridGeometry,
    imask: Array3<bool>,
    props: BTreeMap<String, MartheField>,
}

impl MartheModel {
    /// Loads a model from the path of its `.rma` file.
    ///
    /// The file itself is not parsed; its directory and stem anchor every
    /// derived path. The `<name>.permh` grid is read immediately to
    /// establish the grid geometry and the active-cell mask.
    ///
    /// # Errors
    ///
    /// Fails when the path has no file stem or the permeability grid cannot
    /// be read.
    pub fn load<P: AsRef<Path>>(rma_path: P) -> Result<Self, ModelError> {
        let rma_path = rma_path.as_ref();
        let name = rma_path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .filter(|stem| !stem.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ModelError::InvalidPath {
                path: rma_path.to_path_buf(),
                reason: "no usable file stem",
            })?;
        let mldir = match rma_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let permh_path = mldir.join(format!("{name}.permh"));
        let (permh, _) =
            GridFile::read_from_path(&permh_path).map_err(|source| ModelError::GridRead {
                path: permh_path,
                source,
            })?;
        let permh = permh.renamed("permh");
        let imask = permh.active_mask();
        let geometry = permh.geometry().clone();
        let active = imask.iter().filter(|&&a| a).count();
        debug!(
            model = %name,
            layers = imask.dim().0,
            active_cells = active,
            "loaded model from its permeability field"
        );

        let mut props = BTreeMap::new();
        props.insert("permh".to_string(), permh);
        Ok(Self {
            mldir,
            name,
            geometry,
            imask,
            props,
        })
    }

    /// Builds a model directly from an in-memory permeability field.
    pub(crate) fn from_permh(
        mldir: impl Into<PathBuf>,
        name: impl Into<String>,
        permh: MartheField,
    ) -> Self {
        let permh = permh.renamed("permh");
        let imask = permh.active_mask();
        let geometry = permh.geometry().clone();
        let mut props = BTreeMap::new();
        props.insert("permh".to_string(), permh);
        Self {
            mldir: mldir.into(),
            name: name.into(),
            geometry,
            imask,
            props,
        }
    }

    /// Reads the grid file of `prop` and registers the field on the model,
    /// replacing any previously loaded version.
    ///
    /// # Errors
    ///
    /// Fails when the grid file cannot be read or does not match the
    /// model's layer count and geometry.
    pub fn load_prop(&mut self, prop: &str) -> Result<&MartheField, ModelError> {
        if !keywords::is_known(prop) {
            debug!(prop, "property is not a recognized MARTHE keyword");
        }
        let path = self.grid_path(prop);
        let (field, _) =
            GridFile::read_from_path(&path).map_err(|source| ModelError::GridRead {
                path,
                source,
            })?;
        if field.shape().nlay != self.shape().nlay || field.geometry() != &self.geometry {
            return Err(ModelError::GridMismatch {
                prop: prop.to_string(),
            });
        }
        let field = field.renamed(prop);
        match self.props.entry(prop.to_string()) {
            Entry::Occupied(mut occupied) => {
                occupied.insert(field);
                Ok(&*occupied.into_mut())
            }
            Entry::Vacant(vacant) => Ok(&*vacant.insert(field)),
        }
    }

    /// Writes the loaded field of `prop` back to its grid file.
    ///
    /// # Errors
    ///
    /// Fails when the property is not loaded or the file cannot be written.
    pub fn write_prop(&self, prop: &str) -> Result<PathBuf, ModelError> {
        let field = self.prop(prop).ok_or_else(|| ModelError::PropertyNotLoaded {
            name: prop.to_string(),
        })?;
        let path = self.grid_path(prop);
        let metadata = GridMetadata {
            title: format!("{};{}", self.name, prop),
        };
        GridFile::write_to_path(field, &metadata, &path).map_err(|source| {
            ModelError::GridWrite {
                path: path.clone(),
                source,
            }
        })?;
        Ok(path)
    }

    /// Writes every loaded property back to its grid file.
    pub fn write_props(&self) -> Result<Vec<PathBuf>, ModelError> {
        self.props.keys().map(|prop| self.write_prop(prop)).collect()
    }

    /// Returns the path of the grid file of `prop`.
    pub fn grid_path(&self, prop: &str) -> PathBuf {
        self.mldir.join(format!("{}.{}", self.name, prop))
    }

    /// Returns the path of the `.rma` file the model was anchored at.
    pub fn rma_path(&self) -> PathBuf {
        self.mldir.join(format!("{}.rma", self.name))
    }

    /// Returns the path of the simulated-history file.
    pub fn prn_path(&self) -> PathBuf {
        self.mldir.join("historiq.prn")
    }

    /// Returns the model working directory.
    pub fn dir(&self) -> &Path {
        &self.mldir
    }

    /// Returns the model name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the grid shape shared by all property fields.
    pub fn shape(&self) -> GridShape {
        let (nlay, nrow, ncol) = self.imask.dim();
        GridShape { nlay, nrow, ncol }
    }

    /// Returns the grid geometry shared by all property fields.
    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    /// Returns the active-cell mask derived from the permeability field.
    pub fn imask(&self) -> &Array3<bool> {
        &self.imask
    }

    /// Returns the loaded field of `prop`, if any.
    pub fn prop(&self, name: &str) -> Option<&MartheField> {
        self.props.get(name)
    }

    /// Returns a mutable reference to the loaded field of `prop`, if any.
    pub fn prop_mut(&mut self, name: &str) -> Option<&mut MartheField> {
        self.props.get_mut(name)
    }

    /// Returns whether `prop` has been loaded.
    pub fn has_prop(&self, name: &str) -> bool {
        self.props.contains_key(name)
    }

    /// Returns the names of the loaded properties, sorted.
    pub fn loaded_props(&self) -> impl Iterator<Item = &str> {
        self.props.keys().map(String::as_str)
    }
}
