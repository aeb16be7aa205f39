use hdf5::{File, Group};
use ndarray::ArrayD;
use std::path::{Path, PathBuf};

use super::constants::{FIRST_STATE, STATE_PREFIX};
use super::error::ReaderError;

/// Construct the name of a state group (STATE_0001, STATE_0002, ...)
pub fn state_name(index: usize) -> String {
    format!("{STATE_PREFIX}{index:0>4}")
}

/// Last component of an HDF5 object path (/CORE/mesh_r -> mesh_r)
pub fn link_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Read-only view of a simulation file (MPACT or Shift).
///
/// Missing groups and datasets are reported as `None`, never as errors. The caller
/// decides whether an absent key is fatal. Only an unreadable file (or a dataset
/// which cannot be read as floating point data) results in an error.
#[derive(Debug)]
pub struct RecordReader {
    file_handle: File,
    path: PathBuf,
}

impl RecordReader {
    /// Open a simulation file read-only
    pub fn open(path: &Path) -> Result<Self, ReaderError> {
        if !path.exists() {
            return Err(ReaderError::BadFilePath(path.to_path_buf()));
        }
        Ok(Self {
            file_handle: File::open(path)?,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Locate a group by a slash-delimited path (i.e. STATE_0001/vessel_tally).
    ///
    /// Each segment is checked in turn, so a missing intermediate group is also
    /// reported as None.
    pub fn group(&self, path: &str) -> Result<Option<Group>, ReaderError> {
        let mut current: Group = self.file_handle.group("/")?;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            if !current.link_exists(segment) {
                return Ok(None);
            }
            current = match current.group(segment) {
                Ok(group) => group,
                Err(_) => return Ok(None), // Exists, but it is a dataset
            };
        }
        Ok(Some(current))
    }

    /// Count the contiguous states present in the file, starting from STATE_0001
    pub fn count_states(&self) -> Result<usize, ReaderError> {
        let mut count = 0;
        while self.group(&state_name(FIRST_STATE + count))?.is_some() {
            count += 1;
        }
        Ok(count)
    }
}

/// Check whether a group has a dataset with the given name
pub fn has_dataset(group: &Group, name: &str) -> bool {
    group.link_exists(name) && group.dataset(name).is_ok()
}

/// Read a dataset as a scalar. Rank-0 datasets give their value, otherwise the first
/// element is taken. Empty datasets are treated as absent.
pub fn read_scalar(group: &Group, name: &str) -> Result<Option<f64>, ReaderError> {
    Ok(read_array(group, name)?.and_then(|data| data.iter().next().copied()))
}

/// Read a dataset of any rank as an f64 array
pub fn read_array(group: &Group, name: &str) -> Result<Option<ArrayD<f64>>, ReaderError> {
    if !has_dataset(group, name) {
        return Ok(None);
    }
    Ok(Some(group.dataset(name)?.read_dyn::<f64>()?))
}

/// Read a dataset as a flat vector (i.e. a mesh of boundaries)
pub fn read_vec(group: &Group, name: &str) -> Result<Option<Vec<f64>>, ReaderError> {
    if !has_dataset(group, name) {
        return Ok(None);
    }
    Ok(Some(group.dataset(name)?.read_raw::<f64>()?))
}
