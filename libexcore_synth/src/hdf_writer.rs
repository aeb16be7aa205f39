use hdf5::types::{FixedAscii, FixedUnicode, FloatSize, IntSize, TypeDescriptor};
use hdf5::types::{VarLenAscii, VarLenUnicode};
use hdf5::{Dataset, File, Group, H5Type};
use ndarray::ArrayD;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use super::accumulator::{FluenceIncrement, TallyNames};
use super::constants::{
    BINNED_NAME, CORE_NAME, FORMAT_VERSION, TALLY_METADATA_NAMES, TOTAL_NAME,
    VESSEL_GEOMETRY_NAMES, VESSEL_TALLY_NAME,
};
use super::error::HDF5WriterError;
use super::reader::link_name;

// Fixed length strings are read through a buffer of this size. Longer strings are skipped.
const FIXED_STRING_CAPACITY: usize = 1024;

/// Read a dataset as `T` and write it under `name` with the same shape
fn copy_typed<T: H5Type>(src: &Dataset, dst: &Group, name: &str) -> Result<(), HDF5WriterError> {
    let data = src.read_dyn::<T>()?;
    dst.new_dataset_builder().with_data(&data).create(name)?;
    Ok(())
}

/// Fixed length ascii strings are written back as variable length strings
fn copy_fixed_ascii(src: &Dataset, dst: &Group, name: &str) -> Result<(), HDF5WriterError> {
    let data = src.read_dyn::<FixedAscii<FIXED_STRING_CAPACITY>>()?;
    let strings = data
        .iter()
        .map(|s| VarLenAscii::from_ascii(s.as_str().trim_end_matches('\0')))
        .collect::<Result<Vec<_>, _>>()?;
    let converted = ArrayD::from_shape_vec(data.raw_dim(), strings)?;
    dst.new_dataset_builder().with_data(&converted).create(name)?;
    Ok(())
}

fn copy_fixed_unicode(src: &Dataset, dst: &Group, name: &str) -> Result<(), HDF5WriterError> {
    let data = src.read_dyn::<FixedUnicode<FIXED_STRING_CAPACITY>>()?;
    let strings = data
        .iter()
        .map(|s| VarLenUnicode::from_str(s.as_str().trim_end_matches('\0')))
        .collect::<Result<Vec<_>, _>>()?;
    let converted = ArrayD::from_shape_vec(data.raw_dim(), strings)?;
    dst.new_dataset_builder().with_data(&converted).create(name)?;
    Ok(())
}

/// Copy a single dataset into `dst`, keeping its element type where possible.
///
/// Returns false (and copies nothing) for element types the merger does not handle,
/// such as compound or reference data.
pub fn copy_dataset(src: &Dataset, dst: &Group, name: &str) -> Result<bool, HDF5WriterError> {
    let descriptor = src.dtype()?.to_descriptor()?;
    match descriptor {
        TypeDescriptor::Integer(IntSize::U1) => copy_typed::<i8>(src, dst, name)?,
        TypeDescriptor::Integer(IntSize::U2) => copy_typed::<i16>(src, dst, name)?,
        TypeDescriptor::Integer(IntSize::U4) => copy_typed::<i32>(src, dst, name)?,
        TypeDescriptor::Integer(IntSize::U8) => copy_typed::<i64>(src, dst, name)?,
        TypeDescriptor::Unsigned(IntSize::U1) => copy_typed::<u8>(src, dst, name)?,
        TypeDescriptor::Unsigned(IntSize::U2) => copy_typed::<u16>(src, dst, name)?,
        TypeDescriptor::Unsigned(IntSize::U4) => copy_typed::<u32>(src, dst, name)?,
        TypeDescriptor::Unsigned(IntSize::U8) => copy_typed::<u64>(src, dst, name)?,
        TypeDescriptor::Float(FloatSize::U4) => copy_typed::<f32>(src, dst, name)?,
        TypeDescriptor::Float(_) => copy_typed::<f64>(src, dst, name)?,
        TypeDescriptor::Boolean => copy_typed::<bool>(src, dst, name)?,
        TypeDescriptor::VarLenAscii => copy_typed::<VarLenAscii>(src, dst, name)?,
        TypeDescriptor::VarLenUnicode => copy_typed::<VarLenUnicode>(src, dst, name)?,
        TypeDescriptor::FixedAscii(size) if size <= FIXED_STRING_CAPACITY => {
            copy_fixed_ascii(src, dst, name)?
        }
        TypeDescriptor::FixedUnicode(size) if size <= FIXED_STRING_CAPACITY => {
            copy_fixed_unicode(src, dst, name)?
        }
        other => {
            spdlog::warn!(
                "Dataset {} has unsupported type {:?} and was not copied",
                src.name(),
                other
            );
            return Ok(false);
        }
    }
    Ok(true)
}

/// Copy every dataset of `src` into `dst`. Subgroups are not copied.
///
/// Returns the names of the copied datasets.
pub fn copy_datasets(src: &Group, dst: &Group) -> Result<Vec<String>, HDF5WriterError> {
    copy_datasets_except(src, dst, &[])
}

/// Copy every dataset of `src` into `dst` except those named in `excluded`
pub fn copy_datasets_except(
    src: &Group,
    dst: &Group,
    excluded: &[&str],
) -> Result<Vec<String>, HDF5WriterError> {
    let mut copied = Vec::new();
    for dataset in src.datasets()? {
        let full_name = dataset.name();
        let name = link_name(&full_name);
        if excluded.contains(&name) {
            continue;
        }
        if copy_dataset(&dataset, dst, name)? {
            copied.push(name.to_string());
        }
    }
    Ok(copied)
}

/// Copy the datasets of `src` named in `names`. Names which are not present are skipped.
pub fn copy_named_datasets(
    src: &Group,
    dst: &Group,
    names: &[&str],
) -> Result<Vec<String>, HDF5WriterError> {
    let mut copied = Vec::new();
    for name in names {
        if !src.link_exists(name) {
            continue;
        }
        if let Ok(dataset) = src.dataset(name) {
            if copy_dataset(&dataset, dst, name)? {
                copied.push(name.to_string());
            }
        }
    }
    Ok(copied)
}

fn write_array(group: &Group, name: &str, data: &ArrayD<f64>) -> Result<(), HDF5WriterError> {
    group.new_dataset_builder().with_data(data).create(name)?;
    Ok(())
}

fn write_string_attr(group: &Group, name: &str, value: &str) -> Result<(), HDF5WriterError> {
    group
        .new_attr::<VarLenUnicode>()
        .create(name)?
        .write_scalar(&VarLenUnicode::from_str(value)?)?;
    Ok(())
}

/// A simple struct which wraps around the hdf5-rust library.
///
/// Creates the merged file and writes the core prologue and the states. The file is
/// created exclusively; an existing file at the path is an error, never overwritten.
#[derive(Debug)]
pub struct HDFWriter {
    file_handle: File,
    path: PathBuf,
    primary_path: PathBuf,
    tally_path: PathBuf,
    states_written: usize,
}
// Structure
// / - version, created, primary_file, tally_file, n_states
// CORE
// |---- <primary CORE datasets>
// |---- vessel_tally
// |    |---- <tally metadata> (description, mesh_r, ...)
// |    |---- <vessel geometry> (barrel_outer_radius, ...)
// STATE_####
// |---- <primary STATE datasets>
// |---- vessel_tally
// |    |---- total, fluence, fluence_rel_error
// |    |---- binned[_##], binned_fluence[_##], binned_fluence_rel_error[_##]
// |    |---- <passthrough tally datasets>

impl HDFWriter {
    /// Create the writer, creating a new file at path
    pub fn new(path: &Path, primary_path: &Path, tally_path: &Path) -> Result<Self, HDF5WriterError> {
        let file_handle = File::create_excl(path)?;
        Ok(Self {
            file_handle,
            path: path.to_path_buf(),
            primary_path: primary_path.to_path_buf(),
            tally_path: tally_path.to_path_buf(),
            states_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the static CORE data: the primary CORE group, followed by the tally metadata
    /// and the vessel geometry in CORE/vessel_tally
    pub fn write_prologue(
        &self,
        primary_core: &Group,
        tally_core: Option<&Group>,
        tally_meta: &Group,
    ) -> Result<(), HDF5WriterError> {
        let core_group = self.file_handle.create_group(CORE_NAME)?;
        let copied = copy_datasets(primary_core, &core_group)?;
        spdlog::info!("Copied {} primary CORE datasets", copied.len());

        let vessel_group = core_group.create_group(VESSEL_TALLY_NAME)?;
        let copied = copy_named_datasets(tally_meta, &vessel_group, &TALLY_METADATA_NAMES)?;
        spdlog::info!("Copied tally metadata: {}", copied.join(", "));

        match tally_core {
            Some(tally_core) => {
                let copied =
                    copy_named_datasets(tally_core, &vessel_group, &VESSEL_GEOMETRY_NAMES)?;
                spdlog::info!("Copied vessel geometry: {}", copied.join(", "));
            }
            None => spdlog::warn!("Tally file has no CORE group; vessel geometry is not copied"),
        }
        Ok(())
    }

    /// Create a state group and its vessel tally subgroup
    pub fn create_state(&mut self, name: &str) -> Result<(Group, Group), HDF5WriterError> {
        let state_group = self.file_handle.create_group(name)?;
        let vessel_group = state_group.create_group(VESSEL_TALLY_NAME)?;
        self.states_written += 1;
        Ok((state_group, vessel_group))
    }

    /// Write the accumulated outputs of one state, followed by the passthrough tally data
    pub fn write_tally_outputs(
        &self,
        vessel_group: &Group,
        tally_group: &Group,
        total: &FluenceIncrement,
        binned: &[FluenceIncrement],
    ) -> Result<(), HDF5WriterError> {
        write_increment(vessel_group, &TallyNames::total(), total)?;
        for (group, increment) in binned.iter().enumerate() {
            write_increment(vessel_group, &TallyNames::binned(binned.len(), group), increment)?;
        }

        let mut excluded = vec![TOTAL_NAME, BINNED_NAME];
        excluded.extend_from_slice(&TALLY_METADATA_NAMES);
        copy_datasets_except(tally_group, vessel_group, &excluded)?;
        Ok(())
    }

    /// Write the summary attributes, consume the writer and close the file.
    ///
    /// Returns the size of the written file in bytes.
    pub fn close(self) -> Result<u64, HDF5WriterError> {
        let version = format!("{}:{}", env!("CARGO_PKG_NAME"), FORMAT_VERSION);
        let created = OffsetDateTime::now_utc().format(&Rfc3339)?;
        let root = self.file_handle.group("/")?;
        write_string_attr(&root, "version", &version)?;
        write_string_attr(&root, "created", &created)?;
        write_string_attr(&root, "primary_file", &self.primary_path.to_string_lossy())?;
        write_string_attr(&root, "tally_file", &self.tally_path.to_string_lossy())?;
        root.new_attr::<u64>()
            .create("n_states")?
            .write_scalar(&(self.states_written as u64))?;
        drop(root);

        self.file_handle.flush()?;
        drop(self.file_handle);
        let size = std::fs::metadata(&self.path)?.len();
        spdlog::info!(
            "{} states written to {}. File size: {}",
            self.states_written,
            self.path.to_string_lossy(),
            human_bytes::human_bytes(size as f64)
        );
        Ok(size)
    }
}

fn write_increment(
    group: &Group,
    names: &TallyNames,
    increment: &FluenceIncrement,
) -> Result<(), HDF5WriterError> {
    write_array(group, &names.raw, &increment.raw)?;
    write_array(group, &names.fluence, &increment.fluence)?;
    write_array(group, &names.rel_error, &increment.rel_error)?;
    Ok(())
}
