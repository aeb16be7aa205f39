use hdf5::Group;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

use super::accumulator::FluenceAccumulator;
use super::config::Config;
use super::constants::{
    BINNED_NAME, CORE_NAME, EXPOSURE_NAME, FIRST_STATE, MESH_R_NAME, TOTAL_NAME,
    VESSEL_TALLY_NAME,
};
use super::error::ProcessorError;
use super::hdf_writer::{copy_datasets, HDFWriter};
use super::radial_range::resolve;
use super::reader::{has_dataset, read_array, read_scalar, read_vec, state_name, RecordReader};
use super::walker::{StateStep, StateWalker};
use super::worker_status::{SynthesisStage, WorkerStatus};

/// What a completed synthesis produced
#[derive(Debug, Clone)]
pub struct SynthesisSummary {
    pub output_path: PathBuf,
    pub n_states: usize,
    /// States which reused an earlier tally
    pub n_stale_states: usize,
    pub n_groups: usize,
    pub file_size_bytes: u64,
}

/// Everything which must be present before any output is written
struct Preflight {
    primary_core: Group,
    tally_core: Option<Group>,
    tally_meta: Group,
    mesh_r: Vec<f64>,
}

fn require_group(reader: &RecordReader, path: &str) -> Result<Group, ProcessorError> {
    reader
        .group(path)?
        .ok_or_else(|| ProcessorError::MissingGroup {
            file: reader.path().to_path_buf(),
            path: path.to_string(),
        })
}

fn missing_dataset(file: &Path, group_path: &str, name: &str) -> ProcessorError {
    ProcessorError::MissingDataset {
        file: file.to_path_buf(),
        path: format!("{group_path}/{name}"),
    }
}

/// Check the structure of both files before the output file is created, so that a
/// malformed input never leaves a partial output behind
fn preflight(primary: &RecordReader, tally: &RecordReader) -> Result<Preflight, ProcessorError> {
    let primary_core = require_group(primary, CORE_NAME)?;
    let first_state_name = state_name(FIRST_STATE);
    let first_state = require_group(primary, &first_state_name)?;
    // Same rule as the walker: an empty exposure counts as missing
    if read_scalar(&first_state, EXPOSURE_NAME)?.is_none() {
        return Err(missing_dataset(
            primary.path(),
            &first_state_name,
            EXPOSURE_NAME,
        ));
    }

    let tally_meta_path = format!("{first_state_name}/{VESSEL_TALLY_NAME}");
    let tally_meta = require_group(tally, &tally_meta_path)?;
    if !has_dataset(&tally_meta, TOTAL_NAME) {
        return Err(missing_dataset(tally.path(), &tally_meta_path, TOTAL_NAME));
    }
    let mesh_r = read_vec(&tally_meta, MESH_R_NAME)?
        .ok_or_else(|| missing_dataset(tally.path(), &tally_meta_path, MESH_R_NAME))?;

    Ok(Preflight {
        primary_core,
        tally_core: tally.group(CORE_NAME)?,
        tally_meta,
        mesh_r,
    })
}

/// Accumulate the tallies of one state and write them to the state's vessel_tally group.
///
/// Returns the number of binned groups in the state's tally.
fn accumulate_state(
    step: &StateStep,
    tally_path: &Path,
    accumulator: &mut FluenceAccumulator,
    writer: &HDFWriter,
    vessel_group: &Group,
) -> Result<usize, ProcessorError> {
    let total = read_array(&step.tally_group, TOTAL_NAME)?
        .ok_or_else(|| missing_dataset(tally_path, &step.tally_group.name(), TOTAL_NAME))?;
    let total = accumulator.accumulate_total(total, step.dt)?;

    let binned = match read_array(&step.tally_group, BINNED_NAME)? {
        Some(binned) => accumulator.accumulate_binned(binned, step.dt)?,
        None => vec![],
    };

    writer.write_tally_outputs(vessel_group, &step.tally_group, &total, &binned)?;
    Ok(binned.len())
}

/// The main loop of excore_synth.
///
/// Merges the primary (MPACT) file and the tally (Shift) file named in the config into a
/// new output file, integrating the vessel tallies into fluence state by state. Progress
/// is reported through `tx`. If an error occurs, the partially written output is left on disk.
pub fn process(
    config: &Config,
    tx: &Sender<WorkerStatus>,
) -> Result<SynthesisSummary, ProcessorError> {
    let primary = RecordReader::open(&config.mpact_path)?;
    let tally = RecordReader::open(&config.shift_path)?;
    spdlog::info!("Primary file: {}", primary.path().to_string_lossy());
    spdlog::info!("Tally file: {}", tally.path().to_string_lossy());

    let checked = preflight(&primary, &tally)?;
    let exclusion = resolve(
        &checked.mesh_r,
        config.water_gap.barrel_outer_cm,
        config.water_gap.liner_inner_cm,
    )?;
    spdlog::info!(
        "Water gap excludes radial indices [{}, {})",
        exclusion.start,
        exclusion.end
    );

    let n_states = primary.count_states()?;
    spdlog::info!("Found {} states", n_states);

    let output_path = config.get_output_file_name();
    let mut writer = HDFWriter::new(&output_path, primary.path(), tally.path())?;
    tx.send(WorkerStatus::new(0, n_states, SynthesisStage::Prologue))?;
    writer.write_prologue(
        &checked.primary_core,
        checked.tally_core.as_ref(),
        &checked.tally_meta,
    )?;

    let mut accumulator = FluenceAccumulator::new(exclusion);
    let mut walker = StateWalker::new(&primary, &tally);
    let mut n_visited = 0;
    let mut n_stale_states = 0;
    let mut n_groups = 0;
    while let Some(pending) = walker.next_state()? {
        let (state_group, vessel_group) = writer.create_state(&pending.name)?;
        copy_datasets(&pending.group, &state_group)?;

        let step = walker.resolve(pending)?;
        spdlog::info!(
            "Processing {} -- exposure: {} s, dt: {} s",
            step.name,
            step.exposure_seconds,
            step.dt
        );
        if step.tally_is_stale {
            n_stale_states += 1;
        }
        n_groups = accumulate_state(
            &step,
            tally.path(),
            &mut accumulator,
            &writer,
            &vessel_group,
        )?;

        n_visited += 1;
        tx.send(WorkerStatus::new(
            step.index,
            n_states,
            SynthesisStage::States,
        ))?;
    }

    let file_size_bytes = writer.close()?;
    tx.send(WorkerStatus::new(
        n_visited,
        n_states,
        SynthesisStage::Finished,
    ))?;

    Ok(SynthesisSummary {
        output_path,
        n_states: n_visited,
        n_stale_states,
        n_groups,
        file_size_bytes,
    })
}
