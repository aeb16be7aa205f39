use hdf5::Group;

use super::constants::{EXPOSURE_NAME, FIRST_STATE, SECONDS_PER_DAY, VESSEL_TALLY_NAME};
use super::error::ProcessorError;
use super::reader::{read_scalar, state_name, RecordReader};

/// Elapsed time (s) integrated for state `index`.
///
/// The first state usually sits at zero exposure (cold startup). A zero-length window
/// there is replaced by one second; later states are not adjusted.
pub fn time_step(index: usize, exposure_seconds: f64, prev_exposure_seconds: f64) -> f64 {
    let dt = exposure_seconds - prev_exposure_seconds;
    if index == FIRST_STATE && dt == 0.0 {
        1.0
    } else {
        dt
    }
}

pub fn efpd_to_seconds(efpd: f64) -> f64 {
    efpd * SECONDS_PER_DAY
}

/// A primary state which exists but has not been resolved yet
#[derive(Debug)]
pub struct PendingState {
    pub index: usize,
    pub name: String,
    pub group: Group,
}

/// A fully resolved state, ready for accumulation
#[derive(Debug)]
pub struct StateStep {
    pub index: usize,
    pub name: String,
    pub exposure_seconds: f64,
    pub dt: f64,
    pub tally_group: Group,
    /// True if the tally file had no tally for this state and the previous one was reused
    pub tally_is_stale: bool,
}

/// StateWalker visits the states of the primary file in order, pairing each with a tally.
///
/// Walking stops at the first missing STATE_<k>. A state without its own tally in the
/// tally file reuses the last tally found.
#[derive(Debug)]
pub struct StateWalker<'a> {
    primary: &'a RecordReader,
    tally: &'a RecordReader,
    next_index: usize,
    prev_exposure_seconds: f64,
    prev_tally_group: Option<Group>,
}

impl<'a> StateWalker<'a> {
    pub fn new(primary: &'a RecordReader, tally: &'a RecordReader) -> Self {
        Self {
            primary,
            tally,
            next_index: FIRST_STATE,
            prev_exposure_seconds: 0.0,
            prev_tally_group: None,
        }
    }

    /// Move to the next state. Returns None once the states are exhausted.
    pub fn next_state(&mut self) -> Result<Option<PendingState>, ProcessorError> {
        let index = self.next_index;
        let name = state_name(index);
        match self.primary.group(&name)? {
            Some(group) => {
                self.next_index += 1;
                Ok(Some(PendingState { index, name, group }))
            }
            None => Ok(None),
        }
    }

    /// Resolve the exposure, time step, and tally of a pending state
    pub fn resolve(&mut self, pending: PendingState) -> Result<StateStep, ProcessorError> {
        let efpd = read_scalar(&pending.group, EXPOSURE_NAME)?.ok_or_else(|| {
            ProcessorError::MissingDataset {
                file: self.primary.path().to_path_buf(),
                path: format!("{}/{EXPOSURE_NAME}", pending.name),
            }
        })?;
        let exposure_seconds = efpd_to_seconds(efpd);

        let tally_path = format!("{}/{VESSEL_TALLY_NAME}", pending.name);
        let (tally_group, tally_is_stale) = match self.tally.group(&tally_path)? {
            Some(group) => (group, false),
            None => match self.prev_tally_group.clone() {
                Some(group) => {
                    spdlog::warn!(
                        "No tally found for {}; carrying forward the previous tally",
                        pending.name
                    );
                    (group, true)
                }
                None => {
                    return Err(ProcessorError::MissingGroup {
                        file: self.tally.path().to_path_buf(),
                        path: tally_path,
                    })
                }
            },
        };

        let dt = time_step(pending.index, exposure_seconds, self.prev_exposure_seconds);

        self.prev_exposure_seconds = exposure_seconds;
        self.prev_tally_group = Some(tally_group.clone());

        Ok(StateStep {
            index: pending.index,
            name: pending.name,
            exposure_seconds,
            dt,
            tally_group,
            tally_is_stale,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdf5::File;
    use ndarray::arr0;
    use std::path::Path;

    #[test]
    fn test_time_step() {
        // Cold startup: zero exposure on the first state integrates one second
        assert_eq!(time_step(1, 0.0, 0.0), 1.0);
        assert_eq!(time_step(1, 86400.0, 0.0), 86400.0);
        // Only the first state is adjusted
        assert_eq!(time_step(2, 864000.0, 864000.0), 0.0);
        assert_eq!(time_step(2, 864000.0, 0.0), 864000.0);
        assert_eq!(efpd_to_seconds(10.0), 864000.0);
    }

    fn write_file(path: &Path, exposures: &[Option<f64>], tallies: &[usize]) {
        let file = File::create(path).unwrap();
        for (idx, exposure) in exposures.iter().enumerate() {
            let state = file.create_group(&state_name(idx + 1)).unwrap();
            if let Some(efpd) = exposure {
                state
                    .new_dataset_builder()
                    .with_data(&arr0(*efpd))
                    .create(EXPOSURE_NAME)
                    .unwrap();
            }
        }
        for index in tallies {
            let name = state_name(*index);
            let state = match file.group(&name) {
                Ok(group) => group,
                Err(_) => file.create_group(&name).unwrap(),
            };
            state.create_group(VESSEL_TALLY_NAME).unwrap();
        }
    }

    #[test]
    fn test_walker_carries_tally_forward() {
        let dir = tempfile::tempdir().unwrap();
        let primary_path = dir.path().join("primary.h5");
        let tally_path = dir.path().join("tally.h5");
        write_file(&primary_path, &[Some(0.0), Some(1.0), Some(3.0)], &[]);
        write_file(&tally_path, &[], &[1]);

        let primary = RecordReader::open(&primary_path).unwrap();
        let tally = RecordReader::open(&tally_path).unwrap();
        let mut walker = StateWalker::new(&primary, &tally);

        let mut steps = vec![];
        while let Some(pending) = walker.next_state().unwrap() {
            steps.push(walker.resolve(pending).unwrap());
        }
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].dt, 1.0);
        assert!(!steps[0].tally_is_stale);
        assert_eq!(steps[1].dt, 86400.0);
        assert!(steps[1].tally_is_stale);
        assert_eq!(steps[2].dt, 2.0 * 86400.0);
        assert!(steps[2].tally_is_stale);
        assert_eq!(steps[2].tally_group.name(), "/STATE_0001/vessel_tally");
        // Done stays done
        assert!(walker.next_state().unwrap().is_none());
    }

    #[test]
    fn test_walker_missing_exposure() {
        let dir = tempfile::tempdir().unwrap();
        let primary_path = dir.path().join("primary.h5");
        let tally_path = dir.path().join("tally.h5");
        write_file(&primary_path, &[Some(0.0), None], &[]);
        write_file(&tally_path, &[], &[1, 2]);

        let primary = RecordReader::open(&primary_path).unwrap();
        let tally = RecordReader::open(&tally_path).unwrap();
        let mut walker = StateWalker::new(&primary, &tally);

        let first = walker.next_state().unwrap().unwrap();
        walker.resolve(first).unwrap();
        let second = walker.next_state().unwrap().unwrap();
        match walker.resolve(second) {
            Err(ProcessorError::MissingDataset { path, .. }) => {
                assert_eq!(path, "STATE_0002/exposure_efpd")
            }
            other => panic!("Expected a missing exposure, got {other:?}"),
        }
    }

    #[test]
    fn test_walker_requires_a_first_tally() {
        let dir = tempfile::tempdir().unwrap();
        let primary_path = dir.path().join("primary.h5");
        let tally_path = dir.path().join("tally.h5");
        write_file(&primary_path, &[Some(0.0), Some(1.0)], &[]);
        write_file(&tally_path, &[], &[2]);

        let primary = RecordReader::open(&primary_path).unwrap();
        let tally = RecordReader::open(&tally_path).unwrap();
        let mut walker = StateWalker::new(&primary, &tally);
        let first = walker.next_state().unwrap().unwrap();
        assert!(matches!(
            walker.resolve(first),
            Err(ProcessorError::MissingGroup { .. })
        ));
    }
}
