use std::path::PathBuf;
use thiserror::Error;

use super::worker_status::WorkerStatus;

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("Could not open simulation file because file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("RecordReader failed due to HDF5 error: {0}")]
    HDF5Error(#[from] hdf5::Error),
}

#[derive(Debug, Clone, Error)]
pub enum RadialRangeError {
    #[error("Cannot resolve the water gap range of an empty radial mesh")]
    EmptyMesh,
}

#[derive(Debug, Error)]
pub enum AccumulatorError {
    #[error("Tally snapshot has rank {0}; the radial axis requires a rank of at least {min}", min=super::constants::RADIUS_AXIS + 1)]
    TallyRank(usize),
    #[error("Binned tally has rank {0}; expected a leading group axis")]
    BinnedRank(usize),
    #[error("Tally snapshot shape {0:?} does not match the running total shape {1:?}")]
    ShapeMismatch(Vec<usize>, Vec<usize>),
}

#[derive(Debug, Error)]
pub enum HDF5WriterError {
    #[error("HDF5Writer failed due to HDF5 error: {0}")]
    HDF5Error(#[from] hdf5::Error),
    #[error("HDF5Writer failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("HDF5Writer failed to reshape converted data: {0}")]
    ShapeError(#[from] ndarray::ShapeError),
    #[error("HDF5Writer failed to encode string: {0}")]
    StringError(#[from] hdf5::types::StringError),
    #[error("HDF5Writer failed to format the creation time: {0}")]
    TimeError(#[from] time::error::Format),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Config failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
}

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Required group {path} is missing from {file:?}")]
    MissingGroup { file: PathBuf, path: String },
    #[error("Required dataset {path} is missing from {file:?}")]
    MissingDataset { file: PathBuf, path: String },
    #[error("Processor failed due to RecordReader error: {0}")]
    ReaderError(#[from] ReaderError),
    #[error("Processor failed due to radial range error: {0}")]
    RangeError(#[from] RadialRangeError),
    #[error("Processor failed due to FluenceAccumulator error: {0}")]
    AccumulatorError(#[from] AccumulatorError),
    #[error("Processor failed due to HDF5Writer error: {0}")]
    HDFError(#[from] HDF5WriterError),
    #[error("Processor failed due to Config error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Processor failed due to Send error: {0}")]
    SendError(#[from] std::sync::mpsc::SendError<WorkerStatus>),
}
