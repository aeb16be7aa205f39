//! # excore_synth
//!
//! excore_synth builds the ex-core data product for reactor vessel analysis, written in
//! Rust. It takes the output of a core simulation (MPACT/VERA, the "primary" file) and
//! the vessel tallies of a Monte-Carlo shielding calculation (Shift, the "tally" file),
//! and combines them into a single HDF5 file. Along the way the vessel tallies are
//! integrated over the depletion states to give the accumulated fluence, with a
//! relative error estimate.
//!
//! ## Installation
//!
//! Currently the only method of install is from source.
//!
//! ### HDF5
//!
//! Before building and running excore_synth, HDF5 must be installed. Typically this will
//! be installed using a package manager (homebrew, apt, etc), and the Rust libraries will
//! auto detect the location of the HDF install. If a custom install is needed, write the
//! following snippet into the file `.cargo/config.toml` in the excore_synth repository:
//!
//! ```toml
//! [env]
//! HDF5_DIR="/path/to/my/hdf5/install/"
//!
//! [build]
//! rustflags="-C link-args=-Wl,-rpath,/path/to/my/hdf5/install/lib"
//! ```
//!
//! ### Building & Install
//!
//! To build and install the CLI use `cargo install --path ./excore_synth_cli` from the
//! top level excore_synth repository.
//!
//! ## Configuration
//!
//! A run is described by a [`config::Config`]. The YAML format of a configuration file
//! is as follows:
//!
//! ```yml
//! mpact_path: /path/to/mpact.h5
//! shift_path: /path/to/shift.h5
//! output_path: /path/to/output.h5
//! water_gap:
//!   barrel_outer_cm: 193.68
//!   liner_inner_cm: 219.15
//! ```
//!
//! The `water_gap` section is optional. The radii bound the water between the core
//! barrel and the vessel liner; tally cells in this region are not integrated.
//!
//! ## Fluence
//!
//! For each state `k` the elapsed time is `dt = (efpd_k - efpd_{k-1}) * 86400` seconds.
//! For the first state only, a zero `dt` (cold startup) is replaced with one second.
//! With the water gap zeroed in the tally `t`:
//!
//! ```text
//! fluence_k  = fluence_{k-1}  + t * dt
//! variance_k = variance_{k-1} + (t * dt) * dt * t
//! rel_error_k = sqrt(variance_k) / (t * dt)      (0 where t * dt == 0)
//! ```
//!
//! States without a tally in the tally file reuse the most recent tally.
//!
//! ## Output
//!
//! ```text
//! output.h5 - version, created, primary_file, tally_file, n_states
//! CORE
//! |---- <primary CORE datasets>
//! |---- vessel_tally
//! |    |---- description, mesh_r, mesh_stat, mesh_theta, mesh_z, multiplier_descs,
//! |    |     multiplier_names, volumes
//! |    |---- baffle, barrel, liner, pad, and vessel geometry
//! STATE_####
//! |---- <primary STATE datasets>
//! |---- vessel_tally
//! |    |---- total, fluence, fluence_rel_error
//! |    |---- binned[_##], binned_fluence[_##], binned_fluence_rel_error[_##]
//! |    |---- <other tally datasets>
//! ```
//!
//! Binned outputs carry a two digit group suffix only when the tally has more than one group.
pub mod accumulator;
pub mod config;
pub mod constants;
pub mod error;
pub mod hdf_writer;
pub mod process;
pub mod radial_range;
pub mod reader;
pub mod walker;
pub mod worker_status;
