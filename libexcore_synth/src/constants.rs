// HDF5 layout names shared by the MPACT (primary) and Shift (tally) files
pub const CORE_NAME: &str = "CORE";
pub const STATE_PREFIX: &str = "STATE_";
pub const VESSEL_TALLY_NAME: &str = "vessel_tally";
pub const EXPOSURE_NAME: &str = "exposure_efpd";

// Datasets of a vessel tally group
pub const TOTAL_NAME: &str = "total";
pub const BINNED_NAME: &str = "binned";
pub const MESH_R_NAME: &str = "mesh_r";
pub const FLUENCE_NAME: &str = "fluence";
pub const FLUENCE_REL_ERROR_NAME: &str = "fluence_rel_error";
pub const BINNED_FLUENCE_NAME: &str = "binned_fluence";
pub const BINNED_FLUENCE_REL_ERROR_NAME: &str = "binned_fluence_rel_error";

/// Tally metadata which is static over a run. These are copied once into
/// `CORE/vessel_tally` and are never passed through into the state groups.
pub const TALLY_METADATA_NAMES: [&str; 8] = [
    "description",
    "mesh_r",
    "mesh_stat",
    "mesh_theta",
    "mesh_z",
    "multiplier_descs",
    "multiplier_names",
    "volumes",
];

/// Vessel geometry found in the tally file `CORE` group
pub const VESSEL_GEOMETRY_NAMES: [&str; 13] = [
    "baffle_gap_inner",
    "baffle_inner_radius",
    "baffle_outer_radius",
    "barrel_inner_radius",
    "barrel_outer_radius",
    "liner_inner_radius",
    "liner_outer_radius",
    "pad_angles",
    "pad_arc",
    "pad_inner_radius",
    "pad_outer_radius",
    "vessel_inner_radius",
    "vessel_outer_radius",
];

pub const SECONDS_PER_DAY: f64 = 86400.0;

// Water gap reference radii (cm)
pub const DEFAULT_BARREL_OUTER_CM: f64 = 193.68;
pub const DEFAULT_LINER_INNER_CM: f64 = 219.15;

/// Axis of a single-group tally snapshot which runs over the radial mesh
pub const RADIUS_AXIS: usize = 2;

/// First state of every simulation file. States are numbered from 1
pub const FIRST_STATE: usize = 1;

pub const OUTPUT_EXTENSION: &str = "h5";

/// This is the version of the output format
pub const FORMAT_VERSION: &str = "1.0";
