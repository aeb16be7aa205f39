use ndarray::{ArrayD, Axis, Slice};

use super::constants::RADIUS_AXIS;
use super::error::{AccumulatorError, RadialRangeError};

/// Half-open index range `[start, end)` along the radial axis of a tally snapshot
/// which lies inside the water gap. Cells in this range are zeroed before they are
/// integrated into the fluence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RadiusExclusion {
    pub start: usize,
    pub end: usize,
}

/// Index after the last boundary which is <= reference (0 if none are)
fn insertion_point(radius_boundaries: &[f64], reference_cm: f64) -> usize {
    radius_boundaries.partition_point(|r| *r <= reference_cm)
}

/// Resolve the water gap range from a non-decreasing radial mesh and the two reference radii.
///
/// The start bound is clamped to `[0, len - 1]` and the end bound to `[0, len]`, so the
/// range may be empty or run to the end of the mesh. Inverted references give an
/// empty range at the start bound.
pub fn resolve(
    radius_boundaries: &[f64],
    inner_ref_cm: f64,
    outer_ref_cm: f64,
) -> Result<RadiusExclusion, RadialRangeError> {
    let len = radius_boundaries.len();
    if len == 0 {
        return Err(RadialRangeError::EmptyMesh);
    }
    let start = insertion_point(radius_boundaries, inner_ref_cm).min(len - 1);
    let end = insertion_point(radius_boundaries, outer_ref_cm)
        .min(len)
        .max(start);
    Ok(RadiusExclusion { start, end })
}

impl RadiusExclusion {
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Zero every element whose radial index is in the excluded range.
    ///
    /// The shape is preserved. The end bound is clipped to the radial axis length since
    /// the mesh holds boundaries (one more than the number of radial cells).
    pub fn mask(&self, snapshot: &mut ArrayD<f64>) -> Result<(), AccumulatorError> {
        if snapshot.ndim() <= RADIUS_AXIS {
            return Err(AccumulatorError::TallyRank(snapshot.ndim()));
        }
        let n_radial = snapshot.len_of(Axis(RADIUS_AXIS));
        let end = self.end.min(n_radial);
        let start = self.start.min(end);
        snapshot
            .slice_axis_mut(Axis(RADIUS_AXIS), Slice::from(start..end))
            .map_inplace(|value| *value = 0.0);
        Ok(())
    }
}
