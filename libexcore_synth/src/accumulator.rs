use ndarray::{ArrayD, Axis, Zip};

use super::constants::{
    BINNED_FLUENCE_NAME, BINNED_FLUENCE_REL_ERROR_NAME, BINNED_NAME, FLUENCE_NAME,
    FLUENCE_REL_ERROR_NAME, TOTAL_NAME,
};
use super::error::AccumulatorError;
use super::radial_range::RadiusExclusion;

/// Time-integrated fluence and its squared-error proxy for one tally quantity
#[derive(Debug, Clone)]
pub struct RunningTotals {
    pub fluence: ArrayD<f64>,
    pub variance: ArrayD<f64>,
}

/// What one state contributes to the output for one tally quantity
#[derive(Debug, Clone)]
pub struct FluenceIncrement {
    /// The tally as it was read (unmasked)
    pub raw: ArrayD<f64>,
    /// Running fluence, including this state
    pub fluence: ArrayD<f64>,
    pub rel_error: ArrayD<f64>,
}

/// Output dataset names of a single tally quantity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TallyNames {
    pub raw: String,
    pub fluence: String,
    pub rel_error: String,
}

impl TallyNames {
    /// Names of the aggregate tally outputs
    pub fn total() -> Self {
        Self {
            raw: String::from(TOTAL_NAME),
            fluence: String::from(FLUENCE_NAME),
            rel_error: String::from(FLUENCE_REL_ERROR_NAME),
        }
    }

    /// Names of the outputs of binned group `group`. A single group carries no
    /// suffix; otherwise every name is suffixed with the zero-padded group index.
    pub fn binned(n_groups: usize, group: usize) -> Self {
        let suffix = if n_groups == 1 {
            String::new()
        } else {
            format!("_{group:0>2}")
        };
        Self {
            raw: format!("{BINNED_NAME}{suffix}"),
            fluence: format!("{BINNED_FLUENCE_NAME}{suffix}"),
            rel_error: format!("{BINNED_FLUENCE_REL_ERROR_NAME}{suffix}"),
        }
    }
}

/// Relative error of the running fluence with respect to this state's increment.
///
/// Cells where the increment is exactly zero (masked, or not yet active) report 0.0
/// instead of the NaN/Inf the division would give.
pub fn relative_error(variance: &ArrayD<f64>, increment: &ArrayD<f64>) -> ArrayD<f64> {
    let mut rel_error = ArrayD::<f64>::zeros(increment.raw_dim());
    Zip::from(&mut rel_error)
        .and(variance)
        .and(increment)
        .for_each(|err, &var, &inc| {
            *err = if inc == 0.0 { 0.0 } else { var.sqrt() / inc };
        });
    rel_error
}

/// Fold one snapshot into a set of running totals (created on first use)
fn integrate(
    totals: &mut Option<RunningTotals>,
    exclusion: &RadiusExclusion,
    raw: ArrayD<f64>,
    dt: f64,
) -> Result<FluenceIncrement, AccumulatorError> {
    let mut masked = raw.clone();
    exclusion.mask(&mut masked)?;

    let increment = &masked * dt;
    let variance_increment = &increment * dt * &masked;

    if let Some(running) = totals.as_ref() {
        if running.fluence.shape() != increment.shape() {
            return Err(AccumulatorError::ShapeMismatch(
                increment.shape().to_vec(),
                running.fluence.shape().to_vec(),
            ));
        }
    }

    let running = match totals.take() {
        Some(mut running) => {
            running.fluence += &increment;
            running.variance += &variance_increment;
            running
        }
        None => RunningTotals {
            fluence: increment.clone(),
            variance: variance_increment,
        },
    };

    let result = FluenceIncrement {
        rel_error: relative_error(&running.variance, &increment),
        fluence: running.fluence.clone(),
        raw,
    };
    *totals = Some(running);
    Ok(result)
}

/// FluenceAccumulator integrates vessel tallies over a sequence of states.
///
/// Each call adds `tally * dt` to the running fluence and `(tally * dt)^2` to the running
/// variance, after zeroing the water gap. The aggregate tally and every binned group
/// keep independent running totals for the lifetime of the accumulator (one synthesis run).
#[derive(Debug, Clone)]
pub struct FluenceAccumulator {
    exclusion: RadiusExclusion,
    total: Option<RunningTotals>,
    binned: Vec<Option<RunningTotals>>,
}

impl FluenceAccumulator {
    pub fn new(exclusion: RadiusExclusion) -> Self {
        Self {
            exclusion,
            total: None,
            binned: Vec::new(),
        }
    }

    pub fn exclusion(&self) -> &RadiusExclusion {
        &self.exclusion
    }

    /// Number of binned groups seen so far
    pub fn n_groups(&self) -> usize {
        self.binned.len()
    }

    pub fn total_totals(&self) -> Option<&RunningTotals> {
        self.total.as_ref()
    }

    pub fn group_totals(&self, group: usize) -> Option<&RunningTotals> {
        self.binned.get(group).and_then(|t| t.as_ref())
    }

    /// Accumulate the aggregate tally for one state
    pub fn accumulate_total(
        &mut self,
        total: ArrayD<f64>,
        dt: f64,
    ) -> Result<FluenceIncrement, AccumulatorError> {
        integrate(&mut self.total, &self.exclusion, total, dt)
    }

    /// Accumulate a stack of group tallies for one state. The leading axis of `binned`
    /// is the group axis. Returns one increment per group, in group order.
    pub fn accumulate_binned(
        &mut self,
        binned: ArrayD<f64>,
        dt: f64,
    ) -> Result<Vec<FluenceIncrement>, AccumulatorError> {
        if binned.ndim() == 0 {
            return Err(AccumulatorError::BinnedRank(0));
        }
        let n_groups = binned.len_of(Axis(0));
        if self.binned.len() < n_groups {
            self.binned.resize(n_groups, None);
        }
        let mut increments = Vec::with_capacity(n_groups);
        for (group, snapshot) in binned.axis_iter(Axis(0)).enumerate() {
            increments.push(integrate(
                &mut self.binned[group],
                &self.exclusion,
                snapshot.to_owned(),
                dt,
            )?);
        }
        Ok(increments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;

    fn snapshot(value: f64) -> ArrayD<f64> {
        ArrayD::<f64>::from_elem(IxDyn(&[2, 3, 5, 1]), value)
    }

    #[test]
    fn test_fluence_is_sum_of_increments() {
        let mut accumulator = FluenceAccumulator::new(RadiusExclusion::default());
        let states = [(2.0, 1.0), (3.0, 10.0), (0.5, 100.0)];
        let mut expected = 0.0;
        let mut last = None;
        for (value, dt) in states {
            expected += value * dt;
            last = Some(accumulator.accumulate_total(snapshot(value), dt).unwrap());
        }
        let last = last.unwrap();
        assert!(last.fluence.iter().all(|f| *f == expected));
        assert!(last.raw.iter().all(|r| *r == 0.5));

        // Variance is the sum of (value * dt)^2
        let expected_variance: f64 = states.iter().map(|(v, dt)| (v * dt) * dt * v).sum();
        let totals = accumulator.total_totals().unwrap();
        assert!(totals.variance.iter().all(|v| *v == expected_variance));
        // Relative error is taken against the final increment
        let expected_error = expected_variance.sqrt() / (0.5 * 100.0);
        assert!(last.rel_error.iter().all(|e| (*e - expected_error).abs() < 1e-12));
    }

    #[test]
    fn test_masked_cells_contribute_nothing() {
        let exclusion = RadiusExclusion { start: 1, end: 3 };
        let mut accumulator = FluenceAccumulator::new(exclusion);
        let mut raw = snapshot(4.0);
        raw.slice_axis_mut(Axis(2), ndarray::Slice::from(1..3))
            .map_inplace(|v| *v = 1.0e9);
        let result = accumulator.accumulate_total(raw.clone(), 2.0).unwrap();
        let totals = accumulator.total_totals().unwrap();
        for (index, fluence) in result.fluence.indexed_iter() {
            let variance = totals.variance[&index];
            let error = result.rel_error[&index];
            if (1..3).contains(&index[2]) {
                assert_eq!(*fluence, 0.0);
                assert_eq!(variance, 0.0);
                assert_eq!(error, 0.0);
            } else {
                assert_eq!(*fluence, 8.0);
                assert_eq!(variance, 8.0 * 2.0 * 4.0);
                assert_eq!(error, 1.0);
            }
        }
        // The raw tally is returned as it was read
        assert_eq!(result.raw, raw);
    }

    #[test]
    fn test_zero_increment_has_zero_error() {
        let mut accumulator = FluenceAccumulator::new(RadiusExclusion::default());
        accumulator.accumulate_total(snapshot(3.0), 1.0).unwrap();
        // Running variance is nonzero but this increment is zero everywhere
        let result = accumulator.accumulate_total(snapshot(0.0), 5.0).unwrap();
        assert!(result.rel_error.iter().all(|e| *e == 0.0));
        assert!(result.fluence.iter().all(|f| *f == 3.0));

        let variance = ArrayD::<f64>::zeros(IxDyn(&[2]));
        let increment = ndarray::arr1(&[0.0, 2.0]).into_dyn();
        let error = relative_error(&variance, &increment);
        assert_eq!(error.as_slice().unwrap(), &[0.0, 0.0]);
    }

    #[test]
    fn test_binned_groups_are_independent() {
        let mut accumulator = FluenceAccumulator::new(RadiusExclusion::default());
        let mut binned = ArrayD::<f64>::zeros(IxDyn(&[2, 2, 3, 5, 1]));
        binned.index_axis_mut(Axis(0), 0).map_inplace(|v| *v = 1.0);
        binned.index_axis_mut(Axis(0), 1).map_inplace(|v| *v = 10.0);

        accumulator.accumulate_binned(binned.clone(), 2.0).unwrap();
        let groups = accumulator.accumulate_binned(binned, 3.0).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(accumulator.n_groups(), 2);
        assert!(groups[0].fluence.iter().all(|f| *f == 5.0));
        assert!(groups[1].fluence.iter().all(|f| *f == 50.0));
        assert_eq!(groups[0].fluence.shape(), &[2, 3, 5, 1]);
        // The aggregate is untouched by the binned groups
        assert!(accumulator.total_totals().is_none());
    }

    #[test]
    fn test_binned_groups_extend() {
        let mut accumulator = FluenceAccumulator::new(RadiusExclusion::default());
        let one = ArrayD::<f64>::ones(IxDyn(&[1, 1, 1, 2]));
        accumulator.accumulate_binned(one, 1.0).unwrap();
        let two = ArrayD::<f64>::ones(IxDyn(&[2, 1, 1, 2]));
        let groups = accumulator.accumulate_binned(two, 1.0).unwrap();
        assert!(groups[0].fluence.iter().all(|f| *f == 2.0));
        // A new group starts from its own first increment
        assert!(groups[1].fluence.iter().all(|f| *f == 1.0));
        assert!(accumulator.group_totals(1).is_some());
        assert!(accumulator.group_totals(2).is_none());
    }

    #[test]
    fn test_shape_mismatch() {
        let mut accumulator = FluenceAccumulator::new(RadiusExclusion::default());
        accumulator.accumulate_total(snapshot(1.0), 1.0).unwrap();
        let other = ArrayD::<f64>::ones(IxDyn(&[2, 3, 4, 1]));
        assert!(matches!(
            accumulator.accumulate_total(other, 1.0),
            Err(AccumulatorError::ShapeMismatch(_, _))
        ));
    }

    #[test]
    fn test_binned_names() {
        assert_eq!(
            TallyNames::binned(1, 0),
            TallyNames {
                raw: String::from("binned"),
                fluence: String::from("binned_fluence"),
                rel_error: String::from("binned_fluence_rel_error"),
            }
        );
        let second = TallyNames::binned(2, 1);
        assert_eq!(second.raw, "binned_01");
        assert_eq!(second.fluence, "binned_fluence_01");
        assert_eq!(second.rel_error, "binned_fluence_rel_error_01");
        assert_eq!(TallyNames::binned(12, 11).fluence, "binned_fluence_11");
        assert_eq!(TallyNames::total().fluence, "fluence");
    }
}
