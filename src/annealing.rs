/// Coarse simulated-annealing schedule over a fixed sample budget.
///
/// The temperature is a pure function of the iteration index. It warms up in
/// five steps over the first half of the budget and stays at `1` afterwards,
/// so the back half of a run targets the untempered distribution.
#[derive(Debug, Clone, Copy)]
pub struct AnnealingSchedule {
    enabled: bool,
    sample_size: u64,
}

/// Exclusive upper bounds in tenths of the budget, and their temperatures.
const BANDS: [(u128, f64); 4] = [(2, 0.2), (3, 0.4), (4, 0.6), (5, 0.8)];

impl AnnealingSchedule {
    pub fn new(enabled: bool, sample_size: u64) -> AnnealingSchedule {
        AnnealingSchedule {
            enabled,
            sample_size,
        }
    }

    pub fn disabled() -> AnnealingSchedule {
        AnnealingSchedule::new(false, 0)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn sample_size(&self) -> u64 {
        self.sample_size
    }

    pub fn temperature_at(&self, iteration: u64) -> f64 {
        if !self.enabled {
            return 1.;
        }
        // Integer comparison keeps `iteration == 0.3 * budget` out of the 0.4 band.
        let scaled = u128::from(iteration) * 10;
        let budget = u128::from(self.sample_size);
        BANDS
            .iter()
            .find(|&&(tenths, _)| scaled < budget * tenths)
            .map(|&(_, temp)| temp)
            .unwrap_or(1.)
    }
}

impl Default for AnnealingSchedule {
    fn default() -> Self {
        AnnealingSchedule::disabled()
    }
}
