use std::{
    any::type_name,
    fmt::Debug,
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::{
    annealing::AnnealingSchedule,
    convergence::{ConvergenceMonitor, ConvergenceSettings},
    dataset::DatasetView,
    error::Result,
    events::{default_sink, EventSink, Level},
    output::sample_output_path,
    tracker::{BestSampleRecord, BestSampleTracker, Score, ScoreMode},
};

/// Settings shared by all samplers
#[derive(Debug, Clone)]
pub struct SamplerSettings {
    /// The number of planned iterations. Also the budget of the annealing
    /// schedule.
    pub sample_size: u64,
    /// Only use the first `cutoff` rows of the data.
    pub cutoff: Option<usize>,
    /// Run as a stochastic search that stops once the best sample stalls.
    pub search: bool,
    /// Number of updates without improvement after which a search stops.
    pub search_tolerance: u64,
    /// Compare samples by the likelihood of the data only, ignoring the
    /// log probability of the model.
    pub search_data_fit_only: bool,
    /// Also stop a search when the mean of the last `search_tolerance`
    /// improvements falls below this value.
    pub min_mean_improvement: Option<f64>,
    pub annealing: bool,
    /// Keep every `thinning`-th draw after burn-in.
    pub thinning: u64,
    pub burnin: u64,
    pub output_to_stdout: bool,
    pub seed: u64,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            sample_size: 1000,
            cutoff: None,
            search: false,
            search_tolerance: 100,
            search_data_fit_only: false,
            min_mean_improvement: None,
            annealing: false,
            thinning: 1,
            burnin: 0,
            output_to_stdout: false,
            seed: 0,
        }
    }
}

impl SamplerSettings {
    pub fn score_mode(&self) -> ScoreMode {
        if self.search_data_fit_only {
            ScoreMode::LikelihoodOnly
        } else {
            ScoreMode::Joint
        }
    }

    pub fn convergence(&self) -> ConvergenceSettings {
        ConvergenceSettings {
            tolerance: self.search_tolerance,
            min_mean_improvement: self.min_mean_improvement,
        }
    }
}

#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Progress {
    pub iteration: u64,
    pub sample_size: u64,
    pub temperature: f64,
    pub best_score: Option<Score>,
    pub no_improvement: u64,
    pub improvements: usize,
    pub runtime: Duration,
    pub device_time: Duration,
}

/// State shared by every concrete sampler: the data, iteration bookkeeping,
/// the annealing schedule, the best sample and the early stopping monitor.
pub struct SamplerBase<S> {
    settings: SamplerSettings,
    dataset: DatasetView,
    iteration: u64,
    temperature: f64,
    schedule: AnnealingSchedule,
    tracker: BestSampleTracker<S>,
    monitor: ConvergenceMonitor,
    rng: ChaCha8Rng,
    sink: Arc<dyn EventSink>,
    source_path: Option<PathBuf>,
    output_path: Option<PathBuf>,
    runtime: Duration,
    device_time: Duration,
    last_tick: Option<Instant>,
}

impl<S: Clone> SamplerBase<S> {
    pub fn new(settings: SamplerSettings) -> SamplerBase<S> {
        let schedule = AnnealingSchedule::new(settings.annealing, settings.sample_size);
        let tracker = BestSampleTracker::new(settings.score_mode());
        let monitor = ConvergenceMonitor::new(settings.convergence());
        let rng = ChaCha8Rng::seed_from_u64(settings.seed);
        SamplerBase {
            temperature: schedule.temperature_at(0),
            settings,
            dataset: DatasetView::default(),
            iteration: 0,
            schedule,
            tracker,
            monitor,
            rng,
            sink: default_sink(),
            source_path: None,
            output_path: None,
            runtime: Duration::ZERO,
            device_time: Duration::ZERO,
            last_tick: None,
        }
    }

    /// Route all events of this sampler, including those of the tracker and
    /// the convergence monitor, to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.tracker.set_sink(sink.clone());
        self.monitor.set_sink(sink.clone());
        self.sink = sink;
        self
    }

    pub fn settings(&self) -> &SamplerSettings {
        &self.settings
    }

    /// Read observations from a csv file, applying the configured cutoff.
    pub fn read_csv(
        &mut self,
        path: impl AsRef<Path>,
        obs_vars: &[&str],
        header: bool,
    ) -> Result<()> {
        let path = path.as_ref();
        self.dataset = DatasetView::read_csv(path, obs_vars, header, self.settings.cutoff)?;
        self.sink.emit(
            Level::DEBUG,
            &format!("Read {} observations from {}", self.dataset.n(), path.display()),
        );
        Ok(())
    }

    pub fn set_dataset(&mut self, dataset: DatasetView) {
        self.dataset = dataset;
    }

    pub fn dataset(&self) -> &DatasetView {
        &self.dataset
    }

    /// Number of observations.
    pub fn n(&self) -> usize {
        self.dataset.n()
    }

    /// Remember `source` and derive the sample output file from it.
    pub fn setup_sample_output(&mut self, source: impl AsRef<Path>, param_str: &str) -> &Path {
        let source = source.as_ref();
        let now = chrono::Local::now().naive_local();
        self.source_path = Some(source.to_path_buf());
        self.output_path.insert(sample_output_path(source, param_str, now))
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    pub fn output_path(&self) -> Option<&Path> {
        self.output_path.as_deref()
    }

    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn schedule(&self) -> &AnnealingSchedule {
        &self.schedule
    }

    /// Recompute the annealing temperature for `iteration`.
    pub fn set_temperature(&mut self, iteration: u64) -> f64 {
        let temperature = self.schedule.temperature_at(iteration);
        if temperature != self.temperature {
            self.sink.emit(
                Level::DEBUG,
                &format!("Annealing temperature set to {temperature} at iteration {iteration}"),
            );
        }
        self.temperature = temperature;
        temperature
    }

    /// Move to the next iteration and return its temperature.
    pub fn advance(&mut self) -> f64 {
        let now = Instant::now();
        if let Some(last) = self.last_tick.replace(now) {
            self.runtime += now - last;
        }
        self.iteration += 1;
        self.set_temperature(self.iteration)
    }

    pub fn is_burnin(&self) -> bool {
        self.iteration < self.settings.burnin
    }

    /// Whether the draw of the current iteration should be kept, given
    /// burn-in and thinning.
    pub fn keep_draw(&self) -> bool {
        if self.is_burnin() {
            return false;
        }
        let thinning = self.settings.thinning.max(1);
        (self.iteration - self.settings.burnin) % thinning == 0
    }

    /// Add time spent in accelerator kernels.
    pub fn record_device_time(&mut self, elapsed: Duration) {
        self.device_time += elapsed;
    }

    pub fn runtime(&self) -> Duration {
        self.runtime
    }

    pub fn device_time(&self) -> Duration {
        self.device_time
    }

    pub fn rng_mut(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    /// Offer a scored sample to the best sample tracker.
    pub fn better_sample(&mut self, sample: &S, score: Score) -> Result<bool> {
        self.tracker.update_scored(sample, score)
    }

    /// Whether the search has stopped improving.
    pub fn no_improvement(&self) -> bool {
        self.monitor.check(&self.tracker)
    }

    /// `true` if this is a search run and it has stalled.
    pub fn should_stop(&self) -> bool {
        self.settings.search && self.no_improvement()
    }

    pub fn tracker(&self) -> &BestSampleTracker<S> {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut BestSampleTracker<S> {
        &mut self.tracker
    }

    pub fn monitor(&self) -> &ConvergenceMonitor {
        &self.monitor
    }

    pub fn best(&self) -> Option<&BestSampleRecord<S>> {
        self.tracker.best()
    }

    pub fn into_best(self) -> Option<BestSampleRecord<S>> {
        self.tracker.into_best()
    }

    pub fn progress(&self) -> Progress {
        Progress {
            iteration: self.iteration,
            sample_size: self.settings.sample_size,
            temperature: self.temperature,
            best_score: self.tracker.best_score(),
            no_improvement: self.tracker.no_improvement_count(),
            improvements: self.tracker.history().len(),
            runtime: self.runtime,
            device_time: self.device_time,
        }
    }
}

/// A concrete sampling algorithm built on a [`SamplerBase`].
///
/// Implementors provide the model's log probability and the inference loop.
/// Inside the loop they call [`SamplerBase::advance`] for the annealing
/// temperature, the functions in [`crate::math`] to draw from candidate
/// distributions, [`Sampler::better_sample`] for each candidate and
/// [`SamplerBase::should_stop`] to end a search early.
pub trait Sampler {
    type Sample: Clone + Debug;

    fn base(&self) -> &SamplerBase<Self::Sample>;

    fn base_mut(&mut self) -> &mut SamplerBase<Self::Sample>;

    /// Log probability of the model and log likelihood of the data for a
    /// sample. Must be deterministic given the sample and the data.
    fn logprob(&self, sample: &Self::Sample) -> Score;

    /// Run the sampler.
    fn do_inference(&mut self) -> anyhow::Result<()>;

    /// Name of the sampler used in output file names.
    fn param_str(&self) -> String {
        let name = type_name::<Self>();
        let name = name.split('<').next().unwrap_or(name);
        name.rsplit("::").next().unwrap_or(name).to_string()
    }

    /// Score `sample` and keep it if it beats the current best.
    fn better_sample(&mut self, sample: &Self::Sample) -> Result<bool> {
        let score = self.logprob(sample);
        self.base_mut().better_sample(sample, score)
    }

    fn no_improvement(&self) -> bool {
        self.base().no_improvement()
    }

    fn setup_sample_output(&mut self, source: &Path) -> PathBuf {
        let name = self.param_str();
        self.base_mut()
            .setup_sample_output(source, &name)
            .to_path_buf()
    }
}
