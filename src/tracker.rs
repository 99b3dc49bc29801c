use std::{fmt, sync::Arc};

use crate::{
    error::{Result, SamplerError},
    events::{default_sink, EventSink, Level},
};

/// Which part of a [`Score`] decides whether a sample is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoreMode {
    /// Compare `logprob_model + loglik_data`.
    #[default]
    Joint,
    /// Compare `loglik_data` only. Joint scores are accepted, their model
    /// term is ignored.
    LikelihoodOnly,
}

/// Objective value of a sample. Higher is better.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Score {
    Likelihood(f64),
    Joint { logprob_model: f64, loglik_data: f64 },
}

impl Score {
    pub fn joint(logprob_model: f64, loglik_data: f64) -> Score {
        Score::Joint {
            logprob_model,
            loglik_data,
        }
    }

    /// The zero score of the given mode. Useful as a placeholder, never as a
    /// real objective.
    pub fn neutral(mode: ScoreMode) -> Score {
        match mode {
            ScoreMode::Joint => Score::joint(0., 0.),
            ScoreMode::LikelihoodOnly => Score::Likelihood(0.),
        }
    }

    pub fn loglik_data(&self) -> f64 {
        match *self {
            Score::Likelihood(loglik_data) => loglik_data,
            Score::Joint { loglik_data, .. } => loglik_data,
        }
    }

    pub fn logprob_model(&self) -> Option<f64> {
        match *self {
            Score::Likelihood(_) => None,
            Score::Joint { logprob_model, .. } => Some(logprob_model),
        }
    }

    /// The value compared in `mode`.
    pub fn objective(&self, mode: ScoreMode) -> f64 {
        match mode {
            ScoreMode::Joint => self.logprob_model().unwrap_or(0.) + self.loglik_data(),
            ScoreMode::LikelihoodOnly => self.loglik_data(),
        }
    }

    fn fits(&self, mode: ScoreMode) -> bool {
        match mode {
            ScoreMode::Joint => matches!(self, Score::Joint { .. }),
            ScoreMode::LikelihoodOnly => true,
        }
    }

    fn same_shape(&self, other: &Score) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Score::Likelihood(loglik_data) => write!(f, "loglik of data: {loglik_data}"),
            Score::Joint {
                logprob_model,
                loglik_data,
            } => write!(
                f,
                "logprob of model: {logprob_model}, loglik of data: {loglik_data}"
            ),
        }
    }
}

/// Positive score deltas of every accepted improvement, oldest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImprovementHistory {
    deltas: Vec<f64>,
}

impl ImprovementHistory {
    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.deltas
    }

    pub fn last(&self) -> Option<f64> {
        self.deltas.last().copied()
    }

    /// Mean of the last `window` deltas, or `None` if fewer were recorded.
    pub fn trailing_mean(&self, window: usize) -> Option<f64> {
        if window == 0 || self.deltas.len() < window {
            return None;
        }
        let tail = &self.deltas[self.deltas.len() - window..];
        Some(tail.iter().sum::<f64>() / window as f64)
    }

    fn push(&mut self, delta: f64) {
        debug_assert!(delta > 0.);
        self.deltas.push(delta);
    }
}

/// The best sample seen so far together with its score.
#[derive(Debug, Clone, PartialEq)]
pub struct BestSampleRecord<S> {
    sample: S,
    score: Score,
}

impl<S> BestSampleRecord<S> {
    pub fn sample(&self) -> &S {
        &self.sample
    }

    pub fn score(&self) -> Score {
        self.score
    }

    pub fn into_sample(self) -> S {
        self.sample
    }
}

pub type Objective<S> = Box<dyn FnMut(&S) -> Score + Send>;

/// Keeps an owned copy of the best sample of a stochastic search.
///
/// Samples passed to [`update`](Self::update) are cloned when they are
/// recorded, so the caller may keep mutating its working sample.
pub struct BestSampleTracker<S> {
    mode: ScoreMode,
    objective: Option<Objective<S>>,
    best: Option<BestSampleRecord<S>>,
    history: ImprovementHistory,
    no_improvement: u64,
    sink: Arc<dyn EventSink>,
}

impl<S: Clone> BestSampleTracker<S> {
    pub fn new(mode: ScoreMode) -> BestSampleTracker<S> {
        BestSampleTracker {
            mode,
            objective: None,
            best: None,
            history: ImprovementHistory::default(),
            no_improvement: 0,
            sink: default_sink(),
        }
    }

    pub fn with_objective(
        mut self,
        objective: impl FnMut(&S) -> Score + Send + 'static,
    ) -> Self {
        self.set_objective(objective);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn set_objective(&mut self, objective: impl FnMut(&S) -> Score + Send + 'static) {
        self.objective = Some(Box::new(objective));
    }

    pub(crate) fn set_sink(&mut self, sink: Arc<dyn EventSink>) {
        self.sink = sink;
    }

    /// Score `sample` with the configured objective and keep it if it is
    /// better than the current best.
    ///
    /// Returns `true` only if a previous best existed and was beaten. The very
    /// first sample initializes the record and returns `false`.
    pub fn update(&mut self, sample: &S) -> Result<bool> {
        let objective = self.objective.as_mut().ok_or(SamplerError::NotConfigured)?;
        let score = objective(sample);
        self.update_scored(sample, score)
    }

    /// Like [`update`](Self::update), with a score computed by the caller.
    ///
    /// Scores whose objective is NaN or infinite are rejected and leave the
    /// tracker unchanged.
    pub fn update_scored(&mut self, sample: &S, score: Score) -> Result<bool> {
        if !score.fits(self.mode) {
            return Err(SamplerError::ScoreModeMismatch { mode: self.mode });
        }
        if !score.objective(self.mode).is_finite() {
            return Err(SamplerError::NonFiniteScore(score));
        }

        let Some(best_score) = self.best_score() else {
            self.best = Some(BestSampleRecord {
                sample: sample.clone(),
                score,
            });
            self.sink
                .emit(Level::INFO, &format!("Initial sample generated, {score}"));
            return Ok(false);
        };

        if !score.same_shape(&best_score) {
            return Err(SamplerError::ScoreModeMismatch { mode: self.mode });
        }

        let delta = score.objective(self.mode) - best_score.objective(self.mode);
        if delta > 0. {
            self.no_improvement = 0;
            self.history.push(delta);
            self.best = Some(BestSampleRecord {
                sample: sample.clone(),
                score,
            });
            self.sink
                .emit(Level::INFO, &format!("New best sample found, {score}"));
            Ok(true)
        } else {
            self.no_improvement += 1;
            Ok(false)
        }
    }

    pub fn mode(&self) -> ScoreMode {
        self.mode
    }

    pub fn is_configured(&self) -> bool {
        self.objective.is_some()
    }

    pub fn best(&self) -> Option<&BestSampleRecord<S>> {
        self.best.as_ref()
    }

    pub fn best_sample(&self) -> Option<&S> {
        self.best.as_ref().map(|best| &best.sample)
    }

    pub fn best_score(&self) -> Option<Score> {
        self.best.as_ref().map(|best| best.score)
    }

    pub fn history(&self) -> &ImprovementHistory {
        &self.history
    }

    /// Number of updates since the last improvement.
    pub fn no_improvement_count(&self) -> u64 {
        self.no_improvement
    }

    pub fn into_best(self) -> Option<BestSampleRecord<S>> {
        self.best
    }
}
