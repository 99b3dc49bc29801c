//! Building blocks for stochastic samplers and searches.
//!
//! Concrete samplers (Gibbs samplers, simulated annealing, stochastic search)
//! implement [`Sampler`] on top of a [`SamplerBase`], which bundles
//!
//! - numerically stable normalization of log weights and discrete draws
//!   ([`lognormalize`], [`sample`]),
//! - a simulated-annealing temperature schedule ([`AnnealingSchedule`]),
//! - tracking of the best sample seen so far ([`BestSampleTracker`]),
//! - early stopping once the search stalls ([`ConvergenceMonitor`]),
//! - csv data ingestion with cutoff and transparent gzip ([`DatasetView`]).
//!
//! Events are reported through an injected [`EventSink`]; by default they go
//! to `tracing`.

pub(crate) mod annealing;
pub(crate) mod convergence;
pub(crate) mod dataset;
pub(crate) mod error;
pub(crate) mod events;
pub mod math;
pub(crate) mod output;
pub(crate) mod sampler;
pub(crate) mod tracker;

pub use annealing::AnnealingSchedule;
pub use convergence::{ConvergenceMonitor, ConvergenceSettings};
pub use dataset::{DatasetView, Table};
pub use error::{Result, SamplerError};
pub use events::{EventSink, Level, NullSink, TracingSink};
pub use math::{lognormalize, sample};
pub use output::sample_output_path;
pub use sampler::{Progress, Sampler, SamplerBase, SamplerSettings};
pub use tracker::{
    BestSampleRecord, BestSampleTracker, ImprovementHistory, Objective, Score, ScoreMode,
};
