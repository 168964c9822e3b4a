//! Periodic sampling.
//!
//! A [`Sampler`] knows which attributes a device has and how to refresh them.
//! [`SamplingLoop`] drives it one tick at a time; the device service decides
//! when ticks happen.

use crate::error::Result;
use crate::registry::AttributeRegistry;

/// Outcome of one sampling pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Attributes whose value changed.
    pub updated: usize,
    /// Source reads that failed; their attributes kept the previous value.
    pub failed: usize,
}

impl TickReport {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Device-specific schema and refresh logic.
pub trait Sampler: Send {
    /// Declare the device attributes.
    fn declare(&mut self, registry: &mut AttributeRegistry) -> Result<()>;

    /// Read sources and update the registry.
    ///
    /// Must not block for long: it runs on the task that also answers
    /// remote queries.
    fn sample(&mut self, registry: &mut AttributeRegistry) -> TickReport;
}

/// Where the loop is within a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopState {
    #[default]
    Idle,
    Sampling,
}

/// Drives a [`Sampler`], one tick at a time.
#[derive(Debug)]
pub struct SamplingLoop<M> {
    sampler: M,
    state: LoopState,
    ticks: u64,
    failures: u64,
}

impl<M: Sampler> SamplingLoop<M> {
    pub fn new(sampler: M) -> Self {
        Self {
            sampler,
            state: LoopState::Idle,
            ticks: 0,
            failures: 0,
        }
    }

    /// Let the sampler declare its attributes.
    pub fn declare(&mut self, registry: &mut AttributeRegistry) -> Result<()> {
        self.sampler.declare(registry)
    }

    /// Run one sampling pass. The loop is back to [`LoopState::Idle`] when
    /// this returns.
    pub fn tick(&mut self, registry: &mut AttributeRegistry) -> TickReport {
        self.state = LoopState::Sampling;
        let report = self.sampler.sample(registry);
        self.state = LoopState::Idle;

        self.ticks += 1;
        self.failures += report.failed as u64;

        tracing::trace!(
            tick = self.ticks,
            updated = report.updated,
            failed = report.failed,
            "Sampling tick"
        );

        report
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Completed ticks.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Failed source reads over all ticks.
    pub fn failures(&self) -> u64 {
        self.failures
    }

    pub fn sampler(&self) -> &M {
        &self.sampler
    }
}
