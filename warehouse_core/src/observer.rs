//! Hooks for whatever renders or records a running simulation.

use crate::simulation::TickReport;

/// Callbacks invoked by [`Simulation::run`][crate::simulation::Simulation::run].
///
/// Both methods default to no-ops so implementors only override what they
/// need.
pub trait TickObserver {
    /// Called after every tick with the resulting frame and its events.
    fn on_tick(&mut self, _report: &TickReport) {}

    /// Called once when every item has been delivered. `ticks` is the total
    /// number of ticks executed.
    fn on_complete(&mut self, _ticks: u64) {}
}

/// A [`TickObserver`] that ignores everything.
pub struct NoopObserver;

impl TickObserver for NoopObserver {}

/// Collects every report, mostly useful in tests.
#[derive(Debug, Default)]
pub struct Recorder {
    pub reports: Vec<TickReport>,
    pub completed_after: Option<u64>,
}

impl TickObserver for Recorder {
    fn on_tick(&mut self, report: &TickReport) {
        self.reports.push(report.clone());
    }

    fn on_complete(&mut self, ticks: u64) {
        self.completed_after = Some(ticks);
    }
}
