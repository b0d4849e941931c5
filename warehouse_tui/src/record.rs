//! Tick observers that write somewhere other than the terminal UI.

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

use anyhow::{Context, Result};
use tracing::warn;
use warehouse_core::{observer::TickObserver, simulation::TickReport};

/// Appends every tick report to a file as one JSON object per line.
pub struct EventLog<W: Write> {
    writer: Option<W>,
}

impl EventLog<BufWriter<File>> {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create event log {}", path.display()))?;
        Ok(EventLog::new(BufWriter::new(file)))
    }
}

impl<W: Write> EventLog<W> {
    pub fn new(writer: W) -> Self {
        EventLog {
            writer: Some(writer),
        }
    }

    fn write_report(writer: &mut W, report: &TickReport) -> io::Result<()> {
        serde_json::to_writer(&mut *writer, report)?;
        writer.write_all(b"\n")
    }

    #[cfg(test)]
    fn into_inner(self) -> Option<W> {
        self.writer
    }
}

impl<W: Write> TickObserver for EventLog<W> {
    fn on_tick(&mut self, report: &TickReport) {
        if let Some(writer) = self.writer.as_mut() {
            if let Err(err) = Self::write_report(writer, report) {
                // Keep the simulation going; just stop recording
                warn!(error = %err, "event log write failed, disabling event log");
                self.writer = None;
            }
        }
    }

    fn on_complete(&mut self, _ticks: u64) {
        if let Some(writer) = self.writer.as_mut() {
            if let Err(err) = writer.flush() {
                warn!(error = %err, "event log flush failed");
            }
        }
    }
}

/// Prints each tick's events as plain text.
pub struct Printer<W: Write> {
    out: W,
}

impl<W: Write> Printer<W> {
    pub fn new(out: W) -> Self {
        Printer { out }
    }

    fn print(&mut self, report: &TickReport) -> io::Result<()> {
        writeln!(self.out, "Tick {}", report.tick)?;
        if report.events.is_empty() {
            writeln!(self.out, "  (no events)")?;
        }
        for event in &report.events {
            writeln!(self.out, "  {event}")?;
        }
        Ok(())
    }
}

impl<W: Write> TickObserver for Printer<W> {
    fn on_tick(&mut self, report: &TickReport) {
        if let Err(err) = self.print(report) {
            warn!(error = %err, "failed to print tick");
        }
    }

    fn on_complete(&mut self, ticks: u64) {
        if let Err(err) = writeln!(self.out, "All items delivered in {ticks} ticks.") {
            warn!(error = %err, "failed to print summary");
        }
    }
}

/// Forwards to two observers in turn.
pub struct Both<'a, A: ?Sized, B: ?Sized>(pub &'a mut A, pub &'a mut B);

impl<A: TickObserver + ?Sized, B: TickObserver + ?Sized> TickObserver for Both<'_, A, B> {
    fn on_tick(&mut self, report: &TickReport) {
        self.0.on_tick(report);
        self.1.on_tick(report);
    }

    fn on_complete(&mut self, ticks: u64) {
        self.0.on_complete(ticks);
        self.1.on_complete(ticks);
    }
}
