use std::fmt::Write as _;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use llmdrift_core::{GroupSnapshot, Registry, Result};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Periodically renders registry snapshots. Never mutates anything.
pub struct Reporter {
    registry: Arc<Registry>,
    interval: Duration,
}

impl Reporter {
    pub fn new(registry: Arc<Registry>, interval: Duration) -> Self {
        Self { registry, interval }
    }

    /// Render one frame per tick until `cancel` fires. Returns frames written.
    pub async fn run<W: Write>(&self, cancel: CancellationToken, out: &mut W) -> Result<u64> {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut frames = 0;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let groups = self.registry.list_groups();
                    out.write_all(render(&groups).as_bytes())?;
                    out.flush()?;
                    frames += 1;
                }
            }
        }

        debug!(frames, "Reporter stopped");
        Ok(frames)
    }
}

pub fn render(groups: &[GroupSnapshot]) -> String {
    let mut out = String::new();

    for group in groups {
        let _ = writeln!(out, "Name: {}", group.name);
        let _ = writeln!(out, "Description: {}", group.description);
        let _ = writeln!(out, "Score sum: {}", group.score_sum);
        let _ = writeln!(out, "Runs: {}/{}", group.runs.len(), group.benchmarks.len());
        let _ = writeln!(out, "Pending: {}", group.pending());
        if let Some(accuracy) = group.accuracy() {
            let _ = writeln!(out, "Accuracy: {:.2}%", accuracy);
        }

        for run in &group.runs {
            let _ = writeln!(out, "Run prompt: {}", run.prompt);
            let _ = writeln!(out, "Run response: {}", run.response);
            let _ = writeln!(out, "Run score: {}", run.score);
            let _ = writeln!(out, "Run timestamp: {}", run.created_at);
        }
        out.push('\n');
    }

    out
}
