use serde::{Deserialize, Serialize};

use crate::{Benchmark, DriftError, Result};

/// Lifecycle of one benchmark inside a group. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FireState {
    #[default]
    Unfired,
    Pending,
    Resolved,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub prompt: String,
    pub response: String,
    pub score: u32,
    /// Unix seconds at scoring time.
    pub created_at: u64,
}

/// A named set of benchmarks plus the runs recorded against them.
///
/// `runs` is in resolution order, which need not match `benchmarks` order.
#[derive(Debug, Clone, Default)]
pub struct BenchmarkGroup {
    name: String,
    description: String,
    benchmarks: Vec<Benchmark>,
    states: Vec<FireState>,
    runs: Vec<RunRecord>,
    score_sum: u64,
}

impl BenchmarkGroup {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn benchmarks(&self) -> &[Benchmark] {
        &self.benchmarks
    }

    pub fn runs(&self) -> &[RunRecord] {
        &self.runs
    }

    pub fn score_sum(&self) -> u64 {
        self.score_sum
    }

    pub fn state(&self, index: usize) -> Option<FireState> {
        self.states.get(index).copied()
    }

    /// Appended benchmarks start out unfired; existing ones keep their state.
    pub fn add_benchmarks(&mut self, benchmarks: impl IntoIterator<Item = Benchmark>) {
        for benchmark in benchmarks {
            self.benchmarks.push(benchmark);
            self.states.push(FireState::Unfired);
        }
    }

    /// Indices of benchmarks that have never been dispatched.
    pub fn unfired(&self) -> impl Iterator<Item = usize> + '_ {
        self.states
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == FireState::Unfired)
            .map(|(i, _)| i)
    }

    /// Unfired -> Pending. A benchmark already resolved (its reply beat the
    /// dispatch acknowledgement) stays resolved.
    pub fn mark_pending(&mut self, group_id: usize, index: usize) -> Result<()> {
        let state = self
            .states
            .get_mut(index)
            .ok_or(DriftError::BenchmarkNotFound { group_id, index })?;
        if *state == FireState::Unfired {
            *state = FireState::Pending;
        }
        Ok(())
    }

    /// Score `response` against the benchmark at `index` and append the run.
    pub fn record_run(
        &mut self,
        group_id: usize,
        index: usize,
        response: &str,
        now: u64,
    ) -> Result<RunRecord> {
        let benchmark = self
            .benchmarks
            .get(index)
            .ok_or(DriftError::BenchmarkNotFound { group_id, index })?;
        if self.states[index] == FireState::Resolved {
            return Err(DriftError::AlreadyResolved { group_id, index });
        }

        let prompt = benchmark.prompt().to_string();
        let score = benchmark.evaluate(&prompt, response);
        let created_at = self.runs.last().map_or(now, |last| last.created_at.max(now));

        let run = RunRecord {
            prompt,
            response: response.to_string(),
            score,
            created_at,
        };

        self.runs.push(run.clone());
        self.score_sum += u64::from(score);
        self.states[index] = FireState::Resolved;

        debug_assert!(self.runs.len() <= self.benchmarks.len());
        debug_assert_eq!(
            self.score_sum,
            self.runs.iter().map(|r| u64::from(r.score)).sum::<u64>()
        );

        Ok(run)
    }

    pub fn snapshot(&self) -> GroupSnapshot {
        GroupSnapshot {
            name: self.name.clone(),
            description: self.description.clone(),
            benchmarks: self.benchmarks.clone(),
            states: self.states.clone(),
            runs: self.runs.clone(),
            score_sum: self.score_sum,
        }
    }
}

/// Owned copy of a group, safe to hand to readers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSnapshot {
    pub name: String,
    pub description: String,
    pub benchmarks: Vec<Benchmark>,
    pub states: Vec<FireState>,
    pub runs: Vec<RunRecord>,
    pub score_sum: u64,
}

impl GroupSnapshot {
    /// Mean score rounded to two decimals, `None` before the first run.
    pub fn accuracy(&self) -> Option<f64> {
        match self.runs.len() {
            0 => None,
            n => Some((self.score_sum as f64 / n as f64 * 100.0).round() / 100.0),
        }
    }

    pub fn pending(&self) -> usize {
        self.states.iter().filter(|s| **s == FireState::Pending).count()
    }
}
