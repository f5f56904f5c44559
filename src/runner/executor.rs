//! Scenario Executor
//!
//! Drives each scenario end to end: launch the server, wait for it, fire
//! every request concurrently, match the responses and stop the server.

use super::matcher::{compare, ResponseSnapshot};
use super::report::{EntryFailure, FailureReport, RunSummary};
use crate::config::{TestConfig, TestEntry, TestPlan};
use crate::error::{Result, TesterError};
use crate::harness::{ProcessLauncher, Readiness, ServerGuard, ServerLauncher};
use futures::future::join_all;
use std::path::Path;
use std::time::{Duration, Instant};
use url::Url;

/// Overrides applied to every scenario of a run
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Replaces each scenario's fixed warm-up delay
    pub warmup: Option<Duration>,

    /// Replaces each scenario's per-request timeout
    pub request_timeout: Option<Duration>,
}

/// Runs test plans against servers started by `L`
pub struct TestRunner<L = ProcessLauncher> {
    launcher: L,
    options: RunOptions,
}

impl TestRunner<ProcessLauncher> {
    pub fn new() -> Self {
        Self::with_launcher(ProcessLauncher)
    }
}

impl Default for TestRunner<ProcessLauncher> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: ServerLauncher> TestRunner<L> {
    pub fn with_launcher(launcher: L) -> Self {
        Self {
            launcher,
            options: RunOptions::default(),
        }
    }

    pub fn options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Run every scenario in order, stopping at the first failure.
    ///
    /// Each scenario's server is terminated before the next one starts.
    pub async fn run_all(&self, plan: &TestPlan) -> Result<RunSummary> {
        let started = Instant::now();
        let mut summary = RunSummary::default();

        for (index, scenario) in plan.scenarios.iter().enumerate() {
            summary.entries += self.run_scenario(&plan.source, index, scenario).await?;
            summary.scenarios += 1;
        }

        summary.duration = started.elapsed();
        Ok(summary)
    }

    /// Run one scenario and return the number of entries checked
    pub async fn run_scenario(
        &self,
        source: &Path,
        index: usize,
        scenario: &TestConfig,
    ) -> Result<usize> {
        let name = scenario.display_name(index);
        log::info!("Running {}: {}", name, scenario.invocation());

        let server = ServerGuard::start(
            &self.launcher,
            &scenario.server_path,
            &scenario.arguments,
        )?;
        let outcome = self.exercise(source, index, scenario).await;
        server.stop().await;

        match &outcome {
            Ok(checked) => log::info!("{} passed ({} entries)", name, checked),
            Err(e) => log::error!("{} failed: {}", name, e),
        }
        outcome
    }

    async fn exercise(
        &self,
        source: &Path,
        index: usize,
        scenario: &TestConfig,
    ) -> Result<usize> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.options.request_timeout.or(scenario.request_timeout()) {
            builder = builder.timeout(timeout);
        }
        // Scoped to this scenario so no connection outlives the server
        let client = builder.build().map_err(|source| TesterError::Request {
            url: scenario.base_address.clone(),
            source,
        })?;

        Readiness::for_scenario(scenario, self.options.warmup)?
            .wait(&client)
            .await?;

        let base =
            Url::parse(&scenario.base_address).map_err(|source| TesterError::InvalidUrl {
                base: scenario.base_address.clone(),
                url: String::new(),
                source,
            })?;

        let requests = scenario
            .test_entries
            .iter()
            .map(|entry| fetch(&client, &base, entry));

        // Barrier: every response is in before any is judged
        let responses = join_all(requests).await;

        let mut failures = Vec::new();
        for (entry, response) in scenario.test_entries.iter().zip(responses) {
            let mismatches = compare(entry, &response?);
            log::debug!("{} -> {} mismatch(es)", entry.url, mismatches.len());
            if !mismatches.is_empty() {
                failures.push(EntryFailure {
                    entry: entry.clone(),
                    mismatches,
                });
            }
        }

        if !failures.is_empty() {
            return Err(TesterError::MatchFailure(Box::new(FailureReport {
                config_path: source.to_path_buf(),
                scenario_index: index,
                scenario_name: scenario.display_name(index),
                server_invocation: scenario.invocation(),
                base_address: scenario.base_address.clone(),
                failures,
            })));
        }

        Ok(scenario.test_entries.len())
    }
}

async fn fetch(
    client: &reqwest::Client,
    base: &Url,
    entry: &TestEntry,
) -> Result<ResponseSnapshot> {
    let url = base.join(&entry.url).map_err(|source| TesterError::InvalidUrl {
        base: base.to_string(),
        url: entry.url.clone(),
        source,
    })?;

    log::debug!("GET {}", url);

    let request_error = |source: reqwest::Error| TesterError::Request {
        url: url.to_string(),
        source,
    };

    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(request_error)?;

    ResponseSnapshot::read(response).await.map_err(request_error)
}
