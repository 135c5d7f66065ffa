// SPDX-License-Identifier: Apache-2.0

//! Delay-driven approximate logic synthesis.
//!
//! A `Dals` run keeps an untouched golden copy of the input circuit and a
//! working copy that is approximated round by round. Each round analyzes the
//! working circuit's timing, finds the best substitute for every zero-slack
//! gate, picks the minimum-error set of gates cutting all critical paths, and
//! commits those changes for good. Rounds repeat while the measured error
//! stays below the constraint; the round that crosses it is kept.

use anyhow::{Result, anyhow};
use serde::Serialize;

use crate::aig::gate::{AigRef, GateFn};
use crate::aig::topo::{debug_assert_no_cycles, topo_order_and_cycle_check};
use crate::aig_sim::{ErrorMetric, OutputSamples, Stimulus};
use crate::candidates::{self, CandidateOptions};
use crate::selector;
use crate::timing::{DelayModel, analyze, k_most_critical_paths};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DalsOptions {
    /// Stop once the measured error reaches this value, in `[0, 1]`.
    pub error_constraint: f64,
    /// 64-pattern words simulated per input bit.
    pub sample_words: usize,
    pub top_k: usize,
    pub seed: u64,
    pub delay_model: DelayModel,
    pub error_metric: ErrorMetric,
    pub max_rounds: Option<usize>,
}

impl Default for DalsOptions {
    fn default() -> Self {
        DalsOptions {
            error_constraint: 0.15,
            sample_words: 10_000,
            top_k: 3,
            seed: 0,
            delay_model: DelayModel::default(),
            error_metric: ErrorMetric::default(),
            max_rounds: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    ErrorConstraintReached,
    /// A round found no finite cut and changed nothing.
    Stalled,
    MaxRounds,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommittedChange {
    pub target: usize,
    pub substitute: usize,
    pub complemented: bool,
    /// Error of this change alone, measured when it was a candidate.
    pub error: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundReport {
    pub round: usize,
    pub committed: Vec<CommittedChange>,
    pub error_rate: f64,
    pub golden_delay: u32,
    pub working_delay: u32,
    pub zero_slack_nodes: usize,
    pub infeasible_targets: usize,
    /// `None` when no finite cut existed.
    pub cut_weight: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub rounds: Vec<RoundReport>,
    pub stop_reason: StopReason,
    pub final_error: f64,
    pub golden_delay: u32,
    pub final_delay: u32,
    pub golden_gate_count: usize,
    pub final_gate_count: usize,
}

pub struct Dals {
    golden: GateFn,
    working: GateFn,
    options: DalsOptions,
    stimulus: Stimulus,
    golden_outputs: OutputSamples,
    golden_delay: u32,
}

fn precondition(message: String) -> anyhow::Error {
    log::error!("dals: {}", message);
    anyhow!(message)
}

fn check_circuit(circuit: &GateFn) -> Result<()> {
    if circuit.output_bit_count() == 0 {
        return Err(precondition(format!(
            "circuit {} has no output bits",
            circuit.name
        )));
    }
    if !circuit.gates.iter().any(|node| node.is_gate()) {
        return Err(precondition(format!("circuit {} has no gates", circuit.name)));
    }
    let node_count = circuit.gates.len();
    let out_of_range = circuit
        .gates
        .iter()
        .flat_map(|node| node.get_args())
        .chain(circuit.output_operands().iter().map(|op| op.node))
        .find(|r| r.id >= node_count);
    if let Some(r) = out_of_range {
        return Err(precondition(format!(
            "circuit {} references %{} outside its {} nodes",
            circuit.name, r.id, node_count
        )));
    }
    if let (_, Some(not_visited)) = topo_order_and_cycle_check(&circuit.gates) {
        return Err(precondition(format!(
            "circuit {} is cyclic; nodes on or behind a cycle: {:?}",
            circuit.name, not_visited
        )));
    }
    Ok(())
}

fn check_options(options: &DalsOptions) -> Result<()> {
    if !(0.0..=1.0).contains(&options.error_constraint) {
        return Err(precondition(format!(
            "error constraint {} is outside [0, 1]",
            options.error_constraint
        )));
    }
    if options.sample_words == 0 {
        return Err(precondition("sample word count must be positive".to_string()));
    }
    if options.top_k == 0 {
        return Err(precondition("top-K must be positive".to_string()));
    }
    Ok(())
}

fn critical_delay(gate_fn: &GateFn, model: &DelayModel) -> u32 {
    let delay = analyze(gate_fn, model).max_delay;
    if log::log_enabled!(log::Level::Trace) {
        if let Some(path) = k_most_critical_paths(gate_fn, model, 1).first() {
            let names: Vec<String> = path.path.iter().map(|r| gate_fn.node_name(*r)).collect();
            log::trace!("critical path ({}): {}", path.max_delay, names.join(" -> "));
        }
    }
    delay
}

impl Dals {
    /// Copies `circuit` into the golden and working circuits and draws the
    /// shared stimulus.
    pub fn new(circuit: &GateFn, options: DalsOptions) -> Result<Self> {
        check_options(&options)?;
        check_circuit(circuit)?;
        let golden = circuit.clone();
        let working = circuit.clone();
        let stimulus = Stimulus::random(&golden, options.sample_words, options.seed);
        let golden_outputs = OutputSamples::capture(&golden, &stimulus)?;
        let golden_delay = critical_delay(&golden, &options.delay_model);
        log::info!(
            "dals: {} with {} gates, delay {}, constraint {}, {} sample words",
            golden.name,
            golden.gate_count(),
            golden_delay,
            options.error_constraint,
            options.sample_words
        );
        Ok(Dals {
            golden,
            working,
            options,
            stimulus,
            golden_outputs,
            golden_delay,
        })
    }

    pub fn golden(&self) -> &GateFn {
        &self.golden
    }

    pub fn working(&self) -> &GateFn {
        &self.working
    }

    pub fn into_working(self) -> GateFn {
        self.working
    }

    pub fn options(&self) -> &DalsOptions {
        &self.options
    }

    /// Error of the working circuit against the golden one.
    pub fn error_rate(&self) -> Result<f64> {
        let approx = OutputSamples::capture(&self.working, &self.stimulus)?;
        self.golden_outputs
            .error_rate(&approx, self.options.error_metric)
    }

    /// One analyze, select, commit and measure step. Commits nothing when no
    /// finite cut exists.
    pub fn run_round(&mut self, round: usize) -> Result<RoundReport> {
        let model = self.options.delay_model;
        let timing = analyze(&self.working, &model);
        let zero_slack = timing.zero_slack_nodes();
        let targets: Vec<AigRef> = zero_slack
            .iter()
            .copied()
            .filter(|r| !self.working.is_source(*r))
            .collect();

        let mut cands = candidates::generate(
            &mut self.working,
            &self.golden_outputs,
            &self.stimulus,
            &timing,
            &targets,
            &CandidateOptions {
                top_k: self.options.top_k,
            },
            self.options.error_metric,
        )?;
        let selection = selector::select(&self.working, &timing, &model, &cands);

        let mut committed = Vec::with_capacity(selection.nodes.len());
        for node in &selection.nodes {
            let mut alc = cands.take_optimal(*node).ok_or_else(|| {
                anyhow!(
                    "selected {} has no approximate change",
                    self.working.node_name(*node)
                )
            })?;
            alc.apply(&mut self.working)?;
            committed.push(CommittedChange {
                target: alc.target().id,
                substitute: alc.substitute().id,
                complemented: alc.is_complemented(),
                error: alc.error(),
            });
        }
        debug_assert_no_cycles(&self.working.gates, "dals commit");

        let report = RoundReport {
            round,
            committed,
            error_rate: self.error_rate()?,
            golden_delay: self.golden_delay,
            working_delay: critical_delay(&self.working, &model),
            zero_slack_nodes: zero_slack.len(),
            infeasible_targets: cands.stats.infeasible_targets,
            cut_weight: selection.max_flow.as_finite(),
        };
        log::info!(
            "round {}: committed {}, error {:.6}, delay {} -> {}",
            report.round,
            report.committed.len(),
            report.error_rate,
            report.golden_delay,
            report.working_delay
        );
        Ok(report)
    }

    /// Runs rounds until the error constraint is reached, a round stalls, or
    /// `max_rounds` rounds have run.
    pub fn run(&mut self) -> Result<RunSummary> {
        let mut rounds: Vec<RoundReport> = Vec::new();
        let mut error = self.error_rate()?;
        let stop_reason = loop {
            if error >= self.options.error_constraint {
                break StopReason::ErrorConstraintReached;
            }
            if self
                .options
                .max_rounds
                .is_some_and(|max| rounds.len() >= max)
            {
                break StopReason::MaxRounds;
            }
            let report = self.run_round(rounds.len() + 1)?;
            error = report.error_rate;
            let stalled = report.committed.is_empty();
            rounds.push(report);
            if stalled {
                log::warn!(
                    "round {}: no finite cut, stopping at error {:.6}",
                    rounds.len(),
                    error
                );
                break StopReason::Stalled;
            }
        };

        let summary = RunSummary {
            stop_reason,
            final_error: error,
            golden_delay: self.golden_delay,
            final_delay: critical_delay(&self.working, &self.options.delay_model),
            golden_gate_count: self.golden.gate_count(),
            final_gate_count: self.working.gate_count(),
            rounds,
        };
        log::info!(
            "dals: {:?} after {} rounds, error {:.6}, delay {} -> {}",
            summary.stop_reason,
            summary.rounds.len(),
            summary.final_error,
            summary.golden_delay,
            summary.final_delay
        );
        Ok(summary)
    }
}
