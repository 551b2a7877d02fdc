//! Termination classification and the behavioural report.

use crate::sim::{enumerate_runs, SequenceRun, SimConfig, Step};
use rdlt_pn::{PetriNet, PlaceRole};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use tracing::info;

/// Per-sequence termination class, judged on the final marking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TerminationType {
    /// The sink never received a token.
    None,
    /// Exactly one token on the sink, every other place empty.
    Proper,
    /// Exactly one token on the sink, residue elsewhere.
    Weak,
    /// More than one token reached the sink.
    Option,
}

/// Aggregate termination across all sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AggregateTermination {
    None,
    Classical,
    Relaxed,
    Lazy,
    Easy,
}

/// Overall soundness verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Soundness {
    Classical,
    Weak,
    Relaxed,
    Lazy,
    Easy,
    NoConclusion,
}

/// Raw observations behind a sequence's termination class.
#[derive(Debug, Clone, Serialize)]
pub struct TerminationChecks {
    pub sink_tokens: u64,
    pub other_tokens: u64,
    pub sink_marked: bool,
    pub others_clear: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SequenceResult {
    pub sequence_index: usize,
    pub option: String,
    pub termination_checks: TerminationChecks,
    pub termination_type: TerminationType,
    /// Fired sets per step, initial step omitted.
    pub firing_sequence: Vec<Vec<String>>,
    /// RDLT arc descriptors of the fired traverse transitions, in order.
    pub activity_extraction: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BehaviouralReport {
    pub simulation_results: Vec<Vec<Step>>,
    pub per_sequence_results: Vec<SequenceResult>,
    pub overall_liveness: bool,
    pub overall_termination: AggregateTermination,
    pub overall_soundness: Soundness,
}

/// Run the simulator and classify the outcome.
pub fn analyze_behaviour(net: &mut PetriNet, config: &SimConfig) -> BehaviouralReport {
    let sink = net
        .places()
        .iter()
        .find(|p| p.role == PlaceRole::GlobalSink)
        .map(|p| p.id.clone());
    let runs = enumerate_runs(net, config);

    let per_sequence: Vec<SequenceResult> = runs
        .iter()
        .enumerate()
        .map(|(i, run)| sequence_result(net, i, run, sink.as_deref()))
        .collect();

    let types: Vec<TerminationType> = per_sequence.iter().map(|s| s.termination_type).collect();
    let overall_termination = aggregate(&types);

    let fired: HashSet<&str> = runs
        .iter()
        .flat_map(|r| r.steps.iter())
        .flat_map(|s| s.fired.iter().map(String::as_str))
        .collect();
    let overall_liveness =
        !net.transitions().is_empty() && net.transitions().iter().all(|t| fired.contains(t.id.as_str()));

    let overall_soundness = soundness(overall_termination, overall_liveness);
    info!(
        sequences = runs.len(),
        ?overall_termination,
        ?overall_soundness,
        liveness = overall_liveness,
        "behavioural analysis complete"
    );

    BehaviouralReport {
        simulation_results: runs.into_iter().map(|r| r.steps).collect(),
        per_sequence_results: per_sequence,
        overall_liveness,
        overall_termination,
        overall_soundness,
    }
}

fn sequence_result(
    net: &PetriNet,
    index: usize,
    run: &SequenceRun,
    sink: Option<&str>,
) -> SequenceResult {
    let empty = BTreeMap::new();
    let final_marking = run.steps.last().map(|s| &s.marking).unwrap_or(&empty);
    let checks = termination_checks(final_marking, sink);
    let termination_type = classify(&checks);

    let firing_sequence: Vec<Vec<String>> = run
        .steps
        .iter()
        .filter(|s| !s.fired.is_empty())
        .map(|s| s.fired.clone())
        .collect();
    let activity_extraction: Vec<String> = run
        .steps
        .iter()
        .flat_map(|s| s.fired.iter())
        .filter_map(|t| net.transition(t).and_then(|t| t.activities.clone()))
        .collect();

    SequenceResult {
        sequence_index: index,
        option: run.option.clone(),
        termination_checks: checks,
        termination_type,
        firing_sequence,
        activity_extraction,
    }
}

fn termination_checks(marking: &BTreeMap<String, u64>, sink: Option<&str>) -> TerminationChecks {
    let sink_tokens = sink
        .and_then(|s| marking.get(s).copied())
        .unwrap_or(0);
    let other_tokens: u64 = marking
        .iter()
        .filter(|(id, _)| Some(id.as_str()) != sink)
        .map(|(_, &tokens)| tokens)
        .sum();
    TerminationChecks {
        sink_tokens,
        other_tokens,
        sink_marked: sink_tokens >= 1,
        others_clear: other_tokens == 0,
    }
}

fn classify(checks: &TerminationChecks) -> TerminationType {
    match (checks.sink_tokens, checks.others_clear) {
        (0, _) => TerminationType::None,
        (1, true) => TerminationType::Proper,
        (1, false) => TerminationType::Weak,
        _ => TerminationType::Option,
    }
}

fn aggregate(types: &[TerminationType]) -> AggregateTermination {
    if types.is_empty() {
        return AggregateTermination::None;
    }
    if types.iter().all(|&t| t == TerminationType::Proper) {
        AggregateTermination::Classical
    } else if types.iter().any(|&t| t == TerminationType::Proper) {
        AggregateTermination::Relaxed
    } else if types.iter().all(|&t| t == TerminationType::Weak) {
        AggregateTermination::Lazy
    } else if types.iter().any(|&t| t == TerminationType::Option) {
        AggregateTermination::Easy
    } else {
        // all None, or a residue mix with nothing stronger to say
        AggregateTermination::None
    }
}

fn soundness(termination: AggregateTermination, liveness: bool) -> Soundness {
    match (termination, liveness) {
        (AggregateTermination::Classical, true) => Soundness::Classical,
        (AggregateTermination::Classical, false) => Soundness::Weak,
        (AggregateTermination::Relaxed, true) => Soundness::Relaxed,
        (AggregateTermination::Relaxed, false) => Soundness::Easy,
        (AggregateTermination::Lazy, _) => Soundness::Lazy,
        (AggregateTermination::Easy, _) => Soundness::Easy,
        (AggregateTermination::None, _) => Soundness::NoConclusion,
    }
}
