//! Depth-first enumeration of concurrent firing sequences.
//!
//! One step fires a set of transitions simultaneously. Enabled transitions
//! are partitioned into conflict groups by their non-auxiliary normal input
//! places; singleton residues fire unconditionally, larger residues become
//! split-groups whose Cartesian product spans the alternatives for the step.
//! Split-group keys are visited in sorted order so sequence indexing is
//! reproducible.

use rdlt_pn::{ArcKind, PetriNet};
use serde::Serialize;
use smallvec::SmallVec;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

/// Sentinel group key for transitions with no non-auxiliary normal input.
const NO_INPUT_GROUP: &str = "__none__";

#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Per-run step bound; recursion stops when a run reaches it.
    pub max_steps: usize,
    /// Cap on enumerated sequences; branches beyond it are dropped with a
    /// warning.
    pub max_sequences: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            max_steps: 1000,
            max_sequences: 1024,
        }
    }
}

/// One step of one run: the marking it produced, the set fired to produce
/// it, and (retrofitted once the next state is inspected) the transitions
/// enabled in that marking.
#[derive(Debug, Clone, Serialize)]
pub struct Step {
    pub marking: BTreeMap<String, u64>,
    pub fired: Vec<String>,
    pub enabled_transitions: Vec<String>,
    pub log: String,
}

/// One complete run: its steps plus the branch signature that selected it.
#[derive(Debug, Clone, Serialize)]
pub struct SequenceRun {
    pub option: String,
    pub steps: Vec<Step>,
}

/// Enumerate every firing sequence of `net` from its current marking.
///
/// The net's marking and flags are captured with `update_state` before the
/// first mutation and restored afterwards, so the canonical initial marking
/// survives the enumeration.
pub fn enumerate_runs(net: &mut PetriNet, config: &SimConfig) -> Vec<SequenceRun> {
    net.update_state();
    let initial = net.marking();
    let mut runs = Vec::new();
    let initial_step = Step {
        marking: initial.clone(),
        fired: Vec::new(),
        enabled_transitions: Vec::new(),
        log: "initial marking".to_string(),
    };
    let mut path: Vec<usize> = Vec::new();
    explore(net, initial, vec![initial_step], 0, &mut path, &mut runs, config);
    net.revert_state();
    debug!(runs = runs.len(), "enumeration complete");
    runs
}

fn explore(
    net: &mut PetriNet,
    marking: BTreeMap<String, u64>,
    mut steps: Vec<Step>,
    depth: usize,
    path: &mut Vec<usize>,
    runs: &mut Vec<SequenceRun>,
    config: &SimConfig,
) {
    if runs.len() >= config.max_sequences {
        warn!(cap = config.max_sequences, "sequence cap reached, dropping branch");
        return;
    }

    net.set_marking(&marking);
    let enabled = enabled_transitions(net, &marking);
    for id in &enabled {
        if let Some(t) = net.transition_mut(id) {
            t.enabled = true;
        }
    }
    if let Some(last) = steps.last_mut() {
        last.enabled_transitions = enabled.clone();
    }

    if enabled.is_empty() || depth >= config.max_steps {
        runs.push(SequenceRun {
            option: path.iter().map(usize::to_string).collect::<Vec<_>>().join("."),
            steps,
        });
        return;
    }

    let (uniques, split_groups) = conflict_groups(net, &enabled);
    let alternatives = cartesian(&split_groups);
    for (alt_idx, picks) in alternatives.iter().enumerate() {
        let mut firing: Vec<String> = uniques.clone();
        firing.extend(picks.iter().cloned());
        let next = fire(net, &marking, &firing);
        let step = Step {
            marking: next.clone(),
            fired: firing.clone(),
            enabled_transitions: Vec::new(),
            log: format!("fired {{{}}}", firing.join(", ")),
        };
        let mut extended = steps.clone();
        extended.push(step);
        path.push(alt_idx);
        explore(net, next, extended, depth + 1, path, runs, config);
        path.pop();
    }
}

/// Transitions whose normal inputs are all satisfied. Reset arcs never gate.
pub fn enabled_transitions(net: &PetriNet, marking: &BTreeMap<String, u64>) -> Vec<String> {
    net.transitions()
        .iter()
        .filter(|t| {
            net.arcs_into(&t.id)
                .filter(|a| a.kind == ArcKind::Normal)
                .all(|a| marking.get(&a.from).copied().unwrap_or(0) >= a.weight)
        })
        .map(|t| t.id.clone())
        .collect()
}

/// Partition enabled transitions into the unconditional set and the
/// split-groups. A transition joins at most one group; group keys are
/// processed in sorted order.
pub fn conflict_groups(
    net: &PetriNet,
    enabled: &[String],
) -> (Vec<String>, Vec<(String, Vec<String>)>) {
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for t in enabled {
        let inputs: SmallVec<[&str; 4]> = net
            .arcs_into(t)
            .filter(|a| a.kind == ArcKind::Normal)
            .filter(|a| {
                net.place(&a.from)
                    .map(|p| !p.role.is_auxiliary())
                    .unwrap_or(false)
            })
            .map(|a| a.from.as_str())
            .collect();
        if inputs.is_empty() {
            groups.entry(NO_INPUT_GROUP.to_string()).or_default().push(t.clone());
        } else {
            for p in inputs {
                groups.entry(p.to_string()).or_default().push(t.clone());
            }
        }
    }

    let mut seen: HashSet<String> = HashSet::new();
    let mut uniques = Vec::new();
    let mut split_groups = Vec::new();
    for (key, members) in groups {
        let residue: Vec<String> = members
            .into_iter()
            .filter(|t| seen.insert(t.clone()))
            .collect();
        match residue.len() {
            0 => {}
            1 => uniques.extend(residue),
            _ => split_groups.push((key, residue)),
        }
    }
    (uniques, split_groups)
}

/// Cartesian product over split-group members; one empty pick set when
/// there are no split-groups.
fn cartesian(split_groups: &[(String, Vec<String>)]) -> Vec<Vec<String>> {
    let mut picks: Vec<Vec<String>> = vec![Vec::new()];
    for (_, members) in split_groups {
        let mut next = Vec::with_capacity(picks.len() * members.len());
        for prefix in &picks {
            for m in members {
                let mut choice = prefix.clone();
                choice.push(m.clone());
                next.push(choice);
            }
        }
        picks = next;
    }
    picks
}

/// Fire a set of transitions simultaneously: subtract normal inputs, then
/// zero reset sources, then add normal outputs.
pub fn fire(net: &mut PetriNet, marking: &BTreeMap<String, u64>, set: &[String]) -> BTreeMap<String, u64> {
    let mut next = marking.clone();
    for t in set {
        for arc in net.arcs_into(t).filter(|a| a.kind == ArcKind::Normal) {
            if let Some(tokens) = next.get_mut(&arc.from) {
                *tokens = tokens.saturating_sub(arc.weight);
            }
        }
    }
    for t in set {
        let resets: Vec<String> = net
            .arcs_into(t)
            .filter(|a| a.kind == ArcKind::Reset)
            .map(|a| a.from.clone())
            .collect();
        for p in resets {
            next.insert(p, 0);
        }
    }
    for t in set {
        for arc in net.arcs_from(t).filter(|a| a.kind == ArcKind::Normal) {
            if net.has_place(&arc.to) {
                *next.entry(arc.to.clone()).or_insert(0) += arc.weight;
            }
        }
    }
    // fired flags feed the state snapshot, not the report
    let fired: Vec<(String, String)> = set
        .iter()
        .flat_map(|t| {
            net.arcs_into(t)
                .map(|a| (a.from.clone(), a.to.clone()))
                .chain(net.arcs_from(t).map(|a| (a.from.clone(), a.to.clone())))
                .collect::<Vec<_>>()
        })
        .collect();
    for arc in net.arcs_mut() {
        if fired.iter().any(|(f, t)| *f == arc.from && *t == arc.to) {
            arc.fired = true;
        }
    }
    next
}
