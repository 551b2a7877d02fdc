//! Petri-net model with typed arcs and a transactional marking snapshot.
//!
//! Topology is frozen once the mapper returns; only markings (and the
//! transient enabled/fired flags) change during simulation. The snapshot is
//! single-level: the first `update_state` wins until `revert_state`.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum PlaceRole {
    Plain,
    GlobalSource,
    GlobalSink,
    Split,
    Checked,
    Traversed,
    Auxiliary {
        /// Transition this place's budget gates; receives the clear-on-fire
        /// reset arc in mapper step 8.
        reset_target: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        rbs_group: Option<String>,
        initial_tokens: u64,
    },
    Consensus,
    Unconstrained,
    MixJoin,
}

impl PlaceRole {
    pub fn is_auxiliary(&self) -> bool {
        matches!(self, PlaceRole::Auxiliary { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Place {
    pub id: String,
    pub tokens: u64,
    #[serde(flatten)]
    pub role: PlaceRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionRole {
    Check,
    Traverse,
    Reset,
}

#[derive(Debug, Clone, Serialize)]
pub struct Transition {
    pub id: String,
    pub role: TransitionRole,
    /// Comma-separated RDLT arc descriptors, for activity extraction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activities: Option<String>,
    #[serde(skip)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArcKind {
    Normal,
    Reset,
    /// Intermediate marker between mapper steps 1 and 4 only.
    Abstract,
}

#[derive(Debug, Clone, Serialize)]
pub struct Arc {
    pub from: String,
    pub to: String,
    pub kind: ArcKind,
    pub weight: u64,
    #[serde(skip)]
    pub fired: bool,
}

#[derive(Debug, Clone)]
struct Snapshot {
    tokens: Vec<u64>,
    enabled: Vec<bool>,
    fired: Vec<bool>,
}

/// A Petri net under construction or analysis.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PetriNet {
    places: Vec<Place>,
    transitions: Vec<Transition>,
    arcs: Vec<Arc>,
    #[serde(skip)]
    place_index: HashMap<String, usize>,
    #[serde(skip)]
    transition_index: HashMap<String, usize>,
    #[serde(skip)]
    snapshot: Option<Snapshot>,
}

impl PetriNet {
    pub fn new() -> Self {
        PetriNet::default()
    }

    /// Add a place; duplicate ids indicate a mapper bug.
    pub fn add_place(&mut self, id: impl Into<String>, role: PlaceRole, tokens: u64) -> bool {
        let id = id.into();
        if self.place_index.contains_key(&id) {
            return false;
        }
        self.place_index.insert(id.clone(), self.places.len());
        self.places.push(Place { id, tokens, role });
        true
    }

    pub fn add_transition(
        &mut self,
        id: impl Into<String>,
        role: TransitionRole,
        activities: Option<String>,
    ) -> bool {
        let id = id.into();
        if self.transition_index.contains_key(&id) {
            return false;
        }
        self.transition_index.insert(id.clone(), self.transitions.len());
        self.transitions.push(Transition {
            id,
            role,
            activities,
            enabled: false,
        });
        true
    }

    pub fn add_arc(&mut self, from: impl Into<String>, to: impl Into<String>, kind: ArcKind, weight: u64) {
        self.arcs.push(Arc {
            from: from.into(),
            to: to.into(),
            kind,
            weight,
            fired: false,
        });
    }

    pub fn has_arc(&self, from: &str, to: &str, kind: ArcKind) -> bool {
        self.arcs
            .iter()
            .any(|a| a.from == from && a.to == to && a.kind == kind)
    }

    /// Remove the first arc matching `(from, to, kind)`; true if one existed.
    pub fn remove_arc(&mut self, from: &str, to: &str, kind: ArcKind) -> bool {
        if let Some(pos) = self
            .arcs
            .iter()
            .position(|a| a.from == from && a.to == to && a.kind == kind)
        {
            self.arcs.remove(pos);
            true
        } else {
            false
        }
    }

    pub fn place(&self, id: &str) -> Option<&Place> {
        self.place_index.get(id).map(|&i| &self.places[i])
    }

    pub fn place_mut(&mut self, id: &str) -> Option<&mut Place> {
        let i = *self.place_index.get(id)?;
        Some(&mut self.places[i])
    }

    pub fn transition(&self, id: &str) -> Option<&Transition> {
        self.transition_index.get(id).map(|&i| &self.transitions[i])
    }

    pub fn transition_mut(&mut self, id: &str) -> Option<&mut Transition> {
        let i = *self.transition_index.get(id)?;
        Some(&mut self.transitions[i])
    }

    pub fn has_place(&self, id: &str) -> bool {
        self.place_index.contains_key(id)
    }

    pub fn has_transition(&self, id: &str) -> bool {
        self.transition_index.contains_key(id)
    }

    pub fn places(&self) -> &[Place] {
        &self.places
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn arcs(&self) -> &[Arc] {
        &self.arcs
    }

    pub fn arcs_mut(&mut self) -> &mut [Arc] {
        &mut self.arcs
    }

    pub fn arcs_into<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Arc> {
        self.arcs.iter().filter(move |a| a.to == id)
    }

    pub fn arcs_from<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Arc> {
        self.arcs.iter().filter(move |a| a.from == id)
    }

    /// Current marking as a total map over places.
    pub fn marking(&self) -> BTreeMap<String, u64> {
        self.places
            .iter()
            .map(|p| (p.id.clone(), p.tokens))
            .collect()
    }

    pub fn set_marking(&mut self, marking: &BTreeMap<String, u64>) {
        for p in &mut self.places {
            p.tokens = marking.get(&p.id).copied().unwrap_or(0);
        }
    }

    /// Capture tokens, enabled flags and fired flags. Idempotent: a second
    /// call without an intervening revert keeps the first snapshot.
    pub fn update_state(&mut self) {
        if self.snapshot.is_some() {
            return;
        }
        self.snapshot = Some(Snapshot {
            tokens: self.places.iter().map(|p| p.tokens).collect(),
            enabled: self.transitions.iter().map(|t| t.enabled).collect(),
            fired: self.arcs.iter().map(|a| a.fired).collect(),
        });
    }

    /// Restore the captured state and discard the snapshot. No-op when no
    /// snapshot is held.
    pub fn revert_state(&mut self) {
        let Some(snapshot) = self.snapshot.take() else {
            return;
        };
        for (p, tokens) in self.places.iter_mut().zip(snapshot.tokens) {
            p.tokens = tokens;
        }
        for (t, enabled) in self.transitions.iter_mut().zip(snapshot.enabled) {
            t.enabled = enabled;
        }
        for (a, fired) in self.arcs.iter_mut().zip(snapshot.fired) {
            a.fired = fired;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_net() -> PetriNet {
        let mut net = PetriNet::new();
        net.add_place("p", PlaceRole::Plain, 3);
        net.add_transition("t", TransitionRole::Check, None);
        net.add_arc("p", "t", ArcKind::Normal, 1);
        net
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut net = tiny_net();
        assert!(!net.add_place("p", PlaceRole::Plain, 0));
        assert!(!net.add_transition("t", TransitionRole::Check, None));
    }

    #[test]
    fn remove_arc_takes_one_instance() {
        let mut net = tiny_net();
        net.add_arc("p", "t", ArcKind::Normal, 1);
        assert!(net.remove_arc("p", "t", ArcKind::Normal));
        assert_eq!(net.arcs().len(), 1, "parallel arc survives");
    }

    #[test]
    fn snapshot_restores_tokens_and_flags() {
        let mut net = tiny_net();
        net.update_state();
        net.place_mut("p").unwrap().tokens = 0;
        net.transition_mut("t").unwrap().enabled = true;
        net.arcs_mut()[0].fired = true;
        net.revert_state();
        assert_eq!(net.place("p").unwrap().tokens, 3);
        assert!(!net.transition("t").unwrap().enabled);
        assert!(!net.arcs()[0].fired);
    }

    #[test]
    fn snapshot_does_not_stack() {
        let mut net = tiny_net();
        net.update_state();
        net.place_mut("p").unwrap().tokens = 1;
        // second capture without revert must keep the original snapshot
        net.update_state();
        net.place_mut("p").unwrap().tokens = 0;
        net.revert_state();
        assert_eq!(net.place("p").unwrap().tokens, 3);
    }

    #[test]
    fn revert_without_snapshot_is_a_noop() {
        let mut net = tiny_net();
        net.place_mut("p").unwrap().tokens = 1;
        net.revert_state();
        assert_eq!(net.place("p").unwrap().tokens, 1);
    }
}
