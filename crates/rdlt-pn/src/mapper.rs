//! The nine-step structural mapper from a combined RDLT to a Petri net.
//!
//! Steps run strictly in order and only mutate the growing net. Each step
//! returns a structured log entry; the per-vertex split classification is
//! reported alongside so callers can surface it.

use crate::alias::AliasRegistry;
use crate::net::{ArcKind, PetriNet, PlaceRole, TransitionRole};
use rdlt_evsa::{prime, Combined};
use rdlt_model::{classify_split, EdgeAttr, Rdlt, RdltError, SplitCase};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum MapError {
    #[error(transparent)]
    Model(#[from] RdltError),

    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),
}

/// Log entry for one mapper step.
#[derive(Debug, Clone, Serialize)]
pub struct StepLog {
    pub step: u8,
    pub title: String,
    pub lines: Vec<String>,
}

/// Result of mapping: the net, the per-step logs, and the split report.
#[derive(Debug)]
pub struct MapOutput {
    pub net: PetriNet,
    pub logs: Vec<StepLog>,
    pub split_cases: Vec<(String, SplitCase)>,
}

/// One RDLT edge tracked through the rewrite: `src`/`dst` follow the arc the
/// edge currently occupies in the net.
struct EdgeCtx {
    from: String,
    to: String,
    attr: EdgeAttr,
    src: String,
    dst: String,
}

impl EdgeCtx {
    fn arc_kind(&self) -> ArcKind {
        if self.attr.is_abstract() {
            ArcKind::Abstract
        } else {
            ArcKind::Normal
        }
    }
}

/// Bookkeeping for an auxiliary place, consumed by step 8.
struct AuxRecord {
    place: String,
    reset_target: String,
    /// RDLT vertex behind the reset target.
    vertex: String,
    rbs_group: Option<String>,
    initial: u64,
}

struct Mapper<'a> {
    rdlt: &'a Rdlt,
    source: Option<&'a str>,
    sink: Option<&'a str>,
    net: PetriNet,
    edges: Vec<EdgeCtx>,
    split_vertices: HashSet<String>,
    aux: Vec<AuxRecord>,
    eps_by_target: HashMap<String, Vec<String>>,
    mix_joins: Vec<String>,
    aliases: AliasRegistry,
    logs: Vec<StepLog>,
}

fn t_of(v: &str) -> String {
    format!("T{v}")
}

fn p_m(v: &str) -> String {
    format!("P{v}m")
}

fn p_split(v: &str) -> String {
    format!("P{v}split")
}

fn tj_of(v: &str) -> String {
    format!("TJ{v}")
}

fn pj_of(v: &str) -> String {
    format!("PJ{v}")
}

fn pcons_of(c: &str) -> String {
    format!("Pcons{c}")
}

fn trr_of(c: &str) -> String {
    format!("Trr{c}")
}

/// Run all nine steps over the combined RDLT and audit the invariants.
pub fn map_to_petri_net(combined: &Combined) -> Result<MapOutput, MapError> {
    let sigma_constraints: Vec<String> = combined
        .rdlt
        .edge_views()
        .filter(|(_, _, _, attr)| !attr.is_epsilon())
        .map(|(_, _, _, attr)| attr.c.clone())
        .collect();

    let mut mapper = Mapper {
        rdlt: &combined.rdlt,
        source: combined.source.as_deref(),
        sink: combined.sink.as_deref(),
        net: PetriNet::new(),
        edges: Vec::new(),
        split_vertices: HashSet::new(),
        aux: Vec::new(),
        eps_by_target: HashMap::new(),
        mix_joins: Vec::new(),
        aliases: AliasRegistry::build(&sigma_constraints),
        logs: Vec::new(),
    };

    mapper.step1_transitions();
    let split_cases = mapper.step2_split_places();
    mapper.step3_traversed_places();
    mapper.step4_epsilon_transitions();
    mapper.step5_sigma_places();
    mapper.step6_consensus();
    mapper.step7_bridge_linkage();
    mapper.step8_reset_topology();
    mapper.step9_global_source();
    mapper.audit()?;

    Ok(MapOutput {
        net: mapper.net,
        logs: mapper.logs,
        split_cases,
    })
}

impl Mapper<'_> {
    fn log(&mut self, step: u8, title: &str, lines: Vec<String>) {
        debug!(step, title, entries = lines.len(), "mapper step complete");
        self.logs.push(StepLog {
            step,
            title: title.to_string(),
            lines,
        });
    }

    fn to_of(&self) -> Option<String> {
        self.sink.map(t_of)
    }

    /// Reroute the tracked arc of an edge to a new source.
    fn reroute_src(&mut self, idx: usize, new_src: String) {
        let kind = self.edges[idx].arc_kind();
        let (src, dst) = (self.edges[idx].src.clone(), self.edges[idx].dst.clone());
        self.net.remove_arc(&src, &dst, kind);
        self.net.add_arc(new_src.clone(), dst, kind, 1);
        self.edges[idx].src = new_src;
    }

    /// Reroute the tracked arc of an edge to a new target.
    fn reroute_dst(&mut self, idx: usize, new_dst: String) {
        let kind = self.edges[idx].arc_kind();
        let (src, dst) = (self.edges[idx].src.clone(), self.edges[idx].dst.clone());
        self.net.remove_arc(&src, &dst, kind);
        self.net.add_arc(src, new_dst.clone(), kind, 1);
        self.edges[idx].dst = new_dst;
    }

    /// Step 1: one check transition per vertex; edges become raw arcs.
    fn step1_transitions(&mut self) {
        let mut lines = Vec::new();
        for v in self.rdlt.vertices() {
            self.net.add_transition(t_of(&v.id), TransitionRole::Check, None);
            lines.push(format!("transition {}", t_of(&v.id)));
        }
        for (_, from, to, attr) in self.rdlt.edge_views() {
            let kind = if attr.is_abstract() {
                ArcKind::Abstract
            } else {
                ArcKind::Normal
            };
            self.net.add_arc(t_of(from), t_of(to), kind, 1);
            self.edges.push(EdgeCtx {
                from: from.to_string(),
                to: to.to_string(),
                attr: attr.clone(),
                src: t_of(from),
                dst: t_of(to),
            });
            lines.push(format!("arc {} -> {} ({:?})", t_of(from), t_of(to), kind));
        }
        self.log(1, "check transitions and raw arcs", lines);
    }

    /// Step 2: split places for split-case-1 vertices.
    fn step2_split_places(&mut self) -> Vec<(String, SplitCase)> {
        let mut lines = Vec::new();
        let cases: Vec<(String, SplitCase)> = self
            .rdlt
            .vertices()
            .map(|v| (v.id.clone(), classify_split(self.rdlt, &v.id)))
            .collect();
        for (v, case) in &cases {
            lines.push(format!("{v}: {}", case.describe()));
            if !case.is_split_case_1() {
                continue;
            }
            let split = p_split(v);
            self.net.add_place(split.clone(), PlaceRole::Split, 0);
            self.net.add_arc(t_of(v), split.clone(), ArcKind::Normal, 1);
            let outgoing: Vec<usize> = (0..self.edges.len())
                .filter(|&i| self.edges[i].from == *v)
                .collect();
            for idx in outgoing {
                self.reroute_src(idx, split.clone());
            }
            self.split_vertices.insert(v.clone());
            lines.push(format!("split place {split}"));
        }
        self.log(2, "split places", lines);
        cases
    }

    /// Step 3: traversed places, the global sink, and Σ-join scaffolding.
    fn step3_traversed_places(&mut self) {
        let mut lines = Vec::new();
        let vertices: Vec<String> = self.rdlt.vertices().map(|v| v.id.clone()).collect();
        for v in &vertices {
            let incoming: Vec<usize> = (0..self.edges.len())
                .filter(|&i| self.edges[i].to == *v)
                .collect();
            if incoming.is_empty() {
                continue;
            }
            let pm = p_m(v);
            self.net.add_place(pm.clone(), PlaceRole::Traversed, 0);
            self.net.add_arc(pm.clone(), t_of(v), ArcKind::Normal, 1);
            for &idx in &incoming {
                self.reroute_dst(idx, pm.clone());
            }
            lines.push(format!("traversed place {pm}"));

            if self.sink == Some(v.as_str()) {
                let po = format!("P{v}");
                self.net.add_place(po.clone(), PlaceRole::GlobalSink, 0);
                self.net.add_arc(t_of(v), po.clone(), ArcKind::Normal, 1);
                lines.push(format!("global sink place {po}"));
            }

            let sigma: Vec<usize> = incoming
                .iter()
                .copied()
                .filter(|&i| !self.edges[i].attr.is_epsilon())
                .collect();
            if sigma.is_empty() {
                continue;
            }
            let has_eps = incoming.iter().any(|&i| self.edges[i].attr.is_epsilon());
            if has_eps {
                self.mix_joins.push(v.clone());
            }

            let all_same_c = sigma
                .iter()
                .all(|&i| self.edges[i].attr.c == self.edges[sigma[0]].attr.c);
            let tokens = if all_same_c {
                sigma.iter().map(|&i| self.edges[i].attr.l).sum()
            } else {
                sigma
                    .iter()
                    .map(|&i| self.edges[i].attr.l)
                    .min()
                    .unwrap_or(1)
            };

            let tj = tj_of(v);
            let pj = pj_of(v);
            let activities = sigma
                .iter()
                .map(|&i| format!("({}, {})", self.edges[i].from, self.edges[i].to))
                .collect::<Vec<_>>()
                .join(", ");
            self.net
                .add_transition(tj.clone(), TransitionRole::Traverse, Some(activities));
            let rbs_group = self.rdlt.vertex(v).and_then(|vx| vx.rbs_group.clone());
            self.net.add_place(
                pj.clone(),
                PlaceRole::Auxiliary {
                    reset_target: tj.clone(),
                    rbs_group: rbs_group.clone(),
                    initial_tokens: tokens,
                },
                tokens,
            );
            self.net.add_arc(pj.clone(), tj.clone(), ArcKind::Normal, 1);
            self.net.add_arc(tj.clone(), pm.clone(), ArcKind::Normal, 1);
            for &idx in &sigma {
                self.reroute_dst(idx, tj.clone());
            }
            self.aux.push(AuxRecord {
                place: pj.clone(),
                reset_target: tj.clone(),
                vertex: v.clone(),
                rbs_group,
                initial: tokens,
            });
            lines.push(format!("join {tj} with auxiliary {pj} ({tokens} tokens)"));
        }
        self.log(3, "traversed places and joins", lines);
    }

    /// Step 4: one traverse transition per ε-edge, with checked and
    /// auxiliary gating places. Abstract arcs disappear here.
    fn step4_epsilon_transitions(&mut self) {
        let mut lines = Vec::new();
        let mut counters: HashMap<(String, String), u32> = HashMap::new();
        for idx in 0..self.edges.len() {
            if !self.edges[idx].attr.is_epsilon() {
                continue;
            }
            let from = self.edges[idx].from.clone();
            let to = self.edges[idx].to.clone();
            let attr = self.edges[idx].attr.clone();
            let n = counters.entry((to.clone(), from.clone())).or_insert(0);
            *n += 1;
            let sfx = if attr.is_abstract() || *n > 1 {
                n.to_string()
            } else {
                String::new()
            };
            let teps = format!("Tε{to}{from}{sfx}");
            let activities = match &attr.concrete_path {
                Some(path) => path
                    .windows(2)
                    .map(|w| format!("({}, {})", w[0], w[1]))
                    .collect::<Vec<_>>()
                    .join(", "),
                None => format!("({from}, {to})"),
            };
            self.net
                .add_transition(teps.clone(), TransitionRole::Traverse, Some(activities));

            let has_split = self.split_vertices.contains(&from);
            let src = self.edges[idx].src.clone();
            let dst = self.edges[idx].dst.clone();
            self.net.remove_arc(&src, &dst, self.edges[idx].arc_kind());

            if has_split {
                // The split place itself gates the branch choice.
                self.net.add_arc(src.clone(), teps.clone(), ArcKind::Normal, 1);
            } else {
                let checked = format!("Pε{to}{from}{sfx}");
                self.net.add_place(checked.clone(), PlaceRole::Checked, 0);
                self.net.add_arc(src.clone(), checked.clone(), ArcKind::Normal, 1);
                self.net.add_arc(checked.clone(), teps.clone(), ArcKind::Normal, 1);
            }
            self.net.add_arc(teps.clone(), dst.clone(), ArcKind::Normal, 1);

            let aux = format!("Pεn{to}{from}{sfx}");
            self.net.add_place(
                aux.clone(),
                PlaceRole::Auxiliary {
                    reset_target: teps.clone(),
                    rbs_group: attr.rbs_group.clone(),
                    initial_tokens: attr.l,
                },
                attr.l,
            );
            self.net.add_arc(aux.clone(), teps.clone(), ArcKind::Normal, 1);
            self.aux.push(AuxRecord {
                place: aux.clone(),
                reset_target: teps.clone(),
                vertex: to.clone(),
                rbs_group: attr.rbs_group.clone(),
                initial: attr.l,
            });
            self.eps_by_target.entry(to.clone()).or_default().push(teps.clone());
            lines.push(format!("ε-transition {teps} (auxiliary {aux}, {} tokens)", attr.l));
        }
        self.log(4, "ε-transitions", lines);
    }

    /// Step 5: checked places for Σ-edges and mix-join wiring.
    fn step5_sigma_places(&mut self) {
        let mut lines = Vec::new();
        for idx in 0..self.edges.len() {
            if self.edges[idx].attr.is_epsilon() {
                continue;
            }
            let from = self.edges[idx].from.clone();
            let to = self.edges[idx].to.clone();
            let c = self.edges[idx].attr.c.clone();
            if self.split_vertices.contains(&from) {
                // The split place already feeds TJ directly.
                continue;
            }
            let alias = self
                .aliases
                .alias(&c)
                .unwrap_or("a")
                .to_string();
            let checked = format!("P{alias}{to}");
            if self.net.add_place(checked.clone(), PlaceRole::Checked, 0) {
                lines.push(format!("checked place {checked} for constraint '{c}'"));
            }
            let src = self.edges[idx].src.clone();
            let dst = self.edges[idx].dst.clone();
            self.net.remove_arc(&src, &dst, ArcKind::Normal);
            self.net.add_arc(src.clone(), checked.clone(), ArcKind::Normal, 1);
            if !self.net.has_arc(&checked, &dst, ArcKind::Normal) {
                self.net.add_arc(checked.clone(), dst.clone(), ArcKind::Normal, 1);
            }
            self.edges[idx].src = checked;
        }

        // Mix-joins: an unconstrained place per Σ-alias, entangled with the
        // ε-transitions of the same target.
        let mix_joins = self.mix_joins.clone();
        for v in mix_joins {
            let sigma: Vec<usize> = (0..self.edges.len())
                .filter(|&i| self.edges[i].to == v && !self.edges[i].attr.is_epsilon())
                .collect();
            let mut aliases_seen: Vec<String> = Vec::new();
            for &i in &sigma {
                let alias = self
                    .aliases
                    .alias(&self.edges[i].attr.c)
                    .unwrap_or("a")
                    .to_string();
                if !aliases_seen.contains(&alias) {
                    aliases_seen.push(alias);
                }
            }
            for alias in aliases_seen {
                let mix = format!("P{alias}ε");
                self.net.add_place(mix.clone(), PlaceRole::Unconstrained, 0);
                for teps in self.eps_by_target.get(&v).cloned().unwrap_or_default() {
                    self.net.add_arc(mix.clone(), teps.clone(), ArcKind::Normal, 1);
                    self.net.add_arc(teps, mix.clone(), ArcKind::Normal, 1);
                }
                for &i in &sigma {
                    let source_t = t_of(&self.edges[i].from);
                    if !self.net.has_arc(&source_t, &mix, ArcKind::Normal) {
                        self.net.add_arc(source_t, mix.clone(), ArcKind::Normal, 1);
                    }
                }
                if let Some(to) = self.to_of() {
                    self.net.add_arc(mix.clone(), to, ArcKind::Reset, 1);
                }
                lines.push(format!("unconstrained place {mix} for mix-join {v}"));
            }
            let pm = p_m(&v);
            if let Some(place) = self.net.place_mut(&pm) {
                place.role = PlaceRole::MixJoin;
            }
            self.net.add_arc(pm.clone(), t_of(&v), ArcKind::Reset, 1);
            let mirror = t_of(&prime(&v));
            if self.net.has_transition(&mirror) {
                self.net.add_arc(pm.clone(), mirror, ArcKind::Reset, 1);
            }
            lines.push(format!("{pm} marked as mix-join"));
        }
        self.log(5, "Σ-constrained places and mix-joins", lines);
    }

    /// Step 6: one consensus place and reset transition per RBS that has an
    /// out-bridge.
    fn step6_consensus(&mut self) {
        let mut lines = Vec::new();
        for center in self.centers() {
            let out_bridges: Vec<String> = self
                .rdlt
                .vertices()
                .filter(|v| {
                    !v.id.ends_with('\'')
                        && v.rbs_group.as_deref() == Some(center.as_str())
                        && v.is_out_bridge
                })
                .map(|v| v.id.clone())
                .collect();
            if out_bridges.is_empty() {
                continue;
            }
            let pcons = pcons_of(&center);
            let trr = trr_of(&center);
            self.net.add_place(pcons.clone(), PlaceRole::Consensus, 0);
            self.net.add_transition(trr.clone(), TransitionRole::Reset, None);
            self.net.add_arc(pcons.clone(), trr.clone(), ArcKind::Normal, 1);
            self.net.add_arc(pcons.clone(), trr.clone(), ArcKind::Reset, 1);
            for n in &out_bridges {
                let mirror = t_of(&prime(n));
                if !self.net.has_arc(&mirror, &pcons, ArcKind::Normal) {
                    self.net.add_arc(mirror, pcons.clone(), ArcKind::Normal, 1);
                }
            }
            lines.push(format!(
                "consensus {pcons} and reset {trr} ({} out-bridge(s))",
                out_bridges.len()
            ));
        }
        self.log(6, "consensus places", lines);
    }

    /// Step 7: link Level-1 bridges to their Level-2 mirrors.
    fn step7_bridge_linkage(&mut self) {
        let mut lines = Vec::new();
        let bridges: Vec<(String, bool, bool)> = self
            .rdlt
            .vertices()
            .filter(|v| !v.id.ends_with('\'') && v.rbs_group.is_some())
            .map(|v| (v.id.clone(), v.is_in_bridge, v.is_out_bridge))
            .collect();
        for (n, in_bridge, out_bridge) in bridges {
            let mirror = t_of(&prime(&n));
            if !self.net.has_transition(&mirror) {
                continue;
            }
            if in_bridge {
                let pm = p_m(&n);
                if self.net.has_place(&pm) {
                    self.net.add_arc(pm.clone(), mirror.clone(), ArcKind::Normal, 1);
                    lines.push(format!("{pm} -> {mirror}"));
                }
            }
            if out_bridge {
                let t = t_of(&n);
                let outgoing: Vec<(String, ArcKind, u64)> = self
                    .net
                    .arcs_from(&t)
                    .map(|a| (a.to.clone(), a.kind, a.weight))
                    .collect();
                for (to, kind, weight) in outgoing {
                    if !self.net.has_arc(&mirror, &to, kind) {
                        self.net.add_arc(mirror.clone(), to.clone(), kind, weight);
                        lines.push(format!("{mirror} -> {to} (mirrored)"));
                    }
                }
            }
        }
        self.log(7, "bridge linkage", lines);
    }

    /// Step 8: reset topology over the auxiliary places.
    fn step8_reset_topology(&mut self) {
        let mut lines = Vec::new();
        let to = self.to_of().filter(|t| self.net.has_transition(t));
        for i in 0..self.aux.len() {
            let place = self.aux[i].place.clone();
            if let Some(to) = &to {
                self.net.add_arc(place.clone(), to.clone(), ArcKind::Reset, 1);
            }
            if let Some(c) = self.aux[i].rbs_group.clone() {
                let trr = trr_of(&c);
                if self.net.has_transition(&trr) {
                    self.net.add_arc(place.clone(), trr.clone(), ArcKind::Reset, 1);
                    self.net
                        .add_arc(trr, place.clone(), ArcKind::Normal, self.aux[i].initial);
                    lines.push(format!("{place} restored by Trr{c}"));
                }
            }
            let vertex = self.aux[i].vertex.clone();
            let looping = self.rdlt.has_looping_arc(&vertex);
            let is_sink = self.sink == Some(vertex.as_str());
            if !looping && !is_sink {
                let target = self.aux[i].reset_target.clone();
                self.net.add_arc(place.clone(), target.clone(), ArcKind::Reset, 1);
                lines.push(format!("{place} cleared on {target}"));
            }
        }
        self.log(8, "reset topology", lines);
    }

    /// Step 9: the global source place.
    fn step9_global_source(&mut self) {
        let mut lines = Vec::new();
        if let Some(source) = self.source {
            let pim = p_m(source);
            self.net.add_place(pim.clone(), PlaceRole::GlobalSource, 1);
            self.net.add_arc(pim.clone(), t_of(source), ArcKind::Normal, 1);
            lines.push(format!("global source place {pim} (1 token)"));
        }
        self.log(9, "global source", lines);
    }

    /// Centers of the RBSes present in the combined model, unprimed, sorted.
    fn centers(&self) -> Vec<String> {
        let mut centers: Vec<String> = self
            .rdlt
            .vertices()
            .filter(|v| v.center)
            .filter_map(|v| v.id.strip_suffix('\'').map(str::to_string))
            .collect();
        centers.sort();
        centers.dedup();
        centers
    }

    /// Post-map invariant audit.
    fn audit(&self) -> Result<(), MapError> {
        let net = &self.net;
        let invariant = |msg: String| MapError::InternalInvariant(msg);

        let sources = net
            .places()
            .iter()
            .filter(|p| p.role == PlaceRole::GlobalSource)
            .count();
        let sinks = net
            .places()
            .iter()
            .filter(|p| p.role == PlaceRole::GlobalSink)
            .count();
        if sources > 1 || sinks > 1 {
            return Err(invariant(format!(
                "expected at most one global source/sink, found {sources}/{sinks}"
            )));
        }
        let extended = self.source.is_some() && self.sink.is_some();
        if extended && (sources != 1 || sinks != 1) {
            return Err(invariant(format!(
                "extended net must have exactly one global source and sink, found {sources}/{sinks}"
            )));
        }

        if let Some(arc) = net.arcs().iter().find(|a| a.kind == ArcKind::Abstract) {
            return Err(invariant(format!(
                "abstract arc {} -> {} survived mapping",
                arc.from, arc.to
            )));
        }

        if extended {
            for t in net.transitions() {
                let has_in = net.arcs().iter().any(|a| a.to == t.id);
                let has_out = net.arcs().iter().any(|a| a.from == t.id);
                if !has_in || !has_out {
                    return Err(invariant(format!(
                        "transition {} is not fully connected (in: {has_in}, out: {has_out})",
                        t.id
                    )));
                }
            }
        }

        for p in net.places() {
            if let PlaceRole::Auxiliary { reset_target, .. } = &p.role {
                let feeds = net
                    .arcs()
                    .iter()
                    .any(|a| a.from == p.id && a.to == *reset_target);
                if !feeds {
                    return Err(invariant(format!(
                        "auxiliary place {} does not feed its reset target {reset_target}",
                        p.id
                    )));
                }
            }
        }

        for p in net.places() {
            if p.role != PlaceRole::Consensus {
                continue;
            }
            let Some(center) = p.id.strip_prefix("Pcons") else {
                continue;
            };
            let trr = trr_of(center);
            let ok = net.transition(&trr).map(|t| t.role) == Some(TransitionRole::Reset)
                && net.has_arc(&p.id, &trr, ArcKind::Normal)
                && net.has_arc(&p.id, &trr, ArcKind::Reset);
            if !ok {
                return Err(invariant(format!(
                    "consensus place {} lacks its paired reset transition {trr}",
                    p.id
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdlt_evsa::{combine, preprocess};
    use rdlt_model::{Vertex, VertexKind, EPSILON};

    fn convert(vertices: &[(&str, VertexKind, bool)], edges: &[(&str, &str, &str, u64)]) -> MapOutput {
        let mut r = Rdlt::new();
        for &(id, kind, m) in vertices {
            let mut v = Vertex::new(id, kind);
            v.is_reset_center = m;
            r.add_vertex(v).unwrap();
        }
        for &(f, t, c, l) in edges {
            let attr = if c == EPSILON {
                EdgeAttr::epsilon(l)
            } else {
                EdgeAttr::constrained(c, l)
            };
            r.add_edge(f, t, attr).unwrap();
        }
        let pre = preprocess(&r, true).unwrap();
        let combined = combine(&pre).unwrap();
        map_to_petri_net(&combined).unwrap()
    }

    #[test]
    fn epsilon_chain_produces_expected_net() {
        let out = convert(
            &[("x", VertexKind::Controller, false), ("y", VertexKind::Controller, false)],
            &[("x", "y", EPSILON, 1)],
        );
        let net = &out.net;
        for id in ["Tx", "Ty", "Ti", "To", "Tεyx"] {
            assert!(net.has_transition(id), "missing transition {id}");
        }
        for id in ["Pym", "Pεyx", "Pεnyx", "Pim", "Po"] {
            assert!(net.has_place(id), "missing place {id}");
        }
        assert_eq!(net.place("Pim").unwrap().tokens, 1);
        assert_eq!(net.place("Pεnyx").unwrap().tokens, 1);
        assert!(net.place("Pεnyx").unwrap().role.is_auxiliary());
        assert!(!net.arcs().iter().any(|a| a.kind == ArcKind::Abstract));
    }

    #[test]
    fn split_without_join_gets_split_place_and_join_places() {
        let out = convert(
            &[
                ("w", VertexKind::Controller, false),
                ("x", VertexKind::Controller, false),
                ("y", VertexKind::Controller, false),
                ("z", VertexKind::Controller, false),
            ],
            &[
                ("w", "x", EPSILON, 1),
                ("w", "y", EPSILON, 1),
                ("x", "z", "a", 1),
                ("y", "z", "b", 1),
            ],
        );
        let net = &out.net;
        assert!(net.has_place("Pwsplit"));
        assert!(net.has_transition("TJz"));
        assert!(net.has_place("Paz"));
        assert!(net.has_place("Pbz"));
        let checked = net
            .places()
            .iter()
            .filter(|p| p.role == PlaceRole::Checked && p.id.ends_with('z'))
            .count();
        assert_eq!(checked, 2);
    }

    #[test]
    fn mix_join_gets_unconstrained_place_and_reset_arcs() {
        let out = convert(
            &[
                ("s", VertexKind::Controller, false),
                ("u", VertexKind::Controller, false),
                ("z", VertexKind::Controller, false),
            ],
            &[
                ("s", "u", EPSILON, 1),
                ("s", "z", EPSILON, 1),
                ("u", "z", "a", 1),
            ],
        );
        let net = &out.net;
        assert!(net.has_place("Paε"), "unconstrained place for alias 'a'");
        // bidirectional with the ε-transition into z
        assert!(net.has_arc("Paε", "Tεzs", ArcKind::Normal));
        assert!(net.has_arc("Tεzs", "Paε", ArcKind::Normal));
        // mix-join mark and reset arc on the traversed place
        assert_eq!(net.place("Pzm").unwrap().role, PlaceRole::MixJoin);
        assert!(net.has_arc("Pzm", "Tz", ArcKind::Reset));
        assert!(net.has_arc("Paε", "To", ArcKind::Reset));
    }

    #[test]
    fn rbs_with_out_bridge_gets_consensus_pair() {
        let out = convert(
            &[
                ("s", VertexKind::Controller, false),
                ("c", VertexKind::Entity, true),
                ("o2", VertexKind::Controller, false),
                ("t", VertexKind::Controller, false),
            ],
            &[
                ("s", "c", EPSILON, 1),
                ("c", "o2", EPSILON, 1),
                ("o2", "t", "done", 1),
            ],
        );
        let net = &out.net;
        assert!(net.has_place("Pconsc"));
        assert!(net.has_transition("Trrc"));
        assert!(net.has_arc("Pconsc", "Trrc", ArcKind::Normal));
        assert!(net.has_arc("Pconsc", "Trrc", ArcKind::Reset));
        // Level-2 mirror of the out-bridge feeds the consensus place
        assert!(net.has_arc("To2'", "Pconsc", ArcKind::Normal));
        // in-bridge linkage into the mirror
        assert!(net.has_arc("Pcm", "Tc'", ArcKind::Normal));
    }

    #[test]
    fn auxiliary_places_reset_to_sink_and_rbs() {
        let out = convert(
            &[
                ("s", VertexKind::Controller, false),
                ("c", VertexKind::Entity, true),
                ("o2", VertexKind::Controller, false),
                ("t", VertexKind::Controller, false),
            ],
            &[
                ("s", "c", EPSILON, 1),
                ("c", "o2", EPSILON, 1),
                ("o2", "t", "done", 1),
            ],
        );
        let net = &out.net;
        // the Level-2 internal ε-edge c' -> o2' has an auxiliary place with
        // the RBS group, so Trrc must restore it
        let aux = net
            .places()
            .iter()
            .find(|p| matches!(&p.role, PlaceRole::Auxiliary { rbs_group: Some(g), .. } if g == "c" && p.id.starts_with("Pεn")))
            .expect("Level-2 auxiliary place");
        assert!(net.has_arc(&aux.id, "Trrc", ArcKind::Reset));
        assert!(net.has_arc("Trrc", &aux.id, ArcKind::Normal));
        assert!(net.has_arc(&aux.id, "To", ArcKind::Reset));
    }

    #[test]
    fn empty_rdlt_maps_to_empty_net() {
        let combined = Combined {
            rdlt: Rdlt::new(),
            source: None,
            sink: None,
        };
        let out = map_to_petri_net(&combined).unwrap();
        assert!(out.net.places().is_empty());
        assert!(out.net.transitions().is_empty());
        assert!(out.net.arcs().is_empty());
    }

    #[test]
    fn every_transition_is_connected_after_extension() {
        let out = convert(
            &[
                ("w", VertexKind::Controller, false),
                ("x", VertexKind::Controller, false),
                ("y", VertexKind::Controller, false),
                ("z", VertexKind::Controller, false),
            ],
            &[
                ("w", "x", EPSILON, 1),
                ("w", "y", EPSILON, 1),
                ("x", "z", EPSILON, 1),
                ("y", "z", EPSILON, 1),
            ],
        );
        for t in out.net.transitions() {
            assert!(out.net.arcs().iter().any(|a| a.to == t.id), "{} has no input", t.id);
            assert!(out.net.arcs().iter().any(|a| a.from == t.id), "{} has no output", t.id);
        }
    }
}
