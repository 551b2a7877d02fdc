//! Expanded reusability (eRU) of abstract paths.
//!
//! The bound for an abstract arc combines the in-bridge entry budgets of its
//! RBS with the pseudocritical arcs of the cycles that cross the RBS
//! boundary, scaled by the path's own in-RBS reusability.

use rdlt_graph::{simple_cycles, EdgeId};
use rdlt_model::{edge_key, Rdlt};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// Result of one eRU computation. Unbounded-reuse observations surface as
/// warnings; the value itself is capped rather than failing.
#[derive(Debug)]
pub struct EruOutcome {
    pub value: u64,
    pub warnings: Vec<String>,
}

/// Minimum L over the edges of a cycle.
fn min_l(r: &Rdlt, cycle: &[EdgeId]) -> u64 {
    cycle
        .iter()
        .map(|&e| r.edge_view(e).2.l)
        .min()
        .unwrap_or(0)
}

/// True iff the edge is strictly internal to one RBS.
fn edge_in_rbs(member_of: &HashMap<String, String>, from: &str, to: &str) -> bool {
    match (member_of.get(from), member_of.get(to)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Compute the eRU of the abstract path `path` (edge ids within `rbs`)
/// extracted from the RBS rooted at `center`.
///
/// `full` is the original RDLT, `full_cycles` its simple cycles (computed
/// once per preprocessing run), and `member_of` maps every RBS member to its
/// center.
#[allow(clippy::too_many_arguments)]
pub fn expanded_reusability(
    full: &Rdlt,
    rbs: &Rdlt,
    center: &str,
    in_bridges: &[String],
    member_of: &HashMap<String, String>,
    full_cycles: &[Vec<EdgeId>],
    path: &[EdgeId],
) -> EruOutcome {
    let mut warnings = Vec::new();

    // RBS-local reusability of each hop: sum of min-L over the in-RBS cycles
    // containing the hop, capped by the hop's own L.
    let rbs_cycles = simple_cycles(rbs.graph());
    let path_ru = path
        .iter()
        .map(|&hop| {
            let (_, _, attr) = rbs.edge_view(hop);
            let ru: u64 = rbs_cycles
                .iter()
                .filter(|k| k.contains(&hop))
                .map(|k| min_l(rbs, k))
                .sum();
            ru.min(attr.l)
        })
        .min()
        .unwrap_or(0);

    // Hop identity carries over to the full graph by edge key.
    let hop_keys: HashSet<String> = path
        .iter()
        .map(|&hop| {
            let (f, t, attr) = rbs.edge_view(hop);
            edge_key(f, t, attr)
        })
        .collect();

    let mut sum: u64 = 0;
    for bridge in in_bridges {
        let entry_budget = in_bridge_budget(full, member_of, center, bridge);

        let relevant: Vec<&Vec<EdgeId>> = full_cycles
            .iter()
            .filter(|k| cycle_touches(full, k, bridge, &hop_keys))
            .collect();

        let contribution = if relevant.is_empty() {
            1
        } else {
            // Collect pseudocritical arcs across the relevant cycles, one per
            // edge key, smaller L wins on collision.
            let mut pca: BTreeMap<String, u64> = BTreeMap::new();
            for k in &relevant {
                collect_pca(full, member_of, k, &mut pca);
            }
            if pca.is_empty() {
                warnings.push(format!(
                    "unbounded reuse in RBS '{}': every cycle through in-bridge '{}' lies inside reset-bound subsystems",
                    center, bridge
                ));
                entry_budget
            } else {
                let pca_l = pca.values().copied().min().unwrap_or(u64::MAX);
                entry_budget.min(pca_l)
            }
        };
        sum = sum.saturating_add(contribution);
    }

    let value = sum.saturating_mul(path_ru.saturating_add(1));
    debug!(center, path_ru, value, "computed expanded reusability");
    EruOutcome { value, warnings }
}

/// Total L of the bridge's incoming arcs from outside its RBS.
fn in_bridge_budget(
    full: &Rdlt,
    member_of: &HashMap<String, String>,
    center: &str,
    bridge: &str,
) -> u64 {
    let Some(node) = full.node_id(bridge) else {
        return 1;
    };
    let g = full.graph();
    let budget: u64 = g
        .incoming(node)
        .iter()
        .map(|&e| g.edge(e))
        .filter(|rec| {
            let src = &g.node(rec.from).id;
            member_of.get(src.as_str()).map(String::as_str) != Some(center)
        })
        .map(|rec| rec.data.l)
        .sum();
    budget.max(1)
}

/// Does the cycle pass through `bridge` and at least one hop of the path?
fn cycle_touches(full: &Rdlt, cycle: &[EdgeId], bridge: &str, hop_keys: &HashSet<String>) -> bool {
    let mut has_bridge = false;
    let mut has_hop = false;
    for &e in cycle {
        let (f, t, attr) = full.edge_view(e);
        if f == bridge || t == bridge {
            has_bridge = true;
        }
        if hop_keys.contains(&edge_key(f, t, attr)) {
            has_hop = true;
        }
        if has_bridge && has_hop {
            return true;
        }
    }
    false
}

/// Pseudocritical arcs of a cycle: the non-RBS edges of minimum L. Empty if
/// every edge of the cycle is inside some RBS.
fn collect_pca(
    full: &Rdlt,
    member_of: &HashMap<String, String>,
    cycle: &[EdgeId],
    out: &mut BTreeMap<String, u64>,
) {
    let outside: Vec<(String, u64)> = cycle
        .iter()
        .map(|&e| full.edge_view(e))
        .filter(|(f, t, _)| !edge_in_rbs(member_of, f, t))
        .map(|(f, t, attr)| (edge_key(f, t, attr), attr.l))
        .collect();
    let Some(min) = outside.iter().map(|&(_, l)| l).min() else {
        return;
    };
    for (key, l) in outside.into_iter().filter(|&(_, l)| l == min) {
        out.entry(key)
            .and_modify(|existing| *existing = (*existing).min(l))
            .or_insert(l);
    }
}
