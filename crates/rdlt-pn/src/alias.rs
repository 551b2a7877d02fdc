//! Constraint-alias registry.
//!
//! Σ-constraints get short place aliases drawn from the pool
//! `a..z, a1..z1, a2..`. Single-character constraints keep their own
//! lowercased letter when it is free; everything else (and collisions)
//! overflows to the next free pool entry. Assignment is a pure function of
//! the ordered constraint list: single-character constraints are sorted
//! alphabetically and processed before multi-character ones, which stay in
//! input order.

use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Default)]
pub struct AliasRegistry {
    map: BTreeMap<String, String>,
    used: HashSet<String>,
}

impl AliasRegistry {
    /// Build the registry from constraints in input order (duplicates
    /// allowed; the first occurrence fixes the position).
    pub fn build<S: AsRef<str>>(constraints: &[S]) -> Self {
        let mut singles = Vec::new();
        let mut multis = Vec::new();
        let mut seen = HashSet::new();
        for c in constraints {
            let c = c.as_ref();
            if !seen.insert(c.to_string()) {
                continue;
            }
            if c.chars().count() == 1 {
                singles.push(c.to_string());
            } else {
                multis.push(c.to_string());
            }
        }
        singles.sort();

        let mut registry = AliasRegistry::default();
        for c in singles.into_iter().chain(multis) {
            registry.assign(&c);
        }
        registry
    }

    fn assign(&mut self, constraint: &str) {
        let preferred = if constraint.chars().count() == 1 {
            Some(constraint.to_lowercase())
        } else {
            None
        };
        let alias = match preferred {
            Some(p) if p.chars().all(|ch| ch.is_ascii_lowercase()) && !self.used.contains(&p) => p,
            _ => self.next_free(),
        };
        self.used.insert(alias.clone());
        self.map.insert(constraint.to_string(), alias);
    }

    fn next_free(&self) -> String {
        for round in 0u32.. {
            for ch in 'a'..='z' {
                let candidate = if round == 0 {
                    ch.to_string()
                } else {
                    format!("{ch}{round}")
                };
                if !self.used.contains(&candidate) {
                    return candidate;
                }
            }
        }
        unreachable!("alias pool is unbounded")
    }

    pub fn alias(&self, constraint: &str) -> Option<&str> {
        self.map.get(constraint).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(c, a)| (c.as_str(), a.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_letters_keep_their_letter() {
        let r = AliasRegistry::build(&["b", "a"]);
        assert_eq!(r.alias("a"), Some("a"));
        assert_eq!(r.alias("b"), Some("b"));
    }

    #[test]
    fn uppercase_singles_are_lowercased() {
        let r = AliasRegistry::build(&["Q"]);
        assert_eq!(r.alias("Q"), Some("q"));
    }

    #[test]
    fn multi_character_constraints_take_pool_entries() {
        let r = AliasRegistry::build(&["send", "ack"]);
        assert_eq!(r.alias("send"), Some("a"));
        assert_eq!(r.alias("ack"), Some("b"));
    }

    #[test]
    fn collision_overflows() {
        // "A" and "a" both want alias "a"; singles sort as ["A", "a"]
        let r = AliasRegistry::build(&["a", "A"]);
        assert_eq!(r.alias("A"), Some("a"));
        assert_eq!(r.alias("a"), Some("b"));
    }

    #[test]
    fn pool_overflows_to_numbered_entries() {
        let constraints: Vec<String> = (0..28).map(|i| format!("c{i:02}")).collect();
        let r = AliasRegistry::build(&constraints);
        assert_eq!(r.alias("c00"), Some("a"));
        assert_eq!(r.alias("c25"), Some("z"));
        assert_eq!(r.alias("c26"), Some("a1"));
        assert_eq!(r.alias("c27"), Some("b1"));
    }

    #[test]
    fn assignment_is_pure_in_input_order() {
        let a = AliasRegistry::build(&["go", "x", "stop"]);
        let b = AliasRegistry::build(&["go", "x", "stop"]);
        let ea: Vec<_> = a.entries().map(|(c, al)| (c.to_string(), al.to_string())).collect();
        let eb: Vec<_> = b.entries().map(|(c, al)| (c.to_string(), al.to_string())).collect();
        assert_eq!(ea, eb);
        // singles first: "x" beats the multis even though it arrives second
        assert_eq!(a.alias("x"), Some("x"));
        assert_eq!(a.alias("go"), Some("a"));
        assert_eq!(a.alias("stop"), Some("b"));
    }

    #[test]
    fn non_ascii_single_goes_to_pool() {
        let r = AliasRegistry::build(&["β"]);
        assert_eq!(r.alias("β"), Some("a"));
    }
}
