//! Duplicate Detection — collapses multiple submissions of the same person.
//!
//! Two candidates are duplicates when any of:
//!   (a) normalized emails are equal and non-empty,
//!   (b) normalized phone numbers are equal and non-empty,
//!   (c) normalized names are equal AND raw-text token overlap clears a high
//!       threshold (guards against two people sharing a common name),
//!   (d) content hashes are equal (exact resubmission, even with no
//!       parseable contact fields).
//!
//! Grouping runs through a union-find so the duplicate relation is closed
//! transitively: if A~B by email and B~C by phone, all three collapse into
//! one group regardless of submission order. Each group keeps the member
//! with the longest raw text; survivors come out in first-occurrence order.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use sha2::{Digest, Sha256};

use crate::recommendation::models::Candidate;
use crate::recommendation::parser::{normalize_email, normalize_name, normalize_phone};

/// Deduplicated candidates plus one warning per merged group.
#[derive(Debug)]
pub struct DedupOutcome {
    pub candidates: Vec<Candidate>,
    pub warnings: Vec<String>,
}

/// Union-find over candidate indices. Roots are always the smallest index in
/// their group, which makes group ordering fall out of root ordering.
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, index: usize) -> usize {
        let mut root = index;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut current = index;
        while self.parent[current] != root {
            let next = self.parent[current];
            self.parent[current] = root;
            current = next;
        }
        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a != root_b {
            let (keep, absorb) = if root_a < root_b {
                (root_a, root_b)
            } else {
                (root_b, root_a)
            };
            self.parent[absorb] = keep;
        }
    }
}

/// Removes duplicate candidates, preserving first-occurrence order.
///
/// `name_similarity_threshold` is the minimum raw-text Jaccard overlap for
/// criterion (c); email/phone/content matches apply unconditionally.
pub fn deduplicate(candidates: &[Candidate], name_similarity_threshold: f32) -> DedupOutcome {
    let mut set = DisjointSet::new(candidates.len());

    let mut by_email: HashMap<String, usize> = HashMap::new();
    let mut by_phone: HashMap<String, usize> = HashMap::new();
    let mut by_content: HashMap<String, usize> = HashMap::new();
    let mut by_name: HashMap<String, Vec<usize>> = HashMap::new();

    for (index, candidate) in candidates.iter().enumerate() {
        if let Some(email) = candidate.email.as_deref() {
            let key = normalize_email(email);
            if !key.is_empty() {
                match by_email.entry(key) {
                    Entry::Occupied(first) => set.union(*first.get(), index),
                    Entry::Vacant(slot) => {
                        slot.insert(index);
                    }
                }
            }
        }
        if let Some(phone) = candidate.phone.as_deref() {
            let key = normalize_phone(phone);
            if !key.is_empty() {
                match by_phone.entry(key) {
                    Entry::Occupied(first) => set.union(*first.get(), index),
                    Entry::Vacant(slot) => {
                        slot.insert(index);
                    }
                }
            }
        }
        match by_content.entry(content_hash(&candidate.raw_text)) {
            Entry::Occupied(first) => set.union(*first.get(), index),
            Entry::Vacant(slot) => {
                slot.insert(index);
            }
        }
        if let Some(name) = candidate.name.as_deref() {
            let key = normalize_name(name);
            if !key.is_empty() {
                by_name.entry(key).or_default().push(index);
            }
        }
    }

    // Same name alone is not enough — require the texts to substantially
    // overlap before merging two same-named submissions.
    for indices in by_name.values() {
        for (position, &a) in indices.iter().enumerate() {
            for &b in &indices[position + 1..] {
                let overlap = token_overlap(&candidates[a].raw_text, &candidates[b].raw_text);
                if overlap >= name_similarity_threshold {
                    set.union(a, b);
                }
            }
        }
    }

    let mut groups: HashMap<usize, Vec<usize>> = HashMap::new();
    for index in 0..candidates.len() {
        groups.entry(set.find(index)).or_default().push(index);
    }
    let mut roots: Vec<usize> = groups.keys().copied().collect();
    roots.sort_unstable();

    let mut survivors = Vec::with_capacity(roots.len());
    let mut warnings = Vec::new();
    for root in roots {
        let members = &groups[&root];
        // Longest text is assumed the most complete submission; ties keep
        // the earliest.
        let representative = members
            .iter()
            .copied()
            .max_by_key(|&i| (candidates[i].raw_text.len(), std::cmp::Reverse(i)))
            .expect("group is never empty");

        if members.len() > 1 {
            let ids: Vec<&str> = members
                .iter()
                .map(|&i| candidates[i].source_id.as_str())
                .collect();
            warnings.push(format!(
                "candidates {} were merged as duplicates; kept {} (most complete submission)",
                ids.join(", "),
                candidates[representative].source_id,
            ));
        }
        survivors.push(candidates[representative].clone());
    }

    DedupOutcome {
        candidates: survivors,
        warnings,
    }
}

/// SHA-256 over case/whitespace-normalized text; equal hashes mean an exact
/// resubmission of the same content.
fn content_hash(text: &str) -> String {
    let normalized = text
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Jaccard overlap of the two texts' lowercase token sets. Two empty texts
/// are defined as identical (1.0).
pub(crate) fn token_overlap(a: &str, b: &str) -> f32 {
    let lower_a = a.to_lowercase();
    let lower_b = b.to_lowercase();
    let tokens_a: HashSet<&str> = lower_a.split_whitespace().collect();
    let tokens_b: HashSet<&str> = lower_b.split_whitespace().collect();
    let union = tokens_a.union(&tokens_b).count();
    if union == 0 {
        return 1.0;
    }
    let intersection = tokens_a.intersection(&tokens_b).count();
    intersection as f32 / union as f32
}
