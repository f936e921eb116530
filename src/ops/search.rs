use std::ops::Range;

use regex::Regex;
use serde::Serialize;

use crate::model::{Document, NodeId};

/// Which field of a node matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchField {
    Name,
    Owner,
    Prefix,
}

impl MatchField {
    pub fn label(self) -> &'static str {
        match self {
            MatchField::Name => "name",
            MatchField::Owner => "owner",
            MatchField::Prefix => "prefix",
        }
    }
}

/// A regex hit on one field of a node
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub node: NodeId,
    pub field: MatchField,
    pub spans: Vec<Range<usize>>,
}

/// A ranked name match
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMatch {
    pub node: NodeId,
    /// 0.0..=1.0, higher is better
    pub score: f64,
    /// Names from the root down to the node
    pub path: Vec<String>,
}

const EXACT: f64 = 1.0;
const PREFIX: f64 = 0.9;
const CONTAINS: f64 = 0.7;
const SEQUENCE_WEIGHT: f64 = 0.6;
const SEQUENCE_THRESHOLD: f64 = 0.2;

/// Collect all non-overlapping match byte-ranges for a regex in the given text.
fn find_matches(re: &Regex, text: &str) -> Vec<Range<usize>> {
    re.find_iter(text).map(|m| m.start()..m.end()).collect()
}

// ---------------------------------------------------------------------------
// Regex search
// ---------------------------------------------------------------------------

/// Regex search over the name, owner and prefix of every attached node, in
/// tree order
pub fn search_nodes(doc: &Document, re: &Regex) -> Vec<SearchHit> {
    let mut hits = Vec::new();
    for id in doc.walk() {
        let node = doc.node(id);
        let fields = [
            (MatchField::Name, Some(node.name())),
            (MatchField::Owner, node.owner()),
            (MatchField::Prefix, node.prefix()),
        ];
        for (field, text) in fields {
            let Some(text) = text else { continue };
            let spans = find_matches(re, text);
            if !spans.is_empty() {
                hits.push(SearchHit {
                    node: id,
                    field,
                    spans,
                });
            }
        }
    }
    hits
}

// ---------------------------------------------------------------------------
// Ranked name search
// ---------------------------------------------------------------------------

/// Case-insensitive ranked search over node names. Best score first; equal
/// scores keep tree order.
pub fn fuzzy_search(doc: &Document, query: &str) -> Vec<ScoredMatch> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }
    let mut matches: Vec<ScoredMatch> = doc
        .walk()
        .into_iter()
        .filter_map(|id| {
            let score = score_name(&query, &doc.name(id).to_lowercase());
            (score > 0.0).then(|| ScoredMatch {
                node: id,
                score,
                path: doc.path(id).into_iter().map(str::to_string).collect(),
            })
        })
        .collect();
    matches.sort_by(|a, b| b.score.total_cmp(&a.score));
    matches
}

/// Score a lowercase query against a lowercase name
pub fn score_name(query: &str, name: &str) -> f64 {
    if name == query {
        EXACT
    } else if name.starts_with(query) {
        PREFIX
    } else if name.contains(query) {
        CONTAINS
    } else {
        let sequence = sequence_score(query, name);
        if sequence > SEQUENCE_THRESHOLD {
            sequence * SEQUENCE_WEIGHT
        } else {
            0.0
        }
    }
}

/// Fraction of the query found in order within `text`, scaled down when the
/// text is much longer than the query
fn sequence_score(query: &str, text: &str) -> f64 {
    let query_len = query.chars().count();
    let text_len = text.chars().count();
    if query_len == 0 || text_len == 0 {
        return 0.0;
    }
    let mut remaining = text.chars();
    let matched = query
        .chars()
        .filter(|q| remaining.by_ref().any(|t| t == *q))
        .count();
    let ratio = matched as f64 / query_len as f64;
    ratio * (query_len as f64 / text_len as f64).min(1.0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
