#![deny(missing_docs)]

//! # Verb Classification
//!
//! Decides whether an RPC method is exposed as a tRPC query or mutation,
//! based on the prefix of its name.
//!
//! Only the query list is authoritative: a method is a query when its name
//! starts with one of the query verbs, and a mutation otherwise. The mutation
//! list is carried through to the emitted `MUTATION_PREFIXES` constant but
//! never gates the mutation branch.

use std::fmt;

/// Query verbs used when the caller supplies none.
pub const DEFAULT_QUERY_VERBS: &[&str] = &["Get", "List"];

/// Mutation verbs used when the caller supplies none.
pub const DEFAULT_MUTATION_VERBS: &[&str] = &["Create", "Update", "Delete"];

/// The kind of routing procedure a method becomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcedureKind {
    /// Read-like method, emitted as `.query(...)`.
    Query,
    /// Write-like method, emitted as `.mutation(...)`.
    Mutation,
}

impl ProcedureKind {
    /// Name of the tRPC procedure builder method.
    pub fn builder_method(self) -> &'static str {
        match self {
            ProcedureKind::Query => "query",
            ProcedureKind::Mutation => "mutation",
        }
    }
}

impl fmt::Display for ProcedureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.builder_method())
    }
}

/// Caller-overridable classification policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerbRules {
    query: Vec<String>,
    mutation: Vec<String>,
}

impl VerbRules {
    /// Builds the rule set. An absent or empty list falls back to its default.
    pub fn new(query: Option<Vec<String>>, mutation: Option<Vec<String>>) -> Self {
        Self {
            query: or_default(query, DEFAULT_QUERY_VERBS),
            mutation: or_default(mutation, DEFAULT_MUTATION_VERBS),
        }
    }

    /// Effective query prefixes.
    pub fn query_verbs(&self) -> &[String] {
        &self.query
    }

    /// Effective mutation prefixes.
    pub fn mutation_verbs(&self) -> &[String] {
        &self.mutation
    }

    /// Classifies `method_name` under this rule set.
    pub fn classify(&self, method_name: &str) -> ProcedureKind {
        classify(method_name, &self.query, &self.mutation)
    }
}

impl Default for VerbRules {
    fn default() -> Self {
        Self::new(None, None)
    }
}

fn or_default(verbs: Option<Vec<String>>, defaults: &[&str]) -> Vec<String> {
    match verbs {
        Some(v) if !v.is_empty() => v,
        _ => defaults.iter().map(|s| s.to_string()).collect(),
    }
}

/// Classifies a method name against ordered prefix lists.
///
/// An empty `query_prefixes` slice means the default query verbs.
/// `_mutation_prefixes` is accepted for symmetry only.
pub fn classify<S: AsRef<str>>(
    method_name: &str,
    query_prefixes: &[S],
    _mutation_prefixes: &[S],
) -> ProcedureKind {
    let is_query = if query_prefixes.is_empty() {
        DEFAULT_QUERY_VERBS
            .iter()
            .any(|prefix| method_name.starts_with(prefix))
    } else {
        query_prefixes
            .iter()
            .any(|prefix| method_name.starts_with(prefix.as_ref()))
    };

    if is_query {
        ProcedureKind::Query
    } else {
        ProcedureKind::Mutation
    }
}
