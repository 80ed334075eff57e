use std::collections::BTreeSet;

use syncstore_core::error::Result;
use syncstore_core::Operation;

use crate::config::schema::PermissionSpec;

use super::pattern::OriginPattern;

/// One policy rule: an origin matcher and the operations it unlocks.
#[derive(Debug, Clone)]
pub struct PermissionEntry {
    pub pattern: OriginPattern,
    pub allowed: BTreeSet<Operation>,
}

impl PermissionEntry {
    pub fn new(pattern: OriginPattern, allowed: impl IntoIterator<Item = Operation>) -> Self {
        Self {
            pattern,
            allowed: allowed.into_iter().collect(),
        }
    }

    pub fn compile(spec: &PermissionSpec) -> Result<Self> {
        Ok(Self::new(
            OriginPattern::compile(&spec.origin)?,
            spec.allow.iter().copied(),
        ))
    }

    fn grants(&self, origin: &str, op: Operation) -> bool {
        self.allowed.contains(&op) && self.pattern.matches(origin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// Name is outside the closed operation set.
    UnknownOperation,
    /// No entry grants this origin/operation pair.
    NoMatchingEntry,
}

impl DenyReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DenyReason::UnknownOperation => "unknown_operation",
            DenyReason::NoMatchingEntry => "no_matching_entry",
        }
    }
}

/// Decision from policy evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    Permit(Operation),
    Deny(DenyReason),
}

/// Ordered permission entries. Construct once at startup, then share via Arc.
/// Order never affects the outcome: any matching entry grants.
#[derive(Debug, Clone, Default)]
pub struct PermissionPolicy {
    entries: Vec<PermissionEntry>,
}

impl PermissionPolicy {
    pub fn new(entries: Vec<PermissionEntry>) -> Self {
        Self { entries }
    }

    /// Policy with zero entries: denies everything.
    pub fn deny_all() -> Self {
        Self::default()
    }

    pub fn compile(specs: &[PermissionSpec]) -> Result<Self> {
        let entries = specs
            .iter()
            .map(PermissionEntry::compile)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(entries))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_permitted(&self, origin: &str, op: Operation) -> bool {
        self.entries.iter().any(|e| e.grants(origin, op))
    }

    /// Resolve a wire name against the closed set, then against the entries.
    pub fn check(&self, origin: &str, name: &str) -> PolicyDecision {
        let Some(op) = Operation::from_name(name) else {
            return PolicyDecision::Deny(DenyReason::UnknownOperation);
        };
        if self.is_permitted(origin, op) {
            PolicyDecision::Permit(op)
        } else {
            PolicyDecision::Deny(DenyReason::NoMatchingEntry)
        }
    }
}
