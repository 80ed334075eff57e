//! Storage operations exposed over the protocol.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the fixed storage verbs. Not extensible at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    Get,
    Set,
    Del,
    Clear,
    GetKeys,
}

impl Operation {
    /// Every recognized operation, in wire-name order.
    pub const ALL: [Operation; 5] = [
        Operation::Get,
        Operation::Set,
        Operation::Del,
        Operation::Clear,
        Operation::GetKeys,
    ];

    /// Resolve a wire name against the closed set. Anything else is `None`,
    /// including names that differ only by case.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "get" => Some(Operation::Get),
            "set" => Some(Operation::Set),
            "del" => Some(Operation::Del),
            "clear" => Some(Operation::Clear),
            "getKeys" => Some(Operation::GetKeys),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Get => "get",
            Operation::Set => "set",
            Operation::Del => "del",
            Operation::Clear => "clear",
            Operation::GetKeys => "getKeys",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
