//! Core identifiers shared by every part of the engine
//!
//! A graph is made of named nodes. Edges point from one node to a [`Target`],
//! which is either another node or the terminal sentinel [`END`].
//!
//! ```text
//!   __start__ ──► input ──► rewrite ──► output ──┬──► feedback ──► __end__
//!                                               └──────────────► __end__
//! ```
//!
//! [`START`] never names a real node. Adding an edge from it is shorthand for
//! setting the entry point.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Node identifier - unique name for each node in the graph
pub type NodeId = String;

/// Pseudo-node marking where execution begins
pub const START: &str = "__start__";

/// Terminal sentinel: an edge to `END` finishes the run
pub const END: &str = "__end__";

/// Returns true for names that cannot be registered as nodes
pub fn is_reserved(name: &str) -> bool {
    name == START || name == END
}

/// Destination of an edge
///
/// Converting from a string maps [`END`] to [`Target::End`] and everything else
/// to [`Target::Node`], so `"__end__"` can be written directly in label maps.
///
/// ```rust
/// use flowgraph_core::{Target, END};
///
/// assert_eq!(Target::from(END), Target::End);
/// assert_eq!(Target::from("answer"), Target::Node("answer".to_string()));
/// assert_eq!(Target::End.to_string(), "__end__");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Target {
    /// Continue with the named node
    Node(NodeId),
    /// Stop and return the accumulated state
    End,
}

impl Target {
    /// The node name, or `None` for the terminal sentinel
    pub fn node(&self) -> Option<&str> {
        match self {
            Target::Node(id) => Some(id.as_str()),
            Target::End => None,
        }
    }

    /// True for [`Target::End`]
    pub fn is_end(&self) -> bool {
        matches!(self, Target::End)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Node(id) => f.write_str(id),
            Target::End => f.write_str(END),
        }
    }
}

impl From<&str> for Target {
    fn from(value: &str) -> Self {
        if value == END {
            Target::End
        } else {
            Target::Node(value.to_string())
        }
    }
}

impl From<String> for Target {
    fn from(value: String) -> Self {
        if value == END {
            Target::End
        } else {
            Target::Node(value)
        }
    }
}

impl From<&String> for Target {
    fn from(value: &String) -> Self {
        Target::from(value.as_str())
    }
}

impl From<Target> for String {
    fn from(value: Target) -> Self {
        match value {
            Target::Node(id) => id,
            Target::End => END.to_string(),
        }
    }
}
