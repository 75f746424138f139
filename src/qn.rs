//! Building blocks for queueing-network models on top of the engine.
//!
//! The model layer itself (routing, customers, service disciplines) is not
//! part of this crate; only the node taxonomy shared by its consumers lives
//! here.

use std::fmt::Display;

/// Categories of nodes in a queueing network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeCategory {
    /// A station delaying customers without queueing them.
    DelayStation,
    /// A node generating customers.
    Source,
    /// A station queueing and serving customers.
    ServiceStation,
    /// A node absorbing customers.
    Sink,
}

impl Display for NodeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::DelayStation => "delay-station",
            Self::Source => "source",
            Self::ServiceStation => "service-station",
            Self::Sink => "sink",
        };
        f.write_str(name)
    }
}
