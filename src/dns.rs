//! DNS record synthesis
//!
//! Exercises declare record templates in their catalog entry. A template
//! with an empty `rdata` is bound to the owning container's address once
//! that address is known; a non-empty `rdata` passes through verbatim
//! (aliases and static entries). The resolver serving the exercise
//! consumes the synthesized set, it is never produced here.

use serde::{Deserialize, Serialize};

/// A single DNS record or record template.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Record {
    /// Record type, e.g. "A", "CNAME", "MX".
    #[serde(rename = "type")]
    pub rtype: String,
    /// Fully qualified name the record answers for.
    pub name: String,
    /// Record data; empty marks a template bound at creation time.
    pub rdata: String,
}

impl Record {
    pub fn new(
        rtype: impl Into<String>,
        name: impl Into<String>,
        rdata: impl Into<String>,
    ) -> Self {
        Self {
            rtype: rtype.into(),
            name: name.into(),
            rdata: rdata.into(),
        }
    }

    /// Whether this record still needs an address bound to it.
    pub fn is_template(&self) -> bool {
        self.rdata.is_empty()
    }

    /// Resolve the template against an assigned address.
    ///
    /// Non-template records are returned unchanged.
    pub fn resolved(&self, addr: &str) -> Record {
        let mut record = self.clone();
        if record.rdata.is_empty() {
            record.rdata = addr.to_string();
        }
        record
    }

    /// Render the record as a resolver zone line.
    pub fn zone_line(&self) -> String {
        format!("{} {} {}", self.name, self.rtype, self.rdata)
    }
}

/// Resolve a container's record templates against its assigned address,
/// preserving template order.
pub fn resolve_records(templates: &[Record], addr: &str) -> Vec<Record> {
    templates.iter().map(|t| t.resolved(addr)).collect()
}
