//! Catalog wire-shape for exercise definitions
//!
//! These types mirror the records served by the exercise distribution
//! service. They are consumed read-only: the catalog produces them, the
//! registry validates them, the lifecycle controller instantiates them.

use crate::dns::Record;
use crate::tag::Tag;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Availability of an exercise in the catalog.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExerciseStatus {
    #[default]
    Available,
    Unavailable,
}

/// Immutable description of one exercise.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExerciseSpec {
    pub tag: Tag,
    pub name: String,
    /// Hidden from team-facing listings when set.
    pub secret: bool,
    pub category: Tag,
    pub status: ExerciseStatus,
    /// Container instances, in provisioning order.
    pub containers: Vec<ContainerSpec>,
    /// VM instances, provisioned after all containers.
    pub vms: Vec<VmSpec>,
}

/// Declarative description of one container instance.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerSpec {
    pub image: String,
    pub memory_mb: Option<u32>,
    /// Fractional CPUs, e.g. 0.5.
    pub cpu: Option<f64>,
    pub envs: HashMap<String, String>,
    /// Resolver addresses; filled by the controller, not the catalog.
    pub dns: Vec<String>,
    /// DNS record templates owned by this container.
    pub records: Vec<Record>,
    /// Child exercises solved inside this container.
    pub children: Vec<ChildSpec>,
}

/// Declarative description of one VM instance.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VmSpec {
    pub image: String,
}

/// Nested child-exercise descriptor, as served by the catalog.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChildSpec {
    pub tag: Tag,
    pub name: String,
    /// Environment variable that receives the generated flag value.
    pub env_flag: String,
    pub points: u32,
    /// Static content reference for children scored outside the lab.
    pub static_flag: String,
    pub team_description: String,
    pub organizer_description: String,
    pub prerequisites: Vec<String>,
    pub outcomes: Vec<String>,
}

/// Companion category listing entry: category tag to display name.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Category {
    pub tag: Tag,
    pub name: String,
}

/// A scored secret proving completion of a child exercise.
///
/// Values are generated once per controller and never mutated, so a
/// team keeps solving against the same flag across environment resets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flag {
    pub tag: Tag,
    pub value: String,
    pub points: u32,
}

impl Flag {
    /// Generate a fresh flag value for a child exercise.
    pub fn generate(tag: Tag, points: u32) -> Self {
        Self {
            tag,
            value: Uuid::new_v4().to_string(),
            points,
        }
    }
}
