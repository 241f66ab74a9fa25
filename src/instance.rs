//! Polymorphic handle over a running virtual instance
//!
//! Containers and VMs expose the same capability set. The lifecycle
//! controller drives instances exclusively through this trait and never
//! branches on what backs a handle, only on which collaborator produced
//! it.

use crate::error::Result;
use async_trait::async_trait;

/// A live container or virtual machine under controller ownership.
#[async_trait]
pub trait Instance: Send + Sync {
    /// Engine-side identifier, consumed when wiring the instance into
    /// the exercise network.
    fn id(&self) -> &str;

    async fn start(&self) -> Result<()>;

    async fn stop(&self) -> Result<()>;

    /// Release the underlying resource. The handle is not reusable
    /// afterwards.
    async fn close(&self) -> Result<()>;
}

/// Where an exercise environment stands in its lifecycle.
///
/// Tracked for diagnostics; operations themselves act on the machine
/// list, so driving an empty environment is a harmless no-op rather
/// than a state error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LifecycleState {
    #[default]
    Uninitialized,
    Created,
    Running,
    Stopped,
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state() {
        assert_eq!(LifecycleState::default(), LifecycleState::Uninitialized);
    }
}
