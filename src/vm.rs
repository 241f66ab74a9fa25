//! VM provisioning boundary
//!
//! Full virtual machines come out of an image library managed by the
//! hypervisor integration, which lives outside this crate. The
//! controller only needs one operation: clone a base image with its
//! NIC bridged onto the exercise network.

use crate::error::Result;
use crate::instance::Instance;
use async_trait::async_trait;

/// Clones VM images into running instances.
#[async_trait]
pub trait VmLibrary: Send + Sync {
    /// Clone `image` with its network adapter bridged onto `bridge`,
    /// the exercise network's interface identifier.
    async fn get_copy(&self, image: &str, bridge: &str) -> Result<Box<dyn Instance>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    struct RecordedClone {
        image: String,
        bridge: String,
    }

    struct MockLibrary {
        clones: Arc<Mutex<Vec<RecordedClone>>>,
    }

    struct MockVm {
        id: String,
    }

    #[async_trait]
    impl Instance for MockVm {
        fn id(&self) -> &str {
            &self.id
        }

        async fn start(&self) -> Result<()> {
            Ok(())
        }

        async fn stop(&self) -> Result<()> {
            Ok(())
        }

        async fn close(&self) -> Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl VmLibrary for MockLibrary {
        async fn get_copy(&self, image: &str, bridge: &str) -> Result<Box<dyn Instance>> {
            let mut clones = self.clones.lock();
            clones.push(RecordedClone {
                image: image.to_string(),
                bridge: bridge.to_string(),
            });
            Ok(Box::new(MockVm {
                id: format!("vm-{}", clones.len()),
            }))
        }
    }

    #[test]
    fn test_clone_receives_bridge() {
        tokio_test::block_on(async {
            let clones = Arc::new(Mutex::new(Vec::new()));
            let library = MockLibrary {
                clones: clones.clone(),
            };

            let vm = library.get_copy("kali-base", "br-0a1b2c3d4e5f").await.unwrap();
            assert_eq!(vm.id(), "vm-1");

            let recorded = clones.lock();
            assert_eq!(recorded[0].image, "kali-base");
            assert_eq!(recorded[0].bridge, "br-0a1b2c3d4e5f");
        });
    }
}
