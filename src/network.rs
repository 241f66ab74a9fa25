//! Exercise network and last-octet allocation
//!
//! Every exercise owns a private /24 bridge network. Containers are
//! bound to it one octet at a time; the octet is what the controller
//! persists, so a recreated container can ask for the exact address it
//! held before. VMs attach through the Linux bridge interface instead.

use crate::error::{Error, Result};
use async_trait::async_trait;
use bollard::models::{EndpointIpamConfig, EndpointSettings, Ipam, IpamConfig};
use bollard::network::{ConnectNetworkOptions, CreateNetworkOptions, InspectNetworkOptions};
use bollard::Docker;
use parking_lot::Mutex;
use std::collections::HashSet;
use tracing::{debug, info};

/// Lowest host octet handed out to instances; `.1` is the gateway.
pub const OCTET_MIN: u8 = 2;
/// Highest assignable host octet in a /24.
pub const OCTET_MAX: u8 = 254;

const GATEWAY_OCTET: u8 = 1;

/// Binds instances into an exercise's private subnet.
#[async_trait]
pub trait ExerciseNetwork: Send + Sync {
    /// Attach a container to the network.
    ///
    /// With `fixed` set the exact octet is requested and honored or the
    /// call fails; otherwise the network chooses the next free octet.
    /// Returns the octet the container ended up with.
    async fn connect(&self, container_id: &str, fixed: Option<u8>) -> Result<u8>;

    /// Format a host octet into a full address on this subnet.
    fn format_ip(&self, octet: u8) -> String;

    /// Bridge interface identifier, consumed when bridging VMs.
    fn interface(&self) -> String;
}

/// Tracks which host octets this process has handed out.
///
/// Automatic assignment consults the pool; fixed requests only
/// range-check, since on the reuse path the daemon is authoritative
/// for collisions.
struct OctetPool {
    taken: HashSet<u8>,
}

impl OctetPool {
    fn new() -> Self {
        let mut taken = HashSet::new();
        taken.insert(GATEWAY_OCTET);
        Self { taken }
    }

    fn acquire(&mut self) -> Result<u8> {
        for octet in OCTET_MIN..=OCTET_MAX {
            if !self.taken.contains(&octet) {
                self.taken.insert(octet);
                return Ok(octet);
            }
        }
        Err(Error::NetworkBind("subnet exhausted".to_string()))
    }

    fn claim(&mut self, octet: u8) -> Result<()> {
        if !(OCTET_MIN..=OCTET_MAX).contains(&octet) {
            return Err(Error::NetworkBind(format!(
                "octet {octet} outside assignable range {OCTET_MIN}-{OCTET_MAX}"
            )));
        }
        self.taken.insert(octet);
        Ok(())
    }

    fn release(&mut self, octet: u8) {
        self.taken.remove(&octet);
    }
}

/// Private per-exercise bridge network on the Docker daemon.
pub struct DockerNetwork {
    docker: Docker,
    name: String,
    id: String,
    prefix: String,
    pool: Mutex<OctetPool>,
}

impl DockerNetwork {
    /// Create the network with an explicit /24 subnet, e.g. prefix
    /// `"172.16.5"` yields `172.16.5.0/24`.
    pub async fn create(
        docker: Docker,
        name: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Result<Self> {
        let name = name.into();
        let prefix = prefix.into();
        validate_prefix(&prefix)?;

        let options = CreateNetworkOptions {
            name: name.clone(),
            driver: "bridge".to_string(),
            ipam: Ipam {
                driver: Some("default".to_string()),
                config: Some(vec![IpamConfig {
                    subnet: Some(format!("{prefix}.0/24")),
                    gateway: Some(format!("{prefix}.{GATEWAY_OCTET}")),
                    ..Default::default()
                }]),
                ..Default::default()
            },
            ..Default::default()
        };

        docker
            .create_network(options)
            .await
            .map(|_| ())
            .map_err(|e| Error::NetworkBind(format!("failed to create network {name}: {e}")))?;

        let inspected = docker
            .inspect_network(&name, None::<InspectNetworkOptions<String>>)
            .await
            .map_err(|e| Error::NetworkBind(format!("failed to inspect network {name}: {e}")))?;
        let id = inspected.id.unwrap_or_else(|| name.clone());

        info!(network = %name, subnet = %format!("{prefix}.0/24"), "exercise network created");

        Ok(Self {
            docker,
            name,
            id,
            prefix,
            pool: Mutex::new(OctetPool::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn subnet(&self) -> String {
        format!("{}.0/24", self.prefix)
    }
}

#[async_trait]
impl ExerciseNetwork for DockerNetwork {
    async fn connect(&self, container_id: &str, fixed: Option<u8>) -> Result<u8> {
        let octet = match fixed {
            Some(octet) => {
                self.pool.lock().claim(octet)?;
                octet
            }
            None => self.pool.lock().acquire()?,
        };

        let options = ConnectNetworkOptions {
            container: container_id.to_string(),
            endpoint_config: EndpointSettings {
                ipam_config: Some(EndpointIpamConfig {
                    ipv4_address: Some(self.format_ip(octet)),
                    ..Default::default()
                }),
                ..Default::default()
            },
        };

        if let Err(e) = self.docker.connect_network(&self.name, options).await {
            self.pool.lock().release(octet);
            return Err(Error::NetworkBind(format!(
                "failed to bind {} to {container_id}: {e}",
                self.format_ip(octet)
            )));
        }

        debug!(container_id, address = %self.format_ip(octet), "container connected");
        Ok(octet)
    }

    fn format_ip(&self, octet: u8) -> String {
        format!("{}.{octet}", self.prefix)
    }

    fn interface(&self) -> String {
        bridge_interface(&self.id)
    }
}

fn validate_prefix(prefix: &str) -> Result<()> {
    let parts: Vec<&str> = prefix.split('.').collect();
    if parts.len() != 3 || parts.iter().any(|p| p.parse::<u8>().is_err()) {
        return Err(Error::InvalidSubnet(format!(
            "expected a dotted /24 prefix like 172.16.5, got {prefix:?}"
        )));
    }
    Ok(())
}

/// Linux bridge name the daemon gives a network's interface.
fn bridge_interface(network_id: &str) -> String {
    format!("br-{}", network_id.get(..12).unwrap_or(network_id))
}
