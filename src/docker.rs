//! Container provisioning against the Docker daemon
//!
//! The lifecycle controller consumes the [`ContainerHost`] trait; the
//! bollard-backed [`DockerHost`] is the production implementation.
//! Containers come up detached on the daemon's default network and are
//! wired into the exercise network by the network collaborator.

use crate::error::{Error, Result};
use crate::instance::Instance;
use crate::spec::ContainerSpec;
use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, RemoveContainerOptions, StartContainerOptions,
    StopContainerOptions,
};
use bollard::image::CreateImageOptions;
use bollard::models::HostConfig;
use bollard::Docker;
use futures::StreamExt;
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

/// Creates containers from declarative specs.
#[async_trait]
pub trait ContainerHost: Send + Sync {
    /// Provision a container; the returned handle is created but not
    /// started.
    async fn create(&self, spec: &ContainerSpec) -> Result<Box<dyn Instance>>;
}

/// Container host backed by the local Docker daemon.
pub struct DockerHost {
    docker: Docker,
}

impl DockerHost {
    /// Connect to the local daemon and verify it responds.
    pub async fn new() -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| Error::Provisioning(format!("failed to connect to Docker: {e}")))?;

        docker
            .ping()
            .await
            .map_err(|e| Error::Provisioning(format!("failed to ping Docker: {e}")))?;

        info!("connected to Docker daemon");
        Ok(Self { docker })
    }

    /// Pull an image if it is not already present.
    pub async fn ensure_image(&self, image: &str) -> Result<()> {
        if self.docker.inspect_image(image).await.is_ok() {
            debug!(%image, "image already present");
            return Ok(());
        }

        info!(%image, "pulling image");
        let options = CreateImageOptions {
            from_image: image,
            ..Default::default()
        };

        let mut stream = self.docker.create_image(Some(options), None, None);
        while let Some(result) = stream.next().await {
            result.map_err(|e| Error::Provisioning(format!("failed to pull {image}: {e}")))?;
        }

        info!(%image, "image pulled");
        Ok(())
    }
}

#[async_trait]
impl ContainerHost for DockerHost {
    async fn create(&self, spec: &ContainerSpec) -> Result<Box<dyn Instance>> {
        self.ensure_image(&spec.image).await?;

        let name = container_name();
        let host_config = HostConfig {
            memory: spec.memory_mb.map(memory_bytes),
            nano_cpus: spec.cpu.map(nano_cpus),
            dns: if spec.dns.is_empty() {
                None
            } else {
                Some(spec.dns.clone())
            },
            ..Default::default()
        };

        let config = Config {
            image: Some(spec.image.clone()),
            env: Some(render_envs(&spec.envs)),
            host_config: Some(host_config),
            ..Default::default()
        };

        let options = CreateContainerOptions {
            name: name.as_str(),
            platform: None,
        };

        let response = self
            .docker
            .create_container(Some(options), config)
            .await
            .map_err(|e| Error::Provisioning(format!("failed to create container: {e}")))?;

        debug!(container_id = %response.id, image = %spec.image, "container created");

        Ok(Box::new(DockerContainer {
            docker: self.docker.clone(),
            id: response.id,
            name,
        }))
    }
}

/// A created Docker container.
pub struct DockerContainer {
    docker: Docker,
    id: String,
    name: String,
}

impl DockerContainer {
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl Instance for DockerContainer {
    fn id(&self) -> &str {
        &self.id
    }

    async fn start(&self) -> Result<()> {
        self.docker
            .start_container(&self.id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| Error::Lifecycle(format!("failed to start {}: {e}", self.name)))?;

        debug!(container = %self.name, "container started");
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.docker
            .stop_container(&self.id, None::<StopContainerOptions>)
            .await
            .map_err(|e| Error::Lifecycle(format!("failed to stop {}: {e}", self.name)))?;

        debug!(container = %self.name, "container stopped");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let options = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };

        self.docker
            .remove_container(&self.id, Some(options))
            .await
            .map_err(|e| Error::Lifecycle(format!("failed to remove {}: {e}", self.name)))?;

        debug!(container = %self.name, "container removed");
        Ok(())
    }
}

fn container_name() -> String {
    format!("cyberlab-{}", &Uuid::new_v4().to_string()[..8])
}

fn memory_bytes(mb: u32) -> i64 {
    i64::from(mb) * 1024 * 1024
}

fn nano_cpus(cpus: f64) -> i64 {
    (cpus * 1_000_000_000.0) as i64
}

/// Render an env map as the `KEY=VALUE` list the daemon expects, in a
/// deterministic order.
fn render_envs(envs: &HashMap<String, String>) -> Vec<String> {
    let mut rendered: Vec<String> = envs.iter().map(|(k, v)| format!("{k}={v}")).collect();
    rendered.sort();
    rendered
}
