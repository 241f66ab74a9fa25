//! Exercise lifecycle controller
//!
//! Turns a declarative [`ExerciseSpec`] into a running, addressable set
//! of instances and drives it through its lifecycle. The controller
//! owns the machine list, the last-octet allocation table and the
//! synthesized DNS record set; the three collaborators it is built
//! with do the actual provisioning.
//!
//! Every operation is fail-fast: the first error aborts the remaining
//! per-instance steps and is returned unmodified, leaving whatever
//! partial progress was made observable. Callers clean up with
//! [`Exercise::close`]. Operations take `&mut self`, so serialization
//! per environment is enforced by the borrow checker; distinct
//! environments share nothing and run concurrently.

use crate::dns::{resolve_records, Record};
use crate::docker::ContainerHost;
use crate::error::Result;
use crate::instance::{Instance, LifecycleState};
use crate::network::ExerciseNetwork;
use crate::spec::{ExerciseSpec, Flag};
use crate::vm::VmLibrary;
use std::sync::Arc;
use tracing::{debug, info};

/// Controller for one isolated exercise environment.
pub struct Exercise {
    spec: ExerciseSpec,
    dns_addr: String,
    flags: Vec<Flag>,
    machines: Vec<Box<dyn Instance>>,
    /// Last-octet per container spec position; empty until the first
    /// successful [`create`](Self::create), fixed afterwards so resets
    /// reproduce identical addresses.
    ips: Vec<u8>,
    dns_records: Vec<Record>,
    state: LifecycleState,
    host: Arc<dyn ContainerHost>,
    library: Arc<dyn VmLibrary>,
    network: Arc<dyn ExerciseNetwork>,
}

impl Exercise {
    /// Build a controller over a spec and its collaborators.
    ///
    /// Flag values for the spec's child exercises are generated here,
    /// once, so they survive environment resets.
    pub fn new(
        spec: ExerciseSpec,
        dns_addr: impl Into<String>,
        host: Arc<dyn ContainerHost>,
        library: Arc<dyn VmLibrary>,
        network: Arc<dyn ExerciseNetwork>,
    ) -> Self {
        let flags = spec
            .containers
            .iter()
            .flat_map(|c| c.children.iter())
            .filter(|child| !child.env_flag.is_empty())
            .map(|child| Flag::generate(child.tag.clone(), child.points))
            .collect();

        Self {
            spec,
            dns_addr: dns_addr.into(),
            flags,
            machines: Vec::new(),
            ips: Vec::new(),
            dns_records: Vec::new(),
            state: LifecycleState::default(),
            host,
            library,
            network,
        }
    }

    /// Provision every instance of the exercise.
    ///
    /// Containers come first, in spec order: each is created, bound to
    /// the exercise network (reusing its previous octet when the table
    /// holds one for its position), and its DNS record templates are
    /// resolved against the bound address. VMs follow, bridged onto the
    /// network interface. The record set is rebuilt from scratch on
    /// every call.
    pub async fn create(&mut self) -> Result<()> {
        let first_creation = self.ips.is_empty();
        let mut new_ips: Vec<u8> = Vec::new();
        self.dns_records.clear();

        let containers = self.spec.containers.clone();
        for (i, mut spec) in containers.into_iter().enumerate() {
            spec.dns = vec![self.dns_addr.clone()];
            for child in &spec.children {
                if child.env_flag.is_empty() {
                    continue;
                }
                if let Some(flag) = self.flags.iter().find(|f| f.tag == child.tag) {
                    spec.envs.insert(child.env_flag.clone(), flag.value.clone());
                }
            }

            let container = self.host.create(&spec).await?;

            let octet = match self.ips.get(i).copied() {
                Some(fixed) => self.network.connect(container.id(), Some(fixed)).await?,
                None => {
                    let octet = self.network.connect(container.id(), None).await?;
                    new_ips.push(octet);
                    octet
                }
            };

            let addr = self.network.format_ip(octet);
            self.dns_records
                .extend(resolve_records(&spec.records, &addr));

            debug!(container_id = %container.id(), %addr, "container wired into exercise network");
            self.machines.push(container);
        }

        for spec in self.spec.vms.clone() {
            let vm = self
                .library
                .get_copy(&spec.image, &self.network.interface())
                .await?;
            self.machines.push(vm);
        }

        if first_creation {
            self.ips = new_ips;
        }

        self.state = LifecycleState::Created;
        info!(
            exercise = %self.spec.tag,
            machines = self.machines.len(),
            "exercise environment created"
        );
        Ok(())
    }

    /// Start every instance, in machine-list order.
    pub async fn start(&mut self) -> Result<()> {
        for machine in &self.machines {
            machine.start().await?;
        }
        self.state = LifecycleState::Running;
        debug!(exercise = %self.spec.tag, "exercise started");
        Ok(())
    }

    /// Stop every instance, in machine-list order.
    pub async fn stop(&mut self) -> Result<()> {
        for machine in &self.machines {
            machine.stop().await?;
        }
        self.state = LifecycleState::Stopped;
        debug!(exercise = %self.spec.tag, "exercise stopped");
        Ok(())
    }

    /// Stop, then start again. A failed stop leaves everything alone.
    pub async fn restart(&mut self) -> Result<()> {
        self.stop().await?;
        self.start().await
    }

    /// Tear down and rebuild the environment, then start it.
    ///
    /// The octet table survives, so recreated containers get the same
    /// addresses and the synthesized records resolve identically before
    /// and after.
    pub async fn reset(&mut self) -> Result<()> {
        self.close().await?;
        self.create().await?;
        self.start().await
    }

    /// Release every instance, in machine-list order.
    ///
    /// The machine list is emptied only once every release succeeded; a
    /// mid-loop failure leaves the list as it was, for the caller to
    /// retry or inspect.
    pub async fn close(&mut self) -> Result<()> {
        for machine in &self.machines {
            machine.close().await?;
        }
        self.machines.clear();
        self.state = LifecycleState::Closed;
        info!(exercise = %self.spec.tag, "exercise environment closed");
        Ok(())
    }

    pub fn spec(&self) -> &ExerciseSpec {
        &self.spec
    }

    /// Live instances, containers first in spec order, then VMs.
    pub fn machines(&self) -> &[Box<dyn Instance>] {
        &self.machines
    }

    /// Last-octet allocation table, index-aligned with container specs.
    pub fn ip_table(&self) -> &[u8] {
        &self.ips
    }

    /// The record set synthesized by the latest [`create`](Self::create).
    pub fn dns_records(&self) -> &[Record] {
        &self.dns_records
    }

    /// Flags generated for the spec's child exercises.
    pub fn flags(&self) -> &[Flag] {
        &self.flags
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }
}
