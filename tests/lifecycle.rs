//! End-to-end lifecycle test: a full exercise environment driven
//! through create/start/restart/reset/close against scripted
//! collaborators.

use async_trait::async_trait;
use cyberlab::{
    ContainerHost, ContainerSpec, Error, Exercise, ExerciseNetwork, ExerciseSpec, Instance,
    LifecycleState, Record, Result, Tag, VmLibrary, VmSpec,
};
use parking_lot::Mutex;
use std::sync::Arc;

type CallLog = Arc<Mutex<Vec<String>>>;

struct ScriptedInstance {
    id: String,
    log: CallLog,
}

#[async_trait]
impl Instance for ScriptedInstance {
    fn id(&self) -> &str {
        &self.id
    }

    async fn start(&self) -> Result<()> {
        self.log.lock().push(format!("start {}", self.id));
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.log.lock().push(format!("stop {}", self.id));
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.log.lock().push(format!("close {}", self.id));
        Ok(())
    }
}

struct ScriptedHost {
    log: CallLog,
    count: Mutex<usize>,
}

#[async_trait]
impl ContainerHost for ScriptedHost {
    async fn create(&self, _spec: &ContainerSpec) -> Result<Box<dyn Instance>> {
        let mut count = self.count.lock();
        let id = format!("container-{}", *count);
        *count += 1;
        Ok(Box::new(ScriptedInstance {
            id,
            log: self.log.clone(),
        }))
    }
}

struct ScriptedLibrary {
    log: CallLog,
}

#[async_trait]
impl VmLibrary for ScriptedLibrary {
    async fn get_copy(&self, image: &str, bridge: &str) -> Result<Box<dyn Instance>> {
        assert_eq!(bridge, "br-0a1b2c3d4e5f");
        Ok(Box::new(ScriptedInstance {
            id: format!("vm-{image}"),
            log: self.log.clone(),
        }))
    }
}

struct ScriptedNetwork {
    next: Mutex<u8>,
}

#[async_trait]
impl ExerciseNetwork for ScriptedNetwork {
    async fn connect(&self, _container_id: &str, fixed: Option<u8>) -> Result<u8> {
        match fixed {
            Some(octet) => Ok(octet),
            None => {
                let mut next = self.next.lock();
                let octet = *next;
                *next += 1;
                Ok(octet)
            }
        }
    }

    fn format_ip(&self, octet: u8) -> String {
        format!("172.16.80.{octet}")
    }

    fn interface(&self) -> String {
        "br-0a1b2c3d4e5f".to_string()
    }
}

fn web_exercise() -> ExerciseSpec {
    ExerciseSpec {
        tag: Tag::new("heartbleed").unwrap(),
        name: "Heartbleed".to_string(),
        containers: vec![
            ContainerSpec {
                image: "registry.lab/heartbleed:latest".to_string(),
                records: vec![Record::new("A", "vault.training.lab", "")],
                ..Default::default()
            },
            ContainerSpec {
                image: "registry.lab/heartbleed-helper:latest".to_string(),
                ..Default::default()
            },
        ],
        vms: vec![VmSpec {
            image: "kali-base".to_string(),
        }],
        ..Default::default()
    }
}

fn environment() -> (Exercise, CallLog) {
    let log: CallLog = Arc::new(Mutex::new(Vec::new()));
    let exercise = Exercise::new(
        web_exercise(),
        "172.16.80.3",
        Arc::new(ScriptedHost {
            log: log.clone(),
            count: Mutex::new(0),
        }),
        Arc::new(ScriptedLibrary { log: log.clone() }),
        Arc::new(ScriptedNetwork {
            next: Mutex::new(16),
        }),
    );
    (exercise, log)
}

#[tokio::test]
async fn full_lifecycle_round_trip() {
    let (mut exercise, log) = environment();

    exercise.create().await.unwrap();
    assert_eq!(exercise.machines().len(), 3);
    assert_eq!(exercise.ip_table(), &[16, 17]);
    assert_eq!(exercise.dns_records()[0].rdata, "172.16.80.16");
    assert_eq!(exercise.state(), LifecycleState::Created);

    exercise.start().await.unwrap();
    assert_eq!(exercise.state(), LifecycleState::Running);

    exercise.restart().await.unwrap();
    assert_eq!(exercise.state(), LifecycleState::Running);

    // Stop of every machine strictly precedes any restart-started one.
    {
        let calls = log.lock();
        let last_stop = calls
            .iter()
            .rposition(|c| c.starts_with("stop"))
            .expect("restart stopped machines");
        let first_restart_start = calls
            .iter()
            .enumerate()
            .skip(3) // the initial start of all three machines
            .find(|(_, c)| c.starts_with("start"))
            .map(|(i, _)| i)
            .expect("restart started machines");
        assert!(last_stop < first_restart_start);
    }

    exercise.reset().await.unwrap();
    assert_eq!(exercise.state(), LifecycleState::Running);
    assert_eq!(exercise.ip_table(), &[16, 17]);
    assert_eq!(exercise.machines().len(), 3);
    assert_eq!(exercise.dns_records()[0].rdata, "172.16.80.16");

    exercise.close().await.unwrap();
    assert!(exercise.machines().is_empty());
    assert_eq!(exercise.state(), LifecycleState::Closed);

    // Driving a closed environment is a harmless no-op.
    exercise.start().await.unwrap();
    exercise.stop().await.unwrap();
    exercise.close().await.unwrap();
}

struct FailingHost;

#[async_trait]
impl ContainerHost for FailingHost {
    async fn create(&self, spec: &ContainerSpec) -> Result<Box<dyn Instance>> {
        Err(Error::Provisioning(format!(
            "no such image: {}",
            spec.image
        )))
    }
}

#[tokio::test]
async fn provisioning_failure_surfaces_verbatim() {
    let log: CallLog = Arc::new(Mutex::new(Vec::new()));
    let mut exercise = Exercise::new(
        web_exercise(),
        "172.16.80.3",
        Arc::new(FailingHost),
        Arc::new(ScriptedLibrary { log }),
        Arc::new(ScriptedNetwork {
            next: Mutex::new(16),
        }),
    );

    let err = exercise.create().await.unwrap_err();
    assert!(matches!(err, Error::Provisioning(_)));
    assert_eq!(
        err.to_string(),
        "provisioning failed: no such image: registry.lab/heartbleed:latest"
    );
    assert!(exercise.machines().is_empty());
    assert!(exercise.ip_table().is_empty());
}
