//! Scripted collaborators for engine tests

#![allow(dead_code)]

use async_trait::async_trait;
use cott_core::{ComponentType, TestCase};
use cott_drivers::{ComponentDriver, Condition, DriverError, DriverResult, Row, TableSchema};
use cott_engine::{DefaultDriverFactory, DriverFactory, EngineResult};
use cott_runtime::{
    InstanceId, InstanceRuntime, LaunchSpec, ResourceSnapshot, RuntimeError, RuntimeResult,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory driver whose calls fail on scripted call numbers
#[derive(Default)]
pub struct FakeDriver {
    failures: HashMap<&'static str, BTreeSet<u32>>,
    calls: HashMap<&'static str, u32>,
    pings_until_ready: u32,
    hang_pings: bool,
    open: bool,
    databases: BTreeSet<String>,
    pub log: Arc<Mutex<Vec<String>>>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the `call`-th invocation (1-based) of `op`
    pub fn fail_on(mut self, op: &'static str, call: u32) -> Self {
        self.failures.entry(op).or_default().insert(call);
        self
    }

    /// The first `pings` probes fail
    pub fn not_ready_for(mut self, pings: u32) -> Self {
        self.pings_until_ready = pings;
        self
    }

    /// Probes never complete, like a host that silently drops packets
    pub fn hang_pings(mut self) -> Self {
        self.hang_pings = true;
        self
    }

    pub fn calls(&self, op: &str) -> u32 {
        self.calls.get(op).copied().unwrap_or(0)
    }

    fn call(&mut self, op: &'static str) -> DriverResult<()> {
        let count = self.calls.entry(op).or_insert(0);
        *count += 1;
        let count = *count;
        self.log.lock().unwrap().push(op.to_string());

        if self.failures.get(op).is_some_and(|calls| calls.contains(&count)) {
            return Err(DriverError::Database(format!("scripted failure of {}", op)));
        }
        Ok(())
    }

    fn connected(&self) -> DriverResult<()> {
        if self.open {
            Ok(())
        } else {
            Err(DriverError::ConnectionNotEstablished)
        }
    }
}

#[async_trait]
impl ComponentDriver for FakeDriver {
    fn component_type(&self) -> ComponentType {
        ComponentType::Postgres
    }

    async fn open(&mut self) -> DriverResult<()> {
        self.call("open")?;
        self.open = true;
        Ok(())
    }

    async fn ping(&mut self) -> DriverResult<()> {
        self.call("ping")?;
        self.connected()?;
        if self.hang_pings {
            std::future::pending::<()>().await;
        }
        if self.pings_until_ready > 0 {
            self.pings_until_ready -= 1;
            return Err(DriverError::Database(
                "the database system is starting up".to_string(),
            ));
        }
        Ok(())
    }

    async fn create_resource(&mut self, name: &str) -> DriverResult<()> {
        self.call("create_resource")?;
        self.connected()?;
        if !self.databases.insert(name.to_string()) {
            return Err(DriverError::Database(format!(
                "database \"{}\" already exists",
                name
            )));
        }
        Ok(())
    }

    async fn switch_context(&mut self, _name: Option<&str>) -> DriverResult<()> {
        self.call("switch_context")?;
        self.connected()
    }

    async fn drop_resource(&mut self, name: &str) -> DriverResult<()> {
        self.call("drop_resource")?;
        self.connected()?;
        if !self.databases.remove(name) {
            return Err(DriverError::Database(format!(
                "database \"{}\" does not exist",
                name
            )));
        }
        Ok(())
    }

    async fn close(&mut self) -> DriverResult<()> {
        self.call("close")?;
        self.connected()?;
        self.open = false;
        Ok(())
    }

    async fn create_table(&mut self, _schema: &TableSchema) -> DriverResult<()> {
        self.call("create_table")?;
        self.connected()
    }

    async fn drop_table(&mut self, _table: &str) -> DriverResult<()> {
        self.call("drop_table")?;
        self.connected()
    }

    async fn insert_rows(&mut self, _table: &str, _rows: &[Row]) -> DriverResult<()> {
        self.call("insert_rows")?;
        self.connected()
    }

    async fn select_by_id(&mut self, _table: &str, _id: i64) -> DriverResult<u64> {
        self.call("select_by_id")?;
        self.connected()?;
        Ok(1)
    }

    async fn select_by_condition(
        &mut self,
        _table: &str,
        _condition: &Condition,
    ) -> DriverResult<u64> {
        self.call("select_by_condition")?;
        self.connected()?;
        Ok(1)
    }

    async fn truncate(&mut self, _table: &str) -> DriverResult<()> {
        self.call("truncate")?;
        self.connected()
    }
}

/// Runtime whose n-th snapshot reports counters growing linearly with n
#[derive(Default)]
pub struct FakeRuntime {
    snapshots: AtomicU64,
    failing_snapshots: BTreeSet<u64>,
    fail_launch: bool,
    pub events: Mutex<Vec<String>>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the `call`-th snapshot (1-based)
    pub fn fail_snapshot(mut self, call: u64) -> Self {
        self.failing_snapshots.insert(call);
        self
    }

    pub fn fail_launch(mut self) -> Self {
        self.fail_launch = true;
        self
    }

    pub fn snapshot_calls(&self) -> u64 {
        self.snapshots.load(Ordering::SeqCst)
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn event(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl InstanceRuntime for FakeRuntime {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn pulls_images(&self) -> bool {
        true
    }

    async fn pull_image(&self, image: &str) -> RuntimeResult<()> {
        self.event(format!("pull {}", image));
        Ok(())
    }

    async fn launch(&self, spec: &LaunchSpec) -> RuntimeResult<InstanceId> {
        if self.fail_launch {
            return Err(RuntimeError::CommandFailed {
                command: "docker start".to_string(),
                stderr: "port is already allocated".to_string(),
            });
        }
        self.event(format!("launch {}:{}", spec.image, spec.port));
        Ok(InstanceId::new(format!("fake-{}", spec.port)))
    }

    async fn stop(&self, id: &InstanceId) -> RuntimeResult<()> {
        self.event(format!("stop {}", id));
        Ok(())
    }

    async fn remove(&self, id: &InstanceId) -> RuntimeResult<()> {
        self.event(format!("remove {}", id));
        Ok(())
    }

    async fn resource_snapshot(&self, _id: &InstanceId) -> RuntimeResult<ResourceSnapshot> {
        let n = self.snapshots.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing_snapshots.contains(&n) {
            return Err(RuntimeError::UnexpectedOutput("stats unavailable".to_string()));
        }
        Ok(ResourceSnapshot {
            cpu_time_nanos: Some(n * 1_000),
            memory_bytes: Some(1_000 + n * 10),
            block_read_bytes: Some(n * 100),
            block_write_bytes: Some(n * 200),
            net_rx_bytes: Some(n * 300),
            net_tx_bytes: Some(n * 400),
        })
    }
}

/// Hands out fake drivers for `postgres` cases, defers everything else
#[derive(Default)]
pub struct FakeDriverFactory;

impl DriverFactory for FakeDriverFactory {
    fn create(&self, test_case: &TestCase, host: &str) -> EngineResult<Box<dyn ComponentDriver>> {
        if test_case.component_type == "postgres" {
            Ok(Box::new(FakeDriver::new()))
        } else {
            DefaultDriverFactory.create(test_case, host)
        }
    }
}
