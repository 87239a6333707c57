//! In-memory collaborators for unit tests.

use crate::config::PcfdevConfig;
use crate::context::{Collaborators, Context};
use crate::error::Result as CoreResult;
use crate::factory::VmFactory;
use crate::host::{CertStore, CloudFoundryCli, Ui};
use crate::provision;
use async_trait::async_trait;
use pcfdev_vm::{
    ip_for_subnet, AddressTable, Driver, GuestShell, HostMemory, HostNetwork, NetworkInterface,
    Prober, Result, RunState, VmError, VmResources,
};
use std::collections::{BTreeMap, HashMap};
use std::net::Ipv4Addr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Name of the VM most tests operate on.
pub const TEST_VM: &str = "pcfdev-test";

struct FakeVm {
    state: RunState,
    interface: Option<String>,
    resources: VmResources,
    ports: HashMap<String, u16>,
}

#[derive(Default)]
struct DriverState {
    vms: BTreeMap<String, FakeVm>,
    host_only: Vec<NetworkInterface>,
    calls: Vec<String>,
    failures: HashMap<String, String>,
}

/// Hypervisor that keeps VMs in memory and records every call.
#[derive(Default)]
pub struct FakeDriver {
    state: Mutex<DriverState>,
}

impl FakeDriver {
    /// Register a VM with default resources and no networking.
    pub fn add_vm(&self, name: &str, state: RunState) {
        self.state.lock().unwrap().vms.insert(
            name.to_string(),
            FakeVm {
                state,
                interface: None,
                resources: VmResources {
                    memory_mb: 4096,
                    cpus: 2,
                },
                ports: HashMap::new(),
            },
        );
    }

    /// Attach `interface` to `name` and forward `ssh_port` to it.
    pub fn wire(&self, name: &str, interface: &str, ssh_port: u16) {
        let mut state = self.state.lock().unwrap();
        let vm = state.vms.get_mut(name).unwrap();
        vm.interface = Some(interface.to_string());
        vm.ports.insert("ssh".to_string(), ssh_port);
    }

    pub fn add_host_only_interface(&self, name: &str, ip: Ipv4Addr) {
        self.state
            .lock()
            .unwrap()
            .host_only
            .push(NetworkInterface::existing(name, ip));
    }

    /// Make every call to `op` fail with `message`.
    pub fn fail(&self, op: &str, message: &str) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(op.to_string(), message.to_string());
    }

    pub fn vm_state_of(&self, name: &str) -> Option<RunState> {
        self.state
            .lock()
            .unwrap()
            .vms
            .get(name)
            .map(|vm| vm.state.clone())
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn called(&self, call: &str) -> bool {
        self.calls().iter().any(|c| c == call)
    }

    pub fn called_prefix(&self, prefix: &str) -> bool {
        self.calls_with_prefix(prefix) > 0
    }

    pub fn calls_with_prefix(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn record(&self, op: &str, args: &[&str]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let mut entry = op.to_string();
        for arg in args {
            entry.push(':');
            entry.push_str(arg);
        }
        state.calls.push(entry);
        match state.failures.get(op) {
            Some(message) => Err(VmError::Driver(message.clone())),
            None => Ok(()),
        }
    }

    fn with_vm<T>(&self, name: &str, f: impl FnOnce(&mut FakeVm) -> T) -> Result<T> {
        let mut state = self.state.lock().unwrap();
        state
            .vms
            .get_mut(name)
            .map(f)
            .ok_or_else(|| VmError::Driver(format!("VM {name} not found")))
    }

    fn set_state(&self, name: &str, run_state: RunState) -> Result<()> {
        self.with_vm(name, |vm| vm.state = run_state)
    }
}

#[async_trait]
impl Driver for FakeDriver {
    async fn start_vm(&self, name: &str) -> Result<()> {
        self.record("start_vm", &[name])?;
        self.set_state(name, RunState::Running)
    }

    async fn stop_vm(&self, name: &str) -> Result<()> {
        self.record("stop_vm", &[name])?;
        self.set_state(name, RunState::PoweredOff)
    }

    async fn suspend_vm(&self, name: &str) -> Result<()> {
        self.record("suspend_vm", &[name])?;
        self.set_state(name, RunState::Suspended)
    }

    async fn resume_vm(&self, name: &str) -> Result<()> {
        self.record("resume_vm", &[name])?;
        self.set_state(name, RunState::Running)
    }

    async fn destroy_vm(&self, name: &str) -> Result<()> {
        self.record("destroy_vm", &[name])?;
        self.state
            .lock()
            .unwrap()
            .vms
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| VmError::Driver(format!("VM {name} not found")))
    }

    async fn vm_exists(&self, name: &str) -> Result<bool> {
        self.record("vm_exists", &[name])?;
        Ok(self.state.lock().unwrap().vms.contains_key(name))
    }

    async fn is_vm_running(&self, name: &str) -> Result<bool> {
        self.record("is_vm_running", &[name])?;
        self.with_vm(name, |vm| vm.state == RunState::Running)
    }

    async fn vm_state(&self, name: &str) -> Result<RunState> {
        self.record("vm_state", &[name])?;
        self.with_vm(name, |vm| vm.state.clone())
    }

    async fn get_vm_ip(&self, name: &str) -> Result<Ipv4Addr> {
        self.record("get_vm_ip", &[name])?;
        let interface = self
            .with_vm(name, |vm| vm.interface.clone())?
            .ok_or_else(|| VmError::Driver(format!("VM {name} has no host-only interface")))?;
        let state = self.state.lock().unwrap();
        state
            .host_only
            .iter()
            .find(|i| i.name == interface)
            .map(|i| ip_for_subnet(i.ip))
            .ok_or_else(|| VmError::Driver(format!("interface {interface} not found")))
    }

    async fn get_host_forward_port(&self, name: &str, rule_name: &str) -> Result<u16> {
        self.record("get_host_forward_port", &[name, rule_name])?;
        self.with_vm(name, |vm| vm.ports.get(rule_name).copied())?
            .ok_or_else(|| VmError::Driver(format!("no forwarding rule {rule_name}")))
    }

    async fn get_vm_resources(&self, name: &str) -> Result<VmResources> {
        self.record("get_vm_resources", &[name])?;
        self.with_vm(name, |vm| vm.resources)
    }

    async fn get_host_only_interfaces(&self) -> Result<Vec<NetworkInterface>> {
        self.record("get_host_only_interfaces", &[])?;
        Ok(self.state.lock().unwrap().host_only.clone())
    }

    async fn create_host_only_interface(&self, ip: Ipv4Addr) -> Result<String> {
        self.record("create_host_only_interface", &[ip.to_string().as_str()])?;
        let mut state = self.state.lock().unwrap();
        let name = format!("vboxnet{}", state.host_only.len());
        state
            .host_only
            .push(NetworkInterface::existing(name.clone(), ip));
        Ok(name)
    }

    async fn attach_network_interface(&self, interface_name: &str, name: &str) -> Result<()> {
        self.record("attach_network_interface", &[interface_name, name])?;
        self.with_vm(name, |vm| vm.interface = Some(interface_name.to_string()))
    }

    async fn import_vm(&self, name: &str, _image_path: &Path) -> Result<()> {
        self.record("import_vm", &[name])?;
        self.add_vm(name, RunState::PoweredOff);
        Ok(())
    }

    async fn configure_vm(&self, name: &str, resources: VmResources) -> Result<()> {
        self.record("configure_vm", &[name])?;
        self.with_vm(name, |vm| vm.resources = resources)
    }

    async fn forward_port(
        &self,
        name: &str,
        rule_name: &str,
        host_port: u16,
        _guest_port: u16,
    ) -> Result<()> {
        self.record("forward_port", &[name, rule_name])?;
        self.with_vm(name, |vm| {
            vm.ports.insert(rule_name.to_string(), host_port);
        })
    }

    async fn list_vms(&self) -> Result<Vec<String>> {
        self.record("list_vms", &[])?;
        Ok(self.state.lock().unwrap().vms.keys().cloned().collect())
    }

    async fn vm_info(&self, name: &str) -> Result<String> {
        self.record("vm_info", &[name])?;
        self.with_vm(name, |vm| format!("name=\"{name}\"\nVMState=\"{}\"\n", vm.state))
    }
}

/// Host interface listing set by the test.
#[derive(Default)]
pub struct FakeNetwork {
    interfaces: Mutex<Vec<NetworkInterface>>,
}

impl FakeNetwork {
    pub fn set(&self, interfaces: Vec<NetworkInterface>) {
        *self.interfaces.lock().unwrap() = interfaces;
    }
}

#[async_trait]
impl HostNetwork for FakeNetwork {
    async fn interfaces(&self) -> Result<Vec<NetworkInterface>> {
        Ok(self.interfaces.lock().unwrap().clone())
    }
}

/// Prober answering for a configurable set of live addresses.
#[derive(Default)]
pub struct FakeProber {
    live: Mutex<Vec<Ipv4Addr>>,
    probed: Mutex<Vec<Ipv4Addr>>,
}

impl FakeProber {
    pub fn set_live(&self, live: Vec<Ipv4Addr>) {
        *self.live.lock().unwrap() = live;
    }

    pub fn probed(&self) -> Vec<Ipv4Addr> {
        self.probed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Prober for FakeProber {
    async fn try_ip(&self, ip: Ipv4Addr) -> Result<bool> {
        self.probed.lock().unwrap().push(ip);
        Ok(self.live.lock().unwrap().contains(&ip))
    }
}

#[derive(Default)]
struct ShellState {
    commands: Vec<String>,
    provisioned: bool,
    options: Option<String>,
    unreachable: bool,
    failures: Vec<(String, String)>,
    sessions: Vec<u16>,
}

/// Guest that understands the provisioning commands.
///
/// Running the provisioning script creates the marker, and writing the
/// options file makes them readable again.
#[derive(Default)]
pub struct FakeShell {
    state: Mutex<ShellState>,
}

impl FakeShell {
    pub fn set_provisioned(&self, provisioned: bool) {
        self.state.lock().unwrap().provisioned = provisioned;
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.lock().unwrap().unreachable = unreachable;
    }

    pub fn set_options(&self, json: &str) {
        self.state.lock().unwrap().options = Some(json.to_string());
    }

    /// Fail every command containing `pattern`.
    pub fn fail(&self, pattern: &str, message: &str) {
        self.state
            .lock()
            .unwrap()
            .failures
            .push((pattern.to_string(), message.to_string()));
    }

    pub fn commands(&self) -> Vec<String> {
        self.state.lock().unwrap().commands.clone()
    }

    /// Whether any command containing `pattern` was run.
    pub fn ran(&self, pattern: &str) -> bool {
        self.commands().iter().any(|c| c.contains(pattern))
    }

    pub fn sessions(&self) -> Vec<u16> {
        self.state.lock().unwrap().sessions.clone()
    }

    fn execute(&self, command: &str) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        if state.unreachable {
            return Err(VmError::Ssh("connection refused".into()));
        }
        state.commands.push(command.to_string());
        if let Some((_, message)) = state.failures.iter().find(|(p, _)| command.contains(p)) {
            return Err(VmError::Ssh(message.clone()));
        }

        if command == provision::marker_check_command() {
            return Ok(if state.provisioned {
                "provisioned\n".to_string()
            } else {
                String::new()
            });
        }
        if command == provision::read_options_command() {
            return Ok(state.options.clone().unwrap_or_default());
        }
        if let Some(json) = command
            .strip_prefix("echo '")
            .and_then(|rest| rest.split("' | sudo tee /var/pcfdev/provision-options.json").next())
            .filter(|_| command.contains("provision-options.json"))
        {
            state.options = Some(json.to_string());
        }
        if command.starts_with("sudo -H /var/pcfdev/provision ") {
            state.provisioned = true;
        }
        Ok(format!("output of {command}"))
    }
}

#[async_trait]
impl GuestShell for FakeShell {
    async fn run_command(
        &self,
        command: &str,
        _host: &str,
        _port: u16,
        _timeout: Duration,
    ) -> Result<()> {
        self.execute(command).map(|_| ())
    }

    async fn get_output(
        &self,
        command: &str,
        _host: &str,
        _port: u16,
        _timeout: Duration,
    ) -> Result<String> {
        self.execute(command)
    }

    async fn start_session(&self, _host: &str, port: u16, _timeout: Duration) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.unreachable {
            return Err(VmError::Ssh("connection refused".into()));
        }
        state.sessions.push(port);
        Ok(())
    }
}

/// Host with a fixed amount of free memory.
pub struct FakeMemory {
    free_mb: Mutex<u64>,
}

impl Default for FakeMemory {
    fn default() -> Self {
        Self {
            free_mb: Mutex::new(8192),
        }
    }
}

impl FakeMemory {
    pub fn set_free(&self, mb: u64) {
        *self.free_mb.lock().unwrap() = mb;
    }
}

#[async_trait]
impl HostMemory for FakeMemory {
    async fn free_memory_mb(&self) -> Result<u64> {
        Ok(*self.free_mb.lock().unwrap())
    }

    async fn total_memory_mb(&self) -> Result<u64> {
        Ok(16384)
    }
}

/// Terminal that records output and answers prompts with a preset reply.
#[derive(Default)]
pub struct FakeUi {
    said: Mutex<Vec<String>>,
    prompts: Mutex<Vec<String>>,
    answer: Mutex<bool>,
}

impl FakeUi {
    pub fn said(&self) -> Vec<String> {
        self.said.lock().unwrap().clone()
    }

    pub fn said_contains(&self, text: &str) -> bool {
        self.said().iter().any(|s| s.contains(text))
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn set_answer(&self, answer: bool) {
        *self.answer.lock().unwrap() = answer;
    }
}

impl Ui for FakeUi {
    fn say(&self, message: &str) {
        self.said.lock().unwrap().push(message.to_string());
    }

    fn confirm(&self, prompt: &str) -> bool {
        self.prompts.lock().unwrap().push(prompt.to_string());
        *self.answer.lock().unwrap()
    }
}

#[derive(Default)]
pub struct FakeCertStore {
    stored: Mutex<Vec<String>>,
}

impl FakeCertStore {
    pub fn stored(&self) -> Vec<String> {
        self.stored.lock().unwrap().clone()
    }
}

#[async_trait]
impl CertStore for FakeCertStore {
    async fn store(&self, cert_pem: &str) -> CoreResult<()> {
        self.stored.lock().unwrap().push(cert_pem.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeCf {
    targets: Mutex<Vec<[String; 4]>>,
}

impl FakeCf {
    pub fn targets(&self) -> Vec<[String; 4]> {
        self.targets.lock().unwrap().clone()
    }
}

#[async_trait]
impl CloudFoundryCli for FakeCf {
    async fn target(&self, api: &str, user: &str, password: &str, org: &str) -> CoreResult<()> {
        self.targets.lock().unwrap().push([
            api.to_string(),
            user.to_string(),
            password.to_string(),
            org.to_string(),
        ]);
        Ok(())
    }
}

/// A [`Context`] wired to fakes, with handles to each of them.
pub struct Harness {
    pub ctx: Arc<Context>,
    pub driver: Arc<FakeDriver>,
    pub network: Arc<FakeNetwork>,
    pub prober: Arc<FakeProber>,
    pub shell: Arc<FakeShell>,
    pub memory: Arc<FakeMemory>,
    pub ui: Arc<FakeUi>,
    pub cert_store: Arc<FakeCertStore>,
    pub cf: Arc<FakeCf>,
}

impl Harness {
    pub fn new() -> Self {
        let driver = Arc::new(FakeDriver::default());
        let network = Arc::new(FakeNetwork::default());
        let prober = Arc::new(FakeProber::default());
        let shell = Arc::new(FakeShell::default());
        let memory = Arc::new(FakeMemory::default());
        let ui = Arc::new(FakeUi::default());
        let cert_store = Arc::new(FakeCertStore::default());
        let cf = Arc::new(FakeCf::default());

        let collaborators = Collaborators {
            driver: driver.clone(),
            network: network.clone(),
            prober: prober.clone(),
            shell: shell.clone(),
            memory: memory.clone(),
            ui: ui.clone(),
            cert_store: cert_store.clone(),
            cf: cf.clone(),
        };
        let ctx = Context::new(
            PcfdevConfig::default(),
            AddressTable::default(),
            collaborators,
        );

        Self {
            ctx: Arc::new(ctx),
            driver,
            network,
            prober,
            shell,
            memory,
            ui,
            cert_store,
            cf,
        }
    }

    pub fn factory(&self) -> VmFactory {
        VmFactory::new(Arc::clone(&self.ctx))
    }

    /// Register [`TEST_VM`] at 192.168.22.11 with SSH on port 2222.
    pub fn add_test_vm(&self, state: RunState) {
        self.driver
            .add_host_only_interface("vboxnet1", Ipv4Addr::new(192, 168, 22, 1));
        self.driver.add_vm(TEST_VM, state);
        self.driver.wire(TEST_VM, "vboxnet1", 2222);
    }

    /// Current state of [`TEST_VM`], with call records cleared.
    pub async fn test_vm(&self) -> crate::state::Vm {
        let vm = self.factory().vm(TEST_VM).await.unwrap();
        self.driver.clear_calls();
        vm
    }
}
