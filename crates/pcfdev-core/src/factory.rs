//! Builds the state object for a VM from what the hypervisor reports.

use crate::config::{VmConfig, SSH_HOST};
use crate::context::Context;
use crate::error::Result;
use crate::provision;
use crate::state::{
    Aborted, Invalid, NotCreated, Recoverable, Running, Stopped, Suspended, Unprovisioned, Vm,
};
use pcfdev_vm::RunState;
use std::sync::Arc;

/// Classifies VMs into lifecycle states.
///
/// Nothing is cached: every call to [`vm`](Self::vm) queries the hypervisor
/// and, for running VMs, the guest.
#[derive(Clone)]
pub struct VmFactory {
    ctx: Arc<Context>,
}

impl VmFactory {
    /// Create a factory over the given collaborators.
    pub fn new(ctx: Arc<Context>) -> Self {
        Self { ctx }
    }

    /// Current state of the VM called `name`.
    ///
    /// # Errors
    /// Only fails if the hypervisor cannot say whether the VM exists. A VM
    /// that exists but cannot be read is reported as [`Vm::Invalid`].
    pub async fn vm(&self, name: &str) -> Result<Vm> {
        if !self.ctx.vbox.vm_exists(name).await? {
            tracing::debug!(vm = %name, "VM not created");
            return Ok(Vm::NotCreated(NotCreated::new(name, Arc::clone(&self.ctx))));
        }

        let config = match self.ctx.vbox.vm_config(name).await {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(vm = %name, error = %e, "Failed to read VM configuration");
                return Ok(Vm::Invalid(Invalid::new(e.to_string())));
            }
        };

        let run_state = match self.ctx.vbox.vm_state(name).await {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(vm = %name, error = %e, "Failed to read VM state");
                return Ok(Vm::Invalid(Invalid::new(e.to_string())));
            }
        };

        let vm = self.classify(config, run_state).await;
        tracing::debug!(vm = %name, state = %vm.kind(), "Classified VM");
        Ok(vm)
    }

    async fn classify(&self, config: VmConfig, run_state: RunState) -> Vm {
        let ctx = Arc::clone(&self.ctx);
        match run_state {
            RunState::Running => self.classify_running(config).await,
            RunState::Suspended => Vm::Suspended(Suspended::new(config, ctx)),
            RunState::Saved => Vm::Saved(Suspended::new(config, ctx)),
            RunState::Paused => Vm::Paused(Suspended::new(config, ctx)),
            RunState::PoweredOff => Vm::Stopped(Stopped::new(config, ctx)),
            RunState::Aborted => Vm::Aborted(Aborted::new(config, ctx)),
            RunState::Unknown(state) => {
                Vm::Invalid(Invalid::new(format!("unknown VM state '{state}'")))
            }
        }
    }

    /// A running VM is only usable once the guest reports provisioning done.
    async fn classify_running(&self, config: VmConfig) -> Vm {
        let ctx = Arc::clone(&self.ctx);
        let marker = self
            .ctx
            .shell
            .get_output(
                &provision::marker_check_command(),
                SSH_HOST,
                config.ssh_port,
                self.ctx.settings.ssh_timeout,
            )
            .await;

        match marker {
            Ok(output) if provision::is_provisioned(&output) => {
                Vm::Running(Running::new(config, ctx))
            }
            Ok(_) => Vm::Unprovisioned(Unprovisioned::new(config, ctx)),
            Err(e) => {
                tracing::warn!(vm = %config.name, error = %e, "Guest unreachable");
                Vm::Recoverable(Recoverable::new(config, ctx))
            }
        }
    }
}
