//! VM lifecycle states.
//!
//! A [`Vm`] is a snapshot of one VM's state, built by
//! [`VmFactory`](crate::VmFactory). Each variant implements only the
//! operations that are legal in that state; everything else is answered with
//! a message or a typed rejection without touching any collaborator.
//! Transitions never mutate a `Vm`: callers query the factory again after an
//! operation succeeds.

mod aborted;
mod invalid;
mod not_created;
mod recoverable;
mod running;
mod stopped;
mod suspended;
mod unprovisioned;

pub use aborted::Aborted;
pub use invalid::Invalid;
pub use not_created::NotCreated;
pub use recoverable::Recoverable;
pub use running::Running;
pub use stopped::Stopped;
pub use suspended::Suspended;
pub use unprovisioned::Unprovisioned;

use crate::config::{VmConfig, SSH_HOST};
use crate::context::Context;
use crate::error::{CoreError, Result};
use crate::opts::StartOpts;
use futures::future::BoxFuture;
use std::fmt;
use std::path::Path;

/// Operations a state can be asked to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Start,
    Stop,
    Suspend,
    Resume,
    Destroy,
    Provision,
    Trust,
    Target,
    Ssh,
    DebugLogs,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Stop => write!(f, "stop"),
            Self::Suspend => write!(f, "suspend"),
            Self::Resume => write!(f, "resume"),
            Self::Destroy => write!(f, "destroy"),
            Self::Provision => write!(f, "provision"),
            Self::Trust => write!(f, "trust"),
            Self::Target => write!(f, "target"),
            Self::Ssh => write!(f, "ssh"),
            Self::DebugLogs => write!(f, "collect debug logs"),
        }
    }
}

/// Name of a state, without its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKind {
    NotCreated,
    Stopped,
    Running,
    Suspended,
    Paused,
    Saved,
    Aborted,
    Unprovisioned,
    Recoverable,
    Invalid,
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotCreated => write!(f, "not created"),
            Self::Stopped => write!(f, "stopped"),
            Self::Running => write!(f, "running"),
            Self::Suspended => write!(f, "suspended"),
            Self::Paused => write!(f, "paused"),
            Self::Saved => write!(f, "saved"),
            Self::Aborted => write!(f, "aborted"),
            Self::Unprovisioned => write!(f, "unprovisioned"),
            Self::Recoverable => write!(f, "recoverable"),
            Self::Invalid => write!(f, "invalid"),
        }
    }
}

/// Message for operations that need a running VM.
pub(crate) const NOT_RUNNING: &str = "PCF Dev is not running.";

/// Message for operations on a VM that does not exist.
pub(crate) const NOT_CREATED: &str = "PCF Dev VM has not been created.";

/// A VM in one of its lifecycle states.
pub enum Vm {
    NotCreated(NotCreated),
    Stopped(Stopped),
    Running(Running),
    Suspended(Suspended),
    Paused(Suspended),
    Saved(Suspended),
    Aborted(Aborted),
    Unprovisioned(Unprovisioned),
    Recoverable(Recoverable),
    Invalid(Invalid),
}

impl Vm {
    /// Which state this is.
    pub fn kind(&self) -> StateKind {
        match self {
            Vm::NotCreated(_) => StateKind::NotCreated,
            Vm::Stopped(_) => StateKind::Stopped,
            Vm::Running(_) => StateKind::Running,
            Vm::Suspended(_) => StateKind::Suspended,
            Vm::Paused(_) => StateKind::Paused,
            Vm::Saved(_) => StateKind::Saved,
            Vm::Aborted(_) => StateKind::Aborted,
            Vm::Unprovisioned(_) => StateKind::Unprovisioned,
            Vm::Recoverable(_) => StateKind::Recoverable,
            Vm::Invalid(_) => StateKind::Invalid,
        }
    }

    /// Configuration of the VM, if it exists and could be read.
    pub fn config(&self) -> Option<&VmConfig> {
        match self {
            Vm::NotCreated(_) | Vm::Invalid(_) => None,
            Vm::Stopped(s) => Some(&s.config),
            Vm::Running(s) => Some(&s.config),
            Vm::Suspended(s) | Vm::Paused(s) | Vm::Saved(s) => Some(&s.config),
            Vm::Aborted(s) => Some(&s.config),
            Vm::Unprovisioned(s) => Some(&s.config),
            Vm::Recoverable(s) => Some(&s.config),
        }
    }

    /// Start the VM, creating it first if needed.
    ///
    /// Returns a boxed future because starting a VM that does not exist
    /// imports it and then starts the freshly built state.
    pub fn start<'a>(&'a self, opts: &'a StartOpts) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            match self {
                Vm::NotCreated(s) => s.start(opts).await,
                Vm::Stopped(s) => s.start(opts).await,
                Vm::Running(s) => s.start(),
                Vm::Suspended(s) | Vm::Paused(s) | Vm::Saved(s) => s.start().await,
                Vm::Aborted(s) => s.start(opts).await,
                Vm::Unprovisioned(s) => s.start(),
                Vm::Recoverable(s) => s.start(),
                Vm::Invalid(s) => s.fail(),
            }
        })
    }

    /// Power off the VM.
    pub async fn stop(&self) -> Result<()> {
        match self {
            Vm::NotCreated(s) => s.stop().await,
            Vm::Stopped(s) => s.stop(),
            Vm::Running(s) => s.stop().await,
            Vm::Suspended(s) | Vm::Paused(s) | Vm::Saved(s) => s.stop(),
            Vm::Aborted(s) => s.stop(),
            Vm::Unprovisioned(s) => s.stop().await,
            Vm::Recoverable(s) => s.stop().await,
            Vm::Invalid(s) => s.fail(),
        }
    }

    /// Save the VM state to disk.
    pub async fn suspend(&self) -> Result<()> {
        match self {
            Vm::NotCreated(_) => Err(unsupported(Operation::Suspend, StateKind::NotCreated)),
            Vm::Stopped(_) | Vm::Aborted(_) => Err(CoreError::NotRunning(Operation::Suspend)),
            Vm::Running(s) => s.suspend().await,
            Vm::Suspended(s) | Vm::Paused(s) | Vm::Saved(s) => s.suspend(),
            Vm::Unprovisioned(_) => Err(CoreError::Unprovisioned),
            Vm::Recoverable(_) => Err(CoreError::Recoverable),
            Vm::Invalid(s) => s.fail(),
        }
    }

    /// Restore a suspended VM.
    pub async fn resume(&self) -> Result<()> {
        match self {
            Vm::NotCreated(_) => Err(unsupported(Operation::Resume, StateKind::NotCreated)),
            Vm::Stopped(_) | Vm::Aborted(_) => Err(CoreError::NotRunning(Operation::Resume)),
            Vm::Running(s) => s.resume(),
            Vm::Suspended(s) | Vm::Paused(s) | Vm::Saved(s) => s.resume().await,
            Vm::Unprovisioned(_) => Err(CoreError::Unprovisioned),
            Vm::Recoverable(_) => Err(CoreError::Recoverable),
            Vm::Invalid(s) => s.fail(),
        }
    }

    /// Remove the VM.
    pub async fn destroy(&self) -> Result<()> {
        match self {
            Vm::NotCreated(s) => s.destroy(),
            Vm::Stopped(s) => destroy(&s.ctx, &s.config).await,
            Vm::Running(s) => s.destroy().await,
            Vm::Suspended(s) | Vm::Paused(s) | Vm::Saved(s) => destroy(&s.ctx, &s.config).await,
            Vm::Aborted(s) => destroy(&s.ctx, &s.config).await,
            Vm::Unprovisioned(_) | Vm::Recoverable(_) => {
                Err(unsupported(Operation::Destroy, self.kind()))
            }
            Vm::Invalid(s) => s.fail(),
        }
    }

    /// Run (or resume) guest provisioning.
    pub async fn provision(&self) -> Result<()> {
        match self {
            Vm::Unprovisioned(s) => s.provision().await,
            Vm::Invalid(s) => s.fail(),
            _ => Err(unsupported(Operation::Provision, self.kind())),
        }
    }

    /// One-line (or, when running, multi-line) status report.
    pub fn status(&self) -> String {
        match self {
            Vm::NotCreated(_) => "Not Created".to_string(),
            Vm::Stopped(_) => "Stopped".to_string(),
            Vm::Running(s) => s.status(),
            Vm::Suspended(_) | Vm::Paused(_) | Vm::Saved(_) => "Suspended".to_string(),
            Vm::Aborted(_) => "Stopped".to_string(),
            Vm::Unprovisioned(_) => {
                "Running - provisioning incomplete, run `cf dev provision`".to_string()
            }
            Vm::Recoverable(_) => {
                "Running - unreachable, run `cf dev stop` or `cf dev destroy`".to_string()
            }
            Vm::Invalid(s) => s.status(),
        }
    }

    /// Trust the platform's CA certificate on the host.
    pub async fn trust(&self) -> Result<()> {
        match self {
            Vm::Running(s) => s.trust().await,
            Vm::Invalid(s) => s.fail(),
            other => other.say_not_running(),
        }
    }

    /// Log the `cf` CLI in to the platform.
    pub async fn target(&self) -> Result<()> {
        match self {
            Vm::Running(s) => s.target().await,
            Vm::Invalid(s) => s.fail(),
            other => other.say_not_running(),
        }
    }

    /// Open an interactive shell in the guest.
    pub async fn ssh(&self) -> Result<()> {
        match self {
            Vm::Running(s) => ssh(&s.ctx, &s.config).await,
            Vm::Unprovisioned(s) => ssh(&s.ctx, &s.config).await,
            Vm::Invalid(s) => s.fail(),
            other => other.say_not_running(),
        }
    }

    /// Write diagnostic output into a new directory under `dir`.
    pub async fn get_debug_logs(&self, dir: &Path) -> Result<()> {
        match self {
            Vm::Running(s) => crate::debug::collect(&s.ctx, &s.config, dir, true).await,
            Vm::Unprovisioned(s) => crate::debug::collect(&s.ctx, &s.config, dir, true).await,
            Vm::Recoverable(s) => crate::debug::collect(&s.ctx, &s.config, dir, false).await,
            Vm::NotCreated(s) => say(&s.ctx, NOT_CREATED),
            Vm::Invalid(s) => s.fail(),
            other => other.say_not_running(),
        }
    }

    /// Check `opts` before `start`, prompting if memory is short.
    pub async fn verify_start_opts(&self, opts: &StartOpts) -> Result<()> {
        match self {
            Vm::NotCreated(s) => s.verify_start_opts(opts).await,
            Vm::Stopped(s) => verify_existing(&s.ctx, &s.config, opts, true).await,
            Vm::Running(s) => verify_existing(&s.ctx, &s.config, opts, false).await,
            Vm::Suspended(s) | Vm::Saved(s) => verify_existing(&s.ctx, &s.config, opts, true).await,
            // memory of a paused VM is still allocated
            Vm::Paused(s) => verify_existing(&s.ctx, &s.config, opts, false).await,
            Vm::Aborted(s) => verify_existing(&s.ctx, &s.config, opts, true).await,
            Vm::Unprovisioned(_) => Err(CoreError::Unprovisioned),
            Vm::Recoverable(_) => Err(CoreError::Recoverable),
            Vm::Invalid(s) => s.fail(),
        }
    }

    fn say_not_running(&self) -> Result<()> {
        let ctx = match self {
            Vm::NotCreated(s) => &s.ctx,
            Vm::Stopped(s) => &s.ctx,
            Vm::Running(s) => &s.ctx,
            Vm::Suspended(s) | Vm::Paused(s) | Vm::Saved(s) => &s.ctx,
            Vm::Aborted(s) => &s.ctx,
            Vm::Unprovisioned(s) => &s.ctx,
            Vm::Recoverable(s) => &s.ctx,
            Vm::Invalid(s) => return s.fail(),
        };
        say(ctx, NOT_RUNNING)
    }
}

impl fmt::Debug for Vm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vm")
            .field("state", &self.kind())
            .field("config", &self.config())
            .finish()
    }
}

pub(crate) fn unsupported(operation: Operation, state: StateKind) -> CoreError {
    CoreError::Unsupported { operation, state }
}

pub(crate) fn say(ctx: &Context, message: &str) -> Result<()> {
    ctx.ui.say(message);
    Ok(())
}

async fn destroy(ctx: &Context, config: &VmConfig) -> Result<()> {
    ctx.ui.say("Destroying VM...");
    ctx.vbox
        .destroy_vm(config)
        .await
        .map_err(CoreError::DestroyVm)?;
    ctx.ui.say("PCF Dev VM has been destroyed.");
    Ok(())
}

async fn ssh(ctx: &Context, config: &VmConfig) -> Result<()> {
    ctx.shell
        .start_session(SSH_HOST, config.ssh_port, ctx.settings.ssh_timeout)
        .await?;
    Ok(())
}

/// Checks shared by every state whose VM already exists.
///
/// Creation-time options are rejected. When `needs_memory` is set and the
/// host has less free memory than the VM is configured with, the user must
/// confirm before continuing.
pub(crate) async fn verify_existing(
    ctx: &Context,
    config: &VmConfig,
    opts: &StartOpts,
    needs_memory: bool,
) -> Result<()> {
    opts.ensure_unchanged()?;
    if needs_memory {
        confirm_memory(ctx, config.memory_mb).await?;
    }
    Ok(())
}

pub(crate) async fn confirm_memory(ctx: &Context, required_mb: u64) -> Result<()> {
    let free_mb = ctx.memory.free_memory_mb().await?;
    if required_mb <= free_mb {
        return Ok(());
    }

    tracing::warn!(required_mb, free_mb, "Insufficient free memory");
    let prompt = format!(
        "Less than {required_mb} MB of free memory detected, continue (y/N): "
    );
    if ctx.ui.confirm(&prompt) {
        Ok(())
    } else {
        Err(CoreError::UserDeclined)
    }
}
