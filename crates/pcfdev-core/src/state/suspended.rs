use super::{say, Operation};
use crate::config::VmConfig;
use crate::context::Context;
use crate::error::{CoreError, Result};
use std::sync::Arc;

/// VM execution is frozen: suspended, saved to disk or paused.
///
/// The three hypervisor states behave identically and share this type.
pub struct Suspended {
    pub(crate) config: VmConfig,
    pub(crate) ctx: Arc<Context>,
}

impl Suspended {
    pub(crate) fn new(config: VmConfig, ctx: Arc<Context>) -> Self {
        Self { config, ctx }
    }

    pub(crate) async fn start(&self) -> Result<()> {
        self.resume().await
    }

    pub(crate) fn stop(&self) -> Result<()> {
        Err(CoreError::MustResume(Operation::Stop))
    }

    pub(crate) fn suspend(&self) -> Result<()> {
        say(&self.ctx, "PCF Dev is already suspended.")
    }

    pub(crate) async fn resume(&self) -> Result<()> {
        self.ctx.ui.say("Resuming VM...");
        self.ctx
            .vbox
            .resume_vm(&self.config)
            .await
            .map_err(CoreError::ResumeVm)?;
        say(&self.ctx, "PCF Dev is now running.")
    }
}
