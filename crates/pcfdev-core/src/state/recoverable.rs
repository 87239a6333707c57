use super::say;
use crate::config::VmConfig;
use crate::context::Context;
use crate::error::{CoreError, Result};
use std::sync::Arc;

/// VM is running but the guest does not answer over SSH.
pub struct Recoverable {
    pub(crate) config: VmConfig,
    pub(crate) ctx: Arc<Context>,
}

impl Recoverable {
    pub(crate) fn new(config: VmConfig, ctx: Arc<Context>) -> Self {
        Self { config, ctx }
    }

    pub(crate) fn start(&self) -> Result<()> {
        Err(CoreError::Recoverable)
    }

    pub(crate) async fn stop(&self) -> Result<()> {
        self.ctx.ui.say("Stopping VM...");
        self.ctx
            .vbox
            .stop_vm(&self.config)
            .await
            .map_err(CoreError::StopVm)?;
        say(&self.ctx, "PCF Dev is now stopped.")
    }
}
