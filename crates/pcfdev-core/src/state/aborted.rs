use super::stopped::start_and_provision;
use super::{confirm_memory, say};
use crate::config::VmConfig;
use crate::context::Context;
use crate::error::Result;
use crate::opts::StartOpts;
use std::sync::Arc;

/// VM was powered off uncleanly by the hypervisor or host.
pub struct Aborted {
    pub(crate) config: VmConfig,
    pub(crate) ctx: Arc<Context>,
}

impl Aborted {
    pub(crate) fn new(config: VmConfig, ctx: Arc<Context>) -> Self {
        Self { config, ctx }
    }

    /// Like [`Stopped`](super::Stopped), but free memory is checked first.
    pub(crate) async fn start(&self, opts: &StartOpts) -> Result<()> {
        confirm_memory(&self.ctx, self.config.memory_mb).await?;
        start_and_provision(&self.ctx, &self.config, opts).await
    }

    pub(crate) fn stop(&self) -> Result<()> {
        say(&self.ctx, "PCF Dev is stopped.")
    }
}
