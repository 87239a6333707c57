use super::say;
use crate::config::{VmConfig, SSH_HOST};
use crate::context::Context;
use crate::error::{CoreError, Result};
use crate::provision;
use std::sync::Arc;

/// VM is running but provisioning never completed.
pub struct Unprovisioned {
    pub(crate) config: VmConfig,
    pub(crate) ctx: Arc<Context>,
}

impl Unprovisioned {
    pub(crate) fn new(config: VmConfig, ctx: Arc<Context>) -> Self {
        Self { config, ctx }
    }

    pub(crate) fn start(&self) -> Result<()> {
        Err(CoreError::Unprovisioned)
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

    /// Re-run the provisioning script with the options stored in the guest.
    pub(crate) async fn provision(&self) -> Result<()> {
        let output = self
            .ctx
            .shell
            .get_output(
                &provision::read_options_command(),
                SSH_HOST,
                self.config.ssh_port,
                self.ctx.settings.ssh_timeout,
            )
            .await
            .map_err(CoreError::ProvisionVm)?;

        let options =
            provision::parse_options(&output)?.ok_or(CoreError::MissingProvisionConfig)?;

        self.ctx.ui.say("Provisioning VM...");
        provision::run_script(&self.ctx, &self.config, &options)
            .await
            .map_err(CoreError::ProvisionVm)?;

        say(&self.ctx, &provision::help_text(&options.domain))
    }
}
