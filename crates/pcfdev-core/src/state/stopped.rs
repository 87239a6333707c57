use super::say;
use crate::config::VmConfig;
use crate::context::Context;
use crate::error::{CoreError, Result};
use crate::opts::StartOpts;
use crate::provision::{self, ProvisionOptions};
use std::sync::Arc;

/// VM exists and is powered off.
pub struct Stopped {
    pub(crate) config: VmConfig,
    pub(crate) ctx: Arc<Context>,
}

impl Stopped {
    pub(crate) fn new(config: VmConfig, ctx: Arc<Context>) -> Self {
        Self { config, ctx }
    }

    pub(crate) async fn start(&self, opts: &StartOpts) -> Result<()> {
        start_and_provision(&self.ctx, &self.config, opts).await
    }

    pub(crate) fn stop(&self) -> Result<()> {
        say(&self.ctx, "PCF Dev is stopped.")
    }
}

/// Power on the VM and, unless disabled, provision it.
///
/// Provisioning options are stored in the guest even when provisioning is
/// skipped, so `provision` can run it later.
pub(crate) async fn start_and_provision(
    ctx: &Context,
    config: &VmConfig,
    opts: &StartOpts,
) -> Result<()> {
    ctx.ui.say("Starting VM...");
    ctx.vbox.start_vm(config).await.map_err(CoreError::StartVm)?;

    let options = ProvisionOptions::new(config, opts, &ctx.settings.default_services);
    provision::prepare(ctx, config, &options)
        .await
        .map_err(CoreError::ProvisionVm)?;

    if opts.no_provision {
        ctx.ui
            .say("VM will not be provisioned because '-n' option was supplied.");
        return Ok(());
    }

    ctx.ui.say("Provisioning VM...");
    provision::run_script(ctx, config, &options)
        .await
        .map_err(CoreError::ProvisionVm)?;

    ctx.ui.say(&provision::help_text(&config.domain));
    Ok(())
}
