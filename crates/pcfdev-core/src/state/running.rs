use super::say;
use crate::config::{VmConfig, SSH_HOST};
use crate::context::Context;
use crate::error::{CoreError, Result};
use crate::provision::{ADMIN_PASSWORD, ADMIN_USER, CA_CERT_PATH, DEFAULT_ORG};
use std::sync::Arc;

/// VM is running and provisioned.
pub struct Running {
    pub(crate) config: VmConfig,
    pub(crate) ctx: Arc<Context>,
}

impl Running {
    pub(crate) fn new(config: VmConfig, ctx: Arc<Context>) -> Self {
        Self { config, ctx }
    }

    pub(crate) fn start(&self) -> Result<()> {
        say(&self.ctx, "PCF Dev is running.")
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

    pub(crate) async fn suspend(&self) -> Result<()> {
        self.ctx.ui.say("Suspending VM...");
        self.ctx
            .vbox
            .suspend_vm(&self.config)
            .await
            .map_err(CoreError::SuspendVm)?;
        say(&self.ctx, "PCF Dev is now suspended.")
    }

    pub(crate) fn resume(&self) -> Result<()> {
        say(&self.ctx, "PCF Dev is running.")
    }

    /// Powers off before removing the VM.
    pub(crate) async fn destroy(&self) -> Result<()> {
        self.ctx.ui.say("Destroying VM...");
        self.ctx
            .vbox
            .stop_vm(&self.config)
            .await
            .map_err(CoreError::DestroyVm)?;
        self.ctx
            .vbox
            .destroy_vm(&self.config)
            .await
            .map_err(CoreError::DestroyVm)?;
        say(&self.ctx, "PCF Dev VM has been destroyed.")
    }

    pub(crate) fn status(&self) -> String {
        let domain = &self.config.domain;
        format!(
            "Running\n\
             CLI Login: cf login -a https://api.{domain} --skip-ssl-validation\n\
             Apps Manager URL: https://apps.{domain}\n\
             Admin user => Email: {ADMIN_USER} / Password: {ADMIN_PASSWORD}\n\
             Regular user => Email: user / Password: pass"
        )
    }

    pub(crate) async fn trust(&self) -> Result<()> {
        let cert = self
            .ctx
            .shell
            .get_output(
                &format!("sudo cat {CA_CERT_PATH}"),
                SSH_HOST,
                self.config.ssh_port,
                self.ctx.settings.ssh_timeout,
            )
            .await?;

        self.ctx.cert_store.store(&cert).await?;
        tracing::info!(vm = %self.config.name, "Trusted PCF Dev CA certificate");
        say(
            &self.ctx,
            "***Warning: a CA certificate generated by PCF Dev was inserted into your OS certificate store. \
             To remove this certificate, run: cf dev untrust***",
        )
    }

    pub(crate) async fn target(&self) -> Result<()> {
        let api = format!("https://api.{}", self.config.domain);
        self.ctx
            .cf
            .target(&api, ADMIN_USER, ADMIN_PASSWORD, DEFAULT_ORG)
            .await?;
        say(
            &self.ctx,
            &format!("Successfully logged in to {api} as {ADMIN_USER}."),
        )
    }
}
