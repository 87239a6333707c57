use super::{confirm_memory, say, NOT_CREATED};
use crate::config::MIN_MEMORY_MB;
use crate::context::Context;
use crate::error::{CoreError, Result};
use crate::factory::VmFactory;
use crate::opts::StartOpts;
use crate::vbox::ImportSpec;
use pcfdev_vm::VmResources;
use std::net::Ipv4Addr;
use std::sync::Arc;

/// No VM with this name is registered with the hypervisor.
pub struct NotCreated {
    pub(crate) name: String,
    pub(crate) ctx: Arc<Context>,
}

impl NotCreated {
    pub(crate) fn new(name: impl Into<String>, ctx: Arc<Context>) -> Self {
        Self {
            name: name.into(),
            ctx,
        }
    }

    /// Import the VM, then start it from whatever state the import left.
    pub(crate) async fn start(&self, opts: &StartOpts) -> Result<()> {
        if self.ctx.vbox.conflicting_vm_present(&self.name).await? {
            return Err(CoreError::OldVm);
        }

        let spec = ImportSpec {
            resources: VmResources {
                memory_mb: opts.memory_mb.unwrap_or(self.ctx.settings.default_memory_mb),
                cpus: opts.cpus.unwrap_or(self.ctx.settings.default_cpus),
            },
            subnet: self.requested_subnet(opts)?,
        };
        let image = opts
            .image_path
            .as_deref()
            .unwrap_or(self.ctx.settings.ova_path.as_path());

        self.ctx.ui.say("Importing VM...");
        self.ctx
            .vbox
            .import_vm(&self.name, image, &spec)
            .await
            .map_err(CoreError::ImportVm)?;
        self.ctx.ui.say("PCF Dev is now imported to Virtualbox.");

        let vm = VmFactory::new(Arc::clone(&self.ctx)).vm(&self.name).await?;
        vm.start(opts).await
    }

    pub(crate) async fn stop(&self) -> Result<()> {
        if self.ctx.vbox.conflicting_vm_present(&self.name).await? {
            return Err(CoreError::OldVm);
        }
        say(&self.ctx, NOT_CREATED)
    }

    pub(crate) fn destroy(&self) -> Result<()> {
        say(&self.ctx, NOT_CREATED)
    }

    pub(crate) async fn verify_start_opts(&self, opts: &StartOpts) -> Result<()> {
        opts.validate()?;

        let memory_mb = opts.memory_mb.unwrap_or(self.ctx.settings.default_memory_mb);
        if memory_mb < MIN_MEMORY_MB {
            return Err(CoreError::InvalidOption(format!(
                "PCF Dev requires at least {MIN_MEMORY_MB} MB of memory"
            )));
        }

        self.requested_subnet(opts)?;
        confirm_memory(&self.ctx, memory_mb).await
    }

    /// Subnet implied by the custom IP and domain, if either was given.
    fn requested_subnet(&self, opts: &StartOpts) -> Result<Option<Ipv4Addr>> {
        let table = &self.ctx.table;
        let from_ip = opts.ip.as_deref().map(|ip| table.subnet_for_ip(ip)).transpose()?;
        let from_domain = opts
            .domain
            .as_deref()
            .map(|domain| table.subnet_for_domain(domain))
            .transpose()?;

        match (from_ip, from_domain) {
            (Some(ip), Some(domain)) if ip != domain => Err(CoreError::InvalidOption(format!(
                "IP {} does not belong to domain {}",
                opts.ip.as_deref().unwrap_or_default(),
                opts.domain.as_deref().unwrap_or_default()
            ))),
            (ip, domain) => Ok(ip.or(domain)),
        }
    }
}
