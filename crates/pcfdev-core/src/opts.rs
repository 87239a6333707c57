//! Options accepted by `start`.

use crate::error::CoreError;
use std::path::PathBuf;

/// Services the provisioning script knows how to install.
pub const KNOWN_SERVICES: &[&str] = &[
    "all",
    "none",
    "default",
    "mysql",
    "rabbitmq",
    "redis",
    "spring-cloud-services",
    "scs",
];

/// Options for starting (and, if needed, creating) the VM.
///
/// Every field is optional; unset fields fall back to the tool defaults for
/// a new VM and to the existing configuration otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartOpts {
    /// Memory in MB.
    pub memory_mb: Option<u64>,
    /// Virtual CPU count.
    pub cpus: Option<u32>,
    /// Comma-separated services to provision.
    pub services: Option<String>,
    /// Insecure docker registries to trust.
    pub registries: Vec<String>,
    /// Custom VM address.
    pub ip: Option<String>,
    /// Custom domain, must be one of the registered domains.
    pub domain: Option<String>,
    /// Disk image to import instead of the default one.
    pub image_path: Option<PathBuf>,
    /// Start without provisioning.
    pub no_provision: bool,
}

impl StartOpts {
    /// Create a new options builder.
    pub fn builder() -> StartOptsBuilder {
        StartOptsBuilder::default()
    }

    /// Whether any option that is fixed at creation time was given.
    pub fn changes_vm(&self) -> bool {
        self.memory_mb.is_some() || self.cpus.is_some() || self.services.is_some()
    }

    /// Reject options that cannot be applied to an existing VM.
    pub fn ensure_unchanged(&self) -> Result<(), CoreError> {
        if self.memory_mb.is_some() {
            return Err(CoreError::ImmutableOption("memory"));
        }
        if self.cpus.is_some() {
            return Err(CoreError::ImmutableOption("cpus"));
        }
        if self.services.is_some() {
            return Err(CoreError::ImmutableOption("services"));
        }
        Ok(())
    }

    /// Validate values independent of any VM.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.cpus == Some(0) {
            return Err(CoreError::InvalidOption("cpus must be at least 1".into()));
        }
        if let Some(services) = &self.services {
            for service in services.split(',').map(str::trim) {
                if !KNOWN_SERVICES.contains(&service) {
                    return Err(CoreError::InvalidOption(format!(
                        "{service} is not a supported service"
                    )));
                }
            }
        }
        if self.registries.iter().any(|r| r.trim().is_empty()) {
            return Err(CoreError::InvalidOption("registry must not be empty".into()));
        }
        Ok(())
    }
}

/// Builder for StartOpts.
#[derive(Debug, Default)]
pub struct StartOptsBuilder {
    opts: StartOpts,
}

impl StartOptsBuilder {
    /// Set memory in MB.
    pub fn memory_mb(mut self, mb: u64) -> Self {
        self.opts.memory_mb = Some(mb);
        self
    }

    /// Set vCPU count.
    pub fn cpus(mut self, count: u32) -> Self {
        self.opts.cpus = Some(count);
        self
    }

    /// Set services to provision.
    pub fn services(mut self, services: impl Into<String>) -> Self {
        self.opts.services = Some(services.into());
        self
    }

    /// Add an insecure docker registry.
    pub fn registry(mut self, registry: impl Into<String>) -> Self {
        self.opts.registries.push(registry.into());
        self
    }

    /// Set a custom VM address.
    pub fn ip(mut self, ip: impl Into<String>) -> Self {
        self.opts.ip = Some(ip.into());
        self
    }

    /// Set a custom domain.
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.opts.domain = Some(domain.into());
        self
    }

    /// Import a different disk image.
    pub fn image_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.opts.image_path = Some(path.into());
        self
    }

    /// Skip provisioning.
    pub fn no_provision(mut self) -> Self {
        self.opts.no_provision = true;
        self
    }

    /// Build the options, validating all fields.
    pub fn build(self) -> Result<StartOpts, CoreError> {
        self.opts.validate()?;
        Ok(self.opts)
    }
}
