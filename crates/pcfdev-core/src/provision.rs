//! Guest provisioning.
//!
//! Provisioning runs in three steps over SSH: the options are written to the
//! guest, the bootstrap password is installed, then the provisioning script
//! runs. [`prepare`] covers the first two and always runs after the VM
//! starts, so a skipped or interrupted run can be resumed with `provision`,
//! which reads the options back.

use crate::config::{VmConfig, SSH_HOST};
use crate::context::Context;
use crate::opts::StartOpts;
use pcfdev_vm::{Result, VmError};
use serde::{Deserialize, Serialize};

/// Guest file holding the options of the last provisioning run.
pub const PROVISION_OPTIONS_PATH: &str = "/var/pcfdev/provision-options.json";

/// Guest file the provisioning script creates once the platform is healthy.
pub const PROVISIONED_MARKER_PATH: &str = "/run/pcfdev-healthcheck";

/// Guest provisioning script.
const PROVISION_SCRIPT: &str = "/var/pcfdev/provision";

/// Guest CA certificate, trusted by `trust`.
pub const CA_CERT_PATH: &str = "/var/pcfdev/openssl/ca_cert.pem";

/// SHA-512 crypt hash of the bootstrap `vcap` password.
const BOOTSTRAP_PASSWORD_HASH: &str =
    "$6$YmhF.pIF$EBQqLoVjtmcYsvt6BOPqQHLDSUNFx.zmX6dUv55/BnBTgbQmDkiZfJSrRDFtUOWn5IjMc5EyqzOBeT48DJh/Y/";

/// Output of the marker check when provisioning completed.
const PROVISIONED: &str = "provisioned";

/// Administrator credentials created by provisioning.
pub const ADMIN_USER: &str = "admin";
/// Password of [`ADMIN_USER`].
pub const ADMIN_PASSWORD: &str = "admin";
/// Org targeted by `target`.
pub const DEFAULT_ORG: &str = "pcfdev-org";

/// Options the provisioning script is run with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionOptions {
    /// System domain
    pub domain: String,
    /// VM address
    pub ip: String,
    /// Comma-separated services
    pub services: String,
    /// Insecure docker registries
    #[serde(default)]
    pub registries: Vec<String>,
}

impl ProvisionOptions {
    /// Options for `config`, taking services and registries from `opts`.
    pub fn new(config: &VmConfig, opts: &StartOpts, default_services: &str) -> Self {
        Self {
            domain: config.domain.clone(),
            ip: config.ip.to_string(),
            services: opts
                .services
                .clone()
                .unwrap_or_else(|| default_services.to_string()),
            registries: opts.registries.clone(),
        }
    }

    /// Command running the provisioning script.
    pub fn script_command(&self) -> String {
        format!(
            "sudo -H {PROVISION_SCRIPT} \"{}\" \"{}\" \"{}\" \"{}\"",
            self.domain,
            self.ip,
            self.services,
            self.registries.join(",")
        )
    }

    /// Command persisting these options on the guest.
    pub fn write_command(&self) -> std::result::Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(format!(
            "echo '{}' | sudo tee {PROVISION_OPTIONS_PATH} > /dev/null",
            json.replace('\'', "'\\''")
        ))
    }
}

/// Command installing the bootstrap password.
pub fn bootstrap_password_command() -> String {
    format!("echo 'vcap:{BOOTSTRAP_PASSWORD_HASH}' | sudo chpasswd -e")
}

/// Command printing the stored options, or nothing when absent.
pub fn read_options_command() -> String {
    format!("if [ -f {PROVISION_OPTIONS_PATH} ]; then sudo cat {PROVISION_OPTIONS_PATH}; fi")
}

/// Command printing a token when provisioning completed.
pub fn marker_check_command() -> String {
    format!("if [ -e {PROVISIONED_MARKER_PATH} ]; then echo {PROVISIONED}; fi")
}

/// Whether the output of [`marker_check_command`] reports completion.
pub fn is_provisioned(output: &str) -> bool {
    output.trim() == PROVISIONED
}

/// Parse the output of [`read_options_command`]; `None` when absent.
pub fn parse_options(output: &str) -> std::result::Result<Option<ProvisionOptions>, serde_json::Error> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(trimmed).map(Some)
}

/// Persist options and install the bootstrap password.
///
/// Once this has run, the script can be started later from the stored
/// options.
pub async fn prepare(ctx: &Context, config: &VmConfig, options: &ProvisionOptions) -> Result<()> {
    let write = options
        .write_command()
        .map_err(|e| VmError::Config(format!("failed to encode provisioning options: {e}")))?;
    ctx.shell
        .run_command(&write, SSH_HOST, config.ssh_port, ctx.settings.ssh_timeout)
        .await?;

    ctx.shell
        .run_command(
            &bootstrap_password_command(),
            SSH_HOST,
            config.ssh_port,
            ctx.settings.ssh_timeout,
        )
        .await?;

    tracing::debug!(vm = %config.name, "Stored provisioning options");
    Ok(())
}

/// Run the provisioning script with `options`.
pub async fn run_script(ctx: &Context, config: &VmConfig, options: &ProvisionOptions) -> Result<()> {
    let start = std::time::Instant::now();
    tracing::info!(
        vm = %config.name,
        domain = %options.domain,
        services = %options.services,
        "Running provisioning script"
    );

    ctx.shell
        .run_command(
            &options.script_command(),
            SSH_HOST,
            config.ssh_port,
            ctx.settings.provision_timeout,
        )
        .await?;

    tracing::info!(
        vm = %config.name,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Provisioning finished"
    );
    Ok(())
}

/// Login help printed once the platform is up.
pub fn help_text(domain: &str) -> String {
    format!(
        "PCF Dev is now running.\n\
         To begin using PCF Dev, please run:\n   \
         cf login -a https://api.{domain} --skip-ssl-validation\n\
         Apps Manager URL: https://apps.{domain}\n\
         Admin user => Email: {ADMIN_USER} / Password: {ADMIN_PASSWORD}\n\
         Regular user => Email: user / Password: pass"
    )
}
