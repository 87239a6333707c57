//! Diagnostic bundle for bug reports.

use crate::config::{VmConfig, SSH_HOST};
use crate::context::Context;
use crate::error::Result;
use chrono::Utc;
use std::path::{Path, PathBuf};

/// Guest commands whose output goes into the bundle, keyed by file name.
const GUEST_COMMANDS: &[(&str, &str)] = &[
    ("ifconfig.txt", "ifconfig"),
    ("routes.txt", "route -n"),
    ("resolv.conf.txt", "cat /etc/resolv.conf"),
    ("disk-usage.txt", "df -h"),
    ("processes.txt", "ps aux"),
    ("provision.log", "sudo cat /var/pcfdev/provision.log"),
    ("reset.log", "sudo cat /var/pcfdev/reset.log"),
    ("monit-summary.txt", "sudo /var/vcap/bosh/bin/monit summary"),
];

/// Write hypervisor and (optionally) guest diagnostics to a new directory
/// under `dir`.
///
/// A failing guest command does not abort collection; its error is written
/// in place of the output.
pub(crate) async fn collect(
    ctx: &Context,
    config: &VmConfig,
    dir: &Path,
    include_guest: bool,
) -> Result<()> {
    let target = bundle_dir(dir);
    tokio::fs::create_dir_all(&target).await?;

    let vm_info = ctx.vbox.driver().vm_info(&config.name).await?;
    tokio::fs::write(target.join("vm-info.txt"), vm_info).await?;

    if include_guest {
        for (file, command) in GUEST_COMMANDS {
            let contents = match ctx
                .shell
                .get_output(command, SSH_HOST, config.ssh_port, ctx.settings.ssh_timeout)
                .await
            {
                Ok(output) => output,
                Err(e) => {
                    tracing::warn!(vm = %config.name, command, error = %e, "Debug command failed");
                    format!("failed to run `{command}`: {e}\n")
                }
            };
            tokio::fs::write(target.join(file), contents).await?;
        }
    }

    tracing::info!(vm = %config.name, path = %target.display(), "Collected debug logs");
    ctx.ui
        .say(&format!("Debug logs written to {}", target.display()));
    Ok(())
}

fn bundle_dir(dir: &Path) -> PathBuf {
    dir.join(format!("pcfdev-debug-{}", Utc::now().format("%Y%m%d-%H%M%S")))
}
