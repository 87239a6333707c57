//! Error types for pcfdev-core.

use crate::state::{Operation, StateKind};
use pcfdev_vm::VmError;
use thiserror::Error;

/// Result type alias for pcfdev-core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur during VM lifecycle operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Hypervisor failed to power on the VM
    #[error("failed to start VM: {0}")]
    StartVm(#[source] VmError),

    /// Hypervisor failed to power off the VM
    #[error("failed to stop VM: {0}")]
    StopVm(#[source] VmError),

    /// Hypervisor failed to save VM state
    #[error("failed to suspend VM: {0}")]
    SuspendVm(#[source] VmError),

    /// Hypervisor failed to restore VM state
    #[error("failed to resume VM: {0}")]
    ResumeVm(#[source] VmError),

    /// Hypervisor failed to remove the VM
    #[error("failed to destroy VM: {0}")]
    DestroyVm(#[source] VmError),

    /// Guest provisioning failed
    #[error("failed to provision VM: {0}")]
    ProvisionVm(#[source] VmError),

    /// Disk image import or network setup failed
    #[error("failed to import VM: {0}")]
    ImportVm(#[source] VmError),

    /// A differently named PCF Dev VM is running
    #[error("old version of PCF Dev already running, please run `cf dev destroy` to continue")]
    OldVm,

    /// VM cannot be operated on until it is destroyed
    #[error("PCF Dev is in an invalid state ({0}), please run `cf dev destroy`")]
    InvalidVm(String),

    /// VM is running but cannot be reached
    #[error("PCF Dev is in a bad state, please run `cf dev stop` or `cf dev destroy`")]
    Recoverable,

    /// VM is running but provisioning never completed
    #[error("PCF Dev is running but not provisioned, please run `cf dev provision` or `cf dev destroy`")]
    Unprovisioned,

    /// Operation needs a running VM
    #[error("cannot {0}: PCF Dev is not running")]
    NotRunning(Operation),

    /// Operation needs the VM to be resumed first
    #[error("cannot {0}: PCF Dev is suspended, please run `cf dev resume` first")]
    MustResume(Operation),

    /// Operation has no meaning in the current state
    #[error("cannot {operation} while PCF Dev is {state}")]
    Unsupported {
        /// Requested operation
        operation: Operation,
        /// State the VM is in
        state: StateKind,
    },

    /// Start option that is fixed after creation
    #[error("{0} cannot be changed once the VM has been created")]
    ImmutableOption(&'static str),

    /// Start option failed validation
    #[error("invalid start option: {0}")]
    InvalidOption(String),

    /// User answered no at a confirmation prompt
    #[error("user declined to continue, exiting")]
    UserDeclined,

    /// Provisioning options were never written to the guest
    #[error("missing provisioning configuration, please run `cf dev destroy` and `cf dev start`")]
    MissingProvisionConfig,

    /// Host-side tool (certificate store, cf CLI) failed
    #[error("{0}")]
    Host(String),

    /// Error from pcfdev-vm
    #[error("VM error: {0}")]
    Vm(#[from] VmError),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
