//! Error types for pcfdev-vm.

use thiserror::Error;

/// Result type alias for pcfdev-vm operations.
pub type Result<T> = std::result::Result<T, VmError>;

/// Errors reported by the hypervisor and guest collaborators, and by the
/// address allocator.
#[derive(Debug, Error)]
pub enum VmError {
    /// The hypervisor driver reported a failure
    #[error("{0}")]
    Driver(String),

    /// A guest command over SSH failed
    #[error("ssh: {0}")]
    Ssh(String),

    /// Address is not a well-formed IPv4 address
    #[error("{0} is not a supported IP address")]
    UnsupportedAddress(String),

    /// Domain is not one of the registered domains
    #[error("{0} is not one of the allowed domains")]
    DomainNotAllowed(String),

    /// A requested subnet cannot be used
    #[error("subnet {0} is already in use on this host")]
    SubnetUnavailable(std::net::Ipv4Addr),

    /// Every allowed subnet is occupied
    #[error("all allowed network interfaces are currently taken")]
    AllInterfacesTaken,

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Timeout waiting for operation
    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),
}
