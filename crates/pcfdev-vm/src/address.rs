//! Fixed table of host-only subnets, VM addresses and their domains.
//!
//! Each subnet is a /24 identified by its `.1` address. The VM always lives
//! at `.11` inside it, and every entry has a publicly resolvable domain that
//! points back at that VM address.

use crate::error::{Result, VmError};
use std::net::Ipv4Addr;

/// Last octet of the VM address inside a subnet.
const VM_HOST_OCTET: u8 = 11;

/// Wildcard DNS suffix used for addresses outside the table.
const WILDCARD_DNS_SUFFIX: &str = "xip.io";

/// One row of the address table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressEntry {
    /// Host side of the subnet (`x.y.z.1`)
    pub subnet: Ipv4Addr,
    /// Address assigned to the VM (`x.y.z.11`)
    pub vm_ip: Ipv4Addr,
    /// Domain resolving to `vm_ip`
    pub domain: String,
}

impl AddressEntry {
    /// Build an entry for the given subnet, deriving the VM address.
    pub fn new(subnet: Ipv4Addr, domain: impl Into<String>) -> Self {
        Self {
            subnet,
            vm_ip: ip_for_subnet(subnet),
            domain: domain.into(),
        }
    }
}

/// Bidirectional mapping between allowed subnets, VM addresses and domains.
///
/// Built once at startup and shared read-only. The entry order is the
/// priority order used when picking a subnet for a new VM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressTable {
    entries: Vec<AddressEntry>,
}

impl Default for AddressTable {
    fn default() -> Self {
        let entries = (1..=9u8)
            .map(|n| {
                let domain = if n == 1 {
                    "local.pcfdev.io".to_string()
                } else {
                    format!("local{n}.pcfdev.io")
                };
                AddressEntry::new(Ipv4Addr::new(192, 168, n * 11, 1), domain)
            })
            .collect();
        Self { entries }
    }
}

impl AddressTable {
    /// Create a table from explicit entries.
    ///
    /// # Errors
    /// Returns an error if a subnet does not end in `.1`, if a VM address
    /// lies outside its subnet, or if the table is empty.
    pub fn new(entries: Vec<AddressEntry>) -> Result<Self> {
        if entries.is_empty() {
            return Err(VmError::Config("address table must not be empty".into()));
        }
        for entry in &entries {
            if entry.subnet.octets()[3] != 1 {
                return Err(VmError::Config(format!(
                    "subnet {} must end in .1",
                    entry.subnet
                )));
            }
            if entry.vm_ip.octets()[..3] != entry.subnet.octets()[..3] {
                return Err(VmError::Config(format!(
                    "VM address {} is outside subnet {}",
                    entry.vm_ip, entry.subnet
                )));
            }
        }
        Ok(Self { entries })
    }

    /// Entries in priority order.
    pub fn entries(&self) -> &[AddressEntry] {
        &self.entries
    }

    /// Subnets in priority order.
    pub fn subnets(&self) -> impl Iterator<Item = Ipv4Addr> + '_ {
        self.entries.iter().map(|e| e.subnet)
    }

    /// Domain for a VM address, or a wildcard-DNS domain when the address is
    /// not in the table.
    pub fn domain_for_ip(&self, ip: Ipv4Addr) -> String {
        self.entries
            .iter()
            .find(|e| e.vm_ip == ip)
            .map(|e| e.domain.clone())
            .unwrap_or_else(|| format!("{ip}.{WILDCARD_DNS_SUFFIX}"))
    }

    /// Subnet (`.1` address) of the /24 containing `ip`.
    ///
    /// # Errors
    /// Returns [`VmError::UnsupportedAddress`] if `ip` is not IPv4.
    pub fn subnet_for_ip(&self, ip: &str) -> Result<Ipv4Addr> {
        subnet_for_ip(ip)
    }

    /// VM address inside the given subnet.
    pub fn ip_for_subnet(&self, subnet: Ipv4Addr) -> Ipv4Addr {
        ip_for_subnet(subnet)
    }

    /// Subnet registered for `domain`.
    ///
    /// # Errors
    /// Returns [`VmError::DomainNotAllowed`] for unregistered domains.
    pub fn subnet_for_domain(&self, domain: &str) -> Result<Ipv4Addr> {
        self.entries
            .iter()
            .find(|e| e.domain == domain)
            .map(|e| e.subnet)
            .ok_or_else(|| VmError::DomainNotAllowed(domain.to_string()))
    }

    /// Whether `domain` is one of the registered domains.
    pub fn is_domain_allowed(&self, domain: &str) -> bool {
        self.entries.iter().any(|e| e.domain == domain)
    }
}

/// Subnet (`.1` address) of the /24 containing `ip`.
pub fn subnet_for_ip(ip: &str) -> Result<Ipv4Addr> {
    let parsed: Ipv4Addr = ip
        .trim()
        .parse()
        .map_err(|_| VmError::UnsupportedAddress(ip.to_string()))?;
    let [a, b, c, _] = parsed.octets();
    Ok(Ipv4Addr::new(a, b, c, 1))
}

/// VM address inside the subnet.
pub fn ip_for_subnet(subnet: Ipv4Addr) -> Ipv4Addr {
    let [a, b, c, _] = subnet.octets();
    Ipv4Addr::new(a, b, c, VM_HOST_OCTET)
}
