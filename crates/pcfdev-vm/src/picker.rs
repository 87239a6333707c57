//! Selection of a host-only subnet for a new VM.

use crate::address::AddressTable;
use crate::driver::{HostNetwork, NetworkInterface, Prober};
use crate::error::{Result, VmError};
use std::net::Ipv4Addr;
use std::sync::Arc;

/// Picks a free host-only subnet, reusing an idle adapter when it is safe.
pub struct Picker {
    table: Arc<AddressTable>,
    network: Arc<dyn HostNetwork>,
    prober: Arc<dyn Prober>,
}

impl Picker {
    /// Create a picker over the given table and host collaborators.
    pub fn new(
        table: Arc<AddressTable>,
        network: Arc<dyn HostNetwork>,
        prober: Arc<dyn Prober>,
    ) -> Self {
        Self {
            table,
            network,
            prober,
        }
    }

    /// Select the interface a new VM should use.
    ///
    /// `candidates` are the host-only adapters the hypervisor already
    /// manages. Subnets are tried in table order:
    /// 1. An adapter among `candidates` is reused if its address is unique
    ///    on the host and nothing answers at the subnet's VM address. A
    ///    duplicated address skips the subnet entirely.
    /// 2. A subnet no host interface uses is returned as a new adapter.
    ///
    /// Returns the interface and whether it is being reused.
    ///
    /// # Errors
    /// Returns [`VmError::AllInterfacesTaken`] when no subnet qualifies.
    pub async fn select_available_interface(
        &self,
        candidates: &[NetworkInterface],
    ) -> Result<(NetworkInterface, bool)> {
        let host_interfaces = self.network.interfaces().await?;
        tracing::debug!(
            candidates = candidates.len(),
            host_interfaces = host_interfaces.len(),
            "Selecting host-only interface"
        );

        for subnet in self.table.subnets() {
            if let Some(found) = self.try_subnet(subnet, candidates, &host_interfaces).await? {
                return Ok(found);
            }
        }

        Err(VmError::AllInterfacesTaken)
    }

    /// Check a subnet chosen by the user instead of the table order.
    ///
    /// The same reuse and claim rules as
    /// [`select_available_interface`](Self::select_available_interface)
    /// apply to the one subnet.
    ///
    /// # Errors
    /// Returns [`VmError::SubnetUnavailable`] if the subnet is duplicated on
    /// the host, used by a non-hypervisor interface, or has a live VM.
    pub async fn select_requested_interface(
        &self,
        subnet: Ipv4Addr,
        candidates: &[NetworkInterface],
    ) -> Result<(NetworkInterface, bool)> {
        let host_interfaces = self.network.interfaces().await?;
        self.try_subnet(subnet, candidates, &host_interfaces)
            .await?
            .ok_or(VmError::SubnetUnavailable(subnet))
    }

    async fn try_subnet(
        &self,
        subnet: Ipv4Addr,
        candidates: &[NetworkInterface],
        host_interfaces: &[NetworkInterface],
    ) -> Result<Option<(NetworkInterface, bool)>> {
        if let Some(candidate) = candidates.iter().find(|i| i.ip == subnet) {
            if count_ip(host_interfaces, subnet) > 1 {
                tracing::warn!(%subnet, "Duplicate host interfaces, skipping subnet");
                return Ok(None);
            }

            let vm_ip = self.table.ip_for_subnet(subnet);
            if !self.prober.try_ip(vm_ip).await? {
                tracing::info!(
                    %subnet,
                    interface = %candidate.name,
                    "Reusing idle host-only interface"
                );
                return Ok(Some((candidate.clone(), true)));
            }
            tracing::debug!(%subnet, %vm_ip, "Address in use by a live VM");
        }

        if count_ip(host_interfaces, subnet) == 0 {
            tracing::info!(%subnet, "Claiming unused subnet");
            return Ok(Some((NetworkInterface::to_create(subnet), false)));
        }
        Ok(None)
    }
}

fn count_ip(interfaces: &[NetworkInterface], ip: Ipv4Addr) -> usize {
    interfaces.iter().filter(|i| i.ip == ip).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct StaticNetwork(Vec<NetworkInterface>);

    #[async_trait]
    impl HostNetwork for StaticNetwork {
        async fn interfaces(&self) -> Result<Vec<NetworkInterface>> {
            Ok(self.0.clone())
        }
    }

    struct FakeProber {
        live: Vec<Ipv4Addr>,
        probed: Mutex<Vec<Ipv4Addr>>,
    }

    impl FakeProber {
        fn new(live: Vec<Ipv4Addr>) -> Arc<Self> {
            Arc::new(Self {
                live,
                probed: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Prober for FakeProber {
        async fn try_ip(&self, ip: Ipv4Addr) -> Result<bool> {
            self.probed.lock().unwrap().push(ip);
            Ok(self.live.contains(&ip))
        }
    }

    fn subnet(n: u8) -> Ipv4Addr {
        Ipv4Addr::new(192, 168, n, 1)
    }

    fn vboxnet(idx: usize, ip: Ipv4Addr) -> NetworkInterface {
        NetworkInterface::existing(format!("vboxnet{idx}"), ip)
    }

    fn picker(host: Vec<NetworkInterface>, prober: Arc<FakeProber>) -> Picker {
        Picker::new(
            Arc::new(AddressTable::default()),
            Arc::new(StaticNetwork(host)),
            prober,
        )
    }

    #[tokio::test]
    async fn test_no_interfaces_picks_first_subnet() {
        let prober = FakeProber::new(vec![]);
        let (iface, reused) = picker(vec![], prober.clone())
            .select_available_interface(&[])
            .await
            .unwrap();

        assert_eq!(iface.ip, subnet(11));
        assert!(!iface.exists);
        assert!(iface.name.is_empty());
        assert!(!reused);
        assert!(prober.probed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reuses_idle_candidate() {
        let existing = vboxnet(0, subnet(11));
        let prober = FakeProber::new(vec![]);
        let (iface, reused) = picker(vec![existing.clone()], prober.clone())
            .select_available_interface(&[existing.clone()])
            .await
            .unwrap();

        assert_eq!(iface, existing);
        assert!(reused);
        assert_eq!(
            *prober.probed.lock().unwrap(),
            vec![Ipv4Addr::new(192, 168, 11, 11)]
        );
    }

    #[tokio::test]
    async fn test_live_candidate_moves_to_next_subnet() {
        let existing = vboxnet(0, subnet(11));
        let prober = FakeProber::new(vec![Ipv4Addr::new(192, 168, 11, 11)]);
        let (iface, reused) = picker(vec![existing.clone()], prober)
            .select_available_interface(&[existing])
            .await
            .unwrap();

        assert_eq!(iface.ip, subnet(22));
        assert!(!iface.exists);
        assert!(!reused);
    }

    #[tokio::test]
    async fn test_duplicate_subnet_is_skipped() {
        let first = vboxnet(0, subnet(11));
        let second = vboxnet(1, subnet(11));
        let prober = FakeProber::new(vec![]);
        let (iface, reused) = picker(vec![first.clone(), second], prober.clone())
            .select_available_interface(&[first])
            .await
            .unwrap();

        assert_eq!(iface.ip, subnet(22));
        assert!(!reused);
        // the duplicated subnet is never probed
        assert!(prober.probed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unrelated_host_interface_is_avoided() {
        // a non-hypervisor interface already holds the first subnet
        let host = vec![NetworkInterface::existing("en5", subnet(11))];
        let prober = FakeProber::new(vec![]);
        let (iface, reused) = picker(host, prober)
            .select_available_interface(&[])
            .await
            .unwrap();

        assert_eq!(iface.ip, subnet(22));
        assert!(!reused);
    }

    #[tokio::test]
    async fn test_candidate_later_in_order_is_reused() {
        let host = vec![
            NetworkInterface::existing("en5", subnet(11)),
            vboxnet(3, subnet(22)),
        ];
        let candidate = host[1].clone();
        let prober = FakeProber::new(vec![]);
        let (iface, reused) = picker(host, prober)
            .select_available_interface(&[candidate.clone()])
            .await
            .unwrap();

        assert_eq!(iface, candidate);
        assert!(reused);
    }

    #[tokio::test]
    async fn test_all_subnets_taken() {
        let host: Vec<_> = (1..=9u8)
            .enumerate()
            .map(|(i, n)| vboxnet(i, subnet(n * 11)))
            .collect();
        let prober = FakeProber::new(vec![]);
        let err = picker(host, prober)
            .select_available_interface(&[])
            .await
            .unwrap_err();

        assert!(matches!(err, VmError::AllInterfacesTaken));
        assert_eq!(
            err.to_string(),
            "all allowed network interfaces are currently taken"
        );
    }

    #[tokio::test]
    async fn test_requested_subnet_is_claimed_or_reused() {
        let prober = FakeProber::new(vec![]);
        let (iface, reused) = picker(vec![], prober.clone())
            .select_requested_interface(subnet(44), &[])
            .await
            .unwrap();
        assert_eq!(iface, NetworkInterface::to_create(subnet(44)));
        assert!(!reused);

        let existing = vboxnet(3, subnet(44));
        let (iface, reused) = picker(vec![existing.clone()], prober.clone())
            .select_requested_interface(subnet(44), &[existing.clone()])
            .await
            .unwrap();
        assert_eq!(iface, existing);
        assert!(reused);
        assert_eq!(*prober.probed.lock().unwrap(), vec![Ipv4Addr::new(192, 168, 44, 11)]);
    }

    #[tokio::test]
    async fn test_requested_subnet_refused_when_unavailable() {
        let existing = vboxnet(0, subnet(44));

        // duplicated on the host
        let host = vec![existing.clone(), vboxnet(1, subnet(44))];
        let err = picker(host, FakeProber::new(vec![]))
            .select_requested_interface(subnet(44), &[existing.clone()])
            .await
            .unwrap_err();
        assert!(matches!(err, VmError::SubnetUnavailable(s) if s == subnet(44)));

        // live VM behind the adapter
        let live = FakeProber::new(vec![Ipv4Addr::new(192, 168, 44, 11)]);
        let err = picker(vec![existing.clone()], live)
            .select_requested_interface(subnet(44), &[existing])
            .await
            .unwrap_err();
        assert!(matches!(err, VmError::SubnetUnavailable(_)));

        // used by an interface the hypervisor does not manage
        let err = picker(vec![vboxnet(0, subnet(44))], FakeProber::new(vec![]))
            .select_requested_interface(subnet(44), &[])
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "subnet 192.168.44.1 is already in use on this host"
        );
    }
}
