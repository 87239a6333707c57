//! Host-side collaborators: terminal, certificate store and `cf` CLI.

use crate::error::Result;
use async_trait::async_trait;

/// Terminal output and prompts.
pub trait Ui: Send + Sync {
    /// Print a line for the user.
    fn say(&self, message: &str);

    /// Ask a yes/no question; `true` means the user agreed.
    fn confirm(&self, prompt: &str) -> bool;
}

/// Operating system certificate trust store.
#[async_trait]
pub trait CertStore: Send + Sync {
    /// Trust a PEM encoded CA certificate.
    async fn store(&self, cert_pem: &str) -> Result<()>;
}

/// The `cf` command line client.
#[async_trait]
pub trait CloudFoundryCli: Send + Sync {
    /// Log in to `api` and target `org`.
    async fn target(&self, api: &str, user: &str, password: &str, org: &str) -> Result<()>;
}
