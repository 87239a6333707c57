use crate::error::{CoreError, Result};

/// VM exists but could not be understood.
///
/// Holds no collaborators. Every operation fails with the same message until
/// the VM is removed with [`VBox::destroy_pcfdev_vms`](crate::VBox::destroy_pcfdev_vms).
#[derive(Debug, Clone)]
pub struct Invalid {
    pub(crate) reason: String,
}

impl Invalid {
    pub(crate) fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Why the VM was classified as invalid.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub(crate) fn fail<T>(&self) -> Result<T> {
        Err(CoreError::InvalidVm(self.reason.clone()))
    }

    pub(crate) fn status(&self) -> String {
        format!("Invalid - {}", self.reason)
    }
}
