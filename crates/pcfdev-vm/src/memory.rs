//! Host memory readings from `/proc/meminfo`.

use crate::driver::HostMemory;
use crate::error::{Result, VmError};
use async_trait::async_trait;
use std::path::PathBuf;

/// [`HostMemory`] backed by a `meminfo`-formatted file.
#[derive(Debug, Clone)]
pub struct ProcMeminfo {
    path: PathBuf,
}

impl Default for ProcMeminfo {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/proc/meminfo"),
        }
    }
}

impl ProcMeminfo {
    /// Read from a different file (used in tests).
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read(&self) -> Result<Meminfo> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        parse_meminfo(&content)
    }
}

#[async_trait]
impl HostMemory for ProcMeminfo {
    async fn free_memory_mb(&self) -> Result<u64> {
        Ok(self.read().await?.available_mb)
    }

    async fn total_memory_mb(&self) -> Result<u64> {
        Ok(self.read().await?.total_mb)
    }
}

#[derive(Debug, PartialEq, Eq)]
struct Meminfo {
    total_mb: u64,
    available_mb: u64,
}

fn parse_meminfo(content: &str) -> Result<Meminfo> {
    let mut total_kb = None;
    let mut available_kb = None;

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 2 {
            continue;
        }
        match parts[0] {
            "MemTotal:" => total_kb = parts[1].parse::<u64>().ok(),
            "MemAvailable:" => available_kb = parts[1].parse::<u64>().ok(),
            _ => {}
        }
    }

    match (total_kb, available_kb) {
        (Some(total), Some(available)) => Ok(Meminfo {
            total_mb: total / 1024,
            available_mb: available / 1024,
        }),
        _ => Err(VmError::Config(
            "meminfo is missing MemTotal or MemAvailable".into(),
        )),
    }
}
