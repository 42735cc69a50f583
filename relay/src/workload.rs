//! Synthetic load applied while a hop is being handled.
//!
//! The toggles are captured from the environment once at startup and parsed
//! on every request, so a bad value is reported each time it is skipped.

use crate::errors::RelayError;
use rand::RngCore;
use rand::rngs::OsRng;
use std::num::ParseIntError;
use std::time::Duration;
use thiserror::Error;

pub const ENV_PREFIX: &str = "TEST_";

pub const SLEEP_KEY: &str = "sleep";
pub const CPU_KEY: &str = "cpu";
pub const RAM_KEY: &str = "ram";

/// Environment variable carrying the toggle `key`, e.g. `TEST_SLEEP` for `sleep`.
pub fn env_var_name(key: &str) -> String {
    format!("{ENV_PREFIX}{}", key.to_uppercase())
}

#[derive(Error, Debug)]
pub enum WorkloadError {
    #[error("bad sleep workload value {value:?}, need a duration such as 500ms or 2s: {source}")]
    InvalidSleep {
        value: String,
        source: humantime::DurationError,
    },

    #[error("bad cpu workload value {value:?}, need a non-negative integer: {source}")]
    InvalidCpu {
        value: String,
        source: ParseIntError,
    },

    #[error("bad ram workload value {value:?}, need a byte count: {source}")]
    InvalidRam {
        value: String,
        source: ParseIntError,
    },
}

/// Raw workload toggles, each independently present or absent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WorkloadConfig {
    /// How long to sleep, as a human readable duration
    pub sleep: Option<String>,
    /// Number of random bytes to draw from the OS generator, one at a time
    pub cpu: Option<String>,
    /// Number of bytes to allocate and touch
    pub ram: Option<String>,
}

impl WorkloadConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the toggles from any variable source, keyed by [`env_var_name`].
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        WorkloadConfig {
            sleep: lookup(&env_var_name(SLEEP_KEY)),
            cpu: lookup(&env_var_name(CPU_KEY)),
            ram: lookup(&env_var_name(RAM_KEY)),
        }
    }

    /// Workloads to run for one hop, in sleep, cpu, ram order, each paired
    /// with its configured value. Unparseable toggles are logged and left out.
    pub fn plan(&self) -> Vec<(Workload, &str)> {
        let parsed = [
            self.sleep.as_deref().map(|v| Workload::parse_sleep(v).map(|w| (w, v))),
            self.cpu.as_deref().map(|v| Workload::parse_cpu(v).map(|w| (w, v))),
            self.ram.as_deref().map(|v| Workload::parse_ram(v).map(|w| (w, v))),
        ];

        parsed
            .into_iter()
            .flatten()
            .filter_map(|result| match result {
                Ok(planned) => Some(planned),
                Err(e) => {
                    tracing::warn!(error = %e, "ignoring workload");
                    None
                }
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sleep.is_none() && self.cpu.is_none() && self.ram.is_none()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Workload {
    Sleep(Duration),
    Cpu(u64),
    Ram(usize),
}

impl Workload {
    pub fn parse_sleep(value: &str) -> Result<Self, WorkloadError> {
        humantime::parse_duration(value.trim())
            .map(Workload::Sleep)
            .map_err(|source| WorkloadError::InvalidSleep {
                value: value.to_string(),
                source,
            })
    }

    pub fn parse_cpu(value: &str) -> Result<Self, WorkloadError> {
        value
            .trim()
            .parse()
            .map(Workload::Cpu)
            .map_err(|source| WorkloadError::InvalidCpu {
                value: value.to_string(),
                source,
            })
    }

    pub fn parse_ram(value: &str) -> Result<Self, WorkloadError> {
        value
            .trim()
            .parse()
            .map(Workload::Ram)
            .map_err(|source| WorkloadError::InvalidRam {
                value: value.to_string(),
                source,
            })
    }

    pub fn key(&self) -> &'static str {
        match self {
            Workload::Sleep(_) => SLEEP_KEY,
            Workload::Cpu(_) => CPU_KEY,
            Workload::Ram(_) => RAM_KEY,
        }
    }

    /// Runs the workload to completion.
    ///
    /// Sleeping only suspends the calling task. CPU and RAM work happen on the
    /// blocking pool so other connections keep being served meanwhile.
    pub async fn run(self) -> Result<(), RelayError> {
        match self {
            Workload::Sleep(duration) => tokio::time::sleep(duration).await,
            Workload::Cpu(iterations) => {
                tokio::task::spawn_blocking(move || burn_cpu(iterations)).await?
            }
            Workload::Ram(bytes) => {
                tokio::task::spawn_blocking(move || occupy_ram(bytes)).await?;
            }
        }
        Ok(())
    }
}

/// Draws `iterations` single random bytes from the OS generator. The syscall
/// per byte keeps this CPU bound rather than memory bound.
pub fn burn_cpu(iterations: u64) {
    let mut buf = [0u8; 1];
    for _ in 0..iterations {
        let _ = OsRng.try_fill_bytes(&mut buf);
    }
}

/// Allocates `bytes` and writes every one so the pages are actually committed,
/// then releases them. Returns the number of bytes held.
pub fn occupy_ram(bytes: usize) -> usize {
    let block = vec![1u8; bytes];
    std::hint::black_box(&block).len()
}
