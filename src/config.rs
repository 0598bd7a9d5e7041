//! Centralized configuration and builder for the GSFA reader.
//!
//! Goals:
//! - Single place to collect tunables instead of scattering env lookups.
//! - GsfaConfig::from_env() reads GSFA_* env vars; ReaderBuilder overrides them.
//!
//! Tunables:
//! - max_batch_bytes (ENV GSFA_MAX_BATCH_BYTES) - upper bound on a decoded
//!   linked-log batch payload; guards against corrupted length fields.
//! - verify_crc (ENV GSFA_VERIFY_CRC) - verify per-frame CRC32 in the linked log.
//! - strict_chain_order (ENV GSFA_STRICT_CHAIN) - additionally require previous
//!   offsets to strictly decrease (append-only log). Off by default; revisiting
//!   a batch is always corruption.

use anyhow::Result;
use std::fmt;
use std::path::Path;

use crate::reader::GsfaReader;

/// Default limit for one decoded batch payload: 64 MiB.
pub const DEFAULT_MAX_BATCH_BYTES: usize = 64 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct GsfaConfig {
    /// Env: GSFA_MAX_BATCH_BYTES (default 64 MiB)
    pub max_batch_bytes: usize,

    /// Env: GSFA_VERIFY_CRC (default true; "0|false|off|no" => false)
    pub verify_crc: bool,

    /// Env: GSFA_STRICT_CHAIN (default false; "0|false|off|no" => false)
    pub strict_chain_order: bool,
}

impl Default for GsfaConfig {
    fn default() -> Self {
        Self {
            max_batch_bytes: DEFAULT_MAX_BATCH_BYTES,
            verify_crc: true,
            strict_chain_order: false,
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name).ok().map(|v| {
        let s = v.trim().to_ascii_lowercase();
        !(s == "0" || s == "false" || s == "off" || s == "no")
    })
}

impl GsfaConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("GSFA_MAX_BATCH_BYTES") {
            if let Ok(n) = v.trim().parse::<usize>() {
                cfg.max_batch_bytes = n;
            }
        }
        if let Some(on) = env_flag("GSFA_VERIFY_CRC") {
            cfg.verify_crc = on;
        }
        if let Some(on) = env_flag("GSFA_STRICT_CHAIN") {
            cfg.strict_chain_order = on;
        }

        cfg
    }

    pub fn with_max_batch_bytes(mut self, n: usize) -> Self {
        self.max_batch_bytes = n;
        self
    }

    pub fn with_verify_crc(mut self, on: bool) -> Self {
        self.verify_crc = on;
        self
    }

    pub fn with_strict_chain_order(mut self, on: bool) -> Self {
        self.strict_chain_order = on;
        self
    }
}

impl fmt::Display for GsfaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GsfaConfig {{ max_batch_bytes: {}, verify_crc: {}, strict_chain_order: {} }}",
            self.max_batch_bytes, self.verify_crc, self.strict_chain_order,
        )
    }
}

/// Builder over GsfaConfig. `GsfaReader::builder()` returns it.
#[derive(Clone, Debug)]
pub struct ReaderBuilder {
    cfg: GsfaConfig,
}

impl Default for ReaderBuilder {
    fn default() -> Self {
        // Start from env, then allow overrides.
        Self {
            cfg: GsfaConfig::from_env(),
        }
    }
}

impl ReaderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a clean default (without reading env).
    pub fn from_default() -> Self {
        Self {
            cfg: GsfaConfig::default(),
        }
    }

    pub fn max_batch_bytes(mut self, n: usize) -> Self {
        self.cfg.max_batch_bytes = n;
        self
    }

    pub fn verify_crc(mut self, on: bool) -> Self {
        self.cfg.verify_crc = on;
        self
    }

    pub fn strict_chain_order(mut self, on: bool) -> Self {
        self.cfg.strict_chain_order = on;
        self
    }

    pub fn build(self) -> GsfaConfig {
        self.cfg
    }

    /// Open the index directory with the collected configuration.
    pub fn open(self, root: &Path) -> Result<GsfaReader> {
        GsfaReader::open_with_config(root, self.cfg)
    }
}
