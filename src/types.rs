//! types - идентификаторы аккаунтов и транзакций.
//!
//! Pubkey (32 байта) и Signature (64 байта): Copy-обёртки, Display/FromStr в base58
//! (та же запись, что у идентификаторов аккаунтов и транзакций в RPC).

use anyhow::{anyhow, Result};
use std::fmt;
use std::str::FromStr;

use crate::consts::{PUBKEY_LEN, SIGNATURE_LEN};

/// Публичный ключ аккаунта (ключ offsets index).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pubkey([u8; PUBKEY_LEN]);

impl Pubkey {
    pub const fn new(bytes: [u8; PUBKEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(b: &[u8]) -> Result<Self> {
        let arr: [u8; PUBKEY_LEN] = b
            .try_into()
            .map_err(|_| anyhow!("pubkey must be {} bytes, got {}", PUBKEY_LEN, b.len()))?;
        Ok(Self(arr))
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; PUBKEY_LEN] {
        &self.0
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(&self.0).into_string())
    }
}

impl fmt::Debug for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pubkey({})", self)
    }
}

impl FromStr for Pubkey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let v = base58_decode(s)?;
        Self::from_slice(&v)
    }
}

/// Подпись транзакции - курсор пагинации (before/until).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature([u8; SIGNATURE_LEN]);

impl Signature {
    pub const fn new(bytes: [u8; SIGNATURE_LEN]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(b: &[u8]) -> Result<Self> {
        let arr: [u8; SIGNATURE_LEN] = b.try_into().map_err(|_| {
            anyhow!("signature must be {} bytes, got {}", SIGNATURE_LEN, b.len())
        })?;
        Ok(Self(arr))
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(&self.0).into_string())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self)
    }
}

impl FromStr for Signature {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let v = base58_decode(s)?;
        Self::from_slice(&v)
    }
}

// --------- Helpers ----------

fn base58_decode(s: &str) -> Result<Vec<u8>> {
    let s = s.trim();
    bs58::decode(s)
        .into_vec()
        .map_err(|e| anyhow!("invalid base58 {:?}: {}", s, e))
}
