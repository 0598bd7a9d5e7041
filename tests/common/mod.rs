// tests/common/mod.rs
//
// Общие помощники интеграционных тестов:
// - unique_root: уникальный каталог во временной директории;
// - write_index_dir: собрать на диске полный каталог индекса
//   (offsets index + linked-log + manifest) из историй адресов;
// - sig_for / resolver: детерминированная "подпись" для location.

#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Result};

use GsfaIndex::store::linked_log::{encode_file_header, linked_log_path};
use GsfaIndex::store::manifest::write_manifest;
use GsfaIndex::store::offsets::{encode_header, offsets_index_path};
use GsfaIndex::store::{encode_frame, ManifestFile};
use GsfaIndex::{IndexMeta, PackedLocation, Pubkey, Signature};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

pub fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("gsfatest-{prefix}-{pid}-{t}-{id}"))
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn pk(n: u8) -> Pubkey {
    let mut b = [0u8; 32];
    b[0] = n;
    b[31] = n.wrapping_mul(7);
    Pubkey::new(b)
}

/// Location транзакции в архиве (size фиксирован, offset задаёт номер).
pub fn tx(n: u64) -> PackedLocation {
    PackedLocation::new(n * 1000, 200 + n % 50).expect("valid location")
}

/// "Подпись" транзакции: первые 8 байт = offset, остальное заполнено маркером.
pub fn sig_for(loc: &PackedLocation) -> Signature {
    let mut b = [0xA5u8; 64];
    b[..8].copy_from_slice(&loc.offset().to_be_bytes());
    Signature::new(b)
}

pub fn resolver(loc: &PackedLocation) -> Result<Signature> {
    Ok(sig_for(loc))
}

/// История одного адреса: батчи от старого к новому, внутри батча новые первыми.
pub struct History {
    pub key: Pubkey,
    pub batches: Vec<Vec<PackedLocation>>,
}

impl History {
    pub fn new(key: Pubkey, batches: Vec<Vec<PackedLocation>>) -> Self {
        Self { key, batches }
    }

    /// Все locations новые первыми (как их должен вернуть обход).
    pub fn newest_first(&self) -> Vec<PackedLocation> {
        self.batches.iter().rev().flatten().copied().collect()
    }
}

/// Записать каталог индекса. Батчи разных адресов перемежаются в linked-log,
/// как при append-only ингесте. Возвращает головы цепочек.
pub fn write_index_dir(
    root: &Path,
    histories: &[History],
    codec: u16,
    index_version: u64,
    meta: IndexMeta,
) -> Result<HashMap<Pubkey, PackedLocation>> {
    fs::create_dir_all(root)?;

    let mut log = encode_file_header().to_vec();
    let mut heads: HashMap<Pubkey, PackedLocation> = HashMap::new();
    let rounds = histories.iter().map(|h| h.batches.len()).max().unwrap_or(0);
    for round in 0..rounds {
        for h in histories {
            let Some(locs) = h.batches.get(round) else {
                continue;
            };
            let previous = heads.get(&h.key).copied().unwrap_or_default();
            let offset = log.len() as u64;
            let frame = encode_frame(locs, previous, codec)?;
            let head = PackedLocation::new(offset, frame.len() as u64)?;
            log.extend_from_slice(&frame);
            heads.insert(h.key, head);
        }
    }
    fs::write(linked_log_path(root), &log)?;

    let mut keys: Vec<&Pubkey> = heads.keys().collect();
    keys.sort_by(|a, b| a.as_bytes().cmp(b.as_bytes()));
    let mut idx = encode_header(keys.len() as u64).to_vec();
    for k in keys {
        let head = heads.get(k).ok_or_else(|| anyhow!("missing head for {}", k))?;
        idx.extend_from_slice(k.as_bytes());
        idx.extend_from_slice(&head.to_bytes());
    }
    fs::write(offsets_index_path(root), &idx)?;

    write_manifest(root, &ManifestFile::new(index_version, meta))?;
    Ok(heads)
}
