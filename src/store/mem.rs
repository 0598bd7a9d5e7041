//! store/mem - in-memory реализации PointerIndex / BatchLog / ManifestSource.
//!
//! Удобны для тестов обхода и для встраивания поверх чужого хранилища.
//! Считают вызовы (gets/reads) и умеют имитировать сбой close().

use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::consts::{FRAME_HDR_SIZE, FRAME_TRAILER_SIZE, LL_HDR_SIZE, PACKED_LOCATION_LEN};
use crate::ctx::ReadCtx;
use crate::error::GsfaError;
use crate::location::PackedLocation;
use crate::meta::IndexMeta;
use crate::types::Pubkey;

use super::{BatchLog, LogBatch, ManifestSource, PointerIndex};

#[derive(Debug, Default)]
pub struct MemPointerIndex {
    heads: HashMap<Pubkey, PackedLocation>,
    gets: Arc<AtomicU64>,
    fail_close: Option<String>,
    closed: bool,
}

impl MemPointerIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: Pubkey, head: PackedLocation) {
        self.heads.insert(key, head);
    }

    /// Число вызовов get().
    pub fn gets(&self) -> u64 {
        self.gets.load(Ordering::Relaxed)
    }

    /// Общий счётчик get() - остаётся доступен после передачи в reader.
    pub fn gets_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.gets)
    }

    /// close() вернёт ошибку с этим текстом.
    pub fn fail_close_with<S: Into<String>>(&mut self, msg: S) {
        self.fail_close = Some(msg.into());
    }
}

impl PointerIndex for MemPointerIndex {
    fn get(&self, ctx: &ReadCtx, key: &Pubkey) -> Result<Option<PackedLocation>> {
        ctx.check()?;
        if self.closed {
            return Err(GsfaError::Closed("offsets index").into());
        }
        self.gets.fetch_add(1, Ordering::Relaxed);
        Ok(self.heads.get(key).copied())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        match &self.fail_close {
            Some(msg) => Err(anyhow!("{}", msg)),
            None => Ok(()),
        }
    }
}

#[derive(Debug)]
pub struct MemLinkedLog {
    batches: HashMap<u64, LogBatch>,
    // следующий свободный синтетический offset
    next_offset: u64,
    reads: Arc<AtomicU64>,
    fail_close: Option<String>,
    closed: bool,
}

impl Default for MemLinkedLog {
    fn default() -> Self {
        Self {
            batches: HashMap::new(),
            next_offset: LL_HDR_SIZE as u64,
            reads: Arc::new(AtomicU64::new(0)),
            fail_close: None,
            closed: false,
        }
    }
}

impl MemLinkedLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Положить батч по явному offset (offset 0 запрещён).
    pub fn insert(&mut self, offset: u64, batch: LogBatch) -> Result<()> {
        if offset == 0 {
            return Err(anyhow!("offset 0 is reserved for chain end"));
        }
        self.batches.insert(offset, batch);
        Ok(())
    }

    /// Дописать цепочку: `batches` от старого к новому.
    /// Offsets растут, как в append-only файле. Возвращает голову (новейший батч).
    pub fn append_chain(&mut self, batches: &[Vec<PackedLocation>]) -> Result<PackedLocation> {
        let mut previous = PackedLocation::default();
        for locs in batches {
            let offset = self.next_offset;
            let frame_len = (FRAME_HDR_SIZE + locs.len() * PACKED_LOCATION_LEN + FRAME_TRAILER_SIZE) as u64;
            self.batches
                .insert(offset, LogBatch::new(locs.clone(), previous));
            self.next_offset += frame_len;
            previous = PackedLocation::new(offset, frame_len)?;
        }
        Ok(previous)
    }

    /// Число вызовов read_batch().
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    pub fn reads_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.reads)
    }

    pub fn fail_close_with<S: Into<String>>(&mut self, msg: S) {
        self.fail_close = Some(msg.into());
    }
}

impl BatchLog for MemLinkedLog {
    fn read_batch(&self, ctx: &ReadCtx, offset: u64) -> Result<LogBatch> {
        ctx.check()?;
        if self.closed {
            return Err(GsfaError::Closed("linked log").into());
        }
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.batches
            .get(&offset)
            .cloned()
            .ok_or_else(|| GsfaError::Corrupt(format!("no batch at offset {}", offset)).into())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        match &self.fail_close {
            Some(msg) => Err(anyhow!("{}", msg)),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemManifest {
    pub version: u64,
    pub meta: IndexMeta,
}

impl MemManifest {
    pub fn new(version: u64, meta: IndexMeta) -> Self {
        Self { version, meta }
    }
}

impl ManifestSource for MemManifest {
    fn meta(&self) -> IndexMeta {
        self.meta.clone()
    }

    fn version(&self) -> u64 {
        self.version
    }
}
