//! reader/core - GsfaReader: владение хранилищами, open/close, epoch, meta.
//!
//! Каталог индекса:
//!   <root>/pubkey-to-offset-and-size.index
//!   <root>/linked-log
//!   <root>/manifest
//!
//! Reader только читает; все операции обхода берут &self и безопасны для
//! параллельного вызова. close() забирает self целиком.

use anyhow::{anyhow, Context, Result};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{GsfaConfig, ReaderBuilder};
use crate::ctx::ReadCtx;
use crate::error::GsfaError;
use crate::location::PackedLocation;
use crate::meta::IndexMeta;
use crate::store::{BatchLog, LinkedLog, Manifest, ManifestSource, OffsetsIndex, PointerIndex};
use crate::types::Pubkey;

use super::walk::ChainWalk;

pub struct GsfaReader {
    root: Option<PathBuf>,
    epoch: Option<u64>,
    cfg: GsfaConfig,
    pub(crate) offsets: Box<dyn PointerIndex>,
    pub(crate) log: Box<dyn BatchLog>,
    manifest: Box<dyn ManifestSource>,
}

impl GsfaReader {
    pub fn builder() -> ReaderBuilder {
        ReaderBuilder::new()
    }

    /// Открыть существующий индекс (read-only), конфиг из ENV.
    pub fn open(root: &Path) -> Result<Self> {
        Self::open_with_config(root, GsfaConfig::from_env())
    }

    pub fn open_with_config(root: &Path, cfg: GsfaConfig) -> Result<Self> {
        let md = fs::metadata(root).with_context(|| format!("stat index root {}", root.display()))?;
        if !md.is_dir() {
            return Err(anyhow!("provided path is not a directory: {}", root.display()));
        }

        let offsets = OffsetsIndex::open_in(root).context("error while opening offsets index")?;

        let mut log = LinkedLog::open_in(root).context("error while opening linked log")?;
        log.set_max_batch_bytes(cfg.max_batch_bytes);
        log.set_verify_crc(cfg.verify_crc);

        let manifest = Manifest::open_in(root).context("error while opening manifest")?;

        info!(
            "gsfa index opened at {}: {} keys, linked log {} bytes, version {}",
            root.display(),
            offsets.len(),
            log.len(),
            manifest.version()
        );
        info!("{}", cfg);

        Ok(Self {
            root: Some(root.to_path_buf()),
            epoch: None,
            cfg,
            offsets: Box::new(offsets),
            log: Box::new(log),
            manifest: Box::new(manifest),
        })
    }

    /// Собрать reader из готовых хранилищ (in-memory, чужие backends).
    pub fn from_parts(
        offsets: Box<dyn PointerIndex>,
        log: Box<dyn BatchLog>,
        manifest: Box<dyn ManifestSource>,
        cfg: GsfaConfig,
    ) -> Self {
        Self {
            root: None,
            epoch: None,
            cfg,
            offsets,
            log,
            manifest,
        }
    }

    /// Закрыть offsets index и linked log. Пытается закрыть оба даже при
    /// ошибке первого; все ошибки возвращаются вместе (CloseFailed).
    pub fn close(mut self) -> Result<()> {
        let mut errs = Vec::new();
        if let Err(e) = self.offsets.close() {
            warn!("close offsets index: {:#}", e);
            errs.push(e.context("close offsets index"));
        }
        if let Err(e) = self.log.close() {
            warn!("close linked log: {:#}", e);
            errs.push(e.context("close linked log"));
        }
        if !errs.is_empty() {
            return Err(GsfaError::CloseFailed(errs).into());
        }
        if let Some(root) = &self.root {
            info!("gsfa index closed at {}", root.display());
        }
        Ok(())
    }

    // -------- epoch --------

    /// Пометить snapshot эпохой (на обход не влияет).
    pub fn set_epoch(&mut self, epoch: u64) {
        self.epoch = Some(epoch);
    }

    pub fn epoch(&self) -> Option<u64> {
        self.epoch
    }

    // -------- manifest --------

    pub fn meta(&self) -> IndexMeta {
        self.manifest.meta()
    }

    pub fn version(&self) -> u64 {
        self.manifest.version()
    }

    // -------- misc --------

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn config(&self) -> &GsfaConfig {
        &self.cfg
    }

    /// Голова цепочки для ключа; нет записей - PubkeyNotFound.
    pub(crate) fn head_of(&self, ctx: &ReadCtx, pk: &Pubkey) -> Result<PackedLocation> {
        let head = self
            .offsets
            .get(ctx, pk)
            .with_context(|| format!("error while getting initial offset for {}", pk))?;
        match head {
            Some(loc) => Ok(loc),
            None => Err(GsfaError::PubkeyNotFound(*pk).into()),
        }
    }

    /// Ленивый обход цепочки ключа (батчи новые → старые).
    pub fn walk<'a>(&'a self, ctx: &'a ReadCtx, pk: &Pubkey) -> Result<ChainWalk<'a>> {
        let head = self.head_of(ctx, pk)?;
        log::debug!("{}: head of chain {}", pk, head);
        Ok(ChainWalk::new(
            self.log.as_ref(),
            ctx,
            head.offset(),
            self.cfg.strict_chain_order,
        ))
    }
}
