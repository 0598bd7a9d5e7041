//! store - узкие интерфейсы трёх хранилищ индекса и их реализации.
//!
//! Разделение по подмодулям:
//! - offsets.rs    - pubkey -> PackedLocation (голова цепочки), файл `<kind>.index` (mmap)
//! - linked_log.rs - батчи цепочки (locations + previous), файл `linked-log` (mmap)
//! - manifest.rs   - версия индекса и аннотации, файл `manifest` (JSON)
//! - mem.rs        - in-memory реализации (удобны для тестов и встраивания)
//!
//! Ядро обхода (reader) зависит только от трейтов ниже.

use anyhow::Result;

use crate::ctx::ReadCtx;
use crate::location::PackedLocation;
use crate::meta::IndexMeta;
use crate::types::Pubkey;

pub mod linked_log;
pub mod manifest;
pub mod mem;
pub mod offsets;

pub use linked_log::{encode_frame, LinkedLog};
pub use manifest::{Manifest, ManifestFile};
pub use mem::{MemLinkedLog, MemManifest, MemPointerIndex};
pub use offsets::OffsetsIndex;

/// Один узел цепочки: записи (новые первыми) + ссылка на предыдущий батч.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogBatch {
    pub locations: Vec<PackedLocation>,
    /// offset == 0 - конец цепочки.
    pub previous: PackedLocation,
}

impl LogBatch {
    pub fn new(locations: Vec<PackedLocation>, previous: PackedLocation) -> Self {
        Self {
            locations,
            previous,
        }
    }

    #[inline]
    pub fn previous_offset(&self) -> u64 {
        self.previous.offset()
    }
}

/// pubkey -> PackedLocation самого нового батча. Thread-safe.
pub trait PointerIndex: Send + Sync {
    /// Ok(None) - у ключа нет записей. Err - I/O или повреждение.
    fn get(&self, ctx: &ReadCtx, key: &Pubkey) -> Result<Option<PackedLocation>>;
    fn close(&mut self) -> Result<()>;
}

/// Чтение батча linked-log по offset. Thread-safe.
pub trait BatchLog: Send + Sync {
    /// offset == 0 сюда не передаётся (терминатор проверяет вызывающий).
    fn read_batch(&self, ctx: &ReadCtx, offset: u64) -> Result<LogBatch>;
    fn close(&mut self) -> Result<()>;
}

/// Метаданные индекса. Только чтение, без close.
pub trait ManifestSource: Send + Sync {
    fn meta(&self) -> IndexMeta;
    fn version(&self) -> u64;
}
