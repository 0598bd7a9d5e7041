//! reader - Address History Reader (GsfaReader) поверх трёх хранилищ.
//!
//! Разделение по подмодулям:
//! - core.rs    - структура GsfaReader, open/close, epoch, meta/version
//! - walk.rs    - ленивый обход цепочки батчей (новые → старые)
//! - history.rs - most_recent(pubkey, limit)
//! - range.rs   - range(pubkey, limit, before, until, signature_of)

pub mod core;
pub mod history;
pub mod range;
pub mod walk;

pub use self::core::GsfaReader;
pub use walk::ChainWalk;
