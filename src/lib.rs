#![allow(non_snake_case)]

// Базовые модули
pub mod consts;
pub mod config;
pub mod ctx;
pub mod error;
pub mod metrics;
pub mod meta;
pub mod types;

// Кодек упакованных указателей (offset u48 + size u24)
pub mod location;

// Хранилища: offsets index, linked-log, manifest (+ in-memory)
pub mod store;   // src/store/{mod,offsets,linked_log,manifest,mem}.rs

// Обход цепочек и пагинация
pub mod reader;  // src/reader/{mod,core,walk,history,range}.rs

// Удобные реэкспорты
pub use config::{GsfaConfig, ReaderBuilder};
pub use ctx::ReadCtx;
pub use error::{is_cancelled, is_corruption, is_not_found, GsfaError};
pub use location::{decode, decode_batch, encode, encode_batch, PackedLocation};
pub use meta::IndexMeta;
pub use reader::{ChainWalk, GsfaReader};
pub use store::{BatchLog, LogBatch, ManifestSource, PointerIndex};
pub use types::{Pubkey, Signature};
