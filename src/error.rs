//! error - типизированные виды ошибок read path.
//!
//! Публичные функции возвращают `anyhow::Result` с контекстом; конкретный вид
//! достаётся через `err.downcast_ref::<GsfaError>()` или хелперы ниже.

use thiserror::Error;

use crate::location::PackedLocation;
use crate::types::Pubkey;

#[derive(Error, Debug)]
pub enum GsfaError {
    /// У ключа нет записей в offsets index.
    #[error("pubkey {0} not found")]
    PubkeyNotFound(Pubkey),

    #[error("invalid byte slice length: expected {expected}, got {got}")]
    InvalidLength { expected: String, got: usize },

    #[error("location out of range: offset={offset} (max 2^48-1), size={size} (max 2^24-1)")]
    LocationOutOfRange { offset: u64, size: u64 },

    #[error("failed to parse offset and size at index {index}: {source}")]
    RecordDecode {
        index: usize,
        #[source]
        source: Box<GsfaError>,
    },

    #[error("corrupt index data: {0}")]
    Corrupt(String),

    #[error("error while getting signature at {location}: {source}")]
    Resolver {
        location: PackedLocation,
        #[source]
        source: anyhow::Error,
    },

    #[error("{0} is closed")]
    Closed(&'static str),

    #[error("operation cancelled")]
    Cancelled,

    #[error("close failed ({} errors): {}", .0.len(), join_errors(.0))]
    CloseFailed(Vec<anyhow::Error>),
}

fn join_errors(errs: &[anyhow::Error]) -> String {
    errs.iter()
        .map(|e| format!("{:#}", e))
        .collect::<Vec<_>>()
        .join("; ")
}

fn kind_of(err: &anyhow::Error) -> Option<&GsfaError> {
    err.chain().find_map(|e| e.downcast_ref::<GsfaError>())
}

/// true, если ошибка (или её причина) - PubkeyNotFound.
pub fn is_not_found(err: &anyhow::Error) -> bool {
    matches!(kind_of(err), Some(GsfaError::PubkeyNotFound(_)))
}

pub fn is_cancelled(err: &anyhow::Error) -> bool {
    matches!(kind_of(err), Some(GsfaError::Cancelled))
}

/// true для ошибок целостности данных (длина/диапазон/CRC/порядок цепочки).
pub fn is_corruption(err: &anyhow::Error) -> bool {
    matches!(
        kind_of(err),
        Some(
            GsfaError::InvalidLength { .. }
                | GsfaError::LocationOutOfRange { .. }
                | GsfaError::RecordDecode { .. }
                | GsfaError::Corrupt(_)
        )
    )
}
