//! ctx - контекст чтения с флагом отмены.
//!
//! Ядро обхода флаг не опрашивает: его проверяют аксессоры (get/read_batch)
//! перед обращением к данным. Клоны делят один флаг.

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::GsfaError;

#[derive(Debug, Clone, Default)]
pub struct ReadCtx {
    cancelled: Arc<AtomicBool>,
}

impl ReadCtx {
    /// Контекст без отмены.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Err(Cancelled), если контекст отменён.
    #[inline]
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            crate::metrics::record_walk_cancelled();
            return Err(GsfaError::Cancelled.into());
        }
        Ok(())
    }
}
