//! reader/range - пагинация по курсорам-подписям (before / until).
//!
//! Индекс хранит только locations, поэтому каждая запись на пути
//! превращается в подпись через `signature_of` (колбэк вызывающего).
//!
//! Семантика:
//! - before = None  → все записи с начала цепочки подходят.
//! - before = Some  → записи пропускаются до совпадения; сама совпавшая запись
//!                    тоже исключается, дальше подходят все.
//! - until  = Some  → после добавления совпавшей записи обход прекращается
//!                    (включительно), даже если limit не набран.
//! - before так и не встретился → пустой результат после полного обхода.

use anyhow::Result;
use log::debug;

use crate::ctx::ReadCtx;
use crate::error::GsfaError;
use crate::location::PackedLocation;
use crate::metrics::{record_locations_returned, record_resolver_call};
use crate::types::{Pubkey, Signature};

use super::core::GsfaReader;

impl GsfaReader {
    pub fn range<F>(
        &self,
        ctx: &ReadCtx,
        pk: &Pubkey,
        limit: i64,
        before: Option<&Signature>,
        until: Option<&Signature>,
        mut signature_of: F,
    ) -> Result<Vec<PackedLocation>>
    where
        F: FnMut(&PackedLocation) -> Result<Signature>,
    {
        if limit <= 0 {
            return Ok(Vec::new());
        }
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);

        let mut walk = self.walk(ctx, pk)?;
        let mut out: Vec<PackedLocation> = Vec::new();
        let mut reached_before = before.is_none();

        'chain: while out.len() < limit {
            let batch = match walk.next() {
                Some(b) => b?,
                None => break,
            };
            for loc in batch.locations {
                record_resolver_call();
                let sig = signature_of(&loc).map_err(|source| GsfaError::Resolver {
                    location: loc,
                    source,
                })?;

                if !reached_before {
                    if Some(&sig) == before {
                        reached_before = true;
                    }
                    continue;
                }
                if out.len() >= limit {
                    break;
                }
                out.push(loc);
                if Some(&sig) == until {
                    break 'chain;
                }
            }
        }

        if !reached_before {
            // TODO: для очень глубоких историй это полный скан; нужен индекс signature -> позиция в цепочке
            debug!(
                "{}: before cursor not found after {} batches, returning empty",
                pk,
                walk.batches_read()
            );
        }

        record_locations_returned(out.len());
        Ok(out)
    }
}
