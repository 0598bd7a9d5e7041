//! reader/history - most_recent: последние N locations адреса, новые первыми.

use anyhow::Result;

use crate::ctx::ReadCtx;
use crate::location::PackedLocation;
use crate::metrics::record_locations_returned;
use crate::types::Pubkey;

use super::core::GsfaReader;

impl GsfaReader {
    /// До `limit` locations для `pk`, новые первыми.
    ///
    /// - limit <= 0 → пустой результат без обращений к хранилищам.
    /// - Ключа нет → PubkeyNotFound.
    /// - Порядок внутри батча сохраняется как есть (батч уже newest-first).
    /// - Батч после набора limit не читается.
    pub fn most_recent(&self, ctx: &ReadCtx, pk: &Pubkey, limit: i64) -> Result<Vec<PackedLocation>> {
        if limit <= 0 {
            return Ok(Vec::new());
        }
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);

        let mut walk = self.walk(ctx, pk)?;
        let mut out: Vec<PackedLocation> = Vec::new();

        while out.len() < limit {
            let batch = match walk.next() {
                Some(b) => b?,
                None => break,
            };
            for loc in batch.locations {
                if out.len() >= limit {
                    break;
                }
                out.push(loc);
            }
        }

        record_locations_returned(out.len());
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GsfaConfig;
    use crate::meta::IndexMeta;
    use crate::store::{MemLinkedLog, MemManifest, MemPointerIndex};

    fn loc(o: u64) -> PackedLocation {
        PackedLocation::new(o, 10).unwrap()
    }

    #[test]
    fn limit_cuts_inside_batch() {
        let pk = Pubkey::new([5; 32]);
        let mut ll = MemLinkedLog::new();
        let head = ll
            .append_chain(&[vec![loc(1)], vec![loc(5), loc(4), loc(3), loc(2)]])
            .unwrap();
        let mut idx = MemPointerIndex::new();
        idx.insert(pk, head);
        let r = GsfaReader::from_parts(
            Box::new(idx),
            Box::new(ll),
            Box::new(MemManifest::new(1, IndexMeta::new())),
            GsfaConfig::default(),
        );
        let ctx = ReadCtx::background();

        let got = r.most_recent(&ctx, &pk, 2).unwrap();
        assert_eq!(got, vec![loc(5), loc(4)]);

        let all = r.most_recent(&ctx, &pk, i64::MAX).unwrap();
        assert_eq!(all, vec![loc(5), loc(4), loc(3), loc(2), loc(1)]);
    }
}
