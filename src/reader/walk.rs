//! reader/walk - ленивый обход цепочки linked-log.
//!
//! Батч идентифицируется своим offset, 0 - терминатор. Каждый next() читает
//! ровно один батч. Посещённые offsets запоминаются: повторный offset в
//! цепочке означает цикл и даёт Corrupt, порядок offsets при этом не важен.

use anyhow::{Context, Result};
use log::debug;
use std::collections::HashSet;

use crate::consts::CHAIN_END;
use crate::ctx::ReadCtx;
use crate::error::GsfaError;
use crate::store::{BatchLog, LogBatch};

/// Итератор батчей одной цепочки, новые первыми.
///
/// После первой ошибки итератор завершается (None).
pub struct ChainWalk<'a> {
    log: &'a dyn BatchLog,
    ctx: &'a ReadCtx,
    next: u64,
    strict: bool,
    // offsets уже прочитанных батчей этого обхода
    visited: HashSet<u64>,
    batches: u64,
    failed: bool,
}

impl<'a> ChainWalk<'a> {
    pub(crate) fn new(log: &'a dyn BatchLog, ctx: &'a ReadCtx, head: u64, strict: bool) -> Self {
        Self {
            log,
            ctx,
            next: head,
            strict,
            visited: HashSet::new(),
            batches: 0,
            failed: false,
        }
    }

    /// Offset батча, который будет прочитан следующим (0 - цепочка исчерпана).
    pub fn next_offset(&self) -> u64 {
        self.next
    }

    /// Сколько батчей уже прочитано.
    pub fn batches_read(&self) -> u64 {
        self.batches
    }

    fn step(&mut self) -> Result<LogBatch> {
        let cur = self.next;
        let batch = self
            .log
            .read_batch(self.ctx, cur)
            .with_context(|| format!("error while reading linked log with next={}", cur))?;
        let prev = batch.previous_offset();
        debug!(
            "batch at {}: {} locations, previous={}",
            cur,
            batch.locations.len(),
            prev
        );

        self.visited.insert(cur);
        if prev != CHAIN_END && self.visited.contains(&prev) {
            return Err(GsfaError::Corrupt(format!(
                "linked log chain has a cycle: batch at {} points back to {}",
                cur, prev
            ))
            .into());
        }

        // append-only: предыдущий батч всегда лежит раньше текущего
        if self.strict && prev != CHAIN_END && prev >= cur {
            return Err(GsfaError::Corrupt(format!(
                "linked log chain does not move backwards: batch at {} points to {}",
                cur, prev
            ))
            .into());
        }

        self.next = prev;
        self.batches += 1;
        Ok(batch)
    }
}

impl<'a> Iterator for ChainWalk<'a> {
    type Item = Result<LogBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.next == CHAIN_END {
            return None;
        }
        let res = self.step();
        if res.is_err() {
            self.failed = true;
        }
        Some(res)
    }
}
