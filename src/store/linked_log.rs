//! store/linked_log - RO linked-log: батчи цепочек истории адресов.
//!
//! Файл `<root>/linked-log`:
//!   header (16 байт): [magic8 "GSFALLOG"][ver u32=1][reserved u32]
//!   далее кадры батчей, каждый по своему offset:
//!     [codec u16][reserved u16][payload_len u32]   (LE)
//!     [payload: payload_len байт]                  (codec 0 = raw, 1 = zstd)
//!     [previous PackedLocation 9]                  (offset 0 - конец цепочки)
//!     [crc32 u32]                                  (LE, по codec..previous)
//!
//! Распакованный payload - N * 9 байт PackedLocation (новые первыми).
//! Заголовок файла занимает offset 0, поэтому 0 свободен под терминатор.

use anyhow::{anyhow, Context, Result};
use byteorder::{ByteOrder, LittleEndian};
use crc32fast::Hasher as Crc32;
use log::debug;
use memmap2::{Mmap, MmapOptions};
use std::fs::OpenOptions;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::config::DEFAULT_MAX_BATCH_BYTES;
use crate::consts::{
    CODEC_RAW, CODEC_ZSTD, FRAME_HDR_SIZE, FRAME_OFF_CODEC, FRAME_OFF_PAYLOAD_LEN,
    FRAME_OFF_RESERVED, FRAME_TRAILER_SIZE, LINKED_LOG_FILE, LL_HDR_SIZE, LL_MAGIC, LL_VERSION,
    PACKED_LOCATION_LEN,
};
use crate::ctx::ReadCtx;
use crate::error::GsfaError;
use crate::location::{decode_batch, encode_batch, PackedLocation};
use crate::metrics::record_batch_read;

use super::{BatchLog, LogBatch};

pub fn linked_log_path(root: &Path) -> PathBuf {
    root.join(LINKED_LOG_FILE)
}

pub struct LinkedLog {
    path: PathBuf,
    len: u64,
    max_batch_bytes: usize,
    verify_crc: bool,
    // None после close()
    map: Option<Mmap>,
}

impl LinkedLog {
    pub fn open(path: &Path) -> Result<Self> {
        let f = OpenOptions::new()
            .read(true)
            .open(path)
            .with_context(|| format!("open linked log {}", path.display()))?;
        let flen = f.metadata()?.len() as usize;
        if flen < LL_HDR_SIZE {
            return Err(GsfaError::Corrupt(format!(
                "linked log {} too short ({} bytes)",
                path.display(),
                flen
            ))
            .into());
        }

        let map = unsafe {
            MmapOptions::new()
                .offset(0)
                .len(flen)
                .map(&f)
                .map_err(|e| anyhow!("linked log mmap {}: {}", path.display(), e))?
        };

        if &map[..8] != LL_MAGIC {
            return Err(GsfaError::Corrupt(format!("bad linked log magic in {}", path.display())).into());
        }
        let version = LittleEndian::read_u32(&map[8..12]);
        if version != LL_VERSION {
            return Err(anyhow!(
                "unsupported linked log version {} in {} (expected {})",
                version,
                path.display(),
                LL_VERSION
            ));
        }

        debug!("linked log {} opened: {} bytes", path.display(), flen);
        Ok(Self {
            path: path.to_path_buf(),
            len: flen as u64,
            max_batch_bytes: DEFAULT_MAX_BATCH_BYTES,
            verify_crc: true,
            map: Some(map),
        })
    }

    pub fn open_in(root: &Path) -> Result<Self> {
        Self::open(&linked_log_path(root))
    }

    pub fn set_max_batch_bytes(&mut self, n: usize) {
        self.max_batch_bytes = n;
    }

    pub fn set_verify_crc(&mut self, on: bool) {
        self.verify_crc = on;
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len as usize <= LL_HDR_SIZE
    }

    fn decode_at(&self, map: &[u8], offset: u64) -> Result<LogBatch> {
        if offset < LL_HDR_SIZE as u64 {
            return Err(GsfaError::Corrupt(format!(
                "offset {} points into linked log header",
                offset
            ))
            .into());
        }
        let start = offset as usize;
        let hdr_end = start
            .checked_add(FRAME_HDR_SIZE)
            .filter(|&e| e <= map.len())
            .ok_or_else(|| {
                GsfaError::Corrupt(format!("frame header at {} past end of file ({})", offset, map.len()))
            })?;
        let hdr = &map[start..hdr_end];
        let codec = LittleEndian::read_u16(&hdr[FRAME_OFF_CODEC..FRAME_OFF_CODEC + 2]);
        let payload_len =
            LittleEndian::read_u32(&hdr[FRAME_OFF_PAYLOAD_LEN..FRAME_OFF_PAYLOAD_LEN + 4]) as usize;

        if payload_len > self.max_batch_bytes {
            return Err(anyhow!(
                "batch payload {} exceeds max_batch_bytes {} (set GSFA_MAX_BATCH_BYTES to override)",
                payload_len,
                self.max_batch_bytes
            ));
        }

        let frame_end = hdr_end
            .checked_add(payload_len + FRAME_TRAILER_SIZE)
            .filter(|&e| e <= map.len())
            .ok_or_else(|| {
                GsfaError::Corrupt(format!(
                    "frame at {} (payload {}) past end of file ({})",
                    offset,
                    payload_len,
                    map.len()
                ))
            })?;
        let frame = &map[start..frame_end];
        let crc_at = frame.len() - 4;

        if self.verify_crc {
            let stored = LittleEndian::read_u32(&frame[crc_at..]);
            let calc = frame_crc(&frame[..crc_at]);
            if stored != calc {
                return Err(GsfaError::Corrupt(format!(
                    "frame CRC mismatch at {} (stored={}, calc={})",
                    offset, stored, calc
                ))
                .into());
            }
        }

        let payload = &frame[FRAME_HDR_SIZE..FRAME_HDR_SIZE + payload_len];
        let previous =
            PackedLocation::from_bytes(&frame[crc_at - PACKED_LOCATION_LEN..crc_at])?;

        let locations = match codec {
            CODEC_RAW => decode_batch(payload)?,
            CODEC_ZSTD => decode_batch(&self.unzstd(payload, offset)?)?,
            other => {
                return Err(GsfaError::Corrupt(format!(
                    "unsupported batch codec_id={} at {}",
                    other, offset
                ))
                .into());
            }
        };

        record_batch_read(frame.len());
        Ok(LogBatch {
            locations,
            previous,
        })
    }

    /// Потоковая распаковка с ограничением max_batch_bytes.
    fn unzstd(&self, chunk: &[u8], offset: u64) -> Result<Vec<u8>> {
        let mut decoder = zstd::stream::read::Decoder::new(chunk)
            .map_err(|e| anyhow!("zstd decoder init (offset={}): {}", offset, e))?;
        let mut out = Vec::new();
        let limit = self.max_batch_bytes as u64;
        // +1: чтобы отличить "ровно лимит" от "больше лимита"
        (&mut decoder)
            .take(limit.saturating_add(1))
            .read_to_end(&mut out)
            .map_err(|e| anyhow!("zstd decode read (offset={}): {}", offset, e))?;
        if out.len() as u64 > limit {
            return Err(anyhow!(
                "decoded batch at {} exceeds max_batch_bytes {}",
                offset,
                self.max_batch_bytes
            ));
        }
        Ok(out)
    }
}

impl BatchLog for LinkedLog {
    fn read_batch(&self, ctx: &ReadCtx, offset: u64) -> Result<LogBatch> {
        ctx.check()?;
        let map = self.map.as_ref().ok_or(GsfaError::Closed("linked log"))?;
        self.decode_at(map, offset)
            .with_context(|| format!("read linked log {} at offset {}", self.path.display(), offset))
    }

    fn close(&mut self) -> Result<()> {
        match self.map.take() {
            Some(_m) => Ok(()),
            None => Err(GsfaError::Closed("linked log").into()),
        }
    }
}

fn frame_crc(bytes: &[u8]) -> u32 {
    let mut hasher = Crc32::new();
    hasher.update(bytes);
    hasher.finalize()
}

/// Заголовок файла linked-log (16 байт).
pub fn encode_file_header() -> [u8; LL_HDR_SIZE] {
    let mut hdr = [0u8; LL_HDR_SIZE];
    hdr[..8].copy_from_slice(LL_MAGIC);
    LittleEndian::write_u32(&mut hdr[8..12], LL_VERSION);
    hdr
}

/// Собрать кадр батча (чистый кодек, без записи на диск).
pub fn encode_frame(locations: &[PackedLocation], previous: PackedLocation, codec: u16) -> Result<Vec<u8>> {
    let raw = encode_batch(locations);
    let payload = match codec {
        CODEC_RAW => raw,
        CODEC_ZSTD => zstd::stream::encode_all(raw.as_slice(), 0).context("zstd encode batch")?,
        other => return Err(anyhow!("unsupported batch codec_id={}", other)),
    };
    let payload_len = u32::try_from(payload.len())
        .map_err(|_| anyhow!("batch payload too large: {}", payload.len()))?;

    let mut out = vec![0u8; FRAME_HDR_SIZE];
    LittleEndian::write_u16(&mut out[FRAME_OFF_CODEC..FRAME_OFF_CODEC + 2], codec);
    LittleEndian::write_u16(&mut out[FRAME_OFF_RESERVED..FRAME_OFF_RESERVED + 2], 0);
    LittleEndian::write_u32(&mut out[FRAME_OFF_PAYLOAD_LEN..FRAME_OFF_PAYLOAD_LEN + 4], payload_len);
    out.extend_from_slice(&payload);
    out.extend_from_slice(&previous.to_bytes());
    let crc = frame_crc(&out);
    let mut crc4 = [0u8; 4];
    LittleEndian::write_u32(&mut crc4, crc);
    out.extend_from_slice(&crc4);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_path(name: &str) -> PathBuf {
        let t = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("gsfa-ll-{}-{}-{}", name, std::process::id(), t))
    }

    fn loc(o: u64, s: u64) -> PackedLocation {
        PackedLocation::new(o, s).unwrap()
    }

    /// Записать файл с двумя батчами; вернуть (offset1, offset2).
    fn write_two(path: &Path, codec: u16) -> (u64, u64) {
        let mut buf = encode_file_header().to_vec();
        let off1 = buf.len() as u64;
        let f1 = encode_frame(&[loc(10, 1), loc(20, 2)], PackedLocation::default(), codec).unwrap();
        buf.extend_from_slice(&f1);
        let off2 = buf.len() as u64;
        let f2 = encode_frame(&[loc(30, 3)], loc(off1, f1.len() as u64), codec).unwrap();
        buf.extend_from_slice(&f2);
        fs::write(path, buf).unwrap();
        (off1, off2)
    }

    #[test]
    fn raw_and_zstd_frames_decode() {
        for codec in [CODEC_RAW, CODEC_ZSTD] {
            let path = temp_path(&format!("codec{codec}"));
            let (off1, off2) = write_two(&path, codec);
            let ll = LinkedLog::open(&path).unwrap();
            let ctx = ReadCtx::background();

            let b2 = ll.read_batch(&ctx, off2).unwrap();
            assert_eq!(b2.locations, vec![loc(30, 3)]);
            assert_eq!(b2.previous_offset(), off1);

            let b1 = ll.read_batch(&ctx, off1).unwrap();
            assert_eq!(b1.locations, vec![loc(10, 1), loc(20, 2)]);
            assert!(b1.previous.is_chain_end());
            let _ = fs::remove_file(&path);
        }
    }

    #[test]
    fn crc_mismatch_is_corrupt() {
        let path = temp_path("crc");
        let (off1, _) = write_two(&path, CODEC_RAW);
        let mut raw = fs::read(&path).unwrap();
        raw[off1 as usize + FRAME_HDR_SIZE] ^= 0x55;
        fs::write(&path, raw).unwrap();

        let ll = LinkedLog::open(&path).unwrap();
        let err = ll.read_batch(&ReadCtx::background(), off1).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("CRC") && msg.contains(&format!("offset {off1}")), "{msg}");
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn offset_in_header_or_past_end_fails() {
        let path = temp_path("bounds");
        write_two(&path, CODEC_RAW);
        let ll = LinkedLog::open(&path).unwrap();
        let ctx = ReadCtx::background();
        assert!(ll.read_batch(&ctx, 0).is_err());
        assert!(ll.read_batch(&ctx, 4).is_err());
        assert!(ll.read_batch(&ctx, ll.len() + 100).is_err());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn max_batch_bytes_guard() {
        let path = temp_path("guard");
        let (off1, _) = write_two(&path, CODEC_RAW);
        let mut ll = LinkedLog::open(&path).unwrap();
        ll.set_max_batch_bytes(9);
        let err = ll.read_batch(&ReadCtx::background(), off1).unwrap_err();
        assert!(format!("{err:#}").contains("max_batch_bytes"));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn unbounded_max_batch_bytes_reads_zstd() {
        let path = temp_path("unbounded");
        let (off1, off2) = write_two(&path, CODEC_ZSTD);
        let mut ll = LinkedLog::open(&path).unwrap();
        ll.set_max_batch_bytes(usize::MAX);
        let ctx = ReadCtx::background();
        assert_eq!(ll.read_batch(&ctx, off2).unwrap().locations, vec![loc(30, 3)]);
        assert_eq!(ll.read_batch(&ctx, off1).unwrap().locations.len(), 2);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn cancelled_ctx_stops_read() {
        let path = temp_path("cancel");
        let (off1, _) = write_two(&path, CODEC_RAW);
        let ll = LinkedLog::open(&path).unwrap();
        let ctx = ReadCtx::background();
        ctx.cancel();
        let err = ll.read_batch(&ctx, off1).unwrap_err();
        assert!(crate::error::is_cancelled(&err));
        let _ = fs::remove_file(&path);
    }
}
