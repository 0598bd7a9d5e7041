//! store/offsets - RO offsets index: pubkey -> PackedLocation головы цепочки.
//!
//! Файл `<root>/pubkey-to-offset-and-size.index`:
//!   header (32 байта, LE):
//!     [magic8 "GSFAPKIX"][ver u32=1][key_size u16=32][value_size u16=9]
//!     [count u64][hdr_crc32 u32][reserved u32]
//!   hdr_crc32 - CRC32 по байтам 8..24 (ver..count).
//!   далее count записей [pubkey 32][PackedLocation 9], отсортированы по pubkey.
//!
//! Файл мапится целиком (offset=0), поиск - бинарный по записям.

use anyhow::{anyhow, Context, Result};
use byteorder::{ByteOrder, LittleEndian};
use crc32fast::Hasher as Crc32;
use log::debug;
use memmap2::{Mmap, MmapOptions};
use std::cmp::Ordering;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use crate::consts::{
    INDEX_FILE_EXT, INDEX_HDR_SIZE, INDEX_KIND_PUBKEY_TO_OFFSET_AND_SIZE, INDEX_MAGIC,
    INDEX_OFF_COUNT, INDEX_OFF_CRC32, INDEX_OFF_KEY_SIZE, INDEX_OFF_VALUE_SIZE,
    INDEX_OFF_VERSION, INDEX_RECORD_LEN, INDEX_VERSION, PACKED_LOCATION_LEN, PUBKEY_LEN,
};
use crate::ctx::ReadCtx;
use crate::error::GsfaError;
use crate::location::PackedLocation;
use crate::metrics::record_lookup;
use crate::types::Pubkey;

use super::PointerIndex;

/// Путь к файлу offsets index внутри каталога индекса.
pub fn offsets_index_path(root: &Path) -> PathBuf {
    root.join(format!(
        "{}.{}",
        INDEX_KIND_PUBKEY_TO_OFFSET_AND_SIZE, INDEX_FILE_EXT
    ))
}

pub struct OffsetsIndex {
    path: PathBuf,
    count: u64,
    // None после close()
    map: Option<Mmap>,
}

impl OffsetsIndex {
    pub fn open(path: &Path) -> Result<Self> {
        let f = OpenOptions::new()
            .read(true)
            .open(path)
            .with_context(|| format!("open offsets index {}", path.display()))?;
        let flen = f.metadata()?.len() as usize;
        if flen < INDEX_HDR_SIZE {
            return Err(GsfaError::Corrupt(format!(
                "offsets index {} too short ({} bytes)",
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
                .map_err(|e| anyhow!("offsets index mmap {}: {}", path.display(), e))?
        };

        let count = validate_header(&map[..INDEX_HDR_SIZE], path)?;
        let expected = (INDEX_HDR_SIZE as u64)
            .checked_add(count.saturating_mul(INDEX_RECORD_LEN as u64))
            .ok_or_else(|| GsfaError::Corrupt(format!("offsets index count overflow: {}", count)))?;
        if flen as u64 != expected {
            return Err(GsfaError::Corrupt(format!(
                "offsets index {} length mismatch (file={}, expected={} for count={})",
                path.display(),
                flen,
                expected,
                count
            ))
            .into());
        }

        debug!("offsets index {} opened: {} keys", path.display(), count);
        Ok(Self {
            path: path.to_path_buf(),
            count,
            map: Some(map),
        })
    }

    /// Открыть `<root>/pubkey-to-offset-and-size.index`.
    pub fn open_in(root: &Path) -> Result<Self> {
        Self::open(&offsets_index_path(root))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn record(map: &[u8], i: usize) -> &[u8] {
        let start = INDEX_HDR_SIZE + i * INDEX_RECORD_LEN;
        &map[start..start + INDEX_RECORD_LEN]
    }

    fn lookup(&self, map: &[u8], key: &Pubkey) -> Result<Option<PackedLocation>> {
        let want = key.as_bytes().as_slice();
        let (mut lo, mut hi) = (0usize, self.count as usize);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let rec = Self::record(map, mid);
            match rec[..PUBKEY_LEN].cmp(want) {
                Ordering::Less => lo = mid + 1,
                Ordering::Greater => hi = mid,
                Ordering::Equal => {
                    let loc = PackedLocation::from_bytes(&rec[PUBKEY_LEN..])
                        .with_context(|| format!("decode offsets record {} for {}", mid, key))?;
                    return Ok(Some(loc));
                }
            }
        }
        Ok(None)
    }
}

impl PointerIndex for OffsetsIndex {
    fn get(&self, ctx: &ReadCtx, key: &Pubkey) -> Result<Option<PackedLocation>> {
        ctx.check()?;
        let map = self.map.as_ref().ok_or(GsfaError::Closed("offsets index"))?;
        let res = self.lookup(map, key)?;
        record_lookup(res.is_some());
        Ok(res)
    }

    fn close(&mut self) -> Result<()> {
        match self.map.take() {
            Some(_m) => Ok(()),
            None => Err(GsfaError::Closed("offsets index").into()),
        }
    }
}

/// Проверить заголовок, вернуть count.
fn validate_header(hdr: &[u8], path: &Path) -> Result<u64> {
    if &hdr[..8] != INDEX_MAGIC {
        return Err(GsfaError::Corrupt(format!("bad offsets index magic in {}", path.display())).into());
    }
    let version = LittleEndian::read_u32(&hdr[INDEX_OFF_VERSION..INDEX_OFF_VERSION + 4]);
    if version != INDEX_VERSION {
        return Err(anyhow!(
            "unsupported offsets index version {} in {} (expected {})",
            version,
            path.display(),
            INDEX_VERSION
        ));
    }
    let key_size = LittleEndian::read_u16(&hdr[INDEX_OFF_KEY_SIZE..INDEX_OFF_KEY_SIZE + 2]);
    let value_size = LittleEndian::read_u16(&hdr[INDEX_OFF_VALUE_SIZE..INDEX_OFF_VALUE_SIZE + 2]);
    if key_size as usize != PUBKEY_LEN || value_size as usize != PACKED_LOCATION_LEN {
        return Err(GsfaError::Corrupt(format!(
            "offsets index {} has key_size={} value_size={} (expected {}/{})",
            path.display(),
            key_size,
            value_size,
            PUBKEY_LEN,
            PACKED_LOCATION_LEN
        ))
        .into());
    }
    let stored = LittleEndian::read_u32(&hdr[INDEX_OFF_CRC32..INDEX_OFF_CRC32 + 4]);
    let calc = header_crc(hdr);
    if stored != calc {
        return Err(GsfaError::Corrupt(format!(
            "offsets index header CRC mismatch in {} (stored={}, calc={})",
            path.display(),
            stored,
            calc
        ))
        .into());
    }
    Ok(LittleEndian::read_u64(&hdr[INDEX_OFF_COUNT..INDEX_OFF_COUNT + 8]))
}

/// CRC32 по [ver u32][key_size u16][value_size u16][count u64].
pub fn header_crc(hdr: &[u8]) -> u32 {
    let mut hasher = Crc32::new();
    hasher.update(&hdr[INDEX_OFF_VERSION..INDEX_OFF_CRC32]);
    hasher.finalize()
}

/// Собрать заголовок offsets index для count записей (с CRC).
pub fn encode_header(count: u64) -> [u8; INDEX_HDR_SIZE] {
    let mut hdr = [0u8; INDEX_HDR_SIZE];
    hdr[..8].copy_from_slice(INDEX_MAGIC);
    LittleEndian::write_u32(&mut hdr[INDEX_OFF_VERSION..INDEX_OFF_VERSION + 4], INDEX_VERSION);
    LittleEndian::write_u16(&mut hdr[INDEX_OFF_KEY_SIZE..INDEX_OFF_KEY_SIZE + 2], PUBKEY_LEN as u16);
    LittleEndian::write_u16(
        &mut hdr[INDEX_OFF_VALUE_SIZE..INDEX_OFF_VALUE_SIZE + 2],
        PACKED_LOCATION_LEN as u16,
    );
    LittleEndian::write_u64(&mut hdr[INDEX_OFF_COUNT..INDEX_OFF_COUNT + 8], count);
    let crc = header_crc(&hdr);
    LittleEndian::write_u32(&mut hdr[INDEX_OFF_CRC32..INDEX_OFF_CRC32 + 4], crc);
    hdr
}
