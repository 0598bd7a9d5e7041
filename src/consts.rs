//! Общие константы форматов (offsets index, linked-log, manifest, packed locations).

// -------- Packed location --------
/// Длина одной упакованной записи: 6 байт offset + 3 байта size (big-endian).
pub const PACKED_LOCATION_LEN: usize = 9;
pub const OFFSET_BYTES: usize = 6;
pub const SIZE_BYTES: usize = 3;
/// 2^48 - 1 (~281 TB)
pub const MAX_OFFSET: u64 = (1 << 48) - 1;
/// 2^24 - 1 (~16.7 MB)
pub const MAX_SIZE: u64 = (1 << 24) - 1;

/// Терминатор цепочки linked-log.
pub const CHAIN_END: u64 = 0;

// -------- Offsets index (pubkey -> newest batch) --------
pub const INDEX_KIND_PUBKEY_TO_OFFSET_AND_SIZE: &str = "pubkey-to-offset-and-size";
pub const INDEX_FILE_EXT: &str = "index";
pub const INDEX_MAGIC: &[u8; 8] = b"GSFAPKIX";
pub const INDEX_VERSION: u32 = 1;
// [magic8][ver u32][key_size u16][value_size u16][count u64][hdr_crc32 u32][reserved u32]
pub const INDEX_HDR_SIZE: usize = 32;
pub const INDEX_OFF_VERSION: usize = 8;
pub const INDEX_OFF_KEY_SIZE: usize = 12;
pub const INDEX_OFF_VALUE_SIZE: usize = 14;
pub const INDEX_OFF_COUNT: usize = 16;
pub const INDEX_OFF_CRC32: usize = 24;
pub const PUBKEY_LEN: usize = 32;
pub const INDEX_RECORD_LEN: usize = PUBKEY_LEN + PACKED_LOCATION_LEN;

// -------- Linked log --------
pub const LINKED_LOG_FILE: &str = "linked-log";
pub const LL_MAGIC: &[u8; 8] = b"GSFALLOG";
pub const LL_VERSION: u32 = 1;
// [magic8][ver u32][reserved u32] - ни один кадр не начинается с offset 0
pub const LL_HDR_SIZE: usize = 16;

// Кадр батча:
// [codec u16][reserved u16][payload_len u32][payload][previous 9][crc32 u32]
pub const FRAME_HDR_SIZE: usize = 8;
pub const FRAME_OFF_CODEC: usize = 0;
pub const FRAME_OFF_RESERVED: usize = 2;
pub const FRAME_OFF_PAYLOAD_LEN: usize = 4;
pub const FRAME_TRAILER_SIZE: usize = PACKED_LOCATION_LEN + 4;

pub const CODEC_RAW: u16 = 0;
pub const CODEC_ZSTD: u16 = 1;

// -------- Manifest --------
pub const MANIFEST_FILE: &str = "manifest";
pub const MANIFEST_FORMAT_VERSION: u32 = 1;

// -------- Signatures --------
pub const SIGNATURE_LEN: usize = 64;
