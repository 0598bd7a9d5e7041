//! location - упакованный указатель (offset, size) в архиве.
//!
//! Формат записи (ровно 9 байт, без паддинга):
//!   [offset u48 BE][size u24 BE]
//!
//! Поля урезаны по ширине (не u64), чтобы индекс на миллионы записей оставался
//! компактным. Декодирование строгое: неверная длина или выход за диапазон
//! дают ошибку, никакого clamp/truncate.

use anyhow::Result;
use byteorder::{BigEndian, ByteOrder};
use std::fmt;

use crate::consts::{MAX_OFFSET, MAX_SIZE, OFFSET_BYTES, PACKED_LOCATION_LEN};
use crate::error::GsfaError;

/// Указатель на данные транзакции (или на батч linked-log).
///
/// Инвариант: offset <= 2^48-1, size <= 2^24-1. Значение вне диапазона
/// нельзя сконструировать.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct PackedLocation {
    offset: u64,
    size: u64,
}

impl PackedLocation {
    /// Проверка диапазонов без конструирования.
    #[inline]
    pub fn is_valid(offset: u64, size: u64) -> bool {
        offset <= MAX_OFFSET && size <= MAX_SIZE
    }

    pub fn new(offset: u64, size: u64) -> Result<Self> {
        if !Self::is_valid(offset, size) {
            return Err(GsfaError::LocationOutOfRange { offset, size }.into());
        }
        Ok(Self { offset, size })
    }

    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// true для терминатора цепочки (offset == 0).
    #[inline]
    pub fn is_chain_end(&self) -> bool {
        self.offset == crate::consts::CHAIN_END
    }

    pub fn to_bytes(&self) -> [u8; PACKED_LOCATION_LEN] {
        let mut out = [0u8; PACKED_LOCATION_LEN];
        BigEndian::write_u48(&mut out[..OFFSET_BYTES], self.offset);
        BigEndian::write_u24(&mut out[OFFSET_BYTES..], self.size as u32);
        out
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() != PACKED_LOCATION_LEN {
            return Err(GsfaError::InvalidLength {
                expected: PACKED_LOCATION_LEN.to_string(),
                got: buf.len(),
            }
            .into());
        }
        // 48/24 бита всегда влезают в диапазон - проверка не нужна
        Ok(Self {
            offset: BigEndian::read_u48(&buf[..OFFSET_BYTES]),
            size: BigEndian::read_u24(&buf[OFFSET_BYTES..]) as u64,
        })
    }
}

impl fmt::Display for PackedLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(offset={}, size={})", self.offset, self.size)
    }
}

impl fmt::Debug for PackedLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PackedLocation{}", self)
    }
}

/// Закодировать (offset, size); ошибка, если поля не влезают в 48/24 бита.
pub fn encode(offset: u64, size: u64) -> Result<[u8; PACKED_LOCATION_LEN]> {
    Ok(PackedLocation::new(offset, size)?.to_bytes())
}

/// Разобрать ровно одну 9-байтовую запись.
pub fn decode(buf: &[u8]) -> Result<PackedLocation> {
    PackedLocation::from_bytes(buf)
}

/// Разобрать плоский буфер записей (длина кратна 9), порядок сохраняется.
pub fn decode_batch(buf: &[u8]) -> Result<Vec<PackedLocation>> {
    if buf.len() % PACKED_LOCATION_LEN != 0 {
        return Err(GsfaError::InvalidLength {
            expected: format!("multiple of {}", PACKED_LOCATION_LEN),
            got: buf.len(),
        }
        .into());
    }
    let mut out = Vec::with_capacity(buf.len() / PACKED_LOCATION_LEN);
    for (index, rec) in buf.chunks_exact(PACKED_LOCATION_LEN).enumerate() {
        let loc = PackedLocation::from_bytes(rec).map_err(|e| match e.downcast::<GsfaError>() {
            Ok(kind) => GsfaError::RecordDecode {
                index,
                source: Box::new(kind),
            },
            Err(other) => GsfaError::Corrupt(format!("record {}: {:#}", index, other)),
        })?;
        out.push(loc);
    }
    Ok(out)
}

/// Склеить записи в плоский буфер (обратная операция к decode_batch).
pub fn encode_batch(locs: &[PackedLocation]) -> Vec<u8> {
    let mut out = Vec::with_capacity(locs.len() * PACKED_LOCATION_LEN);
    for l in locs {
        out.extend_from_slice(&l.to_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_big_endian_6_plus_3() {
        let b = encode(0x0102_0304_0506, 0x0A0B0C).unwrap();
        assert_eq!(b, [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x0A, 0x0B, 0x0C]);
    }

    #[test]
    fn boundaries() {
        assert!(PackedLocation::is_valid(MAX_OFFSET, MAX_SIZE));
        assert!(!PackedLocation::is_valid(MAX_OFFSET + 1, 0));
        assert!(!PackedLocation::is_valid(0, MAX_SIZE + 1));

        let max = decode(&encode(MAX_OFFSET, MAX_SIZE).unwrap()).unwrap();
        assert_eq!((max.offset(), max.size()), (MAX_OFFSET, MAX_SIZE));

        let err = encode(1 << 48, 0).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GsfaError>(),
            Some(GsfaError::LocationOutOfRange { .. })
        ));
        assert!(encode(0, 1 << 24).is_err());
    }

    #[test]
    fn decode_requires_exact_len() {
        assert!(decode(&[0u8; 8]).is_err());
        assert!(decode(&[0u8; 10]).is_err());
        assert!(decode(&[]).is_err());
    }

    #[test]
    fn batch_rejects_remainder() {
        assert!(decode_batch(&[]).unwrap().is_empty());
        let err = decode_batch(&[0u8; 19]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GsfaError>(),
            Some(GsfaError::InvalidLength { got: 19, .. })
        ));
    }

    #[test]
    fn batch_keeps_order() {
        let locs = vec![
            PackedLocation::new(300, 3).unwrap(),
            PackedLocation::new(100, 1).unwrap(),
            PackedLocation::new(200, 2).unwrap(),
        ];
        let buf = encode_batch(&locs);
        assert_eq!(buf.len(), 27);
        assert_eq!(decode_batch(&buf).unwrap(), locs);
    }
}
