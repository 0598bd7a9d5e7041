// src/meta.rs - аннотации индекса (index meta)
//
// Упорядоченный список пар key -> value (строки). Для read path непрозрачен,
// хранится в manifest и отдаётся через GsfaReader::meta().
//
// Известные ключи:
//   "index_kind" - тип индекса (например, "gsfa")
//   "epoch"      - эпоха, из которой построен индекс (u64 в десятичной записи)

use serde::{Deserialize, Serialize};

pub const META_KEY_INDEX_KIND: &str = "index_kind";
pub const META_KEY_EPOCH: &str = "epoch";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaKv {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndexMeta {
    entries: Vec<MetaKv>,
}

impl IndexMeta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Добавить пару. Дубликаты ключей допустимы; get() возвращает первую.
    pub fn add<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.entries.push(MetaKv {
            key: key.into(),
            value: value.into(),
        });
    }

    pub fn with<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.add(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|kv| kv.key == key)
            .map(|kv| kv.value.as_str())
    }

    pub fn index_kind(&self) -> Option<&str> {
        self.get(META_KEY_INDEX_KIND)
    }

    /// Эпоха из аннотаций (если есть и парсится как u64).
    pub fn epoch(&self) -> Option<u64> {
        self.get(META_KEY_EPOCH)
            .and_then(|s| s.trim().parse::<u64>().ok())
    }

    pub fn entries(&self) -> &[MetaKv] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
