//! store/manifest - версия индекса и аннотации (index meta).
//!
//! Файл `<root>/manifest` (JSON):
//!   {
//!     "manifest_version": 1,
//!     "index_version": <u64>,
//!     "meta": [ {"key": "...", "value": "..."}, ... ]
//!   }
//!
//! Читается один раз при открытии; дальше только отдаётся (без мутаций).

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::consts::{MANIFEST_FILE, MANIFEST_FORMAT_VERSION};
use crate::meta::IndexMeta;

use super::ManifestSource;

/// Сериализованное представление manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestFile {
    pub manifest_version: u32,
    pub index_version: u64,
    #[serde(default)]
    pub meta: IndexMeta,
}

impl ManifestFile {
    pub fn new(index_version: u64, meta: IndexMeta) -> Self {
        Self {
            manifest_version: MANIFEST_FORMAT_VERSION,
            index_version,
            meta,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("serialize manifest")
    }
}

pub fn manifest_path(root: &Path) -> PathBuf {
    root.join(MANIFEST_FILE)
}

/// Загруженный manifest.
#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
    inner: ManifestFile,
}

impl Manifest {
    pub fn open(path: &Path) -> Result<Self> {
        let mut f = OpenOptions::new()
            .read(true)
            .open(path)
            .with_context(|| format!("open manifest {}", path.display()))?;
        let mut buf = String::new();
        f.read_to_string(&mut buf)
            .with_context(|| format!("read manifest {}", path.display()))?;
        let inner: ManifestFile = serde_json::from_str(&buf)
            .with_context(|| format!("parse manifest json {}", path.display()))?;
        if inner.manifest_version != MANIFEST_FORMAT_VERSION {
            return Err(anyhow!(
                "unsupported manifest version {} in {} (expected {})",
                inner.manifest_version,
                path.display(),
                MANIFEST_FORMAT_VERSION
            ));
        }
        Ok(Self {
            path: path.to_path_buf(),
            inner,
        })
    }

    pub fn open_in(root: &Path) -> Result<Self> {
        Self::open(&manifest_path(root))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ManifestSource for Manifest {
    fn meta(&self) -> IndexMeta {
        self.inner.meta.clone()
    }

    fn version(&self) -> u64 {
        self.inner.index_version
    }
}

/// Записать manifest в `<root>/manifest` (tmp+rename).
pub fn write_manifest(root: &Path, m: &ManifestFile) -> Result<PathBuf> {
    let path = manifest_path(root);
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, m.to_json()?).with_context(|| format!("write tmp manifest {}", tmp.display()))?;
    fs::rename(&tmp, &path)
        .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::META_KEY_EPOCH;

    fn temp_root(name: &str) -> PathBuf {
        let t = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let p = std::env::temp_dir().join(format!("gsfa-man-{}-{}-{}", name, std::process::id(), t));
        fs::create_dir_all(&p).unwrap();
        p
    }

    #[test]
    fn write_then_open() {
        let root = temp_root("rt");
        let meta = IndexMeta::new().with(META_KEY_EPOCH, "7");
        write_manifest(&root, &ManifestFile::new(3, meta.clone())).unwrap();
        let m = Manifest::open_in(&root).unwrap();
        assert_eq!(m.version(), 3);
        assert_eq!(m.meta(), meta);
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn rejects_unknown_format_version() {
        let root = temp_root("ver");
        fs::write(
            manifest_path(&root),
            r#"{"manifest_version": 9, "index_version": 1, "meta": []}"#,
        )
        .unwrap();
        let err = Manifest::open_in(&root).unwrap_err();
        assert!(format!("{err:#}").contains("unsupported manifest version"));
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn meta_defaults_to_empty() {
        let root = temp_root("nometa");
        fs::write(
            manifest_path(&root),
            r#"{"manifest_version": 1, "index_version": 2}"#,
        )
        .unwrap();
        let m = Manifest::open_in(&root).unwrap();
        assert!(m.meta().is_empty());
        let _ = fs::remove_dir_all(&root);
    }
}
