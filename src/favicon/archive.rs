//! # 产物包与归档模块
//!
//! ## 设计思路
//!
//! `Bundle` 是“归档相对路径 → 字节”的有序映射，构建一次、序列化一次，之后不再修改。
//! 序列化为 ZIP 时固定时间戳与权限，同样的输入永远得到逐字节相同的归档。

use std::collections::HashSet;
use std::io::{Cursor, Write};

use bytes::Bytes;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use super::{ArchiveCompression, FaviconError};

/// 下载时建议使用的归档文件名。
pub const DEFAULT_ARCHIVE_NAME: &str = "favfavicon.zip";

/// 产物包中的单个文件。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleEntry {
    pub path: String,
    pub bytes: Bytes,
}

/// 最终产物包：按写入顺序排列的文件 + 已序列化的 ZIP。
#[derive(Debug, Clone)]
pub struct Bundle {
    entries: Vec<BundleEntry>,
    archive: Vec<u8>,
}

impl Bundle {
    pub(crate) fn new(entries: Vec<BundleEntry>, archive: Vec<u8>) -> Self {
        Self { entries, archive }
    }

    pub fn entries(&self) -> &[BundleEntry] {
        &self.entries
    }

    pub fn get(&self, path: &str) -> Option<&Bytes> {
        self.entries
            .iter()
            .find(|entry| entry.path == path)
            .map(|entry| &entry.bytes)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.path.as_str())
    }

    /// ZIP 归档字节。
    pub fn archive_bytes(&self) -> &[u8] {
        &self.archive
    }

    pub fn into_archive(self) -> Vec<u8> {
        self.archive
    }
}

/// 将条目按顺序写入 ZIP。
///
/// 目录条目（如 `apple/`）在其第一个文件之前写入。
pub(crate) fn write_zip(
    entries: &[BundleEntry],
    compression: ArchiveCompression,
) -> Result<Vec<u8>, FaviconError> {
    let method = match compression {
        ArchiveCompression::Deflated => CompressionMethod::Deflated,
        ArchiveCompression::Stored => CompressionMethod::Stored,
    };
    let file_options = SimpleFileOptions::default()
        .compression_method(method)
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644);
    let dir_options = SimpleFileOptions::default()
        .last_modified_time(DateTime::default())
        .unix_permissions(0o755);

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let mut written_dirs = HashSet::new();
    let mut seen_paths = HashSet::new();

    for entry in entries {
        if !seen_paths.insert(entry.path.as_str()) {
            return Err(FaviconError::Archive(format!("重复的归档路径：{}", entry.path)));
        }

        if let Some((dir, _)) = entry.path.rsplit_once('/') {
            if written_dirs.insert(dir.to_string()) {
                zip.add_directory(format!("{dir}/"), dir_options)?;
            }
        }

        zip.start_file(entry.path.as_str(), file_options)?;
        zip.write_all(&entry.bytes)
            .map_err(|e| FaviconError::Archive(format!("写入 {} 失败：{}", entry.path, e)))?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}
