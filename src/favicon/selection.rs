//! # 源图选择策略
//!
//! 对每个目标尺寸决定从哪张上传图生成：
//! - 有声明尺寸恰好相等的上传图：精确匹配，不做缩放
//! - 否则取声明尺寸最大的上传图（可能需要放大）
//! - 单图模式下唯一的源图总被选中，只有原生尺寸等于目标时才算精确匹配

use std::collections::BTreeMap;

use super::plan::TargetSpec;
use super::{FaviconError, SourceImage, SourceSet};

/// 源图在本次构建中的身份，用于缩放结果的记忆化。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceKey {
    Single,
    Upload(u32),
}

/// 选择结果。
#[derive(Debug, Clone, Copy)]
pub struct SourceChoice<'a> {
    pub key: SourceKey,
    pub image: &'a SourceImage,
    pub is_exact_match: bool,
}

/// 按尺寸上传模式的选择。
///
/// `BTreeMap` 的键唯一且有序，因此“最大尺寸”不存在并列。
pub fn select_source<'a>(
    target: &TargetSpec,
    uploads: &'a BTreeMap<u32, SourceImage>,
) -> Result<SourceChoice<'a>, FaviconError> {
    if let Some(image) = uploads.get(&target.pixel_size) {
        return Ok(SourceChoice {
            key: SourceKey::Upload(target.pixel_size),
            image,
            is_exact_match: true,
        });
    }

    let (&size, image) = uploads
        .last_key_value()
        .ok_or_else(|| FaviconError::NoSource("未提供任何按尺寸上传的图片".to_string()))?;

    Ok(SourceChoice {
        key: SourceKey::Upload(size),
        image,
        is_exact_match: false,
    })
}

impl SourceSet {
    /// 为目标挑选源图（两种模式的统一入口）。
    pub fn select(&self, target: &TargetSpec) -> Result<SourceChoice<'_>, FaviconError> {
        match self {
            Self::Single(image) => Ok(SourceChoice {
                key: SourceKey::Single,
                image,
                is_exact_match: image.width() == target.pixel_size
                    && image.height() == target.pixel_size,
            }),
            Self::PerSize(uploads) => select_source(target, uploads),
        }
    }
}
