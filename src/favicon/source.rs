//! # 数据源与中间模型
//!
//! ## 设计思路
//!
//! 将“外部输入类型”和“流水线中间结果”解耦：
//! - `SourceImage` 表示已加载、只读过图片头的源图字节
//! - `SourceSet` 表示单图 / 按尺寸上传两种模式
//! - `GeneratedAsset` 表示某个目标的最终 PNG 字节
//!
//! 源字节使用 `bytes::Bytes` 持有，并发缩放任务之间共享时只增加引用计数。

use std::collections::BTreeMap;
use std::io::Cursor;

use bytes::Bytes;
use image::{ImageFormat, ImageReader};

use super::plan::TargetSpec;
use super::{FaviconError, PlatformOptions};

/// 已加载的源图片：原始字节 + 图片头中的像素尺寸。
///
/// 只在单次构建期间被持有。
#[derive(Debug, Clone)]
pub struct SourceImage {
    bytes: Bytes,
    width: u32,
    height: u32,
    format: ImageFormat,
}

impl SourceImage {
    /// 识别格式并读取图片头尺寸，不做完整解码。
    ///
    /// # 示例
    /// ```rust,ignore
    /// use favicon_bundler::favicon::SourceImage;
    ///
    /// let source = SourceImage::from_bytes(std::fs::read("logo.png")?)?;
    /// assert!(source.width() > 0);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Result<Self, FaviconError> {
        let bytes = bytes.into();
        let reader = ImageReader::new(Cursor::new(bytes.as_ref()))
            .with_guessed_format()
            .map_err(|e| FaviconError::Decode(format!("无法识别图片格式：{}", e)))?;
        let format = reader
            .format()
            .ok_or_else(|| FaviconError::Decode("无法识别图片格式".to_string()))?;
        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| FaviconError::Decode(format!("无法读取图片尺寸：{}", e)))?;

        if width == 0 || height == 0 {
            return Err(FaviconError::Decode(format!(
                "图片尺寸非法：{}x{}",
                width, height
            )));
        }

        Ok(Self {
            bytes,
            width,
            height,
            format,
        })
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// 源图已经是指定边长的正方形 PNG，可原样透传。
    pub fn is_png_of_size(&self, size: u32) -> bool {
        self.format == ImageFormat::Png && self.width == size && self.height == size
    }
}

/// 生成模式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationMode {
    /// 一张源图派生全部尺寸。
    SingleSource,
    /// 按尺寸上传，缺失尺寸从最大上传图缩放。
    PerSizeSource,
}

impl GenerationMode {
    /// 解析表单模式值，兼容旧的 `simple` / `advanced`。
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(mode: &str) -> Result<Self, FaviconError> {
        match mode.trim().to_lowercase().as_str() {
            "single-source" | "single" | "simple" => Ok(Self::SingleSource),
            "per-size-source" | "per-size" | "advanced" => Ok(Self::PerSizeSource),
            other => Err(FaviconError::InvalidOptions(format!(
                "未知生成模式：{}（可选：single-source / per-size-source）",
                other
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SingleSource => "single-source",
            Self::PerSizeSource => "per-size-source",
        }
    }
}

/// 一次构建的全部源图。
#[derive(Debug, Clone)]
pub enum SourceSet {
    Single(SourceImage),
    /// 以声明尺寸为键；`BTreeMap` 保证遍历顺序确定。
    PerSize(BTreeMap<u32, SourceImage>),
}

impl SourceSet {
    pub fn mode(&self) -> GenerationMode {
        match self {
            Self::Single(_) => GenerationMode::SingleSource,
            Self::PerSize(_) => GenerationMode::PerSizeSource,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::PerSize(uploads) => uploads.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 一次构建请求。
#[derive(Debug, Clone)]
pub struct BundleRequest {
    pub sources: SourceSet,
    pub options: PlatformOptions,
}

impl BundleRequest {
    pub fn single(source: SourceImage, options: PlatformOptions) -> Self {
        Self {
            sources: SourceSet::Single(source),
            options,
        }
    }

    pub fn per_size(uploads: BTreeMap<u32, SourceImage>, options: PlatformOptions) -> Self {
        Self {
            sources: SourceSet::PerSize(uploads),
            options,
        }
    }
}

/// 某个目标的最终 PNG 产物，创建后不可变。
#[derive(Debug, Clone)]
pub struct GeneratedAsset {
    pub target: TargetSpec,
    pub png: Bytes,
}
