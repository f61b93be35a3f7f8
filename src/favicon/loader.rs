//! # 源图加载模块
//!
//! ## 设计思路
//!
//! 调用方（表单上传、命令行）交来的输入形态各异：原始字节、Base64 / Data URL、本地路径。
//! 本模块把它们统一转换为 `SourceImage`，并在进入流水线前完成体积、签名与像素上限校验。
//!
//! ## 实现思路
//!
//! 1. 先按体积上限快速拒绝（Base64 在解码前估算上限）
//! 2. 用 `infer` 检查文件签名必须是图片
//! 3. 读取图片头尺寸，按像素 / 内存上限拒绝
//!
//! 完整解码留给缩放阶段。

use std::path::Path;

use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;

use super::resample::validate_dimensions;
use super::{BundleConfig, FaviconError, SourceImage};

/// 从内存字节加载源图。
pub fn load_from_bytes(
    bytes: impl Into<Bytes>,
    config: &BundleConfig,
) -> Result<SourceImage, FaviconError> {
    let bytes = bytes.into();
    check_source_size(bytes.len() as u64, config, "上传图片")?;
    validate_image_signature(&bytes)?;

    let source = SourceImage::from_bytes(bytes)?;
    validate_dimensions(config, source.width(), source.height())?;
    Ok(source)
}

/// 从 Base64 字符串（支持 Data URL 与纯 Base64）加载源图。
pub fn load_from_base64(data: &str, config: &BundleConfig) -> Result<SourceImage, FaviconError> {
    log::debug!("📝 开始处理 base64 源图");
    let bytes = parse_base64_with_limit(data, config.max_source_bytes)?;
    load_from_bytes(bytes, config)
}

/// 从本地路径加载源图。
pub fn load_from_file(
    path: impl AsRef<Path>,
    config: &BundleConfig,
) -> Result<SourceImage, FaviconError> {
    let path = path.as_ref();
    log::info!("📁 开始读取源图 - 路径: {}", path.display());

    if !path.exists() {
        return Err(FaviconError::FileSystem(format!(
            "文件不存在：{}",
            path.display()
        )));
    }

    let metadata = std::fs::metadata(path)
        .map_err(|e| FaviconError::FileSystem(format!("无法读取文件信息：{}", e)))?;
    check_source_size(metadata.len(), config, "文件")?;

    let bytes = std::fs::read(path)
        .map_err(|e| FaviconError::FileSystem(format!("无法读取图片文件：{}", e)))?;
    load_from_bytes(bytes, config)
}

fn check_source_size(len: u64, config: &BundleConfig, what: &str) -> Result<(), FaviconError> {
    if len > config.max_source_bytes {
        return Err(FaviconError::ResourceLimit(format!(
            "{}过大：{:.2} MB（限制：{:.2} MB）",
            what,
            len as f64 / 1024.0 / 1024.0,
            config.max_source_bytes as f64 / 1024.0 / 1024.0
        )));
    }
    Ok(())
}

fn estimate_base64_decoded_upper_bound_len(base64_data: &str) -> Result<u64, FaviconError> {
    let len = base64_data.trim().len() as u64;
    let groups = len
        .checked_add(3)
        .ok_or_else(|| FaviconError::ResourceLimit("Base64 输入长度溢出".to_string()))?
        / 4;

    groups
        .checked_mul(3)
        .ok_or_else(|| FaviconError::ResourceLimit("Base64 解码体积估算溢出".to_string()))
}

fn parse_base64_with_limit(data: &str, max_source_bytes: u64) -> Result<Vec<u8>, FaviconError> {
    let normalized = data.trim();

    let payload = if normalized.starts_with("data:") {
        let base64_start = normalized
            .find(";base64,")
            .ok_or_else(|| FaviconError::Decode("Data URL 缺少 base64 标记".to_string()))?;
        &normalized[base64_start + 8..]
    } else {
        normalized
    };

    let estimated_len = estimate_base64_decoded_upper_bound_len(payload)?;
    if estimated_len > max_source_bytes {
        return Err(FaviconError::ResourceLimit(format!(
            "Base64 预计解码体积过大：{:.2} MB（限制：{:.2} MB）",
            estimated_len as f64 / 1024.0 / 1024.0,
            max_source_bytes as f64 / 1024.0 / 1024.0
        )));
    }

    general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| FaviconError::Decode(format!("Base64 解码失败：{}", e)))
}

/// 通过文件签名（magic bytes）校验输入是否为图片。
fn validate_image_signature(bytes: &[u8]) -> Result<(), FaviconError> {
    if bytes.is_empty() {
        return Err(FaviconError::Decode("图片内容为空".to_string()));
    }

    let kind = infer::get(bytes)
        .ok_or_else(|| FaviconError::Decode("无法识别图片类型".to_string()))?;

    if kind.matcher_type() != infer::MatcherType::Image {
        return Err(FaviconError::Decode(format!(
            "文件签名不是图片类型：{}",
            kind.mime_type()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut buffer = Vec::new();
        DynamicImage::ImageRgba8(RgbaImage::new(width, height))
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .expect("failed to encode test image");
        buffer
    }

    #[test]
    fn loads_data_url() {
        let encoded = general_purpose::STANDARD.encode(png_bytes(24, 24));
        let data_url = format!("data:image/png;base64,{}", encoded);

        let source = load_from_base64(&data_url, &BundleConfig::default()).unwrap();
        assert_eq!((source.width(), source.height()), (24, 24));
    }

    #[test]
    fn rejects_non_image_payload() {
        let result = load_from_base64("SGVsbG8=", &BundleConfig::default());
        assert!(matches!(result, Err(FaviconError::Decode(_))));
    }

    #[test]
    fn rejects_large_base64_before_decode() {
        let huge = "A".repeat(1024 * 1024);
        let result = parse_base64_with_limit(&huge, 32);
        assert!(matches!(result, Err(FaviconError::ResourceLimit(_))));
    }

    #[test]
    fn rejects_too_many_pixels_from_header() {
        let mut config = BundleConfig::default();
        config.max_decoded_pixels = 100;
        let result = load_from_bytes(png_bytes(20, 20), &config);
        assert!(matches!(result, Err(FaviconError::ResourceLimit(_))));
    }

    #[test]
    fn missing_file_is_filesystem_error() {
        let result = load_from_file("/definitely/not/here.png", &BundleConfig::default());
        assert!(matches!(result, Err(FaviconError::FileSystem(_))));
    }

    #[test]
    fn loads_from_file() {
        let path = std::env::temp_dir().join(format!("favicon-loader-{}.png", std::process::id()));
        std::fs::write(&path, png_bytes(8, 8)).unwrap();

        let source = load_from_file(&path, &BundleConfig::default()).unwrap();
        assert_eq!(source.width(), 8);

        let _ = std::fs::remove_file(&path);
    }
}
