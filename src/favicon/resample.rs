//! # 解码与缩放流水线模块
//!
//! ## 设计思路
//!
//! 把“源字节 → 图像 → 正方形透明画布 → PNG”的过程集中管理，并在完整解码之前做像素上限控制。
//! 缩放采用 contain 语义：保持宽高比完整放入 `N×N` 画布，居中，其余区域填充全透明像素，
//! 永不裁剪。源图比目标小时同样放大，画质损失可以接受。
//!
//! ## 实现思路
//!
//! 1. 按像素 / 内存上限快速拒绝
//! 2. 完整解码为 RGBA，截断或损坏的源图在这里失败
//! 3. 源图本身就是目标尺寸的正方形 PNG 时原样透传
//! 4. `fast_image_resize` 缩放，失败时回退 `image::imageops`
//! 5. 贴到透明画布中央并编码为带 alpha 的 PNG

use std::io::Cursor;

use bytes::Bytes;
use fast_image_resize as fr;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageBuffer, ImageFormat, Rgba, RgbaImage};

use super::{BundleConfig, FaviconError, SourceImage};

/// 将源图缩放为 `target_size × target_size` 的 PNG。
///
/// # 示例
/// ```rust,ignore
/// use favicon_bundler::favicon::{resample, BundleConfig, SourceImage};
///
/// let source = SourceImage::from_bytes(std::fs::read("logo.png")?)?;
/// let png = resample(&source, 32, &BundleConfig::default())?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn resample(
    source: &SourceImage,
    target_size: u32,
    config: &BundleConfig,
) -> Result<Bytes, FaviconError> {
    if target_size == 0 {
        return Err(FaviconError::InvalidOptions("目标尺寸不能为 0".to_string()));
    }

    // 透传前也要完整解码，只读文件头无法发现截断的数据块
    let decoded = decode(source, config)?;
    if source.is_png_of_size(target_size) {
        return Ok(source.bytes().clone());
    }

    if decoded.dimensions() == (target_size, target_size) {
        return encode_png(decoded.to_rgba8());
    }

    let canvas = contain_on_transparent_canvas(&decoded, target_size, config.resize_filter)?;
    encode_png(canvas)
}

/// 精确匹配的上传图：不做任何缩放。
///
/// 已是目标尺寸的 PNG 原样返回；其它格式只做无损的 PNG 重编码。
/// 声明尺寸与实际像素不符时无法“精确”使用，只能回退到 contain 缩放。
pub fn prepare_exact(
    source: &SourceImage,
    target_size: u32,
    config: &BundleConfig,
) -> Result<Bytes, FaviconError> {
    if source.width() != target_size || source.height() != target_size {
        log::warn!(
            "⚠️ 上传图声明尺寸 {}x{} 与实际像素 {}x{} 不符，改为缩放",
            target_size,
            target_size,
            source.width(),
            source.height()
        );
    }
    resample(source, target_size, config)
}

/// 校验像素数量与解码内存是否超过配置上限。
pub(crate) fn validate_dimensions(
    config: &BundleConfig,
    width: u32,
    height: u32,
) -> Result<(), FaviconError> {
    let pixels = (width as u64)
        .checked_mul(height as u64)
        .ok_or_else(|| FaviconError::ResourceLimit("图片像素数溢出".to_string()))?;

    if pixels > config.max_decoded_pixels {
        return Err(FaviconError::ResourceLimit(format!(
            "图片像素过大：{} 像素（限制：{} 像素）",
            pixels, config.max_decoded_pixels
        )));
    }

    let estimated = pixels
        .checked_mul(4)
        .ok_or_else(|| FaviconError::ResourceLimit("图片解码内存估算溢出".to_string()))?;

    if estimated > config.max_decoded_bytes {
        return Err(FaviconError::ResourceLimit(format!(
            "图片解码预计内存过大：{:.2} MB（限制：{:.2} MB）",
            estimated as f64 / 1024.0 / 1024.0,
            config.max_decoded_bytes as f64 / 1024.0 / 1024.0
        )));
    }

    Ok(())
}

fn decode(source: &SourceImage, config: &BundleConfig) -> Result<DynamicImage, FaviconError> {
    validate_dimensions(config, source.width(), source.height())?;

    image::load_from_memory_with_format(source.bytes(), source.format())
        .map_err(|e| FaviconError::Decode(format!("图片解码失败：{}", e)))
}

/// contain 缩放后的内容尺寸（至少 1 像素，不超过画布）。
pub(crate) fn contain_dimensions(width: u32, height: u32, target_size: u32) -> (u32, u32) {
    let scale = (target_size as f64 / width as f64).min(target_size as f64 / height as f64);
    let fit = |side: u32| ((side as f64 * scale).round() as u32).clamp(1, target_size);
    (fit(width), fit(height))
}

fn contain_on_transparent_canvas(
    image: &DynamicImage,
    target_size: u32,
    filter: FilterType,
) -> Result<RgbaImage, FaviconError> {
    let (width, height) = image.dimensions();
    let (content_width, content_height) = contain_dimensions(width, height, target_size);

    let content = match resize_with_fast_image_resize(image, content_width, content_height, filter)
    {
        Ok(resized) => resized,
        Err(err) => {
            log::warn!("⚠️ fast_image_resize 缩放失败，回退 image::imageops::resize：{}", err);
            image::imageops::resize(&image.to_rgba8(), content_width, content_height, filter)
        }
    };

    let mut canvas = RgbaImage::from_pixel(target_size, target_size, Rgba([0, 0, 0, 0]));
    let x = (target_size - content_width) / 2;
    let y = (target_size - content_height) / 2;
    image::imageops::replace(&mut canvas, &content, x as i64, y as i64);

    Ok(canvas)
}

fn resize_with_fast_image_resize(
    image: &DynamicImage,
    target_width: u32,
    target_height: u32,
    filter: FilterType,
) -> Result<RgbaImage, FaviconError> {
    let src = image.to_rgba8();
    let (src_width, src_height) = src.dimensions();

    let src_image =
        fr::images::Image::from_vec_u8(src_width, src_height, src.into_raw(), fr::PixelType::U8x4)
            .map_err(|e| FaviconError::Decode(format!("构建源图像缓冲失败：{}", e)))?;

    let mut dst_image = fr::images::Image::new(target_width, target_height, fr::PixelType::U8x4);

    let mut resizer = fr::Resizer::new();
    let options =
        fr::ResizeOptions::new().resize_alg(fr::ResizeAlg::Convolution(to_fast_filter(filter)));

    resizer
        .resize(&src_image, &mut dst_image, Some(&options))
        .map_err(|e| FaviconError::Decode(format!("fast_image_resize 执行失败：{}", e)))?;

    ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(target_width, target_height, dst_image.into_vec())
        .ok_or_else(|| FaviconError::Decode("fast_image_resize 输出缓冲长度异常".to_string()))
}

fn to_fast_filter(filter: FilterType) -> fr::FilterType {
    match filter {
        FilterType::Nearest => fr::FilterType::Box,
        FilterType::Triangle => fr::FilterType::Bilinear,
        FilterType::CatmullRom => fr::FilterType::CatmullRom,
        FilterType::Gaussian => fr::FilterType::Mitchell,
        FilterType::Lanczos3 => fr::FilterType::Lanczos3,
    }
}

/// 编码为带 alpha 通道的 PNG。
pub(crate) fn encode_png(image: RgbaImage) -> Result<Bytes, FaviconError> {
    let mut buffer = Vec::new();
    DynamicImage::ImageRgba8(image)
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .map_err(|e| FaviconError::Encode(format!("PNG 编码失败：{}", e)))?;
    Ok(Bytes::from(buffer))
}
