//! # ICO 容器编码模块
//!
//! ## 设计思路
//!
//! 把一组 PNG 按输入顺序打包为经典多图 ICO。PNG 负载原样存放，不转 BMP。
//!
//! ```text
//! ICONDIR        6 字节   reserved=0 | type=1 | count
//! ICONDIRENTRY  16 字节 × count
//!                width | height | colors=0 | reserved=0 | planes=1 | bpp=32 | size | offset
//! payload...     按目录顺序紧密拼接
//! ```
//!
//! 宽高字段只有 1 字节：256 必须写成 0，这是损坏 ICO 最常见的来源。
//! 第一个负载紧跟最后一个目录项，其后每个偏移累加上一个负载的字节数。

use std::io::Cursor;

use bytes::Bytes;
use image::{ImageFormat, ImageReader};

use super::FaviconError;
use super::plan::ICO_MAX_SIZE;
use super::resample::encode_png;

const ICONDIR_LEN: usize = 6;
const ICONDIRENTRY_LEN: usize = 16;
const ICON_RESOURCE_TYPE: u16 = 1;

/// ICO 目录项（宽高为实际像素值，256 不做回绕）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IcoDirEntry {
    pub width: u32,
    pub height: u32,
    pub bits_per_pixel: u16,
    pub size: u32,
    pub offset: u32,
}

struct IcoFrame {
    width: u32,
    height: u32,
    png: Bytes,
}

/// 将 PNG 序列编码为多图 ICO。
///
/// 输入为空或任一条目无法解码时返回 `Encode` 错误；目录顺序与输入顺序一致。
///
/// # 示例
/// ```rust,ignore
/// use favicon_bundler::favicon::encode_ico;
///
/// let ico = encode_ico([png16, png32, png256])?;
/// assert_eq!(&ico[..4], &[0, 0, 1, 0]);
/// # Ok::<(), favicon_bundler::favicon::FaviconError>(())
/// ```
pub fn encode_ico<I, B>(images: I) -> Result<Vec<u8>, FaviconError>
where
    I: IntoIterator<Item = B>,
    B: AsRef<[u8]>,
{
    let frames = images
        .into_iter()
        .enumerate()
        .map(|(index, bytes)| to_frame(index, bytes.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;

    if frames.is_empty() {
        return Err(FaviconError::Encode("ICO 候选列表为空".to_string()));
    }

    let count = u16::try_from(frames.len())
        .map_err(|_| FaviconError::Encode(format!("ICO 条目过多：{}", frames.len())))?;

    let payload_len: usize = frames.iter().map(|f| f.png.len()).sum();
    let header_len = ICONDIR_LEN + ICONDIRENTRY_LEN * frames.len();
    let mut out = Vec::with_capacity(header_len + payload_len);

    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&ICON_RESOURCE_TYPE.to_le_bytes());
    out.extend_from_slice(&count.to_le_bytes());

    let mut offset = header_len;
    for frame in &frames {
        let size = u32::try_from(frame.png.len())
            .map_err(|_| FaviconError::Encode("ICO 负载超过 4GB".to_string()))?;
        let offset_field = u32::try_from(offset)
            .map_err(|_| FaviconError::Encode("ICO 偏移超过 4GB".to_string()))?;

        out.push(dimension_byte(frame.width));
        out.push(dimension_byte(frame.height));
        out.push(0); // 调色板颜色数
        out.push(0);
        out.extend_from_slice(&1u16.to_le_bytes()); // planes
        out.extend_from_slice(&32u16.to_le_bytes()); // bpp
        out.extend_from_slice(&size.to_le_bytes());
        out.extend_from_slice(&offset_field.to_le_bytes());

        offset += frame.png.len();
    }

    for frame in &frames {
        out.extend_from_slice(&frame.png);
    }

    log::debug!("🧊 ICO 编码完成：{} 帧，{} 字节", frames.len(), out.len());
    Ok(out)
}

/// 读取 ICO 目录（仅解析头部，不解码负载）。
pub fn decode_ico_directory(ico: &[u8]) -> Result<Vec<IcoDirEntry>, FaviconError> {
    let read_u16 = |at: usize| -> Result<u16, FaviconError> {
        ico.get(at..at + 2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]))
            .ok_or_else(|| FaviconError::Decode("ICO 数据被截断".to_string()))
    };
    let read_u32 = |at: usize| -> Result<u32, FaviconError> {
        ico.get(at..at + 4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .ok_or_else(|| FaviconError::Decode("ICO 数据被截断".to_string()))
    };

    if read_u16(0)? != 0 || read_u16(2)? != ICON_RESOURCE_TYPE {
        return Err(FaviconError::Decode("不是 ICO 文件头".to_string()));
    }

    let count = read_u16(4)? as usize;
    let mut entries = Vec::with_capacity(count);
    for index in 0..count {
        let base = ICONDIR_LEN + index * ICONDIRENTRY_LEN;
        let width = *ico
            .get(base)
            .ok_or_else(|| FaviconError::Decode("ICO 数据被截断".to_string()))?;
        let height = *ico
            .get(base + 1)
            .ok_or_else(|| FaviconError::Decode("ICO 数据被截断".to_string()))?;
        let entry = IcoDirEntry {
            width: if width == 0 { 256 } else { width as u32 },
            height: if height == 0 { 256 } else { height as u32 },
            bits_per_pixel: read_u16(base + 6)?,
            size: read_u32(base + 8)?,
            offset: read_u32(base + 12)?,
        };

        let end = entry.offset as usize + entry.size as usize;
        if end > ico.len() {
            return Err(FaviconError::Decode(format!(
                "ICO 第 {} 帧越界：{} > {}",
                index,
                end,
                ico.len()
            )));
        }
        entries.push(entry);
    }

    Ok(entries)
}

fn dimension_byte(side: u32) -> u8 {
    if side >= ICO_MAX_SIZE { 0 } else { side as u8 }
}

fn to_frame(index: usize, bytes: &[u8]) -> Result<IcoFrame, FaviconError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| FaviconError::Encode(format!("ICO 第 {} 帧无法识别：{}", index, e)))?;
    let format = reader
        .format()
        .ok_or_else(|| FaviconError::Encode(format!("ICO 第 {} 帧格式未知", index)))?;

    // PNG 帧原样嵌入，但仍需完整解码一次以拒绝截断的数据
    let decoded = reader
        .decode()
        .map_err(|e| FaviconError::Encode(format!("ICO 第 {} 帧解码失败：{}", index, e)))?;
    let (width, height) = (decoded.width(), decoded.height());
    let png = if format == ImageFormat::Png {
        Bytes::copy_from_slice(bytes)
    } else {
        encode_png(decoded.to_rgba8())?
    };

    if width == 0 || height == 0 || width > ICO_MAX_SIZE || height > ICO_MAX_SIZE {
        return Err(FaviconError::Encode(format!(
            "ICO 第 {} 帧尺寸 {}x{} 超出 1~{} 范围",
            index, width, height, ICO_MAX_SIZE
        )));
    }

    Ok(IcoFrame { width, height, png })
}
