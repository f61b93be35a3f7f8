//! # 平台清单模块
//!
//! 纯字符串生成：输入是已经算好的元数据与产物路径，不涉及任何图像处理。
//!
//! - Android / PWA：`android/manifest.json`
//! - Windows 磁贴：`windows/browserconfig.xml`

use serde::Serialize;

use super::plan::{PlatformTag, TargetSpec};
use super::{FaviconError, PlatformOptions};

pub const ANDROID_MANIFEST_PATH: &str = "android/manifest.json";
pub const WINDOWS_BROWSERCONFIG_PATH: &str = "windows/browserconfig.xml";

const BACKGROUND_COLOR: &str = "#ffffff";
const DISPLAY_MODE: &str = "standalone";
/// 作为 `<square{N}x{N}logo>` 输出的磁贴尺寸。
const WINDOWS_SQUARE_SIZES: [u32; 3] = [70, 150, 310];
/// 旧版 `TileImage` 引用的尺寸。
const WINDOWS_TILE_IMAGE_SIZE: u32 = 144;

#[derive(Serialize)]
struct WebManifest<'a> {
    name: &'a str,
    short_name: &'a str,
    icons: Vec<ManifestIcon<'a>>,
    theme_color: &'a str,
    background_color: &'static str,
    display: &'static str,
}

#[derive(Serialize)]
struct ManifestIcon<'a> {
    src: &'a str,
    sizes: String,
    #[serde(rename = "type")]
    mime: &'static str,
}

/// 生成 Android `manifest.json`（2 空格缩进）。
///
/// `icons` 中每一项对应一个 Android 平台产物。
pub fn android_manifest<'a>(
    options: &PlatformOptions,
    targets: impl IntoIterator<Item = &'a TargetSpec>,
) -> Result<String, FaviconError> {
    let icons = targets
        .into_iter()
        .filter(|t| t.platform == PlatformTag::Android)
        .map(|t| ManifestIcon {
            src: &t.destination_path,
            sizes: format!("{0}x{0}", t.pixel_size),
            mime: "image/png",
        })
        .collect();

    let manifest = WebManifest {
        name: &options.app_name,
        short_name: &options.short_name,
        icons,
        theme_color: options.theme_color.trim(),
        background_color: BACKGROUND_COLOR,
        display: DISPLAY_MODE,
    };

    serde_json::to_string_pretty(&manifest)
        .map_err(|e| FaviconError::Encode(format!("manifest.json 序列化失败：{}", e)))
}

/// 生成 Windows `browserconfig.xml`。
pub fn windows_browserconfig<'a>(
    options: &PlatformOptions,
    targets: impl IntoIterator<Item = &'a TargetSpec>,
) -> String {
    let mut squares = String::new();
    let mut tile_image = String::new();

    for target in targets
        .into_iter()
        .filter(|t| t.platform == PlatformTag::Windows)
    {
        let size = target.pixel_size;
        let src = xml_escape(&target.destination_path);
        if WINDOWS_SQUARE_SIZES.contains(&size) {
            squares.push_str(&format!("<square{size}x{size}logo src=\"{src}\"/>"));
        } else if size == WINDOWS_TILE_IMAGE_SIZE {
            tile_image = format!("<TileImage src=\"{src}\"/>");
        }
    }

    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?><browserconfig><msapplication><tile>{}{}<TileColor>{}</TileColor></tile></msapplication></browserconfig>",
        squares,
        tile_image,
        xml_escape(options.theme_color.trim())
    )
}

fn xml_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}
