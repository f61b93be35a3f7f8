//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到 `BundleConfig`，保证运行时行为可观测、可调整、可测试。
//! 缩放档位（quality / balanced / speed）作为高层语义，映射到底层滤镜。
//!
//! 调用方每次构建提供的 `PlatformOptions` 与进程级的 `BundleConfig` 分开：
//! 前者描述“要什么”，后者描述“怎么做”。
//!
//! ## 实现思路
//!
//! - `Default` 提供生产可用的配置（核心尺寸基线不含 512）。
//! - `ResizeProfile` 负责档位字符串解析与反向输出。
//! - `PlatformOptions::validate` 在规划阶段之前拦截结构性非法参数。

use image::imageops::FilterType;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use super::FaviconError;
use super::plan::{DEFAULT_CORE_SIZES, MAX_TARGET_SIZE, PWA_ONLY_SIZE};

/// ZIP 条目压缩方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveCompression {
    Deflated,
    Stored,
}

/// 图标构建配置。
///
/// 字段覆盖了加载限制、缩放、并发与归档四个阶段。
#[derive(Debug, Clone)]
pub struct BundleConfig {
    /// 核心 favicon 尺寸基线（始终生成，且 ≤256 的尺寸进入 ICO）。
    pub core_sizes: Vec<u32>,
    /// 是否把 512 作为核心尺寸输出 `favicon-512x512.png`（永远不进入 ICO）。
    pub include_512_in_core: bool,
    /// 缩放滤镜策略。
    pub resize_filter: FilterType,
    /// 单张源图片允许的最大字节数。
    pub max_source_bytes: u64,
    /// 解码后的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 解码阶段允许的预计内存上限（按 RGBA 估算，字节）。
    pub max_decoded_bytes: u64,
    /// 同时运行的缩放任务上限。
    pub max_parallel_jobs: usize,
    /// 归档压缩方式。
    pub compression: ArchiveCompression,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            core_sizes: DEFAULT_CORE_SIZES.to_vec(),
            include_512_in_core: false,
            resize_filter: FilterType::Lanczos3,
            max_source_bytes: 50 * 1024 * 1024,
            max_decoded_pixels: 40_000_000,
            max_decoded_bytes: 160 * 1024 * 1024,
            max_parallel_jobs: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            compression: ArchiveCompression::Deflated,
        }
    }
}

impl BundleConfig {
    /// 本次构建实际使用的核心尺寸（按配置顺序，去重）。
    pub fn effective_core_sizes(&self) -> Vec<u32> {
        let mut sizes: Vec<u32> = Vec::with_capacity(self.core_sizes.len() + 1);
        for &size in &self.core_sizes {
            if !sizes.contains(&size) {
                sizes.push(size);
            }
        }
        if self.include_512_in_core && !sizes.contains(&PWA_ONLY_SIZE) {
            sizes.push(PWA_ONLY_SIZE);
        }
        sizes
    }

    pub(crate) fn validate(&self) -> Result<(), FaviconError> {
        if let Some(&bad) = self
            .core_sizes
            .iter()
            .find(|&&size| size == 0 || size > MAX_TARGET_SIZE)
        {
            return Err(FaviconError::InvalidOptions(format!(
                "核心尺寸非法：{}（允许 1~{}）",
                bad, MAX_TARGET_SIZE
            )));
        }
        if self.max_parallel_jobs == 0 {
            return Err(FaviconError::InvalidOptions(
                "max_parallel_jobs 不能为 0".to_string(),
            ));
        }
        Ok(())
    }

    /// 基于当前滤镜反推缩放档位。
    pub fn infer_resize_profile(&self) -> ResizeProfile {
        match self.resize_filter {
            FilterType::Lanczos3 | FilterType::Gaussian => ResizeProfile::Quality,
            FilterType::CatmullRom => ResizeProfile::Balanced,
            FilterType::Triangle | FilterType::Nearest => ResizeProfile::Speed,
        }
    }

    /// 应用指定缩放档位到实际参数。
    pub fn apply_resize_profile(&mut self, profile: ResizeProfile) {
        self.resize_filter = match profile {
            ResizeProfile::Quality => FilterType::Lanczos3,
            ResizeProfile::Balanced => FilterType::CatmullRom,
            ResizeProfile::Speed => FilterType::Triangle,
        };
    }
}

/// 缩放档位（面向产品/用户语义）。
///
/// - `Quality`：Lanczos3，小尺寸图标最清晰
/// - `Balanced`：CatmullRom
/// - `Speed`：双线性，优先构建速度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeProfile {
    Quality,
    Balanced,
    Speed,
}

impl ResizeProfile {
    /// 从外部字符串解析档位。
    ///
    /// # 示例
    /// ```rust
    /// use favicon_bundler::favicon::ResizeProfile;
    ///
    /// let p = ResizeProfile::from_str("balanced")?;
    /// assert_eq!(p.as_str(), "balanced");
    /// # Ok::<(), favicon_bundler::favicon::FaviconError>(())
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(profile: &str) -> Result<Self, FaviconError> {
        match profile.trim().to_lowercase().as_str() {
            "quality" => Ok(Self::Quality),
            "balanced" => Ok(Self::Balanced),
            "speed" => Ok(Self::Speed),
            other => Err(FaviconError::InvalidOptions(format!(
                "未知缩放档位：{}（可选：quality / balanced / speed）",
                other
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quality => "quality",
            Self::Balanced => "balanced",
            Self::Speed => "speed",
        }
    }
}

static CSS_COLOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)^(
            \#(?:[0-9a-f]{3,4}|[0-9a-f]{6}|[0-9a-f]{8})
          | (?:rgb|rgba|hsl|hsla)\(\s*[0-9.%\s,/+-]+\)
        )$",
    )
    .expect("CSS color pattern is valid")
});

/// CSS Color Level 4 的具名颜色，外加 `transparent` 与 `currentcolor`。
const CSS_NAMED_COLORS: &[&str] = &[
    "aliceblue", "antiquewhite", "aqua", "aquamarine", "azure", "beige", "bisque", "black",
    "blanchedalmond", "blue", "blueviolet", "brown", "burlywood", "cadetblue", "chartreuse",
    "chocolate", "coral", "cornflowerblue", "cornsilk", "crimson", "cyan", "darkblue",
    "darkcyan", "darkgoldenrod", "darkgray", "darkgreen", "darkgrey", "darkkhaki",
    "darkmagenta", "darkolivegreen", "darkorange", "darkorchid", "darkred", "darksalmon",
    "darkseagreen", "darkslateblue", "darkslategray", "darkslategrey", "darkturquoise",
    "darkviolet", "deeppink", "deepskyblue", "dimgray", "dimgrey", "dodgerblue", "firebrick",
    "floralwhite", "forestgreen", "fuchsia", "gainsboro", "ghostwhite", "gold", "goldenrod",
    "gray", "green", "greenyellow", "grey", "honeydew", "hotpink", "indianred", "indigo",
    "ivory", "khaki", "lavender", "lavenderblush", "lawngreen", "lemonchiffon", "lightblue",
    "lightcoral", "lightcyan", "lightgoldenrodyellow", "lightgray", "lightgreen", "lightgrey",
    "lightpink", "lightsalmon", "lightseagreen", "lightskyblue", "lightslategray",
    "lightslategrey", "lightsteelblue", "lightyellow", "lime", "limegreen", "linen", "magenta",
    "maroon", "mediumaquamarine", "mediumblue", "mediumorchid", "mediumpurple",
    "mediumseagreen", "mediumslateblue", "mediumspringgreen", "mediumturquoise",
    "mediumvioletred", "midnightblue", "mintcream", "mistyrose", "moccasin", "navajowhite",
    "navy", "oldlace", "olive", "olivedrab", "orange", "orangered", "orchid", "palegoldenrod",
    "palegreen", "paleturquoise", "palevioletred", "papayawhip", "peachpuff", "peru", "pink",
    "plum", "powderblue", "purple", "rebeccapurple", "red", "rosybrown", "royalblue",
    "saddlebrown", "salmon", "sandybrown", "seagreen", "seashell", "sienna", "silver",
    "skyblue", "slateblue", "slategray", "slategrey", "snow", "springgreen", "steelblue", "tan",
    "teal", "thistle", "tomato", "turquoise", "violet", "wheat", "white", "whitesmoke",
    "yellow", "yellowgreen", "transparent", "currentcolor",
];

fn is_css_color(color: &str) -> bool {
    CSS_COLOR.is_match(color)
        || CSS_NAMED_COLORS
            .iter()
            .any(|name| name.eq_ignore_ascii_case(color))
}

/// 单次构建的平台开关与 PWA 元数据。
///
/// 由调用方整体提供，构建期间不可变。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PlatformOptions {
    pub include_apple: bool,
    pub include_android: bool,
    pub include_windows: bool,
    pub app_name: String,
    pub short_name: String,
    pub theme_color: String,
}

impl Default for PlatformOptions {
    fn default() -> Self {
        Self {
            include_apple: false,
            include_android: false,
            include_windows: false,
            app_name: "favfav".to_string(),
            short_name: "favfav".to_string(),
            theme_color: "#6366f1".to_string(),
        }
    }
}

impl PlatformOptions {
    /// 校验清单所需的元数据。
    ///
    /// 只有请求了对应平台清单时才检查相应字段。
    pub fn validate(&self) -> Result<(), FaviconError> {
        if self.include_android {
            if self.app_name.trim().is_empty() {
                return Err(FaviconError::InvalidOptions(
                    "生成 manifest.json 需要 app_name".to_string(),
                ));
            }
            if self.short_name.trim().is_empty() {
                return Err(FaviconError::InvalidOptions(
                    "生成 manifest.json 需要 short_name".to_string(),
                ));
            }
        }

        if self.include_android || self.include_windows {
            let color = self.theme_color.trim();
            if color.is_empty() {
                return Err(FaviconError::InvalidOptions(
                    "生成平台清单需要 theme_color".to_string(),
                ));
            }
            if !is_css_color(color) {
                return Err(FaviconError::InvalidOptions(format!(
                    "theme_color 不是合法的 CSS 颜色：{}",
                    color
                )));
            }
        }

        Ok(())
    }
}
