//! # 产物规划模块
//!
//! ## 设计思路
//!
//! 把“要生成哪些尺寸、放到哪个路径”计算成一个纯函数：输入核心尺寸基线与平台开关，
//! 输出有序的 `AssetPlan`。尺寸表全部是本模块持有的具名常量，不依赖任何全局状态。
//!
//! ## 实现思路
//!
//! 1. 先放核心尺寸（`favicon-{N}x{N}.png`）
//! 2. 再按 Apple → Android → Windows 的顺序追加平台尺寸
//! 3. 同一尺寸在核心与平台中同时出现时产生两个条目（路径不同），
//!    由编排层复用同一份缩放结果
//! 4. 只有 `core` 且 ≤256 的条目进入 ICO 候选集

use std::collections::HashSet;
use std::fmt;

use super::{BundleConfig, FaviconError, PlatformOptions};

/// 默认核心尺寸基线。
pub const DEFAULT_CORE_SIZES: [u32; 8] = [16, 32, 48, 64, 128, 144, 192, 256];
/// Apple touch icon 尺寸。
pub const APPLE_SIZES: [u32; 4] = [120, 152, 167, 180];
/// Android / PWA 尺寸。
pub const ANDROID_SIZES: [u32; 3] = [192, 196, 512];
/// Windows 磁贴尺寸。
pub const WINDOWS_SIZES: [u32; 4] = [70, 144, 150, 310];

/// ICO 容器可嵌入的最大边长。
pub const ICO_MAX_SIZE: u32 = 256;
/// 仅供 PWA 使用的尺寸，永远不进入 ICO。
pub const PWA_ONLY_SIZE: u32 = 512;
/// 单个目标尺寸上限。
pub const MAX_TARGET_SIZE: u32 = 4096;

pub const APPLE_DIR: &str = "apple/";
pub const ANDROID_DIR: &str = "android/";
pub const WINDOWS_DIR: &str = "windows/";

/// 产物所属平台。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PlatformTag {
    Core,
    Apple,
    Android,
    Windows,
}

impl PlatformTag {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::Apple => "apple",
            Self::Android => "android",
            Self::Windows => "windows",
        }
    }

    /// 该平台下某尺寸的归档相对路径。
    pub fn destination_path(self, size: u32) -> String {
        match self {
            Self::Core => format!("favicon-{size}x{size}.png"),
            Self::Apple => format!("{APPLE_DIR}apple-touch-icon-{size}x{size}.png"),
            Self::Android => format!("{ANDROID_DIR}android-chrome-{size}x{size}.png"),
            Self::Windows => format!("{WINDOWS_DIR}mstile-{size}x{size}.png"),
        }
    }
}

impl fmt::Display for PlatformTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单个目标产物。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSpec {
    pub pixel_size: u32,
    pub platform: PlatformTag,
    pub destination_path: String,
}

impl TargetSpec {
    pub fn new(pixel_size: u32, platform: PlatformTag) -> Self {
        Self {
            pixel_size,
            platform,
            destination_path: platform.destination_path(pixel_size),
        }
    }

    /// 是否进入 `favicon.ico`。
    pub fn is_ico_candidate(&self) -> bool {
        self.platform == PlatformTag::Core && self.pixel_size <= ICO_MAX_SIZE
    }
}

/// 有序的产物计划。
///
/// 不变式：`destination_path` 在计划内唯一，`pixel_size > 0`。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetPlan {
    targets: Vec<TargetSpec>,
}

impl AssetPlan {
    pub fn targets(&self) -> &[TargetSpec] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn ico_candidates(&self) -> impl Iterator<Item = &TargetSpec> {
        self.targets.iter().filter(|t| t.is_ico_candidate())
    }

    pub fn for_platform(&self, platform: PlatformTag) -> impl Iterator<Item = &TargetSpec> {
        self.targets.iter().filter(move |t| t.platform == platform)
    }

    /// 计划中出现过的全部尺寸（去重、升序）。
    pub fn distinct_sizes(&self) -> Vec<u32> {
        let mut sizes: Vec<u32> = self.targets.iter().map(|t| t.pixel_size).collect();
        sizes.sort_unstable();
        sizes.dedup();
        sizes
    }

    fn push(&mut self, seen: &mut HashSet<(u32, PlatformTag)>, size: u32, platform: PlatformTag) {
        if seen.insert((size, platform)) {
            self.targets.push(TargetSpec::new(size, platform));
        }
    }
}

/// 计算完整产物计划。
///
/// 规划与生成模式无关：单图与按尺寸上传使用同一套目标集合，
/// 区别只在于编排层为每个目标挑选哪张源图。
///
/// # 示例
/// ```rust
/// use favicon_bundler::favicon::{build_plan, BundleConfig, PlatformOptions};
///
/// let plan = build_plan(&BundleConfig::default(), &PlatformOptions::default())?;
/// assert_eq!(plan.len(), 8);
/// assert_eq!(plan.ico_candidates().count(), 8);
/// # Ok::<(), favicon_bundler::favicon::FaviconError>(())
/// ```
pub fn build_plan(
    config: &BundleConfig,
    options: &PlatformOptions,
) -> Result<AssetPlan, FaviconError> {
    config.validate()?;

    let mut plan = AssetPlan::default();
    let mut seen = HashSet::new();

    for size in config.effective_core_sizes() {
        plan.push(&mut seen, size, PlatformTag::Core);
    }

    let platform_sets: [(bool, PlatformTag, &[u32]); 3] = [
        (options.include_apple, PlatformTag::Apple, &APPLE_SIZES),
        (options.include_android, PlatformTag::Android, &ANDROID_SIZES),
        (options.include_windows, PlatformTag::Windows, &WINDOWS_SIZES),
    ];
    for (enabled, platform, sizes) in platform_sets {
        if !enabled {
            continue;
        }
        for &size in sizes {
            plan.push(&mut seen, size, platform);
        }
    }

    log::debug!(
        "🗺️ 产物计划：{} 个目标，{} 个 ICO 候选",
        plan.len(),
        plan.ico_candidates().count()
    );

    Ok(plan)
}
