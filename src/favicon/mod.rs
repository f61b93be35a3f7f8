//! # 图标产物模块（favicon）
//!
//! ## 设计思路
//!
//! 该模块将“源图加载 → 产物规划 → 源图选择 → 缩放 → ICO 编码 → 清单生成 → 打包”
//! 按职责拆分为多个子模块，每个子模块都是纯数据进、纯数据出，便于单独测试。
//!
//! - `service`：承载可注入状态（`FaviconServiceState`）与取消登记
//! - `handler`：编排整条构建流水线
//! - `loader`：字节 / Base64 / 文件加载与体积、签名校验
//! - `plan`：把配置与平台开关展开为确定顺序的目标列表
//! - `selection`：为每个目标挑选源图
//! - `resample`：解码、像素限制、等比缩放到透明正方形画布
//! - `ico`：多图 ICO 容器编码
//! - `manifest`：`manifest.json` 与 `browserconfig.xml`
//! - `archive`：产物包与确定性 ZIP
//! - `config/error/source`：配置、错误、中间数据模型
//!
//! ## 实现思路
//!
//! 对外仅暴露必要类型与函数，子模块本身保持 `mod` 私有。
//!
//! ## 新同事快速上手
//!
//! 可以按下面顺序理解调用链：
//!
//! ```text
//! 宿主（CLI / HTTP）
//!    ↓
//! loader.rs（读取上传 + 体积/签名/像素校验）
//!    ↓
//! service.rs（请求登记、取消、进度事件）
//!    ↓
//! handler.rs（统一编排 + 阶段耗时日志）
//!    ├─ plan.rs（目标列表）
//!    ├─ selection.rs → resample.rs（并发缩放）
//!    ├─ ico.rs（favicon.ico）
//!    ├─ manifest.rs（平台清单）
//!    └─ archive.rs（ZIP）
//!    ↓
//! 返回 Bundle 或 FaviconError
//! ```
//!
//! ## 分层职责建议
//!
//! - 新增平台或尺寸优先改 `plan.rs`
//! - 配置与策略变更优先改 `config.rs`
//! - 阶段顺序变更优先改 `handler.rs`
//! - 输出格式问题分别看 `ico/manifest/archive`

mod archive;
mod config;
mod error;
mod handler;
mod ico;
mod loader;
mod manifest;
mod plan;
mod resample;
mod selection;
mod service;
mod source;

pub use archive::{Bundle, BundleEntry, DEFAULT_ARCHIVE_NAME};
pub use config::{ArchiveCompression, BundleConfig, PlatformOptions, ResizeProfile};
pub use error::FaviconError;
pub use handler::{BuildStage, FAVICON_ICO_PATH, FaviconBundler, generate_bundle};
pub use ico::{IcoDirEntry, decode_ico_directory, encode_ico};
pub use loader::{load_from_base64, load_from_bytes, load_from_file};
pub use manifest::{
    ANDROID_MANIFEST_PATH, WINDOWS_BROWSERCONFIG_PATH, android_manifest, windows_browserconfig,
};
pub use plan::{
    ANDROID_SIZES, APPLE_SIZES, AssetPlan, DEFAULT_CORE_SIZES, ICO_MAX_SIZE, MAX_TARGET_SIZE,
    PWA_ONLY_SIZE, PlatformTag, TargetSpec, WINDOWS_SIZES, build_plan,
};
pub use resample::{prepare_exact, resample};
pub use selection::{SourceChoice, SourceKey, select_source};
pub use service::{BundleProgressPayload, FaviconServiceState};
pub use source::{BundleRequest, GeneratedAsset, GenerationMode, SourceImage, SourceSet};
