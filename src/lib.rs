//! # 图标产物生成器：库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │            宿主（CLI / 上传表单 / HTTP 服务）             │
//! │    只负责收集上传图片与平台开关，并把 ZIP 交给用户        │
//! └───────┬──────────────────────────────────────────────────┘
//!         ↕ Result<Bundle, AppError>
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↕            favicon 流水线                        │
//! │                                                          │
//! │  ┌─ error ────── AppError (应用级错误类型)                │
//! │  │                                                       │
//! │  ├─ settings ─── JSON 配置文件 → BundleConfig             │
//! │  │                                                       │
//! │  └─ favicon                                              │
//! │      ├─ loader         字节·Base64·文件加载与校验        │
//! │      ├─ plan           目标尺寸与归档路径                │
//! │      ├─ resample       并发缩放到透明正方形画布          │
//! │      ├─ ico            多图 favicon.ico                  │
//! │      ├─ manifest       manifest.json / browserconfig.xml │
//! │      └─ archive        确定性 ZIP                        │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 应用级错误类型 `AppError`，宿主边界的统一返回类型 |
//! | [`favicon`] | 源图加载、产物规划、缩放、ICO、清单与打包 |
//! | [`settings`] | 从 JSON 配置文件覆盖默认构建配置 |

pub mod error;
pub mod favicon;
pub mod settings;
