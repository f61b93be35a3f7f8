//! # 服务层（可注入状态）
//!
//! ## 设计思路
//!
//! 使用 `FaviconServiceState` 作为宿主（CLI、HTTP 服务等）持有的状态，替代全局单例函数。
//! 每次构建以 `request_id` 登记一个取消标志，宿主可以在任意线程调用 `cancel` 终止构建。
//!
//! ## 实现思路
//!
//! 对外仅暴露少量稳定 API：
//! - `generate` / `generate_with_progress`：执行完整构建链路
//! - `cancel`：按请求 ID 置位取消标志
//! - `generate_ico`：单独的 ICO 编码入口
//! - `set_resize_profile` / `get_resize_profile`：切换与读取缩放档位

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use serde::Serialize;

use super::{
    Bundle, BundleConfig, BundleRequest, FaviconBundler, FaviconError, ResizeProfile, encode_ico,
};

/// 构建进度事件。
#[derive(Debug, Clone, Serialize)]
pub struct BundleProgressPayload {
    pub request_id: String,
    pub completed: usize,
    pub total: usize,
    pub status: &'static str,
    pub stage: Option<&'static str>,
    pub error_code: Option<&'static str>,
    pub error_message: Option<String>,
}

/// 图标构建服务状态。
pub struct FaviconServiceState {
    bundler: FaviconBundler,
    cancel_flags: Mutex<HashMap<String, Arc<AtomicBool>>>,
}

impl FaviconServiceState {
    /// 使用默认配置创建服务状态。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use favicon_bundler::favicon::FaviconServiceState;
    ///
    /// let service = FaviconServiceState::new()?;
    /// # Ok::<(), favicon_bundler::favicon::FaviconError>(())
    /// ```
    pub fn new() -> Result<Self, FaviconError> {
        Self::with_config(BundleConfig::default())
    }

    /// 使用自定义配置创建服务状态。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use favicon_bundler::favicon::{BundleConfig, FaviconServiceState};
    ///
    /// let mut config = BundleConfig::default();
    /// config.include_512_in_core = true;
    /// let service = FaviconServiceState::with_config(config)?;
    /// # Ok::<(), favicon_bundler::favicon::FaviconError>(())
    /// ```
    pub fn with_config(config: BundleConfig) -> Result<Self, FaviconError> {
        let bundler = FaviconBundler::new(config)?;
        Ok(Self {
            bundler,
            cancel_flags: Mutex::new(HashMap::new()),
        })
    }

    pub fn bundler(&self) -> &FaviconBundler {
        &self.bundler
    }

    /// 执行完整构建，不关心进度。
    pub async fn generate(
        &self,
        request_id: &str,
        request: BundleRequest,
    ) -> Result<Bundle, FaviconError> {
        self.generate_with_progress(request_id, request, |_| {})
            .await
    }

    /// 执行完整构建，并通过 `emit` 推送进度事件。
    ///
    /// 事件状态依次为 `resampling`，最后是 `completed` / `cancelled` / `failed` 之一。
    pub async fn generate_with_progress<E>(
        &self,
        request_id: &str,
        request: BundleRequest,
        emit: E,
    ) -> Result<Bundle, FaviconError>
    where
        E: Fn(BundleProgressPayload) + Send + Sync,
    {
        let cancel_flag = Arc::new(AtomicBool::new(false));
        {
            let mut guard = self
                .cancel_flags
                .lock()
                .map_err(|_| FaviconError::ResourceLimit("取消标志锁已中毒".to_string()))?;
            if guard.contains_key(request_id) {
                return Err(FaviconError::InvalidOptions(format!(
                    "请求 {} 正在构建中",
                    request_id
                )));
            }
            guard.insert(request_id.to_string(), Arc::clone(&cancel_flag));
        }

        let emit_progress = |status: &'static str, completed: usize, total: usize| {
            emit(BundleProgressPayload {
                request_id: request_id.to_string(),
                completed,
                total,
                status,
                stage: None,
                error_code: None,
                error_message: None,
            });
        };

        let result = self
            .bundler
            .generate_bundle_with_hooks(
                request,
                |completed, total| emit_progress("resampling", completed, total),
                || cancel_flag.load(Ordering::SeqCst),
            )
            .await;

        {
            let mut guard = self
                .cancel_flags
                .lock()
                .map_err(|_| FaviconError::ResourceLimit("取消标志锁已中毒".to_string()))?;
            guard.remove(request_id);
        }

        match &result {
            Ok(bundle) => {
                let files = bundle.entries().len();
                emit_progress("completed", files, files);
            }
            Err(err) => emit(BundleProgressPayload {
                request_id: request_id.to_string(),
                completed: 0,
                total: 0,
                status: if matches!(err, FaviconError::Cancelled(_)) {
                    "cancelled"
                } else {
                    "failed"
                },
                stage: Some(err.stage()),
                error_code: Some(err.code()),
                error_message: Some(err.to_string()),
            }),
        }

        result
    }

    /// 取消正在进行的构建；请求不存在时返回 `false`。
    pub fn cancel(&self, request_id: &str) -> Result<bool, FaviconError> {
        let guard = self
            .cancel_flags
            .lock()
            .map_err(|_| FaviconError::ResourceLimit("取消标志锁已中毒".to_string()))?;

        if let Some(flag) = guard.get(request_id) {
            flag.store(true, Ordering::SeqCst);
            log::info!("🛑 已请求取消构建：{}", request_id);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// 单独编码 ICO（在阻塞线程池中执行）。
    pub async fn generate_ico(&self, pngs: Vec<Bytes>) -> Result<Bytes, FaviconError> {
        tokio::task::spawn_blocking(move || encode_ico(&pngs).map(Bytes::from))
            .await
            .map_err(|e| FaviconError::Task(format!("ICO 编码任务异常退出：{}", e)))?
    }

    /// 设置缩放档位。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use favicon_bundler::favicon::FaviconServiceState;
    ///
    /// let service = FaviconServiceState::new()?;
    /// service.set_resize_profile("speed")?;
    /// # Ok::<(), favicon_bundler::favicon::FaviconError>(())
    /// ```
    pub fn set_resize_profile(&self, profile: &str) -> Result<(), FaviconError> {
        let profile = ResizeProfile::from_str(profile)?;
        self.bundler.set_resize_profile(profile)
    }

    /// 获取当前生效缩放档位（字符串）。
    pub fn get_resize_profile(&self) -> Result<String, FaviconError> {
        let profile = self.bundler.get_resize_profile()?;
        Ok(profile.as_str().to_string())
    }
}
