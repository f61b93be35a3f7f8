//! # 核心编排模块
//!
//! ## 设计思路
//!
//! `FaviconBundler` 只负责流程编排与配置管理，不关心上传、HTTP 或支付。
//! 处理链路固定为严格顺序的状态机：
//!
//! ```text
//! Planning → Resampling → IcoEncoding → Manifesting → Serialized
//!     └──────────┴─────────────┴─────────────┴──→ Failed（首个错误即终止）
//! ```
//!
//! 任何错误都会终止整次构建，调用方要么拿到完整产物包，要么拿到错误。
//!
//! ## 实现思路
//!
//! - 配置通过 `Arc<RwLock<BundleConfig>>` 支持运行时切换缩放档位。
//! - 单次构建使用“同一配置快照”，避免处理中途配置漂移。
//! - 缩放按 (源图, 尺寸) 去重后每个任务一个阻塞线程，`Semaphore` 限制并发；
//!   结果写入各自的槽位，全部 join 之后再合并，ICO 编码等待这道屏障。
//! - 取消信号在每个阶段开始前、每个缩放任务派发与完成时检查。
//! - 记录 `plan/resample/ico/manifest/archive/total` 阶段耗时，便于性能诊断。

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use bytes::Bytes;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::archive::{Bundle, BundleEntry, write_zip};
use super::ico::encode_ico;
use super::manifest::{
    ANDROID_MANIFEST_PATH, WINDOWS_BROWSERCONFIG_PATH, android_manifest, windows_browserconfig,
};
use super::plan::{AssetPlan, build_plan};
use super::resample::{prepare_exact, resample};
use super::selection::SourceKey;
use super::{
    BundleConfig, BundleRequest, FaviconError, GeneratedAsset, ResizeProfile, SourceImage,
    SourceSet,
};

pub const FAVICON_ICO_PATH: &str = "favicon.ico";

/// 构建状态机的阶段。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStage {
    Planning,
    Resampling,
    IcoEncoding,
    Manifesting,
    Serialized,
}

impl BuildStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Resampling => "resampling",
            Self::IcoEncoding => "ico_encoding",
            Self::Manifesting => "manifesting",
            Self::Serialized => "serialized",
        }
    }
}

/// 一个去重后的缩放任务。
struct ResampleJob {
    size: u32,
    exact: bool,
    source: SourceImage,
}

/// 图标产物编排器。
pub struct FaviconBundler {
    pub(super) config: Arc<RwLock<BundleConfig>>,
}

impl FaviconBundler {
    /// 根据初始配置创建编排器。
    ///
    /// # 示例
    /// ```rust
    /// use favicon_bundler::favicon::{BundleConfig, FaviconBundler};
    ///
    /// let bundler = FaviconBundler::new(BundleConfig::default())?;
    /// # Ok::<(), favicon_bundler::favicon::FaviconError>(())
    /// ```
    pub fn new(config: BundleConfig) -> Result<Self, FaviconError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(RwLock::new(config)),
        })
    }

    /// 获取配置快照。
    ///
    /// 作用：保证单次构建使用一致参数。
    pub fn config_snapshot(&self) -> Result<BundleConfig, FaviconError> {
        self.config
            .read()
            .map(|cfg| cfg.clone())
            .map_err(|_| FaviconError::ResourceLimit("配置读取锁已中毒".to_string()))
    }

    /// 整体替换配置（校验通过后才生效）。
    pub fn replace_config(&self, config: BundleConfig) -> Result<(), FaviconError> {
        config.validate()?;
        let mut current = self
            .config
            .write()
            .map_err(|_| FaviconError::ResourceLimit("配置写入锁已中毒".to_string()))?;
        *current = config;
        Ok(())
    }

    /// 设置缩放档位。
    pub fn set_resize_profile(&self, profile: ResizeProfile) -> Result<(), FaviconError> {
        let mut config = self
            .config
            .write()
            .map_err(|_| FaviconError::ResourceLimit("配置写入锁已中毒".to_string()))?;
        config.apply_resize_profile(profile);

        log::info!(
            "⚙️ 已切换缩放档位：{:?}（filter={:?}）",
            profile,
            config.resize_filter
        );

        Ok(())
    }

    /// 获取当前生效档位。
    pub fn get_resize_profile(&self) -> Result<ResizeProfile, FaviconError> {
        let config = self
            .config
            .read()
            .map_err(|_| FaviconError::ResourceLimit("配置读取锁已中毒".to_string()))?;
        Ok(config.infer_resize_profile())
    }

    /// 构建主入口：生成完整产物包。
    ///
    /// # 示例
    /// ```rust,ignore
    /// use favicon_bundler::favicon::{
    ///     BundleConfig, BundleRequest, FaviconBundler, PlatformOptions, SourceImage,
    /// };
    ///
    /// # async fn demo() -> Result<(), favicon_bundler::favicon::FaviconError> {
    /// let bundler = FaviconBundler::new(BundleConfig::default())?;
    /// let source = SourceImage::from_bytes(std::fs::read("logo.png").unwrap())?;
    /// let bundle = bundler
    ///     .generate_bundle(BundleRequest::single(source, PlatformOptions::default()))
    ///     .await?;
    /// std::fs::write("favicons.zip", bundle.archive_bytes()).unwrap();
    /// # Ok(())
    /// # }
    /// ```
    pub async fn generate_bundle(&self, request: BundleRequest) -> Result<Bundle, FaviconError> {
        self.generate_bundle_with_hooks(request, |_, _| {}, || false)
            .await
    }

    /// 带进度回调与取消检查的构建入口。
    ///
    /// `on_progress(completed, total)` 在每个缩放任务完成时调用；
    /// `is_cancelled` 返回 `true` 后构建以 `Cancelled` 终止。
    pub async fn generate_bundle_with_hooks<P, C>(
        &self,
        request: BundleRequest,
        on_progress: P,
        is_cancelled: C,
    ) -> Result<Bundle, FaviconError>
    where
        P: Fn(usize, usize) + Send + Sync,
        C: Fn() -> bool + Send + Sync,
    {
        let config = Arc::new(self.config_snapshot()?);
        let total_start = Instant::now();
        let BundleRequest { sources, options } = request;

        // Planning
        ensure_not_cancelled(&is_cancelled, BuildStage::Planning)?;
        let plan_start = Instant::now();
        if sources.is_empty() {
            return Err(FaviconError::NoSource(format!(
                "{} 模式未提供任何源图",
                sources.mode().as_str()
            )));
        }
        options.validate()?;
        let plan = build_plan(&config, &options)?;
        warn_unplanned_uploads(&sources, &plan);
        let plan_elapsed = plan_start.elapsed();

        // Resampling
        ensure_not_cancelled(&is_cancelled, BuildStage::Resampling)?;
        let resample_start = Instant::now();
        let (jobs, target_jobs) = collect_jobs(&sources, &plan)?;
        let rendered = run_jobs(jobs, &config, &on_progress, &is_cancelled).await?;
        let assets: Vec<GeneratedAsset> = plan
            .targets()
            .iter()
            .zip(&target_jobs)
            .map(|(target, &job)| GeneratedAsset {
                target: target.clone(),
                png: rendered[job].clone(),
            })
            .collect();
        let resample_elapsed = resample_start.elapsed();

        // IcoEncoding
        ensure_not_cancelled(&is_cancelled, BuildStage::IcoEncoding)?;
        let ico_start = Instant::now();
        let candidates: Vec<&Bytes> = assets
            .iter()
            .filter(|asset| asset.target.is_ico_candidate())
            .map(|asset| &asset.png)
            .collect();
        let ico = if candidates.is_empty() {
            log::info!("ℹ️ 没有 ≤256 的核心尺寸，跳过 favicon.ico");
            None
        } else {
            Some(Bytes::from(encode_ico(candidates)?))
        };
        let ico_elapsed = ico_start.elapsed();

        // Manifesting
        ensure_not_cancelled(&is_cancelled, BuildStage::Manifesting)?;
        let manifest_start = Instant::now();
        let mut manifests = Vec::new();
        if options.include_android {
            manifests.push(BundleEntry {
                path: ANDROID_MANIFEST_PATH.to_string(),
                bytes: Bytes::from(android_manifest(&options, plan.targets())?),
            });
        }
        if options.include_windows {
            manifests.push(BundleEntry {
                path: WINDOWS_BROWSERCONFIG_PATH.to_string(),
                bytes: Bytes::from(windows_browserconfig(&options, plan.targets())),
            });
        }
        let manifest_elapsed = manifest_start.elapsed();

        // Serialized
        ensure_not_cancelled(&is_cancelled, BuildStage::Serialized)?;
        let archive_start = Instant::now();
        let mut entries: Vec<BundleEntry> = assets
            .into_iter()
            .map(|asset| BundleEntry {
                path: asset.target.destination_path,
                bytes: asset.png,
            })
            .collect();
        if let Some(ico) = ico {
            entries.push(BundleEntry {
                path: FAVICON_ICO_PATH.to_string(),
                bytes: ico,
            });
        }
        entries.extend(manifests);

        let compression = config.compression;
        let (entries, archive) = tokio::task::spawn_blocking(move || {
            write_zip(&entries, compression).map(|archive| (entries, archive))
        })
        .await
        .map_err(|e| FaviconError::Task(format!("归档任务异常退出：{}", e)))??;
        let archive_elapsed = archive_start.elapsed();

        log::info!(
            "✅ 图标包构建完成 - mode={} targets={} files={} archive={}KB plan={}ms resample={}ms ico={}ms manifest={}ms archive={}ms total={}ms",
            sources.mode().as_str(),
            plan.len(),
            entries.len(),
            archive.len() / 1024,
            plan_elapsed.as_millis(),
            resample_elapsed.as_millis(),
            ico_elapsed.as_millis(),
            manifest_elapsed.as_millis(),
            archive_elapsed.as_millis(),
            total_start.elapsed().as_millis()
        );

        Ok(Bundle::new(entries, archive))
    }
}

/// 使用给定配置构建一次产物包。
pub async fn generate_bundle(
    request: BundleRequest,
    config: BundleConfig,
) -> Result<Bundle, FaviconError> {
    FaviconBundler::new(config)?.generate_bundle(request).await
}

fn ensure_not_cancelled<C>(is_cancelled: &C, stage: BuildStage) -> Result<(), FaviconError>
where
    C: Fn() -> bool,
{
    if is_cancelled() {
        log::info!("🛑 构建在 {} 阶段被取消", stage.as_str());
        return Err(FaviconError::Cancelled(format!(
            "在 {} 阶段收到取消信号",
            stage.as_str()
        )));
    }
    Ok(())
}

fn warn_unplanned_uploads(sources: &SourceSet, plan: &AssetPlan) {
    if let SourceSet::PerSize(uploads) = sources {
        let planned = plan.distinct_sizes();
        for size in uploads.keys().filter(|size| !planned.contains(*size)) {
            log::warn!("⚠️ 上传尺寸 {}x{} 不在产物计划中，仅作为缩放源", size, size);
        }
    }
}

/// 为计划中的每个目标选择源图，并按 (源图, 尺寸) 去重为缩放任务。
///
/// 返回任务列表与“目标 → 任务下标”映射。
fn collect_jobs(
    sources: &SourceSet,
    plan: &AssetPlan,
) -> Result<(Vec<ResampleJob>, Vec<usize>), FaviconError> {
    let mut jobs = Vec::new();
    let mut index: HashMap<(SourceKey, u32), usize> = HashMap::new();
    let mut target_jobs = Vec::with_capacity(plan.len());

    for target in plan.targets() {
        let choice = sources.select(target)?;
        let job = *index
            .entry((choice.key, target.pixel_size))
            .or_insert_with(|| {
                jobs.push(ResampleJob {
                    size: target.pixel_size,
                    exact: choice.is_exact_match,
                    source: choice.image.clone(),
                });
                jobs.len() - 1
            });
        target_jobs.push(job);
    }

    log::debug!(
        "🧮 {} 个目标归并为 {} 个缩放任务",
        plan.len(),
        jobs.len()
    );

    Ok((jobs, target_jobs))
}

fn render(job: &ResampleJob, config: &BundleConfig) -> Result<Bytes, FaviconError> {
    if job.exact {
        prepare_exact(&job.source, job.size, config)
    } else {
        resample(&job.source, job.size, config)
    }
}

/// 并发执行缩放任务，全部完成后按任务下标返回结果。
async fn run_jobs<P, C>(
    jobs: Vec<ResampleJob>,
    config: &Arc<BundleConfig>,
    on_progress: &P,
    is_cancelled: &C,
) -> Result<Vec<Bytes>, FaviconError>
where
    P: Fn(usize, usize),
    C: Fn() -> bool,
{
    let total = jobs.len();
    let semaphore = Arc::new(Semaphore::new(config.max_parallel_jobs.max(1)));
    let mut slots: Vec<Option<Bytes>> = vec![None; total];
    let mut join_set = JoinSet::new();
    let mut completed = 0usize;

    for (idx, job) in jobs.into_iter().enumerate() {
        ensure_not_cancelled(is_cancelled, BuildStage::Resampling)?;

        let permit = Arc::clone(&semaphore)
            .acquire_owned()
            .await
            .map_err(|e| FaviconError::Task(format!("缩放并发控制失败：{}", e)))?;
        let config = Arc::clone(config);

        join_set.spawn_blocking(move || {
            let _permit = permit;
            let start = Instant::now();
            let result = render(&job, &config);
            log::debug!(
                "🖼️ 缩放 {}x{} -> {}x{} exact={} {}ms",
                job.source.width(),
                job.source.height(),
                job.size,
                job.size,
                job.exact,
                start.elapsed().as_millis()
            );
            (idx, result)
        });

        while let Some(joined) = join_set.try_join_next() {
            store_result(joined, &mut slots)?;
            completed += 1;
            on_progress(completed, total);
        }
    }

    while let Some(joined) = join_set.join_next().await {
        store_result(joined, &mut slots)?;
        completed += 1;
        on_progress(completed, total);
        ensure_not_cancelled(is_cancelled, BuildStage::Resampling)?;
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(idx, slot)| {
            slot.ok_or_else(|| FaviconError::Task(format!("缩放任务 {} 没有产出结果", idx)))
        })
        .collect()
}

fn store_result(
    joined: Result<(usize, Result<Bytes, FaviconError>), tokio::task::JoinError>,
    slots: &mut [Option<Bytes>],
) -> Result<(), FaviconError> {
    let (idx, result) =
        joined.map_err(|e| FaviconError::Task(format!("缩放任务异常退出：{}", e)))?;
    slots[idx] = Some(result?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::favicon::PlatformOptions;
    use image::{DynamicImage, ImageBuffer, ImageFormat, Rgba};
    use std::collections::BTreeMap;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn create_png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            let r = (x % 255) as u8;
            let g = (y % 255) as u8;
            let b = ((x + y) % 255) as u8;
            Rgba([r, g, b, 255])
        });

        let dyn_img = DynamicImage::ImageRgba8(img);
        let mut cursor = Cursor::new(Vec::new());
        dyn_img
            .write_to(&mut cursor, ImageFormat::Png)
            .expect("failed to encode test image");
        cursor.into_inner()
    }

    fn source(side: u32) -> SourceImage {
        SourceImage::from_bytes(create_png_bytes(side, side)).expect("source should load")
    }

    #[tokio::test]
    async fn shared_sizes_reuse_one_buffer() {
        let bundler = FaviconBundler::new(BundleConfig::default()).expect("bundler init failed");
        let options = PlatformOptions {
            include_android: true,
            include_windows: true,
            ..PlatformOptions::default()
        };

        let bundle = bundler
            .generate_bundle(BundleRequest::single(source(300), options))
            .await
            .expect("bundle should build");

        assert_eq!(
            bundle.get("favicon-192x192.png"),
            bundle.get("android/android-chrome-192x192.png")
        );
        assert_eq!(
            bundle.get("favicon-144x144.png"),
            bundle.get("windows/mstile-144x144.png")
        );
    }

    #[test]
    fn jobs_are_deduplicated_per_source_and_size() {
        let options = PlatformOptions {
            include_android: true,
            ..PlatformOptions::default()
        };
        let plan = build_plan(&BundleConfig::default(), &options).unwrap();
        let sources = SourceSet::Single(source(64));

        let (jobs, target_jobs) = collect_jobs(&sources, &plan).unwrap();
        assert_eq!(target_jobs.len(), plan.len());
        // 核心 8 个 + Android 新增 196、512
        assert_eq!(jobs.len(), 10);
    }

    #[test]
    fn per_size_jobs_point_at_exact_uploads() {
        let plan = build_plan(&BundleConfig::default(), &PlatformOptions::default()).unwrap();
        let uploads: BTreeMap<u32, SourceImage> =
            [(32, source(32)), (256, source(256))].into_iter().collect();
        let sources = SourceSet::PerSize(uploads);

        let (jobs, target_jobs) = collect_jobs(&sources, &plan).unwrap();
        for (target, &job) in plan.targets().iter().zip(&target_jobs) {
            let job = &jobs[job];
            assert_eq!(job.exact, target.pixel_size == 32 || target.pixel_size == 256);
            if !job.exact {
                assert_eq!(job.source.width(), 256);
            }
        }
    }

    #[tokio::test]
    async fn cancellation_aborts_without_bundle() {
        let bundler = FaviconBundler::new(BundleConfig::default()).expect("bundler init failed");
        let cancelled = AtomicBool::new(false);
        let progress = AtomicUsize::new(0);

        let result = bundler
            .generate_bundle_with_hooks(
                BundleRequest::single(source(128), PlatformOptions::default()),
                |completed, _| {
                    progress.store(completed, Ordering::SeqCst);
                    cancelled.store(true, Ordering::SeqCst);
                },
                || cancelled.load(Ordering::SeqCst),
            )
            .await;

        assert!(matches!(result, Err(FaviconError::Cancelled(_))));
        assert!(progress.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn cancelled_before_start_does_no_work() {
        let bundler = FaviconBundler::new(BundleConfig::default()).expect("bundler init failed");
        let result = bundler
            .generate_bundle_with_hooks(
                BundleRequest::single(source(64), PlatformOptions::default()),
                |_, _| panic!("no resampling expected"),
                || true,
            )
            .await;
        assert!(matches!(result, Err(FaviconError::Cancelled(_))));
    }

    #[tokio::test]
    async fn progress_reports_every_job() {
        let mut config = BundleConfig::default();
        config.max_parallel_jobs = 2;
        let bundler = FaviconBundler::new(config).expect("bundler init failed");
        let last = AtomicUsize::new(0);
        let total_seen = AtomicUsize::new(0);

        bundler
            .generate_bundle_with_hooks(
                BundleRequest::single(source(100), PlatformOptions::default()),
                |completed, total| {
                    last.store(completed, Ordering::SeqCst);
                    total_seen.store(total, Ordering::SeqCst);
                },
                || false,
            )
            .await
            .expect("bundle should build");

        assert_eq!(last.load(Ordering::SeqCst), 8);
        assert_eq!(total_seen.load(Ordering::SeqCst), 8);
    }

    #[test]
    fn profile_switch_is_visible_in_snapshot() {
        let bundler = FaviconBundler::new(BundleConfig::default()).expect("bundler init failed");
        bundler.set_resize_profile(ResizeProfile::Speed).unwrap();
        assert_eq!(bundler.get_resize_profile().unwrap(), ResizeProfile::Speed);
        assert_eq!(
            bundler.config_snapshot().unwrap().resize_filter,
            image::imageops::FilterType::Triangle
        );
    }

    #[test]
    fn replace_config_validates() {
        let bundler = FaviconBundler::new(BundleConfig::default()).expect("bundler init failed");
        let mut bad = BundleConfig::default();
        bad.max_parallel_jobs = 0;
        assert!(bundler.replace_config(bad).is_err());
        assert!(bundler.config_snapshot().unwrap().max_parallel_jobs > 0);
    }
}
