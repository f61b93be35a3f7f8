//! # 图标产物生成器：命令行入口
//!
//! 本文件仅负责参数解析、日志初始化与结果落盘。
//! 业务逻辑分布在各子模块中，详见 `lib.rs` 架构文档。

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use favicon_bundler::error::AppError;
use favicon_bundler::favicon::{
    BundleConfig, BundleRequest, DEFAULT_ARCHIVE_NAME, FaviconError, FaviconServiceState,
    GenerationMode, PlatformOptions, ResizeProfile, load_from_file,
};
use favicon_bundler::settings::load_settings;

#[derive(Debug, Parser)]
#[command(name = "favicon-bundler", version, about = "Generate a favicon bundle ZIP from one or more source images")]
struct Cli {
    /// single-source 或 per-size-source
    #[arg(long, default_value = "single-source")]
    mode: String,

    /// 单图模式的源图
    #[arg(long)]
    image: Option<PathBuf>,

    /// 按尺寸上传的源图，格式为 N=PATH，可重复
    #[arg(long = "size", value_parser = parse_sized_upload)]
    sizes: Vec<(u32, PathBuf)>,

    #[arg(long)]
    apple: bool,

    #[arg(long)]
    android: bool,

    #[arg(long)]
    windows: bool,

    #[arg(long)]
    app_name: Option<String>,

    #[arg(long)]
    short_name: Option<String>,

    #[arg(long)]
    theme_color: Option<String>,

    /// quality / balanced / speed
    #[arg(long)]
    profile: Option<String>,

    /// 额外输出 favicon-512x512.png
    #[arg(long)]
    include_512: bool,

    /// JSON 配置文件
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(short, long, default_value = DEFAULT_ARCHIVE_NAME)]
    output: PathBuf,
}

fn parse_sized_upload(raw: &str) -> Result<(u32, PathBuf), String> {
    let (size, path) = raw
        .split_once('=')
        .ok_or_else(|| format!("期望 N=PATH，实际为 {}", raw))?;
    let size = size
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("尺寸 {} 不是整数: {}", size, e))?;
    if size == 0 {
        return Err("尺寸必须大于 0".to_string());
    }
    Ok((size, PathBuf::from(path)))
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("❌ 构建失败 [{}]: {}", err.code(), err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let mut config = BundleConfig::default();
    let mut options = PlatformOptions::default();

    if let Some(path) = &cli.config {
        let settings = load_settings(path)?;
        settings.apply_to(&mut config)?;
        if let Some(platform) = settings.platform {
            options = platform;
        }
        log::info!("⚙️ 已加载配置文件：{}", path.display());
    }

    if let Some(profile) = &cli.profile {
        config.apply_resize_profile(ResizeProfile::from_str(profile)?);
    }
    config.include_512_in_core |= cli.include_512;

    options.include_apple |= cli.apple;
    options.include_android |= cli.android;
    options.include_windows |= cli.windows;
    if let Some(name) = cli.app_name {
        options.app_name = name;
    }
    if let Some(name) = cli.short_name {
        options.short_name = name;
    }
    if let Some(color) = cli.theme_color {
        options.theme_color = color;
    }

    let request = match GenerationMode::from_str(&cli.mode)? {
        GenerationMode::SingleSource => {
            let path = cli.image.ok_or_else(|| {
                FaviconError::NoSource("single-source 模式需要 --image".to_string())
            })?;
            BundleRequest::single(load_from_file(&path, &config)?, options)
        }
        GenerationMode::PerSizeSource => {
            let mut uploads = BTreeMap::new();
            for (size, path) in cli.sizes {
                let image = load_from_file(&path, &config)?;
                if uploads.insert(size, image).is_some() {
                    log::warn!("⚠️ 尺寸 {} 重复上传，使用最后一个文件", size);
                }
            }
            BundleRequest::per_size(uploads, options)
        }
    };

    let service = FaviconServiceState::with_config(config)?;
    let bundle = service
        .generate_with_progress("cli", request, |payload| {
            log::debug!(
                "📦 {} {}/{}",
                payload.status,
                payload.completed,
                payload.total
            );
        })
        .await?;

    std::fs::write(&cli.output, bundle.archive_bytes())?;
    log::info!(
        "✅ 已写入 {}（{} 个文件）",
        cli.output.display(),
        bundle.entries().len()
    );

    Ok(())
}
