//! 配置文件读取
//!
//! JSON 配置文件里的每个字段都可省略，省略的字段保持 `BundleConfig::default()` 的值。
//!
//! ```json
//! {
//!   "core_sizes": [16, 32, 48, 64, 128, 144, 192, 256],
//!   "include_512_in_core": false,
//!   "profile": "balanced",
//!   "max_parallel_jobs": 4,
//!   "compression": "deflated",
//!   "platform": { "include_apple": true, "theme_color": "#112233" }
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::AppError;
use crate::favicon::{
    ArchiveCompression, BundleConfig, FaviconError, PlatformOptions, ResizeProfile,
};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BundleSettings {
    pub core_sizes: Option<Vec<u32>>,
    pub include_512_in_core: Option<bool>,
    pub profile: Option<String>,
    pub max_source_bytes: Option<u64>,
    pub max_decoded_pixels: Option<u64>,
    pub max_decoded_bytes: Option<u64>,
    pub max_parallel_jobs: Option<usize>,
    pub compression: Option<String>,
    /// 平台开关与 PWA 元数据的默认值，命令行参数会覆盖它们。
    pub platform: Option<PlatformOptions>,
}

pub fn load_settings(path: impl AsRef<Path>) -> Result<BundleSettings, AppError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    serde_json::from_str::<BundleSettings>(&content)
        .map_err(|e| AppError::Settings(format!("解析配置文件 {} 失败: {}", path.display(), e)))
}

impl BundleSettings {
    /// 把配置文件中出现的字段覆盖到 `config` 上。
    pub fn apply_to(&self, config: &mut BundleConfig) -> Result<(), AppError> {
        if let Some(sizes) = &self.core_sizes {
            config.core_sizes = sizes.clone();
        }
        if let Some(include) = self.include_512_in_core {
            config.include_512_in_core = include;
        }
        if let Some(profile) = &self.profile {
            config.apply_resize_profile(ResizeProfile::from_str(profile)?);
        }
        if let Some(limit) = self.max_source_bytes {
            config.max_source_bytes = limit;
        }
        if let Some(limit) = self.max_decoded_pixels {
            config.max_decoded_pixels = limit;
        }
        if let Some(limit) = self.max_decoded_bytes {
            config.max_decoded_bytes = limit;
        }
        if let Some(jobs) = self.max_parallel_jobs {
            config.max_parallel_jobs = jobs;
        }
        if let Some(compression) = &self.compression {
            config.compression = match compression.trim().to_lowercase().as_str() {
                "deflated" | "deflate" => ArchiveCompression::Deflated,
                "stored" | "store" | "none" => ArchiveCompression::Stored,
                other => {
                    return Err(FaviconError::InvalidOptions(format!(
                        "未知压缩方式: {}（可选：deflated / stored）",
                        other
                    ))
                    .into());
                }
            };
        }
        config.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::imageops::FilterType;

    #[test]
    fn empty_settings_keep_defaults() {
        let settings: BundleSettings = serde_json::from_str("{}").unwrap();
        let mut config = BundleConfig::default();
        settings.apply_to(&mut config).unwrap();

        let defaults = BundleConfig::default();
        assert_eq!(config.core_sizes, defaults.core_sizes);
        assert_eq!(config.resize_filter, defaults.resize_filter);
        assert_eq!(config.compression, ArchiveCompression::Deflated);
        assert!(settings.platform.is_none());
    }

    #[test]
    fn present_fields_override() {
        let settings: BundleSettings = serde_json::from_str(
            r##"{
                "core_sizes": [16, 32],
                "include_512_in_core": true,
                "profile": "speed",
                "max_parallel_jobs": 2,
                "compression": "stored",
                "platform": { "include_windows": true, "theme_color": "#000" }
            }"##,
        )
        .unwrap();

        let mut config = BundleConfig::default();
        settings.apply_to(&mut config).unwrap();

        assert_eq!(config.effective_core_sizes(), vec![16, 32, 512]);
        assert_eq!(config.resize_filter, FilterType::Triangle);
        assert_eq!(config.max_parallel_jobs, 2);
        assert_eq!(config.compression, ArchiveCompression::Stored);

        let platform = settings.platform.unwrap();
        assert!(platform.include_windows);
        assert_eq!(platform.theme_color, "#000");
        assert_eq!(platform.app_name, "favfav");
    }

    #[test]
    fn unknown_values_are_rejected() {
        let settings = BundleSettings {
            compression: Some("zstd".to_string()),
            ..BundleSettings::default()
        };
        let result = settings.apply_to(&mut BundleConfig::default());
        assert!(matches!(
            result,
            Err(AppError::Favicon(FaviconError::InvalidOptions(_)))
        ));

        let settings = BundleSettings {
            profile: Some("ultra".to_string()),
            ..BundleSettings::default()
        };
        let result = settings.apply_to(&mut BundleConfig::default());
        assert!(matches!(result, Err(AppError::Favicon(_))));

        let settings = BundleSettings {
            max_parallel_jobs: Some(0),
            ..BundleSettings::default()
        };
        let result = settings.apply_to(&mut BundleConfig::default());
        assert!(matches!(result, Err(AppError::Favicon(_))));

        assert!(serde_json::from_str::<BundleSettings>(r#"{"nope": 1}"#).is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = load_settings("/definitely/not/here/settings.json");
        assert!(matches!(result, Err(AppError::Io(_))));
    }
}
