// End-to-end tests for bundle generation
use std::collections::BTreeMap;
use std::io::{Cursor, Read};

use favicon_bundler::favicon::{
    BundleConfig, BundleRequest, DEFAULT_CORE_SIZES, FaviconBundler, FaviconError,
    PlatformOptions, SourceImage, decode_ico_directory, load_from_bytes, resample,
};
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgba};

fn create_png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        Rgba([(x * 7 % 256) as u8, (y * 5 % 256) as u8, ((x + y) % 256) as u8, 255])
    });
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut cursor, ImageFormat::Png)
        .expect("failed to encode test image");
    cursor.into_inner()
}

fn source(side: u32) -> SourceImage {
    SourceImage::from_bytes(create_png_bytes(side, side)).expect("source should load")
}

fn bundler() -> FaviconBundler {
    FaviconBundler::new(BundleConfig::default()).expect("bundler init failed")
}

fn png_dimensions(bytes: &[u8]) -> (u32, u32) {
    let img = image::load_from_memory_with_format(bytes, ImageFormat::Png)
        .expect("bundle entry should be a PNG");
    (img.width(), img.height())
}

#[tokio::test]
async fn single_source_without_platforms() {
    let bundle = bundler()
        .generate_bundle(BundleRequest::single(source(512), PlatformOptions::default()))
        .await
        .expect("bundle should build");

    let mut expected: Vec<String> = DEFAULT_CORE_SIZES
        .iter()
        .map(|s| format!("favicon-{s}x{s}.png"))
        .collect();
    expected.push("favicon.ico".to_string());
    assert_eq!(bundle.paths().collect::<Vec<_>>(), expected);

    for &size in &DEFAULT_CORE_SIZES {
        let png = bundle.get(&format!("favicon-{size}x{size}.png")).unwrap();
        assert_eq!(png_dimensions(png), (size, size));
    }

    let ico = bundle.get("favicon.ico").unwrap();
    let sizes: Vec<u32> = decode_ico_directory(ico)
        .unwrap()
        .iter()
        .map(|e| e.width)
        .collect();
    assert_eq!(sizes, DEFAULT_CORE_SIZES);

    assert!(!bundle.paths().any(|p| p.contains('/')));
}

#[tokio::test]
async fn per_size_exact_upload_is_byte_identical() {
    let upload = create_png_bytes(180, 180);
    let uploads: BTreeMap<u32, SourceImage> =
        [(180, SourceImage::from_bytes(upload.clone()).unwrap())]
            .into_iter()
            .collect();
    let options = PlatformOptions {
        include_apple: true,
        ..PlatformOptions::default()
    };

    let bundle = bundler()
        .generate_bundle(BundleRequest::per_size(uploads.clone(), options))
        .await
        .expect("bundle should build");

    assert_eq!(
        bundle.get("apple/apple-touch-icon-180x180.png").unwrap().as_ref(),
        upload.as_slice()
    );

    let config = BundleConfig::default();
    for size in [16u32, 32, 48, 64, 128, 144] {
        let expected = resample(&uploads[&180], size, &config).unwrap();
        assert_eq!(bundle.get(&format!("favicon-{size}x{size}.png")), Some(&expected));
    }

    // 大于上传尺寸的核心尺寸被放大
    let (w, h) = png_dimensions(bundle.get("favicon-256x256.png").unwrap());
    assert_eq!((w, h), (256, 256));
}

#[tokio::test]
async fn per_size_missing_sizes_use_largest_upload() {
    let uploads: BTreeMap<u32, SourceImage> = [(16, source(16)), (64, source(64)), (300, source(300))]
        .into_iter()
        .collect();

    let bundle = bundler()
        .generate_bundle(BundleRequest::per_size(uploads.clone(), PlatformOptions::default()))
        .await
        .expect("bundle should build");

    let config = BundleConfig::default();
    assert_eq!(
        bundle.get("favicon-16x16.png").unwrap().as_ref(),
        uploads[&16].bytes().as_ref()
    );
    assert_eq!(
        bundle.get("favicon-64x64.png").unwrap().as_ref(),
        uploads[&64].bytes().as_ref()
    );
    let expected_32 = resample(&uploads[&300], 32, &config).unwrap();
    assert_eq!(bundle.get("favicon-32x32.png"), Some(&expected_32));
}

#[tokio::test]
async fn android_manifest_and_ico_boundary() {
    let options = PlatformOptions {
        include_android: true,
        app_name: "Demo App".to_string(),
        short_name: "Demo".to_string(),
        ..PlatformOptions::default()
    };

    let bundle = bundler()
        .generate_bundle(BundleRequest::single(source(400), options))
        .await
        .expect("bundle should build");

    let manifest: serde_json::Value =
        serde_json::from_slice(bundle.get("android/manifest.json").unwrap()).unwrap();
    let srcs: Vec<&str> = manifest["icons"]
        .as_array()
        .unwrap()
        .iter()
        .map(|icon| icon["src"].as_str().unwrap())
        .collect();
    assert_eq!(
        srcs,
        [
            "android/android-chrome-192x192.png",
            "android/android-chrome-196x196.png",
            "android/android-chrome-512x512.png",
        ]
    );
    for src in &srcs {
        assert!(bundle.contains(src));
    }

    assert!(!bundle.paths().any(|p| p.starts_with("windows/")));
    assert!(!bundle.contains("favicon-512x512.png"));

    let widths: Vec<u32> = decode_ico_directory(bundle.get("favicon.ico").unwrap())
        .unwrap()
        .iter()
        .map(|e| e.width)
        .collect();
    assert!(widths.contains(&256));
    assert!(!widths.contains(&512));
}

#[tokio::test]
async fn include_512_never_enters_ico() {
    let mut config = BundleConfig::default();
    config.include_512_in_core = true;
    let bundler = FaviconBundler::new(config).unwrap();

    let bundle = bundler
        .generate_bundle(BundleRequest::single(source(128), PlatformOptions::default()))
        .await
        .expect("bundle should build");

    assert_eq!(
        png_dimensions(bundle.get("favicon-512x512.png").unwrap()),
        (512, 512)
    );
    let entries = decode_ico_directory(bundle.get("favicon.ico").unwrap()).unwrap();
    assert_eq!(entries.len(), DEFAULT_CORE_SIZES.len());
}

#[tokio::test]
async fn all_platforms_produce_expected_layout() {
    let options = PlatformOptions {
        include_apple: true,
        include_android: true,
        include_windows: true,
        ..PlatformOptions::default()
    };

    let bundle = bundler()
        .generate_bundle(BundleRequest::single(source(256), options))
        .await
        .expect("bundle should build");

    let paths: Vec<&str> = bundle.paths().collect();
    assert_eq!(paths[0], "favicon-16x16.png");
    assert_eq!(paths[paths.len() - 3], "favicon.ico");
    assert_eq!(paths[paths.len() - 2], "android/manifest.json");
    assert_eq!(paths[paths.len() - 1], "windows/browserconfig.xml");
    assert!(bundle.contains("apple/apple-touch-icon-180x180.png"));
    assert!(bundle.contains("windows/mstile-310x310.png"));

    let xml = std::str::from_utf8(bundle.get("windows/browserconfig.xml").unwrap()).unwrap();
    assert!(xml.contains("<TileColor>#6366f1</TileColor>"));
}

#[tokio::test]
async fn identical_inputs_produce_identical_archives() {
    let options = PlatformOptions {
        include_apple: true,
        include_windows: true,
        ..PlatformOptions::default()
    };
    let request = BundleRequest::single(source(200), options);

    let first = bundler().generate_bundle(request.clone()).await.unwrap();
    let second = bundler().generate_bundle(request).await.unwrap();

    assert_eq!(first.archive_bytes(), second.archive_bytes());
}

#[tokio::test]
async fn archive_matches_bundle_entries() {
    let bundle = bundler()
        .generate_bundle(BundleRequest::single(
            source(64),
            PlatformOptions {
                include_apple: true,
                ..PlatformOptions::default()
            },
        ))
        .await
        .unwrap();

    let mut zip = zip::ZipArchive::new(Cursor::new(bundle.archive_bytes().to_vec())).unwrap();
    for entry in bundle.entries() {
        let mut content = Vec::new();
        zip.by_name(&entry.path)
            .unwrap()
            .read_to_end(&mut content)
            .unwrap();
        assert_eq!(content, entry.bytes.as_ref());
    }
    assert!(zip.by_name("apple/").unwrap().is_dir());
}

#[tokio::test]
async fn empty_per_size_upload_is_no_source() {
    let result = bundler()
        .generate_bundle(BundleRequest::per_size(BTreeMap::new(), PlatformOptions::default()))
        .await;
    assert!(matches!(result, Err(FaviconError::NoSource(_))));
}

#[tokio::test]
async fn manifest_without_theme_color_is_invalid() {
    let options = PlatformOptions {
        include_windows: true,
        theme_color: "   ".to_string(),
        ..PlatformOptions::default()
    };
    let result = bundler()
        .generate_bundle(BundleRequest::single(source(32), options))
        .await;
    assert!(matches!(result, Err(FaviconError::InvalidOptions(_))));
}

#[test]
fn garbage_upload_is_decode_error() {
    let result = load_from_bytes(b"definitely not an image".to_vec(), &BundleConfig::default());
    assert!(matches!(result, Err(FaviconError::Decode(_))));
}

#[tokio::test]
async fn truncated_png_fails_whole_build() {
    let mut bytes = create_png_bytes(300, 300);
    bytes.truncate(bytes.len() / 2);
    // 图片头仍然完整，失败发生在缩放阶段
    let source = SourceImage::from_bytes(bytes).expect("header should parse");

    let result = bundler()
        .generate_bundle(BundleRequest::single(source, PlatformOptions::default()))
        .await;
    assert!(matches!(result, Err(FaviconError::Decode(_))));
}

#[tokio::test]
async fn truncated_exact_upload_fails_per_size_build() {
    let mut truncated = create_png_bytes(16, 16);
    truncated.truncate(truncated.len() / 2);
    let uploads: BTreeMap<u32, SourceImage> = [
        (16, SourceImage::from_bytes(truncated).expect("header should parse")),
        (64, source(64)),
    ]
    .into_iter()
    .collect();

    let result = bundler()
        .generate_bundle(BundleRequest::per_size(uploads, PlatformOptions::default()))
        .await;
    assert!(matches!(result, Err(FaviconError::Decode(_))));
}

#[tokio::test]
async fn empty_core_sizes_skip_favicon_ico() {
    let config = BundleConfig {
        core_sizes: vec![],
        ..BundleConfig::default()
    };
    let options = PlatformOptions {
        include_apple: true,
        ..PlatformOptions::default()
    };

    let bundle = FaviconBundler::new(config)
        .unwrap()
        .generate_bundle(BundleRequest::single(source(256), options))
        .await
        .expect("bundle should build without core sizes");

    assert!(!bundle.contains("favicon.ico"));
    assert!(!bundle.entries().is_empty());
    assert!(!bundle.paths().any(|p| p.starts_with("favicon-")));
}

#[tokio::test]
async fn core_sizes_above_ico_limit_skip_favicon_ico() {
    let config = BundleConfig {
        core_sizes: vec![310],
        ..BundleConfig::default()
    };

    let bundle = FaviconBundler::new(config)
        .unwrap()
        .generate_bundle(BundleRequest::single(source(512), PlatformOptions::default()))
        .await
        .expect("bundle should build");

    assert!(!bundle.contains("favicon.ico"));
    assert_eq!(bundle.paths().collect::<Vec<_>>(), vec!["favicon-310x310.png"]);
    assert_eq!(
        png_dimensions(bundle.get("favicon-310x310.png").unwrap()),
        (310, 310)
    );
}
