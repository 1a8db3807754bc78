//! Run configuration and render settings
//!
//! `RunConfig` is what the command line asks for on this invocation.
//! `RenderSettings` holds the knobs that can also live in a JSON settings
//! file (browser, fonts, template) and is merged with CLI overrides.

use crate::{CaptionError, FontFace};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Viewport width used when `--width` is absent or unusable.
pub const DEFAULT_WIDTH: u32 = 1024;

/// Everything one invocation needs, built once from the command line.
///
/// # Examples
///
/// ```rust
/// use caption_shot::{RunConfig, DEFAULT_WIDTH};
///
/// let config = RunConfig::new("in.png", "out/captioned.png");
/// assert_eq!(config.width, DEFAULT_WIDTH);
/// assert!(config.caption_text.is_none());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    /// Caption passed with `--text`; `None` means read standard input
    pub caption_text: Option<String>,
    /// Viewport width in CSS pixels
    pub width: u32,
}

impl RunConfig {
    pub fn new(input_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: output_path.into(),
            caption_text: None,
            width: DEFAULT_WIDTH,
        }
    }
}

/// Lenient width parsing: leading digits count, anything unusable is 1024.
///
/// ```rust
/// use caption_shot::parse_width;
///
/// assert_eq!(parse_width(Some("640")), 640);
/// assert_eq!(parse_width(Some("800px")), 800);
/// assert_eq!(parse_width(Some("wide")), 1024);
/// assert_eq!(parse_width(None), 1024);
/// ```
pub fn parse_width(raw: Option<&str>) -> u32 {
    let Some(raw) = raw else {
        return DEFAULT_WIDTH;
    };

    let digits: String = raw
        .trim_start()
        .trim_start_matches('+')
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();

    match digits.parse::<u32>() {
        Ok(width) if width > 0 => width,
        _ => DEFAULT_WIDTH,
    }
}

/// Browser and rendering settings, optionally loaded from a JSON file
///
/// Every field has a default, so a settings file only needs the keys it
/// changes.
///
/// ```rust
/// use caption_shot::RenderSettings;
///
/// let settings: RenderSettings = serde_json::from_str(r#"{ "device_scale_factor": 2.0 }"#).unwrap();
/// assert_eq!(settings.device_scale_factor, 2.0);
/// assert!(settings.fonts.is_empty());
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Path to Chrome/Chromium executable (default: auto-detect)
    pub chrome_path: Option<String>,

    /// Device pixel ratio for the capture (default: 1.0)
    ///
    /// The output image is `width * device_scale_factor` pixels wide.
    pub device_scale_factor: f64,

    /// Encoder quality for JPEG and WebP output, 0-100 (default: Chromium's)
    pub jpeg_quality: Option<u8>,

    /// Template file replacing the bundled caption template
    pub template: Option<PathBuf>,

    /// Extra font faces appended after the bundled ones
    pub fonts: Vec<FontFace>,

    /// Abort the capture after this many seconds (default: wait forever)
    pub screenshot_timeout_secs: Option<u64>,

    /// Keep Chromium's sandbox enabled (default: false, `--no-sandbox`)
    pub sandbox: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            chrome_path: None,
            device_scale_factor: 1.0,
            jpeg_quality: None,
            template: None,
            fonts: Vec::new(),
            screenshot_timeout_secs: None,
            sandbox: false,
        }
    }
}

impl RenderSettings {
    pub fn screenshot_timeout(&self) -> Option<Duration> {
        self.screenshot_timeout_secs.map(Duration::from_secs)
    }

    pub fn validate(&self) -> Result<(), CaptionError> {
        if !(self.device_scale_factor > 0.0) {
            return Err(CaptionError::Configuration(
                "device_scale_factor must be greater than 0".to_string(),
            ));
        }

        if let Some(quality) = self.jpeg_quality {
            if quality > 100 {
                return Err(CaptionError::Configuration(
                    "jpeg_quality must be between 0 and 100".to_string(),
                ));
            }
        }

        if self.screenshot_timeout_secs == Some(0) {
            return Err(CaptionError::Configuration(
                "screenshot_timeout_secs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Image formats Chromium can encode a screenshot as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum OutputFormat {
    Png,
    Jpeg,
    Webp,
}

impl OutputFormat {
    /// Format implied by the output file extension.
    ///
    /// Extensions the screenshot encoder cannot produce (`.gif`, `.bmp`, no
    /// extension at all) are reported as `UnsupportedFormat`.
    pub fn from_path(path: &Path) -> Result<Self, CaptionError> {
        let unsupported = || {
            CaptionError::UnsupportedFormat(
                path.extension()
                    .map(|ext| ext.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "<none>".to_string()),
            )
        };

        match image::ImageFormat::from_path(path) {
            Ok(image::ImageFormat::Png) => Ok(OutputFormat::Png),
            Ok(image::ImageFormat::Jpeg) => Ok(OutputFormat::Jpeg),
            Ok(image::ImageFormat::WebP) => Ok(OutputFormat::Webp),
            _ => Err(unsupported()),
        }
    }

    pub fn to_cdp(self) -> CaptureScreenshotFormat {
        match self {
            OutputFormat::Png => CaptureScreenshotFormat::Png,
            OutputFormat::Jpeg => CaptureScreenshotFormat::Jpeg,
            OutputFormat::Webp => CaptureScreenshotFormat::Webp,
        }
    }

    /// Only lossy formats take a quality setting.
    pub fn supports_quality(self) -> bool {
        !matches!(self, OutputFormat::Png)
    }
}

/// Chrome command-line arguments for a one-shot headless render
pub fn get_chrome_args(settings: &RenderSettings, width: u32) -> Vec<String> {
    let mut args = vec![
        "--headless".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--disable-gpu".to_string(),
        "--disable-extensions".to_string(),
        "--disable-default-apps".to_string(),
        "--disable-sync".to_string(),
        "--no-first-run".to_string(),
        "--hide-scrollbars".to_string(),
        "--font-render-hinting=none".to_string(),
        format!("--window-size={},{}", width, 1),
    ];

    if !settings.sandbox {
        args.push("--no-sandbox".to_string());
    }

    args
}

/// Fresh profile directory for one browser session.
///
/// Concurrent sessions must not share a profile or Chromium's singleton
/// lock makes the second launch fail.
pub fn session_data_dir() -> PathBuf {
    static NEXT_SESSION: AtomicUsize = AtomicUsize::new(0);

    let id = NEXT_SESSION.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("caption-shot-{}-{}", std::process::id(), id))
}

pub fn create_browser_config(
    settings: &RenderSettings,
    width: u32,
    user_data_dir: &Path,
) -> Result<chromiumoxide::browser::BrowserConfig, CaptionError> {
    use chromiumoxide::browser::BrowserConfig;
    use chromiumoxide::handler::viewport::Viewport as ChromeViewport;

    let mut builder = BrowserConfig::builder()
        .window_size(width, 1)
        .viewport(ChromeViewport {
            width,
            height: 1,
            device_scale_factor: Some(settings.device_scale_factor),
            emulating_mobile: false,
            is_landscape: false,
            has_touch: false,
        })
        .user_data_dir(user_data_dir)
        .args(get_chrome_args(settings, width));

    if let Some(chrome_path) = &settings.chrome_path {
        builder = builder.chrome_executable(chrome_path);
    }

    builder.build().map_err(CaptionError::BrowserLaunch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_width() {
        assert_eq!(parse_width(Some("1200")), 1200);
        assert_eq!(parse_width(Some(" 320 ")), 320);
        assert_eq!(parse_width(Some("+480")), 480);
        assert_eq!(parse_width(Some("0")), DEFAULT_WIDTH);
        assert_eq!(parse_width(Some("-5")), DEFAULT_WIDTH);
        assert_eq!(parse_width(Some("")), DEFAULT_WIDTH);
        assert_eq!(parse_width(Some("99999999999")), DEFAULT_WIDTH);
    }

    #[test]
    fn test_output_format_from_extension() {
        assert_eq!(OutputFormat::from_path(Path::new("a.png")).unwrap(), OutputFormat::Png);
        assert_eq!(OutputFormat::from_path(Path::new("a.JPG")).unwrap(), OutputFormat::Jpeg);
        assert_eq!(OutputFormat::from_path(Path::new("a.jpeg")).unwrap(), OutputFormat::Jpeg);
        assert_eq!(OutputFormat::from_path(Path::new("a.webp")).unwrap(), OutputFormat::Webp);
    }

    #[test]
    fn test_unsupported_extensions() {
        let err = OutputFormat::from_path(Path::new("a.gif")).unwrap_err();
        assert!(matches!(err, CaptionError::UnsupportedFormat(ref ext) if ext == "gif"));

        let err = OutputFormat::from_path(Path::new("captioned")).unwrap_err();
        assert!(matches!(err, CaptionError::UnsupportedFormat(ref ext) if ext == "<none>"));
    }

    #[test]
    fn test_settings_default_is_valid() {
        let settings = RenderSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.device_scale_factor, 1.0);
        assert!(settings.screenshot_timeout().is_none());
        assert!(!settings.sandbox);
    }

    #[test]
    fn test_settings_validation() {
        let settings = RenderSettings {
            device_scale_factor: 0.0,
            ..Default::default()
        };
        assert!(matches!(settings.validate(), Err(CaptionError::Configuration(_))));

        let settings = RenderSettings {
            jpeg_quality: Some(101),
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        let settings = RenderSettings {
            screenshot_timeout_secs: Some(0),
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_chrome_args_generation() {
        let settings = RenderSettings::default();
        let args = get_chrome_args(&settings, 640);

        assert!(args.contains(&"--headless".to_string()));
        assert!(args.contains(&"--no-sandbox".to_string()));
        assert!(args.contains(&"--window-size=640,1".to_string()));

        let sandboxed = RenderSettings {
            sandbox: true,
            ..Default::default()
        };
        assert!(!get_chrome_args(&sandboxed, 640).contains(&"--no-sandbox".to_string()));
    }

    #[test]
    fn test_session_data_dirs_are_unique() {
        let first = session_data_dir();
        let second = session_data_dir();
        assert_ne!(first, second);
        assert!(first.starts_with(std::env::temp_dir()));
    }

    #[test]
    fn test_browser_config_creation() {
        let settings = RenderSettings {
            chrome_path: Some("/usr/bin/chromium".to_string()),
            ..Default::default()
        };
        assert!(create_browser_config(&settings, 1024, &session_data_dir()).is_ok());
    }
}
