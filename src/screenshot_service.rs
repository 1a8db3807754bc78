//! Headless Chromium capture of the rendered caption page
//!
//! Each run launches its own browser, loads the document into a single page
//! that is `width` pixels wide and 1 pixel tall, takes a full-page screenshot
//! and writes it to the output path. The browser is closed on every path out
//! of [`ScreenshotService::capture_to_file`].

use crate::{
    create_browser_config, session_data_dir, Access, CaptionError, OutputFormat, RenderSettings,
};
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

// Resolves once web fonts and every <img> have finished loading.
const WAIT_FOR_ASSETS: &str = r#"
Promise.all([
    document.fonts.ready,
    ...Array.from(document.images).map((img) =>
        img.complete ? null : new Promise((resolve) => { img.onload = img.onerror = resolve; })
    ),
]).then(() => true)
"#;

/// The file a successful run leaves behind.
#[derive(Debug, Clone)]
pub struct OutputArtifact {
    pub path: PathBuf,
    /// Format actually written; PNG when the extension was not encodable
    pub format: OutputFormat,
    pub bytes_written: usize,
    pub duration: Duration,
}

/// One Chromium process plus the task that drives its DevTools connection
pub struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    data_dir: PathBuf,
}

impl BrowserSession {
    pub async fn launch(settings: &RenderSettings, width: u32) -> Result<Self, CaptionError> {
        let data_dir = session_data_dir();
        let browser_config = create_browser_config(settings, width, &data_dir)?;

        let (browser, mut handler) = match Browser::launch(browser_config).await {
            Ok(launched) => launched,
            Err(e) => {
                let _ = tokio::fs::remove_dir_all(&data_dir).await;
                return Err(CaptionError::BrowserLaunch(e.to_string()));
            }
        };

        // The handler implements Stream and must be polled for any CDP call to complete
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("CDP handler error: {}", e);
                }
            }
            debug!("CDP handler stream ended");
        });

        debug!("Browser launched with profile {}", data_dir.display());
        Ok(Self {
            browser,
            handler,
            data_dir,
        })
    }

    pub async fn new_page(&self) -> Result<Page, CaptionError> {
        self.browser
            .new_page("about:blank")
            .await
            .map_err(|e| CaptionError::Screenshot(format!("couldn't open page: {e}")))
    }

    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Failed to close browser cleanly: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            warn!("Failed to wait for browser exit: {}", e);
        }
        self.handler.abort();

        if let Err(e) = tokio::fs::remove_dir_all(&self.data_dir).await {
            debug!("Couldn't remove {}: {}", self.data_dir.display(), e);
        }
        debug!("Browser closed");
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        // chromiumoxide kills the child process when `Browser` drops
        self.handler.abort();
    }
}

/// Renders documents to image files.
///
/// # Examples
///
/// ```rust,no_run
/// use caption_shot::{RenderSettings, ScreenshotService};
/// use std::path::Path;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let service = ScreenshotService::new(RenderSettings::default());
///     let artifact = service
///         .capture_to_file("<h1>Hello</h1>", Path::new("out/hello.png"), 1024)
///         .await?;
///     println!("wrote {} bytes", artifact.bytes_written);
///     Ok(())
/// }
/// ```
pub struct ScreenshotService {
    settings: RenderSettings,
}

impl ScreenshotService {
    pub fn new(settings: RenderSettings) -> Self {
        Self { settings }
    }

    pub async fn capture_to_file(
        &self,
        html: &str,
        output: &Path,
        width: u32,
    ) -> Result<OutputArtifact, CaptionError> {
        let start_time = Instant::now();
        let session = BrowserSession::launch(&self.settings, width).await?;

        let result = match self.settings.screenshot_timeout() {
            Some(limit) => timeout(limit, self.capture_with_session(&session, html, output, width))
                .await
                .unwrap_or(Err(CaptionError::Timeout(limit))),
            None => self.capture_with_session(&session, html, output, width).await,
        };

        session.close().await;

        let (format, bytes_written) = result?;
        let artifact = OutputArtifact {
            path: output.to_path_buf(),
            format,
            bytes_written,
            duration: start_time.elapsed(),
        };
        info!(
            "Captured {} ({:?}, {} bytes) in {:?}",
            artifact.path.display(),
            artifact.format,
            artifact.bytes_written,
            artifact.duration
        );
        Ok(artifact)
    }

    async fn capture_with_session(
        &self,
        session: &BrowserSession,
        html: &str,
        output: &Path,
        width: u32,
    ) -> Result<(OutputFormat, usize), CaptionError> {
        let page = session.new_page().await?;
        let result = self.capture_page(&page, html, output, width).await;

        let _ = page.close().await;

        result
    }

    async fn capture_page(
        &self,
        page: &Page,
        html: &str,
        output: &Path,
        width: u32,
    ) -> Result<(OutputFormat, usize), CaptionError> {
        // Height 1: the full-page capture grows to the content height
        let emulation_params = SetDeviceMetricsOverrideParams::builder()
            .width(width)
            .height(1)
            .device_scale_factor(self.settings.device_scale_factor)
            .mobile(false)
            .build()
            .map_err(CaptionError::Screenshot)?;

        page.execute(emulation_params).await?;

        page.set_content(html).await?;
        self.wait_for_assets(page).await?;

        ensure_output_dir(output).await?;

        let (format, data) = match OutputFormat::from_path(output) {
            Ok(format) => (format, self.screenshot(page, format).await?),
            Err(CaptionError::UnsupportedFormat(extension)) => {
                debug!("Cannot encode .{} screenshots, writing PNG instead", extension);
                (OutputFormat::Png, self.screenshot(page, OutputFormat::Png).await?)
            }
            Err(e) => return Err(e),
        };

        write_artifact(output, &data).await?;
        Ok((format, data.len()))
    }

    async fn wait_for_assets(&self, page: &Page) -> Result<(), CaptionError> {
        let params = EvaluateParams::builder()
            .expression(WAIT_FOR_ASSETS)
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(CaptionError::Screenshot)?;

        page.evaluate_expression(params).await?;
        Ok(())
    }

    async fn screenshot(&self, page: &Page, format: OutputFormat) -> Result<Vec<u8>, CaptionError> {
        let mut builder = ScreenshotParams::builder()
            .format(format.to_cdp())
            .full_page(true);

        if let Some(quality) = self.settings.jpeg_quality.filter(|_| format.supports_quality()) {
            builder = builder.quality(quality);
        }

        page.screenshot(builder.build())
            .await
            .map_err(|e| CaptionError::Screenshot(e.to_string()))
    }
}

/// Create the output file's parent directory; an existing one is fine.
pub async fn ensure_output_dir(output: &Path) -> Result<(), CaptionError> {
    let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };

    match tokio::fs::create_dir_all(parent).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(CaptionError::from_io(e, parent, Access::Write)),
    }
}

pub async fn write_artifact(output: &Path, data: &[u8]) -> Result<(), CaptionError> {
    tokio::fs::write(output, data)
        .await
        .map_err(|e| CaptionError::from_io(e, output, Access::Write))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ensure_output_dir_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("nested/deeper/out.png");

        ensure_output_dir(&output).await.unwrap();
        assert!(dir.path().join("nested/deeper").is_dir());

        // Second call hits the existing directory
        ensure_output_dir(&output).await.unwrap();
    }

    #[tokio::test]
    async fn test_ensure_output_dir_without_parent() {
        ensure_output_dir(Path::new("out.png")).await.unwrap();
    }

    #[tokio::test]
    async fn test_write_artifact_to_directory_is_invalid_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_artifact(dir.path(), b"png").await.unwrap_err();

        assert!(matches!(err, CaptionError::InvalidPath(_)));
        assert!(err.to_string().contains("is a directory"));
    }

    #[tokio::test]
    async fn test_write_artifact_writes_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.png");

        write_artifact(&output, b"\x89PNG").await.unwrap();
        assert_eq!(std::fs::read(&output).unwrap(), b"\x89PNG");
    }
}
