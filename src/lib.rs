//! # caption-shot
//!
//! Puts a caption above an image. The caption and the image (inlined as a
//! base64 data URI) are rendered into an HTML page, and headless Chromium
//! takes a full-page screenshot of it that is written to the output file.
//!
//! ## Pipeline
//!
//! | Step | Module | Notes |
//! |------|--------|-------|
//! | Parse options | [`cli`] | `clap` derive; missing paths exit 1 with help |
//! | Read inputs | [`input`] | `--text` or stdin, image as base64 |
//! | Normalize text | [`text`] | curly quotes first, then HTML escaping |
//! | Render template | [`template`] | Tera, bundled or `--template` file |
//! | Capture | [`screenshot_service`] | chromiumoxide, one browser per run |
//!
//! Each step runs after the previous one finishes; the browser calls are
//! the only await points that do real waiting.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use caption_shot::{CliRunner, RenderSettings, RunConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RunConfig {
//!         caption_text: Some("when the build is \"green\"".to_string()),
//!         ..RunConfig::new("meme.jpg", "out/meme.png")
//!     };
//!     let runner = CliRunner::with_settings(config, RenderSettings::default());
//!     let artifact = runner.run().await?;
//!     println!("wrote {} bytes", artifact.bytes_written);
//!     Ok(())
//! }
//! ```
//!
//! ## CLI Usage
//!
//! ```bash
//! caption-shot -i photo.jpg -o captioned.png -t "it's a \"caption\""
//! echo "from stdin" | caption-shot -i photo.jpg -o out/captioned.jpg -w 640
//! ```

/// Run configuration and JSON render settings
pub mod config;

/// Error taxonomy and I/O error classification
pub mod error;

/// Caption text and input image loading
pub mod input;

/// Typographic quotes and HTML escaping
pub mod text;

/// Bundled and user-supplied font faces
pub mod fonts;

/// HTML template rendering
pub mod template;

/// Headless browser capture
pub mod screenshot_service;

/// Command-line interface implementation
pub mod cli;


pub use cli::*;
pub use config::*;
pub use error::*;
pub use fonts::*;
pub use input::*;
pub use screenshot_service::*;
pub use template::*;
pub use text::*;
