use crate::{
    bundled_fonts, font_stack, normalize_caption, parse_width, read_inputs, render_document,
    resolve_fonts, Access, CaptionError, FontFace, OutputArtifact, RenderSettings, RunConfig,
    ScreenshotService, TemplateContext, TemplateSource,
};
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "caption-shot")]
#[command(about = "Put a caption above an image by rendering it in headless Chromium")]
#[command(version)]
pub struct Cli {
    #[arg(short, long, value_name = "PATH", help = "Path to input image")]
    pub input_image: Option<PathBuf>,

    #[arg(short, long, value_name = "PATH", help = "Path to output image")]
    pub output_image: Option<PathBuf>,

    #[arg(
        short,
        long,
        help = "Text to add to the input image; read from stdin when left unspecified"
    )]
    pub text: Option<String>,

    #[arg(
        short,
        long,
        value_name = "PIXELS",
        help = "Width (in pixels) of the output image, 1024 by default"
    )]
    pub width: Option<String>,

    #[arg(long, value_name = "FILE", help = "JSON settings file")]
    pub config: Option<PathBuf>,

    #[arg(long, value_name = "FILE", help = "HTML template replacing the bundled one")]
    pub template: Option<PathBuf>,

    #[arg(long = "font", value_name = "FILE", help = "Font file to embed (repeatable)")]
    pub fonts: Vec<PathBuf>,

    #[arg(long, help = "Chrome executable path")]
    pub chrome_path: Option<String>,

    #[arg(long, help = "Enable verbose logging")]
    pub verbose: bool,
}

impl Cli {
    /// The per-run configuration; both paths are required.
    pub fn run_config(&self) -> Result<RunConfig, CaptionError> {
        let (Some(input_path), Some(output_path)) = (&self.input_image, &self.output_image) else {
            return Err(CaptionError::Usage);
        };

        Ok(RunConfig {
            input_path: input_path.clone(),
            output_path: output_path.clone(),
            // An empty --text falls back to stdin just like a missing one
            caption_text: self.text.clone().filter(|text| !text.is_empty()),
            width: parse_width(self.width.as_deref()),
        })
    }
}

/// Settings file (if any) with command-line overrides applied, validated.
pub async fn load_settings(args: &Cli) -> Result<RenderSettings, CaptionError> {
    let mut settings = if let Some(config_path) = &args.config {
        let config_content = tokio::fs::read_to_string(config_path)
            .await
            .map_err(|e| CaptionError::from_io(e, config_path, Access::Read))?;
        serde_json::from_str(&config_content).map_err(|e| {
            CaptionError::Configuration(format!("{}: {}", config_path.display(), e))
        })?
    } else {
        RenderSettings::default()
    };

    if let Some(template) = &args.template {
        settings.template = Some(template.clone());
    }

    if let Some(chrome_path) = &args.chrome_path {
        settings.chrome_path = Some(chrome_path.clone());
    }

    settings
        .fonts
        .extend(args.fonts.iter().cloned().map(FontFace::from_file));

    settings.validate()?;

    debug!("Device scale factor: {}", settings.device_scale_factor);
    debug!("Extra font faces: {}", settings.fonts.len());
    debug!("Screenshot timeout: {:?}", settings.screenshot_timeout());
    Ok(settings)
}

pub struct CliRunner {
    pub config: RunConfig,
    pub settings: RenderSettings,
    service: ScreenshotService,
}

impl CliRunner {
    pub async fn new(args: &Cli) -> Result<Self, CaptionError> {
        let config = args.run_config()?;
        let settings = load_settings(args).await?;
        Ok(Self::with_settings(config, settings))
    }

    pub fn with_settings(config: RunConfig, settings: RenderSettings) -> Self {
        let service = ScreenshotService::new(settings.clone());
        Self {
            config,
            settings,
            service,
        }
    }

    /// Read, normalize, render and capture, strictly in that order.
    pub async fn run(&self) -> Result<OutputArtifact, CaptionError> {
        let input = read_inputs(&self.config)?;
        let document = self.render(&input.text, input.image).await?;

        info!(
            "Capturing {} at {}px wide",
            self.config.output_path.display(),
            self.config.width
        );
        self.service
            .capture_to_file(&document, &self.config.output_path, self.config.width)
            .await
    }

    /// Build the HTML document for a caption and image.
    pub async fn render(
        &self,
        raw_text: &str,
        image: crate::ImagePayload,
    ) -> Result<String, CaptionError> {
        let faces = self.font_faces();
        let fonts = resolve_fonts(&faces).await?;

        let context = TemplateContext::new(
            normalize_caption(raw_text),
            image,
            fonts,
            font_stack(&faces),
            self.config.width,
        );

        render_document(&TemplateSource::from(self.settings.template.clone()), &context).await
    }

    fn font_faces(&self) -> Vec<FontFace> {
        let mut faces = bundled_fonts();
        faces.extend(self.settings.fonts.iter().cloned());
        faces
    }
}

pub fn setup_logging(verbose: bool) -> anyhow::Result<()> {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("couldn't install logger: {e}"))?;

    Ok(())
}
