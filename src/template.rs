//! HTML template rendering
//!
//! The caption page is a Tera template. Auto-escaping is switched off: the
//! caption arrives already escaped by [`normalize_caption`](crate::normalize_caption)
//! and the font rules carry CSS that must not be touched.

use crate::{CaptionError, FontDescriptor, ImagePayload};
use serde::Serialize;
use std::borrow::Cow;
use std::path::PathBuf;
use tera::Tera;
use tracing::debug;

/// Template compiled into the binary.
pub const BUILTIN_TEMPLATE: &str = include_str!("../templates/caption.html");

const TEMPLATE_NAME: &str = "caption.html";

#[derive(Debug, Clone, Default, PartialEq)]
pub enum TemplateSource {
    #[default]
    Builtin,
    File(PathBuf),
}

impl From<Option<PathBuf>> for TemplateSource {
    fn from(path: Option<PathBuf>) -> Self {
        path.map_or(TemplateSource::Builtin, TemplateSource::File)
    }
}

/// Values the template can reference.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateContext {
    /// Quote-normalized, HTML-escaped caption
    pub text: String,
    /// Base64 image bytes
    pub image: String,
    pub image_mime: &'static str,
    pub fonts: Vec<FontDescriptor>,
    pub font_stack: String,
    pub width: u32,
}

impl TemplateContext {
    pub fn new(
        text: String,
        image: ImagePayload,
        fonts: Vec<FontDescriptor>,
        font_stack: String,
        width: u32,
    ) -> Self {
        Self {
            text,
            image: image.data,
            image_mime: image.mime,
            fonts,
            font_stack,
            width,
        }
    }
}

/// Render `context` into a complete HTML document.
pub async fn render_document(
    source: &TemplateSource,
    context: &TemplateContext,
) -> Result<String, CaptionError> {
    let template = match source {
        TemplateSource::Builtin => Cow::Borrowed(BUILTIN_TEMPLATE),
        TemplateSource::File(path) => {
            let content = tokio::fs::read_to_string(path).await.map_err(|e| {
                CaptionError::Template(format!(
                    "couldn't load template \"{}\": {}",
                    path.display(),
                    e
                ))
            })?;
            Cow::Owned(content)
        }
    };

    let mut tera = Tera::default();
    tera.autoescape_on(vec![]);
    tera.add_raw_template(TEMPLATE_NAME, &template)?;

    let rendered = tera.render(TEMPLATE_NAME, &tera::Context::from_serialize(context)?)?;
    debug!("Rendered caption document ({} bytes)", rendered.len());
    Ok(rendered)
}
