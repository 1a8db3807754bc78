//! Font faces available to the caption template
//!
//! The bundled collection refers to locally installed families only. Extra
//! faces from the settings file or `--font` are embedded as data URIs so the
//! rendered page never has to touch the network.

use crate::{Access, CaptionError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Family name the template uses for the caption.
pub const CAPTION_FAMILY: &str = "Caption Sans";

const CAPTION_LOCAL_FAMILIES: &[&str] = &[
    "Helvetica Neue",
    "HelveticaNeue",
    "Segoe UI",
    "Roboto",
    "Arial",
];

const CAPTION_LOCAL_BOLD_FAMILIES: &[&str] = &[
    "Helvetica Neue Bold",
    "HelveticaNeue-Bold",
    "Segoe UI Bold",
    "Roboto Bold",
    "Arial Bold",
];

/// A single `@font-face` rule as configured by the user.
///
/// ```json
/// { "family": "Inter", "weight": 700, "source": { "file": "fonts/Inter-Bold.woff2" } }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FontFace {
    pub family: String,

    #[serde(default = "default_weight")]
    pub weight: u16,

    #[serde(default)]
    pub style: FontStyle,

    pub source: FontSource,
}

fn default_weight() -> u16 {
    400
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
}

impl FontStyle {
    fn as_css(&self) -> &'static str {
        match self {
            FontStyle::Normal => "normal",
            FontStyle::Italic => "italic",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FontSource {
    /// Locally installed family names, tried in order
    Local(Vec<String>),
    /// Font file embedded into the page
    File(PathBuf),
}

/// Template-facing form of a [`FontFace`] with a ready-to-use CSS `src`.
#[derive(Debug, Clone, Serialize)]
pub struct FontDescriptor {
    pub family: String,
    pub weight: u16,
    pub style: &'static str,
    pub src: String,
}

impl FontFace {
    pub fn local(family: &str, weight: u16, names: &[&str]) -> Self {
        Self {
            family: family.to_string(),
            weight,
            style: FontStyle::Normal,
            source: FontSource::Local(names.iter().map(|n| n.to_string()).collect()),
        }
    }

    /// Font face backed by a file; the family is taken from the file stem.
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let family = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| CAPTION_FAMILY.to_string());

        Self {
            family,
            weight: default_weight(),
            style: FontStyle::Normal,
            source: FontSource::File(path),
        }
    }

    pub async fn resolve(&self) -> Result<FontDescriptor, CaptionError> {
        let src = match &self.source {
            FontSource::Local(names) => names
                .iter()
                .map(|name| format!("local(\"{}\")", css_string(name)))
                .collect::<Vec<_>>()
                .join(", "),
            FontSource::File(path) => {
                let bytes = tokio::fs::read(path)
                    .await
                    .map_err(|e| CaptionError::from_io(e, path, Access::Read))?;
                debug!("Embedding font {} ({} bytes)", path.display(), bytes.len());

                let (mime, format) = font_format(path);
                format!(
                    "url(\"data:{};base64,{}\") format(\"{}\")",
                    mime,
                    STANDARD.encode(bytes),
                    format
                )
            }
        };

        Ok(FontDescriptor {
            family: css_string(&self.family),
            weight: self.weight,
            style: self.style.as_css(),
            src,
        })
    }
}

/// The default caption faces, regular and bold.
pub fn bundled_fonts() -> Vec<FontFace> {
    vec![
        FontFace::local(CAPTION_FAMILY, 400, CAPTION_LOCAL_FAMILIES),
        FontFace::local(CAPTION_FAMILY, 700, CAPTION_LOCAL_BOLD_FAMILIES),
    ]
}

/// Resolve every face in order; the first unreadable font file aborts.
pub async fn resolve_fonts(faces: &[FontFace]) -> Result<Vec<FontDescriptor>, CaptionError> {
    let mut descriptors = Vec::with_capacity(faces.len());
    for face in faces {
        descriptors.push(face.resolve().await?);
    }
    Ok(descriptors)
}

/// CSS `font-family` value listing the configured families, caption family first.
pub fn font_stack(faces: &[FontFace]) -> String {
    let mut families: Vec<&str> = vec![CAPTION_FAMILY];
    for face in faces {
        if !families.contains(&face.family.as_str()) {
            families.push(&face.family);
        }
    }

    let mut stack: Vec<String> = families
        .into_iter()
        .map(|family| format!("\"{}\"", css_string(family)))
        .collect();
    stack.push("sans-serif".to_string());
    stack.join(", ")
}

fn font_format(path: &Path) -> (&'static str, &'static str) {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "woff2" => ("font/woff2", "woff2"),
        "woff" => ("font/woff", "woff"),
        "otf" => ("font/otf", "opentype"),
        _ => ("font/ttf", "truetype"),
    }
}

// Keep user-provided names from closing the surrounding CSS string.
fn css_string(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, '"' | '\\' | '<' | '>' | '\n' | '\r'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bundled_fonts_resolve_to_local_sources() {
        let descriptors = resolve_fonts(&bundled_fonts()).await.unwrap();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].family, CAPTION_FAMILY);
        assert_eq!(descriptors[0].weight, 400);
        assert_eq!(descriptors[1].weight, 700);
        assert!(descriptors[0].src.starts_with("local(\"Helvetica Neue\")"));
        assert!(!descriptors[0].src.contains("http"));
    }

    #[tokio::test]
    async fn test_font_file_is_embedded_as_data_uri() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Brand-Bold.woff2");
        std::fs::write(&path, b"wOF2fake").unwrap();

        let face = FontFace::from_file(&path);
        assert_eq!(face.family, "Brand-Bold");

        let descriptor = face.resolve().await.unwrap();
        assert_eq!(
            descriptor.src,
            format!(
                "url(\"data:font/woff2;base64,{}\") format(\"woff2\")",
                STANDARD.encode(b"wOF2fake")
            )
        );
    }

    #[tokio::test]
    async fn test_missing_font_file_is_not_found() {
        let face = FontFace::from_file("/definitely/not/here.ttf");
        let err = face.resolve().await.unwrap_err();
        assert!(matches!(err, CaptionError::NotFound(_)));
    }

    #[test]
    fn test_font_stack_deduplicates_families() {
        let mut faces = bundled_fonts();
        faces.push(FontFace::from_file("Brand.ttf"));
        faces.push(FontFace::from_file("Brand.ttf"));
        assert_eq!(
            font_stack(&faces),
            "\"Caption Sans\", \"Brand\", sans-serif"
        );
    }

    #[test]
    fn test_font_face_from_json() {
        let face: FontFace = serde_json::from_str(
            r#"{ "family": "Inter", "style": "italic", "source": { "local": ["Inter Italic"] } }"#,
        )
        .unwrap();
        assert_eq!(face.weight, 400);
        assert_eq!(face.style, FontStyle::Italic);
        assert_eq!(face.source, FontSource::Local(vec!["Inter Italic".to_string()]));
    }

    #[test]
    fn test_css_string_strips_breakouts() {
        assert_eq!(css_string("Evil\"; } body {"), "Evil; } body {");
    }
}
