//! Caption text and input image loading

use crate::{Access, CaptionError, RunConfig};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Base64-encoded input image, ready for a `data:` URI.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePayload {
    pub data: String,
    pub mime: &'static str,
}

impl ImagePayload {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            data: STANDARD.encode(bytes),
            mime: sniff_mime(bytes),
        }
    }

    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, self.data)
    }
}

#[derive(Debug, Clone)]
pub struct CaptionInput {
    pub text: String,
    pub image: ImagePayload,
}

/// Load caption text, then the image.
///
/// Text comes first so that a missing caption is reported before a bad
/// image path.
pub fn read_inputs(config: &RunConfig) -> Result<CaptionInput, CaptionError> {
    let text = match &config.caption_text {
        Some(text) => text.clone(),
        None => {
            eprintln!("reading from stdin...");
            read_text(std::io::stdin().lock())?
        }
    };

    let image = read_image(&config.input_path)?;
    Ok(CaptionInput { text, image })
}

/// Read all of `reader` as the caption; empty input is `MissingInput`.
pub fn read_text(mut reader: impl Read) -> Result<String, CaptionError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;

    if bytes.is_empty() {
        return Err(CaptionError::MissingInput);
    }

    // Invalid UTF-8 becomes U+FFFD instead of failing the run
    let text = String::from_utf8_lossy(&bytes).into_owned();
    debug!("Read {} bytes of caption text", text.len());
    Ok(text)
}

pub fn read_image(path: &Path) -> Result<ImagePayload, CaptionError> {
    let bytes = std::fs::read(path).map_err(|e| CaptionError::from_io(e, path, Access::Read))?;
    let payload = ImagePayload::from_bytes(&bytes);
    debug!(
        "Loaded {} ({}, {} bytes)",
        path.display(),
        payload.mime,
        bytes.len()
    );
    Ok(payload)
}

fn sniff_mime(bytes: &[u8]) -> &'static str {
    use image::ImageFormat;

    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => "image/png",
        Ok(ImageFormat::Jpeg) => "image/jpeg",
        Ok(ImageFormat::Gif) => "image/gif",
        Ok(ImageFormat::WebP) => "image/webp",
        Ok(ImageFormat::Bmp) => "image/bmp",
        Ok(ImageFormat::Ico) => "image/x-icon",
        Ok(ImageFormat::Tiff) => "image/tiff",
        Ok(ImageFormat::Avif) => "image/avif",
        // Chromium sniffs image content regardless of the declared type
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    #[test]
    fn test_read_text_from_reader() {
        let text = read_text(Cursor::new("hello \"world\"\n")).unwrap();
        assert_eq!(text, "hello \"world\"\n");
    }

    #[test]
    fn test_non_utf8_text_is_decoded_lossily() {
        let text = read_text(Cursor::new(vec![b'c', b'a', b'f', 0xE9])).unwrap();
        assert_eq!(text, "caf\u{FFFD}");
    }

    #[test]
    fn test_empty_stdin_is_missing_input() {
        let err = read_text(Cursor::new("")).unwrap_err();
        assert!(matches!(err, CaptionError::MissingInput));
    }

    #[test]
    fn test_read_image_encodes_base64() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.png");
        std::fs::write(&path, PNG_MAGIC).unwrap();

        let payload = read_image(&path).unwrap();
        assert_eq!(payload.mime, "image/png");
        assert_eq!(STANDARD.decode(&payload.data).unwrap(), PNG_MAGIC);
        assert!(payload.data_uri().starts_with("data:image/png;base64,iVBORw0KGgo"));
    }

    #[test]
    fn test_unknown_bytes_fall_back_to_octet_stream() {
        let payload = ImagePayload::from_bytes(b"not an image");
        assert_eq!(payload.mime, "application/octet-stream");
    }

    #[test]
    fn test_missing_image_is_not_found() {
        let err = read_image(Path::new("/no/such/image.png")).unwrap_err();
        assert!(matches!(err, CaptionError::NotFound(_)));
        assert!(err.to_string().contains("couldn't read from"));
    }

    #[test]
    fn test_directory_image_is_invalid_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_image(dir.path()).unwrap_err();
        assert!(matches!(err, CaptionError::InvalidPath(_)));
        assert!(err.to_string().ends_with("is a directory"));
    }

    #[test]
    fn test_explicit_text_skips_stdin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.png");
        std::fs::write(&path, PNG_MAGIC).unwrap();

        let config = RunConfig {
            caption_text: Some("caption".to_string()),
            ..RunConfig::new(&path, dir.path().join("out.png"))
        };
        let input = read_inputs(&config).unwrap();
        assert_eq!(input.text, "caption");
        assert_eq!(input.image.mime, "image/png");
    }
}
