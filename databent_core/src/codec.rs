use image::{DynamicImage, ImageOutputFormat};
use std::io::Cursor;
use std::panic::{AssertUnwindSafe, catch_unwind};
use thiserror::Error;

/// Errors raised while preparing the intermediate container from a source image.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Failed to decode source image: {0}")]
    Decode(String),
    #[error("Failed to encode TIFF container: {0}")]
    Encode(String),
}

/// Why a corrupted container could not be turned into a displayable image.
///
/// These are ordinary outcomes for glitched data and are reported next to the
/// removed ranges, never propagated as fatal errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("Failed to decode corrupted container: {0}")]
    Decode(String),
    #[error("Failed to encode PNG: {0}")]
    Encode(String),
    /// The decoder panicked on the corrupted stream.
    #[error("Decoder panicked: {0}")]
    Panicked(String),
}

/// Turns a (possibly corrupted) container into browser-displayable bytes.
pub trait Renderer: Send + Sync {
    /// Short name used in log lines.
    fn name(&self) -> &'static str;

    /// Renders a container, which may be arbitrarily damaged.
    ///
    /// # Arguments
    /// * `container`: The corrupted bytes of one variant.
    ///
    /// # Returns
    /// `Result<Vec<u8>, RenderError>`:
    ///   - `Ok(bytes)`: The displayable image.
    ///   - `Err(error)`: Why the container could not be displayed. Must not
    ///     panic, even on input the underlying decoder chokes on.
    fn render(&self, container: &[u8]) -> Result<Vec<u8>, RenderError>;
}

/// Decodes any format the `image` crate recognises and re-encodes it as PNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct PngRenderer;

impl PngRenderer {
    pub fn new() -> Self {
        PngRenderer
    }
}

impl Renderer for PngRenderer {
    fn name(&self) -> &'static str {
        "PngRenderer"
    }

    fn render(&self, container: &[u8]) -> Result<Vec<u8>, RenderError> {
        let decoded = catch_unwind(AssertUnwindSafe(|| image::load_from_memory(container)));

        let image = match decoded {
            Ok(Ok(image)) => image,
            Ok(Err(e)) => return Err(RenderError::Decode(e.to_string())),
            Err(panic_payload) => {
                let msg = if let Some(s) = panic_payload.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_payload.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic type".to_string()
                };
                return Err(RenderError::Panicked(msg));
            }
        };

        encode(&normalize(image), ImageOutputFormat::Png).map_err(RenderError::Encode)
    }
}

/// Decodes `source` and re-encodes it as an uncompressed TIFF, the container
/// whose pixel bytes get corrupted.
pub fn to_container(source: &[u8]) -> Result<Vec<u8>, CodecError> {
    let image = image::load_from_memory(source).map_err(|e| CodecError::Decode(e.to_string()))?;
    log::debug!(
        "decoded {}x{} {:?} source image",
        image.width(),
        image.height(),
        image.color()
    );
    encode(&normalize(image), ImageOutputFormat::Tiff).map_err(CodecError::Encode)
}

/// Collapses exotic colour types to 8-bit RGB(A), which every encoder accepts.
fn normalize(image: DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => image,
        other if other.color().has_alpha() => DynamicImage::ImageRgba8(other.to_rgba8()),
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}

fn encode(image: &DynamicImage, format: ImageOutputFormat) -> Result<Vec<u8>, String> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, format)
        .map_err(|e| e.to_string())?;
    Ok(buffer.into_inner())
}
