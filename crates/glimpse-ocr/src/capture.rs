use anyhow::{Context, Result, bail};
use glimpse_types::CaptureRegion;
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use xcap::Monitor;

/// Grabs pixels from the screen. Called from a blocking worker thread.
pub trait ScreenCapturer: Send + Sync {
    fn capture(&self, region: CaptureRegion) -> Result<RgbaImage>;
}

/// Screen capture backed by `xcap`
#[derive(Debug, Default, Clone, Copy)]
pub struct XcapCapturer;

impl ScreenCapturer for XcapCapturer {
    fn capture(&self, region: CaptureRegion) -> Result<RgbaImage> {
        capture_screen_region(region)
    }
}

/// Capture a region of the screen
pub fn capture_screen_region(region: CaptureRegion) -> Result<RgbaImage> {
    if !region.is_valid() {
        bail!("Invalid capture dimensions: {region}");
    }

    let monitors = Monitor::all().context("Failed to get monitors")?;

    let monitor = monitors
        .iter()
        .find(|m| {
            region.left >= m.x()
                && region.top >= m.y()
                && region.left + region.width <= m.x() + m.width() as i32
                && region.top + region.height <= m.y() + m.height() as i32
        })
        .context(format!("No monitor contains region {region}"))?;

    let image = monitor.capture_image().context("Failed to capture screen")?;

    let cropped = xcap::image::imageops::crop_imm(
        &image,
        (region.left - monitor.x()) as u32,
        (region.top - monitor.y()) as u32,
        region.width as u32,
        region.height as u32,
    )
    .to_image();

    let (width, height) = cropped.dimensions();
    RgbaImage::from_raw(width, height, cropped.into_raw()).context("Captured buffer size mismatch")
}

/// Encode an RGBA image as PNG, the format every provider accepts
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    image::codecs::png::PngEncoder::new(&mut buffer)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgba8,
        )
        .context("Failed to encode PNG")?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_png_signature() {
        let image = RgbaImage::from_pixel(4, 3, image::Rgba([255, 255, 255, 255]));
        let png = encode_png(&image).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_invalid_region_rejected_before_capture() {
        let err = XcapCapturer
            .capture(CaptureRegion::new(0, 0, 0, 100))
            .unwrap_err();
        assert!(err.to_string().contains("Invalid capture dimensions"));
    }
}
