//! Utility functions for drawing QR codes generated using `qrcodegen`,
//! either to a PNG canvas provided by the `image` crate or to text that can
//! be printed in a terminal.
use std::path::Path;

use image::{GrayImage, ImageEncoder, Luma};
use qrcodegen::{QrCode, QrCodeEcc};

pub use image;
pub use qrcodegen;

/// Width in pixels of one QR module in PNG output.
pub const MODULE_PX: u32 = 8;
/// White border around PNG output, in modules.
pub const BORDER_MODULES: u32 = 4;

/// Different ways drawing a QR code can fail.
#[derive(Debug, thiserror::Error)]
pub enum QrError {
    #[error("{0}")]
    DataTooLong(#[from] qrcodegen::DataTooLong),
    #[error("could not encode PNG: {0}")]
    Png(#[from] image::ImageError),
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// Encode text into a QR code with medium error correction.
pub fn encode(text: &str) -> Result<QrCode, QrError> {
    Ok(QrCode::encode_text(text, QrCodeEcc::Medium)?)
}

/// Draw a QR code to an image buffer.
pub fn draw_canvas(qr: &QrCode) -> GrayImage {
    let size = qr.size() as u32;
    // The border is needed, some QR readers don't work without it
    let image_size = (size + BORDER_MODULES * 2) * MODULE_PX;
    let mut canvas = GrayImage::from_pixel(image_size, image_size, Luma([255]));

    for x_qr in 0..size {
        for y_qr in 0..size {
            if !qr.get_module(x_qr as i32, y_qr as i32) {
                continue;
            }

            let x_start = (x_qr + BORDER_MODULES) * MODULE_PX;
            let y_start = (y_qr + BORDER_MODULES) * MODULE_PX;

            for x_img in x_start..x_start + MODULE_PX {
                for y_img in y_start..y_start + MODULE_PX {
                    canvas.put_pixel(x_img, y_img, Luma([0]));
                }
            }
        }
    }
    canvas
}

/// Draw text to a PNG QR code.
///
/// # Errors
///
/// This will return an error in case the text is too long to fit into a QR code,
/// or in case the canvas can't be encoded into a PNG.
pub fn draw_png(text: &str) -> Result<Vec<u8>, QrError> {
    let code = encode(text)?;
    let canvas = draw_canvas(&code);
    let (width, height) = canvas.dimensions();

    let mut vec = Vec::new();
    image::codecs::png::PngEncoder::new(&mut vec).write_image(
        canvas.as_raw(),
        width,
        height,
        image::ColorType::L8,
    )?;
    Ok(vec)
}

/// Draw text to a PNG QR code and write it to `path`.
pub fn save_png(text: &str, path: impl AsRef<Path>) -> Result<(), QrError> {
    let png = draw_png(text)?;
    std::fs::write(path, png)?;
    Ok(())
}

/// Draw text as a QR code made of Unicode half blocks.
///
/// Every character covers two module rows. Light modules are drawn, dark
/// modules are left blank, so the output is meant for a dark terminal
/// background. `quiet_zone` is the width of the light border, in modules.
pub fn draw_terminal(text: &str, quiet_zone: i32) -> Result<String, QrError> {
    let code = encode(text)?;
    let start = -quiet_zone;
    let end = code.size() + quiet_zone;

    let mut out = String::new();
    for y in (start..end).step_by(2) {
        for x in start..end {
            // Modules outside the symbol read as light
            let top = !code.get_module(x, y);
            let bottom = y + 1 < end && !code.get_module(x, y + 1);
            out.push(match (top, bottom) {
                (true, true) => '█',
                (true, false) => '▀',
                (false, true) => '▄',
                (false, false) => ' ',
            });
        }
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const URI: &str = "otpauth://totp/Github%3Aconstantoine%40github.com?secret=KRSXG5CTMVRXEZLUKN2XAZLSKNSWG4TFOQ&digits=6&algorithm=SHA1";

    #[test]
    fn canvas_has_border() {
        let code = encode(URI).unwrap();
        let canvas = draw_canvas(&code);
        let expected = (code.size() as u32 + 2 * BORDER_MODULES) * MODULE_PX;
        assert_eq!(canvas.dimensions(), (expected, expected));
        assert_eq!(canvas.get_pixel(0, 0), &Luma([255]));
        // Top left finder pattern starts right after the border
        let corner = BORDER_MODULES * MODULE_PX;
        assert_eq!(canvas.get_pixel(corner, corner), &Luma([0]));
    }

    #[test]
    fn png_magic() {
        let png = draw_png(URI).unwrap();
        assert_eq!(&png[..4], b"\x89PNG");
    }

    #[test]
    fn save_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Github-constantoine.png");
        save_png(URI, &path).unwrap();
        let written = std::fs::read(&path).unwrap();
        assert_eq!(written, draw_png(URI).unwrap());
    }

    #[test]
    fn save_to_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("code.png");
        assert!(matches!(save_png(URI, &path), Err(QrError::Io(_))));
    }

    #[test]
    fn terminal_dimensions() {
        let code = encode(URI).unwrap();
        let art = draw_terminal(URI, 1).unwrap();
        let width = (code.size() + 2) as usize;
        let lines: Vec<&str> = art.lines().collect();
        assert_eq!(lines.len(), (width + 1) / 2);
        assert!(lines.iter().all(|l| l.chars().count() == width));
        // Quiet zone row is fully light on top
        assert!(lines[0].chars().all(|c| c == '█' || c == '▀'));
    }

    #[test]
    fn too_long() {
        let text = "A".repeat(8000);
        assert!(matches!(draw_png(&text), Err(QrError::DataTooLong(_))));
        assert!(draw_terminal(&text, 1).is_err());
    }
}
