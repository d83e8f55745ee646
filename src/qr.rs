use std::path::Path;

use crate::Error;

/// Turns provisioning URIs into QR codes.
pub trait QrRenderer {
    /// Render `uri` as text that can be printed to a terminal.
    fn render(&self, uri: &str) -> Result<String, Error>;

    /// Write `uri` as a QR code image to `path`.
    fn save(&self, uri: &str, path: &Path) -> Result<(), Error>;
}

/// [`QrRenderer`] backed by `qrcodegen`: half-block terminal art and 8 pixels per module PNG files.
#[cfg(feature = "qr")]
#[derive(Debug, Copy, Clone)]
pub struct QrCodeGen {
    /// Light border around terminal art, in modules
    pub quiet_zone: i32,
}

#[cfg(feature = "qr")]
impl Default for QrCodeGen {
    fn default() -> Self {
        QrCodeGen { quiet_zone: 1 }
    }
}

#[cfg(feature = "qr")]
impl QrRenderer for QrCodeGen {
    fn render(&self, uri: &str) -> Result<String, Error> {
        freeotp_qr::draw_terminal(uri, self.quiet_zone).map_err(|e| Error::Qr(e.to_string()))
    }

    fn save(&self, uri: &str, path: &Path) -> Result<(), Error> {
        freeotp_qr::save_png(uri, path).map_err(|e| match e {
            freeotp_qr::QrError::Io(e) => Error::Io(e),
            e => Error::Qr(e.to_string()),
        })
    }
}
