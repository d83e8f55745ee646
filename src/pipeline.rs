//! Walks the entries of a backup and prints what was asked for each of them.

use std::fmt;
use std::io::Write;
use std::path::PathBuf;

use crate::{Backup, Error, QrRenderer, TOTP};

/// What to print for each entry, and which entries to print.
#[derive(Debug, Clone)]
pub struct Options {
    /// Only print labels
    pub list_only: bool,
    /// Print the provisioning URI and its QR code
    pub show_qr: bool,
    /// Save the QR code of each entry as a PNG in `qr_dir`
    pub save_qr: bool,
    /// Print the current code of each entry
    pub show_codes: bool,
    /// Case-sensitive substrings, an entry is processed if its label contains any of them.
    /// Empty means every entry.
    pub selectors: Vec<String>,
    pub qr_dir: PathBuf,
    /// Unix time used for codes
    pub time: u64,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            list_only: false,
            show_qr: false,
            save_qr: false,
            show_codes: false,
            selectors: Vec::new(),
            qr_dir: PathBuf::from("."),
            time: 0,
        }
    }
}

/// Entries found in the backup and entries that passed the selectors.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Summary {
    pub total: usize,
    pub processed: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} total secrets found, {} processed",
            self.total, self.processed
        )
    }
}

/// Whether `label` should be processed given the selectors.
pub fn matches_selectors<S: AsRef<str>>(label: &str, selectors: &[S]) -> bool {
    selectors.is_empty() || selectors.iter().any(|s| label.contains(s.as_ref()))
}

/// File name of the QR code image of `label`.
pub fn qr_image_name(label: &str) -> String {
    format!("{}.png", label.replace(':', "-"))
}

/// Print every selected entry of `backup` to `out`.
///
/// An entry whose TOTP can't be built, or whose QR code image can't be saved,
/// is reported in `out` and the run goes on with the next entry. Every other
/// error stops the run.
pub fn run<R, W>(
    backup: &Backup,
    options: &Options,
    renderer: &R,
    out: &mut W,
) -> Result<Summary, Error>
where
    R: QrRenderer + ?Sized,
    W: Write + ?Sized,
{
    let mut summary = Summary {
        total: backup.len(),
        processed: 0,
    };

    for entry in backup.entries() {
        if !matches_selectors(&entry.label, &options.selectors) {
            tracing::debug!("Skipping \"{}\"", entry.label);
            continue;
        }
        summary.processed += 1;

        let secret = entry.token.secret.decode()?;
        if options.list_only {
            writeln!(out, "{}", entry.label)?;
            continue;
        }
        writeln!(out, "{} , {}", entry.label, secret)?;

        let totp = match TOTP::from_token(&entry.label, &entry.token) {
            Ok(totp) => totp,
            Err(e) => {
                tracing::debug!("Skipping codes of \"{}\": {:?}", entry.label, e);
                writeln!(out, "Unable to build provisioning URI for {}: {}", entry.label, e)?;
                continue;
            }
        };
        if options.show_codes {
            writeln!(
                out,
                "    code: {} (valid for {}s)",
                totp.generate(options.time),
                totp.ttl_at(options.time)
            )?;
        }

        let uri = totp.get_url();
        if options.show_qr {
            writeln!(out, "{}", uri)?;
            writeln!(out, "{}", renderer.render(&uri)?)?;
            writeln!(out, "\n-----\n")?;
        }
        if options.save_qr {
            let path = options.qr_dir.join(qr_image_name(&entry.label));
            match renderer.save(&uri, &path) {
                Ok(()) => tracing::info!("Saved {}", path.display()),
                Err(e) => writeln!(out, "Unable to save {}: {}", path.display(), e)?,
            }
        }
    }

    Ok(summary)
}
