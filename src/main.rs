//! Dump the secrets of a FreeOTP `tokens.xml` backup.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use freeotp_dump::{pipeline, Backup, Options, QrCodeGen};

const DEFAULT_XML_FILE: &str = "tokens.xml";

/// Extract TOTP secrets from a FreeOTP backup, with optional QR codes to re-enroll them
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// XML file with creds
    #[arg(short = 'f', long = "xml_file", default_value = DEFAULT_XML_FILE)]
    xml_file: PathBuf,

    /// Display text QR codes
    #[arg(short = 'q', long = "show_qr_codes")]
    show_qr_codes: bool,

    /// Save QR codes to image files
    #[arg(short = 'v', long = "save_qr_code_images")]
    save_qr_code_images: bool,

    /// List entries without showing any secrets
    #[arg(short = 'l', long = "list_entries")]
    list_entries: bool,

    /// Only process entries whose name contains one of these case sensitive strings.
    /// Format: "-s google reddit"
    #[arg(short = 's', long = "secrets", num_args = 1..)]
    secrets: Vec<String>,

    /// Display the current code of each entry
    #[arg(short = 'c', long = "show_codes")]
    show_codes: bool,

    /// Directory QR code images are saved to
    #[arg(short = 'o', long = "qr_dir", default_value = ".")]
    qr_dir: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long = "log_level", default_value = "warn")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr, stdout is for secrets
    let log_level: tracing::Level = args.log_level.parse().unwrap_or(tracing::Level::WARN);
    let env_filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter)
        .init();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    dump(args, freeotp_dump::system_time()?, &mut out)
}

/// Print the selected entries of the backup named by `args`, then the summary line.
///
/// A backup that doesn't exist is reported in `out` and is not an error.
fn dump<W: Write>(args: Args, time: u64, out: &mut W) -> Result<()> {
    if !args.xml_file.is_file() {
        writeln!(
            out,
            "Unable to find {}, please verify location",
            args.xml_file.display()
        )?;
        return Ok(());
    }

    let backup = Backup::open(&args.xml_file)
        .with_context(|| format!("Failed to read {}", args.xml_file.display()))?;

    let options = Options {
        list_only: args.list_entries,
        show_qr: args.show_qr_codes,
        save_qr: args.save_qr_code_images,
        show_codes: args.show_codes,
        selectors: args.secrets,
        qr_dir: args.qr_dir,
        time,
    };

    let summary = pipeline::run(&backup, &options, &QrCodeGen::default(), out)?;
    writeln!(out, "{}", summary)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("freeotp-dump").chain(args.iter().copied())).unwrap()
    }

    fn dump_to_string(args: Args) -> String {
        let mut out = Vec::new();
        dump(args, 59, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn defaults() {
        let args = parse(&[]);
        assert_eq!(args.xml_file, PathBuf::from("tokens.xml"));
        assert!(!args.show_qr_codes);
        assert!(!args.save_qr_code_images);
        assert!(!args.list_entries);
        assert!(!args.show_codes);
        assert!(args.secrets.is_empty());
        assert_eq!(args.qr_dir, PathBuf::from("."));
        assert_eq!(args.log_level, "warn");
    }

    #[test]
    fn long_names() {
        let args = parse(&[
            "--xml_file",
            "backup.xml",
            "--show_qr_codes",
            "--save_qr_code_images",
            "--list_entries",
            "--secrets",
            "google",
            "vpn",
        ]);
        assert_eq!(args.xml_file, PathBuf::from("backup.xml"));
        assert!(args.show_qr_codes);
        assert!(args.save_qr_code_images);
        assert!(args.list_entries);
        assert_eq!(args.secrets, vec!["google", "vpn"]);
    }

    #[test]
    fn short_names() {
        let args = parse(&["-f", "backup.xml", "-q", "-v", "-l", "-c", "-s", "a", "b"]);
        assert_eq!(args.xml_file, PathBuf::from("backup.xml"));
        assert!(args.show_qr_codes);
        assert!(args.save_qr_code_images);
        assert!(args.list_entries);
        assert!(args.show_codes);
        assert_eq!(args.secrets, vec!["a", "b"]);
    }

    #[test]
    fn dashed_long_names_are_rejected() {
        assert!(Args::try_parse_from(["freeotp-dump", "--xml-file", "backup.xml"]).is_err());
        assert!(Args::try_parse_from(["freeotp-dump", "--secrets"]).is_err());
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.xml");
        let out = dump_to_string(parse(&["-f", path.to_str().unwrap()]));
        assert_eq!(
            out,
            format!("Unable to find {}, please verify location\n", path.display())
        );
    }

    #[test]
    fn lists_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.xml");
        std::fs::write(
            &path,
            r#"<map>
                <string name="google-acct">{"secret":[0]}</string>
                <string name="tokenOrder">["google-acct","work-vpn"]</string>
                <string name="work-vpn">{"secret":[0,0]}</string>
            </map>"#,
        )
        .unwrap();

        let out = dump_to_string(parse(&["-f", path.to_str().unwrap(), "-l"]));
        assert_eq!(out, "google-acct\nwork-vpn\n2 total secrets found, 2 processed\n");

        let out = dump_to_string(parse(&["-f", path.to_str().unwrap(), "-s", "vpn"]));
        assert_eq!(out, "work-vpn , AAAA\n2 total secrets found, 1 processed\n");
    }
}
