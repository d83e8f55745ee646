/// Everything that can go wrong while reading a backup and rendering its tokens.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Error parsing XML: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("Malformed backup: {0}")]
    Malformed(String),
    #[error("Backup entry has no \"name\" attribute")]
    MissingName,
    #[error("Entry \"{label}\" does not hold a valid token: {source}")]
    Json {
        label: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid secret format: {0}")]
    InvalidSecretFormat(String),
    #[error("Implementations MUST extract a 6-digit code at a minimum and possibly 7 and 8-digit code. {0} digits is not allowed")]
    Digits(usize),
    #[error("Period must be at least one second, not {0}")]
    Period(u64),
    #[error("QR code error: {0}")]
    Qr(String),
}
