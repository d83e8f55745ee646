//! Recover TOTP secrets from a FreeOTP `tokens.xml` backup.
//!
//! FreeOTP stores every secret as an array of signed bytes. [`secret::decode`]
//! turns such an array back into the base32 string authenticators expect, and
//! the rest of the crate wires that into a small pipeline: read the backup,
//! pick the entries you want, print their secrets, live codes, provisioning
//! URIs and QR codes.
//!
//! # Examples
//!
//! ```rust
//! use freeotp_dump::{Backup, TOTP};
//!
//! let backup = Backup::from_xml(
//!     r#"<map><string name="Github:constantoine">{"secret":[84,101,115,116,83,101,99,114,101,116,83,117,112,101,114,83,101,99,114,101,116]}</string></map>"#,
//! ).unwrap();
//! let entry = &backup.entries()[0];
//!
//! let secret = entry.token.secret.decode().unwrap();
//! assert_eq!(secret.as_str(), "KRSXG5CTMVRXEZLUKN2XAZLSKNSWG4TFOQ");
//!
//! let totp = TOTP::from_token(&entry.label, &entry.token).unwrap();
//! println!("{}", totp.get_url());
//! println!("{}", totp.generate(1_000_000));
//! ```

pub mod backup;
mod error;
pub mod pipeline;
pub mod qr;
pub mod secret;
pub mod token;

pub use backup::{Backup, Entry};
pub use error::Error;
pub use pipeline::{Options, Summary};
pub use qr::QrRenderer;
pub use secret::{DecodedSecret, RawSecret};
pub use token::{Token, TokenKind};

#[cfg(feature = "qr")]
pub use qr::QrCodeGen;

use core::fmt;

use hmac::Mac;
use std::time::{SystemTime, SystemTimeError, UNIX_EPOCH};

type HmacSha1 = hmac::Hmac<sha1::Sha1>;
type HmacSha256 = hmac::Hmac<sha2::Sha256>;
type HmacSha512 = hmac::Hmac<sha2::Sha512>;

/// Step used by FreeOTP when a token does not say otherwise, and omitted from URLs.
pub const DEFAULT_STEP: u64 = 30;
/// Digits used when a token does not say otherwise, or asks for an unsupported count.
pub const DEFAULT_DIGITS: usize = 6;

/// Hash algorithms a FreeOTP token can use
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum Algorithm {
    #[default]
    SHA1,
    SHA256,
    SHA512,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::SHA1 => f.write_str("SHA1"),
            Algorithm::SHA256 => f.write_str("SHA256"),
            Algorithm::SHA512 => f.write_str("SHA512"),
        }
    }
}

impl Algorithm {
    /// Parse an algorithm name, ignoring case and an optional `HMAC` prefix or dash.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "SHA1" | "SHA-1" | "HMACSHA1" | "HMAC-SHA1" => Some(Algorithm::SHA1),
            "SHA256" | "SHA-256" | "HMACSHA256" | "HMAC-SHA256" => Some(Algorithm::SHA256),
            "SHA512" | "SHA-512" | "HMACSHA512" | "HMAC-SHA512" => Some(Algorithm::SHA512),
            _ => None,
        }
    }

    fn hash<D>(mut digest: D, data: &[u8]) -> Vec<u8>
    where
        D: Mac,
    {
        digest.update(data);
        digest.finalize().into_bytes().to_vec()
    }

    fn sign(&self, key: &[u8], data: &[u8]) -> Vec<u8> {
        // HMAC accepts keys of any length
        match self {
            Algorithm::SHA1 => {
                Algorithm::hash(HmacSha1::new_from_slice(key).expect("any key size"), data)
            }
            Algorithm::SHA256 => {
                Algorithm::hash(HmacSha256::new_from_slice(key).expect("any key size"), data)
            }
            Algorithm::SHA512 => {
                Algorithm::hash(HmacSha512::new_from_slice(key).expect("any key size"), data)
            }
        }
    }
}

/// Seconds since the Unix epoch.
pub fn system_time() -> Result<u64, SystemTimeError> {
    let t = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
    Ok(t)
}

/// TOTP holds what is needed to generate codes for a recovered token and to
/// re-enroll it elsewhere. Its [secret](struct.TOTP.html#structfield.secret)
/// field is sensitive data, treat it accordingly
#[derive(Debug, Clone)]
pub struct TOTP {
    pub algorithm: Algorithm,
    /// The number of digits composing the auth code, between 6 and 8
    pub digits: usize,
    /// Duration in seconds of a step
    pub step: u64,
    /// Non-encoded value
    pub secret: Vec<u8>,
    /// Full FreeOTP label, for example "Github:constantoine@github.com"
    pub account_name: String,
    pub issuer: Option<String>,
}

impl TOTP {
    /// Will create a new instance of TOTP with given parameters
    ///
    /// # Errors
    ///
    /// Will return an error if `digits` is not between 6 and 8, or if `step` is 0
    pub fn new(
        algorithm: Algorithm,
        digits: usize,
        step: u64,
        secret: Vec<u8>,
        account_name: String,
        issuer: Option<String>,
    ) -> Result<TOTP, Error> {
        if !(6..=8).contains(&digits) {
            return Err(Error::Digits(digits));
        }
        if step == 0 {
            return Err(Error::Period(step));
        }
        Ok(TOTP {
            algorithm,
            digits,
            step,
            secret,
            account_name,
            issuer,
        })
    }

    /// Build the TOTP of a backup entry. The key is read back from the decoded base32 secret.
    ///
    /// Algorithm, digits and period the token does not support fall back to
    /// SHA1, 6 digits and 30 seconds, with a warning.
    pub fn from_token(label: &str, token: &Token) -> Result<TOTP, Error> {
        if token.kind() == TokenKind::Hotp {
            tracing::warn!("\"{}\" is a HOTP token, treating it as TOTP", label);
        }

        let algorithm = match token.algo.as_deref() {
            None => Algorithm::default(),
            Some(name) => Algorithm::from_str_loose(name).unwrap_or_else(|| {
                tracing::warn!("\"{}\" uses unsupported algorithm {}, using SHA1", label, name);
                Algorithm::default()
            }),
        };
        let digits = match token.digits {
            None => DEFAULT_DIGITS,
            Some(digits) if (6..=8).contains(&digits) => digits as usize,
            Some(digits) => {
                tracing::warn!("\"{}\" has {} digits, using {}", label, digits, DEFAULT_DIGITS);
                DEFAULT_DIGITS
            }
        };
        let step = match token.period {
            None => DEFAULT_STEP,
            Some(0) => {
                tracing::warn!("\"{}\" has a period of 0, using {}", label, DEFAULT_STEP);
                DEFAULT_STEP
            }
            Some(period) => period,
        };

        TOTP::new(
            algorithm,
            digits,
            step,
            token.secret.decode()?.to_bytes()?,
            label.to_string(),
            token.issuer().map(str::to_string),
        )
    }

    /// Will sign the given timestamp
    pub fn sign(&self, time: u64) -> Vec<u8> {
        self.algorithm
            .sign(&self.secret, (time / self.step).to_be_bytes().as_ref())
    }

    /// Will generate a token given the provided timestamp in seconds
    pub fn generate(&self, time: u64) -> String {
        let result: &[u8] = &self.sign(time);
        let offset = (result[result.len() - 1] & 15) as usize;
        let result = u32::from_be_bytes([
            result[offset],
            result[offset + 1],
            result[offset + 2],
            result[offset + 3],
        ]) & 0x7fff_ffff;
        format!(
            "{1:00$}",
            self.digits,
            result % 10_u32.pow(self.digits as u32)
        )
    }

    /// Generate a token from the current system time
    pub fn generate_current(&self) -> Result<String, SystemTimeError> {
        let t = system_time()?;
        Ok(self.generate(t))
    }

    /// Seconds left before the token generated at `time` expires
    pub fn ttl_at(&self, time: u64) -> u64 {
        self.step - (time % self.step)
    }

    /// Will return the base32 representation of the secret
    pub fn get_secret_base32(&self) -> String {
        base32::encode(base32::Alphabet::Rfc4648 { padding: false }, &self.secret)
    }

    /// Will generate a standard URL used to automatically add TOTP auths. Usually used with qr codes
    ///
    /// Label and issuer will be URL-encoded if needed be.
    /// The period is only written when it differs from the default of 30 seconds.
    pub fn get_url(&self) -> String {
        let mut url = format!(
            "otpauth://totp/{}?secret={}&digits={}&algorithm={}",
            urlencoding::encode(&self.account_name),
            self.get_secret_base32(),
            self.digits,
            self.algorithm,
        );
        if self.step != DEFAULT_STEP {
            url.push_str(&format!("&period={}", self.step));
        }
        if let Some(issuer) = &self.issuer {
            url.push_str(&format!("&issuer={}", urlencoding::encode(issuer)));
        }
        url
    }
}
