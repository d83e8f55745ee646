use serde::{Deserialize, Deserializer};

use crate::secret::RawSecret;

/// Kind of one-time password a token generates.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum TokenKind {
    #[default]
    Totp,
    Hotp,
}

/// One token of a FreeOTP backup, as stored in the JSON text of its XML leaf.
///
/// Only `secret` is mandatory. The other fields are read loosely: a value of the
/// wrong type reads as absent, and out of range values are replaced when the
/// [TOTP](crate::TOTP) is built. FreeOTP writes more fields than these, the rest are ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub secret: RawSecret,
    #[serde(default, deserialize_with = "loose_str")]
    pub algo: Option<String>,
    #[serde(default, deserialize_with = "loose_u64")]
    pub digits: Option<u64>,
    #[serde(default, deserialize_with = "loose_u64")]
    pub period: Option<u64>,
    #[serde(default, deserialize_with = "loose_str")]
    pub issuer_ext: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "loose_str")]
    pub token_type: Option<String>,
}

fn loose_str<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_str().map(str::to_string))
}

fn loose_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_u64())
}

impl Token {
    /// Parse the JSON text of a backup entry.
    pub fn from_json(json: &str) -> Result<Token, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Issuer to put in the provisioning URI, if the token has a non-empty one.
    pub fn issuer(&self) -> Option<&str> {
        self.issuer_ext.as_deref().filter(|issuer| !issuer.is_empty())
    }

    /// HOTP when the type says so (in any letter case), TOTP otherwise.
    pub fn kind(&self) -> TokenKind {
        match self.token_type.as_deref() {
            Some(t) if t.eq_ignore_ascii_case("HOTP") => TokenKind::Hotp,
            _ => TokenKind::Totp,
        }
    }
}
