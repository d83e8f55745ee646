//! Reader for the `tokens.xml` file FreeOTP exports.
//!
//! The file is an Android shared preferences map. Each direct child of the root
//! is a leaf whose `name` attribute is the token label and whose text is the
//! token as JSON:
//!
//! ```xml
//! <map>
//!     <string name="tokenOrder">["Github:constantoine"]</string>
//!     <string name="Github:constantoine">{"secret":[84,101,115],"digits":6}</string>
//! </map>
//! ```
//!
//! The `tokenOrder` leaf only records the order of the tokens in the app and is skipped.

use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::token::Token;
use crate::Error;

/// Name of the leaf holding FreeOTP's token ordering.
pub const TOKEN_ORDER: &str = "tokenOrder";

/// A labelled token read from a backup.
#[derive(Debug, Clone)]
pub struct Entry {
    pub label: String,
    pub token: Token,
}

/// All tokens of a backup, in document order.
#[derive(Debug, Clone, Default)]
pub struct Backup {
    entries: Vec<Entry>,
}

impl Backup {
    /// Read and parse a backup file.
    pub fn open(path: impl AsRef<Path>) -> Result<Backup, Error> {
        let path = path.as_ref();
        let xml = std::fs::read_to_string(path)?;
        let backup = Backup::from_xml(&xml)?;
        tracing::info!("Loaded {} tokens from {}", backup.len(), path.display());
        Ok(backup)
    }

    /// Parse the content of a backup file.
    pub fn from_xml(xml: &str) -> Result<Backup, Error> {
        let mut reader = Reader::from_str(xml);
        let mut backup = Backup::default();

        // Depth 1 is the root element, depth 2 a leaf
        let mut depth = 0usize;
        let mut seen_root = false;
        let mut leaf: Option<(String, String)> = None;

        loop {
            match reader.read_event()? {
                Event::Start(ref e) => {
                    depth += 1;
                    match depth {
                        1 if seen_root => {
                            return Err(Error::Malformed("more than one root element".into()))
                        }
                        1 => seen_root = true,
                        2 => leaf = Some((leaf_name(e)?, String::new())),
                        _ => {}
                    }
                }
                Event::Empty(ref e) => match depth {
                    0 if seen_root => {
                        return Err(Error::Malformed("more than one root element".into()))
                    }
                    0 => seen_root = true,
                    1 => backup.insert(leaf_name(e)?, "")?,
                    _ => {}
                },
                Event::Text(ref e) if depth == 2 => {
                    if let Some((_, text)) = leaf.as_mut() {
                        text.push_str(&e.unescape()?);
                    }
                }
                Event::CData(ref e) if depth == 2 => {
                    if let Some((_, text)) = leaf.as_mut() {
                        text.push_str(&String::from_utf8_lossy(e));
                    }
                }
                Event::End(_) => {
                    if depth == 2 {
                        if let Some((name, text)) = leaf.take() {
                            backup.insert(name, &text)?;
                        }
                    }
                    depth = depth.saturating_sub(1);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !seen_root {
            return Err(Error::Malformed("no root element".into()));
        }
        if depth != 0 {
            return Err(Error::Malformed(format!(
                "unexpected end of document at position {}",
                reader.buffer_position()
            )));
        }
        Ok(backup)
    }

    fn insert(&mut self, label: String, json: &str) -> Result<(), Error> {
        if label == TOKEN_ORDER {
            tracing::debug!("Skipping {}", TOKEN_ORDER);
            return Ok(());
        }

        let token = Token::from_json(json).map_err(|source| Error::Json {
            label: label.clone(),
            source,
        })?;
        if token.secret.is_empty() {
            return Err(Error::InvalidSecretFormat(format!(
                "secret of \"{}\" is empty",
                label
            )));
        }

        match self.entries.iter_mut().find(|entry| entry.label == label) {
            Some(entry) => {
                tracing::warn!("Duplicate entry \"{}\", keeping the last one", label);
                entry.token = token;
            }
            None => self.entries.push(Entry { label, token }),
        }
        Ok(())
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Number of tokens, not counting the ordering leaf.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn leaf_name(e: &BytesStart) -> Result<String, Error> {
    match e
        .try_get_attribute("name")
        .map_err(quick_xml::Error::from)?
    {
        Some(attr) => Ok(attr.unescape_value()?.into_owned()),
        None => Err(Error::MissingName),
    }
}
