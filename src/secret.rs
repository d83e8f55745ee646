//! FreeOTP stores each token secret as a JSON array of signed bytes. This module
//! turns that array back into the base32 string an authenticator expects.
//!
//! # Examples
//!
//! ```
//! use freeotp_dump::secret::decode;
//!
//! // "foobar", as FreeOTP would store it
//! let raw = [102, 111, 111, 98, 97, 114];
//! assert_eq!(decode(&raw).unwrap().as_str(), "MZXW6YTBOI");
//!
//! // Sign bits are dropped: -1 is read as 0xff
//! assert_eq!(decode(&[-1]).unwrap().as_str(), "74");
//! ```

use constant_time_eq::constant_time_eq;
use serde::Deserialize;

use crate::Error;

/// Base32 symbols, indexed by 5-bit value.
pub const ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Bits read per output symbol.
const SHIFT: u32 = 5;
const MASK: u32 = (1 << SHIFT) - 1;

/// Number of symbols `decode` emits for `len` input bytes.
pub fn encoded_len(len: usize) -> usize {
    (len * 8 + SHIFT as usize - 1) / SHIFT as usize
}

/// Decode the signed byte array of a FreeOTP secret into base32.
///
/// Bytes are pushed into an accumulator 8 bits at a time and read back 5 bits at
/// a time, most significant bit first. When the input runs out with fewer than 5
/// bits left, the remainder is padded with zero bits up to one more symbol.
///
/// # Errors
///
/// Returns [`Error::InvalidSecretFormat`] if `raw` is empty.
pub fn decode(raw: &[i8]) -> Result<DecodedSecret, Error> {
    let (first, rest) = raw
        .split_first()
        .ok_or_else(|| Error::InvalidSecretFormat("secret is empty".to_string()))?;
    let mut rest = rest.iter();

    let mut buffer = u32::from(*first as u8);
    let mut bits_left = 8;
    let mut decoded = String::with_capacity(encoded_len(raw.len()));

    while bits_left > 0 || rest.len() > 0 {
        if bits_left < SHIFT {
            match rest.next() {
                Some(&byte) => {
                    buffer = (buffer << 8) | u32::from(byte as u8);
                    bits_left += 8;
                }
                // Only reached once, when the last byte has been consumed
                None => {
                    let pad = SHIFT - bits_left;
                    buffer <<= pad;
                    bits_left += pad;
                }
            }
        }
        let index = MASK & (buffer >> (bits_left - SHIFT));
        bits_left -= SHIFT;
        // Keep only the unread bits so the buffer never grows past 12 bits
        buffer &= (1 << bits_left) - 1;
        decoded.push(char::from(ALPHABET[index as usize]));
    }

    Ok(DecodedSecret(decoded))
}

/// Secret exactly as FreeOTP stores it: an array of signed bytes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
#[cfg_attr(feature = "zeroize", derive(zeroize::Zeroize, zeroize::ZeroizeOnDrop))]
pub struct RawSecret(Vec<i8>);

impl RawSecret {
    pub fn as_slice(&self) -> &[i8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The unsigned bytes of the secret, i.e. the HMAC key.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.iter().map(|&b| b as u8).collect()
    }

    /// See [`decode`].
    pub fn decode(&self) -> Result<DecodedSecret, Error> {
        decode(&self.0)
    }
}

impl From<Vec<i8>> for RawSecret {
    fn from(raw: Vec<i8>) -> Self {
        RawSecret(raw)
    }
}

/// Base32 encoded secret, ready to be typed into an authenticator. Treat it as sensitive.
#[derive(Debug, Clone, Eq)]
#[cfg_attr(feature = "zeroize", derive(zeroize::Zeroize, zeroize::ZeroizeOnDrop))]
pub struct DecodedSecret(String);

impl DecodedSecret {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode the base32 string back into the raw key.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        base32::decode(base32::Alphabet::Rfc4648 { padding: false }, &self.0)
            .ok_or_else(|| Error::InvalidSecretFormat(format!("\"{}\" is not base32", self.0)))
    }
}

impl PartialEq for DecodedSecret {
    fn eq(&self, other: &Self) -> bool {
        constant_time_eq(self.0.as_bytes(), other.0.as_bytes())
    }
}

impl std::fmt::Display for DecodedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const BASE32: &str = "OBWGC2LOFVZXI4TJNZTS243FMNZGK5BNGEZDG";
    const BYTES: [i8; 23] = [
        0x70, 0x6c, 0x61, 0x69, 0x6e, 0x2d, 0x73, 0x74, 0x72, 0x69, 0x6e, 0x67, 0x2d, 0x73, 0x65,
        0x63, 0x72, 0x65, 0x74, 0x2d, 0x31, 0x32, 0x33,
    ];

    fn decoded(raw: &[i8]) -> String {
        decode(raw).unwrap().as_str().to_string()
    }

    #[test]
    fn single_zero_byte() {
        assert_eq!(decoded(&[0]), "AA");
    }

    #[test]
    fn single_negative_byte() {
        assert_eq!(decoded(&[-1]), "74");
        assert_eq!(decoded(&[-128]), "QA");
    }

    #[test]
    fn two_zero_bytes() {
        assert_eq!(decoded(&[0, 0]), "AAAA");
    }

    #[test]
    fn rfc4648_vectors() {
        assert_eq!(decoded(&[102]), "MY");
        assert_eq!(decoded(&[102, 111]), "MZXQ");
        assert_eq!(decoded(&[102, 111, 111]), "MZXW6");
        assert_eq!(decoded(&[102, 111, 111, 98]), "MZXW6YQ");
        assert_eq!(decoded(&[102, 111, 111, 98, 97]), "MZXW6YTB");
    }

    #[test]
    fn plain_string_secret() {
        assert_eq!(decoded(&BYTES), BASE32);
    }

    #[test]
    fn negative_bytes_are_masked() {
        // 0xde 0xad 0xbe 0xef
        assert_eq!(decoded(&[-34, -83, -66, -17]), "32W353Y");
    }

    #[test]
    fn empty_secret() {
        assert!(matches!(decode(&[]), Err(Error::InvalidSecretFormat(_))));
        assert!(RawSecret::from(vec![]).decode().is_err());
    }

    #[test]
    fn raw_secret_from_json() {
        let raw: RawSecret = serde_json::from_str("[-1, 0, 127, -128]").unwrap();
        assert_eq!(raw.as_slice(), &[-1, 0, 127, -128]);
        assert_eq!(raw.to_bytes(), vec![0xff, 0x00, 0x7f, 0x80]);
        assert!(serde_json::from_str::<RawSecret>("[128]").is_err());
        assert!(serde_json::from_str::<RawSecret>("[-129]").is_err());
        assert!(serde_json::from_str::<RawSecret>("[1.5]").is_err());
    }

    #[test]
    fn decoded_secret_bytes() {
        let secret = decode(&BYTES).unwrap();
        let expected: Vec<u8> = BYTES.iter().map(|&b| b as u8).collect();
        assert_eq!(secret.to_bytes().unwrap(), expected);
        assert_eq!(secret.to_string(), BASE32);
    }

    #[test]
    fn decoded_secret_eq() {
        assert_eq!(decode(&[1, 2]).unwrap(), decode(&[1, 2]).unwrap());
        assert_ne!(decode(&[1, 2]).unwrap(), decode(&[1, 3]).unwrap());
    }

    proptest! {
        #[test]
        fn deterministic(raw in prop::collection::vec(any::<i8>(), 1..64)) {
            prop_assert_eq!(decode(&raw).unwrap(), decode(&raw).unwrap());
        }

        #[test]
        fn length_law(raw in prop::collection::vec(any::<i8>(), 1..64)) {
            let secret = decode(&raw).unwrap();
            prop_assert_eq!(secret.as_str().len(), encoded_len(raw.len()));
            prop_assert_eq!(secret.as_str().len(), (8 * raw.len() + 4) / 5);
        }

        #[test]
        fn alphabet_closure(raw in prop::collection::vec(any::<i8>(), 1..64)) {
            let secret = decode(&raw).unwrap();
            prop_assert!(secret.as_str().bytes().all(|c| ALPHABET.contains(&c)));
        }

        #[test]
        fn matches_unpadded_rfc4648(raw in prop::collection::vec(any::<i8>(), 1..64)) {
            let bytes = RawSecret::from(raw.clone()).to_bytes();
            let expected = base32::encode(base32::Alphabet::Rfc4648 { padding: false }, &bytes);
            let got = decode(&raw).unwrap();
            prop_assert_eq!(got.as_str(), expected.as_str());
        }
    }
}
