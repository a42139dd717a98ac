//! Kenyan mobile phone numbers.
//!
//! M-Pesa STK push requires the subscriber number in MSISDN form
//! (`2547XXXXXXXX` or `2541XXXXXXXX`). Customers type numbers in many shapes,
//! so parsing normalizes every accepted input to that form.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`PhoneNumber`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneNumberError {
    /// The input is empty.
    #[error("phone number cannot be empty")]
    Empty,
    /// The input contains characters other than digits, spaces, dashes or a
    /// leading `+254`.
    #[error("phone number contains invalid characters")]
    InvalidCharacters,
    /// The input is not a Kenyan mobile number.
    #[error("phone number must be a Kenyan mobile number (07XX or 01XX)")]
    NotKenyanMobile,
}

/// A normalized Kenyan mobile number in MSISDN form.
///
/// ## Examples
///
/// ```
/// use solarshop_core::PhoneNumber;
///
/// let phone = PhoneNumber::parse_kenyan("0712 345 678").unwrap();
/// assert_eq!(phone.as_str(), "254712345678");
///
/// assert!(PhoneNumber::parse_kenyan("+254112345678").is_ok());
/// assert!(PhoneNumber::parse_kenyan("0201234567").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Parse and normalize a Kenyan mobile number.
    ///
    /// Accepts `07XXXXXXXX`, `01XXXXXXXX`, `7XXXXXXXX`, `1XXXXXXXX`,
    /// `2547XXXXXXXX`, `+2547XXXXXXXX` (and the `1` prefixed equivalents).
    /// Spaces and dashes are ignored. A `+` must be followed by `254`.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, contains unexpected characters,
    /// or is not a Kenyan mobile number.
    pub fn parse_kenyan(s: &str) -> Result<Self, PhoneNumberError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(PhoneNumberError::Empty);
        }

        let (international, rest) = match trimmed.strip_prefix('+') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let mut digits = String::with_capacity(rest.len());
        for c in rest.chars() {
            match c {
                '0'..='9' => digits.push(c),
                ' ' | '-' => {}
                _ => return Err(PhoneNumberError::InvalidCharacters),
            }
        }

        // `+` only introduces the country code.
        if international && !digits.starts_with("254") {
            return Err(PhoneNumberError::InvalidCharacters);
        }

        let subscriber = if let Some(rest) = digits.strip_prefix("254") {
            rest
        } else if let Some(rest) = digits.strip_prefix('0') {
            rest
        } else {
            digits.as_str()
        };

        let valid = subscriber.len() == 9
            && (subscriber.starts_with('7') || subscriber.starts_with('1'));
        if !valid {
            return Err(PhoneNumberError::NotKenyanMobile);
        }

        Ok(Self(format!("254{subscriber}")))
    }

    /// Returns the MSISDN as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Masked form for logs, e.g. `2547****5678`.
    #[must_use]
    pub fn masked(&self) -> String {
        let head = self.0.get(..4).unwrap_or_default();
        let tail = self.0.get(self.0.len().saturating_sub(4)..).unwrap_or_default();
        format!("{head}****{tail}")
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PhoneNumber {
    type Err = PhoneNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_kenyan(s)
    }
}
