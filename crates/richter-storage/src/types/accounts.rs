//! Account types: identity, role, verification state.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AccountId;

/// Account role. Accounts are created `Standard` and only ever promoted explicitly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Standard,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Standard => "standard",
            Role::Admin => "admin",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(Role::Standard),
            "admin" => Ok(Role::Admin),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// Fixed-width numeric verification code.
///
/// Stored and compared as an unsigned integer, rendered as exactly
/// [`VerificationCode::DIGITS`] zero-padded digits.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct VerificationCode(u32);

impl VerificationCode {
    pub const DIGITS: usize = 8;
    /// Exclusive upper bound of the numeric value (10^DIGITS).
    pub const UPPER: u32 = 100_000_000;

    /// Wrap a numeric value; `None` when it does not fit in `DIGITS` digits.
    pub fn new(value: u32) -> Option<Self> {
        (value < Self::UPPER).then_some(Self(value))
    }

    /// Reduce an arbitrary value into range.
    pub fn wrapping(value: u32) -> Self {
        Self(value % Self::UPPER)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for VerificationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$}", self.0, width = Self::DIGITS)
    }
}

// Codes are secrets; keep them out of debug output and logs.
impl fmt::Debug for VerificationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VerificationCode(********)")
    }
}

/// Error parsing a verification code from its textual form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidCode;

impl fmt::Display for InvalidCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "verification code must be exactly {} digits",
            VerificationCode::DIGITS
        )
    }
}

impl std::error::Error for InvalidCode {}

impl FromStr for VerificationCode {
    type Err = InvalidCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != Self::DIGITS || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidCode);
        }
        s.parse::<u32>()
            .ok()
            .and_then(Self::new)
            .ok_or(InvalidCode)
    }
}

/// Account record.
///
/// The verification code is deliberately not serialized: it must only ever leave the
/// server inside the verification email.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    #[serde(rename = "_id")]
    pub id: AccountId,
    pub email: String, // Normalized (trimmed, lowercased), unique
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "photoURL", skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    pub role: Role,
    pub verified: bool,
    #[serde(skip)]
    pub verification_code: VerificationCode,
    /// Reference to the mirrored record at the identity provider.
    #[serde(rename = "uid", skip_serializing_if = "Option::is_none")]
    pub external_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Parameters for creating a pending account.
#[derive(Clone, Debug)]
pub struct CreateAccountParams {
    pub email: String,
    pub name: Option<String>,
    pub photo_url: Option<String>,
    pub external_ref: Option<String>,
    pub verification_code: VerificationCode,
}
