//! Identity types for the escrow bot
//!
//! Chat and user identifiers come from the chat transport and are opaque
//! signed integers. Ticket identifiers are short, human-shareable codes.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Length of a ticket code
pub const TICKET_ID_LEN: usize = 8;

/// Macro to generate transport-issued ID types with common implementations
macro_rules! define_numeric_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Wrap a raw transport identifier
            pub fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Get the raw transport identifier
            pub fn get(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }
    };
}

define_numeric_id!(ChatId, "Identifier of the chat or group a ticket belongs to");
define_numeric_id!(UserId, "Identifier of a chat participant");

/// Human-shareable ticket code: 8 uppercase hexadecimal characters
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(String);

impl TicketId {
    /// Draw a fresh random code from a v4 UUID
    ///
    /// Codes are not guaranteed unique; the registry re-rolls on collision.
    pub fn generate() -> Self {
        let simple = Uuid::new_v4().simple().to_string();
        Self(simple[..TICKET_ID_LEN].to_ascii_uppercase())
    }

    /// Parse a user-supplied code (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.len() == TICKET_ID_LEN && s.chars().all(|c| c.is_ascii_hexdigit()) {
            Some(Self(s.to_ascii_uppercase()))
        } else {
            None
        }
    }

    /// Borrow the code as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TicketId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
