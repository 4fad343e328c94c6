//! Passenger and payment data carried by a booking.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Contact and identity details of the traveler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalDetails {
    pub name: String,
    pub mobile: String,
    /// National identity card number
    pub nic: String,
    pub email: String,
}

/// Card scheme chosen at payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardBrand {
    Visa,
    Mastercard,
}

impl CardBrand {
    /// Parse a brand as submitted by the payment form, ignoring case.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "visa" => Some(Self::Visa),
            "mastercard" => Some(Self::Mastercard),
            _ => None,
        }
    }

    /// Label shown on the confirmation page.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Visa => "Visa card",
            Self::Mastercard => "Mastercard",
        }
    }
}

impl fmt::Display for CardBrand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Visa => "visa",
            Self::Mastercard => "mastercard",
        })
    }
}
