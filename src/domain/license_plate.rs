use std::fmt;
use std::str::FromStr;

use regex::Regex;

use serde::{Deserialize, Serialize};

/// Car license plate: 2-10 upper-case letters, digits or hyphens
#[derive(Debug, PartialEq, Eq, Hash, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LicensePlate(String);

impl FromStr for LicensePlate {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        lazy_static::lazy_static! {
            static ref PLATE_REGEX: Regex = Regex::new(r"^[A-Z0-9-]{2,10}$").unwrap();
        }

        // Normalize
        let value = value.trim().to_uppercase();

        if value.is_empty() {
            return Err("License plate cannot be empty".into());
        }
        if !PLATE_REGEX.is_match(&value) {
            return Err(
                "License plate must be 2-10 characters (letters, numbers, hyphens only)".into(),
            );
        }

        Ok(Self(value))
    }
}

impl TryFrom<String> for LicensePlate {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LicensePlate> for String {
    fn from(value: LicensePlate) -> Self {
        value.0
    }
}

impl AsRef<str> for LicensePlate {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LicensePlate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
