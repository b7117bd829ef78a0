//! Identity documents a renter supplies when booking a car.

use std::fmt;
use std::str::FromStr;

use regex::Regex;

use serde::{Deserialize, Serialize};

use unicode_segmentation::UnicodeSegmentation;

const MAX_PHONE_LEN: usize = 32;

/// Belgian national register number, formatted `yy.mm.dd-xxx.zz`.
/// Redacted in debug output so spans and logs never carry it.
#[derive(PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NationalRegisterId(String);

impl FromStr for NationalRegisterId {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        lazy_static::lazy_static! {
            static ref REGISTER_ID_REGEX: Regex =
                Regex::new(r"^\d{2}\.\d{2}\.\d{2}-\d{3}\.\d{2}$").unwrap();
        }

        let value = value.trim();
        if !REGISTER_ID_REGEX.is_match(value) {
            return Err("National register id must be formatted as yy.mm.dd-xxx.zz".into());
        }
        Ok(Self(value.to_string()))
    }
}

/// Driving license number, exactly ten digits. Redacted in debug output.
#[derive(PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DrivingLicenseNumber(String);

impl FromStr for DrivingLicenseNumber {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if value.len() != 10 || !value.chars().all(|c| c.is_ascii_digit()) {
            return Err("Driving license number must consist of exactly 10 digits".into());
        }
        Ok(Self(value.to_string()))
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhoneNumber(String);

impl FromStr for PhoneNumber {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if value.is_empty() {
            return Err("Phone number cannot be empty".into());
        }
        if value.graphemes(true).count() > MAX_PHONE_LEN {
            return Err("Phone number too long".into());
        }
        let allowed = |c: char| c.is_ascii_digit() || matches!(c, '+' | ' ' | '/' | '.' | '-');
        if !value.chars().all(allowed) || !value.chars().any(|c| c.is_ascii_digit()) {
            return Err("Phone number contains invalid characters".into());
        }
        Ok(Self(value.to_string()))
    }
}

macro_rules! string_conversions {
    ($($ty:ident),*) => {
        $(
            impl TryFrom<String> for $ty {
                type Error = String;

                fn try_from(value: String) -> Result<Self, Self::Error> {
                    value.parse()
                }
            }

            impl From<$ty> for String {
                fn from(value: $ty) -> Self {
                    value.0
                }
            }

            impl AsRef<str> for $ty {
                fn as_ref(&self) -> &str {
                    &self.0
                }
            }
        )*
    };
}

string_conversions!(NationalRegisterId, DrivingLicenseNumber, PhoneNumber);

impl fmt::Debug for NationalRegisterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NationalRegisterId([REDACTED])")
    }
}

impl fmt::Debug for DrivingLicenseNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DrivingLicenseNumber([REDACTED])")
    }
}
