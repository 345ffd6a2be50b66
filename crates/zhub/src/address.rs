use alloc::string::String;

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};

use crate::error::{Error, ErrorKind};
use crate::hex::{is_hex, strip_prefix};

// Number of hex digits of an `EUI-64`.
const EUI64_DIGITS: usize = 16;

/// The 64-bit unique address of a Zigbee device.
///
/// It is always rendered as 16 upper-case hexadecimal digits, without the
/// `0x` network-address prefix, which is the form expected by the
/// coprocessor command lines.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Eui64(u64);

impl Eui64 {
    /// Creates an [`Eui64`] from its numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Parses an [`Eui64`].
    ///
    /// An optional `0x` or `0X` prefix is accepted, as well as lower-case
    /// digits.
    ///
    /// # Errors
    ///
    /// An error is returned when the text, once the prefix is removed, is not
    /// made of exactly 16 hexadecimal digits.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let digits = strip_prefix(text.trim());
        if digits.len() != EUI64_DIGITS || !is_hex(digits) {
            return Err(Error::new(
                ErrorKind::InvalidAddress,
                alloc::format!("`{text}` is not a 16 hex digits EUI-64"),
            ));
        }

        u64::from_str_radix(digits, 16).map(Self).map_err(|e| {
            Error::new(
                ErrorKind::InvalidAddress,
                alloc::format!("`{text}` is not a valid EUI-64: {e}"),
            )
        })
    }

    /// Returns the numeric value.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Eui64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016X}", self.0)
    }
}

impl fmt::Debug for Eui64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Eui64({self})")
    }
}

impl FromStr for Eui64 {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Eui64 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Eui64 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(D::Error::custom)
    }
}

/// The address of a single endpoint of a Zigbee device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceAddress {
    /// Device `EUI-64`.
    pub eui64: Eui64,
    /// Device endpoint.
    pub endpoint: u8,
}

impl DeviceAddress {
    /// Creates a [`DeviceAddress`].
    #[must_use]
    pub const fn new(eui64: Eui64, endpoint: u8) -> Self {
        Self { eui64, endpoint }
    }

    /// Parses a [`DeviceAddress`] from a textual `EUI-64` and an endpoint.
    ///
    /// # Errors
    ///
    /// An error is returned when the `EUI-64` is malformed.
    pub fn parse(eui64: &str, endpoint: u8) -> Result<Self, Error> {
        Ok(Self::new(Eui64::parse(eui64)?, endpoint))
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.eui64, self.endpoint)
    }
}
