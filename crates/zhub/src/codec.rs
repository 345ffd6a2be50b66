use alloc::string::String;

use log::debug;

use crate::hex::{is_hex, to_bytes};
use crate::registry::{AttributeDescriptor, AttributeRegistry, Decoder, WireType};
use crate::state::{DeviceStateDelta, StateValue};

/// Command identifier of a `Report Attributes` message.
///
/// Its records lack the status byte carried by read responses, so the type
/// tag and the value start two hex digits earlier.
pub const REPORT_ATTRIBUTES: u8 = 0x0A;

// A successful read status.
const STATUS_SUCCESS: u8 = 0x00;

// Byte values below this one cannot be printable characters, so a leading
// one is the length octet of a `ZCL` string.
const FIRST_PRINTABLE: u8 = 0x20;

// Last printable `ASCII` character.
const LAST_PRINTABLE: u8 = 0x7E;

/// A raw attribute report, as received from the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawAttributeReport<'a> {
    /// Cluster identifier.
    pub cluster_id: u16,
    /// Command identifier.
    pub command_id: u8,
    /// Hex-encoded command data.
    pub raw_hex: &'a str,
}

impl<'a> RawAttributeReport<'a> {
    /// Creates a [`RawAttributeReport`].
    #[must_use]
    pub const fn new(cluster_id: u16, command_id: u8, raw_hex: &'a str) -> Self {
        Self {
            cluster_id,
            command_id,
            raw_hex,
        }
    }
}

// The fields of a single attribute record.
#[derive(Debug, PartialEq)]
struct AttributeRecord<'a> {
    attribute_id: u16,
    type_tag: u8,
    payload: &'a str,
}

impl<'a> AttributeRecord<'a> {
    // Splits the record by fixed character offsets.
    fn parse(command_id: u8, raw_hex: &'a str) -> Option<Self> {
        // Attribute identifiers are stored low byte first.
        let attribute_id = u16::from_le_bytes(to_bytes(raw_hex.get(0..4)?)?.try_into().ok()?);

        let type_offset = if command_id == REPORT_ATTRIBUTES {
            4
        } else {
            let status = u8::from_str_radix(raw_hex.get(4..6)?, 16).ok()?;
            if status != STATUS_SUCCESS {
                debug!("Attribute 0x{attribute_id:04X} read failed with status 0x{status:02X}");
                return None;
            }
            6
        };

        let type_tag = u8::from_str_radix(raw_hex.get(type_offset..type_offset + 2)?, 16).ok()?;
        let payload = raw_hex.get(type_offset + 2..)?;

        Some(Self {
            attribute_id,
            type_tag,
            payload,
        })
    }
}

/// A decoder of attribute reports.
///
/// It turns a [`RawAttributeReport`] into a [`DeviceStateDelta`] using the
/// [`AttributeRegistry`] to find out what a report means.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttributeCodec {
    registry: AttributeRegistry,
}

impl AttributeCodec {
    /// Creates an [`AttributeCodec`] with the given [`AttributeRegistry`].
    #[must_use]
    pub const fn new(registry: AttributeRegistry) -> Self {
        Self { registry }
    }

    /// Returns the [`AttributeRegistry`].
    #[must_use]
    pub const fn registry(&self) -> &AttributeRegistry {
        &self.registry
    }

    /// Decodes a [`RawAttributeReport`] into a [`DeviceStateDelta`].
    ///
    /// A report carries at most one attribute, hence the delta contains at
    /// most one field.
    ///
    /// Decoding never fails: an empty, malformed, unknown or mistyped
    /// report produces an empty [`DeviceStateDelta`].
    #[must_use]
    pub fn decode(&self, report: &RawAttributeReport<'_>) -> DeviceStateDelta {
        let Some((descriptor, payload)) = self.match_record(report) else {
            return DeviceStateDelta::empty();
        };

        if let Some(value) = decode_value(descriptor, payload) {
            DeviceStateDelta::single(descriptor.field, value)
        } else {
            debug!(
                "Malformed `{}` value in report `{}`, discard it",
                descriptor.field, report.raw_hex
            );
            DeviceStateDelta::empty()
        }
    }

    // Finds the descriptor of the reported attribute along with its payload.
    fn match_record<'a>(
        &self,
        report: &RawAttributeReport<'a>,
    ) -> Option<(&'static AttributeDescriptor, &'a str)> {
        let raw_hex = report.raw_hex;
        if raw_hex.is_empty() {
            return None;
        }

        if !is_hex(raw_hex) {
            debug!("Report `{raw_hex}` is not hexadecimal, discard it");
            return None;
        }

        let Some(record) = AttributeRecord::parse(report.command_id, raw_hex) else {
            debug!("Report `{raw_hex}` has a truncated header, discard it");
            return None;
        };

        if record.payload.is_empty() || record.payload.len() % 2 != 0 {
            debug!("Report `{raw_hex}` has a malformed payload, discard it");
            return None;
        }

        let Some(descriptor) = self
            .registry
            .lookup(report.cluster_id, record.attribute_id)
        else {
            debug!(
                "Attribute 0x{:04X} of cluster 0x{:04X} not understood",
                record.attribute_id, report.cluster_id
            );
            return None;
        };

        if descriptor.wire_type.tag() != record.type_tag {
            debug!(
                "Attribute 0x{:04X} of cluster 0x{:04X} has type tag 0x{:02X}, expected {}",
                record.attribute_id, report.cluster_id, record.type_tag, descriptor.wire_type
            );
            return None;
        }

        Some((descriptor, record.payload))
    }
}

fn decode_value(descriptor: &AttributeDescriptor, payload: &str) -> Option<StateValue> {
    let wire_type = descriptor.wire_type;

    match descriptor.decoder {
        Decoder::Text => decode_text(payload).map(StateValue::Text),
        Decoder::Flag { sentinel } => {
            decode_integer(wire_type, payload).map(|value| StateValue::Bool(value == sentinel))
        }
        Decoder::Integer => decode_integer(wire_type, payload).map(StateValue::Integer),
        Decoder::Percentage => decode_integer(wire_type, payload)
            .filter(|value| (0..=i64::from(u8::MAX)).contains(value))
            .map(|value| StateValue::Integer(to_percentage(value))),
    }
}

// Decodes a fixed-size integer.
//
// Values travel least significant byte first. Only the bytes belonging to
// the value are read.
fn decode_integer(wire_type: WireType, payload: &str) -> Option<i64> {
    let width = wire_type.width()?;
    let value = to_bytes(payload.get(..width * 2)?)?
        .iter()
        .rev()
        .fold(0u64, |value, &byte| (value << 8) | u64::from(byte));

    if wire_type.is_signed() {
        // Sign-extend the two's-complement value.
        let shift = 64 - 8 * width as u32;
        Some(((value << shift) as i64) >> shift)
    } else {
        i64::try_from(value).ok()
    }
}

// Rescales a `0..=255` value to `0..=100`, rounding half up.
const fn to_percentage(value: i64) -> i64 {
    (value * 200 + 255) / 510
}

// Decodes a printable `ASCII` string.
//
// A `ZCL` string starts with its length octet. Gateways may also forward a
// plain `NUL`-terminated string, so the first byte is a length octet only
// when it cannot be a character or when it matches the number of remaining
// bytes.
fn decode_text(payload: &str) -> Option<String> {
    let bytes = to_bytes(payload)?;
    let (&first, rest) = bytes.split_first()?;

    let characters = if first < FIRST_PRINTABLE || usize::from(first) == rest.len() {
        rest.get(..usize::from(first))?
    } else {
        bytes.as_slice()
    };

    let mut text = String::with_capacity(characters.len());
    for &byte in characters {
        if byte == 0 {
            break;
        }
        if !(FIRST_PRINTABLE..=LAST_PRINTABLE).contains(&byte) {
            return None;
        }
        text.push(char::from(byte));
    }

    (!text.is_empty()).then_some(text)
}
