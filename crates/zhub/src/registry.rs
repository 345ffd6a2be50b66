use core::fmt;

use crate::macros::cluster;
use crate::state::StateField;

/// Identifiers of the clusters known to the hub.
pub mod cluster_id {
    /// `Basic` cluster identifier.
    pub const BASIC: u16 = 0x0000;
    /// `Power Configuration` cluster identifier.
    pub const POWER_CONFIGURATION: u16 = 0x0001;
    /// `On/Off` cluster identifier.
    pub const ON_OFF: u16 = 0x0006;
    /// `Level Control` cluster identifier.
    pub const LEVEL_CONTROL: u16 = 0x0008;
    /// `Door Lock` cluster identifier.
    pub const DOOR_LOCK: u16 = 0x0101;
    /// `Illuminance Measurement` cluster identifier.
    pub const ILLUMINANCE_MEASUREMENT: u16 = 0x0400;
    /// `Temperature Measurement` cluster identifier.
    pub const TEMPERATURE_MEASUREMENT: u16 = 0x0402;
    /// `Relative Humidity Measurement` cluster identifier.
    pub const RELATIVE_HUMIDITY_MEASUREMENT: u16 = 0x0405;
    /// `IAS Zone` cluster identifier.
    pub const IAS_ZONE: u16 = 0x0500;
}

/// The type of an attribute value, as tagged on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireType {
    /// Boolean.
    Boolean,
    /// 8-bit bitmap.
    Bitmap8,
    /// 16-bit bitmap.
    Bitmap16,
    /// Unsigned 8-bit integer.
    Uint8,
    /// Unsigned 16-bit integer.
    Uint16,
    /// Unsigned 32-bit integer.
    Uint32,
    /// Signed 8-bit integer.
    Int8,
    /// Signed 16-bit integer.
    Int16,
    /// Signed 32-bit integer.
    Int32,
    /// 8-bit enumeration.
    Enum8,
    /// Character string.
    CharString,
}

/// All [`WireType`]s.
pub const ALL_WIRE_TYPES: &[WireType] = &[
    WireType::Boolean,
    WireType::Bitmap8,
    WireType::Bitmap16,
    WireType::Uint8,
    WireType::Uint16,
    WireType::Uint32,
    WireType::Int8,
    WireType::Int16,
    WireType::Int32,
    WireType::Enum8,
    WireType::CharString,
];

impl WireType {
    /// Returns the tag identifying the [`WireType`] on the wire.
    #[must_use]
    pub const fn tag(&self) -> u8 {
        match self {
            Self::Boolean => 0x10,
            Self::Bitmap8 => 0x18,
            Self::Bitmap16 => 0x19,
            Self::Uint8 => 0x20,
            Self::Uint16 => 0x21,
            Self::Uint32 => 0x23,
            Self::Int8 => 0x28,
            Self::Int16 => 0x29,
            Self::Int32 => 0x2B,
            Self::Enum8 => 0x30,
            Self::CharString => 0x42,
        }
    }

    /// Returns the [`WireType`] associated with the given tag.
    #[must_use]
    pub fn from_tag(tag: u8) -> Option<Self> {
        ALL_WIRE_TYPES
            .iter()
            .find(|wire_type| wire_type.tag() == tag)
            .copied()
    }

    /// Returns the number of bytes of a value, if the size is fixed.
    #[must_use]
    pub const fn width(&self) -> Option<usize> {
        match self {
            Self::Boolean | Self::Bitmap8 | Self::Uint8 | Self::Int8 | Self::Enum8 => Some(1),
            Self::Bitmap16 | Self::Uint16 | Self::Int16 => Some(2),
            Self::Uint32 | Self::Int32 => Some(4),
            Self::CharString => None,
        }
    }

    /// Checks whether values are two's-complement signed integers.
    #[must_use]
    pub const fn is_signed(&self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int32)
    }

    /// Returns the [`WireType`] name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Bitmap8 => "bitmap8",
            Self::Bitmap16 => "bitmap16",
            Self::Uint8 => "uint8",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Enum8 => "enum8",
            Self::CharString => "string",
        }
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02X})", self.name(), self.tag())
    }
}

/// How an attribute value is turned into a state value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoder {
    /// The state is `true` when the value equals the sentinel.
    ///
    /// The polarity depends on the attribute.
    Flag {
        /// The value meaning `true`.
        sentinel: i64,
    },
    /// The value is kept as it is.
    Integer,
    /// An unsigned 8-bit value rescaled to a `0..=100` percentage.
    Percentage,
    /// A `NUL`-terminated `ASCII` text.
    Text,
}

/// The description of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeDescriptor {
    /// Attribute identifier.
    pub id: u16,
    /// Attribute [`WireType`].
    pub wire_type: WireType,
    /// The [`StateField`] populated by the attribute.
    pub field: StateField,
    /// The [`Decoder`] of the attribute value.
    pub decoder: Decoder,
}

/// The description of a cluster and the attributes the hub understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterDescriptor {
    /// Cluster identifier.
    pub id: u16,
    /// Cluster name.
    pub name: &'static str,
    /// Cluster attributes.
    pub attributes: &'static [AttributeDescriptor],
}

impl ClusterDescriptor {
    /// Returns the [`AttributeDescriptor`] with the given identifier.
    #[must_use]
    pub fn attribute(&self, id: u16) -> Option<&'static AttributeDescriptor> {
        self.attributes.iter().find(|attribute| attribute.id == id)
    }
}

// Sentinel of a report which means `true`.
const TRUE_SENTINEL: Decoder = Decoder::Flag { sentinel: 1 };
// A door lock reports `0` when its contact is closed.
const CLOSED_SENTINEL: Decoder = Decoder::Flag { sentinel: 0 };

cluster!(BASIC, cluster_id::BASIC, "Basic", attributes: [
    0x0004 => CharString, Manufacturer, Decoder::Text;
    0x0005 => CharString, Model, Decoder::Text;
]);

cluster!(POWER_CONFIGURATION, cluster_id::POWER_CONFIGURATION, "Power Configuration", attributes: [
    0x0021 => Uint8, Battery, Decoder::Integer;
]);

cluster!(ON_OFF, cluster_id::ON_OFF, "On/Off", attributes: [
    0x0000 => Boolean, On, TRUE_SENTINEL;
]);

cluster!(LEVEL_CONTROL, cluster_id::LEVEL_CONTROL, "Level Control", attributes: [
    0x0000 => Uint8, Brightness, Decoder::Percentage;
]);

cluster!(DOOR_LOCK, cluster_id::DOOR_LOCK, "Door Lock", attributes: [
    0x0000 => Enum8, Contact, CLOSED_SENTINEL;
]);

cluster!(ILLUMINANCE_MEASUREMENT, cluster_id::ILLUMINANCE_MEASUREMENT, "Illuminance Measurement", attributes: [
    0x0000 => Uint16, Lux, Decoder::Integer;
]);

cluster!(TEMPERATURE_MEASUREMENT, cluster_id::TEMPERATURE_MEASUREMENT, "Temperature Measurement", attributes: [
    0x0000 => Int16, Temperature, Decoder::Integer;
]);

cluster!(RELATIVE_HUMIDITY_MEASUREMENT, cluster_id::RELATIVE_HUMIDITY_MEASUREMENT, "Relative Humidity Measurement", attributes: [
    0x0000 => Uint16, Humidity, Decoder::Integer;
]);

cluster!(IAS_ZONE, cluster_id::IAS_ZONE, "IAS Zone", attributes: [
    0x0002 => Bitmap16, Motion, TRUE_SENTINEL;
]);

/// All clusters understood by the hub.
pub const HOME_AUTOMATION_CLUSTERS: &[ClusterDescriptor] = &[
    BASIC,
    POWER_CONFIGURATION,
    ON_OFF,
    LEVEL_CONTROL,
    DOOR_LOCK,
    ILLUMINANCE_MEASUREMENT,
    TEMPERATURE_MEASUREMENT,
    RELATIVE_HUMIDITY_MEASUREMENT,
    IAS_ZONE,
];

/// An immutable table of [`ClusterDescriptor`]s.
///
/// The table is defined at compile time, so looking an attribute up never
/// allocates. A missing entry is an expected outcome: many attributes are
/// simply irrelevant to the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeRegistry {
    clusters: &'static [ClusterDescriptor],
}

impl Default for AttributeRegistry {
    fn default() -> Self {
        Self::home_automation()
    }
}

impl AttributeRegistry {
    /// Creates an [`AttributeRegistry`] containing
    /// [`HOME_AUTOMATION_CLUSTERS`].
    #[must_use]
    pub const fn home_automation() -> Self {
        Self::new(HOME_AUTOMATION_CLUSTERS)
    }

    /// Creates an [`AttributeRegistry`] from a custom table.
    #[must_use]
    pub const fn new(clusters: &'static [ClusterDescriptor]) -> Self {
        Self { clusters }
    }

    /// Returns the [`ClusterDescriptor`] with the given identifier.
    #[must_use]
    pub fn cluster(&self, cluster_id: u16) -> Option<&'static ClusterDescriptor> {
        self.clusters.iter().find(|cluster| cluster.id == cluster_id)
    }

    /// Returns the [`AttributeDescriptor`] of an attribute within a cluster.
    #[must_use]
    #[inline]
    pub fn lookup(&self, cluster_id: u16, attribute_id: u16) -> Option<&'static AttributeDescriptor> {
        self.cluster(cluster_id)?.attribute(attribute_id)
    }

    /// Returns an iterator over the [`ClusterDescriptor`]s.
    #[inline]
    pub fn clusters(&self) -> core::slice::Iter<'static, ClusterDescriptor> {
        self.clusters.iter()
    }
}
