use alloc::string::String;

use core::fmt;

use hashbrown::DefaultHashBuilder;

use indexmap::map::{IndexMap, Iter};

use serde::{Deserialize, Serialize};

/// A device state field populated by an attribute report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateField {
    /// Whether a device is switched on.
    On,
    /// Light brightness as a percentage.
    Brightness,
    /// Temperature in hundredths of a degree Celsius.
    Temperature,
    /// Relative humidity in hundredths of a percent.
    Humidity,
    /// Illuminance measured value.
    Lux,
    /// Remaining battery.
    Battery,
    /// Manufacturer name.
    Manufacturer,
    /// Model identifier.
    Model,
    /// Whether a motion has been detected.
    Motion,
    /// Whether a contact is closed.
    Contact,
}

impl StateField {
    /// Returns the [`StateField`] name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Brightness => "brightness",
            Self::Temperature => "temperature",
            Self::Humidity => "humidity",
            Self::Lux => "lux",
            Self::Battery => "battery",
            Self::Manufacturer => "manufacturer",
            Self::Model => "model",
            Self::Motion => "motion",
            Self::Contact => "contact",
        }
    }
}

impl fmt::Display for StateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded state value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateValue {
    /// A boolean.
    Bool(bool),
    /// An integer.
    Integer(i64),
    /// A text.
    Text(String),
}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => fmt::Display::fmt(value, f),
            Self::Integer(value) => fmt::Display::fmt(value, f),
            Self::Text(value) => write!(f, "\"{value}\""),
        }
    }
}

/// A sparse update of a device state.
///
/// Only the fields contained in a report are present. An empty delta means
/// that nothing has to be updated.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceStateDelta(IndexMap<StateField, StateValue, DefaultHashBuilder>);

impl fmt::Display for DeviceStateDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (field, value) in &self.0 {
            writeln!(f, "{field}: {value}")?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a DeviceStateDelta {
    type Item = (&'a StateField, &'a StateValue);
    type IntoIter = Iter<'a, StateField, StateValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl DeviceStateDelta {
    /// Creates an empty [`DeviceStateDelta`].
    #[must_use]
    #[inline]
    pub fn empty() -> Self {
        Self(IndexMap::with_hasher(DefaultHashBuilder::default()))
    }

    /// Creates a [`DeviceStateDelta`] containing a single field.
    #[must_use]
    #[inline]
    pub fn single(field: StateField, value: StateValue) -> Self {
        Self::empty().with(field, value)
    }

    /// Sets a field while constructing a [`DeviceStateDelta`].
    #[must_use]
    #[inline]
    pub fn with(mut self, field: StateField, value: StateValue) -> Self {
        self.insert(field, value);
        self
    }

    /// Sets a field, replacing its previous value.
    #[inline]
    pub fn insert(&mut self, field: StateField, value: StateValue) {
        let _ = self.0.insert(field, value);
    }

    /// Returns the value of a field, if present.
    #[must_use]
    #[inline]
    pub fn get(&self, field: StateField) -> Option<&StateValue> {
        self.0.get(&field)
    }

    /// Merges another [`DeviceStateDelta`] into this one.
    ///
    /// Fields present in both deltas take the value of `other`.
    #[inline]
    pub fn merge(&mut self, other: Self) {
        self.0.extend(other.0);
    }

    /// Returns an iterator over the fields and their values.
    #[inline]
    pub fn iter(&self) -> Iter<'_, StateField, StateValue> {
        self.0.iter()
    }

    /// Returns the number of fields.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Checks whether the delta is empty.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use serde_json::json;

    use crate::{deserialize, serialize};

    use super::{DeviceStateDelta, StateField, StateValue};

    #[test]
    fn empty_delta() {
        let delta = DeviceStateDelta::empty();
        assert!(delta.is_empty());
        assert_eq!(delta, DeviceStateDelta::default());
        assert_eq!(serialize(&delta), json!({}));
    }

    #[test]
    fn flat_json() {
        let delta = DeviceStateDelta::single(StateField::Brightness, StateValue::Integer(50))
            .with(StateField::On, StateValue::Bool(true))
            .with(StateField::Model, StateValue::Text("TRADFRI".into()));

        let value = json!({
            "brightness": 50,
            "on": true,
            "model": "TRADFRI",
        });

        assert_eq!(serialize(&delta), value);
        assert_eq!(deserialize::<DeviceStateDelta>(value), delta);
    }

    #[test]
    fn merge_overrides() {
        let mut delta = DeviceStateDelta::single(StateField::On, StateValue::Bool(false))
            .with(StateField::Lux, StateValue::Integer(10));
        delta.merge(DeviceStateDelta::single(
            StateField::On,
            StateValue::Bool(true),
        ));

        assert_eq!(delta.len(), 2);
        assert_eq!(delta.get(StateField::On), Some(&StateValue::Bool(true)));
        assert_eq!(delta.get(StateField::Lux), Some(&StateValue::Integer(10)));
        assert_eq!(delta.get(StateField::Contact), None);
    }

    #[test]
    fn display() {
        let delta = DeviceStateDelta::single(StateField::Temperature, StateValue::Integer(-550));
        assert_eq!(delta.to_string(), "temperature: -550\n");
        assert_eq!(StateField::Manufacturer.to_string(), "manufacturer");
    }
}
