// Copyright 2026 the Updraft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Typed node properties.
//!
//! Properties are a closed set of styling-oriented keys with sum-typed
//! values. String keys from host styling layers are resolved once at this
//! boundary via [`PropKey::resolve`], which reports unknown keys as an
//! ordinary error instead of storing them blindly; everything past the
//! boundary works with the enum directly.
//!
//! Property *semantics* (how fill colors or z-order affect rendering) belong
//! to the driver. The store only records values and invalidates the owning
//! node on change.

use alloc::string::String;
use core::fmt;

/// A property key from the closed styling set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PropKey {
    /// Whether the node's subtree contributes visual output.
    Visible,
    /// Uniform opacity applied to the node's subtree.
    Opacity,
    /// Fill paint identifier.
    Fill,
    /// Stroke paint identifier.
    Stroke,
    /// Display label text.
    Label,
    /// Stacking order among siblings.
    ZIndex,
}

impl PropKey {
    /// All keys, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Visible,
        Self::Opacity,
        Self::Fill,
        Self::Stroke,
        Self::Label,
        Self::ZIndex,
    ];

    /// Returns the canonical string form of this key.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Visible => "visible",
            Self::Opacity => "opacity",
            Self::Fill => "fill",
            Self::Stroke => "stroke",
            Self::Label => "label",
            Self::ZIndex => "z-index",
        }
    }

    /// Resolves a string key to a [`PropKey`].
    ///
    /// # Errors
    ///
    /// Returns [`UnknownProperty`] if `name` is not in the supported set.
    pub fn resolve(name: &str) -> Result<Self, UnknownProperty> {
        match name {
            "visible" => Ok(Self::Visible),
            "opacity" => Ok(Self::Opacity),
            "fill" => Ok(Self::Fill),
            "stroke" => Ok(Self::Stroke),
            "label" => Ok(Self::Label),
            "z-index" => Ok(Self::ZIndex),
            other => Err(UnknownProperty {
                name: String::from(other),
            }),
        }
    }
}

/// Error returned by [`PropKey::resolve`] for keys outside the closed set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownProperty {
    name: String,
}

impl UnknownProperty {
    /// The unresolved key as given by the caller.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for UnknownProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown property key: {:?}", self.name)
    }
}

impl core::error::Error for UnknownProperty {}

/// A property value.
#[derive(Clone, Debug, PartialEq)]
pub enum PropValue {
    /// Boolean toggle.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating-point value.
    Float(f64),
    /// Text value.
    Text(String),
}

impl PropValue {
    /// Returns the boolean value, if this is a [`Bool`](Self::Bool).
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer value, if this is an [`Int`](Self::Int).
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the float value, if this is a [`Float`](Self::Float).
    #[must_use]
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the text value, if this is a [`Text`](Self::Text).
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_round_trips_all_keys() {
        for key in PropKey::ALL {
            assert_eq!(PropKey::resolve(key.name()), Ok(key));
        }
    }

    #[test]
    fn resolve_rejects_unknown_key() {
        let err = PropKey::resolve("border-radius").unwrap_err();
        assert_eq!(err.name(), "border-radius");
    }

    #[test]
    fn value_accessors_are_kind_checked() {
        let v = PropValue::Float(0.5);
        assert_eq!(v.as_float(), Some(0.5));
        assert_eq!(v.as_bool(), None);
        assert_eq!(v.as_int(), None);
        assert_eq!(v.as_text(), None);

        let t = PropValue::Text(String::from("panel"));
        assert_eq!(t.as_text(), Some("panel"));
        assert_eq!(t.as_float(), None);
    }
}
