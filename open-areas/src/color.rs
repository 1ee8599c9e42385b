//! Colors and attribute-driven color matching.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use geojson::JsonObject;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};

use crate::error::OpenAreasError;

/// Opaque RGB color, written as `#rrggbb` in style documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    r: u8,
    g: u8,
    b: u8,
}

impl Color {
    /// Black.
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    /// White.
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    /// Gray used for features whose attribute value has no mapped color.
    pub const FALLBACK: Color = Color::rgb(0xaa, 0xaa, 0xaa);
    /// Cyan used to outline the selected feature.
    pub const HIGHLIGHT: Color = Color::rgb(0, 255, 255);

    /// Creates a color from its components.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Red component.
    pub fn r(&self) -> u8 {
        self.r
    }

    /// Green component.
    pub fn g(&self) -> u8 {
        self.g
    }

    /// Blue component.
    pub fn b(&self) -> u8 {
        self.b
    }

    /// Parses `#rgb` or `#rrggbb` hex notation (case insensitive).
    pub fn from_hex(hex: &str) -> Result<Self, OpenAreasError> {
        let invalid = || OpenAreasError::InvalidColor(hex.to_string());
        let digits = hex.strip_prefix('#').ok_or_else(invalid)?;
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let component = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());
        match digits.len() {
            3 => {
                let short = |i: usize| component(&digits[i..i + 1]).map(|v| v * 17);
                Ok(Self::rgb(short(0)?, short(1)?, short(2)?))
            }
            6 => Ok(Self::rgb(
                component(&digits[0..2])?,
                component(&digits[2..4])?,
                component(&digits[4..6])?,
            )),
            _ => Err(invalid()),
        }
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = OpenAreasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Color::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Discrete mapping from a feature attribute value to a color, with a mandatory default.
///
/// Compiled once when the catalog is built. Entries keep their declaration order; when the same
/// value is declared twice only the first declaration is kept.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorMatch {
    attribute: String,
    entries: Vec<(String, Color)>,
    default: Color,
}

impl ColorMatch {
    /// Compiles the mapping for the given attribute.
    pub fn new(
        attribute: impl Into<String>,
        entries: impl IntoIterator<Item = (String, Color)>,
        default: Color,
    ) -> Self {
        let attribute = attribute.into();
        let mut compiled: Vec<(String, Color)> = vec![];
        for (value, color) in entries {
            if compiled.iter().any(|(existing, _)| *existing == value) {
                log::warn!("Duplicate color mapping for {attribute} = {value:?} is ignored");
                continue;
            }
            compiled.push((value, color));
        }

        Self {
            attribute,
            entries: compiled,
            default,
        }
    }

    /// Name of the feature property the color is looked up by.
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Mapped (value, color) pairs in declaration order.
    pub fn entries(&self) -> &[(String, Color)] {
        &self.entries
    }

    /// Color used for values with no mapping.
    pub fn default_color(&self) -> Color {
        self.default
    }

    /// Resolves the color a feature with the given properties is drawn with.
    pub fn evaluate(&self, properties: Option<&JsonObject>) -> Color {
        let value = properties
            .and_then(|props| props.get(&self.attribute))
            .and_then(Value::as_str);

        value
            .and_then(|value| {
                self.entries
                    .iter()
                    .find(|(label, _)| label == value)
                    .map(|(_, color)| *color)
            })
            .unwrap_or(self.default)
    }

    /// Style expression equivalent to [`ColorMatch::evaluate`].
    ///
    /// A `match` expression requires at least one label, so an empty mapping is exported as the
    /// plain default color.
    pub fn to_expression(&self) -> Value {
        if self.entries.is_empty() {
            return json!(self.default.to_string());
        }

        let mut expression = vec![json!("match"), json!(["get", self.attribute])];
        for (value, color) in &self.entries {
            expression.push(json!(value));
            expression.push(json!(color.to_string()));
        }
        expression.push(json!(self.default.to_string()));

        Value::Array(expression)
    }
}
