//! RGB colors and the color substitution table.

use crate::error::StyleError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Color substitutions used when no configuration file is given.
const BUILTIN_COLOR_MAP: &[(&str, &str)] = &[
    ("4F9F9B", "0065B1"),
    ("C7E3E2", "CBDBEA"),
    ("46736E", "203864"),
    ("4D9995", "2F5597"),
    ("73B9B6", "8FAADC"),
    ("D1E8E9", "CBDBEA"),
    ("428683", "1E6FB1"),
    ("E3F1F0", "DEEBF7"),
    ("55AAA5", "0070C0"),
    ("96CEC7", "4F81BD"),
    ("4B8D89", "1E6FB1"),
    ("A3D1CF", "9DC3E6"),
    ("31859C", "4472C4"),
    ("84C2BF", "9DC3E6"),
];

/// A 24-bit RGB color as written in DrawingML `srgbClr/@val`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RgbColor([u8; 3]);

impl RgbColor {
    /// Pure white, `FFFFFF`.
    pub const WHITE: Self = Self([0xFF, 0xFF, 0xFF]);

    /// Create a color from its components.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b])
    }

    /// Parse exactly six hex digits, ignoring case.
    pub fn from_hex(hex: &str) -> Option<Self> {
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }

        let component = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self([component(0)?, component(2)?, component(4)?]))
    }

    /// Uppercase `RRGGBB` form.
    pub fn to_hex(self) -> String {
        self.to_string()
    }
}

impl FromStr for RgbColor {
    type Err = StyleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s).ok_or_else(|| StyleError::InvalidColor(s.to_string()))
    }
}

impl TryFrom<String> for RgbColor {
    type Error = StyleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RgbColor> for String {
    fn from(color: RgbColor) -> Self {
        color.to_hex()
    }
}

impl fmt::Display for RgbColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "{:02X}{:02X}{:02X}", r, g, b)
    }
}

/// Immutable substitution table from old colors to new ones.
///
/// Keys are stored as parsed colors, so lookups ignore the case of the
/// incoming hex string and replacements always render uppercase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct ColorMap {
    entries: BTreeMap<RgbColor, RgbColor>,
}

impl ColorMap {
    /// An empty map; every lookup yields no mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in substitution table.
    pub fn builtin() -> Self {
        BUILTIN_COLOR_MAP
            .iter()
            .filter_map(|(from, to)| Some((RgbColor::from_hex(from)?, RgbColor::from_hex(to)?)))
            .collect()
    }

    /// Return a copy of this map with `overrides` added on top.
    pub fn merged<I>(&self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (RgbColor, RgbColor)>,
    {
        let mut entries = self.entries.clone();
        entries.extend(overrides);
        Self { entries }
    }

    /// Look up a raw `srgbClr` value.
    ///
    /// Returns `Ok(None)` when the color is well formed but has no mapping,
    /// and an error when the value is not a six-digit hex color.
    pub fn lookup(&self, raw: &str) -> Result<Option<RgbColor>, StyleError> {
        let color: RgbColor = raw.parse()?;
        Ok(self.get(color))
    }

    /// Replacement for an already parsed color.
    pub fn get(&self, color: RgbColor) -> Option<RgbColor> {
        self.entries.get(&color).copied()
    }

    /// Entries whose replacement is itself a key. Restyling twice with such a
    /// map keeps changing colors.
    pub fn chained_entries(&self) -> Vec<(RgbColor, RgbColor)> {
        self.entries
            .iter()
            .filter(|(_, to)| self.entries.contains_key(to))
            .map(|(from, to)| (*from, *to))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (RgbColor, RgbColor)> + '_ {
        self.entries.iter().map(|(from, to)| (*from, *to))
    }
}

impl FromIterator<(RgbColor, RgbColor)> for ColorMap {
    fn from_iter<I: IntoIterator<Item = (RgbColor, RgbColor)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl TryFrom<BTreeMap<String, String>> for ColorMap {
    type Error = StyleError;

    fn try_from(raw: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        raw.iter()
            .map(|(from, to)| Ok((from.parse()?, to.parse()?)))
            .collect()
    }
}

impl From<ColorMap> for BTreeMap<String, String> {
    fn from(map: ColorMap) -> Self {
        map.iter().map(|(from, to)| (from.to_hex(), to.to_hex())).collect()
    }
}
