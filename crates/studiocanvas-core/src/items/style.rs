//! Visual style attributes shared by every item kind.

use peniko::Color;
use serde::{Deserialize, Serialize};

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub const fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }

    pub const fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa`. Returns `None` for anything else.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().strip_prefix('#')?;
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            3 => {
                let r = channel(&hex[0..1])? * 17;
                let g = channel(&hex[1..2])? * 17;
                let b = channel(&hex[2..3])? * 17;
                Some(Self::new(r, g, b, 255))
            }
            6 => Some(Self::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
                255,
            )),
            8 => Some(Self::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
                channel(&hex[6..8])?,
            )),
            _ => None,
        }
    }

    /// Format as `#rrggbb` (or `#rrggbbaa` when not fully opaque).
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }

    /// Scale the alpha channel by `opacity` (clamped to 0..=1).
    pub fn with_opacity(self, opacity: f64) -> Self {
        let alpha = (self.a as f64 * opacity.clamp(0.0, 1.0)).round() as u8;
        Self { a: alpha, ..self }
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// Border line style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BorderStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

impl BorderStyle {
    /// Dash pattern for this style at the given stroke width (empty = solid).
    pub fn dash_pattern(&self, width: f64) -> Vec<f64> {
        let width = width.max(1.0);
        match self {
            BorderStyle::Solid => Vec::new(),
            BorderStyle::Dashed => vec![width * 4.0, width * 3.0],
            BorderStyle::Dotted => vec![width, width * 2.0],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontWeight {
    Light,
    #[default]
    Normal,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextDecoration {
    #[default]
    None,
    Underline,
    LineThrough,
}

/// Style properties for items. Every attribute is optional; each item kind
/// reads the subset it needs and falls back to its own defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<SerializableColor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_color: Option<SerializableColor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_style: Option<BorderStyle>,
    /// 0.0 = fully transparent, 1.0 = fully opaque.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    /// Rotation in degrees around the item center.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<FontWeight>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_style: Option<FontStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_decoration: Option<TextDecoration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<SerializableColor>,
}

impl ItemStyle {
    pub fn opacity(&self) -> f64 {
        self.opacity.unwrap_or(1.0).clamp(0.0, 1.0)
    }

    pub fn rotation_radians(&self) -> f64 {
        self.rotation.unwrap_or(0.0).to_radians()
    }

    pub fn with_fill(mut self, color: SerializableColor) -> Self {
        self.fill_color = Some(color);
        self
    }

    pub fn with_border(mut self, color: SerializableColor, width: f64) -> Self {
        self.border_color = Some(color);
        self.border_width = Some(width);
        self
    }

    /// Read one attribute as a [`StyleValue`].
    pub fn value(&self, field: StyleField) -> StyleValue {
        match field {
            StyleField::FillColor => StyleValue::FillColor(self.fill_color),
            StyleField::BorderColor => StyleValue::BorderColor(self.border_color),
            StyleField::BorderWidth => StyleValue::BorderWidth(self.border_width),
            StyleField::BorderStyle => StyleValue::BorderStyle(self.border_style),
            StyleField::Opacity => StyleValue::Opacity(self.opacity),
            StyleField::Rotation => StyleValue::Rotation(self.rotation),
            StyleField::FontFamily => StyleValue::FontFamily(self.font_family.clone()),
            StyleField::FontSize => StyleValue::FontSize(self.font_size),
            StyleField::FontWeight => StyleValue::FontWeight(self.font_weight),
            StyleField::FontStyle => StyleValue::FontStyle(self.font_style),
            StyleField::TextDecoration => StyleValue::TextDecoration(self.text_decoration),
            StyleField::TextColor => StyleValue::TextColor(self.text_color),
        }
    }

    /// Write one attribute.
    pub fn set(&mut self, value: StyleValue) {
        match value {
            StyleValue::FillColor(v) => self.fill_color = v,
            StyleValue::BorderColor(v) => self.border_color = v,
            StyleValue::BorderWidth(v) => self.border_width = v,
            StyleValue::BorderStyle(v) => self.border_style = v,
            StyleValue::Opacity(v) => self.opacity = v,
            StyleValue::Rotation(v) => self.rotation = v,
            StyleValue::FontFamily(v) => self.font_family = v,
            StyleValue::FontSize(v) => self.font_size = v,
            StyleValue::FontWeight(v) => self.font_weight = v,
            StyleValue::FontStyle(v) => self.font_style = v,
            StyleValue::TextDecoration(v) => self.text_decoration = v,
            StyleValue::TextColor(v) => self.text_color = v,
        }
    }
}

/// Identifies one style attribute (the per-field merge granularity for styles).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleField {
    FillColor,
    BorderColor,
    BorderWidth,
    BorderStyle,
    Opacity,
    Rotation,
    FontFamily,
    FontSize,
    FontWeight,
    FontStyle,
    TextDecoration,
    TextColor,
}

impl StyleField {
    pub const ALL: [StyleField; 12] = [
        StyleField::FillColor,
        StyleField::BorderColor,
        StyleField::BorderWidth,
        StyleField::BorderStyle,
        StyleField::Opacity,
        StyleField::Rotation,
        StyleField::FontFamily,
        StyleField::FontSize,
        StyleField::FontWeight,
        StyleField::FontStyle,
        StyleField::TextDecoration,
        StyleField::TextColor,
    ];
}

/// A single style attribute assignment. `None` clears the attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleValue {
    FillColor(Option<SerializableColor>),
    BorderColor(Option<SerializableColor>),
    BorderWidth(Option<f64>),
    BorderStyle(Option<BorderStyle>),
    Opacity(Option<f64>),
    Rotation(Option<f64>),
    FontFamily(Option<String>),
    FontSize(Option<f64>),
    FontWeight(Option<FontWeight>),
    FontStyle(Option<FontStyle>),
    TextDecoration(Option<TextDecoration>),
    TextColor(Option<SerializableColor>),
}

impl StyleValue {
    pub fn field(&self) -> StyleField {
        match self {
            StyleValue::FillColor(_) => StyleField::FillColor,
            StyleValue::BorderColor(_) => StyleField::BorderColor,
            StyleValue::BorderWidth(_) => StyleField::BorderWidth,
            StyleValue::BorderStyle(_) => StyleField::BorderStyle,
            StyleValue::Opacity(_) => StyleField::Opacity,
            StyleValue::Rotation(_) => StyleField::Rotation,
            StyleValue::FontFamily(_) => StyleField::FontFamily,
            StyleValue::FontSize(_) => StyleField::FontSize,
            StyleValue::FontWeight(_) => StyleField::FontWeight,
            StyleValue::FontStyle(_) => StyleField::FontStyle,
            StyleValue::TextDecoration(_) => StyleField::TextDecoration,
            StyleValue::TextColor(_) => StyleField::TextColor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_parsing() {
        assert_eq!(
            SerializableColor::from_hex("#fff"),
            Some(SerializableColor::white())
        );
        assert_eq!(
            SerializableColor::from_hex("#3b82f6"),
            Some(SerializableColor::new(59, 130, 246, 255))
        );
        assert_eq!(
            SerializableColor::from_hex("#00000080"),
            Some(SerializableColor::new(0, 0, 0, 128))
        );
        assert_eq!(SerializableColor::from_hex("blue"), None);
        assert_eq!(SerializableColor::from_hex("#12345"), None);
    }

    #[test]
    fn test_hex_format() {
        assert_eq!(SerializableColor::new(59, 130, 246, 255).to_hex(), "#3b82f6");
        assert_eq!(SerializableColor::new(0, 0, 0, 128).to_hex(), "#00000080");
    }

    #[test]
    fn test_style_value_round_trip_through_fields() {
        let mut style = ItemStyle::default();
        style.set(StyleValue::FontSize(Some(18.0)));
        style.set(StyleValue::FillColor(Some(SerializableColor::black())));
        assert_eq!(style.value(StyleField::FontSize), StyleValue::FontSize(Some(18.0)));

        style.set(StyleValue::FillColor(None));
        assert!(style.fill_color.is_none());
        assert_eq!(style.font_size, Some(18.0));
    }

    #[test]
    fn test_opacity_is_clamped() {
        let style = ItemStyle {
            opacity: Some(3.0),
            ..Default::default()
        };
        assert!((style.opacity() - 1.0).abs() < f64::EPSILON);
        assert_eq!(SerializableColor::white().with_opacity(0.5).a, 128);
    }
}
