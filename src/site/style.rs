use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_COLOR_1: &str = "#667eea";
pub const DEFAULT_COLOR_2: &str = "#764ba2";

const POSITION_RANGE: (f64, f64) = (0.0, 100.0);
const INTENSITY_RANGE: (f64, f64) = (0.5, 2.0);

/// Two-spot gradient background.
///
/// Positions are percentages of the viewport; `intensity` scales how strongly
/// the colours bleed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub color1: String,
    pub color2: String,
    pub pos1x: f64,
    pub pos1y: f64,
    pub pos2x: f64,
    pub pos2y: f64,
    pub intensity: f64,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            color1: DEFAULT_COLOR_1.to_string(),
            color2: DEFAULT_COLOR_2.to_string(),
            pos1x: 20.0,
            pos1y: 30.0,
            pos2x: 80.0,
            pos2y: 70.0,
            intensity: 1.0,
        }
    }
}

/// Persisted style that could not be used.
#[derive(Debug, Error)]
pub enum ConfigParseError {
    #[error("stored style is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("stored value is empty")]
    Empty,
}

impl StyleConfig {
    /// Parses a persisted style. Fields missing from the JSON take their
    /// defaults and numbers are pulled back into range.
    pub fn from_json(raw: &str) -> Result<Self, ConfigParseError> {
        if raw.trim().is_empty() {
            return Err(ConfigParseError::Empty);
        }
        let parsed: StyleConfig = serde_json::from_str(raw)?;
        Ok(parsed.sanitized())
    }

    /// Default style with only the first colour taken from an old
    /// single-colour setting.
    pub fn from_legacy_color(color: &str) -> Result<Self, ConfigParseError> {
        let color = color.trim();
        if color.is_empty() {
            return Err(ConfigParseError::Empty);
        }
        Ok(Self {
            color1: color.to_string(),
            ..Self::default()
        })
    }

    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        let color = |c: String, fallback: String| {
            if c.trim().is_empty() {
                fallback
            } else {
                c.trim().to_string()
            }
        };
        Self {
            color1: color(self.color1, defaults.color1),
            color2: color(self.color2, defaults.color2),
            pos1x: clamp_or(self.pos1x, POSITION_RANGE, defaults.pos1x),
            pos1y: clamp_or(self.pos1y, POSITION_RANGE, defaults.pos1y),
            pos2x: clamp_or(self.pos2x, POSITION_RANGE, defaults.pos2x),
            pos2y: clamp_or(self.pos2y, POSITION_RANGE, defaults.pos2y),
            intensity: clamp_or(self.intensity, INTENSITY_RANGE, defaults.intensity),
        }
    }

    pub fn get(&self, field: StyleField) -> String {
        match field {
            StyleField::Color1 => self.color1.clone(),
            StyleField::Color2 => self.color2.clone(),
            StyleField::Pos1X => self.pos1x.to_string(),
            StyleField::Pos1Y => self.pos1y.to_string(),
            StyleField::Pos2X => self.pos2x.to_string(),
            StyleField::Pos2Y => self.pos2y.to_string(),
            StyleField::Intensity => self.intensity.to_string(),
        }
    }

    /// Overwrites one field from its textual form, as it arrives from a
    /// colour picker or slider.
    pub fn set(&mut self, field: StyleField, raw: &str) -> Result<(), StyleEditError> {
        let raw = raw.trim();
        let number = || {
            raw.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| StyleEditError::InvalidValue {
                    field,
                    value: raw.to_string(),
                })
        };

        match field {
            StyleField::Color1 | StyleField::Color2 => {
                if raw.is_empty() {
                    return Err(StyleEditError::InvalidValue {
                        field,
                        value: raw.to_string(),
                    });
                }
                if field == StyleField::Color1 {
                    self.color1 = raw.to_string();
                } else {
                    self.color2 = raw.to_string();
                }
            }
            StyleField::Pos1X => self.pos1x = clamp(number()?, POSITION_RANGE),
            StyleField::Pos1Y => self.pos1y = clamp(number()?, POSITION_RANGE),
            StyleField::Pos2X => self.pos2x = clamp(number()?, POSITION_RANGE),
            StyleField::Pos2Y => self.pos2y = clamp(number()?, POSITION_RANGE),
            StyleField::Intensity => self.intensity = clamp(number()?, INTENSITY_RANGE),
        }
        Ok(())
    }

    pub fn vars(&self) -> StyleVars {
        StyleVars(vec![
            ("--bg-color-1", self.color1.clone()),
            ("--bg-color-2", self.color2.clone()),
            ("--bg-pos-1", format!("{}% {}%", self.pos1x, self.pos1y)),
            ("--bg-pos-2", format!("{}% {}%", self.pos2x, self.pos2y)),
            ("--bg-intensity", self.intensity.to_string()),
        ])
    }
}

fn clamp(value: f64, (lo, hi): (f64, f64)) -> f64 {
    value.clamp(lo, hi)
}

fn clamp_or(value: f64, range: (f64, f64), fallback: f64) -> f64 {
    if value.is_finite() {
        clamp(value, range)
    } else {
        fallback
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum StyleField {
    Color1,
    Color2,
    Pos1X,
    Pos1Y,
    Pos2X,
    Pos2Y,
    Intensity,
}

impl StyleField {
    pub const ALL: [StyleField; 7] = [
        StyleField::Color1,
        StyleField::Color2,
        StyleField::Pos1X,
        StyleField::Pos1Y,
        StyleField::Pos2X,
        StyleField::Pos2Y,
        StyleField::Intensity,
    ];

    pub fn key(self) -> &'static str {
        match self {
            StyleField::Color1 => "color1",
            StyleField::Color2 => "color2",
            StyleField::Pos1X => "pos1x",
            StyleField::Pos1Y => "pos1y",
            StyleField::Pos2X => "pos2x",
            StyleField::Pos2Y => "pos2y",
            StyleField::Intensity => "intensity",
        }
    }
}

impl Display for StyleField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for StyleField {
    type Err = StyleEditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        StyleField::ALL
            .into_iter()
            .find(|f| f.key() == key)
            .ok_or(StyleEditError::UnknownField(s.to_string()))
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum StyleEditError {
    #[error("unknown style field '{0}'")]
    UnknownField(String),

    #[error("invalid value '{value}' for {field}")]
    InvalidValue { field: StyleField, value: String },
}

/// CSS custom properties handed to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StyleVars(pub Vec<(&'static str, String)>);

impl StyleVars {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn to_css(&self) -> String {
        let mut css = String::from(":root {\n");
        for (name, value) in &self.0 {
            css.push_str(&format!("  {name}: {value};\n"));
        }
        css.push_str("}\n");
        css
    }
}
