use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(anyhow!("unknown theme: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn parse_hex(raw: &str) -> anyhow::Result<Self> {
        let trimmed = raw.trim();
        let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
        if hex.len() != 6 || !hex.chars().all(|ch| ch.is_ascii_hexdigit()) {
            return Err(anyhow!("invalid color: {raw} (expected #rrggbb)"));
        }

        Ok(Self {
            r: u8::from_str_radix(&hex[0..2], 16)?,
            g: u8::from_str_radix(&hex[2..4], 16)?,
            b: u8::from_str_radix(&hex[4..6], 16)?,
        })
    }
}

/// Color configuration handed to the decorative backdrop: two accents
/// plus a background, per theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub accent: Rgb,
    pub accent2: Rgb,
    pub background: Rgb,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Self {
                accent: Rgb::new(0x00, 0x77, 0xff),
                accent2: Rgb::new(0x00, 0x00, 0x00),
                background: Rgb::new(0xff, 0xff, 0xff),
            },
            Theme::Dark => Self {
                accent: Rgb::new(0x3f, 0xf0, 0xff),
                accent2: Rgb::new(0xff, 0xff, 0xff),
                background: Rgb::new(0x0d, 0x11, 0x17),
            },
        }
    }

    /// Theme defaults with per-key config overrides applied. A bad
    /// override is an error for the caller to isolate, not a panic.
    pub fn resolve(theme: Theme, cfg: &Config) -> anyhow::Result<Self> {
        let mut palette = Self::for_theme(theme);

        if let Some(raw) = cfg.get("backdrop.accent") {
            palette.accent = Rgb::parse_hex(&raw)?;
        }
        if let Some(raw) = cfg.get("backdrop.accent2") {
            palette.accent2 = Rgb::parse_hex(&raw)?;
        }
        if let Some(raw) = cfg.get("backdrop.background") {
            palette.background = Rgb::parse_hex(&raw)?;
        }

        Ok(palette)
    }
}
