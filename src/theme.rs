//! Colours: per-kind square colours and UI colours, optionally loaded from a btop-style
//! `theme[key]="value"` file.

use crate::shape::Tetromino;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Classic square colours, indexed by `Tetromino::index()`.
const CLASSIC: [&str; Tetromino::COUNT] = [
    "#000000", "#CC6666", "#66CC66", "#6666CC", "#CCCC66", "#CC66CC", "#66CCCC", "#DAAA00",
];

/// Theme file keys for each kind, `Empty` first.
const PIECE_KEYS: [&str; Tetromino::COUNT] = [
    "piece_empty",
    "piece_z",
    "piece_s",
    "piece_i",
    "piece_t",
    "piece_o",
    "piece_l",
    "piece_j",
];

#[derive(Debug, Clone)]
pub struct Theme {
    /// Square colour per kind; index 0 (`Empty`) is the board background.
    pub pieces: [Color; Tetromino::COUNT],
    /// Border lines.
    pub div_line: Color,
    /// Status text.
    pub main_fg: Color,
    /// Titles.
    pub title: Color,
    /// Hints and secondary text.
    pub inactive_fg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::classic()
    }
}

impl Theme {
    pub fn classic() -> Self {
        Self {
            pieces: CLASSIC.map(hex_or_black),
            div_line: hex_or_black("#5C6370"),
            main_fg: hex_or_black("#ABB2BF"),
            title: hex_or_black("#E5C07B"),
            inactive_fg: hex_or_black("#5C6370"),
        }
    }

    /// Load a theme file. A missing path or file gives the classic colours.
    /// Keys not present in the file keep their classic value.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let mut theme = match path {
            Some(p) if p.exists() => {
                let s = std::fs::read_to_string(p)?;
                Self::from_map(&parse_theme_file(&s))
            }
            _ => Self::classic(),
        };
        theme.apply_palette(palette);
        Ok(theme)
    }

    /// Override the square colours for high-contrast or colorblind play.
    pub fn apply_palette(&mut self, palette: crate::Palette) {
        let table = match palette {
            crate::Palette::Normal => return,
            crate::Palette::HighContrast => [
                "#000000", "#FF0000", "#00FF00", "#0088FF", "#FFFF00", "#FF00FF", "#00FFFF",
                "#FF8800",
            ],
            // Okabe-Ito inspired, distinguishable without red/green.
            crate::Palette::Colorblind => [
                "#000000", "#D55E00", "#009E73", "#0072B2", "#F0E442", "#CC79A7", "#56B4E9",
                "#E69F00",
            ],
        };
        self.pieces = table.map(hex_or_black);
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| map.get(key).and_then(|v| parse_hex(v).ok());
        let classic = Self::classic();
        let mut pieces = classic.pieces;
        for (slot, key) in pieces.iter_mut().zip(PIECE_KEYS) {
            if let Some(c) = get(key) {
                *slot = c;
            }
        }
        if let Some(bg) = get("main_bg").or_else(|| get("meter_bg")) {
            pieces[Tetromino::Empty.index()] = bg;
        }
        Self {
            pieces,
            div_line: get("div_line").unwrap_or(classic.div_line),
            main_fg: get("main_fg").unwrap_or(classic.main_fg),
            title: get("title").unwrap_or(classic.title),
            inactive_fg: get("inactive_fg").unwrap_or(classic.inactive_fg),
        }
    }

    #[inline]
    pub fn piece_color(&self, kind: Tetromino) -> Color {
        self.pieces[kind.index()]
    }

    #[inline]
    pub fn bg(&self) -> Color {
        self.piece_color(Tetromino::Empty)
    }
}

/// Scale an RGB colour; factor > 1 brightens, < 1 darkens. Named colours pass through.
pub fn shade(color: Color, factor: f32) -> Color {
    match color {
        Color::Rgb(r, g, b) => {
            let f = |c: u8| (c as f32 * factor).clamp(0.0, 255.0) as u8;
            Color::Rgb(f(r), f(g), f(b))
        }
        other => other,
    }
}

fn hex_or_black(s: &str) -> Color {
    parse_hex(s).unwrap_or(Color::Rgb(0, 0, 0))
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(stripped) = line.strip_prefix("theme[") else {
            continue;
        };
        let Some(end) = stripped.find(']') else {
            continue;
        };
        let key = stripped[..end].trim();
        let rest = stripped[end + 1..].trim();
        if let Some(value) = rest.strip_prefix('=') {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            if !value.is_empty() {
                map.insert(key.to_string(), value.to_string());
            }
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let invalid = || ThemeError::InvalidHex(s.to_string());
    let channel = |range: std::ops::Range<usize>| {
        s.get(range)
            .and_then(|h| u8::from_str_radix(h, 16).ok())
            .ok_or_else(invalid)
    };
    let (r, g, b) = match s.len() {
        6 => (channel(0..2)?, channel(2..4)?, channel(4..6)?),
        3 => (channel(0..1)? * 17, channel(1..2)? * 17, channel(2..3)? * 17),
        _ => return Err(invalid()),
    };
    Ok(Color::Rgb(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Palette;
    use std::io::Write;

    #[test]
    fn test_parse_hex_6() {
        let c = parse_hex("#98C379").unwrap();
        assert!(matches!(c, Color::Rgb(0x98, 0xC3, 0x79)));
    }

    #[test]
    fn test_parse_hex_3() {
        let c = parse_hex("#FFF").unwrap();
        assert!(matches!(c, Color::Rgb(255, 255, 255)));
    }

    #[test]
    fn test_parse_hex_rejects_garbage() {
        assert!(parse_hex("#12345").is_err());
        assert!(parse_hex("#GG0000").is_err());
        assert!(parse_hex("").is_err());
    }

    #[test]
    fn test_parse_theme_line() {
        let map = parse_theme_file(r##"theme[meter_bg]="#31353F""##);
        assert_eq!(map.get("meter_bg"), Some(&"#31353F".to_string()));
    }

    #[test]
    fn test_classic_colours_follow_kind_index() {
        let theme = Theme::classic();
        assert_eq!(theme.bg(), Color::Rgb(0, 0, 0));
        assert_eq!(theme.piece_color(Tetromino::Z), Color::Rgb(0xCC, 0x66, 0x66));
        assert_eq!(theme.piece_color(Tetromino::J), Color::Rgb(0xDA, 0xAA, 0x00));
    }

    #[test]
    fn test_missing_file_is_classic() {
        let theme = Theme::load(Some(Path::new("/nonexistent/blockfall.theme")), Palette::Normal)
            .unwrap();
        assert_eq!(theme.pieces, Theme::classic().pieces);
    }

    #[test]
    fn test_load_overrides_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# custom").unwrap();
        writeln!(file, r##"theme[piece_t]="#112233""##).unwrap();
        writeln!(file, r##"theme[main_bg]='#101010'"##).unwrap();
        writeln!(file, r##"theme[title]="not a colour""##).unwrap();
        let theme = Theme::load(Some(file.path()), Palette::Normal).unwrap();
        assert_eq!(theme.piece_color(Tetromino::T), Color::Rgb(0x11, 0x22, 0x33));
        assert_eq!(theme.bg(), Color::Rgb(0x10, 0x10, 0x10));
        assert_eq!(theme.piece_color(Tetromino::I), Theme::classic().piece_color(Tetromino::I));
        assert_eq!(theme.title, Theme::classic().title);
    }

    #[test]
    fn test_palette_replaces_piece_colours() {
        let mut theme = Theme::classic();
        theme.apply_palette(Palette::HighContrast);
        assert_eq!(theme.piece_color(Tetromino::Z), Color::Rgb(255, 0, 0));
        assert_eq!(theme.bg(), Color::Rgb(0, 0, 0));
    }

    #[test]
    fn test_shade() {
        assert_eq!(shade(Color::Rgb(100, 200, 10), 1.5), Color::Rgb(150, 255, 15));
        assert_eq!(shade(Color::Rgb(100, 200, 10), 0.5), Color::Rgb(50, 100, 5));
        assert_eq!(shade(Color::Red, 0.5), Color::Red);
    }
}
