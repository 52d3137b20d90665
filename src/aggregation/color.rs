use serde::Serialize;
use tracing::warn;

use crate::storage::entities::Theme;

/// Returned by [to_rgba] for anything that isn't a hex color.
pub const FALLBACK_RGBA: &str = "rgba(0,0,0,0.2)";
/// Amount the gradient's second stop is lightened by.
pub const GRADIENT_LIGHTEN: i32 = 40;
pub const SHADOW_ALPHA: f64 = 0.4;

fn parse_hex(digits: &str) -> Option<u32> {
    if digits.chars().all(|c| c.is_ascii_hexdigit()) {
        u32::from_str_radix(digits, 16).ok()
    } else {
        None
    }
}

/// Adds `amount` to every channel of a 6 digit hex color, clamping to 0..=255. A leading `#` is
/// kept if the input had one. Input that isn't a 6 digit color is returned untouched.
pub fn lighten(color: &str, amount: i32) -> String {
    let (prefix, digits) = match color.strip_prefix('#') {
        Some(digits) => ("#", digits),
        None => ("", color),
    };
    let Some(value) = Some(digits)
        .filter(|d| d.len() == 6)
        .and_then(parse_hex)
    else {
        warn!("Can't lighten {color:?}, not a 6 digit hex color");
        return color.to_string();
    };

    let channel = |shift: u32| {
        let lightened = ((value >> shift) & 0xff) as i32 + amount;
        lightened.clamp(0, 255) as u32
    };
    let lightened = (channel(16) << 16) | (channel(8) << 8) | channel(0);
    format!("{prefix}{lightened:06x}")
}

/// `#rgb` or `#rrggbb` (the `#` is optional) to `rgba(r,g,b,alpha)`.
pub fn to_rgba(color: &str, alpha: f64) -> String {
    let digits = color.strip_prefix('#').unwrap_or(color);
    let expanded = match digits.len() {
        3 => digits.chars().flat_map(|c| [c, c]).collect::<String>(),
        6 => digits.to_string(),
        _ => return FALLBACK_RGBA.to_string(),
    };
    let Some(value) = parse_hex(&expanded) else {
        return FALLBACK_RGBA.to_string();
    };
    format!(
        "rgba({},{},{},{alpha})",
        (value >> 16) & 0xff,
        (value >> 8) & 0xff,
        value & 0xff
    )
}

/// Colors handed to the presentation layer for the current theme.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThemeStyle {
    pub main_color: String,
    pub background: String,
    pub shadow: String,
}

impl ThemeStyle {
    pub fn derive(theme: &Theme) -> Self {
        let color = &theme.color;
        let background = if theme.gradient {
            format!(
                "linear-gradient(135deg, {color}, {})",
                lighten(color, GRADIENT_LIGHTEN)
            )
        } else {
            color.clone()
        };
        Self {
            main_color: color.clone(),
            background,
            shadow: format!("0 4px 12px {}", to_rgba(color, SHADOW_ALPHA)),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::entities::Theme;

    use super::{FALLBACK_RGBA, ThemeStyle, lighten, to_rgba};

    #[test]
    fn lighten_adds_and_clamps() {
        assert_eq!(lighten("#000000", 40), "#282828");
        assert_eq!(lighten("#ffffff", 40), "#ffffff");
        assert_eq!(lighten("#007aff", 40), "#28a2ff");
        assert_eq!(lighten("#282828", -50), "#000000");
    }

    #[test]
    fn lighten_keeps_missing_prefix() {
        assert_eq!(lighten("000000", 40), "282828");
        assert_eq!(lighten("0a0b0c", 1), "0b0c0d");
    }

    #[test]
    fn lighten_leaves_garbage_alone() {
        assert_eq!(lighten("#fff", 40), "#fff");
        assert_eq!(lighten("blue", 40), "blue");
        assert_eq!(lighten("#gggggg", 40), "#gggggg");
    }

    #[test]
    fn rgba_expands_shorthand() {
        assert_eq!(to_rgba("#fff", 0.5), "rgba(255,255,255,0.5)");
        assert_eq!(to_rgba("0f0", 1.), "rgba(0,255,0,1)");
        assert_eq!(to_rgba("#007aff", 0.4), "rgba(0,122,255,0.4)");
    }

    #[test]
    fn rgba_falls_back_on_invalid_input() {
        for color in ["", "#", "#ff", "#fffff", "#zzz", "red", "#1234567", "#ａｂｃ"] {
            assert_eq!(to_rgba(color, 0.5), FALLBACK_RGBA, "{color}");
        }
    }

    #[test]
    fn theme_style_uses_gradient_flag() {
        let mut theme = Theme::default();
        let style = ThemeStyle::derive(&theme);
        assert_eq!(style.background, "linear-gradient(135deg, #007aff, #28a2ff)");
        assert_eq!(style.shadow, "0 4px 12px rgba(0,122,255,0.4)");

        theme.gradient = false;
        assert_eq!(ThemeStyle::derive(&theme).background, "#007aff");
    }
}
