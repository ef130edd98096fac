//! Style Resolver
//!
//! Maps a parsed [`StyleState`] to concrete paint properties. Resolution is a
//! pure function of the style, the palette and the theme; nothing is cached or
//! counted here.

use serde::{Deserialize, Serialize};

use super::parser::StyleState;
use crate::color::{AnsiPalette, Rgb};

/// Opacity applied to dim (SGR 2) text
pub const DIM_OPACITY: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FontSlant {
    #[default]
    Normal,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decoration {
    Underline,
    LineThrough,
}

impl Decoration {
    fn css(&self) -> &'static str {
        match self {
            Self::Underline => "underline",
            Self::LineThrough => "line-through",
        }
    }
}

/// Default colors used when a style leaves a color unset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub foreground: Rgb,
    pub background: Rgb,
    pub cursor: Rgb,
    pub selection: Rgb,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            foreground: Rgb::new(0x00, 0xff, 0x00),
            background: Rgb::new(0x00, 0x00, 0x00),
            cursor: Rgb::new(0x00, 0xff, 0x00),
            selection: Rgb::new(0x44, 0x44, 0x44),
        }
    }
}

/// Concrete paint properties for one segment.
///
/// `None` colors inherit from the surrounding element.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VisualStyle {
    pub foreground: Option<Rgb>,
    pub background: Option<Rgb>,
    pub weight: FontWeight,
    pub slant: FontSlant,
    pub decorations: Vec<Decoration>,
    pub opacity: Option<f32>,
}

impl VisualStyle {
    /// Inline CSS declarations, empty for a plain style
    pub fn to_css(&self) -> String {
        let mut decls = Vec::new();

        if let Some(fg) = self.foreground {
            decls.push(format!("color: {fg}"));
        }
        if let Some(bg) = self.background {
            decls.push(format!("background-color: {bg}"));
        }
        if self.weight == FontWeight::Bold {
            decls.push("font-weight: bold".to_string());
        }
        if self.slant == FontSlant::Italic {
            decls.push("font-style: italic".to_string());
        }
        if !self.decorations.is_empty() {
            let lines: Vec<_> = self.decorations.iter().map(Decoration::css).collect();
            decls.push(format!("text-decoration: {}", lines.join(" ")));
        }
        if let Some(opacity) = self.opacity {
            decls.push(format!("opacity: {opacity}"));
        }

        decls.join("; ")
    }
}

/// Resolves styles against a palette and theme
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleResolver {
    pub palette: AnsiPalette,
    pub theme: Theme,
}

impl StyleResolver {
    pub fn new(palette: AnsiPalette, theme: Theme) -> Self {
        Self { palette, theme }
    }

    pub fn resolve(&self, style: &StyleState) -> VisualStyle {
        let mut foreground = style.foreground.map(|c| c.to_rgb(&self.palette));
        let mut background = style.background.map(|c| c.to_rgb(&self.palette));

        if style.reverse {
            let fg = foreground.unwrap_or(self.theme.foreground);
            let bg = background.unwrap_or(self.theme.background);
            foreground = Some(bg);
            background = Some(fg);
        }

        let mut decorations = Vec::new();
        if style.underline {
            decorations.push(Decoration::Underline);
        }
        if style.strikethrough {
            decorations.push(Decoration::LineThrough);
        }

        VisualStyle {
            foreground,
            background,
            weight: if style.bold {
                FontWeight::Bold
            } else {
                FontWeight::Normal
            },
            slant: if style.italic {
                FontSlant::Italic
            } else {
                FontSlant::Normal
            },
            decorations,
            opacity: style.dim.then_some(DIM_OPACITY),
        }
    }
}

/// Resolve with the default palette and theme
pub fn resolve(style: &StyleState) -> VisualStyle {
    StyleResolver::default().resolve(style)
}

impl StyleState {
    /// Space-separated class names (`ansi-red ansi-bg-blue ansi-bold`)
    pub fn css_classes(&self) -> String {
        let mut classes = Vec::new();

        if let Some(fg) = &self.foreground {
            classes.push(format!("ansi-{}", fg.class_name()));
        }
        if let Some(bg) = &self.background {
            classes.push(format!("ansi-bg-{}", bg.class_name()));
        }
        let flags = [
            (self.bold, "ansi-bold"),
            (self.dim, "ansi-dim"),
            (self.italic, "ansi-italic"),
            (self.underline, "ansi-underline"),
            (self.reverse, "ansi-reverse"),
            (self.strikethrough, "ansi-strikethrough"),
        ];
        classes.extend(
            flags
                .into_iter()
                .filter(|(on, _)| *on)
                .map(|(_, class)| class.to_string()),
        );

        classes.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{AnsiColor, ColorRef};
    use pretty_assertions::assert_eq;

    fn red_bold() -> StyleState {
        StyleState {
            foreground: Some(ColorRef::Ansi(AnsiColor::Red)),
            bold: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_default_style_resolves_plain() {
        assert_eq!(resolve(&StyleState::default()), VisualStyle::default());
        assert_eq!(resolve(&StyleState::default()).to_css(), "");
    }

    #[test]
    fn test_resolve_colors_and_weight() {
        let visual = resolve(&red_bold());
        assert_eq!(visual.foreground, Some(Rgb::new(0xff, 0, 0)));
        assert_eq!(visual.background, None);
        assert_eq!(visual.weight, FontWeight::Bold);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let style = StyleState {
            reverse: true,
            dim: true,
            ..red_bold()
        };
        let resolver = StyleResolver::default();
        assert_eq!(resolver.resolve(&style), resolver.resolve(&style));
    }

    #[test]
    fn test_reverse_swaps_at_resolution() {
        let style = StyleState {
            foreground: Some(ColorRef::Ansi(AnsiColor::Red)),
            reverse: true,
            ..Default::default()
        };
        let visual = resolve(&style);
        let theme = Theme::default();

        assert_eq!(visual.foreground, Some(theme.background));
        assert_eq!(visual.background, Some(Rgb::new(0xff, 0, 0)));
        // State itself is untouched
        assert_eq!(style.foreground, Some(ColorRef::Ansi(AnsiColor::Red)));
    }

    #[test]
    fn test_dim_and_decorations() {
        let style = StyleState {
            dim: true,
            italic: true,
            underline: true,
            strikethrough: true,
            ..Default::default()
        };
        let visual = resolve(&style);
        assert_eq!(visual.opacity, Some(DIM_OPACITY));
        assert_eq!(visual.slant, FontSlant::Italic);
        assert_eq!(
            visual.decorations,
            vec![Decoration::Underline, Decoration::LineThrough]
        );
        assert_eq!(
            visual.to_css(),
            "font-style: italic; text-decoration: underline line-through; opacity: 0.5"
        );
    }

    #[test]
    fn test_custom_palette() {
        let mut palette = AnsiPalette::default();
        palette.set(AnsiColor::Red, Rgb::new(0xcc, 0x33, 0x33));
        let resolver = StyleResolver::new(palette, Theme::default());

        assert_eq!(
            resolver.resolve(&red_bold()).to_css(),
            "color: #cc3333; font-weight: bold"
        );
    }

    #[test]
    fn test_css_classes() {
        let style = StyleState {
            background: Some(ColorRef::Ansi(AnsiColor::BrightBlue)),
            underline: true,
            ..red_bold()
        };
        assert_eq!(
            style.css_classes(),
            "ansi-red ansi-bg-bright-blue ansi-bold ansi-underline"
        );
        assert_eq!(StyleState::default().css_classes(), "");
        let indexed = StyleState {
            foreground: Some(ColorRef::Indexed(200)),
            ..Default::default()
        };
        assert_eq!(indexed.css_classes(), "ansi-idx-200");
    }
}
