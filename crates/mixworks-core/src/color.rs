//! Color values, color-space conversion, and color harmony.
//!
//! Ingredients carry their color as a raw string in one of several encodings
//! (`#rrggbb`, `rgb(r, g, b)`, `hsl(h, s%, l%)`, or a named color). Mixing
//! works on [`Rgb`] triplets; harmony inspection works on whole-number
//! [`Hsl`] triplets.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static RGB_FUNCTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"rgb\((\d+),\s*(\d+),\s*(\d+)\)").expect("static rgb pattern")
});

static HEX_TRIPLET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^#?([a-f\d]{2})([a-f\d]{2})([a-f\d]{2})$").expect("static hex pattern")
});

static HSL_FUNCTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*hsla?\(\s*(-?\d+(?:\.\d+)?)(?:deg)?\s*,\s*(\d+(?:\.\d+)?)%\s*,\s*(\d+(?:\.\d+)?)%\s*(?:,\s*[\d.]+%?\s*)?\)\s*$",
    )
    .expect("static hsl pattern")
});

// ---------------------------------------------------------------------------
// Value types
// ---------------------------------------------------------------------------

/// An 8-bit-per-channel RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

/// A whole-number HSL color: hue in degrees `[0, 360)`, saturation and
/// lightness in percent `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hsl {
    pub h: u16,
    pub s: u8,
    pub l: u8,
}

impl Hsl {
    /// Neutral gray returned when a direct HSL parse fails.
    pub const FALLBACK: Hsl = Hsl { h: 0, s: 50, l: 50 };

    /// Build an HSL value, wrapping the hue and clamping s/l to 100.
    pub fn new(h: u16, s: u8, l: u8) -> Self {
        Self {
            h: h % 360,
            s: s.min(100),
            l: l.min(100),
        }
    }

    /// Convert using the hue-to-RGB helper.
    pub fn to_rgb(self) -> Rgb {
        hsl_to_rgb(
            f64::from(self.h) / 360.0,
            f64::from(self.s) / 100.0,
            f64::from(self.l) / 100.0,
        )
    }

    /// Rotate the hue by `degrees`, keeping saturation and lightness.
    pub fn rotate(self, degrees: u16) -> Self {
        Self {
            h: ((u32::from(self.h) + u32::from(degrees)) % 360) as u16,
            ..self
        }
    }
}

impl fmt::Display for Hsl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hsl({}, {}%, {}%)", self.h, self.s, self.l)
    }
}

// ---------------------------------------------------------------------------
// HSL <-> RGB
// ---------------------------------------------------------------------------

/// Piecewise-linear interpolation over normalized hue sixths.
fn hue_to_rgb(p: f64, q: f64, mut t: f64) -> f64 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        return p + (q - p) * 6.0 * t;
    }
    if t < 1.0 / 2.0 {
        return q;
    }
    if t < 2.0 / 3.0 {
        return p + (q - p) * (2.0 / 3.0 - t) * 6.0;
    }
    p
}

/// Convert normalized HSL (`h`, `s`, `l` all in `[0, 1]`) to RGB.
pub fn hsl_to_rgb(h: f64, s: f64, l: f64) -> Rgb {
    let (r, g, b) = if s == 0.0 {
        (l, l, l)
    } else {
        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;
        (
            hue_to_rgb(p, q, h + 1.0 / 3.0),
            hue_to_rgb(p, q, h),
            hue_to_rgb(p, q, h - 1.0 / 3.0),
        )
    };
    Rgb::new(to_channel(r), to_channel(g), to_channel(b))
}

/// Convert whole-number HSL to RGB via chroma/midpoint decomposition over
/// the six 60-degree hue sectors.
pub fn hsl_to_rgb_sectors(hsl: Hsl) -> Rgb {
    let h = f64::from(hsl.h % 360);
    let s = f64::from(hsl.s) / 100.0;
    let l = f64::from(hsl.l) / 100.0;

    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = l - c / 2.0;

    let (r, g, b) = match hsl.h % 360 {
        0..60 => (c, x, 0.0),
        60..120 => (x, c, 0.0),
        120..180 => (0.0, c, x),
        180..240 => (0.0, x, c),
        240..300 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    Rgb::new(to_channel(r + m), to_channel(g + m), to_channel(b + m))
}

/// Convert RGB to whole-number HSL. A hue that rounds up to 360 wraps to 0.
pub fn rgb_to_hsl(rgb: Rgb) -> Hsl {
    let r = f64::from(rgb.r) / 255.0;
    let g = f64::from(rgb.g) / 255.0;
    let b = f64::from(rgb.b) / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    let (h, s) = if max == min {
        (0.0, 0.0)
    } else {
        let d = max - min;
        let s = if l > 0.5 {
            d / (2.0 - max - min)
        } else {
            d / (max + min)
        };
        let sixths = if max == r {
            (g - b) / d + if g < b { 6.0 } else { 0.0 }
        } else if max == g {
            (b - r) / d + 2.0
        } else {
            (r - g) / d + 4.0
        };
        ((sixths * 60.0).round(), s)
    };

    Hsl {
        h: (h as u16) % 360,
        s: (s * 100.0).round() as u8,
        l: (l * 100.0).round() as u8,
    }
}

fn to_channel(v: f64) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Find an `rgb(r, g, b)` triplet anywhere in `color`. Channel values above
/// 255 are clamped.
pub fn parse_rgb(color: &str) -> Option<Rgb> {
    let caps = RGB_FUNCTION.captures(color)?;
    let channel = |i: usize| -> Option<u8> {
        let digits = caps.get(i)?.as_str();
        // Over-long digit runs are still "a number", just out of range.
        let value = digits.parse::<u32>().unwrap_or(u32::MAX);
        Some(value.min(255) as u8)
    };
    Some(Rgb::new(channel(1)?, channel(2)?, channel(3)?))
}

/// Parse a six-digit hex triplet, with or without a leading `#`.
pub fn parse_hex(color: &str) -> Option<Rgb> {
    let caps = HEX_TRIPLET.captures(color.trim())?;
    let channel = |i: usize| -> Option<u8> { u8::from_str_radix(caps.get(i)?.as_str(), 16).ok() };
    Some(Rgb::new(channel(1)?, channel(2)?, channel(3)?))
}

/// Parse the numeric components of an `hsl(...)` / `hsla(...)` string as
/// `(hue_degrees, saturation_percent, lightness_percent)`. The hue may be
/// fractional or outside `[0, 360)`; it is wrapped.
pub fn parse_hsl_components(color: &str) -> Option<(f64, f64, f64)> {
    let caps = HSL_FUNCTION.captures(color)?;
    let h: f64 = caps.get(1)?.as_str().parse().ok()?;
    let s: f64 = caps.get(2)?.as_str().parse().ok()?;
    let l: f64 = caps.get(3)?.as_str().parse().ok()?;
    Some((h.rem_euclid(360.0), s.min(100.0), l.min(100.0)))
}

/// Direct HSL parse of any supported encoding.
///
/// `hsl(...)` strings are read as-is (rounded to whole numbers); `rgb(...)`
/// and hex strings are converted. Anything else logs a warning and yields
/// [`Hsl::FALLBACK`].
pub fn parse_hsl(color: &str) -> Hsl {
    if let Some((h, s, l)) = parse_hsl_components(color) {
        return Hsl::new(h.round() as u16, s.round() as u8, l.round() as u8);
    }
    if let Some(rgb) = parse_rgb(color) {
        return rgb_to_hsl(rgb);
    }
    if let Some(rgb) = parse_hex(color) {
        return rgb_to_hsl(rgb);
    }
    tracing::warn!(color, "could not parse color, using neutral gray");
    Hsl::FALLBACK
}

// ---------------------------------------------------------------------------
// Resolution of arbitrary color strings
// ---------------------------------------------------------------------------

/// Resolves color strings the engine does not parse itself (named colors,
/// `hsl(...)`, ...) to RGB. This is the capability the presentation layer
/// provides; `None` means "unresolvable".
pub trait ColorResolver {
    fn resolve(&self, color: &str) -> Option<Rgb>;
}

/// Resolver covering `hsl()`/`hsla()` and the basic CSS named colors.
#[derive(Debug, Clone, Copy, Default)]
pub struct CssColorResolver;

const NAMED_COLORS: &[(&str, Rgb)] = &[
    ("black", Rgb::new(0, 0, 0)),
    ("silver", Rgb::new(192, 192, 192)),
    ("gray", Rgb::new(128, 128, 128)),
    ("grey", Rgb::new(128, 128, 128)),
    ("white", Rgb::new(255, 255, 255)),
    ("maroon", Rgb::new(128, 0, 0)),
    ("red", Rgb::new(255, 0, 0)),
    ("purple", Rgb::new(128, 0, 128)),
    ("fuchsia", Rgb::new(255, 0, 255)),
    ("magenta", Rgb::new(255, 0, 255)),
    ("green", Rgb::new(0, 128, 0)),
    ("lime", Rgb::new(0, 255, 0)),
    ("olive", Rgb::new(128, 128, 0)),
    ("yellow", Rgb::new(255, 255, 0)),
    ("navy", Rgb::new(0, 0, 128)),
    ("blue", Rgb::new(0, 0, 255)),
    ("teal", Rgb::new(0, 128, 128)),
    ("aqua", Rgb::new(0, 255, 255)),
    ("cyan", Rgb::new(0, 255, 255)),
    ("orange", Rgb::new(255, 165, 0)),
    ("brown", Rgb::new(165, 42, 42)),
    ("pink", Rgb::new(255, 192, 203)),
];

impl ColorResolver for CssColorResolver {
    fn resolve(&self, color: &str) -> Option<Rgb> {
        if let Some((h, s, l)) = parse_hsl_components(color) {
            return Some(hsl_to_rgb(h / 360.0, s / 100.0, l / 100.0));
        }
        let name = color.trim();
        NAMED_COLORS
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|&(_, rgb)| rgb)
    }
}

/// Resolve one raw color string: an `rgb(...)` triplet anywhere in the
/// string wins, then a `#`-prefixed hex triplet, then the resolver.
pub fn resolve_color(color: &str, resolver: &dyn ColorResolver) -> Option<Rgb> {
    if let Some(rgb) = parse_rgb(color) {
        return Some(rgb);
    }
    if color.starts_with('#') {
        return parse_hex(color);
    }
    resolver.resolve(color)
}

/// Per-channel arithmetic mean, each channel rounded half-up.
/// `None` for an empty input.
pub fn mean_color(colors: &[Rgb]) -> Option<Rgb> {
    if colors.is_empty() {
        return None;
    }
    let n = colors.len() as u64;
    let (mut r, mut g, mut b) = (0u64, 0u64, 0u64);
    for c in colors {
        r += u64::from(c.r);
        g += u64::from(c.g);
        b += u64::from(c.b);
    }
    // floor(sum / n + 1/2) without leaving integers.
    let avg = |sum: u64| ((2 * sum + n) / (2 * n)) as u8;
    Some(Rgb::new(avg(r), avg(g), avg(b)))
}

// ---------------------------------------------------------------------------
// Harmony
// ---------------------------------------------------------------------------

/// The two triadic companions of `base`: hue +120 and +240 degrees.
pub fn triadic(base: Hsl) -> [Hsl; 2] {
    [base.rotate(120), base.rotate(240)]
}

/// A color together with its triadic scheme, in both encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorHarmony {
    pub base: Rgb,
    pub base_hsl: Hsl,
    pub triadic: [Hsl; 2],
    pub triadic_rgb: [Rgb; 2],
}

impl ColorHarmony {
    pub fn of(base: Rgb) -> Self {
        let base_hsl = rgb_to_hsl(base);
        let triadic = triadic(base_hsl);
        Self {
            base,
            base_hsl,
            triadic,
            triadic_rgb: [
                hsl_to_rgb_sectors(triadic[0]),
                hsl_to_rgb_sectors(triadic[1]),
            ],
        }
    }

    /// Label color for the `index`-th grid cell showing this harmony:
    /// even cells use the first companion, odd cells the second.
    pub fn label_color(&self, index: usize) -> Hsl {
        self.triadic[index % 2]
    }
}
