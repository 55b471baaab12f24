//! Per-property style value validation
//!
//! Every validator takes a raw value from the design panel and returns a
//! [`ValidationResult`] holding a value that is safe to write into an inline
//! style. Validators never fail: unrecoverable input comes back with
//! `is_valid = false` and an error, recoverable-but-notable input with
//! `is_valid = true` and a warning.
//!
//! Negative numbers are handled differently per family. Dimensions accept
//! them with a warning, spacing accepts them silently (shorthand semantics),
//! border radius and border width reject them.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

/// Raw or sanitized style value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StyleValue {
    Number(f64),
    Text(String),
}

impl StyleValue {
    pub fn text(value: impl Into<String>) -> Self {
        StyleValue::Text(value.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            StyleValue::Text(s) => Some(s),
            StyleValue::Number(_) => None,
        }
    }
}

impl fmt::Display for StyleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StyleValue::Number(n) => write!(f, "{}", format_number(*n)),
            StyleValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for StyleValue {
    fn from(value: &str) -> Self {
        StyleValue::Text(value.to_string())
    }
}

impl From<String> for StyleValue {
    fn from(value: String) -> Self {
        StyleValue::Text(value)
    }
}

impl From<f64> for StyleValue {
    fn from(value: f64) -> Self {
        StyleValue::Number(value)
    }
}

/// Outcome of validating one `(property, value)` pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub sanitized_value: StyleValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl ValidationResult {
    pub fn ok(value: impl Into<StyleValue>) -> Self {
        Self {
            is_valid: true,
            sanitized_value: value.into(),
            error: None,
            warning: None,
        }
    }

    pub fn warn(value: impl Into<StyleValue>, warning: impl Into<String>) -> Self {
        Self {
            is_valid: true,
            sanitized_value: value.into(),
            error: None,
            warning: Some(warning.into()),
        }
    }

    /// Rejected input; the original value is echoed back unchanged
    pub fn invalid(original: &StyleValue, error: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            sanitized_value: original.clone(),
            error: Some(error.into()),
            warning: None,
        }
    }
}

pub type Validator = fn(&StyleValue) -> ValidationResult;

pub const LENGTH_UNITS: &[&str] = &[
    "px", "%", "em", "rem", "vh", "vw", "vmin", "vmax", "ch", "ex", "cm", "mm", "in", "pt", "pc",
];

const DIMENSION_KEYWORDS: &[&str] = &[
    "auto",
    "inherit",
    "initial",
    "unset",
    "fit-content",
    "max-content",
    "min-content",
    "none",
];

const GLOBAL_KEYWORDS: &[&str] = &["inherit", "initial", "unset"];

const FONT_SIZE_KEYWORDS: &[&str] = &[
    "xx-small", "x-small", "small", "medium", "large", "x-large", "xx-large", "xxx-large",
    "smaller", "larger", "inherit", "initial", "unset",
];

const FONT_WEIGHT_KEYWORDS: &[&str] = &[
    "normal", "bold", "bolder", "lighter", "inherit", "initial", "unset",
];

const BORDER_WIDTH_KEYWORDS: &[&str] = &["thin", "medium", "thick", "inherit", "initial", "unset"];

const LINE_HEIGHT_KEYWORDS: &[&str] = &["normal", "inherit", "initial", "unset"];

const SHADOW_KEYWORDS: &[&str] = &["none", "inherit", "initial", "unset"];

pub const NAMED_COLORS: &[&str] = &[
    "aliceblue", "antiquewhite", "aqua", "aquamarine", "azure", "beige", "bisque", "black",
    "blanchedalmond", "blue", "blueviolet", "brown", "burlywood", "cadetblue", "chartreuse",
    "chocolate", "coral", "cornflowerblue", "cornsilk", "crimson", "cyan", "darkblue",
    "darkcyan", "darkgoldenrod", "darkgray", "darkgreen", "darkgrey", "darkkhaki",
    "darkmagenta", "darkolivegreen", "darkorange", "darkorchid", "darkred", "darksalmon",
    "darkseagreen", "darkslateblue", "darkslategray", "darkslategrey", "darkturquoise",
    "darkviolet", "deeppink", "deepskyblue", "dimgray", "dimgrey", "dodgerblue", "firebrick",
    "floralwhite", "forestgreen", "fuchsia", "gainsboro", "ghostwhite", "gold", "goldenrod",
    "gray", "green", "greenyellow", "grey", "honeydew", "hotpink", "indianred", "indigo",
    "ivory", "khaki", "lavender", "lavenderblush", "lawngreen", "lemonchiffon", "lightblue",
    "lightcoral", "lightcyan", "lightgoldenrodyellow", "lightgray", "lightgreen", "lightgrey",
    "lightpink", "lightsalmon", "lightseagreen", "lightskyblue", "lightslategray",
    "lightslategrey", "lightsteelblue", "lightyellow", "lime", "limegreen", "linen", "magenta",
    "maroon", "mediumaquamarine", "mediumblue", "mediumorchid", "mediumpurple",
    "mediumseagreen", "mediumslateblue", "mediumspringgreen", "mediumturquoise",
    "mediumvioletred", "midnightblue", "mintcream", "mistyrose", "moccasin", "navajowhite",
    "navy", "oldlace", "olive", "olivedrab", "orange", "orangered", "orchid", "palegoldenrod",
    "palegreen", "paleturquoise", "palevioletred", "papayawhip", "peachpuff", "peru", "pink",
    "plum", "powderblue", "purple", "rebeccapurple", "red", "rosybrown", "royalblue",
    "saddlebrown", "salmon", "sandybrown", "seagreen", "seashell", "sienna", "silver",
    "skyblue", "slateblue", "slategray", "slategrey", "snow", "springgreen", "steelblue", "tan",
    "teal", "thistle", "tomato", "turquoise", "violet", "wheat", "white", "whitesmoke",
    "yellow", "yellowgreen",
];

const COLOR_KEYWORDS: &[&str] = &["transparent", "inherit", "initial"];

fn length_regex() -> &'static Regex {
    static LENGTH_REGEX: OnceLock<Regex> = OnceLock::new();
    LENGTH_REGEX.get_or_init(|| {
        Regex::new(r"^([+-]?(?:\d+\.?\d*|\.\d+))(px|%|em|rem|vh|vw|vmin|vmax|ch|ex|cm|mm|in|pt|pc)?$")
            .expect("length regex")
    })
}

fn hex_regex() -> &'static Regex {
    static HEX_REGEX: OnceLock<Regex> = OnceLock::new();
    HEX_REGEX.get_or_init(|| {
        Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$").expect("hex regex")
    })
}

fn color_function_regex() -> &'static Regex {
    static COLOR_FN_REGEX: OnceLock<Regex> = OnceLock::new();
    COLOR_FN_REGEX
        .get_or_init(|| Regex::new(r"^(rgba?|hsla?)\((.*)\)$").expect("color function regex"))
}

fn shadow_regex() -> &'static Regex {
    static SHADOW_REGEX: OnceLock<Regex> = OnceLock::new();
    SHADOW_REGEX.get_or_init(|| {
        Regex::new(r"(?i)^(inset\s+)?-?(\d*\.)?\d+(px|em|rem)?\s+-?(\d*\.)?\d+(px|em|rem)?")
            .expect("shadow regex")
    })
}

fn color_token_regex() -> &'static Regex {
    static COLOR_TOKEN_REGEX: OnceLock<Regex> = OnceLock::new();
    COLOR_TOKEN_REGEX.get_or_init(|| {
        Regex::new(r"(?i)#[0-9a-f]{3,8}\b|\b(rgba?|hsla?)\(").expect("color token regex")
    })
}

/// Format a number the way it should appear in CSS text: the shortest
/// form that reads back as the same value
pub fn format_number(n: f64) -> String {
    // adding zero turns -0 into 0
    format!("{}", n + 0.0)
}

/// Parse `N` or `N<unit>`; a bare number is taken as pixels
fn parse_length(token: &str) -> Option<(f64, String)> {
    let lowered = token.to_ascii_lowercase();
    let caps = length_regex().captures(&lowered)?;
    let number: f64 = caps[1].parse().ok()?;
    if !number.is_finite() {
        return None;
    }
    let unit = caps.get(2).map(|m| m.as_str()).unwrap_or("px");
    Some((number, unit.to_string()))
}

fn format_length(number: f64, unit: &str) -> String {
    format!("{}{}", format_number(number), unit)
}

fn is_calc(value: &str) -> bool {
    value.to_ascii_lowercase().starts_with("calc(")
}

/// Only checks that parentheses balance and the expression is closed
fn calc_is_balanced(value: &str) -> bool {
    let mut depth: i32 = 0;
    for c in value.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0 && value.ends_with(')')
}

fn keyword<'a>(value: &str, allowed: &[&'a str]) -> Option<&'a str> {
    let lowered = value.to_ascii_lowercase();
    allowed.iter().copied().find(|k| *k == lowered)
}

fn non_finite(original: &StyleValue) -> ValidationResult {
    ValidationResult::invalid(original, "Value must be a finite number")
}

fn empty(original: &StyleValue) -> ValidationResult {
    ValidationResult::invalid(original, "Value cannot be empty")
}

/// Widths, heights and offsets
pub fn validate_dimension(value: &StyleValue) -> ValidationResult {
    let (number, unit) = match value {
        StyleValue::Number(n) => {
            if !n.is_finite() {
                return non_finite(value);
            }
            (*n, "px".to_string())
        }
        StyleValue::Text(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return empty(value);
            }
            if let Some(k) = keyword(trimmed, DIMENSION_KEYWORDS) {
                return ValidationResult::ok(k);
            }
            if is_calc(trimmed) {
                return validate_calc(value, trimmed);
            }
            match parse_length(trimmed) {
                Some(parsed) => parsed,
                None => {
                    return ValidationResult::invalid(
                        value,
                        format!(
                            "Invalid dimension '{}'. Use a number with a unit ({}) or a keyword like auto",
                            trimmed,
                            LENGTH_UNITS.join(", ")
                        ),
                    );
                }
            }
        }
    };

    let sanitized = format_length(number, &unit);
    if number < 0.0 {
        return ValidationResult::warn(
            sanitized.clone(),
            format!("Negative value {} may cause layout issues", sanitized),
        );
    }
    ValidationResult::ok(sanitized)
}

fn validate_calc(original: &StyleValue, trimmed: &str) -> ValidationResult {
    if calc_is_balanced(trimmed) {
        ValidationResult::ok(trimmed)
    } else {
        ValidationResult::invalid(original, "Unbalanced parentheses in calc() expression")
    }
}

/// Margins, paddings and gaps, including 1-4 token shorthand
pub fn validate_spacing(value: &StyleValue) -> ValidationResult {
    let raw = match value {
        StyleValue::Number(n) => {
            if !n.is_finite() {
                return non_finite(value);
            }
            return ValidationResult::ok(format_length(*n, "px"));
        }
        StyleValue::Text(raw) => raw.trim(),
    };

    if raw.is_empty() {
        return empty(value);
    }
    if let Some(k) = keyword(raw, GLOBAL_KEYWORDS) {
        return ValidationResult::ok(k);
    }
    if is_calc(raw) {
        return validate_calc(value, raw);
    }

    let tokens: Vec<&str> = raw.split_whitespace().collect();
    if tokens.len() > 4 {
        return ValidationResult::invalid(
            value,
            format!("Spacing accepts at most 4 values, got {}", tokens.len()),
        );
    }

    let mut normalized = Vec::with_capacity(tokens.len());
    for token in tokens {
        if token.eq_ignore_ascii_case("auto") {
            normalized.push("auto".to_string());
            continue;
        }
        match parse_length(token) {
            Some((number, unit)) => normalized.push(format_length(number, &unit)),
            None => {
                return ValidationResult::invalid(
                    value,
                    format!("Invalid spacing value '{}'", token),
                );
            }
        }
    }

    ValidationResult::ok(normalized.join(" "))
}

/// Hex, rgb(a), hsl(a) and named colors
pub fn validate_color(value: &StyleValue) -> ValidationResult {
    let raw = match value {
        StyleValue::Number(_) => {
            return ValidationResult::invalid(value, "Color must be a string");
        }
        StyleValue::Text(raw) => raw.trim(),
    };

    if raw.is_empty() {
        return empty(value);
    }

    if hex_regex().is_match(raw) {
        return ValidationResult::ok(normalize_hex(raw));
    }

    let lowered = raw.to_ascii_lowercase();
    if lowered == "currentcolor" {
        return ValidationResult::ok("currentColor");
    }
    if let Some(k) = keyword(&lowered, COLOR_KEYWORDS) {
        return ValidationResult::ok(k);
    }
    if let Some(k) = keyword(&lowered, NAMED_COLORS) {
        return ValidationResult::ok(k);
    }

    if let Some(caps) = color_function_regex().captures(&lowered) {
        let function = &caps[1];
        let parsed = if function.starts_with("rgb") {
            parse_rgb(&caps[2])
        } else {
            parse_hsl(&caps[2])
        };
        if let Some(sanitized) = parsed {
            return ValidationResult::ok(sanitized);
        }
        return ValidationResult::invalid(value, format!("Invalid {}() color '{}'", function, raw));
    }

    ValidationResult::invalid(
        value,
        format!(
            "Invalid color '{}'. Use a hex color (#rrggbb), rgb(), hsl() or a named color",
            raw
        ),
    )
}

fn normalize_hex(raw: &str) -> String {
    let digits = &raw[1..];
    if digits.len() == 3 {
        let expanded: String = digits.chars().flat_map(|c| [c, c]).collect();
        format!("#{}", expanded.to_ascii_lowercase())
    } else {
        format!("#{}", digits.to_ascii_lowercase())
    }
}

/// Split color function arguments on commas, whitespace and `/`
fn color_args(inner: &str) -> Vec<&str> {
    inner
        .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_number(token: &str) -> Option<f64> {
    let n: f64 = token.parse().ok()?;
    n.is_finite().then_some(n)
}

fn parse_alpha(token: &str) -> Option<f64> {
    let alpha = match token.strip_suffix('%') {
        Some(pct) => parse_number(pct)? / 100.0,
        None => parse_number(token)?,
    };
    Some(alpha.clamp(0.0, 1.0))
}

fn parse_rgb(inner: &str) -> Option<String> {
    let args = color_args(inner);
    if args.len() != 3 && args.len() != 4 {
        return None;
    }

    let mut channels = [0u8; 3];
    for (slot, token) in channels.iter_mut().zip(&args[..3]) {
        let value = match token.strip_suffix('%') {
            Some(pct) => parse_number(pct)? * 2.55,
            None => parse_number(token)?,
        };
        *slot = value.round().clamp(0.0, 255.0) as u8;
    }

    let alpha = match args.get(3) {
        Some(token) => parse_alpha(token)?,
        None => 1.0,
    };

    let [r, g, b] = channels;
    if alpha >= 1.0 {
        Some(format!("rgb({}, {}, {})", r, g, b))
    } else {
        Some(format!("rgba({}, {}, {}, {})", r, g, b, format_number(alpha)))
    }
}

fn parse_hsl(inner: &str) -> Option<String> {
    let args = color_args(inner);
    if args.len() != 3 && args.len() != 4 {
        return None;
    }

    let hue_token = args[0].strip_suffix("deg").unwrap_or(args[0]);
    let hue = parse_number(hue_token)?.rem_euclid(360.0);

    let percent = |token: &str| -> Option<f64> {
        let number = token.strip_suffix('%').unwrap_or(token);
        Some(parse_number(number)?.clamp(0.0, 100.0))
    };
    let saturation = percent(args[1])?;
    let lightness = percent(args[2])?;

    let alpha = match args.get(3) {
        Some(token) => parse_alpha(token)?,
        None => 1.0,
    };

    let (h, s, l) = (
        format_number(hue),
        format_number(saturation),
        format_number(lightness),
    );
    if alpha >= 1.0 {
        Some(format!("hsl({}, {}%, {}%)", h, s, l))
    } else {
        Some(format!("hsla({}, {}%, {}%, {})", h, s, l, format_number(alpha)))
    }
}

pub fn validate_font_size(value: &StyleValue) -> ValidationResult {
    let raw = match value {
        StyleValue::Number(n) => {
            if !n.is_finite() {
                return non_finite(value);
            }
            if *n <= 0.0 {
                return ValidationResult::invalid(value, "Font size must be greater than 0");
            }
            return ValidationResult::ok(format_length(*n, "px"));
        }
        StyleValue::Text(raw) => raw.trim(),
    };

    if raw.is_empty() {
        return empty(value);
    }
    if let Some(k) = keyword(raw, FONT_SIZE_KEYWORDS) {
        return ValidationResult::ok(k);
    }
    if is_calc(raw) {
        return validate_calc(value, raw);
    }
    match parse_length(raw) {
        Some((number, _)) if number <= 0.0 => {
            ValidationResult::invalid(value, "Font size must be greater than 0")
        }
        Some((number, unit)) => ValidationResult::ok(format_length(number, &unit)),
        None => ValidationResult::invalid(
            value,
            format!("Invalid font size '{}'. Use a positive length or a size keyword", raw),
        ),
    }
}

pub fn validate_font_weight(value: &StyleValue) -> ValidationResult {
    let weight = match value {
        StyleValue::Number(n) => *n,
        StyleValue::Text(raw) => {
            let trimmed = raw.trim();
            if let Some(k) = keyword(trimmed, FONT_WEIGHT_KEYWORDS) {
                return ValidationResult::ok(k);
            }
            match parse_number(trimmed) {
                Some(n) if (100.0..=900.0).contains(&n) => n,
                _ => {
                    return ValidationResult::invalid(
                        value,
                        format!(
                            "Invalid font weight '{}'. Use 100-900 or normal, bold, bolder, lighter",
                            trimmed
                        ),
                    );
                }
            }
        }
    };

    if !weight.is_finite() || !(1.0..=1000.0).contains(&weight) {
        return ValidationResult::invalid(value, "Font weight must be between 1 and 1000");
    }
    if (100.0..=900.0).contains(&weight) && weight % 100.0 == 0.0 {
        return ValidationResult::ok(weight);
    }
    ValidationResult::warn(
        weight,
        format!(
            "Font weight {} is not a standard value (100-900 in steps of 100)",
            format_number(weight)
        ),
    )
}

pub fn validate_opacity(value: &StyleValue) -> ValidationResult {
    let parsed = match value {
        StyleValue::Number(n) => Some(*n).filter(|n| n.is_finite()),
        StyleValue::Text(raw) => {
            let trimmed = raw.trim();
            match trimmed.strip_suffix('%') {
                Some(pct) => parse_number(pct).map(|n| n / 100.0),
                None => parse_number(trimmed),
            }
        }
    };

    let Some(opacity) = parsed else {
        return ValidationResult::invalid(value, "Opacity must be a number between 0 and 1");
    };

    let clamped = opacity.clamp(0.0, 1.0);
    if clamped != opacity {
        return ValidationResult::warn(
            clamped,
            format!(
                "Opacity {} clamped to {}",
                format_number(opacity),
                format_number(clamped)
            ),
        );
    }
    ValidationResult::ok(opacity)
}

/// Non-negative lengths, 1-4 token shorthand
pub fn validate_border_radius(value: &StyleValue) -> ValidationResult {
    let raw = match value {
        StyleValue::Number(n) => {
            if !n.is_finite() {
                return non_finite(value);
            }
            if *n < 0.0 {
                return ValidationResult::invalid(value, "Border radius cannot be negative");
            }
            return ValidationResult::ok(format_length(*n, "px"));
        }
        StyleValue::Text(raw) => raw.trim(),
    };

    if raw.is_empty() {
        return empty(value);
    }
    if let Some(k) = keyword(raw, GLOBAL_KEYWORDS) {
        return ValidationResult::ok(k);
    }
    if is_calc(raw) {
        return validate_calc(value, raw);
    }

    let tokens: Vec<&str> = raw.split_whitespace().collect();
    if tokens.len() > 4 {
        return ValidationResult::invalid(
            value,
            format!("Border radius accepts at most 4 values, got {}", tokens.len()),
        );
    }

    let mut normalized = Vec::with_capacity(tokens.len());
    for token in tokens {
        match parse_length(token) {
            Some((number, _)) if number < 0.0 => {
                return ValidationResult::invalid(value, "Border radius cannot be negative");
            }
            Some((number, unit)) => normalized.push(format_length(number, &unit)),
            None => {
                return ValidationResult::invalid(
                    value,
                    format!("Invalid border radius value '{}'", token),
                );
            }
        }
    }

    ValidationResult::ok(normalized.join(" "))
}

pub fn validate_border_width(value: &StyleValue) -> ValidationResult {
    let raw = match value {
        StyleValue::Number(n) => {
            if !n.is_finite() {
                return non_finite(value);
            }
            if *n < 0.0 {
                return ValidationResult::invalid(value, "Border width cannot be negative");
            }
            return ValidationResult::ok(format_length(*n, "px"));
        }
        StyleValue::Text(raw) => raw.trim(),
    };

    if raw.is_empty() {
        return empty(value);
    }
    if let Some(k) = keyword(raw, BORDER_WIDTH_KEYWORDS) {
        return ValidationResult::ok(k);
    }
    match parse_length(raw) {
        Some((number, _)) if number < 0.0 => {
            ValidationResult::invalid(value, "Border width cannot be negative")
        }
        Some((number, unit)) => ValidationResult::ok(format_length(number, &unit)),
        None => ValidationResult::invalid(
            value,
            format!("Invalid border width '{}'. Use a length or thin, medium, thick", raw),
        ),
    }
}

pub fn validate_line_height(value: &StyleValue) -> ValidationResult {
    let raw = match value {
        StyleValue::Number(n) => {
            if !n.is_finite() {
                return non_finite(value);
            }
            if *n < 0.0 {
                return ValidationResult::invalid(value, "Line height cannot be negative");
            }
            return ValidationResult::ok(*n);
        }
        StyleValue::Text(raw) => raw.trim(),
    };

    if raw.is_empty() {
        return empty(value);
    }
    if let Some(k) = keyword(raw, LINE_HEIGHT_KEYWORDS) {
        return ValidationResult::ok(k);
    }

    // unitless numbers are multipliers, not pixels
    if let Some(number) = parse_number(raw) {
        if number < 0.0 {
            return ValidationResult::invalid(value, "Line height cannot be negative");
        }
        return ValidationResult::ok(number);
    }

    match parse_length(raw) {
        Some((number, _)) if number < 0.0 => {
            ValidationResult::invalid(value, "Line height cannot be negative")
        }
        Some((number, unit)) => ValidationResult::ok(format_length(number, &unit)),
        None => ValidationResult::invalid(
            value,
            format!("Invalid line height '{}'. Use a number, a length or normal", raw),
        ),
    }
}

/// Shadows are too varied to validate fully: anything is accepted, odd
/// looking values get a warning
pub fn validate_box_shadow(value: &StyleValue) -> ValidationResult {
    let raw = match value {
        StyleValue::Number(n) => {
            return ValidationResult::warn(
                format_number(*n),
                "Box shadow should include offsets and a color",
            );
        }
        StyleValue::Text(raw) => raw.trim(),
    };

    if raw.is_empty() {
        return ValidationResult::ok("");
    }
    if let Some(k) = keyword(raw, SHADOW_KEYWORDS) {
        return ValidationResult::ok(k);
    }

    let has_color = color_token_regex().is_match(raw)
        || raw
            .split(|c: char| c.is_whitespace() || c == ',')
            .any(|word| keyword(word, NAMED_COLORS).is_some());
    if shadow_regex().is_match(raw) || has_color {
        return ValidationResult::ok(raw);
    }

    ValidationResult::warn(
        raw,
        format!("Box shadow '{}' could not be verified and is applied as-is", raw),
    )
}

/// Free-form values such as font families
pub fn validate_text(value: &StyleValue) -> ValidationResult {
    match value {
        StyleValue::Number(n) => ValidationResult::ok(format_number(*n)),
        StyleValue::Text(raw) => ValidationResult::ok(raw.trim()),
    }
}

fn validators() -> &'static HashMap<&'static str, Validator> {
    static VALIDATORS: OnceLock<HashMap<&'static str, Validator>> = OnceLock::new();
    VALIDATORS.get_or_init(|| {
        let mut table: HashMap<&'static str, Validator> = HashMap::new();
        let families: &[(&[&'static str], Validator)] = &[
            (
                &[
                    "width", "height", "minWidth", "maxWidth", "minHeight", "maxHeight", "top",
                    "right", "bottom", "left", "flexBasis",
                ],
                validate_dimension,
            ),
            (
                &[
                    "margin", "marginTop", "marginRight", "marginBottom", "marginLeft", "padding",
                    "paddingTop", "paddingRight", "paddingBottom", "paddingLeft", "gap", "rowGap",
                    "columnGap", "letterSpacing",
                ],
                validate_spacing,
            ),
            (
                &[
                    "color", "backgroundColor", "borderColor", "borderTopColor",
                    "borderRightColor", "borderBottomColor", "borderLeftColor", "outlineColor",
                    "textDecorationColor",
                ],
                validate_color,
            ),
            (&["fontSize"], validate_font_size),
            (&["fontWeight"], validate_font_weight),
            (&["opacity"], validate_opacity),
            (
                &[
                    "borderRadius", "borderTopLeftRadius", "borderTopRightRadius",
                    "borderBottomRightRadius", "borderBottomLeftRadius",
                ],
                validate_border_radius,
            ),
            (
                &[
                    "borderWidth", "borderTopWidth", "borderRightWidth", "borderBottomWidth",
                    "borderLeftWidth", "outlineWidth",
                ],
                validate_border_width,
            ),
            (&["lineHeight"], validate_line_height),
            (&["boxShadow", "textShadow"], validate_box_shadow),
            (
                &["fontFamily", "fontStyle", "textAlign", "textTransform", "textDecoration"],
                validate_text,
            ),
        ];
        for (properties, validator) in families {
            for property in *properties {
                table.insert(*property, *validator);
            }
        }
        table
    })
}

/// `font-size` and `fontSize` name the same property
pub fn normalize_property(property: &str) -> String {
    let trimmed = property.trim();
    if !trimmed.contains('-') {
        return trimmed.to_string();
    }
    let mut out = String::with_capacity(trimmed.len());
    let mut upper_next = false;
    for c in trimmed.chars() {
        if c == '-' {
            upper_next = !out.is_empty();
        } else if upper_next {
            out.push(c.to_ascii_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

pub fn validator_for(property: &str) -> Option<Validator> {
    validators().get(normalize_property(property).as_str()).copied()
}

/// Validate one value. Unknown properties pass through untouched.
pub fn validate_style(property: &str, value: &StyleValue) -> ValidationResult {
    match validator_for(property) {
        Some(validator) => validator(value),
        None => ValidationResult::ok(value.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> StyleValue {
        StyleValue::text(s)
    }

    fn sanitized(result: &ValidationResult) -> String {
        result.sanitized_value.to_string()
    }

    #[test]
    fn dimension_accepts_every_unit() {
        for unit in LENGTH_UNITS {
            for n in ["0", "12", "1.5", "300"] {
                let raw = format!("{}{}", n, unit);
                let result = validate_dimension(&text(&raw));
                assert!(result.is_valid, "{}", raw);
                assert_eq!(sanitized(&result), raw);
                assert!(result.warning.is_none());
            }
        }
    }

    #[test]
    fn dimension_keeps_full_precision() {
        for raw in ["0.123456px", "33.333333%", "1.00001em", "123456789.5px"] {
            assert_eq!(sanitized(&validate_dimension(&text(raw))), raw);
        }
        assert_eq!(sanitized(&validate_dimension(&text("-0px"))), "0px");
    }

    #[test]
    fn dimension_numbers_default_to_px() {
        assert_eq!(sanitized(&validate_dimension(&StyleValue::Number(120.0))), "120px");
        assert_eq!(sanitized(&validate_dimension(&text("64"))), "64px");
    }

    #[test]
    fn dimension_keywords_and_calc() {
        assert_eq!(sanitized(&validate_dimension(&text("Fit-Content"))), "fit-content");
        assert!(validate_dimension(&text("calc(100% - (2 * 16px))")).is_valid);
        let broken = validate_dimension(&text("calc(100% - (2 * 16px)"));
        assert!(!broken.is_valid);
        assert!(broken.error.unwrap().contains("calc"));
    }

    #[test]
    fn dimension_negative_warns() {
        let result = validate_dimension(&text("-10px"));
        assert!(result.is_valid);
        assert_eq!(sanitized(&result), "-10px");
        assert!(result.warning.is_some());
    }

    #[test]
    fn dimension_rejects_garbage() {
        let result = validate_dimension(&text("ten pixels"));
        assert!(!result.is_valid);
        assert_eq!(result.sanitized_value, text("ten pixels"));
        assert!(!validate_dimension(&text("12furlongs")).is_valid);
        assert!(!validate_dimension(&text("  ")).is_valid);
    }

    #[test]
    fn spacing_shorthand() {
        let result = validate_spacing(&text("10px auto -4px 2"));
        assert!(result.is_valid);
        assert!(result.warning.is_none());
        assert_eq!(sanitized(&result), "10px auto -4px 2px");

        assert!(!validate_spacing(&text("1px 2px 3px 4px 5px")).is_valid);
        let bad = validate_spacing(&text("1px wide"));
        assert!(!bad.is_valid);
        assert!(bad.error.unwrap().contains("wide"));
    }

    #[test]
    fn hex_colors() {
        assert_eq!(sanitized(&validate_color(&text("#abc"))), "#aabbcc");
        assert_eq!(sanitized(&validate_color(&text("#ABC"))), "#aabbcc");
        assert_eq!(sanitized(&validate_color(&text("#FF8800"))), "#ff8800");
        assert_eq!(sanitized(&validate_color(&text("#FF880080"))), "#ff880080");
        assert!(!validate_color(&text("#abcd")).is_valid);
        assert!(!validate_color(&text("#ggg")).is_valid);
    }

    #[test]
    fn rgb_colors_clamp() {
        assert_eq!(
            sanitized(&validate_color(&text("rgb(300, -5, 128)"))),
            "rgb(255, 0, 128)"
        );
        assert_eq!(
            sanitized(&validate_color(&text("rgba(10, 20, 30, 1)"))),
            "rgb(10, 20, 30)"
        );
        assert_eq!(
            sanitized(&validate_color(&text("rgba(10, 20, 30, 1.7)"))),
            "rgb(10, 20, 30)"
        );
        assert_eq!(
            sanitized(&validate_color(&text("rgba(10, 20, 30, 0.25)"))),
            "rgba(10, 20, 30, 0.25)"
        );
        assert!(!validate_color(&text("rgb(1, 2)")).is_valid);
    }

    #[test]
    fn hsl_colors_wrap_and_clamp() {
        assert_eq!(
            sanitized(&validate_color(&text("hsl(420, 150%, -3%)"))),
            "hsl(60, 100%, 0%)"
        );
        assert_eq!(
            sanitized(&validate_color(&text("hsla(-30, 50%, 50%, 0.5)"))),
            "hsla(330, 50%, 50%, 0.5)"
        );
    }

    #[test]
    fn named_colors_and_keywords() {
        assert_eq!(sanitized(&validate_color(&text("RebeccaPurple"))), "rebeccapurple");
        assert_eq!(sanitized(&validate_color(&text("currentcolor"))), "currentColor");
        assert_eq!(sanitized(&validate_color(&text("transparent"))), "transparent");
        assert!(!validate_color(&text("blurple")).is_valid);
        assert!(!validate_color(&StyleValue::Number(255.0)).is_valid);
    }

    #[test]
    fn font_size() {
        assert_eq!(sanitized(&validate_font_size(&StyleValue::Number(18.0))), "18px");
        assert!(!validate_font_size(&StyleValue::Number(0.0)).is_valid);
        assert!(!validate_font_size(&StyleValue::Number(-2.0)).is_valid);
        assert_eq!(sanitized(&validate_font_size(&text("x-large"))), "x-large");
        assert_eq!(sanitized(&validate_font_size(&text("1.25rem"))), "1.25rem");
        assert!(!validate_font_size(&text("0px")).is_valid);
        assert!(!validate_font_size(&text("huge")).is_valid);
    }

    #[test]
    fn font_weight() {
        assert_eq!(
            validate_font_weight(&StyleValue::Number(700.0)),
            ValidationResult::ok(700.0)
        );
        let odd = validate_font_weight(&StyleValue::Number(450.0));
        assert!(odd.is_valid);
        assert!(odd.warning.is_some());
        assert!(!validate_font_weight(&StyleValue::Number(1200.0)).is_valid);
        assert!(!validate_font_weight(&StyleValue::Number(0.0)).is_valid);
        assert_eq!(sanitized(&validate_font_weight(&text("Bold"))), "bold");
        assert_eq!(
            validate_font_weight(&text("600")).sanitized_value,
            StyleValue::Number(600.0)
        );
        assert!(!validate_font_weight(&text("950")).is_valid);
        assert!(!validate_font_weight(&text("heavy")).is_valid);
    }

    #[test]
    fn opacity_clamps_with_warning() {
        let high = validate_opacity(&StyleValue::Number(1.5));
        assert!(high.is_valid);
        assert_eq!(high.sanitized_value, StyleValue::Number(1.0));
        let warning = high.warning.unwrap();
        assert!(warning.contains("1.5") && warning.contains("clamped"));

        let low = validate_opacity(&StyleValue::Number(-0.2));
        assert!(low.is_valid);
        assert_eq!(low.sanitized_value, StyleValue::Number(0.0));
        assert!(low.warning.unwrap().contains("-0.2"));

        assert!(!validate_opacity(&text("x")).is_valid);
        assert_eq!(validate_opacity(&text("0.4")), ValidationResult::ok(0.4));
        assert_eq!(validate_opacity(&text("50%")), ValidationResult::ok(0.5));
    }

    #[test]
    fn border_radius_rejects_negatives() {
        assert_eq!(sanitized(&validate_border_radius(&text("4px 50%"))), "4px 50%");
        assert!(!validate_border_radius(&text("-4px")).is_valid);
        assert!(!validate_border_radius(&StyleValue::Number(-1.0)).is_valid);
        assert!(!validate_border_radius(&text("1px 2px 3px 4px 5px")).is_valid);
    }

    #[test]
    fn border_width() {
        assert_eq!(sanitized(&validate_border_width(&text("THICK"))), "thick");
        assert_eq!(sanitized(&validate_border_width(&StyleValue::Number(2.0))), "2px");
        assert!(!validate_border_width(&text("-1px")).is_valid);
        // shorthand is a radius-only feature
        assert!(!validate_border_width(&text("1px 2px")).is_valid);
    }

    #[test]
    fn line_height() {
        assert_eq!(validate_line_height(&text("1.5")), ValidationResult::ok(1.5));
        assert_eq!(sanitized(&validate_line_height(&text("24px"))), "24px");
        assert_eq!(sanitized(&validate_line_height(&text("normal"))), "normal");
        assert!(!validate_line_height(&text("-1")).is_valid);
        assert!(!validate_line_height(&StyleValue::Number(-0.5)).is_valid);
    }

    #[test]
    fn box_shadow_is_permissive() {
        assert!(validate_box_shadow(&text("0 4px 6px rgba(0,0,0,0.1)")).warning.is_none());
        assert!(validate_box_shadow(&text("inset 0 0 0 1px #ccc")).warning.is_none());
        assert!(validate_box_shadow(&text("none")).warning.is_none());
        let odd = validate_box_shadow(&text("glow"));
        assert!(odd.is_valid);
        assert!(odd.warning.is_some());
    }

    #[test]
    fn text_is_trimmed_or_stringified() {
        assert_eq!(
            validate_text(&text("  'Inter', sans-serif ")),
            ValidationResult::ok("'Inter', sans-serif")
        );
        assert_eq!(validate_text(&StyleValue::Number(3.0)), ValidationResult::ok("3"));
    }

    #[test]
    fn dispatch_by_property_name() {
        assert_eq!(normalize_property("background-color"), "backgroundColor");
        assert_eq!(normalize_property("fontSize"), "fontSize");
        assert_eq!(sanitized(&validate_style("background-color", &text("#FFF"))), "#ffffff");
        assert_eq!(sanitized(&validate_style("marginTop", &StyleValue::Number(8.0))), "8px");

        let unknown = validate_style("gridTemplateAreas", &text("  'a b'  "));
        assert!(unknown.is_valid);
        assert_eq!(unknown.sanitized_value, text("  'a b'  "));
        assert!(validator_for("gridTemplateAreas").is_none());
    }
}
