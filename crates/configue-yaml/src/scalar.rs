//! Scalar nodes and YAML core-schema resolution.

use yaml_rust2::Yaml;
use yaml_rust2::scanner::TScalarStyle;

/// Presentation style of a scalar in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarStyle {
    /// Unquoted scalar, subject to type resolution.
    Plain,
    /// `'single quoted'`
    SingleQuoted,
    /// `"double quoted"`
    DoubleQuoted,
    /// `|` block scalar
    Literal,
    /// `>` block scalar
    Folded,
}

impl ScalarStyle {
    /// Only plain scalars go through type resolution; every other style is
    /// always a string.
    pub fn is_plain(self) -> bool {
        self == ScalarStyle::Plain
    }
}

impl From<TScalarStyle> for ScalarStyle {
    fn from(style: TScalarStyle) -> Self {
        match style {
            TScalarStyle::SingleQuoted => ScalarStyle::SingleQuoted,
            TScalarStyle::DoubleQuoted => ScalarStyle::DoubleQuoted,
            TScalarStyle::Literal => ScalarStyle::Literal,
            TScalarStyle::Folded => ScalarStyle::Folded,
            _ => ScalarStyle::Plain,
        }
    }
}

/// A scalar as written in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Scalar {
    /// The scalar text after YAML unescaping, before type resolution.
    pub text: String,

    /// How the scalar was written.
    pub style: ScalarStyle,
}

impl Scalar {
    pub fn new(text: impl Into<String>, style: ScalarStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, ScalarStyle::Plain)
    }

    /// Resolve the scalar to a typed YAML value.
    ///
    /// Plain scalars are resolved with [`resolve_plain_scalar`]; quoted and
    /// block scalars are always strings.
    pub fn resolve(&self) -> Yaml {
        if self.style.is_plain() {
            resolve_plain_scalar(&self.text)
        } else {
            Yaml::String(self.text.clone())
        }
    }
}

/// Parse a plain scalar string value into the appropriate Yaml type.
///
/// This handles type inference: integers, floats, booleans, null, and strings.
pub fn resolve_plain_scalar(value: &str) -> Yaml {
    // Check for null and boolean first: "null"/"true" never parse as numbers,
    // but checking them first keeps the empty string from reaching the
    // numeric parsers.
    match value {
        "null" | "Null" | "NULL" | "~" | "" => return Yaml::Null,
        "true" | "True" | "TRUE" | "yes" | "Yes" | "YES" | "on" | "On" | "ON" => {
            return Yaml::Boolean(true);
        }
        "false" | "False" | "FALSE" | "no" | "No" | "NO" | "off" | "Off" | "OFF" => {
            return Yaml::Boolean(false);
        }
        ".inf" | ".Inf" | ".INF" | "+.inf" | "+.Inf" | "+.INF" => {
            return Yaml::Real("inf".into());
        }
        "-.inf" | "-.Inf" | "-.INF" => return Yaml::Real("-inf".into()),
        ".nan" | ".NaN" | ".NAN" => return Yaml::Real("NaN".into()),
        _ => {}
    }

    if let Ok(i) = value.parse::<i64>() {
        return Yaml::Integer(i);
    }

    if let Some(hex) = value.strip_prefix("0x") {
        if let Ok(i) = i64::from_str_radix(hex, 16) {
            return Yaml::Integer(i);
        }
    }

    if let Some(octal) = value.strip_prefix("0o") {
        if let Ok(i) = i64::from_str_radix(octal, 8) {
            return Yaml::Integer(i);
        }
    }

    // Rust also accepts "inf" and "NaN" here, which YAML spells differently.
    if value.bytes().any(|b| b.is_ascii_digit()) && value.parse::<f64>().is_ok() {
        return Yaml::Real(value.to_string());
    }

    Yaml::String(value.to_string())
}
