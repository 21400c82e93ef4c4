//! Enum types for variable metadata

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// VARIABLE TYPE
// ============================================================================

/// Storage/display type of a variable.
///
/// Every type except [`VariableType::String`] holds numeric cells.
/// [`VariableType::Date`] cells are kept as text verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VariableType {
    #[default]
    Numeric,
    Comma,
    Dot,
    Scientific,
    Date,
    Dollar,
    CustomCurrency,
    String,
    RestrictedNumeric,
}

impl VariableType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariableType::Numeric => "NUMERIC",
            VariableType::Comma => "COMMA",
            VariableType::Dot => "DOT",
            VariableType::Scientific => "SCIENTIFIC",
            VariableType::Date => "DATE",
            VariableType::Dollar => "DOLLAR",
            VariableType::CustomCurrency => "CUSTOM_CURRENCY",
            VariableType::String => "STRING",
            VariableType::RestrictedNumeric => "RESTRICTED_NUMERIC",
        }
    }

    /// Whether cells of this type are stored as text.
    pub fn is_string(&self) -> bool {
        matches!(self, VariableType::String)
    }

    /// Whether cells of this type are coerced to numbers.
    pub fn is_numeric(&self) -> bool {
        !matches!(self, VariableType::String | VariableType::Date)
    }
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for VariableType {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace([' ', '-'], "_").as_str() {
            "NUMERIC" => Ok(VariableType::Numeric),
            "COMMA" => Ok(VariableType::Comma),
            "DOT" => Ok(VariableType::Dot),
            "SCIENTIFIC" => Ok(VariableType::Scientific),
            "DATE" => Ok(VariableType::Date),
            "DOLLAR" => Ok(VariableType::Dollar),
            "CUSTOM_CURRENCY" => Ok(VariableType::CustomCurrency),
            "STRING" => Ok(VariableType::String),
            "RESTRICTED_NUMERIC" => Ok(VariableType::RestrictedNumeric),
            _ => Err(EnumParseError::new("variable type", s)),
        }
    }
}

// ============================================================================
// MEASURE / ROLE / ALIGN
// ============================================================================

/// Level of measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Measure {
    Nominal,
    Ordinal,
    Scale,
    #[default]
    Unknown,
}

impl Measure {
    pub fn as_str(&self) -> &'static str {
        match self {
            Measure::Nominal => "nominal",
            Measure::Ordinal => "ordinal",
            Measure::Scale => "scale",
            Measure::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Measure {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "nominal" => Ok(Measure::Nominal),
            "ordinal" => Ok(Measure::Ordinal),
            "scale" => Ok(Measure::Scale),
            "unknown" => Ok(Measure::Unknown),
            _ => Err(EnumParseError::new("measure", s)),
        }
    }
}

/// Analysis role of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Input,
    Target,
    Both,
    None,
    Partition,
    Split,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Input => "input",
            Role::Target => "target",
            Role::Both => "both",
            Role::None => "none",
            Role::Partition => "partition",
            Role::Split => "split",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "input" => Ok(Role::Input),
            "target" => Ok(Role::Target),
            "both" => Ok(Role::Both),
            "none" => Ok(Role::None),
            "partition" => Ok(Role::Partition),
            "split" => Ok(Role::Split),
            _ => Err(EnumParseError::new("role", s)),
        }
    }
}

/// Cell alignment in the data view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Left,
    #[default]
    Right,
    Center,
}

impl Align {
    pub fn as_str(&self) -> &'static str {
        match self {
            Align::Left => "left",
            Align::Right => "right",
            Align::Center => "center",
        }
    }
}

impl fmt::Display for Align {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Align {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "left" => Ok(Align::Left),
            "right" => Ok(Align::Right),
            "center" | "centre" => Ok(Align::Center),
            _ => Err(EnumParseError::new("align", s)),
        }
    }
}

// ============================================================================
// PARSE ERROR
// ============================================================================

/// Error when parsing an enum from grid text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumParseError {
    pub kind: &'static str,
    pub value: String,
}

impl EnumParseError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

impl fmt::Display for EnumParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid {}: {}", self.kind, self.value)
    }
}

impl std::error::Error for EnumParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_type_parse_is_case_insensitive() {
        assert_eq!("string".parse::<VariableType>(), Ok(VariableType::String));
        assert_eq!(
            "custom currency".parse::<VariableType>(),
            Ok(VariableType::CustomCurrency)
        );
        assert!("text".parse::<VariableType>().is_err());
    }

    #[test]
    fn test_variable_type_serde_uses_upper_snake_case() {
        let json = serde_json::to_string(&VariableType::RestrictedNumeric).unwrap();
        assert_eq!(json, "\"RESTRICTED_NUMERIC\"");
        let back: VariableType = serde_json::from_str("\"STRING\"").unwrap();
        assert_eq!(back, VariableType::String);
    }

    #[test]
    fn test_date_is_neither_string_nor_numeric() {
        assert!(!VariableType::Date.is_string());
        assert!(!VariableType::Date.is_numeric());
        assert!(VariableType::Dollar.is_numeric());
    }

    #[test]
    fn test_measure_role_align_roundtrip_display() {
        for m in [Measure::Nominal, Measure::Ordinal, Measure::Scale, Measure::Unknown] {
            assert_eq!(m.to_string().parse::<Measure>(), Ok(m));
        }
        assert_eq!("SPLIT".parse::<Role>(), Ok(Role::Split));
        assert_eq!("Centre".parse::<Align>(), Ok(Align::Center));
    }

    #[test]
    fn test_parse_error_display() {
        let err = "loud".parse::<Measure>().unwrap_err();
        assert_eq!(err.to_string(), "Invalid measure: loud");
    }

    #[test]
    fn test_defaults() {
        assert_eq!(VariableType::default(), VariableType::Numeric);
        assert_eq!(Measure::default(), Measure::Unknown);
        assert_eq!(Role::default(), Role::Input);
        assert_eq!(Align::default(), Align::Right);
    }
}
