//  COMMON.rs
//    by Lut99
//
//  Created:
//    02 Oct 2026, 10:12:41
//  Last edited:
//    14 Oct 2026, 16:03:19
//  Auto updated?
//    Yes
//
//  Description:
//!   Defines the primitive parameter values that components, instructions
//!   and states carry around.
//

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter, Result as FResult};
use std::time::Duration;

use serde::{Deserialize, Serialize};


/***** TESTS *****/
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_untagged_json() {
        let params: Parameters = serde_json::from_str(r#"{ "a": 1, "b": 1.5, "c": "text", "d": true }"#).unwrap();
        assert_eq!(params.get("a"), Some(&Parameter::Integer(1)));
        assert_eq!(params.get("b"), Some(&Parameter::Float(1.5)));
        assert_eq!(params.get("c"), Some(&Parameter::String("text".into())));
        assert_eq!(params.get("d"), Some(&Parameter::Boolean(true)));
    }

    #[test]
    fn parameter_access_conversions() {
        let mut params: Parameters = Parameters::new();
        params.insert("Port".into(), Parameter::String("6100".into()));
        params.insert("Timeout".into(), Parameter::Integer(30));
        params.insert("Enabled".into(), Parameter::String("True".into()));

        assert_eq!(params.get_int("Port").unwrap(), 6100);
        assert_eq!(params.get_secs("Timeout").unwrap(), Duration::from_secs(30));
        assert!(params.get_bool("Enabled").unwrap());
        assert!(matches!(params.get_string("Missing"), Err(ParameterError::Missing{ .. })));
        assert!(matches!(params.get_int("Enabled"), Err(ParameterError::Type{ .. })));
        assert_eq!(params.get_string_or("Missing", "default"), "default");
    }
}





/***** ERRORS *****/
/// Defines errors that occur when reading typed values out of a set of [`Parameters`].
#[derive(Debug)]
pub enum ParameterError {
    /// The parameter was not given at all.
    Missing{ name: String },
    /// The parameter was given but could not be interpreted as the desired type.
    Type{ name: String, expected: &'static str, got: Parameter },
}
impl Display for ParameterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        use ParameterError::*;
        match self {
            Missing{ name }             => write!(f, "Required parameter '{}' is not defined", name),
            Type{ name, expected, got } => write!(f, "Parameter '{}' has value '{}', which is not a valid {}", name, got, expected),
        }
    }
}
impl Error for ParameterError {}





/***** LIBRARY *****/
/// A single primitive value in a component, instruction or state property set.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Parameter {
    /// A boolean value.
    Boolean(bool),
    /// A (signed) integral value.
    Integer(i64),
    /// A floating-point value.
    Float(f64),
    /// A string value.
    String(String),
}

impl Parameter {
    /// Returns the name of the variant, for use in error messages.
    #[inline]
    pub fn kind(&self) -> &'static str {
        use Parameter::*;
        match self {
            Boolean(_) => "boolean",
            Integer(_) => "integer",
            Float(_)   => "float",
            String(_)  => "string",
        }
    }
}

impl Display for Parameter {
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        use Parameter::*;
        match self {
            Boolean(value) => write!(f, "{}", value),
            Integer(value) => write!(f, "{}", value),
            Float(value)   => write!(f, "{}", value),
            String(value)  => write!(f, "{}", value),
        }
    }
}

impl From<bool> for Parameter {
    #[inline]
    fn from(value: bool) -> Self { Self::Boolean(value) }
}
impl From<i64> for Parameter {
    #[inline]
    fn from(value: i64) -> Self { Self::Integer(value) }
}
impl From<i32> for Parameter {
    #[inline]
    fn from(value: i32) -> Self { Self::Integer(value.into()) }
}
impl From<u16> for Parameter {
    #[inline]
    fn from(value: u16) -> Self { Self::Integer(value.into()) }
}
impl From<f64> for Parameter {
    #[inline]
    fn from(value: f64) -> Self { Self::Float(value) }
}
impl From<String> for Parameter {
    #[inline]
    fn from(value: String) -> Self { Self::String(value) }
}
impl From<&str> for Parameter {
    #[inline]
    fn from(value: &str) -> Self { Self::String(value.into()) }
}



/// An ordered map of parameter names to their values. Ordered so serialized payloads are deterministic.
pub type Parameters = BTreeMap<String, Parameter>;



/// Provides typed accessors on top of a set of [`Parameters`].
///
/// Values given as strings are parsed leniently, since profiles tend to quote everything.
pub trait ParameterAccess {
    /// Returns the raw parameter with the given name, if any.
    fn raw(&self, name: &str) -> Option<&Parameter>;



    /// Returns the given parameter as a string (any primitive is stringified).
    ///
    /// # Errors
    /// This function errors if the parameter is not given.
    fn get_string(&self, name: &str) -> Result<String, ParameterError> {
        match self.raw(name) {
            Some(value) => Ok(value.to_string()),
            None        => Err(ParameterError::Missing{ name: name.into() }),
        }
    }

    /// Returns the given parameter as a string, or the given default if it isn't given.
    #[inline]
    fn get_string_or(&self, name: &str, default: &str) -> String {
        self.raw(name).map(|value| value.to_string()).unwrap_or_else(|| default.into())
    }

    /// Returns the given parameter as an integer.
    ///
    /// # Errors
    /// This function errors if the parameter is not given or is not an integer (or a string thereof).
    fn get_int(&self, name: &str) -> Result<i64, ParameterError> {
        match self.raw(name) {
            Some(Parameter::Integer(value)) => Ok(*value),
            Some(Parameter::String(value))  => value.trim().parse::<i64>().map_err(|_| ParameterError::Type{ name: name.into(), expected: "integer", got: Parameter::String(value.clone()) }),
            Some(value)                     => Err(ParameterError::Type{ name: name.into(), expected: "integer", got: value.clone() }),
            None                            => Err(ParameterError::Missing{ name: name.into() }),
        }
    }

    /// Returns the given parameter as a float. Integers are accepted, too.
    ///
    /// # Errors
    /// This function errors if the parameter is not given or is not numeric.
    fn get_float(&self, name: &str) -> Result<f64, ParameterError> {
        match self.raw(name) {
            Some(Parameter::Float(value))   => Ok(*value),
            Some(Parameter::Integer(value)) => Ok(*value as f64),
            Some(Parameter::String(value))  => value.trim().parse::<f64>().map_err(|_| ParameterError::Type{ name: name.into(), expected: "float", got: Parameter::String(value.clone()) }),
            Some(value)                     => Err(ParameterError::Type{ name: name.into(), expected: "float", got: value.clone() }),
            None                            => Err(ParameterError::Missing{ name: name.into() }),
        }
    }

    /// Returns the given parameter as a boolean.
    ///
    /// # Errors
    /// This function errors if the parameter is not given or is not a boolean (or a case-insensitive `"true"`/`"false"`).
    fn get_bool(&self, name: &str) -> Result<bool, ParameterError> {
        match self.raw(name) {
            Some(Parameter::Boolean(value)) => Ok(*value),
            Some(Parameter::String(value)) if value.eq_ignore_ascii_case("true")  => Ok(true),
            Some(Parameter::String(value)) if value.eq_ignore_ascii_case("false") => Ok(false),
            Some(value)                     => Err(ParameterError::Type{ name: name.into(), expected: "boolean", got: value.clone() }),
            None                            => Err(ParameterError::Missing{ name: name.into() }),
        }
    }

    /// Returns the given parameter as a number of seconds.
    ///
    /// # Errors
    /// This function errors if the parameter is not given or is not a non-negative integer.
    fn get_secs(&self, name: &str) -> Result<Duration, ParameterError> {
        let secs: i64 = self.get_int(name)?;
        if secs < 0 { return Err(ParameterError::Type{ name: name.into(), expected: "non-negative number of seconds", got: Parameter::Integer(secs) }); }
        Ok(Duration::from_secs(secs as u64))
    }
}

impl ParameterAccess for Parameters {
    #[inline]
    fn raw(&self, name: &str) -> Option<&Parameter> { self.get(name) }
}
