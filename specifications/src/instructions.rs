//  INSTRUCTIONS.rs
//    by Lut99
//
//  Created:
//    02 Oct 2026, 12:04:56
//  Last edited:
//    14 Oct 2026, 16:11:02
//  Auto updated?
//    Yes
//
//  Description:
//!   Defines the instructions envelope one node sends to another to
//!   request a state transition (reset or start).
//

use std::convert::Infallible;
use std::fmt::{Display, Formatter, Result as FResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};

use crate::common::{Parameter, Parameters};


/***** TESTS *****/
#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Item;

    #[test]
    fn instructions_json_roundtrip() {
        let mut params: Parameters = Parameters::new();
        params.insert("a".into(), Parameter::Integer(1));
        let item: Item<Instructions> = Item::new("X-0", Instructions::for_component(InstructionsType::ClientServerStartExecution, "X", &params));

        let raw: String = serde_json::to_string(&item).unwrap();
        assert!(raw.contains("\"type\":\"ClientServerStartExecution\""));
        let back: Item<Instructions> = serde_json::from_str(&raw).unwrap();
        assert_eq!(back.definition.kind, InstructionsType::ClientServerStartExecution);
        assert_eq!(back.definition.component_type(), Some("X".to_string()));
        assert_eq!(back.definition.component_parameters(), params);
    }

    #[test]
    fn instructions_type_extensible() {
        assert_eq!(InstructionsType::from_str("clientserverreset").unwrap(), InstructionsType::ClientServerReset);
        assert_eq!(InstructionsType::from_str("Profiling").unwrap(), InstructionsType::Other("Profiling".into()));
        assert_eq!(InstructionsType::Other("Profiling".into()).to_string(), "Profiling");
    }
}





/***** CONSTANTS *****/
/// The property that carries the type name of the component the instructions are about.
pub const TYPE_PROPERTY: &str = "Type";





/***** LIBRARY *****/
/// The kind of instructions that are sent.
#[derive(Clone, Debug, DeserializeFromStr, Eq, Hash, PartialEq, SerializeDisplay)]
pub enum InstructionsType {
    /// Stop whatever is running for this component and delete its state.
    ClientServerReset,
    /// Reset, then start executing the component in the background.
    ClientServerStartExecution,
    /// Any other kind of instructions, kept verbatim.
    Other(String),
}

impl Display for InstructionsType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        use InstructionsType::*;
        match self {
            ClientServerReset          => write!(f, "ClientServerReset"),
            ClientServerStartExecution => write!(f, "ClientServerStartExecution"),
            Other(raw)                 => write!(f, "{}", raw),
        }
    }
}

impl FromStr for InstructionsType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("ClientServerReset") {
            Ok(Self::ClientServerReset)
        } else if s.eq_ignore_ascii_case("ClientServerStartExecution") {
            Ok(Self::ClientServerStartExecution)
        } else {
            Ok(Self::Other(s.into()))
        }
    }
}



/// An outbound command envelope.
///
/// The properties carry the full definition of the component they are about (its type name under [`TYPE_PROPERTY`] plus
/// all its parameters), so the receiving node can reconstruct it without any out-of-band configuration.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Instructions {
    /// What the receiver should do.
    #[serde(rename = "type")]
    pub kind       : InstructionsType,
    /// The component type name and its parameters.
    #[serde(default)]
    pub properties : Parameters,
}

impl Instructions {
    /// Constructor for Instructions that carry the given component.
    ///
    /// # Arguments
    /// - `kind`: The kind of instructions.
    /// - `component`: The type name of the component.
    /// - `parameters`: The parameters of the component.
    ///
    /// # Returns
    /// A new Instructions instance.
    pub fn for_component(kind: InstructionsType, component: impl Into<String>, parameters: &Parameters) -> Self {
        let mut properties: Parameters = parameters.clone();
        properties.insert(TYPE_PROPERTY.into(), Parameter::String(component.into()));
        Self {
            kind,
            properties,
        }
    }



    /// Returns the type name of the component these instructions are about, if any.
    #[inline]
    pub fn component_type(&self) -> Option<String> {
        self.properties.get(TYPE_PROPERTY).map(|value| value.to_string())
    }

    /// Returns the parameters of the component these instructions are about (i.e., all properties except the type).
    pub fn component_parameters(&self) -> Parameters {
        self.properties.iter().filter(|(name, _)| name.as_str() != TYPE_PROPERTY).map(|(name, value)| (name.clone(), value.clone())).collect()
    }
}
