//! Diagram file schema.

use core::fmt;
use std::str::FromStr;

use bf_blocks::Params;
use bf_sim::SimOptions;
use serde::{Deserialize, Serialize};

use crate::validate::ValidationError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiagramFile {
    pub version: u32,
    pub name: String,
    #[serde(default)]
    pub blocks: Vec<BlockDef>,
    #[serde(default)]
    pub wires: Vec<WireDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sim: Option<SimOptions>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlockDef {
    pub id: String,
    /// Display name; defaults to `id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Registry type tag, e.g. `gain` or `lti_siso`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Params::is_empty")]
    pub params: Params,
}

impl BlockDef {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WireDef {
    /// `"block"` or `"block[port]"`
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl WireDef {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            name: None,
        }
    }
}

/// Parsed wire endpoint: a block id and port, `"plant"` meaning port 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSpec {
    pub block: String,
    pub port: usize,
}

impl FromStr for PortSpec {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ValidationError::InvalidValue {
            field: "wire endpoint".to_string(),
            value: s.to_string(),
            reason: reason.to_string(),
        };

        let s_trim = s.trim();
        let (block, port) = match s_trim.split_once('[') {
            None => (s_trim, 0),
            Some((block, rest)) => {
                let digits = rest
                    .strip_suffix(']')
                    .ok_or_else(|| invalid("missing closing ']'"))?;
                let port = digits
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| invalid("port must be a non-negative integer"))?;
                (block.trim_end(), port)
            }
        };
        if block.is_empty() {
            return Err(invalid("block id is empty"));
        }
        Ok(Self {
            block: block.to_string(),
            port,
        })
    }
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.block, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_spec_forms() {
        assert_eq!(
            "plant".parse::<PortSpec>().unwrap(),
            PortSpec {
                block: "plant".into(),
                port: 0
            }
        );
        assert_eq!("sum[1]".parse::<PortSpec>().unwrap().port, 1);
        assert_eq!(" scope [ 2 ] ".parse::<PortSpec>().unwrap().block, "scope");
        assert!("sum[".parse::<PortSpec>().is_err());
        assert!("sum[x]".parse::<PortSpec>().is_err());
        assert!("[0]".parse::<PortSpec>().is_err());
    }

    #[test]
    fn block_type_field_is_renamed() {
        let def: BlockDef =
            serde_yaml::from_str("id: g\ntype: gain\nparams:\n  k: 10\n").unwrap();
        assert_eq!(def.kind, "gain");
        assert_eq!(def.display_name(), "g");
        assert_eq!(def.params.f64("k").unwrap(), 10.0);
    }

    proptest::proptest! {
        #[test]
        fn port_spec_display_parses_back(block in "[a-z][a-z0-9_]{0,8}", port in 0usize..64) {
            let spec = PortSpec { block, port };
            proptest::prop_assert_eq!(spec.to_string().parse::<PortSpec>().unwrap(), spec);
        }
    }
}
