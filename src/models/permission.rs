use serde::{Deserialize, Serialize};

/// Access level granted to a transaction or screen component.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(try_from = "u8", into = "u8")]
pub enum AccessLevel {
    None = 0,
    Read = 1,
    Write = 2,
}

impl TryFrom<u8> for AccessLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AccessLevel::None),
            1 => Ok(AccessLevel::Read),
            2 => Ok(AccessLevel::Write),
            other => Err(format!("invalid access level {other}, expected 0, 1 or 2")),
        }
    }
}

impl From<AccessLevel> for u8 {
    fn from(level: AccessLevel) -> Self {
        level as u8
    }
}

/// Per-component override carried by a user's credential.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComponentGrant {
    #[serde(rename = "idComponente")]
    pub component: String,

    #[serde(rename = "nivelAcesso")]
    pub level: AccessLevel,
}

/// A user's access to one backend transaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionGrant {
    #[serde(rename = "transacao")]
    pub transaction: String,

    #[serde(rename = "nivelAcesso")]
    pub level: AccessLevel,

    #[serde(rename = "componentes", default)]
    pub components: Vec<ComponentGrant>,

    /// Indices of the rule exceptions active for this user.
    #[serde(rename = "regras", default)]
    pub rules: Vec<u32>,
}
