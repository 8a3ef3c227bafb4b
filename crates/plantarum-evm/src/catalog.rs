//! Event signature sets for the governance and treasury contracts.

use std::fmt;
use std::str::FromStr;

use crate::decoder::{DecodeError, EventDecoder};

/// Governance contract events.
pub const DAO_EVENTS: &[&str] = &[
    "event ProposalCreated(uint256 indexed id, address indexed author, string title, uint256 deadline)",
    "event VoteCast(address indexed voter, uint256 indexed id, bool support, uint256 weight)",
    "event ProposalExecuted(uint256 indexed id, bool passed)",
];

/// Treasury contract events.
pub const TREASURY_EVENTS: &[&str] = &[
    "event Deposit(address indexed from, address indexed token, uint256 amount)",
    "event Withdraw(address indexed to, address indexed token, uint256 amount)",
    "event TokenSupported(address indexed token, bool status)",
    "event MultiTransfer(address indexed token, uint256 total, uint256 count)",
];

/// Decoder for [`DAO_EVENTS`].
pub fn dao_events() -> Result<EventDecoder, DecodeError> {
    Catalog::Dao.decoder()
}

/// Decoder for [`TREASURY_EVENTS`].
pub fn treasury_events() -> Result<EventDecoder, DecodeError> {
    Catalog::Treasury.decoder()
}

/// A named set of event signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Catalog {
    Dao,
    Treasury,
}

impl Catalog {
    pub fn signatures(self) -> &'static [&'static str] {
        match self {
            Self::Dao => DAO_EVENTS,
            Self::Treasury => TREASURY_EVENTS,
        }
    }

    pub fn decoder(self) -> Result<EventDecoder, DecodeError> {
        EventDecoder::from_signatures(self.signatures())
    }
}

impl fmt::Display for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dao => write!(f, "dao"),
            Self::Treasury => write!(f, "treasury"),
        }
    }
}

impl FromStr for Catalog {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dao" => Ok(Self::Dao),
            "treasury" => Ok(Self::Treasury),
            other => Err(format!("unknown event catalog '{other}' (expected dao or treasury)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogs_parse() {
        let dao = dao_events().unwrap();
        assert_eq!(dao.topic0s().len(), 3);
        let treasury = treasury_events().unwrap();
        let names: Vec<_> = treasury.signatures().map(|s| s.name().to_string()).collect();
        assert_eq!(names, ["Deposit", "Withdraw", "TokenSupported", "MultiTransfer"]);
    }

    #[test]
    fn catalog_from_str() {
        assert_eq!("DAO".parse::<Catalog>().unwrap(), Catalog::Dao);
        assert!("votes".parse::<Catalog>().is_err());
    }
}
