//! Per-account views: KYC status and reputation, read via `eth_call`.

use alloy_core::dyn_abi::DynSolValue;
use alloy_primitives::Address;
use serde_json::Value;

use plantarum_core::ChainError;

use crate::probe::Accessor;
use crate::reader::ChainReader;

/// One `name(address)` view on one contract.
pub struct AccountView<R> {
    reader: R,
    contract: String,
    accessor: Accessor,
}

impl<R: ChainReader> AccountView<R> {
    pub fn new(reader: R, contract: impl Into<String>, accessor: Accessor) -> Self {
        Self {
            reader,
            contract: contract.into(),
            accessor,
        }
    }

    /// `getKYCStatus(address) returns (string)` on the KYC contract.
    pub fn kyc_status(reader: R, contract: impl Into<String>) -> Result<Self, ChainError> {
        let accessor = Accessor::single("getKYCStatus", "string")?.taking("address")?;
        Ok(Self::new(reader, contract, accessor))
    }

    /// `getReputation(address) returns (uint256)` on the reputation contract.
    pub fn reputation(reader: R, contract: impl Into<String>) -> Result<Self, ChainError> {
        let accessor = Accessor::single("getReputation", "uint256")?.taking("address")?;
        Ok(Self::new(reader, contract, accessor))
    }

    pub fn contract(&self) -> &str {
        &self.contract
    }

    /// Read the view for `account`. Integers come back as decimal strings;
    /// reverts and undecodable returns are errors.
    pub async fn read(&self, account: &str) -> Result<Value, ChainError> {
        let account = parse_account(account)?;
        let calldata = self.accessor.encode_call(DynSolValue::Address(account));
        let ret = self.reader.call(&self.contract, &calldata).await?;
        let fields = self
            .accessor
            .decode(&ret)
            .map_err(|e| ChainError::InvalidResponse(format!("{}: {e}", self.accessor.name())))?;
        tracing::debug!(contract = %self.contract, view = self.accessor.name(), "account view read");
        fields.into_values().next().ok_or_else(|| {
            ChainError::InvalidResponse(format!("{}: empty return", self.accessor.name()))
        })
    }
}

/// Parse a 20-byte hex account address (checksum not enforced).
pub fn parse_account(s: &str) -> Result<Address, ChainError> {
    s.trim()
        .parse::<Address>()
        .map_err(|_| ChainError::InvalidAddress(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_case_addresses() {
        let a = parse_account("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266").unwrap();
        let b = parse_account("0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_short_or_non_hex() {
        for bad in ["0x1234", "alice", ""] {
            assert!(matches!(parse_account(bad), Err(ChainError::InvalidAddress(_))));
        }
    }
}
