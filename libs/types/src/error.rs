#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypesError {
    #[error("Invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },
}

impl TypesError {
    pub fn invalid_address(address: impl Into<String>, reason: impl Into<String>) -> Self {
        TypesError::InvalidAddress {
            address: address.into(),
            reason: reason.into(),
        }
    }
}
