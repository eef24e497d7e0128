//! Shipping address captured at checkout.

use serde::{Deserialize, Serialize};

/// A required address field was left blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("shipping address field `{0}` is required")]
pub struct AddressError(pub &'static str);

/// Where an order ships to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

impl ShippingAddress {
    /// Check that every field has non-whitespace content.
    ///
    /// # Errors
    ///
    /// Returns `AddressError` naming the first blank field.
    pub fn validate(&self) -> Result<(), AddressError> {
        let fields = [
            ("address", &self.address),
            ("city", &self.city),
            ("postal_code", &self.postal_code),
            ("country", &self.country),
        ];
        match fields.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((name, _)) => Err(AddressError(*name)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> ShippingAddress {
        ShippingAddress {
            address: "1 Market St".to_owned(),
            city: "Springfield".to_owned(),
            postal_code: "12345".to_owned(),
            country: "US".to_owned(),
        }
    }

    #[test]
    fn test_complete_address_is_valid() {
        assert_eq!(address().validate(), Ok(()));
    }

    #[test]
    fn test_blank_field_is_named() {
        let mut addr = address();
        addr.postal_code = "  ".to_owned();
        assert_eq!(addr.validate(), Err(AddressError("postal_code")));
    }
}
