use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// The JSON body accepted by `POST /customers` and `PUT /customers/:id`.
///
/// Every field is optional on the wire so that a missing or `null` field is
/// reported as a validation failure rather than a deserialization error.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct CustomerPayload {
    #[validate(required, length(min = 1))]
    pub name: Option<String>,
    #[validate(required, length(min = 1))]
    pub identification_number: Option<String>,
    #[validate(required, length(min = 1))]
    pub address: Option<String>,
    #[validate(required, length(min = 1))]
    pub phone: Option<String>,
    #[validate(required, length(min = 1))]
    pub email: Option<String>,
}

/// A customer record that has passed validation and is ready to be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    pub identification_number: String,
    pub address: String,
    pub phone: String,
    pub email: String,
}

impl CustomerPayload {
    /// Checks that all five fields are present and non-empty and converts the
    /// payload into a `NewCustomer`.
    pub fn validate_into(self) -> Result<NewCustomer, CoreError> {
        if let Err(errors) = self.validate() {
            let mut missing: Vec<String> = errors
                .field_errors()
                .keys()
                .map(|field| field.to_string())
                .collect();
            missing.sort();
            return Err(CoreError::MissingFields(missing));
        }

        Ok(NewCustomer {
            name: required("name", self.name)?,
            identification_number: required("identification_number", self.identification_number)?,
            address: required("address", self.address)?,
            phone: required("phone", self.phone)?,
            email: required("email", self.email)?,
        })
    }
}

fn required(field: &str, value: Option<String>) -> Result<String, CoreError> {
    value.ok_or_else(|| CoreError::MissingFields(vec![field.to_string()]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> CustomerPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn complete_payload_validates() {
        let payload = parse(json!({
            "name": "Ana",
            "identification_number": "123",
            "address": "X",
            "phone": "555",
            "email": "a@x.com"
        }));
        let customer = payload.validate_into().unwrap();
        assert_eq!(customer.name, "Ana");
        assert_eq!(customer.identification_number, "123");
        assert_eq!(customer.email, "a@x.com");
    }

    #[test]
    fn missing_and_null_fields_are_reported() {
        let payload = parse(json!({
            "name": "Ana",
            "identification_number": null,
            "address": "X",
            "phone": "555"
        }));
        let err = payload.validate_into().unwrap_err();
        assert_eq!(
            err,
            CoreError::MissingFields(vec!["email".to_string(), "identification_number".to_string()])
        );
    }

    #[test]
    fn empty_strings_count_as_missing() {
        let payload = parse(json!({
            "name": "",
            "identification_number": "123",
            "address": "X",
            "phone": "555",
            "email": "a@x.com"
        }));
        assert_eq!(
            payload.validate_into().unwrap_err(),
            CoreError::MissingFields(vec!["name".to_string()])
        );
    }

    #[test]
    fn error_message_lists_missing_fields() {
        let err = CustomerPayload::default().validate_into().unwrap_err();
        assert_eq!(
            err.to_string(),
            "All fields are required (missing: address, email, identification_number, name, phone)"
        );
    }
}
