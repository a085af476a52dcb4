use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

/// Fields are optional so that a missing phone is reported as
/// MISSING_FIELDS rather than a generic deserialization failure.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SendOtpRequest {
    #[serde(default, deserialize_with = "phone_number")]
    #[schema(example = "9998887777")]
    pub phone: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VerifyOtpRequest {
    #[serde(default, deserialize_with = "phone_number")]
    #[schema(example = "9998887777")]
    pub phone: Option<String>,
    #[schema(example = "4821")]
    pub code: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PhoneValue {
    Text(String),
    Number(serde_json::Number),
}

/// Clients send the phone either as a string or as a bare JSON number.
fn phone_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<PhoneValue>::deserialize(deserializer)?.map(|value| match value {
            PhoneValue::Text(phone) => phone,
            PhoneValue::Number(phone) => phone.to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_phone_accepts_string_or_number() {
        let request: SendOtpRequest =
            serde_json::from_value(json!({ "phone": "9998887777" })).unwrap();
        assert_eq!(request.phone.as_deref(), Some("9998887777"));

        let request: SendOtpRequest =
            serde_json::from_value(json!({ "phone": 9998887777u64 })).unwrap();
        assert_eq!(request.phone.as_deref(), Some("9998887777"));

        let request: VerifyOtpRequest =
            serde_json::from_value(json!({ "phone": 9998887777u64, "code": "4821" })).unwrap();
        assert_eq!(request.phone.as_deref(), Some("9998887777"));
    }

    #[test]
    fn test_phone_missing_or_null() {
        let request: SendOtpRequest = serde_json::from_value(json!({})).unwrap();
        assert!(request.phone.is_none());

        let request: SendOtpRequest = serde_json::from_value(json!({ "phone": null })).unwrap();
        assert!(request.phone.is_none());
    }

    #[test]
    fn test_phone_rejects_other_types() {
        let result = serde_json::from_value::<SendOtpRequest>(json!({ "phone": true }));
        assert!(result.is_err());
    }
}
