//! Hospital records and request payloads

use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

pub const MAX_NAME_LEN: usize = 50;
pub const MAX_POSTALCODE_LEN: usize = 5;

/// Hospital / vaccination center record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Hospital {
    pub id: Uuid,
    pub ordinal: Option<String>,
    pub name: String,
    pub address: String,
    pub district: Option<String>,
    pub province: Option<String>,
    pub postalcode: Option<String>,
    pub tel: Option<String>,
    pub region: Option<String>,
    /// Maximum number of appointments; `None` is unlimited
    pub capacity: Option<u32>,
    pub created_at: String,
}

/// Create / update payload. Every field is optional so updates can be partial.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HospitalInput {
    #[serde(default, alias = "ลําดับ", deserialize_with = "string_or_number")]
    pub ordinal: Option<String>,
    pub name: Option<String>,
    pub address: Option<String>,
    pub district: Option<String>,
    pub province: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub postalcode: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub tel: Option<String>,
    pub region: Option<String>,
    /// Absent keeps the stored limit; `null` removes it
    #[serde(default, deserialize_with = "present_or_null")]
    pub capacity: Option<Option<u32>>,
}

impl HospitalInput {
    /// Checks a full record: name and address are required.
    pub fn validate_new(&self) -> ApiResult<()> {
        if blank(&self.name) {
            return Err(ApiError::validation("Please add a name"));
        }
        if blank(&self.address) {
            return Err(ApiError::validation("Please add an address"));
        }
        self.validate_fields()
    }

    /// Checks only the fields present in a partial update.
    pub fn validate_update(&self) -> ApiResult<()> {
        if self.name.is_some() && blank(&self.name) {
            return Err(ApiError::validation("Name can not be empty"));
        }
        if self.address.is_some() && blank(&self.address) {
            return Err(ApiError::validation("Address can not be empty"));
        }
        self.validate_fields()
    }

    fn validate_fields(&self) -> ApiResult<()> {
        if let Some(name) = &self.name {
            if name.trim().chars().count() > MAX_NAME_LEN {
                return Err(ApiError::validation(format!(
                    "Name can not be more than {} characters",
                    MAX_NAME_LEN
                )));
            }
        }
        if let Some(code) = &self.postalcode {
            if code.trim().chars().count() > MAX_POSTALCODE_LEN {
                return Err(ApiError::validation(format!(
                    "Postal Code can not be more than {} digits",
                    MAX_POSTALCODE_LEN
                )));
            }
        }
        Ok(())
    }

    /// Overlay the present fields onto an existing record.
    pub fn apply_to(&self, hospital: &mut Hospital) {
        if let Some(v) = &self.ordinal {
            hospital.ordinal = Some(v.trim().to_string());
        }
        if let Some(v) = &self.name {
            hospital.name = v.trim().to_string();
        }
        if let Some(v) = &self.address {
            hospital.address = v.trim().to_string();
        }
        if let Some(v) = &self.district {
            hospital.district = Some(v.trim().to_string());
        }
        if let Some(v) = &self.province {
            hospital.province = Some(v.trim().to_string());
        }
        if let Some(v) = &self.postalcode {
            hospital.postalcode = Some(v.trim().to_string());
        }
        if let Some(v) = &self.tel {
            hospital.tel = Some(v.trim().to_string());
        }
        if let Some(v) = &self.region {
            hospital.region = Some(v.trim().to_string());
        }
        if let Some(v) = self.capacity {
            hospital.capacity = v;
        }
    }
}

/// Read-only projection served by `/hospitals/vacCenters`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VacCenter {
    pub id: Uuid,
    pub name: String,
    pub tel: Option<String>,
}

impl From<&Hospital> for VacCenter {
    fn from(h: &Hospital) -> Self {
        Self {
            id: h.id,
            name: h.name.clone(),
            tel: h.tel.clone(),
        }
    }
}

fn blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).map_or(true, str::is_empty)
}

// Distinguishes an explicit `null` from a missing field
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// Ordinals and postal codes arrive as either JSON strings or numbers
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}
