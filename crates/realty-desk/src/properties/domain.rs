use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::client::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealType {
    Sale,
    Rent,
}

impl DealType {
    pub fn label(&self) -> &'static str {
        match self {
            DealType::Sale => "sale",
            DealType::Rent => "rent",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyStatus {
    #[default]
    Draft,
    Active,
    Reserved,
    Sold,
    Archived,
}

impl PropertyStatus {
    pub fn label(&self) -> &'static str {
        match self {
            PropertyStatus::Draft => "draft",
            PropertyStatus::Active => "active",
            PropertyStatus::Reserved => "reserved",
            PropertyStatus::Sold => "sold",
            PropertyStatus::Archived => "archived",
        }
    }
}

/// Listing as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    pub deal_type: DealType,
    pub status: PropertyStatus,
    #[serde(default)]
    pub district: Option<String>,
    pub rooms: u32,
    #[serde(deserialize_with = "decimal")]
    pub area: f64,
    #[serde(deserialize_with = "decimal")]
    pub price: f64,
    pub realtor: u64,
    #[serde(default)]
    pub realtor_name: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Decimal columns arrive as numeric strings ("1250000.00") or plain numbers.
fn decimal<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Decimal {
        Number(f64),
        Text(String),
    }

    match Decimal::deserialize(deserializer)? {
        Decimal::Number(value) => Ok(value),
        Decimal::Text(raw) => raw
            .trim()
            .parse::<f64>()
            .map_err(|err| serde::de::Error::custom(format!("invalid decimal '{raw}': {err}"))),
    }
}

/// One page of a paginated list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Paginated<T> {
    pub fn has_more(&self) -> bool {
        self.next.is_some()
    }
}

/// Feed filters; unset fields are left out of the query string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyFilters {
    pub deal_type: Option<DealType>,
    pub status: Option<PropertyStatus>,
    pub district: Option<String>,
    pub rooms: Option<u32>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub area_min: Option<f64>,
    pub area_max: Option<f64>,
    pub search: Option<String>,
    pub ordering: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl PropertyFilters {
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        let mut push = |key: &str, value: Option<String>| {
            if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
                pairs.push((key.to_string(), value));
            }
        };

        push("deal_type", self.deal_type.map(|d| d.label().to_string()));
        push("status", self.status.map(|s| s.label().to_string()));
        push("district", self.district.clone());
        push("rooms", self.rooms.map(|r| r.to_string()));
        push("price_min", self.price_min.map(|v| v.to_string()));
        push("price_max", self.price_max.map(|v| v.to_string()));
        push("area_min", self.area_min.map(|v| v.to_string()));
        push("area_max", self.area_max.map(|v| v.to_string()));
        push("search", self.search.clone());
        push("ordering", self.ordering.clone());
        push("page", self.page.map(|p| p.to_string()));
        push("page_size", self.page_size.map(|p| p.to_string()));
        pairs
    }
}

/// Payload for creating a listing, as assembled by the creation wizard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyDraft {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub deal_type: DealType,
    pub status: PropertyStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    pub rooms: u32,
    pub area: f64,
    pub price: f64,
}

impl PropertyDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::Missing { field: "title" });
        }
        if self.rooms == 0 {
            return Err(ValidationError::Invalid {
                field: "rooms",
                reason: "must be at least 1",
            });
        }
        if !(self.area.is_finite() && self.area > 0.0) {
            return Err(ValidationError::Invalid {
                field: "area",
                reason: "must be a positive number",
            });
        }
        if !(self.price.is_finite() && self.price >= 0.0) {
            return Err(ValidationError::Invalid {
                field: "price",
                reason: "must not be negative",
            });
        }
        Ok(())
    }
}

/// Partial update; only set fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PropertyPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deal_type: Option<DealType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PropertyStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rooms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

impl PropertyPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyImage {
    pub id: u64,
    #[serde(alias = "image")]
    pub url: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}
