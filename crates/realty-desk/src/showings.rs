//! Viewing appointments scheduled against listings.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::client::{ApiClient, ApiError, ApiRequest, ValidationError};
use crate::properties::Paginated;

pub const SHOWINGS_PATH: &str = "/showings/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShowingStatus {
    Planned,
    Done,
    Canceled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShowingRange {
    #[default]
    Today,
    Upcoming,
    All,
}

impl ShowingRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShowingRange::Today => "today",
            ShowingRange::Upcoming => "upcoming",
            ShowingRange::All => "all",
        }
    }
}

impl std::str::FromStr for ShowingRange {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "today" => Ok(Self::Today),
            "upcoming" => Ok(Self::Upcoming),
            "all" => Ok(Self::All),
            other => Err(format!("unknown range '{other}' (today, upcoming, all)")),
        }
    }
}

/// Ids come back as numbers from the API and as strings from older exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ShowingId {
    Number(u64),
    Text(String),
}

impl std::fmt::Display for ShowingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShowingId::Number(id) => write!(f, "{id}"),
            ShowingId::Text(id) => f.write_str(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Showing {
    pub id: ShowingId,
    #[serde(alias = "starts_at")]
    pub datetime: DateTime<Utc>,
    #[serde(default, alias = "property", deserialize_with = "optional_id")]
    pub property_id: Option<u64>,
    #[serde(default)]
    pub property_title: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub client_phone: Option<String>,
    #[serde(default)]
    pub status: Option<ShowingStatus>,
}

fn optional_id<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(u64),
        Text(String),
    }

    match Option::<RawId>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawId::Number(id)) => Ok(Some(id)),
        Some(RawId::Text(raw)) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid property id '{raw}'"))),
    }
}

/// Request body for scheduling a viewing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewShowing {
    pub property_id: u64,
    #[serde(serialize_with = "iso_utc")]
    pub datetime: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

fn iso_utc<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Secs, true))
}

impl NewShowing {
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), ValidationError> {
        if self.property_id == 0 {
            return Err(ValidationError::Missing {
                field: "property_id",
            });
        }
        if self.datetime <= now {
            return Err(ValidationError::Invalid {
                field: "datetime",
                reason: "must be in the future",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ShowingsApi {
    client: ApiClient,
}

impl ShowingsApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, page: u32, range: ShowingRange) -> Result<Paginated<Showing>, ApiError> {
        let request = ApiRequest::get(SHOWINGS_PATH).query(vec![
            ("page".to_string(), page.max(1).to_string()),
            ("range".to_string(), range.as_str().to_string()),
        ]);
        self.client.send_json(request).await
    }

    pub async fn create(&self, showing: &NewShowing) -> Result<Showing, ApiError> {
        showing.validate(Utc::now())?;
        let request = ApiRequest::post(SHOWINGS_PATH).json(showing)?;
        self.client.send_json(request).await
    }
}
