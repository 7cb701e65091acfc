//! Property listings: feed filters, CRUD and image listing.

pub mod domain;
pub mod export;

pub use domain::{
    DealType, Paginated, Property, PropertyDraft, PropertyFilters, PropertyImage, PropertyPatch,
    PropertyStatus,
};
pub use export::write_csv;

use crate::client::{ApiClient, ApiError, ApiRequest, ValidationError};

pub const PROPERTIES_PATH: &str = "/properties/";

fn property_path(id: u64) -> String {
    format!("{PROPERTIES_PATH}{id}/")
}

#[derive(Debug, Clone)]
pub struct PropertiesApi {
    client: ApiClient,
}

impl PropertiesApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, filters: &PropertyFilters) -> Result<Paginated<Property>, ApiError> {
        let request = ApiRequest::get(PROPERTIES_PATH).query(filters.to_query());
        self.client.send_json(request).await
    }

    pub async fn get(&self, id: u64) -> Result<Property, ApiError> {
        self.client.send_json(ApiRequest::get(property_path(id))).await
    }

    pub async fn create(&self, draft: &PropertyDraft) -> Result<Property, ApiError> {
        draft.validate()?;
        let request = ApiRequest::post(PROPERTIES_PATH).json(draft)?;
        self.client.send_json(request).await
    }

    pub async fn update(&self, id: u64, patch: &PropertyPatch) -> Result<Property, ApiError> {
        if patch.is_empty() {
            return Err(ValidationError::Missing { field: "patch" }.into());
        }
        let request = ApiRequest::patch(property_path(id)).json(patch)?;
        self.client.send_json(request).await
    }

    pub async fn delete(&self, id: u64) -> Result<(), ApiError> {
        self.client
            .send_empty(ApiRequest::delete(property_path(id)))
            .await
    }

    pub async fn images(&self, id: u64) -> Result<Vec<PropertyImage>, ApiError> {
        let path = format!("{}images/", property_path(id));
        self.client.send_json(ApiRequest::get(path)).await
    }
}
