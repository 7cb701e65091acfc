use serde::Serialize;
use std::io::Write;

use super::domain::Property;

#[derive(Debug, Serialize)]
struct PropertyRow<'a> {
    #[serde(rename = "ID")]
    id: u64,
    #[serde(rename = "Title")]
    title: &'a str,
    #[serde(rename = "Deal")]
    deal_type: &'static str,
    #[serde(rename = "Status")]
    status: &'static str,
    #[serde(rename = "District")]
    district: &'a str,
    #[serde(rename = "Address")]
    address: &'a str,
    #[serde(rename = "Rooms")]
    rooms: u32,
    #[serde(rename = "Area")]
    area: f64,
    #[serde(rename = "Price")]
    price: f64,
    #[serde(rename = "Realtor")]
    realtor: String,
    #[serde(rename = "Created At")]
    created_at: String,
}

impl<'a> From<&'a Property> for PropertyRow<'a> {
    fn from(property: &'a Property) -> Self {
        Self {
            id: property.id,
            title: &property.title,
            deal_type: property.deal_type.label(),
            status: property.status.label(),
            district: property.district.as_deref().unwrap_or_default(),
            address: property.address.as_deref().unwrap_or_default(),
            rooms: property.rooms,
            area: property.area,
            price: property.price,
            realtor: property
                .realtor_name
                .clone()
                .unwrap_or_else(|| property.realtor.to_string()),
            created_at: property
                .created_at
                .map(|at| at.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
        }
    }
}

/// Writes listings as CSV with a header row.
pub fn write_csv<W: Write>(writer: W, properties: &[Property]) -> Result<(), csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for property in properties {
        csv_writer.serialize(PropertyRow::from(property))?;
    }
    csv_writer.flush()?;
    Ok(())
}
