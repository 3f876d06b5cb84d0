use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::utils::geo::{GeoPoint, Geofence};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct OfficeLocation {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Makati Head Office")]
    pub name: String,
    #[schema(example = 14.5547)]
    pub latitude: f64,
    #[schema(example = 121.0244)]
    pub longitude: f64,
    #[schema(example = 150.0)]
    pub radius_meters: f64,
    pub is_active: bool,
}

impl OfficeLocation {
    pub fn geofence(&self) -> Geofence {
        Geofence {
            id: self.id,
            center: GeoPoint {
                latitude: self.latitude,
                longitude: self.longitude,
            },
            radius_meters: self.radius_meters,
        }
    }
}
