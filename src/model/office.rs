use serde::Serialize;
use utoipa::ToSchema;

use super::attendance::GeoPoint;

/// Registered office used for geofence validation. Administered outside this
/// service; the engine only ever reads it, freshly per request, through the
/// repository.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct OfficeLocation {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Head Office")]
    pub name: String,
    #[schema(example = -6.2)]
    pub latitude: f64,
    #[schema(example = 106.8)]
    pub longitude: f64,
    /// Geofence radius, strictly positive.
    #[schema(example = 50.0)]
    pub radius_meters: f64,
}

impl OfficeLocation {
    pub fn location(&self) -> GeoPoint {
        GeoPoint {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}
