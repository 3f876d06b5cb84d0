use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::ToSchema;

use crate::{
    auth::auth::AuthUser, error::AppError, model::office_location::OfficeLocation,
    utils::geo::GeoPoint,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOfficeLocation {
    #[schema(example = "Makati Head Office")]
    pub name: String,
    #[schema(example = 14.5547)]
    pub latitude: f64,
    #[schema(example = 121.0244)]
    pub longitude: f64,
    #[schema(example = 150.0)]
    pub radius_meters: f64,
}

impl CreateOfficeLocation {
    fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::validation("Office name is required"));
        }
        let center = GeoPoint {
            latitude: self.latitude,
            longitude: self.longitude,
        };
        if !center.is_valid() {
            return Err(AppError::validation("Coordinates are out of range"));
        }
        if !self.radius_meters.is_finite() || self.radius_meters <= 0.0 {
            return Err(AppError::validation("radius_meters must be positive"));
        }
        Ok(())
    }
}

/// List office locations
#[utoipa::path(
    get,
    path = "/api/office-locations",
    responses(
        (status = 200, description = "All office locations", body = [OfficeLocation]),
        (status = 403, description = "Staff only")
    ),
    tag = "Office Locations",
    security(("bearer_auth" = []))
)]
pub async fn list_office_locations(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    auth.require_staff()?;

    let offices = sqlx::query_as::<_, OfficeLocation>(
        "SELECT id, name, latitude, longitude, radius_meters, is_active \
         FROM office_locations ORDER BY name",
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to fetch office locations");
        AppError::Db(e)
    })?;

    Ok(HttpResponse::Ok().json(offices))
}

/// Add an office geofence (HR/Admin)
#[utoipa::path(
    post,
    path = "/api/office-locations",
    request_body = CreateOfficeLocation,
    responses(
        (status = 201, description = "Office added", body = Object, example = json!({
            "message": "Office location added",
            "id": 2
        })),
        (status = 400, description = "Invalid coordinates or radius")
    ),
    tag = "Office Locations",
    security(("bearer_auth" = []))
)]
pub async fn create_office_location(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateOfficeLocation>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    payload.validate()?;

    let result = sqlx::query(
        "INSERT INTO office_locations (name, latitude, longitude, radius_meters) VALUES (?, ?, ?, ?)",
    )
    .bind(payload.name.trim())
    .bind(payload.latitude)
    .bind(payload.longitude)
    .bind(payload.radius_meters)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to add office location");
        AppError::Db(e)
    })?;

    info!(office_id = result.last_insert_id(), name = %payload.name, "Office location added");

    Ok(HttpResponse::Created().json(json!({
        "message": "Office location added",
        "id": result.last_insert_id()
    })))
}

/// Stop accepting clock-ins at an office (HR/Admin)
#[utoipa::path(
    patch,
    path = "/api/office-locations/{office_id}/deactivate",
    params(("office_id", Path, description = "Office location ID")),
    responses(
        (status = 200, description = "Office deactivated", body = Object, example = json!({
            "message": "Office location deactivated"
        })),
        (status = 404, description = "Office location not found")
    ),
    tag = "Office Locations",
    security(("bearer_auth" = []))
)]
pub async fn deactivate_office_location(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let office_id = path.into_inner();

    let exists = sqlx::query_scalar::<_, bool>("SELECT is_active FROM office_locations WHERE id = ?")
        .bind(office_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(AppError::Db)?;

    match exists {
        None => return Err(AppError::NotFound("Office location").into()),
        Some(false) => {
            return Ok(HttpResponse::Ok().json(json!({ "message": "Office location deactivated" })));
        }
        Some(true) => {}
    }

    sqlx::query("UPDATE office_locations SET is_active = FALSE WHERE id = ?")
        .bind(office_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, office_id, "Failed to deactivate office location");
            AppError::Db(e)
        })?;

    info!(office_id, "Office location deactivated");
    Ok(HttpResponse::Ok().json(json!({ "message": "Office location deactivated" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_geofences() {
        let mut office = CreateOfficeLocation {
            name: "Cebu".to_string(),
            latitude: 10.3157,
            longitude: 123.8854,
            radius_meters: 100.0,
        };
        assert!(office.validate().is_ok());

        office.radius_meters = 0.0;
        assert!(office.validate().is_err());

        office.radius_meters = 100.0;
        office.longitude = 200.0;
        assert!(office.validate().is_err());
    }
}
