//! Request and response models of the bus fleet routes.

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::schema::{Envelope, FieldRule, FieldSet, Format, Model};

const MODULE: &str = "buses";

/// Free-form bus attributes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BusMetadata {
    /// Paint color.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Manufacturer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    /// Year of manufacture.
    #[serde(rename = "madeYear", skip_serializing_if = "Option::is_none")]
    pub made_year: Option<u16>,
    /// Whether an onboard camera is fitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera: Option<bool>,
}

impl Model for BusMetadata {
    const MODULE: &'static str = MODULE;

    fn describe(fields: &mut FieldSet) {
        fields
            .field("color", FieldRule::string().optional())
            .field("brand", FieldRule::string().optional())
            .field(
                "madeYear",
                FieldRule::integer().min(1900.0).max(2100.0).optional(),
            )
            .field("camera", FieldRule::boolean().optional());
    }
}

/// A bus as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusData {
    /// Bus id.
    pub id: Uuid,
    /// License plate.
    #[serde(rename = "licensePlate")]
    pub license_plate: String,
    /// Seat count.
    pub capacity: u32,
    /// Free-form attributes.
    pub metadata: BusMetadata,
    /// Registration time.
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Model for BusData {
    const MODULE: &'static str = MODULE;

    fn describe(fields: &mut FieldSet) {
        fields
            .field("id", FieldRule::string().format(Format::Uuid))
            .field("licensePlate", FieldRule::string())
            .field("capacity", FieldRule::integer())
            .field("metadata", FieldRule::object::<BusMetadata>())
            .field("createdAt", FieldRule::string().format(Format::IsoDateTime));
    }

    fn envelope() -> Option<Envelope> {
        Some(Envelope::new(200, "Success"))
    }
}

/// Body of `POST /buses`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBusBody {
    /// License plate.
    #[serde(rename = "licensePlate")]
    pub license_plate: String,
    /// Seat count.
    pub capacity: u32,
    /// Free-form attributes.
    #[serde(default)]
    pub metadata: BusMetadata,
}

impl Model for CreateBusBody {
    const MODULE: &'static str = MODULE;

    fn describe(fields: &mut FieldSet) {
        fields
            .field("licensePlate", FieldRule::string().min_length(1).max_length(16))
            .field("capacity", FieldRule::integer().min(1.0).max(100.0))
            .field("metadata", FieldRule::object::<BusMetadata>().optional());
    }
}

/// Body of `PUT /buses/:id`; absent fields are left unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateBusBody {
    /// New license plate.
    #[serde(rename = "licensePlate")]
    pub license_plate: Option<String>,
    /// New seat count.
    pub capacity: Option<u32>,
    /// Replacement attributes.
    pub metadata: Option<BusMetadata>,
}

impl Model for UpdateBusBody {
    const MODULE: &'static str = MODULE;

    fn describe(fields: &mut FieldSet) {
        fields
            .field(
                "licensePlate",
                FieldRule::string().min_length(1).max_length(16).optional(),
            )
            .field("capacity", FieldRule::integer().min(1.0).max(100.0).optional())
            .field("metadata", FieldRule::object::<BusMetadata>().optional());
    }
}

/// Path parameters of the single-bus routes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusIdParams {
    /// Bus id.
    pub id: Uuid,
}

impl Model for BusIdParams {
    const MODULE: &'static str = MODULE;

    fn describe(fields: &mut FieldSet) {
        fields.field("id", FieldRule::string().format(Format::Uuid));
    }
}

/// Query of `GET /buses`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusListQuery {
    /// Case-insensitive filter on plate, brand and color.
    pub search: Option<String>,
    /// 1-based page number.
    pub page: u32,
    /// Page size.
    pub limit: u32,
}

impl Model for BusListQuery {
    const MODULE: &'static str = MODULE;

    fn describe(fields: &mut FieldSet) {
        fields
            .field(
                "search",
                FieldRule::string()
                    .optional()
                    .describe("Search term to filter results"),
            )
            .field("page", FieldRule::integer().coerce().min(1.0))
            .field("limit", FieldRule::integer().coerce().min(1.0).max(100.0));
    }

    fn prototype() -> Option<Self> {
        Some(Self {
            search: None,
            page: 1,
            limit: 10,
        })
    }
}

/// Pagination block of a list response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageMeta {
    /// Matching buses.
    pub total: usize,
    /// Current page.
    pub page: u32,
    /// Page size.
    pub limit: u32,
    /// Number of pages.
    #[serde(rename = "totalPages")]
    pub total_pages: usize,
}

impl Model for PageMeta {
    const MODULE: &'static str = MODULE;

    fn describe(fields: &mut FieldSet) {
        fields
            .field("total", FieldRule::integer())
            .field("page", FieldRule::integer())
            .field("limit", FieldRule::integer())
            .field("totalPages", FieldRule::integer());
    }
}

/// Response of `GET /buses`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusPage {
    /// Buses of the page, ordered by id.
    pub data: Vec<BusData>,
    /// Pagination block.
    pub meta: PageMeta,
}

impl Model for BusPage {
    const MODULE: &'static str = MODULE;

    fn describe(fields: &mut FieldSet) {
        fields
            .field("data", FieldRule::array_of::<BusData>())
            .field("meta", FieldRule::object::<PageMeta>());
    }

    fn envelope() -> Option<Envelope> {
        Some(Envelope::new(200, "Success"))
    }
}

/// Response of `DELETE /buses/:id`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BusDeleted {}

impl Model for BusDeleted {
    const MODULE: &'static str = MODULE;

    fn describe(_fields: &mut FieldSet) {}

    fn envelope() -> Option<Envelope> {
        Some(Envelope::new(200, "Success"))
    }
}

/// No bus has the requested id.
#[derive(Debug, thiserror::Error)]
#[error("Bus not found")]
pub struct BusNotFound;

impl ApiError for BusNotFound {
    const STATUS: StatusCode = StatusCode::NOT_FOUND;
    const STATUS_MESSAGE: &'static str = "Not Found";
}
