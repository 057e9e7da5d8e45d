//! Bus fleet routes backed by an in-memory store.
//!
//! Reads are public; writes require the admin bearer token.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{
    BusData, BusDeleted, BusIdParams, BusListQuery, BusNotFound, BusPage, CreateBusBody, PageMeta,
    UpdateBusBody,
};
use crate::dispatch::{BearerAuth, Payload, RequestView};
use crate::error::HandlerError;
use crate::route::{Controller, Route};

/// Bus CRUD. The store lives as long as the compiled tree.
#[derive(Debug, Default)]
pub struct BusController {
    buses: RwLock<BTreeMap<Uuid, BusData>>,
}

fn bus_id(req: &RequestView) -> Result<Uuid, HandlerError> {
    req.params::<BusIdParams>()
        .map(|params| params.id)
        .ok_or_else(|| HandlerError::bad_request("missing bus id"))
}

fn matches(bus: &BusData, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    [
        Some(bus.license_plate.as_str()),
        bus.metadata.brand.as_deref(),
        bus.metadata.color.as_deref(),
    ]
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(&needle))
}

impl BusController {
    async fn list(self: Arc<Self>, req: RequestView) -> Result<Payload, HandlerError> {
        let Some(query) = req.query::<BusListQuery>() else {
            return Err(HandlerError::bad_request("invalid query"));
        };
        let buses = self.buses.read().await;
        let matching: Vec<&BusData> = buses
            .values()
            .filter(|bus| query.search.as_deref().is_none_or(|s| matches(bus, s)))
            .collect();

        let limit = query.limit.max(1) as usize;
        let skip = (query.page.max(1) as usize - 1).saturating_mul(limit);
        let page = BusPage {
            data: matching.iter().skip(skip).take(limit).map(|bus| (*bus).clone()).collect(),
            meta: PageMeta {
                total: matching.len(),
                page: query.page,
                limit: query.limit,
                total_pages: matching.len().div_ceil(limit),
            },
        };
        Payload::of(&page)
    }

    async fn show(self: Arc<Self>, req: RequestView) -> Result<Payload, HandlerError> {
        let id = bus_id(&req)?;
        let buses = self.buses.read().await;
        let bus = buses.get(&id).ok_or(BusNotFound)?;
        Payload::of(bus)
    }

    async fn create(self: Arc<Self>, req: RequestView) -> Result<Payload, HandlerError> {
        let Some(body) = req.body::<CreateBusBody>() else {
            return Err(HandlerError::bad_request("invalid body"));
        };
        let bus = BusData {
            id: Uuid::new_v4(),
            license_plate: body.license_plate.clone(),
            capacity: body.capacity,
            metadata: body.metadata.clone(),
            created_at: Utc::now(),
        };
        self.buses.write().await.insert(bus.id, bus.clone());
        tracing::info!(bus_id = %bus.id, plate = %bus.license_plate, "bus registered");
        Payload::of(&bus)
    }

    async fn update(self: Arc<Self>, req: RequestView) -> Result<Payload, HandlerError> {
        let id = bus_id(&req)?;
        let Some(body) = req.body::<UpdateBusBody>() else {
            return Err(HandlerError::bad_request("invalid body"));
        };
        let mut buses = self.buses.write().await;
        let bus = buses.get_mut(&id).ok_or(BusNotFound)?;
        if let Some(plate) = &body.license_plate {
            bus.license_plate.clone_from(plate);
        }
        if let Some(capacity) = body.capacity {
            bus.capacity = capacity;
        }
        if let Some(metadata) = &body.metadata {
            bus.metadata = metadata.clone();
        }
        Payload::of(&*bus)
    }

    async fn delete(self: Arc<Self>, req: RequestView) -> Result<Payload, HandlerError> {
        let id = bus_id(&req)?;
        self.buses.write().await.remove(&id).ok_or(BusNotFound)?;
        tracing::info!(bus_id = %id, "bus removed");
        Payload::of(&BusDeleted {})
    }
}

impl Controller for BusController {
    fn routes() -> Vec<Route<Self>> {
        let admin = || Arc::new(BearerAuth::new(super::admin_principal));
        vec![
            Route::get("/", Self::list)
                .query::<BusListQuery>()
                .response::<BusPage>()
                .tag("Buses")
                .summary("List buses"),
            Route::get("/:id", Self::show)
                .params::<BusIdParams>()
                .response::<BusData>()
                .error::<BusNotFound>()
                .tag("Buses")
                .summary("Get a bus"),
            Route::post("/", Self::create)
                .auth(admin())
                .body::<CreateBusBody>()
                .response::<BusData>()
                .tag("Buses")
                .summary("Register a bus"),
            Route::put("/:id", Self::update)
                .auth(admin())
                .params::<BusIdParams>()
                .body::<UpdateBusBody>()
                .response::<BusData>()
                .error::<BusNotFound>()
                .tag("Buses")
                .summary("Update a bus"),
            Route::delete("/:id", Self::delete)
                .auth(admin())
                .params::<BusIdParams>()
                .response::<BusDeleted>()
                .error::<BusNotFound>()
                .tag("Buses")
                .summary("Remove a bus"),
        ]
    }
}
