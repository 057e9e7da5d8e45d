//! Models and controllers shared by the unit tests.

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::dispatch::{BearerAuth, Contribution, Payload, Principal, RequestView, from_fn};
use crate::error::{ApiError, HandlerError};
use crate::route::{Controller, LeafNode, Route};
use crate::schema::{Envelope, FieldRule, FieldSet, Format, Model, ModelRef, Primitive};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ItemParams {
    pub(crate) id: String,
}

impl Model for ItemParams {
    fn describe(fields: &mut FieldSet) {
        fields.field("id", FieldRule::string());
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct CreateItem {
    pub(crate) name: String,
    pub(crate) price: f64,
}

impl Model for CreateItem {
    const MODULE: &'static str = "items";

    fn describe(fields: &mut FieldSet) {
        fields
            .field("name", FieldRule::string().min_length(1).max_length(64))
            .field("price", FieldRule::number().min(0.0));
    }
}

/// Same display name as [`CreateItem`], other module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct OtherCreateItem {
    pub(crate) name: String,
}

impl Model for OtherCreateItem {
    const MODULE: &'static str = "archive";

    fn describe(fields: &mut FieldSet) {
        fields.field("name", FieldRule::string());
    }

    fn name() -> &'static str {
        "CreateItem"
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Marker {}

impl Model for Marker {
    fn describe(_fields: &mut FieldSet) {}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Dog {
    pub(crate) name: String,
    pub(crate) breed: String,
}

impl Model for Dog {
    fn describe(fields: &mut FieldSet) {
        fields
            .field("name", FieldRule::string())
            .field("breed", FieldRule::string());
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Cat {
    pub(crate) name: String,
    pub(crate) indoor: bool,
}

impl Model for Cat {
    fn describe(fields: &mut FieldSet) {
        fields
            .field("name", FieldRule::string())
            .field("indoor", FieldRule::boolean());
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Pagination {
    pub(crate) search: Option<String>,
    pub(crate) page: u32,
    pub(crate) limit: u32,
}

impl Model for Pagination {
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

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct BusMetadata {
    pub(crate) color: Option<String>,
    pub(crate) brand: Option<String>,
    #[serde(rename = "madeYear")]
    pub(crate) made_year: Option<f64>,
    pub(crate) camera: Option<bool>,
}

impl Model for BusMetadata {
    fn describe(fields: &mut FieldSet) {
        fields
            .field("color", FieldRule::string().optional())
            .field("brand", FieldRule::string().optional())
            .field("madeYear", FieldRule::number().optional())
            .field("camera", FieldRule::boolean().optional());
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct BusData {
    pub(crate) id: String,
    #[serde(rename = "licensePlate")]
    pub(crate) license_plate: String,
    pub(crate) capacity: f64,
    pub(crate) metadata: BusMetadata,
    pub(crate) stops: Vec<String>,
}

impl Model for BusData {
    fn describe(fields: &mut FieldSet) {
        fields
            .field("id", FieldRule::string().format(Format::Uuid))
            .field("licensePlate", FieldRule::string())
            .field("capacity", FieldRule::number())
            .field("metadata", FieldRule::object::<BusMetadata>())
            .field(
                "stops",
                FieldRule::array_of_primitive(Primitive::String).min_items(1),
            );
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Contact {
    pub(crate) email: String,
    pub(crate) id: String,
    pub(crate) site: String,
    pub(crate) ip: String,
    pub(crate) day: String,
    pub(crate) at: String,
    pub(crate) when: String,
    pub(crate) every: String,
    pub(crate) each: Option<String>,
    pub(crate) role: Option<String>,
}

impl Model for Contact {
    fn describe(fields: &mut FieldSet) {
        fields
            .field("email", FieldRule::string().format(Format::Email))
            .field("id", FieldRule::string().format(Format::Uuid))
            .field("site", FieldRule::string().format(Format::Url))
            .field("ip", FieldRule::string().format(Format::Ipv4))
            .field("day", FieldRule::string().format(Format::IsoDate))
            .field("at", FieldRule::string().format(Format::IsoTime))
            .field("when", FieldRule::string().format(Format::IsoDateTime))
            .field("every", FieldRule::string().format(Format::IsoDuration))
            .field("each", FieldRule::string().format(Format::Ipv6).optional())
            .field(
                "role",
                FieldRule::enumeration(["driver", "parent"]).optional(),
            );
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Upload {
    pub(crate) avatar: Value,
}

impl Model for Upload {
    fn describe(fields: &mut FieldSet) {
        fields.field(
            "avatar",
            FieldRule::file()
                .max_size(1024)
                .mime("image/png")
                .mime("image/jpeg"),
        );
    }

    fn content_type() -> Option<&'static str> {
        Some("multipart/form-data")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SelfRef {
    pub(crate) child: Option<Box<SelfRef>>,
}

impl Model for SelfRef {
    fn describe(fields: &mut FieldSet) {
        fields.field("child", FieldRule::object::<SelfRef>().optional());
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct CreatedItem {
    pub(crate) id: String,
    pub(crate) name: String,
}

impl Model for CreatedItem {
    fn describe(fields: &mut FieldSet) {
        fields
            .field("id", FieldRule::string())
            .field("name", FieldRule::string());
    }

    fn envelope() -> Option<Envelope> {
        Some(Envelope::new(201, "Created"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct PlainItem {
    pub(crate) id: String,
}

impl Model for PlainItem {
    fn describe(fields: &mut FieldSet) {
        fields.field("id", FieldRule::string());
    }
}

#[derive(Debug, thiserror::Error)]
#[error("item not found")]
pub(crate) struct ItemNotFound;

impl ApiError for ItemNotFound {
    const STATUS: StatusCode = StatusCode::NOT_FOUND;
    const STATUS_MESSAGE: &'static str = "Not Found";
}

fn admin_only(token: &str) -> Option<Principal> {
    (token == "admin-token")
        .then(|| Principal::from_iter([("user".to_string(), json!({"role": "admin"}))]))
}

fn request_id(req: &RequestView, _route: &LeafNode) -> Result<Option<Contribution>, HandlerError> {
    if req.header("x-block").is_some() {
        return Err(HandlerError::forbidden("blocked"));
    }
    Ok(Some(Contribution::from_iter([(
        "request_id".to_string(),
        json!("req-1"),
    )])))
}

#[derive(Debug, Default)]
pub(crate) struct ItemController;

impl ItemController {
    async fn get_item(self: Arc<Self>, req: RequestView) -> Result<Payload, HandlerError> {
        let Some(params) = req.params::<ItemParams>() else {
            return Err(HandlerError::bad_request("missing id"));
        };
        if params.id == "missing" {
            return Err(ItemNotFound.into());
        }
        Payload::of(&PlainItem {
            id: params.id.clone(),
        })
    }

    async fn create_item(self: Arc<Self>, req: RequestView) -> Result<Payload, HandlerError> {
        let Some(item) = req.body::<CreateItem>() else {
            return Err(HandlerError::bad_request("missing body"));
        };
        Payload::of(&CreatedItem {
            id: "1".to_string(),
            name: item.name.clone(),
        })
    }

    async fn create_pet(self: Arc<Self>, req: RequestView) -> Result<Payload, HandlerError> {
        if let Some(cat) = req.body::<Cat>() {
            return Ok(Payload::json(json!({"kind": "cat", "name": cat.name})));
        }
        if let Some(dog) = req.body::<Dog>() {
            return Ok(Payload::json(json!({"kind": "dog", "name": dog.name})));
        }
        Err(HandlerError::bad_request("unknown pet"))
    }

    async fn private(self: Arc<Self>, req: RequestView) -> Result<Payload, HandlerError> {
        let name = req.body::<CreateItem>().map(|item| item.name.clone());
        Ok(Payload::json(json!({
            "user": req.extra("user").cloned(),
            "name": name,
        })))
    }

    async fn raw(self: Arc<Self>, req: RequestView) -> Result<Payload, HandlerError> {
        Ok(Payload::json(json!({
            "query": req.query_value(),
            "request_id": req.extra("request_id").cloned(),
        })))
    }

    async fn upload(self: Arc<Self>, req: RequestView) -> Result<Payload, HandlerError> {
        let Some(upload) = req.body::<Upload>() else {
            return Err(HandlerError::bad_request("missing upload"));
        };
        let bytes = req.file("avatar").map(|file| file.data.len());
        Ok(Payload::json(json!({
            "filename": upload.avatar.get("filename"),
            "size": upload.avatar.get("size"),
            "bytes": bytes,
        })))
    }
}

impl Controller for ItemController {
    fn routes() -> Vec<Route<Self>> {
        vec![
            Route::get("/items/:id", Self::get_item)
                .params::<ItemParams>()
                .response::<PlainItem>()
                .error::<ItemNotFound>(),
            Route::post("/items", Self::create_item)
                .body::<CreateItem>()
                .response::<CreatedItem>()
                .summary("Create an item")
                .operation_id("createItem"),
            Route::post("/pets", Self::create_pet)
                .body_one_of(vec![ModelRef::of::<Dog>(), ModelRef::of::<Cat>()])
                .tag("pets"),
            Route::post("/private", Self::private)
                .auth(Arc::new(BearerAuth::new(admin_only)))
                .body::<CreateItem>(),
            Route::get("/raw", Self::raw)
                .query::<Marker>()
                .middleware(from_fn(request_id)),
            Route::post("/upload", Self::upload).body::<Upload>(),
        ]
    }
}

#[derive(Debug, Default)]
pub(crate) struct SubController;

impl SubController {
    pub(crate) const ROUTE_COUNT: usize = 2;

    async fn show(self: Arc<Self>, req: RequestView) -> Result<Payload, HandlerError> {
        Ok(Payload::json(req.params_value().clone()))
    }

    async fn list(self: Arc<Self>, req: RequestView) -> Result<Payload, HandlerError> {
        Ok(Payload::json(req.query_value().clone()))
    }
}

impl Controller for SubController {
    fn routes() -> Vec<Route<Self>> {
        vec![
            Route::get("/items/:id", Self::show).params::<ItemParams>(),
            Route::get("/items", Self::list).query::<Pagination>(),
        ]
    }
}

#[derive(Debug, Default)]
pub(crate) struct ApiRoot;

impl ApiRoot {
    async fn status(self: Arc<Self>, _req: RequestView) -> Result<Payload, HandlerError> {
        Ok(Payload::json(json!({"status": "ok"})))
    }

    async fn version(self: Arc<Self>, _req: RequestView) -> Result<Payload, HandlerError> {
        Ok(Payload::json(json!(env!("CARGO_PKG_VERSION"))))
    }
}

impl Controller for ApiRoot {
    fn routes() -> Vec<Route<Self>> {
        vec![
            Route::get("/status", Self::status),
            Route::get("/version", Self::version),
            Route::mount::<SubController>("/sub"),
        ]
    }
}

#[derive(Debug, Default)]
pub(crate) struct LoopController;

impl Controller for LoopController {
    fn routes() -> Vec<Route<Self>> {
        vec![Route::mount::<LoopController>("/again")]
    }
}

#[derive(Debug, Default)]
pub(crate) struct WeirdController;

impl WeirdController {
    async fn tunnel(self: Arc<Self>, _req: RequestView) -> Result<Payload, HandlerError> {
        Ok(Payload::json(Value::Null))
    }
}

impl Controller for WeirdController {
    fn routes() -> Vec<Route<Self>> {
        vec![Route::new(Method::CONNECT, "/tunnel", Self::tunnel)]
    }
}

#[derive(Debug, Default)]
pub(crate) struct DuplicateController;

impl DuplicateController {
    async fn first(self: Arc<Self>, _req: RequestView) -> Result<Payload, HandlerError> {
        Ok(Payload::json(json!("first")))
    }

    async fn second(self: Arc<Self>, _req: RequestView) -> Result<Payload, HandlerError> {
        Ok(Payload::json(json!("second")))
    }
}

impl Controller for DuplicateController {
    fn routes() -> Vec<Route<Self>> {
        vec![
            Route::get("/same", Self::first),
            Route::get("/same", Self::second),
        ]
    }
}

#[derive(Debug, Default)]
pub(crate) struct PlaceholderClash;

impl PlaceholderClash {
    async fn noop(self: Arc<Self>, _req: RequestView) -> Result<Payload, HandlerError> {
        Ok(Payload::json(Value::Null))
    }
}

impl Controller for PlaceholderClash {
    fn routes() -> Vec<Route<Self>> {
        vec![
            Route::get("/a/:id", Self::noop),
            Route::post("/a/:other", Self::noop),
        ]
    }
}
