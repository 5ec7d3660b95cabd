use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

#[allow(dead_code)]
#[derive(Serialize, ToSchema)]
pub struct HealthOk {
    pub ok: bool,
    pub books: i64,
}

#[allow(dead_code)]
#[derive(Serialize, ToSchema)]
pub struct AboutResponse {
    pub service: String,
    pub version: String,
    #[schema(example = json!(["GET /healthz", "GET /api/v1/book"]))]
    pub endpoints: Vec<String>,
}

/// Wire form of a book; unset optional fields are omitted.
#[allow(dead_code)]
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookDoc {
    #[schema(read_only)]
    pub id: Option<i64>,
    pub name: String,
    pub description: String,
    pub author: Option<String>,
    pub language: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub additional_properties: Option<serde_json::Value>,
}

#[allow(dead_code)]
#[derive(Serialize, ToSchema)]
pub struct ProblemDoc {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub status: u16,
    pub detail: Option<String>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::meta::healthz,
        crate::api::meta::about,
        crate::api::books::books_get,
        crate::api::books::books_list,
        crate::api::books::books_create,
        crate::api::books::books_patch,
        crate::api::books::books_delete,
    ),
    components(schemas(HealthOk, AboutResponse, BookDoc, ProblemDoc)),
    tags(
        (name = "Meta", description = "Service metadata"),
        (name = "Books", description = "Book catalog")
    )
)]
pub struct ApiDoc;
