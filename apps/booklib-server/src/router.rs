use std::mem;

use axum::{
    handler::Handler,
    routing::{delete, get, patch, post},
    Router,
};

use crate::{api, AppState};

pub(crate) struct RouterBuilder {
    router: Router<AppState>,
    endpoints: Vec<String>,
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            endpoints: Vec::new(),
        }
    }

    fn record(&mut self, method: &str, path: &'static str) {
        self.endpoints.push(format!("{} {}", method, path));
    }

    pub fn route_get<H, T>(&mut self, path: &'static str, handler: H) -> &mut Self
    where
        H: Handler<T, AppState> + Clone + 'static,
        T: Send + 'static,
    {
        self.record("GET", path);
        let router = mem::take(&mut self.router);
        self.router = router.route(path, get(handler));
        self
    }

    pub fn route_post<H, T>(&mut self, path: &'static str, handler: H) -> &mut Self
    where
        H: Handler<T, AppState> + Clone + 'static,
        T: Send + 'static,
    {
        self.record("POST", path);
        let router = mem::take(&mut self.router);
        self.router = router.route(path, post(handler));
        self
    }

    pub fn route_patch<H, T>(&mut self, path: &'static str, handler: H) -> &mut Self
    where
        H: Handler<T, AppState> + Clone + 'static,
        T: Send + 'static,
    {
        self.record("PATCH", path);
        let router = mem::take(&mut self.router);
        self.router = router.route(path, patch(handler));
        self
    }

    pub fn route_delete<H, T>(&mut self, path: &'static str, handler: H) -> &mut Self
    where
        H: Handler<T, AppState> + Clone + 'static,
        T: Send + 'static,
    {
        self.record("DELETE", path);
        let router = mem::take(&mut self.router);
        self.router = router.route(path, delete(handler));
        self
    }

    pub fn build(self) -> (Router<AppState>, Vec<String>) {
        (self.router, self.endpoints)
    }
}

pub(crate) mod paths {
    pub const HEALTHZ: &str = "/healthz";
    pub const ABOUT: &str = "/about";
    pub const SPEC_OPENAPI: &str = "/spec/openapi.json";
    pub const BOOKS: &str = "/api/v1/book";
    pub const BOOKS_ID: &str = "/api/v1/book/{id}";
}

/// All routes, plus the `METHOD path` list reported by `/about`.
pub(crate) fn build_router() -> (Router<AppState>, Vec<String>) {
    let mut builder = RouterBuilder::new();
    builder
        .route_get(paths::HEALTHZ, api::meta::healthz)
        .route_get(paths::ABOUT, api::meta::about)
        .route_get(paths::SPEC_OPENAPI, api::meta::spec_openapi)
        .route_get(paths::BOOKS, api::books::books_list)
        .route_post(paths::BOOKS, api::books::books_create)
        .route_get(paths::BOOKS_ID, api::books::books_get)
        .route_patch(paths::BOOKS_ID, api::books::books_patch)
        .route_delete(paths::BOOKS_ID, api::books::books_delete);
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_every_endpoint() {
        let (_router, endpoints) = build_router();
        assert!(endpoints.contains(&"GET /api/v1/book/{id}".to_string()));
        assert!(endpoints.contains(&"DELETE /api/v1/book/{id}".to_string()));
        assert!(endpoints.contains(&"POST /api/v1/book".to_string()));
        assert_eq!(endpoints.len(), 8);
    }
}
