use std::sync::Arc;

use booklib_kernel::Kernel;

use crate::books::BookService;

#[derive(Clone)]
pub(crate) struct AppState {
    kernel: Kernel,
    books: BookService,
    endpoints: Arc<Vec<String>>,
}

impl AppState {
    pub fn new(kernel: Kernel) -> Self {
        Self {
            books: BookService::new(kernel.clone()),
            kernel,
            endpoints: Arc::new(Vec::new()),
        }
    }

    pub fn with_endpoints(mut self, endpoints: Vec<String>) -> Self {
        self.endpoints = Arc::new(endpoints);
        self
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    pub fn books(&self) -> &BookService {
        &self.books
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }
}
