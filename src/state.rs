//! Per-resource state handed to the handlers of one mounted module.

use crate::adapter::CrudAdapter;
use std::sync::Arc;

#[derive(Clone)]
pub struct ResourceState {
    pub adapter: Arc<dyn CrudAdapter>,
}

impl ResourceState {
    pub fn new(adapter: Arc<dyn CrudAdapter>) -> Self {
        ResourceState { adapter }
    }
}
