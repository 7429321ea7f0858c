//! CRUD routes for one resource, relative to the module's mount point.

use crate::adapter::CrudAdapter;
use crate::handlers::resource::{
    create, delete as delete_handler, delete_where, list, read, read_where, update, update_where,
};
use crate::state::ResourceState;
use axum::{routing::get, Router};
use std::sync::Arc;

pub fn resource_routes(adapter: Arc<dyn CrudAdapter>) -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", get(read).put(update).delete(delete_handler))
        .route(
            "/:property/:value",
            get(read_where).put(update_where).delete(delete_where),
        )
        .with_state(ResourceState::new(adapter))
}
