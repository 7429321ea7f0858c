//! Caller-supplied transforms over an assembled model. A transform that fails or
//! panics is logged and skipped; the untransformed value is used instead.

use crate::adapter::CrudAdapter;
use crate::config::Schema;
use crate::error::BoxError;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Rewrites a module's adapter: wrap operations, add named ones via `invoke`.
pub trait ModelFilter: Send + Sync {
    fn filter(&self, model: Arc<dyn CrudAdapter>, schema: &Schema) -> Result<Arc<dyn CrudAdapter>, BoxError>;
}

impl<F> ModelFilter for F
where
    F: Fn(Arc<dyn CrudAdapter>, &Schema) -> Result<Arc<dyn CrudAdapter>, BoxError> + Send + Sync,
{
    fn filter(&self, model: Arc<dyn CrudAdapter>, schema: &Schema) -> Result<Arc<dyn CrudAdapter>, BoxError> {
        self(model, schema)
    }
}

pub fn apply_model_filter(filter: &dyn ModelFilter, model: Arc<dyn CrudAdapter>, schema: &Schema) -> Arc<dyn CrudAdapter> {
    guarded("model", &schema.table_name, model, |m| filter.filter(m, schema))
}

/// Run `transform` on a clone of `original`; on error or panic keep `original`.
pub(crate) fn guarded<T, F>(kind: &str, name: &str, original: T, transform: F) -> T
where
    T: Clone,
    F: FnOnce(T) -> Result<T, BoxError>,
{
    let attempt = catch_unwind(AssertUnwindSafe(|| transform(original.clone())));
    match attempt {
        Ok(Ok(transformed)) => transformed,
        Ok(Err(e)) => {
            tracing::warn!(module = %name, error = %e, "{} filter failed; using unfiltered {}", kind, kind);
            original
        }
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "panic".to_string());
            tracing::warn!(module = %name, error = %message, "{} filter panicked; using unfiltered {}", kind, kind);
            original
        }
    }
}
