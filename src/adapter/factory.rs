use crate::adapter::{CrudAdapter, DocumentAdapter, RelationalAdapter};
use crate::config::Schema;
use crate::connection::Backend;
use std::sync::Arc;

/// Builds the strategy matching the opened backend for each schema.
#[derive(Clone)]
pub struct AdapterFactory {
    backend: Backend,
}

impl AdapterFactory {
    pub fn new(backend: Backend) -> Self {
        AdapterFactory { backend }
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn build(&self, schema: Arc<Schema>) -> Arc<dyn CrudAdapter> {
        match &self.backend {
            Backend::Relational(pool) => Arc::new(RelationalAdapter::new(pool.clone(), schema)),
            Backend::Document(store) => Arc::new(DocumentAdapter::new(store.clone(), schema)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_schema_str;

    #[tokio::test]
    async fn memory_backend_builds_document_adapter() {
        let schema = Arc::new(
            load_schema_str(r#"{"table_name": "t", "primary_key": "id", "columns": [["id", "uuid"]]}"#).unwrap(),
        );
        let adapter = AdapterFactory::new(Backend::memory()).build(schema);
        adapter.setup().await.unwrap();
        assert!(adapter.get_all().await.unwrap().is_empty());
        assert_eq!(adapter.schema().table_name, "t");
    }
}
