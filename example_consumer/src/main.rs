//! Example consumer: mounts one CRUD module per schema file.
//!
//! Run from repo root: `cargo run -p example-consumer`
//! Create tables first with: `cargo run -p example-consumer -- setup`
//! Backend comes from `DB_CLIENT` (`pg`, `reql`, `memory`; default is the document store).

use accelerated_model::{common_routes, mount_all, AdapterFactory, Backend, CrudModule, ModuleSettings, Settings};
use tokio::net::TcpListener;

const SCHEMA_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/schemas");

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("accelerated_model=info,example_consumer=info")),
        )
        .init();

    let settings = Settings::from_env()?;
    let backend = Backend::connect(&settings).await?;
    let factory = AdapterFactory::new(backend);

    let widgets = CrudModule::build(
        ModuleSettings::from_file(format!("{}/widgets.json", SCHEMA_DIR))?.name("Widgets"),
        &factory,
    );
    let modules = vec![widgets];

    let args: Vec<String> = std::env::args().collect();
    for m in &modules {
        if m.setup_if_requested(&args).await? {
            tracing::info!(module = %m.name(), "setup complete");
        }
    }

    let app = mount_all(&modules).merge(common_routes());
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".into());
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Example consumer listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
