//! services/api/src/bin/openapi.rs
//!
//! Dumps the marketing-site API's OpenAPI 3 document so the admin console
//! and widget frontends can generate their clients from it. The output path
//! may be passed as the first argument; it defaults to `openapi.json`.

use api_lib::web::rest::ApiDoc;
use utoipa::OpenApi;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "openapi.json".to_string());
    let document = ApiDoc::openapi().to_pretty_json()?;
    std::fs::write(&path, document)?;
    println!("OpenAPI document written to {path}");
    Ok(())
}
