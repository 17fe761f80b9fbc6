//! Seed the catalog with products from a YAML file.
//!
//! The file is a list of products using the same field names as the admin
//! API:
//!
//! ```yaml
//! - name: Faded Levi's 501
//!   description: Straight-leg, light wash, 32x32.
//!   price: 1299
//!   originalPrice: 3999
//!   images: ["https://cdn.example.com/501.jpg"]
//!   category: Denim
//!   condition: Good
//!   vintage: true
//! ```
//!
//! Every entry is validated before anything is inserted, so a bad file
//! leaves the catalog untouched.

use std::path::Path;

use oncemore_core::{ProductDraft, ProductError, ProductInput};
use oncemore_storefront::db::{ProductRepository, RepositoryError};
use thiserror::Error;
use tracing::info;

use super::{ConnectError, catalog_pool};

/// Errors that can occur while seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Product #{index} is invalid: {source}")]
    Invalid { index: usize, source: ProductError },

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Parse and validate every product in a YAML document.
fn parse_products(yaml: &str) -> Result<Vec<ProductDraft>, SeedError> {
    let inputs: Vec<ProductInput> = serde_yaml::from_str(yaml)?;
    inputs
        .into_iter()
        .enumerate()
        .map(|(i, input)| {
            input.validate().map_err(|source| SeedError::Invalid {
                index: i + 1,
                source,
            })
        })
        .collect()
}

/// Insert the products listed in `file_path`.
///
/// # Errors
///
/// Returns `SeedError` if the file cannot be read or parsed, any product is
/// invalid, or an insert fails.
pub async fn products(file_path: &str) -> Result<usize, SeedError> {
    let yaml = std::fs::read_to_string(Path::new(file_path)).map_err(|source| SeedError::Read {
        path: file_path.to_owned(),
        source,
    })?;
    let drafts = parse_products(&yaml)?;
    info!("Loaded {} products from {}", drafts.len(), file_path);

    let pool = catalog_pool().await?;
    let repo = ProductRepository::new(&pool);

    for draft in &drafts {
        let id = repo.create(draft).await?;
        info!(product_id = %id, name = %draft.name, "Product inserted");
    }

    info!("Seeded {} products", drafts.len());
    Ok(drafts.len())
}
