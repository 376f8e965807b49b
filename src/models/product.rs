use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{AppError, Result};

/// A single product as declared in the catalog file.
///
/// Only the fields the matcher itself needs are typed. Anything else in the
/// catalog record (price, brand, whatever the storefront tracks) is carried
/// through opaquely in `extra` and serialized back out unchanged.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Product {
    /// Unique catalog identifier; also names the cached image file.
    pub id: u64,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Display category.
    #[serde(default)]
    pub category: String,
    /// Image URL as declared by the catalog; the acquisition source.
    #[serde(rename = "imageUrl")]
    pub image_url: String,
    /// Additional display fields, passed through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The product catalog: an ordered list of products with an id index.
///
/// Loaded once from a JSON file and immutable afterwards. Iteration follows
/// the file's declared order; lookups go through the index. A duplicate id
/// keeps the later occurrence.
#[derive(Debug, Clone)]
pub struct Catalog {
    products: Vec<Product>,
    by_id: HashMap<u64, usize>,
}

impl Catalog {
    /// Load the catalog from a JSON file (an array of product records).
    ///
    /// # Errors
    ///
    /// Returns `AppError::Catalog` if the file is missing or unparseable.
    /// This is fatal everywhere: acquisition, ingestion and the server all
    /// refuse to run without a valid catalog.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| AppError::Catalog(format!("could not read {}: {}", path.display(), e)))?;
        let products: Vec<Product> = serde_json::from_str(&raw)
            .map_err(|e| AppError::Catalog(format!("could not parse {}: {}", path.display(), e)))?;

        log::info!("Loaded {} products from {}", products.len(), path.display());
        Ok(Self::from_products(products))
    }

    /// Build a catalog from an already-deserialized product list.
    pub fn from_products(products: Vec<Product>) -> Self {
        let mut by_id = HashMap::with_capacity(products.len());
        for (idx, product) in products.iter().enumerate() {
            if by_id.insert(product.id, idx).is_some() {
                log::warn!(
                    "Duplicate product id {} in catalog; keeping the later entry",
                    product.id
                );
            }
        }

        Self { products, by_id }
    }

    /// Look up a product by id.
    pub fn get(&self, id: u64) -> Option<&Product> {
        self.by_id.get(&id).map(|&idx| &self.products[idx])
    }

    /// Iterate products in the catalog's declared order.
    pub fn iter(&self) -> impl Iterator<Item = &Product> {
        self.products.iter()
    }

    /// Number of products.
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}
