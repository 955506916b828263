//! Static storefront catalog.
//!
//! Products, categories and occasions are loaded once at startup, either from
//! the JSON compiled into the binary or from a configured data directory, and
//! are read-only afterwards.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::domain::product::{Category, CategoryId, Occasion, OccasionId, Product, ProductId};

const BUNDLED_PRODUCTS: &str = include_str!("../data/products.json");
const BUNDLED_CATEGORIES: &str = include_str!("../data/categories.json");
const BUNDLED_OCCASIONS: &str = include_str!("../data/occasions.json");

pub const PRODUCTS_FILE: &str = "products.json";
pub const CATEGORIES_FILE: &str = "categories.json";
pub const OCCASIONS_FILE: &str = "occasions.json";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("could not read catalog file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse catalog data `{origin}`: {source}")]
    Parse { origin: String, source: serde_json::Error },
    #[error("duplicate product id {0} in catalog")]
    DuplicateProduct(ProductId),
}

#[derive(Clone, Debug, Default)]
pub struct Catalog {
    products: Vec<Product>,
    categories: Vec<Category>,
    occasions: Vec<Occasion>,
}

impl Catalog {
    pub fn new(products: Vec<Product>) -> Result<Self, CatalogError> {
        Self::from_parts(products, Vec::new(), Vec::new())
    }

    pub fn from_parts(
        products: Vec<Product>,
        categories: Vec<Category>,
        occasions: Vec<Occasion>,
    ) -> Result<Self, CatalogError> {
        let mut seen = HashSet::with_capacity(products.len());
        for product in &products {
            if !seen.insert(product.id) {
                return Err(CatalogError::DuplicateProduct(product.id));
            }
        }

        Ok(Self { products, categories, occasions })
    }

    pub fn bundled() -> Result<Self, CatalogError> {
        Self::from_parts(
            parse(BUNDLED_PRODUCTS, "bundled products")?,
            parse(BUNDLED_CATEGORIES, "bundled categories")?,
            parse(BUNDLED_OCCASIONS, "bundled occasions")?,
        )
    }

    pub fn load_from_dir(dir: &Path) -> Result<Self, CatalogError> {
        Self::from_parts(
            read_json(&dir.join(PRODUCTS_FILE))?,
            read_json(&dir.join(CATEGORIES_FILE))?,
            read_json(&dir.join(OCCASIONS_FILE))?,
        )
    }

    /// Loads from `data_dir` when configured, otherwise the bundled dataset.
    pub fn load(data_dir: Option<&Path>) -> Result<Self, CatalogError> {
        match data_dir {
            Some(dir) => Self::load_from_dir(dir),
            None => Self::bundled(),
        }
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn occasions(&self) -> &[Occasion] {
        &self.occasions
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn find(&self, product_id: ProductId) -> Option<&Product> {
        self.products.iter().find(|product| product.id == product_id)
    }

    pub fn in_category<'a>(
        &'a self,
        category_id: &'a CategoryId,
    ) -> impl Iterator<Item = &'a Product> + 'a {
        self.products.iter().filter(move |product| &product.category_id == category_id)
    }

    pub fn for_occasion<'a>(
        &'a self,
        occasion_id: &'a OccasionId,
    ) -> impl Iterator<Item = &'a Product> + 'a {
        self.products.iter().filter(move |product| product.occasion_id.as_ref() == Some(occasion_id))
    }

    pub fn best_sellers(&self) -> impl Iterator<Item = &Product> {
        self.products.iter().filter(|product| product.is_best_seller)
    }

    pub fn special_gifts(&self) -> impl Iterator<Item = &Product> {
        self.products.iter().filter(|product| product.is_special_gift)
    }

    /// Case-insensitive substring match over both the English and Arabic names.
    pub fn search(&self, query: &str) -> Vec<&Product> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.products.iter().collect();
        }

        self.products
            .iter()
            .filter(|product| {
                product.name_en.to_lowercase().contains(&needle)
                    || product.name_ar.contains(needle.as_str())
            })
            .collect()
    }
}

fn parse<T: DeserializeOwned>(raw: &str, origin: &str) -> Result<T, CatalogError> {
    serde_json::from_str(raw)
        .map_err(|source| CatalogError::Parse { origin: origin.to_owned(), source })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CatalogError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| CatalogError::ReadFile { path: path.to_path_buf(), source })?;
    parse(&raw, &path.display().to_string())
}
