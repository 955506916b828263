use clap::Args;
use serde::Serialize;
use tuhfa_core::{Catalog, CategoryId, Locale, OccasionId, Product, TextDirection};

use super::{load_runtime, CommandResult};

const COMMAND: &str = "catalog";

#[derive(Debug, Default, Args)]
pub struct CatalogArgs {
    #[arg(long, help = "Category id, e.g. flowers")]
    pub category: Option<String>,
    #[arg(long, help = "Occasion id, e.g. eid")]
    pub occasion: Option<String>,
    #[arg(long = "q", help = "Case-insensitive name search (English or Arabic)")]
    pub query: Option<String>,
    #[arg(long, help = "Name locale (en|ar), defaults to en")]
    pub locale: Option<String>,
}

#[derive(Debug, Serialize)]
struct CatalogListing {
    locale: Locale,
    direction: TextDirection,
    count: usize,
    products: Vec<ListedProduct>,
}

#[derive(Debug, Serialize)]
struct ListedProduct {
    id: u32,
    name: String,
    price: String,
    category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    occasion: Option<String>,
    best_seller: bool,
    special_gift: bool,
}

pub fn run(args: &CatalogArgs) -> CommandResult {
    let locale = match args.locale.as_deref().map(str::parse::<Locale>).transpose() {
        Ok(locale) => locale.unwrap_or_default(),
        Err(error) => return CommandResult::failure(COMMAND, "invalid_input", error.to_string(), 2),
    };

    let (_, catalog) = match load_runtime(COMMAND) {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let products = filter(&catalog, args);
    if products.is_empty() {
        return CommandResult::success(COMMAND, "no products matched the filters");
    }

    let listing = CatalogListing {
        locale,
        direction: locale.direction(),
        count: products.len(),
        products: products.into_iter().map(|product| listed(product, locale)).collect(),
    };
    CommandResult::data(COMMAND, &listing)
}

fn filter<'a>(catalog: &'a Catalog, args: &CatalogArgs) -> Vec<&'a Product> {
    let category = args.category.as_deref().map(CategoryId::from);
    let occasion = args.occasion.as_deref().map(OccasionId::from);

    catalog
        .search(args.query.as_deref().unwrap_or_default())
        .into_iter()
        .filter(|product| category.as_ref().map_or(true, |id| &product.category_id == id))
        .filter(|product| {
            occasion.as_ref().map_or(true, |id| product.occasion_id.as_ref() == Some(id))
        })
        .collect()
}

fn listed(product: &Product, locale: Locale) -> ListedProduct {
    ListedProduct {
        id: product.id.0,
        name: product.name(locale).to_string(),
        price: product.price.normalize().to_string(),
        category: product.category_id.as_str().to_string(),
        occasion: product.occasion_id.as_ref().map(|id| id.as_str().to_string()),
        best_seller: product.is_best_seller,
        special_gift: product.is_special_gift,
    }
}
