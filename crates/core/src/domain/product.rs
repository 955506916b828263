use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::locale::Locale;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub u32);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(pub String);

impl CategoryId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CategoryId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OccasionId(pub String);

impl OccasionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for OccasionId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name_en: String,
    pub name_ar: String,
    pub price: Decimal,
    pub image_url: String,
    pub category_id: CategoryId,
    #[serde(default)]
    pub occasion_id: Option<OccasionId>,
    #[serde(default)]
    pub is_best_seller: bool,
    #[serde(default)]
    pub is_special_gift: bool,
}

impl Product {
    pub fn name(&self, locale: Locale) -> &str {
        match locale {
            Locale::En => &self.name_en,
            Locale::Ar => &self.name_ar,
        }
    }

    /// Best sellers and special gifts make up the "closest we found" pool.
    pub fn is_featured(&self) -> bool {
        self.is_best_seller || self.is_special_gift
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name_en: String,
    pub name_ar: String,
}

impl Category {
    pub fn name(&self, locale: Locale) -> &str {
        match locale {
            Locale::En => &self.name_en,
            Locale::Ar => &self.name_ar,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occasion {
    pub id: OccasionId,
    pub name_en: String,
    pub name_ar: String,
}

impl Occasion {
    pub fn name(&self, locale: Locale) -> &str {
        match locale {
            Locale::En => &self.name_en,
            Locale::Ar => &self.name_ar,
        }
    }
}
