//! Types for the gift assistant

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::tables;
use crate::domain::product::Product;
use crate::locale::Locale;

/// Answers collected by the gift questionnaire.
///
/// Every field is optional; the matcher treats a missing or unknown id as "no
/// constraint".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionnaireAnswer {
    #[serde(default)]
    pub occasion: Option<String>,
    #[serde(default)]
    pub relationship: Option<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub budget: Option<String>,
    #[serde(default)]
    pub age_group: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub personality: Option<String>,
}

impl QuestionnaireAnswer {
    pub fn with_occasion(mut self, occasion: impl Into<String>) -> Self {
        self.occasion = Some(occasion.into());
        self
    }

    pub fn with_relationship(mut self, relationship: impl Into<String>) -> Self {
        self.relationship = Some(relationship.into());
        self
    }

    pub fn with_interest(mut self, interest: impl Into<String>) -> Self {
        let interest = interest.into();
        if !self.interests.contains(&interest) {
            self.interests.push(interest);
        }
        self
    }

    pub fn with_budget(mut self, budget: impl Into<String>) -> Self {
        self.budget = Some(budget.into());
        self
    }

    pub fn with_age_group(mut self, age_group: impl Into<String>) -> Self {
        self.age_group = Some(age_group.into());
        self
    }

    pub fn with_gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = Some(gender.into());
        self
    }

    pub fn with_personality(mut self, personality: impl Into<String>) -> Self {
        self.personality = Some(personality.into());
        self
    }

    /// Adds the interest when absent, removes it when present.
    pub fn toggle_interest(&mut self, interest: &str) {
        if let Some(position) = self.interests.iter().position(|value| value == interest) {
            self.interests.remove(position);
        } else {
            self.interests.push(interest.to_owned());
        }
    }
}

/// Inclusive price bounds after the relationship multiplier is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: Decimal,
    pub max: Option<Decimal>,
}

impl PriceRange {
    pub fn contains(&self, price: Decimal) -> bool {
        price >= self.min && self.max.map_or(true, |max| price <= max)
    }
}

/// Ranked gifts plus the heuristic scores shown next to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionResult {
    pub products: Vec<Product>,
    /// 0..=95, cosmetic.
    pub confidence: u8,
    /// 0..=100, cosmetic.
    pub match_score: u8,
    pub rationale: String,
    /// True when nothing matched and featured gifts were returned instead.
    pub fallback: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptionView {
    pub id: &'static str,
    pub label: &'static str,
}

/// Localized questionnaire options, in display order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantOptions {
    pub locale: Locale,
    pub occasions: Vec<OptionView>,
    pub relationships: Vec<OptionView>,
    pub interests: Vec<OptionView>,
    pub budgets: Vec<OptionView>,
    pub age_groups: Vec<OptionView>,
    pub genders: Vec<OptionView>,
    pub personalities: Vec<OptionView>,
}

impl AssistantOptions {
    pub fn localized(locale: Locale) -> Self {
        Self {
            locale,
            occasions: views(tables::OCCASIONS.iter().map(|o| (o.id, o.label)), locale),
            relationships: views(tables::RELATIONSHIPS.iter().map(|o| (o.id, o.label)), locale),
            interests: views(tables::INTERESTS.iter().map(|o| (o.id, o.label)), locale),
            budgets: views(tables::BUDGETS.iter().map(|o| (o.id, o.label)), locale),
            age_groups: views(tables::AGE_GROUPS.iter().map(|o| (o.id, o.label)), locale),
            genders: views(tables::GENDERS.iter().map(|o| (o.id, o.label)), locale),
            personalities: views(tables::PERSONALITIES.iter().map(|o| (o.id, o.label)), locale),
        }
    }
}

fn views(
    options: impl Iterator<Item = (&'static str, tables::Label)>,
    locale: Locale,
) -> Vec<OptionView> {
    options.map(|(id, label)| OptionView { id, label: label.get(locale) }).collect()
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{AssistantOptions, PriceRange, QuestionnaireAnswer};
    use crate::locale::Locale;

    #[test]
    fn toggling_interest_keeps_selection_order() {
        let mut answer = QuestionnaireAnswer::default().with_interest("sweets").with_interest("reading");
        answer.toggle_interest("nature");
        answer.toggle_interest("sweets");

        assert_eq!(answer.interests, vec!["reading".to_string(), "nature".to_string()]);
    }

    #[test]
    fn with_interest_ignores_duplicates() {
        let answer = QuestionnaireAnswer::default().with_interest("beauty").with_interest("beauty");
        assert_eq!(answer.interests.len(), 1);
    }

    #[test]
    fn price_range_is_inclusive_and_open_ended() {
        let bounded = PriceRange { min: Decimal::new(100, 0), max: Some(Decimal::new(250, 0)) };
        assert!(bounded.contains(Decimal::new(100, 0)));
        assert!(bounded.contains(Decimal::new(250, 0)));
        assert!(!bounded.contains(Decimal::new(25001, 2)));

        let open = PriceRange { min: Decimal::new(1000, 0), max: None };
        assert!(open.contains(Decimal::new(1_000_000, 0)));
        assert!(!open.contains(Decimal::new(999, 0)));
    }

    #[test]
    fn answer_accepts_partial_camel_case_json() {
        let answer: QuestionnaireAnswer =
            serde_json::from_str(r#"{"occasion":"birthday","ageGroup":"adult"}"#)
                .expect("partial answer should parse");

        assert_eq!(answer.occasion.as_deref(), Some("birthday"));
        assert_eq!(answer.age_group.as_deref(), Some("adult"));
        assert!(answer.interests.is_empty());
    }

    #[test]
    fn options_are_localized() {
        let options = AssistantOptions::localized(Locale::Ar);
        let birthday = options.occasions.iter().find(|o| o.id == "birthday").expect("birthday");
        assert_eq!(birthday.label, "عيد ميلاد");
        assert_eq!(options.budgets.len(), 5);
    }
}
