//! Scoring primitives for gift matching

use std::collections::HashSet;

use rust_decimal::Decimal;

use super::tables::{
    BudgetRange, RankBonuses, RelationshipProfile, RunIncrements, MAX_CONFIDENCE, MAX_MATCH_SCORE,
    RANK_BONUSES, RUN_INCREMENTS,
};
use super::types::PriceRange;
use crate::domain::product::Product;

/// What the ranking stage knows about the selected answers.
#[derive(Debug, Clone, Default)]
pub struct RankContext<'a> {
    pub occasion: Option<&'a str>,
    pub interest_categories: HashSet<&'a str>,
    pub personality_categories: HashSet<&'a str>,
}

/// Saturating accumulator for the run-level confidence and match score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunScore {
    confidence: u32,
    match_score: u32,
}

impl RunScore {
    pub fn starting_at(confidence: u32) -> Self {
        Self { confidence, match_score: 0 }
    }

    pub fn add(&mut self, confidence: u32, match_score: u32) {
        self.confidence = self.confidence.saturating_add(confidence);
        self.match_score = self.match_score.saturating_add(match_score);
    }

    pub fn confidence(&self) -> u8 {
        clamp_to(self.confidence, MAX_CONFIDENCE)
    }

    pub fn match_score(&self) -> u8 {
        clamp_to(self.match_score, MAX_MATCH_SCORE)
    }
}

fn clamp_to(value: u32, max: u32) -> u8 {
    u8::try_from(value.min(max)).unwrap_or(u8::MAX)
}

#[derive(Debug, Clone)]
pub struct ScoreCalculator {
    increments: RunIncrements,
    bonuses: RankBonuses,
}

impl ScoreCalculator {
    pub fn new() -> Self {
        Self { increments: RUN_INCREMENTS, bonuses: RANK_BONUSES }
    }

    pub fn with_tables(increments: RunIncrements, bonuses: RankBonuses) -> Self {
        Self { increments, bonuses }
    }

    pub fn increments(&self) -> &RunIncrements {
        &self.increments
    }

    /// Occasion contribution to the match score, rounded to whole points.
    pub fn occasion_match_points(&self, weight: f64) -> u32 {
        let points = (weight * self.increments.occasion_match_factor).round();
        if points.is_finite() && points > 0.0 {
            points as u32
        } else {
            0
        }
    }

    pub fn composite_score(&self, product: &Product, context: &RankContext<'_>) -> u32 {
        let mut score = 0;

        if product.is_best_seller {
            score += self.bonuses.best_seller;
        }
        if product.is_special_gift {
            score += self.bonuses.special_gift;
        }
        if let Some(occasion) = context.occasion {
            if product.occasion_id.as_ref().is_some_and(|id| id.as_str() == occasion) {
                score += self.bonuses.occasion;
            }
        }

        let category = product.category_id.as_str();
        if context.interest_categories.contains(category) {
            score += self.bonuses.interest;
        }
        if context.personality_categories.contains(category) {
            score += self.bonuses.personality;
        }

        score
    }

    /// Stable descending sort; equal scores keep catalog order.
    pub fn rank(&self, mut pool: Vec<Product>, context: &RankContext<'_>) -> Vec<Product> {
        pool.sort_by_cached_key(|product| std::cmp::Reverse(self.composite_score(product, context)));
        pool
    }
}

impl Default for ScoreCalculator {
    fn default() -> Self {
        Self::new()
    }
}

/// Budget bounds scaled by the relationship's multiplier.
pub fn effective_budget(
    budget: &BudgetRange,
    relationship: Option<&RelationshipProfile>,
) -> PriceRange {
    let multiplier = relationship.map_or(Decimal::ONE, RelationshipProfile::budget_multiplier);
    PriceRange {
        min: Decimal::from(budget.min) * multiplier,
        max: budget.max.map(|max| Decimal::from(max) * multiplier),
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::assistant::tables;
    use crate::domain::product::{CategoryId, OccasionId, ProductId};

    fn product(id: u32, category: &str, best_seller: bool, special: bool) -> Product {
        Product {
            id: ProductId(id),
            name_en: format!("Gift {id}"),
            name_ar: format!("هدية {id}"),
            price: Decimal::new(120, 0),
            image_url: String::new(),
            category_id: CategoryId::from(category),
            occasion_id: None,
            is_best_seller: best_seller,
            is_special_gift: special,
        }
    }

    #[test]
    fn composite_score_adds_every_matching_bonus() {
        let calculator = ScoreCalculator::new();
        let mut gift = product(1, "flowers", true, true);
        gift.occasion_id = Some(OccasionId::from("birthday"));

        let context = RankContext {
            occasion: Some("birthday"),
            interest_categories: ["flowers"].into_iter().collect(),
            personality_categories: ["flowers"].into_iter().collect(),
        };

        assert_eq!(calculator.composite_score(&gift, &context), 20 + 15 + 30 + 25 + 20);
        assert_eq!(calculator.composite_score(&product(2, "books", false, false), &context), 0);
    }

    #[test]
    fn ranking_is_stable_for_equal_scores() {
        let calculator = ScoreCalculator::new();
        let pool = vec![
            product(1, "books", false, false),
            product(2, "books", true, false),
            product(3, "books", false, false),
            product(4, "books", true, false),
        ];

        let ranked = calculator.rank(pool, &RankContext::default());
        let ids: Vec<u32> = ranked.iter().map(|p| p.id.0).collect();

        assert_eq!(ids, vec![2, 4, 1, 3]);
    }

    #[test]
    fn run_score_saturates_at_caps() {
        let mut score = RunScore::starting_at(90);
        score.add(40, 250);

        assert_eq!(score.confidence(), 95);
        assert_eq!(score.match_score(), 100);
    }

    #[test]
    fn effective_budget_scales_both_bounds() {
        let bucket = tables::budget("100-250").expect("bucket");
        let spouse = tables::relationship("spouse");

        let range = effective_budget(bucket, spouse);
        assert_eq!(range.min, Decimal::new(150, 0));
        assert_eq!(range.max, Some(Decimal::new(375, 0)));

        let neutral = effective_budget(bucket, None);
        assert_eq!(neutral.max, Some(Decimal::new(250, 0)));
    }

    #[test]
    fn occasion_points_follow_weight() {
        let calculator = ScoreCalculator::new();
        assert_eq!(calculator.occasion_match_points(1.2), 30);
        assert_eq!(calculator.occasion_match_points(0.9), 23);
        assert_eq!(calculator.occasion_match_points(f64::NAN), 0);
    }
}
