//! Gift matcher implementation

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use super::scoring::{effective_budget, RankContext, RunScore, ScoreCalculator};
use super::tables::{
    self, InterestProfile, OccasionProfile, FALLBACK_CONFIDENCE, FALLBACK_MATCH_SCORE,
};
use super::types::{PriceRange, QuestionnaireAnswer, SuggestionResult};
use super::{DEFAULT_FALLBACK_SUGGESTIONS, DEFAULT_MAX_SUGGESTIONS};
use crate::catalog::Catalog;
use crate::domain::product::Product;
use crate::locale::Locale;

/// Filters and ranks the catalog against a questionnaire answer.
///
/// Pure: the same answer against the same catalog always yields the same
/// result, and every answer (including an empty one) yields a non-empty
/// result when the catalog has featured products.
#[derive(Debug, Clone)]
pub struct GiftMatcher {
    catalog: Arc<Catalog>,
    calculator: ScoreCalculator,
    max_suggestions: usize,
    fallback_suggestions: usize,
}

/// Labels of the answers that shaped the result, for the rationale text.
#[derive(Debug, Default)]
struct MatchTrail {
    occasion: Option<&'static OccasionProfile>,
    relationship: Option<&'static tables::RelationshipProfile>,
    interests: Vec<&'static InterestProfile>,
    budget: Option<(&'static tables::BudgetRange, PriceRange)>,
    personality: Option<&'static tables::PersonalityProfile>,
}

impl GiftMatcher {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            calculator: ScoreCalculator::new(),
            max_suggestions: DEFAULT_MAX_SUGGESTIONS,
            fallback_suggestions: DEFAULT_FALLBACK_SUGGESTIONS,
        }
    }

    pub fn with_limits(mut self, max_suggestions: usize, fallback_suggestions: usize) -> Self {
        self.max_suggestions = max_suggestions;
        self.fallback_suggestions = fallback_suggestions;
        self
    }

    pub fn with_calculator(mut self, calculator: ScoreCalculator) -> Self {
        self.calculator = calculator;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn recommend(&self, answer: &QuestionnaireAnswer, locale: Locale) -> SuggestionResult {
        let increments = *self.calculator.increments();
        let mut pool: Vec<&Product> = self.catalog.products().iter().collect();
        let mut score = RunScore::starting_at(increments.base_confidence);
        let mut trail = MatchTrail::default();
        let mut unsatisfied = false;

        let occasion = answer.occasion.as_deref().and_then(tables::occasion);
        if let Some(profile) = occasion {
            if narrow(&mut pool, |product| matches_occasion(product, profile)) {
                score.add(
                    increments.occasion_confidence,
                    self.calculator.occasion_match_points(profile.weight),
                );
                trail.occasion = Some(profile);
            } else {
                unsatisfied = true;
            }
        }

        let relationship = answer.relationship.as_deref().and_then(tables::relationship);
        if let Some(profile) = relationship {
            score.add(profile.intimacy, profile.intimacy);
            trail.relationship = Some(profile);
        }

        let interests: Vec<&'static InterestProfile> =
            answer.interests.iter().filter_map(|id| tables::interest(id)).collect();
        let interest_categories: HashSet<&'static str> =
            interests.iter().flat_map(|profile| profile.categories.iter().copied()).collect();
        if !interests.is_empty() {
            narrow(&mut pool, |product| interest_categories.contains(product.category_id.as_str()));
            let selected = u32::try_from(interests.len()).unwrap_or(u32::MAX);
            score.add(
                increments.interest_confidence_each.saturating_mul(selected),
                increments.interest_match_each.saturating_mul(selected),
            );
            trail.interests = interests;
        }

        if let Some(bucket) = answer.budget.as_deref().and_then(tables::budget) {
            let range = effective_budget(bucket, relationship);
            pool.retain(|product| range.contains(product.price));
            score.add(increments.budget_confidence, increments.budget_match);
            trail.budget = Some((bucket, range));
        }

        let personality = answer.personality.as_deref().and_then(tables::personality);
        let personality_categories: HashSet<&'static str> = personality
            .map(|profile| profile.categories.iter().copied().collect())
            .unwrap_or_default();
        if let Some(profile) = personality {
            if narrow(&mut pool, |product| {
                personality_categories.contains(product.category_id.as_str())
            }) {
                score.add(increments.personality_confidence, increments.personality_match);
                trail.personality = Some(profile);
            }
        }

        if answer.age_group.as_deref().and_then(tables::age_group).is_some() {
            score.add(increments.age_confidence, 0);
        }
        if answer.gender.as_deref().and_then(tables::gender).is_some() {
            score.add(increments.gender_confidence, 0);
        }

        if pool.is_empty() || unsatisfied {
            let result = self.fallback(locale);
            info!(
                event_name = "assistant.match.fallback",
                occasion = answer.occasion.as_deref().unwrap_or("none"),
                unsatisfied_occasion = unsatisfied,
                suggestions = result.products.len(),
                "no gifts matched the questionnaire; returning featured gifts"
            );
            return result;
        }

        let context = RankContext {
            occasion: occasion.map(|profile| profile.id),
            interest_categories,
            personality_categories,
        };
        let mut ranked = self.calculator.rank(pool.into_iter().cloned().collect(), &context);
        dedup_by_id(&mut ranked);
        ranked.truncate(self.max_suggestions);

        let result = SuggestionResult {
            rationale: rationale(&trail, ranked.len(), locale),
            products: ranked,
            confidence: score.confidence(),
            match_score: score.match_score(),
            fallback: false,
        };

        info!(
            event_name = "assistant.match.completed",
            occasion = answer.occasion.as_deref().unwrap_or("none"),
            suggestions = result.products.len(),
            confidence = result.confidence,
            match_score = result.match_score,
            "gift questionnaire matched"
        );
        result
    }

    fn fallback(&self, locale: Locale) -> SuggestionResult {
        let mut products: Vec<Product> =
            self.catalog.products().iter().filter(|product| product.is_featured()).cloned().collect();
        dedup_by_id(&mut products);
        products.truncate(self.fallback_suggestions);

        SuggestionResult {
            products,
            confidence: FALLBACK_CONFIDENCE,
            match_score: FALLBACK_MATCH_SCORE,
            rationale: fallback_rationale(locale).to_owned(),
            fallback: true,
        }
    }
}

/// Async front of the matcher with the "analyzing" pacing delay.
#[derive(Debug, Clone)]
pub struct GiftAssistant {
    matcher: GiftMatcher,
    analysis_delay: Duration,
}

impl GiftAssistant {
    pub fn new(matcher: GiftMatcher, analysis_delay: Duration) -> Self {
        Self { matcher, analysis_delay }
    }

    pub fn matcher(&self) -> &GiftMatcher {
        &self.matcher
    }

    pub async fn find_gift(&self, answer: &QuestionnaireAnswer, locale: Locale) -> SuggestionResult {
        if !self.analysis_delay.is_zero() {
            tokio::time::sleep(self.analysis_delay).await;
        }
        self.matcher.recommend(answer, locale)
    }
}

fn matches_occasion(product: &Product, profile: &OccasionProfile) -> bool {
    product.occasion_id.as_ref().is_some_and(|id| id.as_str() == profile.id)
        || profile.categories.contains(&product.category_id.as_str())
}

/// Replaces the pool with the matching subset when there is one.
fn narrow<'a>(pool: &mut Vec<&'a Product>, keep: impl Fn(&Product) -> bool) -> bool {
    let matches: Vec<&'a Product> = pool.iter().copied().filter(|product| keep(*product)).collect();
    if matches.is_empty() {
        return false;
    }
    *pool = matches;
    true
}

fn dedup_by_id(products: &mut Vec<Product>) {
    let mut seen = HashSet::with_capacity(products.len());
    products.retain(|product| seen.insert(product.id));
}

fn rationale(trail: &MatchTrail, count: usize, locale: Locale) -> String {
    let mut parts = vec![match locale {
        Locale::En => format!("Top {count} picks"),
        Locale::Ar => format!("أفضل {count} اختيارات"),
    }];

    let (occasion_key, for_key, interests_key, budget_key, personality_key) = match locale {
        Locale::En => ("occasion", "for", "interests", "budget", "personality"),
        Locale::Ar => ("المناسبة", "لـ", "الاهتمامات", "الميزانية", "الشخصية"),
    };

    if let Some(profile) = trail.occasion {
        parts.push(format!("{occasion_key}: {}", profile.label.get(locale)));
    }
    if let Some(profile) = trail.relationship {
        parts.push(format!("{for_key}: {}", profile.label.get(locale)));
    }
    if !trail.interests.is_empty() {
        let separator = if locale == Locale::Ar { "، " } else { ", " };
        let names: Vec<&str> =
            trail.interests.iter().map(|profile| profile.label.get(locale)).collect();
        parts.push(format!("{interests_key}: {}", names.join(separator)));
    }
    if let Some((_, range)) = trail.budget {
        let bounds = match range.max {
            Some(max) => format!("{} - {}", range.min.normalize(), max.normalize()),
            None => format!("{}+", range.min.normalize()),
        };
        parts.push(format!("{budget_key}: {bounds}"));
    }
    if let Some(profile) = trail.personality {
        parts.push(format!("{personality_key}: {}", profile.label.get(locale)));
    }

    parts.join(" · ")
}

fn fallback_rationale(locale: Locale) -> &'static str {
    match locale {
        Locale::En => {
            "We couldn't find an exact match, so here is the closest we found: our best sellers and special gifts."
        }
        Locale::Ar => {
            "عذراً، لم نجد تطابقاً دقيقاً، إليك أقرب ما وجدناه من الهدايا الأكثر مبيعاً والمميزة."
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use rust_decimal::Decimal;

    use super::{GiftAssistant, GiftMatcher};
    use crate::assistant::scoring::effective_budget;
    use crate::assistant::tables;
    use crate::assistant::types::QuestionnaireAnswer;
    use crate::catalog::Catalog;
    use crate::domain::product::{CategoryId, OccasionId, Product, ProductId};
    use crate::locale::Locale;

    fn gift(id: u32, category: &str, occasion: Option<&str>, price: i64) -> Product {
        Product {
            id: ProductId(id),
            name_en: format!("Gift {id}"),
            name_ar: format!("هدية {id}"),
            price: Decimal::new(price, 0),
            image_url: format!("https://images.pexels.com/photos/{id}/p.jpeg"),
            category_id: CategoryId::from(category),
            occasion_id: occasion.map(OccasionId::from),
            is_best_seller: false,
            is_special_gift: false,
        }
    }

    fn best_seller(mut product: Product) -> Product {
        product.is_best_seller = true;
        product
    }

    fn special(mut product: Product) -> Product {
        product.is_special_gift = true;
        product
    }

    fn matcher(products: Vec<Product>) -> GiftMatcher {
        GiftMatcher::new(Arc::new(Catalog::new(products).expect("fixture catalog")))
    }

    fn ids(products: &[Product]) -> Vec<u32> {
        products.iter().map(|product| product.id.0).collect()
    }

    #[test]
    fn empty_answer_ranks_featured_gifts_first() {
        let matcher = matcher(vec![
            gift(1, "books", None, 50),
            best_seller(gift(2, "books", None, 50)),
            special(gift(3, "books", None, 50)),
        ]);

        let result = matcher.recommend(&QuestionnaireAnswer::default(), Locale::En);

        assert!(!result.fallback);
        assert_eq!(ids(&result.products), vec![2, 3, 1]);
        assert_eq!(result.confidence, 20);
        assert_eq!(result.match_score, 0);
    }

    #[test]
    fn occasion_without_any_catalog_match_falls_back_to_featured_pool() {
        let mut products: Vec<Product> =
            (1..=10).map(|id| best_seller(gift(id, "flowers", Some("birthday"), 100))).collect();
        products.push(gift(11, "flowers", Some("birthday"), 100));
        let matcher = matcher(products);

        // graduation declares watches/electronics/books; none exist here
        let answer = QuestionnaireAnswer::default().with_occasion("graduation");
        let result = matcher.recommend(&answer, Locale::En);

        assert!(result.fallback);
        assert_eq!(result.products.len(), 6);
        assert!(result.products.iter().all(Product::is_featured));
        assert_eq!(result.confidence, 50);
        assert_eq!(result.match_score, 30);
        assert!(result.rationale.contains("closest we found"));
    }

    #[test]
    fn unknown_occasion_is_not_a_constraint() {
        let matcher = matcher(vec![gift(1, "books", None, 50)]);
        let answer = QuestionnaireAnswer::default().with_occasion("moon-landing");

        let result = matcher.recommend(&answer, Locale::En);

        assert!(!result.fallback);
        assert_eq!(ids(&result.products), vec![1]);
    }

    #[test]
    fn fully_specified_answer_surfaces_matching_product_with_best_seller_first() {
        let matcher = matcher(vec![
            gift(1, "cakes", Some("birthday"), 120),
            best_seller(gift(2, "cakes", Some("birthday"), 130)),
            gift(3, "watches", Some("graduation"), 900),
            gift(4, "cakes", Some("birthday"), 2_000),
        ]);
        let answer = QuestionnaireAnswer::default()
            .with_occasion("birthday")
            .with_relationship("sibling")
            .with_interest("sweets")
            .with_budget("100-250")
            .with_age_group("adult")
            .with_gender("female");

        let result = matcher.recommend(&answer, Locale::En);

        assert!(!result.fallback);
        assert_eq!(ids(&result.products), vec![2, 1]);
        assert!(result.rationale.contains("occasion: Birthday"));
        assert!(result.rationale.contains("budget: 100 - 250"));
    }

    #[test]
    fn results_are_capped_at_eight() {
        let products = (1..=20).map(|id| gift(id, "flowers", None, 100)).collect();
        let result = matcher(products).recommend(&QuestionnaireAnswer::default(), Locale::En);

        assert_eq!(result.products.len(), 8);
        assert_eq!(ids(&result.products), (1..=8u32).collect::<Vec<_>>());
    }

    #[test]
    fn budget_filter_is_a_hard_filter_that_can_force_fallback() {
        let matcher = matcher(vec![
            best_seller(gift(1, "jewelry", None, 5_000)),
            gift(2, "jewelry", None, 4_000),
        ]);
        let answer = QuestionnaireAnswer::default().with_budget("under-100");

        let result = matcher.recommend(&answer, Locale::Ar);

        assert!(result.fallback);
        assert_eq!(ids(&result.products), vec![1]);
        assert!(result.rationale.starts_with("عذراً"));
    }

    #[test]
    fn budget_bounds_are_inclusive_after_relationship_scaling() {
        let matcher = matcher(vec![
            gift(1, "flowers", None, 375),
            gift(2, "flowers", None, 376),
            gift(3, "flowers", None, 149),
        ]);
        let answer =
            QuestionnaireAnswer::default().with_relationship("spouse").with_budget("100-250");

        let result = matcher.recommend(&answer, Locale::En);

        assert_eq!(ids(&result.products), vec![1]);
    }

    #[test]
    fn spouse_budget_ceiling_exceeds_colleague_by_multiplier_ratio() {
        let bucket = tables::budget("250-500").expect("bucket");
        let spouse = tables::relationship("spouse").expect("spouse");
        let colleague = tables::relationship("colleague").expect("colleague");

        let spouse_max = effective_budget(bucket, Some(spouse)).max.expect("bounded");
        let colleague_max = effective_budget(bucket, Some(colleague)).max.expect("bounded");

        assert!(spouse_max > colleague_max);
        assert_eq!(
            spouse_max * colleague.budget_multiplier(),
            colleague_max * spouse.budget_multiplier()
        );
    }

    #[test]
    fn interest_filter_is_skipped_when_union_matches_nothing() {
        let matcher = matcher(vec![gift(1, "flowers", None, 100), gift(2, "cakes", None, 100)]);
        let answer = QuestionnaireAnswer::default().with_interest("technology");

        let result = matcher.recommend(&answer, Locale::En);

        assert!(!result.fallback);
        assert_eq!(result.products.len(), 2);
        assert_eq!(result.confidence, 25);
        assert_eq!(result.match_score, 10);
    }

    #[test]
    fn personality_narrows_only_within_current_pool() {
        let matcher = matcher(vec![
            gift(1, "flowers", Some("birthday"), 100),
            gift(2, "perfumes", None, 100),
            gift(3, "cakes", Some("birthday"), 100),
        ]);
        let answer =
            QuestionnaireAnswer::default().with_occasion("birthday").with_personality("romantic");

        let result = matcher.recommend(&answer, Locale::En);

        // perfumes is romantic but was removed by the occasion stage
        assert_eq!(ids(&result.products), vec![1]);
        assert!(result.rationale.contains("personality: Romantic"));
    }

    #[test]
    fn scores_never_exceed_caps_for_maximal_answer() {
        let catalog = Arc::new(Catalog::bundled().expect("bundled catalog"));
        let matcher = GiftMatcher::new(catalog);

        for occasion in tables::OCCASIONS {
            for relationship in tables::RELATIONSHIPS {
                let mut answer = QuestionnaireAnswer::default()
                    .with_occasion(occasion.id)
                    .with_relationship(relationship.id)
                    .with_budget("over-1000")
                    .with_age_group("adult")
                    .with_gender("female")
                    .with_personality("romantic");
                for interest in tables::INTERESTS {
                    answer = answer.with_interest(interest.id);
                }

                let result = matcher.recommend(&answer, Locale::En);
                assert!(result.confidence <= 95);
                assert!(result.match_score <= 100);
                assert!(!result.products.is_empty());
            }
        }
    }

    #[test]
    fn maximal_answer_saturates_confidence() {
        let matcher = matcher(vec![best_seller(gift(1, "flowers", Some("anniversary"), 150))]);
        let mut answer = QuestionnaireAnswer::default()
            .with_occasion("anniversary")
            .with_relationship("spouse")
            .with_budget("100-250")
            .with_age_group("adult")
            .with_gender("male")
            .with_personality("romantic");
        for interest in tables::INTERESTS {
            answer = answer.with_interest(interest.id);
        }

        let result = matcher.recommend(&answer, Locale::En);

        assert!(!result.fallback);
        assert_eq!(result.confidence, 95);
        assert_eq!(result.match_score, 100);
    }

    #[tokio::test]
    async fn assistant_waits_for_analysis_delay() {
        tokio::time::pause();
        let assistant = GiftAssistant::new(
            matcher(vec![best_seller(gift(1, "flowers", None, 100))]),
            Duration::from_millis(1_500),
        );

        let started = tokio::time::Instant::now();
        let result = assistant.find_gift(&QuestionnaireAnswer::default(), Locale::En).await;

        assert!(started.elapsed() >= Duration::from_millis(1_500));
        assert_eq!(ids(&result.products), vec![1]);
    }
}
