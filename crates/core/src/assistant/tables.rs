//! Questionnaire option tables and the hand-tuned scoring constants.
//!
//! Every weight the gift matcher uses lives here so the scoring policy can be
//! tuned and tested without touching control flow.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::locale::Locale;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Label {
    pub en: &'static str,
    pub ar: &'static str,
}

impl Label {
    pub fn get(&self, locale: Locale) -> &'static str {
        match locale {
            Locale::En => self.en,
            Locale::Ar => self.ar,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct OccasionProfile {
    pub id: &'static str,
    pub label: Label,
    pub categories: &'static [&'static str],
    /// Scales the occasion's contribution to the match score.
    pub weight: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct RelationshipProfile {
    pub id: &'static str,
    pub label: Label,
    /// Tenths; 15 means the budget bounds are scaled by 1.5.
    pub budget_multiplier_tenths: i64,
    pub intimacy: u32,
}

impl RelationshipProfile {
    pub fn budget_multiplier(&self) -> Decimal {
        Decimal::new(self.budget_multiplier_tenths, 1)
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct InterestProfile {
    pub id: &'static str,
    pub label: Label,
    pub categories: &'static [&'static str],
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct BudgetRange {
    pub id: &'static str,
    pub label: Label,
    pub min: i64,
    /// `None` for the open-ended top bucket.
    pub max: Option<i64>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct PersonalityProfile {
    pub id: &'static str,
    pub label: Label,
    pub categories: &'static [&'static str],
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SimpleOption {
    pub id: &'static str,
    pub label: Label,
}

/// Point increments added to the run-level confidence and match score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunIncrements {
    pub base_confidence: u32,
    pub occasion_confidence: u32,
    pub occasion_match_factor: f64,
    pub interest_confidence_each: u32,
    pub interest_match_each: u32,
    pub budget_confidence: u32,
    pub budget_match: u32,
    pub personality_confidence: u32,
    pub personality_match: u32,
    pub age_confidence: u32,
    pub gender_confidence: u32,
}

/// Per-product composite score bonuses used for ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankBonuses {
    pub best_seller: u32,
    pub special_gift: u32,
    pub occasion: u32,
    pub interest: u32,
    pub personality: u32,
}

pub const RUN_INCREMENTS: RunIncrements = RunIncrements {
    base_confidence: 20,
    occasion_confidence: 20,
    occasion_match_factor: 25.0,
    interest_confidence_each: 5,
    interest_match_each: 10,
    budget_confidence: 15,
    budget_match: 15,
    personality_confidence: 10,
    personality_match: 15,
    age_confidence: 5,
    gender_confidence: 5,
};

pub const RANK_BONUSES: RankBonuses =
    RankBonuses { best_seller: 20, special_gift: 15, occasion: 30, interest: 25, personality: 20 };

pub const MAX_CONFIDENCE: u32 = 95;
pub const MAX_MATCH_SCORE: u32 = 100;
pub const FALLBACK_CONFIDENCE: u8 = 50;
pub const FALLBACK_MATCH_SCORE: u8 = 30;

pub const OCCASIONS: &[OccasionProfile] = &[
    OccasionProfile {
        id: "birthday",
        label: Label { en: "Birthday", ar: "عيد ميلاد" },
        categories: &["flowers", "cakes", "chocolates", "gift-boxes"],
        weight: 1.0,
    },
    OccasionProfile {
        id: "anniversary",
        label: Label { en: "Anniversary", ar: "ذكرى سنوية" },
        categories: &["flowers", "jewelry", "perfumes", "watches"],
        weight: 1.2,
    },
    OccasionProfile {
        id: "wedding",
        label: Label { en: "Wedding", ar: "زفاف" },
        categories: &["home-decor", "jewelry", "gift-boxes"],
        weight: 1.1,
    },
    OccasionProfile {
        id: "graduation",
        label: Label { en: "Graduation", ar: "تخرج" },
        categories: &["watches", "electronics", "books"],
        weight: 0.9,
    },
    OccasionProfile {
        id: "new-baby",
        label: Label { en: "New Baby", ar: "مولود جديد" },
        categories: &["gift-boxes", "flowers"],
        weight: 0.9,
    },
    OccasionProfile {
        id: "eid",
        label: Label { en: "Eid", ar: "العيد" },
        categories: &["chocolates", "gift-boxes", "perfumes"],
        weight: 1.0,
    },
    OccasionProfile {
        id: "get-well",
        label: Label { en: "Get Well Soon", ar: "سلامتك" },
        categories: &["flowers", "plants", "books"],
        weight: 0.8,
    },
    OccasionProfile {
        id: "thank-you",
        label: Label { en: "Thank You", ar: "شكراً" },
        categories: &["chocolates", "plants", "flowers"],
        weight: 0.8,
    },
];

pub const RELATIONSHIPS: &[RelationshipProfile] = &[
    RelationshipProfile {
        id: "spouse",
        label: Label { en: "Spouse", ar: "الزوج / الزوجة" },
        budget_multiplier_tenths: 15,
        intimacy: 15,
    },
    RelationshipProfile {
        id: "parent",
        label: Label { en: "Parent", ar: "أحد الوالدين" },
        budget_multiplier_tenths: 13,
        intimacy: 12,
    },
    RelationshipProfile {
        id: "child",
        label: Label { en: "Child", ar: "ابن / ابنة" },
        budget_multiplier_tenths: 12,
        intimacy: 12,
    },
    RelationshipProfile {
        id: "sibling",
        label: Label { en: "Sibling", ar: "أخ / أخت" },
        budget_multiplier_tenths: 10,
        intimacy: 10,
    },
    RelationshipProfile {
        id: "friend",
        label: Label { en: "Friend", ar: "صديق" },
        budget_multiplier_tenths: 9,
        intimacy: 8,
    },
    RelationshipProfile {
        id: "colleague",
        label: Label { en: "Colleague", ar: "زميل عمل" },
        budget_multiplier_tenths: 7,
        intimacy: 4,
    },
    RelationshipProfile {
        id: "manager",
        label: Label { en: "Manager", ar: "المدير" },
        budget_multiplier_tenths: 10,
        intimacy: 3,
    },
];

pub const INTERESTS: &[InterestProfile] = &[
    InterestProfile {
        id: "reading",
        label: Label { en: "Reading", ar: "القراءة" },
        categories: &["books"],
    },
    InterestProfile {
        id: "beauty",
        label: Label { en: "Beauty", ar: "الجمال" },
        categories: &["cosmetics", "perfumes"],
    },
    InterestProfile {
        id: "sweets",
        label: Label { en: "Sweets", ar: "الحلويات" },
        categories: &["chocolates", "cakes"],
    },
    InterestProfile {
        id: "fashion",
        label: Label { en: "Fashion", ar: "الموضة" },
        categories: &["jewelry", "watches"],
    },
    InterestProfile {
        id: "home",
        label: Label { en: "Home & Living", ar: "المنزل" },
        categories: &["home-decor", "plants"],
    },
    InterestProfile {
        id: "technology",
        label: Label { en: "Technology", ar: "التقنية" },
        categories: &["electronics"],
    },
    InterestProfile {
        id: "nature",
        label: Label { en: "Nature", ar: "الطبيعة" },
        categories: &["plants", "flowers"],
    },
];

pub const BUDGETS: &[BudgetRange] = &[
    BudgetRange {
        id: "under-100",
        label: Label { en: "Under 100", ar: "أقل من 100" },
        min: 0,
        max: Some(100),
    },
    BudgetRange {
        id: "100-250",
        label: Label { en: "100 - 250", ar: "100 - 250" },
        min: 100,
        max: Some(250),
    },
    BudgetRange {
        id: "250-500",
        label: Label { en: "250 - 500", ar: "250 - 500" },
        min: 250,
        max: Some(500),
    },
    BudgetRange {
        id: "500-1000",
        label: Label { en: "500 - 1000", ar: "500 - 1000" },
        min: 500,
        max: Some(1000),
    },
    BudgetRange {
        id: "over-1000",
        label: Label { en: "Over 1000", ar: "أكثر من 1000" },
        min: 1000,
        max: None,
    },
];

pub const AGE_GROUPS: &[SimpleOption] = &[
    SimpleOption { id: "child", label: Label { en: "Child", ar: "طفل" } },
    SimpleOption { id: "teen", label: Label { en: "Teen", ar: "مراهق" } },
    SimpleOption { id: "young-adult", label: Label { en: "Young adult", ar: "شاب" } },
    SimpleOption { id: "adult", label: Label { en: "Adult", ar: "بالغ" } },
    SimpleOption { id: "senior", label: Label { en: "Senior", ar: "كبير السن" } },
];

pub const GENDERS: &[SimpleOption] = &[
    SimpleOption { id: "female", label: Label { en: "Female", ar: "أنثى" } },
    SimpleOption { id: "male", label: Label { en: "Male", ar: "ذكر" } },
    SimpleOption { id: "unspecified", label: Label { en: "Prefer not to say", ar: "أفضل عدم الذكر" } },
];

pub const PERSONALITIES: &[PersonalityProfile] = &[
    PersonalityProfile {
        id: "romantic",
        label: Label { en: "Romantic", ar: "رومانسي" },
        categories: &["flowers", "perfumes", "jewelry"],
    },
    PersonalityProfile {
        id: "practical",
        label: Label { en: "Practical", ar: "عملي" },
        categories: &["electronics", "home-decor", "watches"],
    },
    PersonalityProfile {
        id: "creative",
        label: Label { en: "Creative", ar: "مبدع" },
        categories: &["books", "home-decor"],
    },
    PersonalityProfile {
        id: "classic",
        label: Label { en: "Classic", ar: "كلاسيكي" },
        categories: &["watches", "chocolates"],
    },
    PersonalityProfile {
        id: "elegant",
        label: Label { en: "Elegant", ar: "أنيق" },
        categories: &["jewelry", "perfumes", "cosmetics"],
    },
    PersonalityProfile {
        id: "adventurous",
        label: Label { en: "Adventurous", ar: "مغامر" },
        categories: &["electronics", "gift-boxes"],
    },
];

pub fn occasion(id: &str) -> Option<&'static OccasionProfile> {
    OCCASIONS.iter().find(|profile| profile.id == id)
}

pub fn relationship(id: &str) -> Option<&'static RelationshipProfile> {
    RELATIONSHIPS.iter().find(|profile| profile.id == id)
}

pub fn interest(id: &str) -> Option<&'static InterestProfile> {
    INTERESTS.iter().find(|profile| profile.id == id)
}

pub fn budget(id: &str) -> Option<&'static BudgetRange> {
    BUDGETS.iter().find(|range| range.id == id)
}

pub fn personality(id: &str) -> Option<&'static PersonalityProfile> {
    PERSONALITIES.iter().find(|profile| profile.id == id)
}

pub fn age_group(id: &str) -> Option<&'static SimpleOption> {
    AGE_GROUPS.iter().find(|option| option.id == id)
}

pub fn gender(id: &str) -> Option<&'static SimpleOption> {
    GENDERS.iter().find(|option| option.id == id)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn table_ids_are_unique() {
        fn assert_unique(ids: Vec<&str>) {
            let mut sorted = ids.clone();
            sorted.sort_unstable();
            sorted.dedup();
            assert_eq!(sorted.len(), ids.len(), "duplicate id in {ids:?}");
        }

        assert_unique(OCCASIONS.iter().map(|p| p.id).collect());
        assert_unique(RELATIONSHIPS.iter().map(|p| p.id).collect());
        assert_unique(INTERESTS.iter().map(|p| p.id).collect());
        assert_unique(BUDGETS.iter().map(|p| p.id).collect());
        assert_unique(PERSONALITIES.iter().map(|p| p.id).collect());
        assert_unique(AGE_GROUPS.iter().map(|p| p.id).collect());
        assert_unique(GENDERS.iter().map(|p| p.id).collect());
    }

    #[test]
    fn budget_buckets_are_ordered_and_contiguous() {
        for pair in BUDGETS.windows(2) {
            assert_eq!(pair[0].max, Some(pair[1].min));
        }
        assert!(BUDGETS.last().is_some_and(|range| range.max.is_none()));
    }

    #[test]
    fn spouse_multiplier_exceeds_colleague() {
        let spouse = relationship("spouse").expect("spouse profile");
        let colleague = relationship("colleague").expect("colleague profile");

        assert_eq!(spouse.budget_multiplier(), Decimal::new(15, 1));
        assert!(spouse.budget_multiplier() > colleague.budget_multiplier());
        assert!(spouse.intimacy > colleague.intimacy);
    }

    #[test]
    fn labels_resolve_per_locale() {
        let birthday = occasion("birthday").expect("birthday profile");
        assert_eq!(birthday.label.get(Locale::En), "Birthday");
        assert_eq!(birthday.label.get(Locale::Ar), "عيد ميلاد");
        assert!(occasion("unknown").is_none());
    }
}
