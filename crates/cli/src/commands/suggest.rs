use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use serde::Serialize;
use tuhfa_core::assistant::{
    GiftAssistant, GiftMatcher, QuestionnaireAnswer, QuizError, QuizSession,
};
use tuhfa_core::{Locale, SuggestionResult};

use super::{load_runtime, CommandResult};

const COMMAND: &str = "suggest";

#[derive(Debug, Default, Args)]
pub struct SuggestArgs {
    #[arg(long, help = "Occasion id, e.g. birthday, eid or anniversary")]
    pub occasion: Option<String>,
    #[arg(long, help = "Relationship id, e.g. spouse, parent or friend")]
    pub relationship: Option<String>,
    #[arg(long = "interest", help = "Interest id; repeat the flag for several")]
    pub interests: Vec<String>,
    #[arg(long, help = "Budget range id, e.g. 100-250")]
    pub budget: Option<String>,
    #[arg(long = "age", help = "Age group id")]
    pub age_group: Option<String>,
    #[arg(long)]
    pub gender: Option<String>,
    #[arg(long)]
    pub personality: Option<String>,
    #[arg(long, help = "Output locale (en|ar), defaults to en")]
    pub locale: Option<String>,
    #[arg(long, help = "Reject answers that would not pass every questionnaire step")]
    pub complete: bool,
    #[arg(long, help = "Wait out the configured analysis delay before scoring")]
    pub pace: bool,
    #[arg(long, help = "Emit machine-readable JSON output")]
    pub json: bool,
}

impl SuggestArgs {
    fn answer(&self) -> QuestionnaireAnswer {
        QuestionnaireAnswer {
            occasion: self.occasion.clone(),
            relationship: self.relationship.clone(),
            interests: self.interests.clone(),
            budget: self.budget.clone(),
            age_group: self.age_group.clone(),
            gender: self.gender.clone(),
            personality: self.personality.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct SuggestionView {
    locale: Locale,
    fallback: bool,
    confidence: u8,
    match_score: u8,
    rationale: String,
    gifts: Vec<GiftLine>,
}

#[derive(Debug, Serialize)]
struct GiftLine {
    id: u32,
    name: String,
    price: String,
    category: String,
}

pub fn run(args: &SuggestArgs) -> CommandResult {
    let locale = match args.locale.as_deref().map(str::parse::<Locale>).transpose() {
        Ok(locale) => locale.unwrap_or_default(),
        Err(error) => return CommandResult::failure(COMMAND, "invalid_input", error.to_string(), 2),
    };

    let mut answer = args.answer();
    if args.complete {
        answer = match walk_questionnaire(answer) {
            Ok(answer) => answer,
            Err(result) => return result,
        };
    }

    let (config, catalog) = match load_runtime(COMMAND) {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let matcher = GiftMatcher::new(Arc::new(catalog))
        .with_limits(config.assistant.max_suggestions, config.assistant.fallback_suggestions);

    let result = if args.pace {
        let assistant =
            GiftAssistant::new(matcher, Duration::from_millis(config.assistant.analysis_delay_ms));
        let runtime = match tokio::runtime::Builder::new_current_thread().enable_time().build() {
            Ok(runtime) => runtime,
            Err(error) => {
                return CommandResult::failure(
                    COMMAND,
                    "runtime",
                    format!("failed to initialize async runtime: {error}"),
                    1,
                )
            }
        };
        runtime.block_on(assistant.find_gift(&answer, locale))
    } else {
        matcher.recommend(&answer, locale)
    };

    let view = to_view(&result, locale);
    if args.json {
        return CommandResult::data(COMMAND, &view);
    }
    CommandResult { exit_code: 0, output: render_human(&view) }
}

/// Feeds the answer through the four gated steps, failing on the first gap.
fn walk_questionnaire(answer: QuestionnaireAnswer) -> Result<QuestionnaireAnswer, CommandResult> {
    let mut session = QuizSession::new();
    *session.answer_mut() = answer;

    let incomplete = |error: QuizError| {
        CommandResult::failure(COMMAND, "incomplete_answer", error.to_string(), 2)
    };
    while session.step().next().is_some() {
        session.advance().map_err(incomplete)?;
    }
    session.submit().map_err(incomplete)
}

fn to_view(result: &SuggestionResult, locale: Locale) -> SuggestionView {
    SuggestionView {
        locale,
        fallback: result.fallback,
        confidence: result.confidence,
        match_score: result.match_score,
        rationale: result.rationale.clone(),
        gifts: result
            .products
            .iter()
            .map(|product| GiftLine {
                id: product.id.0,
                name: product.name(locale).to_string(),
                price: product.price.normalize().to_string(),
                category: product.category_id.as_str().to_string(),
            })
            .collect(),
    }
}

fn render_human(view: &SuggestionView) -> String {
    let heading = if view.fallback {
        "no exact match; closest featured gifts:".to_string()
    } else {
        format!("confidence {}% / match {}%", view.confidence, view.match_score)
    };

    let mut lines = vec![heading, view.rationale.clone()];
    for gift in &view.gifts {
        lines.push(format!("- #{} {} ({}, {})", gift.id, gift.name, gift.price, gift.category));
    }
    lines.join("\n")
}
