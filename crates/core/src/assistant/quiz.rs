//! Four-step questionnaire that gates a gift run

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::QuestionnaireAnswer;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizStep {
    Recipient,
    Interests,
    Budget,
    Profile,
}

impl QuizStep {
    pub const ALL: [QuizStep; 4] =
        [QuizStep::Recipient, QuizStep::Interests, QuizStep::Budget, QuizStep::Profile];

    pub fn number(self) -> usize {
        match self {
            Self::Recipient => 1,
            Self::Interests => 2,
            Self::Budget => 3,
            Self::Profile => 4,
        }
    }

    pub fn next(self) -> Option<Self> {
        match self {
            Self::Recipient => Some(Self::Interests),
            Self::Interests => Some(Self::Budget),
            Self::Budget => Some(Self::Profile),
            Self::Profile => None,
        }
    }

    pub fn previous(self) -> Option<Self> {
        match self {
            Self::Recipient => None,
            Self::Interests => Some(Self::Recipient),
            Self::Budget => Some(Self::Interests),
            Self::Profile => Some(Self::Budget),
        }
    }

    /// Required fields of this step that `answer` leaves empty.
    pub fn missing_fields(self, answer: &QuestionnaireAnswer) -> Vec<&'static str> {
        let mut missing = Vec::new();
        let mut require = |present: bool, field: &'static str| {
            if !present {
                missing.push(field);
            }
        };

        match self {
            Self::Recipient => {
                require(is_set(&answer.occasion), "occasion");
                require(is_set(&answer.relationship), "relationship");
            }
            Self::Interests => require(!answer.interests.is_empty(), "interests"),
            Self::Budget => {
                require(is_set(&answer.budget), "budget");
                require(is_set(&answer.age_group), "age_group");
            }
            Self::Profile => {
                require(is_set(&answer.gender), "gender");
                require(is_set(&answer.personality), "personality");
            }
        }

        missing
    }
}

fn is_set(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|value| !value.trim().is_empty())
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum QuizError {
    #[error("step {step:?} is incomplete; missing {missing:?}")]
    Incomplete { step: QuizStep, missing: Vec<&'static str> },
    #[error("already on the final step")]
    AlreadyFinal,
    #[error("answers can only be submitted from the final step (currently {0:?})")]
    NotFinalStep(QuizStep),
}

/// Step-by-step questionnaire state for one visitor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuizSession {
    step: QuizStep,
    answer: QuestionnaireAnswer,
}

impl Default for QuizSession {
    fn default() -> Self {
        Self::new()
    }
}

impl QuizSession {
    pub fn new() -> Self {
        Self { step: QuizStep::Recipient, answer: QuestionnaireAnswer::default() }
    }

    pub fn step(&self) -> QuizStep {
        self.step
    }

    pub fn answer(&self) -> &QuestionnaireAnswer {
        &self.answer
    }

    pub fn answer_mut(&mut self) -> &mut QuestionnaireAnswer {
        &mut self.answer
    }

    pub fn missing_fields(&self) -> Vec<&'static str> {
        self.step.missing_fields(&self.answer)
    }

    pub fn can_advance(&self) -> bool {
        self.step.next().is_some() && self.missing_fields().is_empty()
    }

    pub fn advance(&mut self) -> Result<QuizStep, QuizError> {
        let next = self.step.next().ok_or(QuizError::AlreadyFinal)?;
        self.ensure_complete(self.step)?;
        self.step = next;
        Ok(next)
    }

    pub fn back(&mut self) -> QuizStep {
        if let Some(previous) = self.step.previous() {
            self.step = previous;
        }
        self.step
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Hands out the completed answer and restarts the session.
    pub fn submit(&mut self) -> Result<QuestionnaireAnswer, QuizError> {
        if self.step.next().is_some() {
            return Err(QuizError::NotFinalStep(self.step));
        }
        for step in QuizStep::ALL {
            self.ensure_complete(step)?;
        }

        let answer = std::mem::take(&mut self.answer);
        self.step = QuizStep::Recipient;
        Ok(answer)
    }

    fn ensure_complete(&self, step: QuizStep) -> Result<(), QuizError> {
        let missing = step.missing_fields(&self.answer);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(QuizError::Incomplete { step, missing })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{QuizError, QuizSession, QuizStep};

    fn fill_recipient(session: &mut QuizSession) {
        let answer = session.answer_mut();
        answer.occasion = Some("birthday".to_string());
        answer.relationship = Some("friend".to_string());
    }

    #[test]
    fn cannot_advance_past_incomplete_step() {
        let mut session = QuizSession::new();
        session.answer_mut().occasion = Some("birthday".to_string());

        assert!(!session.can_advance());
        assert_eq!(
            session.advance(),
            Err(QuizError::Incomplete { step: QuizStep::Recipient, missing: vec!["relationship"] })
        );
        assert_eq!(session.step(), QuizStep::Recipient);
    }

    #[test]
    fn blank_values_count_as_missing() {
        let mut session = QuizSession::new();
        session.answer_mut().occasion = Some("   ".to_string());
        session.answer_mut().relationship = Some("friend".to_string());

        assert_eq!(session.missing_fields(), vec!["occasion"]);
    }

    #[test]
    fn walks_all_steps_and_submits_then_resets() {
        let mut session = QuizSession::new();
        fill_recipient(&mut session);
        assert_eq!(session.advance(), Ok(QuizStep::Interests));

        session.answer_mut().toggle_interest("sweets");
        assert_eq!(session.advance(), Ok(QuizStep::Budget));

        session.answer_mut().budget = Some("100-250".to_string());
        session.answer_mut().age_group = Some("adult".to_string());
        assert_eq!(session.advance(), Ok(QuizStep::Profile));

        assert!(matches!(session.submit(), Err(QuizError::Incomplete { step: QuizStep::Profile, .. })));

        session.answer_mut().gender = Some("female".to_string());
        session.answer_mut().personality = Some("romantic".to_string());
        assert_eq!(session.advance(), Err(QuizError::AlreadyFinal));

        let answer = session.submit().expect("complete answer should submit");
        assert_eq!(answer.occasion.as_deref(), Some("birthday"));
        assert_eq!(answer.interests, vec!["sweets".to_string()]);

        assert_eq!(session, QuizSession::new());
    }

    #[test]
    fn submit_requires_final_step() {
        let mut session = QuizSession::new();
        fill_recipient(&mut session);

        assert_eq!(session.submit(), Err(QuizError::NotFinalStep(QuizStep::Recipient)));
    }

    #[test]
    fn back_stops_at_first_step_and_keeps_answers() {
        let mut session = QuizSession::new();
        fill_recipient(&mut session);
        session.advance().expect("recipient step is complete");

        assert_eq!(session.back(), QuizStep::Recipient);
        assert_eq!(session.back(), QuizStep::Recipient);
        assert_eq!(session.answer().relationship.as_deref(), Some("friend"));

        session.reset();
        assert!(session.answer().occasion.is_none());
    }
}
