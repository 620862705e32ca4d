//! Interview state machine.
//!
//! `transition` is pure: it takes the current `SessionState` and one event and
//! returns the next state plus the side effects the driver must carry out.
//! Nothing here talks to the model or to storage.
//!
//! Phases: `NotStarted → AwaitingFirstQuestion → AwaitingAnswer (×5) → Complete`.

use thiserror::Error;

use crate::interview::prompts::build_system_prompt;
use crate::interview::session::{Phase, SessionState, MAX_QUESTIONS};
use crate::models::candidate::CandidateProfile;
use crate::models::transcript::Message;

/// Answers that end the interview early (compared trimmed and lowercased).
pub const EXIT_KEYWORDS: &[&str] = &["exit", "quit", "bye", "end"];

pub const FAREWELL_MESSAGE: &str = "Thank you for your time! We will be in touch soon.";

pub const CLOSING_MESSAGE: &str = "Thank you for completing the interview! \
    We appreciate your thoughtful responses. Please wait to hear from us soon.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    ProfileSubmitted(CandidateProfile),
    /// Re-entry with no new input.
    Refresh,
    AnswerReceived(String),
    QuestionGenerated(String),
}

impl Event {
    /// Events whose resulting state is committed even if a later step of the
    /// same invocation fails.
    pub fn is_checkpoint(&self) -> bool {
        matches!(self, Event::ProfileSubmitted(_) | Event::QuestionGenerated(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Ask the model for the next question using the current transcript.
    RequestQuestion,
    Display(Message),
    /// Persist the finished transcript.
    Export,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: SessionState,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn unchanged(state: &SessionState) -> Self {
        Self {
            state: state.clone(),
            effects: vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("The interview has not started yet; submit your details first")]
    NotStarted,

    #[error("The interview has already started")]
    AlreadyStarted,

    #[error("The interview has ended")]
    Ended,

    #[error("All interview questions have already been asked")]
    QuestionLimitReached,
}

pub fn is_exit_keyword(answer: &str) -> bool {
    let normalized = answer.trim().to_lowercase();
    EXIT_KEYWORDS.contains(&normalized.as_str())
}

pub fn transition(state: &SessionState, event: Event) -> Result<Transition, TransitionError> {
    match (state.phase(), event) {
        (Phase::NotStarted, Event::ProfileSubmitted(profile)) => {
            let next = SessionState {
                transcript: vec![Message::system(build_system_prompt(&profile))],
                started: true,
                ..SessionState::default()
            };
            Ok(Transition {
                state: next,
                effects: vec![Effect::RequestQuestion],
            })
        }
        (_, Event::ProfileSubmitted(_)) => Err(TransitionError::AlreadyStarted),

        (Phase::NotStarted, Event::Refresh) => Ok(Transition::unchanged(state)),
        (Phase::NotStarted, _) => Err(TransitionError::NotStarted),

        (Phase::Complete, Event::Refresh) => Ok(Transition::unchanged(state)),
        (Phase::Complete, _) => Err(TransitionError::Ended),

        (_, Event::QuestionGenerated(question)) => {
            if state.question_count >= MAX_QUESTIONS {
                return Err(TransitionError::QuestionLimitReached);
            }
            let message = Message::assistant(question);
            let mut next = state.clone();
            next.transcript.push(message.clone());
            next.question_count += 1;
            Ok(Transition {
                state: next,
                effects: vec![Effect::Display(message)],
            })
        }

        // Zero-count generation fires on every re-entry until a question exists.
        // An answer typed before the first question is dropped.
        (Phase::AwaitingFirstQuestion, _) => Ok(Transition {
            state: state.clone(),
            effects: vec![Effect::RequestQuestion],
        }),

        (Phase::AwaitingAnswer, _) if state.question_count >= MAX_QUESTIONS => {
            Ok(finish(state, CLOSING_MESSAGE))
        }
        (Phase::AwaitingAnswer, Event::Refresh) => Ok(Transition::unchanged(state)),
        (Phase::AwaitingAnswer, Event::AnswerReceived(answer)) => {
            if answer.trim().is_empty() {
                return Ok(Transition::unchanged(state));
            }
            let exiting = is_exit_keyword(&answer);
            let mut next = state.clone();
            next.transcript.push(Message::user(answer));
            if exiting {
                return Ok(finish(&next, FAREWELL_MESSAGE));
            }
            Ok(Transition {
                state: next,
                effects: vec![Effect::RequestQuestion],
            })
        }
    }
}

fn finish(state: &SessionState, closing: &str) -> Transition {
    let message = Message::assistant(closing);
    let mut next = state.clone();
    next.transcript.push(message.clone());
    next.ended = true;
    Transition {
        state: next,
        effects: vec![Effect::Display(message), Effect::Export],
    }
}
