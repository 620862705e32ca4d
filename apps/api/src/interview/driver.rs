//! Question/answer driver: runs the state machine's effects against the model
//! and storage collaborators.
//!
//! One public call handles exactly one input event. Working state is copied out
//! of the session and written back at checkpoints (profile accepted, question
//! generated) and when the invocation finishes. A failed model call therefore
//! leaves the session at its last checkpoint: the question count is unchanged
//! and a pending answer is not recorded.
//!
//! HTTP handlers go through `run_detached`, which moves the locked turn onto
//! its own task. A dropped request then cannot stop a turn halfway, in
//! particular between marking the interview complete and uploading it.

use std::collections::VecDeque;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinError;
use tracing::{debug, info, warn};

use crate::interview::export::TranscriptExporter;
use crate::interview::machine::{transition, Effect, Event, Transition, TransitionError};
use crate::interview::profile::{self, ProfileForm, ValidationError};
use crate::interview::session::{ExportStatus, InterviewSession, Phase};
use crate::llm_client::{ChatModel, LlmError};
use crate::models::transcript::Message;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("Failed to generate a question: {0}")]
    ModelCall(#[from] LlmError),

    #[error("Interview turn aborted: {0}")]
    Aborted(#[from] JoinError),
}

/// One candidate input, as delivered by the HTTP surface.
#[derive(Debug, Clone)]
pub enum Turn {
    Profile(ProfileForm),
    Answer(String),
    Refresh,
}

/// What one invocation produced for the candidate.
#[derive(Debug, Clone, Serialize)]
pub struct TurnReport {
    pub phase: Phase,
    pub question_count: u32,
    /// Messages to show, in order.
    pub displayed: Vec<Message>,
    /// Present only on the invocation that completed the interview.
    pub export: Option<ExportStatus>,
}

#[derive(Clone)]
pub struct InterviewDriver {
    model: Arc<dyn ChatModel>,
    exporter: TranscriptExporter,
}

impl InterviewDriver {
    pub fn new(model: Arc<dyn ChatModel>, exporter: TranscriptExporter) -> Self {
        Self { model, exporter }
    }

    /// Validates the intake form, seeds the transcript and asks the first question.
    /// A rejected form leaves the session untouched.
    pub async fn submit_profile(
        &self,
        session: &mut InterviewSession,
        form: ProfileForm,
    ) -> Result<TurnReport, DriverError> {
        let candidate = profile::submit(form)?;
        info!(
            "Session {}: profile submitted for {}",
            session.id, candidate.full_name
        );
        self.run(session, Event::ProfileSubmitted(candidate)).await
    }

    pub async fn submit_answer(
        &self,
        session: &mut InterviewSession,
        answer: String,
    ) -> Result<TurnReport, DriverError> {
        self.run(session, Event::AnswerReceived(answer)).await
    }

    /// Re-entry with no new input.
    pub async fn refresh(&self, session: &mut InterviewSession) -> Result<TurnReport, DriverError> {
        self.run(session, Event::Refresh).await
    }

    pub async fn handle(
        &self,
        session: &mut InterviewSession,
        turn: Turn,
    ) -> Result<TurnReport, DriverError> {
        match turn {
            Turn::Profile(form) => self.submit_profile(session, form).await,
            Turn::Answer(answer) => self.submit_answer(session, answer).await,
            Turn::Refresh => self.refresh(session).await,
        }
    }

    /// Locks the session and runs one turn on a spawned task, then waits for it.
    /// Dropping the returned future detaches the task; the turn, including any
    /// export, still runs to completion and is recorded on the session.
    pub async fn run_detached(
        self,
        handle: Arc<Mutex<InterviewSession>>,
        turn: Turn,
    ) -> Result<TurnReport, DriverError> {
        let task = tokio::spawn(async move {
            let mut session = handle.lock_owned().await;
            self.handle(&mut session, turn).await
        });
        task.await?
    }

    async fn run(
        &self,
        session: &mut InterviewSession,
        event: Event,
    ) -> Result<TurnReport, DriverError> {
        let mut working = session.state.clone();
        let mut displayed = Vec::new();
        let mut export_requested = false;
        let mut pending = VecDeque::from([event]);

        while let Some(event) = pending.pop_front() {
            let checkpoint = event.is_checkpoint();
            let submitted = match &event {
                Event::ProfileSubmitted(candidate) => Some(candidate.clone()),
                _ => None,
            };

            let Transition { state, effects } = transition(&working, event)?;
            working = state;
            if submitted.is_some() {
                session.profile = submitted;
                session.export = None;
            }
            if checkpoint {
                session.state = working.clone();
            }

            for effect in effects {
                match effect {
                    Effect::Display(message) => displayed.push(message),
                    Effect::Export => export_requested = true,
                    Effect::RequestQuestion => {
                        debug!(
                            "Session {}: requesting question {} ({} messages)",
                            session.id,
                            working.question_count + 1,
                            working.transcript.len()
                        );
                        let question = self
                            .model
                            .complete(&working.transcript)
                            .await
                            .map_err(|e| {
                                warn!("Session {}: question generation failed: {e}", session.id);
                                e
                            })?;
                        pending.push_back(Event::QuestionGenerated(question));
                    }
                }
            }
        }

        session.state = working;

        let export = if export_requested {
            let status = self.export(session).await;
            session.export = Some(status.clone());
            Some(status)
        } else {
            None
        };

        Ok(TurnReport {
            phase: session.state.phase(),
            question_count: session.state.question_count,
            displayed,
            export,
        })
    }

    async fn export(&self, session: &InterviewSession) -> ExportStatus {
        let Some(candidate) = &session.profile else {
            warn!("Session {}: completed without a profile; nothing to export", session.id);
            return ExportStatus::Failed {
                error: "no candidate profile on session".to_string(),
            };
        };

        match self
            .exporter
            .export(candidate, &session.state.transcript)
            .await
        {
            Ok(locator) => {
                info!("Session {}: interview exported to {locator}", session.id);
                ExportStatus::Stored {
                    locator: locator.0,
                }
            }
            Err(e) => {
                warn!("Session {}: export failed: {e}", session.id);
                ExportStatus::Failed {
                    error: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use uuid::Uuid;

    use super::*;
    use crate::interview::export::tests::MemoryStore;
    use crate::interview::export::DEFAULT_EXPORT_PREFIX;
    use crate::interview::machine::{CLOSING_MESSAGE, FAREWELL_MESSAGE};
    use crate::interview::profile::tests::complete_form;
    use crate::interview::session::MAX_QUESTIONS;
    use crate::models::transcript::Role;
    use crate::storage::{BlobStore, StorageError};

    /// Numbers its questions; can be switched into failure mode.
    #[derive(Default)]
    pub(crate) struct ScriptedModel {
        pub calls: std::sync::Mutex<u32>,
        pub failing: std::sync::Mutex<bool>,
    }

    impl ScriptedModel {
        pub(crate) fn set_failing(&self, failing: bool) {
            *self.failing.lock().unwrap() = failing;
        }

        pub(crate) fn call_count(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn complete(&self, transcript: &[Message]) -> Result<String, LlmError> {
            assert_eq!(transcript[0].role, Role::System);
            if *self.failing.lock().unwrap() {
                return Err(LlmError::Api {
                    status: 503,
                    message: "model overloaded".to_string(),
                });
            }
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            Ok(format!("Question {}", *calls))
        }
    }

    fn driver(model: Arc<ScriptedModel>, store: Arc<MemoryStore>) -> InterviewDriver {
        let exporter = TranscriptExporter::new(
            store,
            "interview-logs".to_string(),
            DEFAULT_EXPORT_PREFIX.to_string(),
        );
        InterviewDriver::new(model, exporter)
    }

    fn session() -> InterviewSession {
        InterviewSession::new(Uuid::new_v4())
    }

    #[tokio::test]
    async fn test_submit_profile_asks_first_question() {
        let model = Arc::new(ScriptedModel::default());
        let driver = driver(model.clone(), Arc::new(MemoryStore::default()));
        let mut session = session();

        let report = driver.submit_profile(&mut session, complete_form()).await.unwrap();

        assert_eq!(report.phase, Phase::AwaitingAnswer);
        assert_eq!(report.question_count, 1);
        assert_eq!(report.displayed, vec![Message::assistant("Question 1")]);
        assert!(session.state.started);
        assert_eq!(session.state.transcript.len(), 2);
        assert_eq!(session.state.transcript[0].role, Role::System);
        assert_eq!(session.profile.as_ref().unwrap().full_name, "Alice Smith");
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn test_scenario_a_five_questions_then_closing() {
        let model = Arc::new(ScriptedModel::default());
        let store = Arc::new(MemoryStore::default());
        let driver = driver(model.clone(), store.clone());
        let mut session = session();

        driver.submit_profile(&mut session, complete_form()).await.unwrap();
        let mut last = None;
        for i in 1..=5 {
            let report = driver
                .submit_answer(&mut session, format!("answer {i}"))
                .await
                .unwrap();
            assert!(report.question_count <= MAX_QUESTIONS);
            last = Some(report);
        }

        let last = last.unwrap();
        assert_eq!(last.phase, Phase::Complete);
        assert_eq!(last.displayed, vec![Message::assistant(CLOSING_MESSAGE)]);
        assert!(matches!(last.export, Some(ExportStatus::Stored { .. })));
        assert_eq!(session.state.question_count, 5);
        assert_eq!(session.state.transcript.len(), 11);
        assert!(session.state.ended);
        assert_eq!(model.call_count(), 5);
        assert_eq!(store.upload_count(), 1);
    }

    #[tokio::test]
    async fn test_scenario_b_exit_after_first_question() {
        let model = Arc::new(ScriptedModel::default());
        let store = Arc::new(MemoryStore::default());
        let driver = driver(model.clone(), store.clone());
        let mut session = session();

        driver.submit_profile(&mut session, complete_form()).await.unwrap();
        let report = driver
            .submit_answer(&mut session, "  EXIT ".to_string())
            .await
            .unwrap();

        assert_eq!(report.phase, Phase::Complete);
        assert_eq!(report.displayed, vec![Message::assistant(FAREWELL_MESSAGE)]);
        assert_eq!(session.state.question_count, 1);
        let roles: Vec<Role> = session.state.transcript.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::Assistant, Role::User, Role::Assistant]
        );
        assert_eq!(model.call_count(), 1);
        assert_eq!(store.upload_count(), 1);
    }

    #[tokio::test]
    async fn test_scenario_c_missing_email_leaves_session_untouched() {
        let driver = driver(
            Arc::new(ScriptedModel::default()),
            Arc::new(MemoryStore::default()),
        );
        let mut session = session();
        let form = ProfileForm {
            email: None,
            ..complete_form()
        };

        let err = driver.submit_profile(&mut session, form).await.unwrap_err();

        assert!(matches!(
            err,
            DriverError::Validation(ValidationError::MissingField("email"))
        ));
        assert!(!session.state.started);
        assert!(session.state.transcript.is_empty());
        assert!(session.profile.is_none());
    }

    #[tokio::test]
    async fn test_scenario_d_first_question_failure_stalls() {
        let model = Arc::new(ScriptedModel::default());
        model.set_failing(true);
        let driver = driver(model.clone(), Arc::new(MemoryStore::default()));
        let mut session = session();

        let err = driver
            .submit_profile(&mut session, complete_form())
            .await
            .unwrap_err();

        assert!(matches!(err, DriverError::ModelCall(_)));
        assert!(err.to_string().contains("model overloaded"));
        assert_eq!(session.state.phase(), Phase::AwaitingFirstQuestion);
        assert_eq!(session.state.question_count, 0);
        assert_eq!(session.state.transcript.len(), 1);

        // Re-entry retries the zero-count generation.
        model.set_failing(false);
        let report = driver.refresh(&mut session).await.unwrap();
        assert_eq!(report.question_count, 1);
        assert_eq!(session.state.transcript.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_follow_up_does_not_record_answer() {
        let model = Arc::new(ScriptedModel::default());
        let driver = driver(model.clone(), Arc::new(MemoryStore::default()));
        let mut session = session();
        driver.submit_profile(&mut session, complete_form()).await.unwrap();
        let before = session.state.clone();

        model.set_failing(true);
        let err = driver
            .submit_answer(&mut session, "ownership".to_string())
            .await
            .unwrap_err();

        assert!(matches!(err, DriverError::ModelCall(_)));
        assert_eq!(session.state, before);
    }

    #[tokio::test]
    async fn test_refresh_does_not_duplicate_questions() {
        let model = Arc::new(ScriptedModel::default());
        let driver = driver(model.clone(), Arc::new(MemoryStore::default()));
        let mut session = session();
        driver.submit_profile(&mut session, complete_form()).await.unwrap();

        let report = driver.refresh(&mut session).await.unwrap();

        assert!(report.displayed.is_empty());
        assert_eq!(model.call_count(), 1);
        assert_eq!(session.state.transcript.len(), 2);
    }

    #[tokio::test]
    async fn test_export_failure_keeps_interview_complete() {
        let driver = driver(
            Arc::new(ScriptedModel::default()),
            Arc::new(MemoryStore::failing()),
        );
        let mut session = session();
        driver.submit_profile(&mut session, complete_form()).await.unwrap();

        let report = driver
            .submit_answer(&mut session, "bye".to_string())
            .await
            .unwrap();

        assert_eq!(report.phase, Phase::Complete);
        assert!(matches!(report.export, Some(ExportStatus::Failed { .. })));
        assert!(session.state.ended);
        assert_eq!(session.export, report.export);
    }

    #[tokio::test]
    async fn test_answers_after_completion_are_rejected() {
        let store = Arc::new(MemoryStore::default());
        let driver = driver(Arc::new(ScriptedModel::default()), store.clone());
        let mut session = session();
        driver.submit_profile(&mut session, complete_form()).await.unwrap();
        driver
            .submit_answer(&mut session, "quit".to_string())
            .await
            .unwrap();

        let err = driver
            .submit_answer(&mut session, "one more thing".to_string())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DriverError::Transition(TransitionError::Ended)
        ));
        assert_eq!(store.upload_count(), 1);
    }

    #[tokio::test]
    async fn test_resubmitting_profile_is_rejected() {
        let driver = driver(
            Arc::new(ScriptedModel::default()),
            Arc::new(MemoryStore::default()),
        );
        let mut session = session();
        driver.submit_profile(&mut session, complete_form()).await.unwrap();

        let err = driver
            .submit_profile(&mut session, complete_form())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DriverError::Transition(TransitionError::AlreadyStarted)
        ));
        assert_eq!(session.state.transcript.len(), 2);
    }

    /// Holds every upload for a few seconds before storing it.
    #[derive(Default)]
    struct SlowStore {
        inner: MemoryStore,
    }

    #[async_trait]
    impl BlobStore for SlowStore {
        async fn upload(
            &self,
            bucket: &str,
            json_blob: String,
            object_name: &str,
        ) -> Result<String, StorageError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            self.inner.upload(bucket, json_blob, object_name).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_turn_still_exports_transcript() {
        let store = Arc::new(SlowStore::default());
        let exporter = TranscriptExporter::new(
            store.clone(),
            "interview-logs".to_string(),
            DEFAULT_EXPORT_PREFIX.to_string(),
        );
        let driver = InterviewDriver::new(Arc::new(ScriptedModel::default()), exporter);
        let handle = Arc::new(Mutex::new(session()));

        driver
            .clone()
            .run_detached(handle.clone(), Turn::Profile(complete_form()))
            .await
            .unwrap();

        let turn = driver
            .clone()
            .run_detached(handle.clone(), Turn::Answer("exit".to_string()));
        let timed_out = tokio::time::timeout(Duration::from_millis(50), turn).await;
        assert!(timed_out.is_err());

        // The detached turn still holds the lock until its upload finishes.
        let session = handle.lock().await;
        assert!(session.state.ended);
        assert!(matches!(session.export, Some(ExportStatus::Stored { .. })));
        assert_eq!(store.inner.upload_count(), 1);
    }

    #[tokio::test]
    async fn test_run_detached_returns_turn_report() {
        let driver = driver(
            Arc::new(ScriptedModel::default()),
            Arc::new(MemoryStore::default()),
        );
        let handle = Arc::new(Mutex::new(session()));

        let report = driver
            .run_detached(handle.clone(), Turn::Profile(complete_form()))
            .await
            .unwrap();

        assert_eq!(report.question_count, 1);
        assert_eq!(handle.lock().await.state.question_count, 1);
    }
}
