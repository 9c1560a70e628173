use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    Answer, Complaint, ComplaintStatus, Course, Program, Question, QuestionType, Response, Survey,
    SurveyCourse, SurveyFilter,
};

/// Read-only access to the flat entity tables.
#[async_trait]
pub trait ResponseStore: Send + Sync {
    /// Programs among `ids` that exist, in no particular order.
    async fn programs(&self, ids: &[Uuid]) -> Result<Vec<Program>, StoreError>;
    async fn surveys(
        &self,
        program_id: Uuid,
        filter: &SurveyFilter,
    ) -> Result<Vec<Survey>, StoreError>;
    async fn questions(&self, survey_id: Uuid) -> Result<Vec<Question>, StoreError>;
    async fn responses(&self, survey_id: Uuid) -> Result<Vec<Response>, StoreError>;
    /// Answers across every response of the survey.
    async fn answers(&self, survey_id: Uuid) -> Result<Vec<Answer>, StoreError>;
    async fn complaints(&self, program_id: Uuid) -> Result<Vec<Complaint>, StoreError>;
    async fn courses(&self, program_id: Uuid) -> Result<Vec<Course>, StoreError>;
    /// Join rows for the program's courses.
    async fn survey_courses(&self, program_id: Uuid) -> Result<Vec<SurveyCourse>, StoreError>;
}

/// A survey with its questions, responses and answers already joined.
#[derive(Debug, Clone)]
pub struct SurveyBundle {
    pub survey: Survey,
    pub questions: Vec<Question>,
    pub responses: Vec<Response>,
    pub answers: Vec<Answer>,
}

/// Wraps a store with a per-call timeout and assembles typed joins.
pub struct SurveyLoader<'a> {
    store: &'a dyn ResponseStore,
    timeout: Duration,
}

impl<'a> SurveyLoader<'a> {
    pub fn new(store: &'a dyn ResponseStore, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    async fn call<T, F>(&self, operation: &'static str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(operation, timeout_secs = self.timeout.as_secs(), "store call timed out");
                Err(StoreError::Timeout {
                    operation,
                    after: self.timeout,
                })
            }
        }
    }

    pub async fn programs(&self, ids: &[Uuid]) -> Result<Vec<Program>, StoreError> {
        self.call("programs", self.store.programs(ids)).await
    }

    pub async fn surveys(
        &self,
        program_id: Uuid,
        filter: &SurveyFilter,
    ) -> Result<Vec<SurveyBundle>, StoreError> {
        let surveys = self
            .call("surveys", self.store.surveys(program_id, filter))
            .await?;

        let mut bundles = Vec::with_capacity(surveys.len());
        for survey in surveys {
            let questions = self.call("questions", self.store.questions(survey.id)).await?;
            let responses = self.call("responses", self.store.responses(survey.id)).await?;
            let answers = self.call("answers", self.store.answers(survey.id)).await?;
            bundles.push(SurveyBundle {
                survey,
                questions,
                responses,
                answers,
            });
        }
        Ok(bundles)
    }

    pub async fn complaints(&self, program_id: Uuid) -> Result<Vec<Complaint>, StoreError> {
        self.call("complaints", self.store.complaints(program_id)).await
    }

    pub async fn courses(&self, program_id: Uuid) -> Result<Vec<Course>, StoreError> {
        self.call("courses", self.store.courses(program_id)).await
    }

    pub async fn survey_courses(&self, program_id: Uuid) -> Result<Vec<SurveyCourse>, StoreError> {
        self.call("survey_courses", self.store.survey_courses(program_id))
            .await
    }
}

/// In-memory store for tests and offline demos.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    programs: Vec<Program>,
    surveys: Vec<Survey>,
    questions: Vec<Question>,
    responses: Vec<Response>,
    answers: Vec<Answer>,
    complaints: Vec<Complaint>,
    courses: Vec<Course>,
    survey_courses: Vec<SurveyCourse>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_program(&mut self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.programs.push(Program {
            id,
            name: name.to_string(),
        });
        id
    }

    pub fn add_survey(
        &mut self,
        program_id: Uuid,
        title: &str,
        academic_year: &str,
        semester: Option<&str>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.surveys.push(Survey {
            id,
            title: title.to_string(),
            program_id,
            academic_year: academic_year.to_string(),
            semester: semester.map(str::to_string),
        });
        id
    }

    pub fn add_question(
        &mut self,
        survey_id: Uuid,
        question_type: QuestionType,
        prompt: &str,
        options: &[&str],
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.questions.push(Question {
            id,
            survey_id,
            question_type,
            prompt: prompt.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
        });
        id
    }

    /// Records one submission with `(question_id, numeric_value, value)` answers.
    pub fn add_response(
        &mut self,
        survey_id: Uuid,
        answers: &[(Uuid, Option<i32>, Option<&str>)],
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.responses.push(Response {
            id,
            survey_id,
            submitted_at: Utc::now(),
        });
        for (question_id, numeric_value, value) in answers {
            self.answers.push(Answer {
                response_id: id,
                question_id: *question_id,
                numeric_value: *numeric_value,
                value: value.map(str::to_string),
            });
        }
        id
    }

    /// Adds `count` single-answer responses scoring `score` on `question_id`.
    pub fn add_scored_responses(
        &mut self,
        survey_id: Uuid,
        question_id: Uuid,
        score: i32,
        count: usize,
    ) {
        for _ in 0..count {
            self.add_response(survey_id, &[(question_id, Some(score), None)]);
        }
    }

    pub fn add_complaint(
        &mut self,
        program_id: Uuid,
        status: ComplaintStatus,
        complainant_type: &str,
        subject: &str,
        created_at: DateTime<Utc>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.complaints.push(Complaint {
            id,
            program_id,
            status,
            complainant_type: complainant_type.to_string(),
            subject: subject.to_string(),
            created_at,
        });
        id
    }

    pub fn add_course(&mut self, program_id: Uuid, code: &str, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.courses.push(Course {
            id,
            program_id,
            code: code.to_string(),
            name: name.to_string(),
        });
        id
    }

    pub fn link_course(&mut self, survey_id: Uuid, course_id: Uuid) {
        let link = SurveyCourse {
            survey_id,
            course_id,
        };
        if !self.survey_courses.contains(&link) {
            self.survey_courses.push(link);
        }
    }
}

#[async_trait]
impl ResponseStore for MemoryStore {
    async fn programs(&self, ids: &[Uuid]) -> Result<Vec<Program>, StoreError> {
        Ok(self
            .programs
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn surveys(
        &self,
        program_id: Uuid,
        filter: &SurveyFilter,
    ) -> Result<Vec<Survey>, StoreError> {
        Ok(self
            .surveys
            .iter()
            .filter(|s| s.program_id == program_id && filter.matches(s))
            .cloned()
            .collect())
    }

    async fn questions(&self, survey_id: Uuid) -> Result<Vec<Question>, StoreError> {
        Ok(self
            .questions
            .iter()
            .filter(|q| q.survey_id == survey_id)
            .cloned()
            .collect())
    }

    async fn responses(&self, survey_id: Uuid) -> Result<Vec<Response>, StoreError> {
        Ok(self
            .responses
            .iter()
            .filter(|r| r.survey_id == survey_id)
            .cloned()
            .collect())
    }

    async fn answers(&self, survey_id: Uuid) -> Result<Vec<Answer>, StoreError> {
        let response_ids: Vec<Uuid> = self
            .responses
            .iter()
            .filter(|r| r.survey_id == survey_id)
            .map(|r| r.id)
            .collect();
        Ok(self
            .answers
            .iter()
            .filter(|a| response_ids.contains(&a.response_id))
            .cloned()
            .collect())
    }

    async fn complaints(&self, program_id: Uuid) -> Result<Vec<Complaint>, StoreError> {
        Ok(self
            .complaints
            .iter()
            .filter(|c| c.program_id == program_id)
            .cloned()
            .collect())
    }

    async fn courses(&self, program_id: Uuid) -> Result<Vec<Course>, StoreError> {
        Ok(self
            .courses
            .iter()
            .filter(|c| c.program_id == program_id)
            .cloned()
            .collect())
    }

    async fn survey_courses(&self, program_id: Uuid) -> Result<Vec<SurveyCourse>, StoreError> {
        let course_ids: Vec<Uuid> = self
            .courses
            .iter()
            .filter(|c| c.program_id == program_id)
            .map(|c| c.id)
            .collect();
        Ok(self
            .survey_courses
            .iter()
            .filter(|link| course_ids.contains(&link.course_id))
            .copied()
            .collect())
    }
}
