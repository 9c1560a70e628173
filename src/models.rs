use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Survey {
    pub id: Uuid,
    pub title: String,
    pub program_id: Uuid,
    pub academic_year: String,
    pub semester: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Likert,
    Rating,
    Mcq,
    Text,
}

impl QuestionType {
    /// Likert and rating questions carry a 1..=5 score.
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Likert | Self::Rating)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Likert => "likert",
            Self::Rating => "rating",
            Self::Mcq => "mcq",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown question type: {0}")]
pub struct QuestionTypeParseError(pub String);

impl FromStr for QuestionType {
    type Err = QuestionTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "likert" => Ok(Self::Likert),
            "rating" => Ok(Self::Rating),
            "mcq" => Ok(Self::Mcq),
            "text" => Ok(Self::Text),
            _ => Err(QuestionTypeParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub survey_id: Uuid,
    pub question_type: QuestionType,
    pub prompt: String,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub id: Uuid,
    pub survey_id: Uuid,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub response_id: Uuid,
    pub question_id: Uuid,
    pub numeric_value: Option<i32>,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplaintStatus {
    Pending,
    InProgress,
    Resolved,
    Closed,
}

impl ComplaintStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
        }
    }

    /// Closed complaints count as resolved for rate purposes.
    pub fn is_resolved(self) -> bool {
        matches!(self, Self::Resolved | Self::Closed)
    }
}

impl fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown complaint status: {0}")]
pub struct ComplaintStatusParseError(pub String);

impl FromStr for ComplaintStatus {
    type Err = ComplaintStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "resolved" => Ok(Self::Resolved),
            "closed" => Ok(Self::Closed),
            _ => Err(ComplaintStatusParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Complaint {
    pub id: Uuid,
    pub program_id: Uuid,
    pub status: ComplaintStatus,
    pub complainant_type: String,
    pub subject: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: Uuid,
    pub program_id: Uuid,
    pub code: String,
    pub name: String,
}

/// One row of the survey/course join table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyCourse {
    pub survey_id: Uuid,
    pub course_id: Uuid,
}

/// Survey selection shared by the rollup and the comparator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurveyFilter {
    pub academic_year: Option<String>,
    pub semester: Option<String>,
}

/// Trims a user-supplied year or semester; blank input means no value.
pub fn normalize_label(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl SurveyFilter {
    /// Builds a filter from raw user input. Blank values do not filter.
    pub fn new(academic_year: Option<&str>, semester: Option<&str>) -> Self {
        Self {
            academic_year: normalize_label(academic_year),
            semester: normalize_label(semester),
        }
    }

    pub fn matches(&self, survey: &Survey) -> bool {
        let year_ok = self
            .academic_year
            .as_deref()
            .map_or(true, |year| survey.academic_year == year);
        let semester_ok = self
            .semester
            .as_deref()
            .map_or(true, |semester| survey.semester.as_deref() == Some(semester));
        year_ok && semester_ok
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceCount {
    pub choice: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Distribution {
    /// Counts for scores 1 through 5, in that order.
    Scale { counts: [usize; 5] },
    Choices { counts: Vec<ChoiceCount> },
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionAggregate {
    pub question_id: Uuid,
    pub question_type: QuestionType,
    pub prompt: String,
    pub mean: f64,
    pub std_dev: f64,
    pub response_count: usize,
    pub distribution: Distribution,
    pub text_answers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveySummary {
    pub survey_id: Uuid,
    pub title: String,
    pub survey_type: String,
    pub academic_year: String,
    pub semester: Option<String>,
    pub response_count: usize,
    /// Pooled over every valid score in the survey.
    pub mean: f64,
    pub score_count: usize,
    /// Mean of the per-question standard deviations.
    pub overall_std_dev: f64,
    pub questions: Vec<QuestionAggregate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComplaintStats {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub resolved: usize,
    pub resolution_rate: f64,
    pub by_complainant_type: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplaintDetail {
    pub id: Uuid,
    pub status: ComplaintStatus,
    pub complainant_type: String,
    pub subject: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseSatisfaction {
    pub course_id: Uuid,
    pub code: String,
    pub name: String,
    pub mean: f64,
    pub answer_count: usize,
    pub survey_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramStats {
    pub program_id: Uuid,
    pub program_name: String,
    pub filter: SurveyFilter,
    pub total_responses: usize,
    pub average_satisfaction: f64,
    pub satisfaction_rate: f64,
    pub total_surveys: usize,
    pub complaint_stats: ComplaintStats,
    pub course_satisfaction: Vec<CourseSatisfaction>,
    pub survey_details: Vec<SurveySummary>,
    pub complaint_details: Vec<ComplaintDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramCell {
    pub program_id: Uuid,
    pub average_score: f64,
    pub response_count: usize,
    pub exists: bool,
}

impl ProgramCell {
    pub fn missing(program_id: Uuid) -> Self {
        Self {
            program_id,
            average_score: 0.0,
            response_count: 0,
            exists: false,
        }
    }

    /// `None` when the program has no survey of this type.
    pub fn score(&self) -> Option<f64> {
        self.exists.then_some(self.average_score)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyTypeRow {
    pub title: String,
    pub program_data: Vec<ProgramCell>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallSummary {
    pub program_id: Uuid,
    pub program_name: String,
    pub overall_mean: f64,
    pub total_responses: usize,
    pub total_surveys: usize,
    pub satisfaction_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub academic_year: String,
    pub semester: Option<String>,
    pub survey_types: Vec<SurveyTypeRow>,
    pub overall: Vec<OverallSummary>,
    pub best_program: Option<Uuid>,
}
