use std::collections::{BTreeMap, HashSet};

use tracing::info;
use uuid::Uuid;

use crate::aggregate::{round1, satisfaction_rate, summarize_survey, survey_scores, ScoreSummary};
use crate::classify::Classifier;
use crate::error::{Result, ValidationError};
use crate::models::{
    Complaint, ComplaintDetail, ComplaintStats, ComplaintStatus, Course, CourseSatisfaction,
    Program, ProgramStats, SurveyCourse, SurveyFilter, SurveySummary,
};
use crate::store::{SurveyBundle, SurveyLoader};

/// Loads one program's data and rolls it up.
pub async fn program_stats(
    loader: &SurveyLoader<'_>,
    classifier: &Classifier,
    program_id: Uuid,
    filter: &SurveyFilter,
) -> Result<ProgramStats> {
    let program = loader
        .programs(&[program_id])
        .await?
        .into_iter()
        .find(|p| p.id == program_id)
        .ok_or(ValidationError::UnknownProgram(program_id))?;

    let bundles = loader.surveys(program_id, filter).await?;
    let complaints = loader.complaints(program_id).await?;
    let courses = loader.courses(program_id).await?;
    let links = loader.survey_courses(program_id).await?;

    let stats = build_program_stats(
        &program,
        filter,
        &bundles,
        &complaints,
        &courses,
        &links,
        classifier,
    );
    info!(
        program = %stats.program_name,
        surveys = stats.total_surveys,
        responses = stats.total_responses,
        "program stats computed"
    );
    Ok(stats)
}

pub fn build_program_stats(
    program: &Program,
    filter: &SurveyFilter,
    bundles: &[SurveyBundle],
    complaints: &[Complaint],
    courses: &[Course],
    links: &[SurveyCourse],
    classifier: &Classifier,
) -> ProgramStats {
    let survey_details: Vec<SurveySummary> = bundles
        .iter()
        .map(|bundle| summarize_survey(bundle, classifier))
        .collect();

    let average_satisfaction = mean_of_survey_means(&survey_details);

    let mut complaint_details: Vec<ComplaintDetail> = complaints
        .iter()
        .map(|c| ComplaintDetail {
            id: c.id,
            status: c.status,
            complainant_type: c.complainant_type.clone(),
            subject: c.subject.clone(),
            created_at: c.created_at,
        })
        .collect();
    complaint_details.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    ProgramStats {
        program_id: program.id,
        program_name: program.name.clone(),
        filter: filter.clone(),
        total_responses: survey_details.iter().map(|s| s.response_count).sum(),
        average_satisfaction,
        satisfaction_rate: satisfaction_rate(average_satisfaction),
        total_surveys: survey_details.len(),
        complaint_stats: complaint_stats(complaints),
        course_satisfaction: course_satisfaction(bundles, courses, links),
        survey_details,
        complaint_details,
    }
}

/// Each survey weighs the same regardless of its response volume. Surveys
/// without a single valid score are left out.
pub fn mean_of_survey_means(surveys: &[SurveySummary]) -> f64 {
    let means: Vec<f64> = surveys
        .iter()
        .filter(|s| s.score_count > 0)
        .map(|s| s.mean)
        .collect();
    ScoreSummary::from_scores(&means).mean
}

pub fn complaint_stats(complaints: &[Complaint]) -> ComplaintStats {
    let mut stats = ComplaintStats {
        total: complaints.len(),
        ..ComplaintStats::default()
    };
    let mut by_type: BTreeMap<String, usize> = BTreeMap::new();

    for complaint in complaints {
        match complaint.status {
            ComplaintStatus::Pending => stats.pending += 1,
            ComplaintStatus::InProgress => stats.in_progress += 1,
            ComplaintStatus::Resolved | ComplaintStatus::Closed => stats.resolved += 1,
        }
        *by_type.entry(complaint.complainant_type.clone()).or_insert(0) += 1;
    }

    stats.resolution_rate = if stats.total == 0 {
        0.0
    } else {
        round1(stats.resolved as f64 / stats.total as f64 * 100.0)
    };
    stats.by_complainant_type = by_type;
    stats
}

/// Pooled over every valid score of every survey linked to the course.
pub fn course_satisfaction(
    bundles: &[SurveyBundle],
    courses: &[Course],
    links: &[SurveyCourse],
) -> Vec<CourseSatisfaction> {
    let mut rows: Vec<CourseSatisfaction> = courses
        .iter()
        .map(|course| {
            let linked: HashSet<Uuid> = links
                .iter()
                .filter(|link| link.course_id == course.id)
                .map(|link| link.survey_id)
                .collect();
            let surveys: Vec<&SurveyBundle> = bundles
                .iter()
                .filter(|b| linked.contains(&b.survey.id))
                .collect();
            let scores: Vec<f64> = surveys.iter().flat_map(|b| survey_scores(b)).collect();
            let pooled = ScoreSummary::from_scores(&scores);

            CourseSatisfaction {
                course_id: course.id,
                code: course.code.clone(),
                name: course.name.clone(),
                mean: pooled.mean,
                answer_count: pooled.count,
                survey_count: surveys.len(),
            }
        })
        .collect();
    rows.sort_by(|a, b| a.code.cmp(&b.code));
    rows
}
