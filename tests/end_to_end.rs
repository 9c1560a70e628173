use std::time::Duration;

use chrono::Utc;
use quality_stats::models::{ComplaintStatus, QuestionType, SurveyFilter};
use quality_stats::{
    compare_programs, program_stats, Classifier, ComparisonRequest, Error, MemoryStore,
    SurveyLoader, ValidationError,
};
use uuid::Uuid;

const YEAR: &str = "2025/2026";

struct Fixture {
    store: MemoryStore,
    a: Uuid,
    b: Uuid,
}

/// Program A: two course evaluations (4.0 x 10, 2.0 x 2), both linked to one
/// course. Program B: one course evaluation (3.0 x 5).
fn fixture() -> Fixture {
    let mut store = MemoryStore::new();
    let a = store.add_program("Informatics");
    let b = store.add_program("Mathematics");

    let course = store.add_course(a, "IF201", "Algorithms");
    for (title, score, count) in [
        ("Course Evaluation: Algorithms (odd)", 4, 10),
        ("Course Evaluation: Algorithms (even)", 2, 2),
    ] {
        let survey = store.add_survey(a, title, YEAR, None);
        let question = store.add_question(survey, QuestionType::Likert, "Overall", &[]);
        store.add_scored_responses(survey, question, score, count);
        store.link_course(survey, course);
    }

    let survey = store.add_survey(b, "Course Evaluation: Calculus", YEAR, None);
    let question = store.add_question(survey, QuestionType::Rating, "Overall", &[]);
    store.add_scored_responses(survey, question, 3, 5);

    store.add_complaint(a, ComplaintStatus::Closed, "student", "Room change", Utc::now());
    store.add_complaint(a, ComplaintStatus::Pending, "staff", "Lab access", Utc::now());

    Fixture { store, a, b }
}

#[tokio::test]
async fn three_policies_give_three_figures() {
    let Fixture { store, a, b } = fixture();
    let loader = SurveyLoader::new(&store, Duration::from_secs(5));
    let classifier = Classifier::default();

    let stats = program_stats(&loader, &classifier, a, &SurveyFilter::default())
        .await
        .unwrap();
    assert!((stats.average_satisfaction - 3.0).abs() < 1e-9);
    assert_eq!(stats.total_responses, 12);
    assert_eq!(stats.complaint_stats.resolved, 1);
    assert_eq!(stats.complaint_stats.pending, 1);

    let course = &stats.course_satisfaction[0];
    assert!((course.mean - 44.0 / 12.0).abs() < 1e-9);

    let request = ComparisonRequest {
        program_ids: vec![a, b],
        academic_year: Some(YEAR.to_string()),
        semester: None,
    };
    let result = compare_programs(&loader, &classifier, &request)
        .await
        .unwrap();

    let row = &result.survey_types[0];
    assert_eq!(row.title, "Course Evaluation");
    assert!((row.program_data[0].average_score - 44.0 / 12.0).abs() < 1e-9);
    assert_eq!(row.program_data[1].score(), Some(3.0));

    assert_eq!(result.overall[0].program_id, a);
    assert!((result.overall[0].overall_mean - 44.0 / 12.0).abs() < 1e-9);
    assert_eq!(result.overall[0].satisfaction_rate, 73.3);
    assert_eq!(result.overall[1].program_id, b);
    assert_eq!(result.overall[1].overall_mean, 3.0);
    assert_eq!(result.overall[1].satisfaction_rate, 60.0);
    assert_eq!(result.best_program, Some(a));
}

#[tokio::test]
async fn selection_order_drives_output_order() {
    let Fixture { store, a, b } = fixture();
    let loader = SurveyLoader::new(&store, Duration::from_secs(5));

    let request = ComparisonRequest {
        program_ids: vec![b, a],
        academic_year: Some(YEAR.to_string()),
        semester: None,
    };
    let result = compare_programs(&loader, &Classifier::default(), &request)
        .await
        .unwrap();

    let order: Vec<Uuid> = result.overall.iter().map(|o| o.program_id).collect();
    assert_eq!(order, vec![b, a]);
    assert_eq!(result.overall[0].program_name, "Mathematics");
    assert_eq!(result.best_program, Some(a));
}

#[tokio::test]
async fn missing_year_fails_fast() {
    let Fixture { store, a, b } = fixture();
    let loader = SurveyLoader::new(&store, Duration::from_secs(5));

    let request = ComparisonRequest {
        program_ids: vec![a, b],
        academic_year: None,
        semester: None,
    };
    let err = compare_programs(&loader, &Classifier::default(), &request)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::MissingAcademicYear)
    ));
}
