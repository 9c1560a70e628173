use std::collections::HashMap;

use tracing::debug;
use uuid::Uuid;

use crate::classify::Classifier;
use crate::models::{
    Answer, ChoiceCount, Distribution, Question, QuestionAggregate, QuestionType, SurveySummary,
};
use crate::store::SurveyBundle;

pub const MIN_SCORE: i32 = 1;
pub const MAX_SCORE: i32 = 5;

/// Mean and standard deviation over a flat list of scores.
///
/// Every mean in the crate goes through here so the empty case and the
/// deviation formula (population, divide by n) stay the same everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScoreSummary {
    pub mean: f64,
    pub std_dev: f64,
    pub count: usize,
}

impl ScoreSummary {
    pub fn from_scores(scores: &[f64]) -> Self {
        if scores.is_empty() {
            return Self::default();
        }
        let count = scores.len();
        let mean = scores.iter().sum::<f64>() / count as f64;
        let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / count as f64;
        Self {
            mean,
            std_dev: variance.sqrt(),
            count,
        }
    }
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Share of the 5-point maximum, as a percentage with one decimal.
pub fn satisfaction_rate(mean: f64) -> f64 {
    round1(mean / MAX_SCORE as f64 * 100.0)
}

/// Score carried by an answer, if it counts toward numeric aggregation.
pub fn valid_score(question_type: QuestionType, answer: &Answer) -> Option<f64> {
    if !question_type.is_numeric() {
        return None;
    }
    answer
        .numeric_value
        .filter(|v| (MIN_SCORE..=MAX_SCORE).contains(v))
        .map(f64::from)
}

/// Aggregates one question's answers. Answers for other questions are ignored.
pub fn aggregate_question(question: &Question, answers: &[Answer]) -> QuestionAggregate {
    let answers = answers.iter().filter(|a| a.question_id == question.id);

    let mut scores = Vec::new();
    let mut text_answers = Vec::new();
    let distribution = match question.question_type {
        QuestionType::Likert | QuestionType::Rating => {
            let mut counts = [0usize; 5];
            for answer in answers {
                if let Some(score) = valid_score(question.question_type, answer) {
                    counts[(score as usize) - 1] += 1;
                    scores.push(score);
                }
            }
            Distribution::Scale { counts }
        }
        QuestionType::Mcq => {
            let mut counts: Vec<ChoiceCount> = question
                .options
                .iter()
                .map(|choice| ChoiceCount {
                    choice: choice.clone(),
                    count: 0,
                })
                .collect();
            for value in answers.filter_map(|a| a.value.as_deref()) {
                if let Some(slot) = counts.iter_mut().find(|c| c.choice == value) {
                    slot.count += 1;
                }
            }
            Distribution::Choices { counts }
        }
        QuestionType::Text => {
            text_answers = answers
                .filter_map(|a| a.value.as_deref())
                .filter(|v| !v.trim().is_empty())
                .map(str::to_string)
                .collect();
            Distribution::None
        }
    };

    let summary = ScoreSummary::from_scores(&scores);
    QuestionAggregate {
        question_id: question.id,
        question_type: question.question_type,
        prompt: question.prompt.clone(),
        mean: summary.mean,
        std_dev: summary.std_dev,
        response_count: summary.count,
        distribution,
        text_answers,
    }
}

/// Every valid score in the survey, skipping answers to questions the survey
/// no longer has.
pub fn survey_scores(bundle: &SurveyBundle) -> Vec<f64> {
    let types: HashMap<Uuid, QuestionType> = bundle
        .questions
        .iter()
        .map(|q| (q.id, q.question_type))
        .collect();
    bundle
        .answers
        .iter()
        .filter_map(|answer| {
            let question_type = types.get(&answer.question_id)?;
            valid_score(*question_type, answer)
        })
        .collect()
}

pub fn summarize_survey(bundle: &SurveyBundle, classifier: &Classifier) -> SurveySummary {
    let mut by_question: HashMap<Uuid, Vec<Answer>> = HashMap::new();
    for answer in &bundle.answers {
        by_question
            .entry(answer.question_id)
            .or_default()
            .push(answer.clone());
    }

    let mut numeric_answers = 0;
    let questions: Vec<QuestionAggregate> = bundle
        .questions
        .iter()
        .map(|question| {
            let answers = by_question.remove(&question.id).unwrap_or_default();
            if question.question_type.is_numeric() {
                numeric_answers += answers.len();
            }
            aggregate_question(question, &answers)
        })
        .collect();

    let orphaned: usize = by_question.values().map(Vec::len).sum();
    if orphaned > 0 {
        debug!(survey_id = %bundle.survey.id, orphaned, "skipped answers to unknown questions");
    }

    let numeric_std_devs: Vec<f64> = questions
        .iter()
        .filter(|q| q.question_type.is_numeric())
        .map(|q| q.std_dev)
        .collect();
    let overall_std_dev = ScoreSummary::from_scores(&numeric_std_devs).mean;

    let scores = survey_scores(bundle);
    let pooled = ScoreSummary::from_scores(&scores);

    if numeric_answers > pooled.count {
        debug!(
            survey_id = %bundle.survey.id,
            excluded = numeric_answers - pooled.count,
            "excluded missing or out-of-range scores"
        );
    }

    SurveySummary {
        survey_id: bundle.survey.id,
        title: bundle.survey.title.clone(),
        survey_type: classifier.classify(&bundle.survey.title),
        academic_year: bundle.survey.academic_year.clone(),
        semester: bundle.survey.semester.clone(),
        response_count: bundle.responses.len(),
        mean: pooled.mean,
        score_count: pooled.count,
        overall_std_dev,
        questions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::{answer, question, survey_bundle};

    fn numeric_answers(question_id: Uuid, values: &[i32]) -> Vec<Answer> {
        values
            .iter()
            .map(|v| answer(question_id, Some(*v), None))
            .collect()
    }

    #[test]
    fn empty_input_reports_zero_not_nan() {
        let q = question(QuestionType::Likert, &[]);
        let agg = aggregate_question(&q, &[]);
        assert_eq!(agg.response_count, 0);
        assert_eq!(agg.mean, 0.0);
        assert_eq!(agg.std_dev, 0.0);
        assert_eq!(agg.distribution, Distribution::Scale { counts: [0; 5] });
    }

    #[test]
    fn out_of_range_values_are_excluded() {
        let q = question(QuestionType::Rating, &[]);
        let answers = numeric_answers(q.id, &[0, 6, -1, 4, 2]);
        let agg = aggregate_question(&q, &answers);
        assert_eq!(agg.response_count, 2);
        assert!((agg.mean - 3.0).abs() < 1e-9);
        assert!((agg.std_dev - 1.0).abs() < 1e-9);
        assert_eq!(agg.distribution, Distribution::Scale { counts: [0, 1, 0, 1, 0] });
    }

    #[test]
    fn mean_stays_within_scale() {
        let q = question(QuestionType::Likert, &[]);
        for values in [vec![1, 1, 1], vec![5, 5], vec![1, 5, 3, 2, 4, 9]] {
            let agg = aggregate_question(&q, &numeric_answers(q.id, &values));
            assert!(agg.response_count > 0);
            assert!((1.0..=5.0).contains(&agg.mean));
        }
    }

    #[test]
    fn std_dev_divides_by_n() {
        let q = question(QuestionType::Likert, &[]);
        let agg = aggregate_question(&q, &numeric_answers(q.id, &[2, 4, 4, 4, 5, 5, 3, 5]));
        assert!((agg.mean - 4.0).abs() < 1e-9);
        assert!((agg.std_dev - 1.0).abs() < 1e-9);
    }

    #[test]
    fn mcq_counts_declared_choices_only() {
        let q = question(QuestionType::Mcq, &["Yes", "No", "Unsure"]);
        let answers = vec![
            answer(q.id, None, Some("Yes")),
            answer(q.id, None, Some("Yes")),
            answer(q.id, None, Some("Maybe")),
            answer(q.id, Some(3), Some("No")),
        ];
        let agg = aggregate_question(&q, &answers);
        assert_eq!(agg.response_count, 0);
        assert_eq!(agg.mean, 0.0);
        let Distribution::Choices { counts } = agg.distribution else {
            panic!("expected choice distribution");
        };
        let counts: Vec<(&str, usize)> = counts
            .iter()
            .map(|c| (c.choice.as_str(), c.count))
            .collect();
        assert_eq!(counts, vec![("Yes", 2), ("No", 1), ("Unsure", 0)]);
    }

    #[test]
    fn text_keeps_non_empty_strings() {
        let q = question(QuestionType::Text, &[]);
        let answers = vec![
            answer(q.id, None, Some("More lab hours")),
            answer(q.id, None, Some("   ")),
            answer(q.id, None, None),
            answer(q.id, Some(5), Some("Great mentors")),
        ];
        let agg = aggregate_question(&q, &answers);
        assert_eq!(agg.text_answers, vec!["More lab hours", "Great mentors"]);
        assert_eq!(agg.response_count, 0);
        assert_eq!(agg.distribution, Distribution::None);
    }

    #[test]
    fn answers_for_other_questions_are_ignored() {
        let q = question(QuestionType::Likert, &[]);
        let mut answers = numeric_answers(q.id, &[4]);
        answers.extend(numeric_answers(Uuid::new_v4(), &[1, 1]));
        let agg = aggregate_question(&q, &answers);
        assert_eq!(agg.response_count, 1);
        assert_eq!(agg.mean, 4.0);
    }

    #[test]
    fn survey_summary_skips_orphans_and_averages_std_devs() {
        let q1 = question(QuestionType::Likert, &[]);
        let q2 = question(QuestionType::Rating, &[]);
        let q3 = question(QuestionType::Text, &[]);
        let mut answers = numeric_answers(q1.id, &[1, 3]);
        answers.extend(numeric_answers(q2.id, &[4, 4]));
        answers.extend(numeric_answers(Uuid::new_v4(), &[5, 5, 5]));
        let bundle = survey_bundle("Lecturer Feedback", vec![q1, q2, q3], 2, answers);

        let summary = summarize_survey(&bundle, &Classifier::default());
        assert_eq!(summary.survey_type, "Lecturer Performance");
        assert_eq!(summary.response_count, 2);
        assert_eq!(summary.score_count, 4);
        assert!((summary.mean - 3.0).abs() < 1e-9);
        // question std devs are 1.0 and 0.0; the text question is not counted
        assert!((summary.overall_std_dev - 0.5).abs() < 1e-9);
        assert_eq!(summary.questions.len(), 3);
    }

    #[test]
    fn survey_summary_counts_only_valid_scores_across_many_questions() {
        let questions: Vec<Question> = (0..50)
            .map(|_| question(QuestionType::Likert, &[]))
            .collect();
        let mut answers = Vec::new();
        for q in &questions {
            answers.extend(numeric_answers(q.id, &[5, 3, 0, 9]));
            answers.push(answer(q.id, None, None));
        }
        let bundle = survey_bundle("Facilities Review", questions, 4, answers);

        let summary = summarize_survey(&bundle, &Classifier::default());
        assert_eq!(summary.survey_type, "Facilities & Services");
        assert_eq!(summary.score_count, 100);
        assert!((summary.mean - 4.0).abs() < 1e-9);
        assert!((summary.overall_std_dev - 1.0).abs() < 1e-9);
        assert!(summary.questions.iter().all(|q| q.response_count == 2));
    }

    #[test]
    fn satisfaction_rate_rounds_to_one_decimal() {
        assert_eq!(satisfaction_rate(44.0 / 12.0), 73.3);
        assert_eq!(satisfaction_rate(0.0), 0.0);
        assert_eq!(round1(3.25), 3.3);
    }
}
