use std::fmt::Write;

use crate::models::{ComparisonResult, Distribution, ProgramCell, ProgramStats};

const NOT_AVAILABLE: &str = "n/a";

fn cell_text(cell: &ProgramCell) -> String {
    cell.score()
        .map(|score| format!("{score:.2} ({} resp.)", cell.response_count))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn filter_label(year: Option<&str>, semester: Option<&str>) -> String {
    match (year, semester) {
        (Some(year), Some(semester)) => format!("{year}, {semester} semester"),
        (Some(year), None) => year.to_string(),
        (None, Some(semester)) => format!("all years, {semester} semester"),
        (None, None) => "all years".to_string(),
    }
}

pub fn build_program_report(stats: &ProgramStats) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Quality Report: {}", stats.program_name);
    let _ = writeln!(
        output,
        "Generated for {}",
        filter_label(
            stats.filter.academic_year.as_deref(),
            stats.filter.semester.as_deref()
        )
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Summary");
    let _ = writeln!(output, "- Surveys: {}", stats.total_surveys);
    let _ = writeln!(output, "- Responses: {}", stats.total_responses);
    let _ = writeln!(
        output,
        "- Average satisfaction: {:.2} / 5 ({:.1}%)",
        stats.average_satisfaction, stats.satisfaction_rate
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Surveys");
    if stats.survey_details.is_empty() {
        let _ = writeln!(output, "No surveys recorded for this selection.");
    } else {
        for survey in &stats.survey_details {
            let _ = writeln!(
                output,
                "### {} ({}, {})",
                survey.title, survey.survey_type, survey.academic_year
            );
            let _ = writeln!(
                output,
                "{} responses, mean {:.2}, overall std dev {:.2}",
                survey.response_count, survey.mean, survey.overall_std_dev
            );
            for question in &survey.questions {
                match &question.distribution {
                    Distribution::Scale { counts } => {
                        let _ = writeln!(
                            output,
                            "- {}: mean {:.2}, sd {:.2}, n={} [1:{} 2:{} 3:{} 4:{} 5:{}]",
                            question.prompt,
                            question.mean,
                            question.std_dev,
                            question.response_count,
                            counts[0],
                            counts[1],
                            counts[2],
                            counts[3],
                            counts[4]
                        );
                    }
                    Distribution::Choices { counts } => {
                        let choices: Vec<String> = counts
                            .iter()
                            .map(|c| format!("{}: {}", c.choice, c.count))
                            .collect();
                        let _ = writeln!(output, "- {}: {}", question.prompt, choices.join(", "));
                    }
                    Distribution::None => {
                        let _ = writeln!(
                            output,
                            "- {}: {} written answers",
                            question.prompt,
                            question.text_answers.len()
                        );
                    }
                }
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Course Satisfaction");
    if stats.course_satisfaction.is_empty() {
        let _ = writeln!(output, "No courses linked to this program.");
    } else {
        for course in &stats.course_satisfaction {
            if course.answer_count == 0 {
                let _ = writeln!(output, "- {} {}: {}", course.code, course.name, NOT_AVAILABLE);
            } else {
                let _ = writeln!(
                    output,
                    "- {} {}: {:.2} across {} answers from {} surveys",
                    course.code, course.name, course.mean, course.answer_count, course.survey_count
                );
            }
        }
    }

    let complaints = &stats.complaint_stats;
    let _ = writeln!(output);
    let _ = writeln!(output, "## Complaints");
    let _ = writeln!(
        output,
        "{} total: {} pending, {} in progress, {} resolved ({:.1}% resolved)",
        complaints.total,
        complaints.pending,
        complaints.in_progress,
        complaints.resolved,
        complaints.resolution_rate
    );
    for complaint in stats.complaint_details.iter().take(5) {
        let _ = writeln!(
            output,
            "- {} [{}] from {}: {}",
            complaint.created_at.date_naive(),
            complaint.status,
            complaint.complainant_type,
            complaint.subject
        );
    }

    output
}

pub fn build_comparison_report(result: &ComparisonResult) -> String {
    let mut output = String::new();
    let names: Vec<&str> = result
        .overall
        .iter()
        .map(|o| o.program_name.as_str())
        .collect();

    let _ = writeln!(output, "# Program Comparison");
    let _ = writeln!(
        output,
        "Generated for {}",
        filter_label(Some(result.academic_year.as_str()), result.semester.as_deref())
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Overall");
    for summary in &result.overall {
        let marker = if result.best_program == Some(summary.program_id) {
            " (best)"
        } else {
            ""
        };
        let _ = writeln!(
            output,
            "- {}{}: mean {:.2} ({:.1}%) across {} responses in {} surveys",
            summary.program_name,
            marker,
            summary.overall_mean,
            summary.satisfaction_rate,
            summary.total_responses,
            summary.total_surveys
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## By Survey Type");
    if result.survey_types.is_empty() {
        let _ = writeln!(output, "No surveys match this selection.");
        return output;
    }

    let _ = writeln!(output, "| Survey type | {} |", names.join(" | "));
    let _ = writeln!(output, "|---|{}", "---|".repeat(names.len()));
    for row in &result.survey_types {
        let cells: Vec<String> = row.program_data.iter().map(cell_text).collect();
        let _ = writeln!(output, "| {} | {} |", row.title, cells.join(" | "));
    }

    output
}

/// One line per survey type and program. Missing cells leave the score empty.
pub fn comparison_to_csv(result: &ComparisonResult) -> anyhow::Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "survey_type",
        "program_id",
        "program_name",
        "exists",
        "average_score",
        "response_count",
    ])?;

    for row in &result.survey_types {
        for cell in &row.program_data {
            let name = result
                .overall
                .iter()
                .find(|o| o.program_id == cell.program_id)
                .map(|o| o.program_name.as_str())
                .unwrap_or_default();
            let program_id = cell.program_id.to_string();
            let score = cell.score().map(|s| format!("{s:.4}")).unwrap_or_default();
            let response_count = cell.response_count.to_string();
            writer.write_record([
                row.title.as_str(),
                program_id.as_str(),
                name,
                if cell.exists { "true" } else { "false" },
                score.as_str(),
                response_count.as_str(),
            ])?;
        }
    }

    let bytes = writer.into_inner()?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::models::{OverallSummary, SurveyTypeRow};

    fn comparison() -> ComparisonResult {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        ComparisonResult {
            academic_year: "2025/2026".to_string(),
            semester: None,
            survey_types: vec![SurveyTypeRow {
                title: "Course Evaluation".to_string(),
                program_data: vec![
                    ProgramCell {
                        program_id: a,
                        average_score: 3.6667,
                        response_count: 12,
                        exists: true,
                    },
                    ProgramCell::missing(b),
                ],
            }],
            overall: vec![
                OverallSummary {
                    program_id: a,
                    program_name: "Informatics".to_string(),
                    overall_mean: 3.6667,
                    total_responses: 12,
                    total_surveys: 2,
                    satisfaction_rate: 73.3,
                },
                OverallSummary {
                    program_id: b,
                    program_name: "Mathematics".to_string(),
                    overall_mean: 0.0,
                    total_responses: 0,
                    total_surveys: 0,
                    satisfaction_rate: 0.0,
                },
            ],
            best_program: Some(a),
        }
    }

    #[test]
    fn missing_cells_render_as_not_available() {
        let report = build_comparison_report(&comparison());
        assert!(report.contains("| Course Evaluation | 3.67 (12 resp.) | n/a |"));
        assert!(report.contains("- Informatics (best): mean 3.67"));
    }

    #[test]
    fn csv_leaves_missing_scores_empty() {
        let csv = comparison_to_csv(&comparison()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].ends_with(",Informatics,true,3.6667,12"));
        assert!(lines[2].ends_with(",Mathematics,false,,0"));
    }
}
