use std::collections::{BTreeMap, HashMap};

use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::aggregate::{satisfaction_rate, survey_scores, ScoreSummary};
use crate::classify::Classifier;
use crate::error::{Result, StoreError, ValidationError};
use crate::models::{
    normalize_label, ComparisonResult, OverallSummary, Program, ProgramCell, SurveyFilter,
    SurveyTypeRow,
};
use crate::store::{SurveyBundle, SurveyLoader};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRequest {
    pub program_ids: Vec<Uuid>,
    pub academic_year: Option<String>,
    pub semester: Option<String>,
}

/// A request that passed validation: a year is set and at least two
/// distinct programs are selected.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidComparison {
    pub program_ids: Vec<Uuid>,
    pub academic_year: String,
    pub semester: Option<String>,
}

impl ValidComparison {
    pub fn filter(&self) -> SurveyFilter {
        SurveyFilter {
            academic_year: Some(self.academic_year.clone()),
            semester: self.semester.clone(),
        }
    }
}

impl ComparisonRequest {
    pub fn validate(&self) -> Result<ValidComparison, ValidationError> {
        let academic_year = self
            .academic_year
            .as_deref()
            .map(str::trim)
            .filter(|year| !year.is_empty())
            .ok_or(ValidationError::MissingAcademicYear)?;

        let mut program_ids = Vec::with_capacity(self.program_ids.len());
        for id in &self.program_ids {
            if !program_ids.contains(id) {
                program_ids.push(*id);
            }
        }
        if program_ids.len() < 2 {
            return Err(ValidationError::TooFewPrograms {
                selected: program_ids.len(),
            });
        }

        let semester = normalize_label(self.semester.as_deref());

        Ok(ValidComparison {
            program_ids,
            academic_year: academic_year.to_string(),
            semester,
        })
    }
}

#[derive(Debug, Clone, Default)]
struct TypeTally {
    scores: Vec<f64>,
    responses: usize,
}

/// Raw scores of one program, overall and per classified survey type.
#[derive(Debug, Clone)]
pub struct ProgramTally {
    pub program_id: Uuid,
    pub surveys: usize,
    pub responses: usize,
    scores: Vec<f64>,
    by_type: BTreeMap<String, TypeTally>,
}

pub fn tally_program(
    program_id: Uuid,
    bundles: &[SurveyBundle],
    classifier: &Classifier,
) -> ProgramTally {
    let mut tally = ProgramTally {
        program_id,
        surveys: bundles.len(),
        responses: 0,
        scores: Vec::new(),
        by_type: BTreeMap::new(),
    };

    for bundle in bundles {
        let scores = survey_scores(bundle);
        let survey_type = classifier.classify(&bundle.survey.title);
        let entry = tally.by_type.entry(survey_type).or_default();
        entry.scores.extend_from_slice(&scores);
        entry.responses += bundle.responses.len();

        tally.responses += bundle.responses.len();
        tally.scores.extend(scores);
    }

    tally
}

/// Builds the type x program matrix. `programs` and `tallies` are both in
/// the caller's selection order.
pub fn build_comparison(
    selection: &ValidComparison,
    programs: &[Program],
    tallies: &[ProgramTally],
) -> ComparisonResult {
    let mut types: Vec<&str> = tallies
        .iter()
        .flat_map(|t| t.by_type.keys().map(String::as_str))
        .collect();
    types.sort_unstable();
    types.dedup();

    let survey_types = types
        .into_iter()
        .map(|title| SurveyTypeRow {
            title: title.to_string(),
            program_data: tallies
                .iter()
                .map(|tally| match tally.by_type.get(title) {
                    Some(type_tally) => ProgramCell {
                        program_id: tally.program_id,
                        average_score: ScoreSummary::from_scores(&type_tally.scores).mean,
                        response_count: type_tally.responses,
                        exists: true,
                    },
                    None => ProgramCell::missing(tally.program_id),
                })
                .collect(),
        })
        .collect();

    let overall: Vec<OverallSummary> = tallies
        .iter()
        .map(|tally| {
            let overall_mean = ScoreSummary::from_scores(&tally.scores).mean;
            OverallSummary {
                program_id: tally.program_id,
                program_name: programs
                    .iter()
                    .find(|p| p.id == tally.program_id)
                    .map(|p| p.name.clone())
                    .unwrap_or_default(),
                overall_mean,
                total_responses: tally.responses,
                total_surveys: tally.surveys,
                satisfaction_rate: satisfaction_rate(overall_mean),
            }
        })
        .collect();

    ComparisonResult {
        academic_year: selection.academic_year.clone(),
        semester: selection.semester.clone(),
        best_program: best_program(&overall),
        survey_types,
        overall,
    }
}

/// Highest overall mean wins; on a tie the earlier program keeps the lead.
/// Only an empty selection has no best program.
pub fn best_program(overall: &[OverallSummary]) -> Option<Uuid> {
    let mut best: Option<&OverallSummary> = None;
    for summary in overall {
        match best {
            Some(current) if summary.overall_mean <= current.overall_mean => {}
            _ => best = Some(summary),
        }
    }
    best.map(|s| s.program_id)
}

/// Validates the request, then loads and tallies every selected program
/// concurrently.
pub async fn compare_programs(
    loader: &SurveyLoader<'_>,
    classifier: &Classifier,
    request: &ComparisonRequest,
) -> Result<ComparisonResult> {
    let selection = request.validate()?;
    let filter = selection.filter();

    let programs = loader.programs(&selection.program_ids).await?;
    if let Some(missing) = selection
        .program_ids
        .iter()
        .find(|id| !programs.iter().any(|p| p.id == **id))
    {
        return Err(ValidationError::UnknownProgram(*missing).into());
    }

    let tallies = try_join_all(selection.program_ids.iter().map(|&program_id| {
        let filter = &filter;
        async move {
            let bundles = loader.surveys(program_id, filter).await?;
            debug!(%program_id, surveys = bundles.len(), "program surveys loaded");
            Ok::<_, StoreError>(tally_program(program_id, &bundles, classifier))
        }
    }))
    .await?;

    let mut by_program: HashMap<Uuid, ProgramTally> =
        tallies.into_iter().map(|t| (t.program_id, t)).collect();
    let ordered: Vec<ProgramTally> = selection
        .program_ids
        .iter()
        .filter_map(|id| by_program.remove(id))
        .collect();

    let result = build_comparison(&selection, &programs, &ordered);
    info!(
        programs = ordered.len(),
        survey_types = result.survey_types.len(),
        academic_year = %result.academic_year,
        "comparison built"
    );
    Ok(result)
}
