use std::collections::BTreeMap;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    Answer, Complaint, ComplaintStatus, Course, Program, Question, QuestionType, Response, Survey,
    SurveyCourse, SurveyFilter,
};
use crate::store::ResponseStore;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Postgres-backed response store. Read-only.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn decode_err(field: &'static str, err: impl std::fmt::Display) -> StoreError {
    StoreError::Decode {
        field,
        message: err.to_string(),
    }
}

fn survey_from_row(row: &PgRow) -> Result<Survey, StoreError> {
    Ok(Survey {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        program_id: row.try_get("program_id")?,
        academic_year: row.try_get("academic_year")?,
        semester: row.try_get("semester")?,
    })
}

#[async_trait]
impl ResponseStore for PgStore {
    async fn programs(&self, ids: &[Uuid]) -> Result<Vec<Program>, StoreError> {
        let rows = sqlx::query("SELECT id, name FROM quality.programs WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        let mut programs = Vec::with_capacity(rows.len());
        for row in rows {
            programs.push(Program {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
            });
        }
        Ok(programs)
    }

    async fn surveys(
        &self,
        program_id: Uuid,
        filter: &SurveyFilter,
    ) -> Result<Vec<Survey>, StoreError> {
        let mut query = String::from(
            "SELECT id, title, program_id, academic_year, semester \
             FROM quality.surveys \
             WHERE program_id = $1",
        );

        let mut next = 2;
        if filter.academic_year.is_some() {
            query.push_str(&format!(" AND academic_year = ${next}"));
            next += 1;
        }
        if filter.semester.is_some() {
            query.push_str(&format!(" AND semester = ${next}"));
        }
        query.push_str(" ORDER BY created_at, title");

        let mut rows = sqlx::query(&query).bind(program_id);
        if let Some(year) = &filter.academic_year {
            rows = rows.bind(year);
        }
        if let Some(semester) = &filter.semester {
            rows = rows.bind(semester);
        }

        let records = rows.fetch_all(&self.pool).await?;
        records.iter().map(survey_from_row).collect()
    }

    async fn questions(&self, survey_id: Uuid) -> Result<Vec<Question>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, survey_id, question_type, prompt, options \
             FROM quality.questions \
             WHERE survey_id = $1 \
             ORDER BY position, id",
        )
        .bind(survey_id)
        .fetch_all(&self.pool)
        .await?;

        let mut questions = Vec::with_capacity(rows.len());
        for row in rows {
            let raw_type: String = row.try_get("question_type")?;
            questions.push(Question {
                id: row.try_get("id")?,
                survey_id: row.try_get("survey_id")?,
                question_type: raw_type
                    .parse::<QuestionType>()
                    .map_err(|e| decode_err("questions.question_type", e))?,
                prompt: row.try_get("prompt")?,
                options: row.try_get("options")?,
            });
        }
        Ok(questions)
    }

    async fn responses(&self, survey_id: Uuid) -> Result<Vec<Response>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, survey_id, submitted_at FROM quality.responses WHERE survey_id = $1",
        )
        .bind(survey_id)
        .fetch_all(&self.pool)
        .await?;

        let mut responses = Vec::with_capacity(rows.len());
        for row in rows {
            responses.push(Response {
                id: row.try_get("id")?,
                survey_id: row.try_get("survey_id")?,
                submitted_at: row.try_get("submitted_at")?,
            });
        }
        Ok(responses)
    }

    async fn answers(&self, survey_id: Uuid) -> Result<Vec<Answer>, StoreError> {
        let rows = sqlx::query(
            "SELECT a.response_id, a.question_id, a.numeric_value, a.value \
             FROM quality.answers a \
             JOIN quality.responses r ON r.id = a.response_id \
             WHERE r.survey_id = $1",
        )
        .bind(survey_id)
        .fetch_all(&self.pool)
        .await?;

        let mut answers = Vec::with_capacity(rows.len());
        for row in rows {
            answers.push(Answer {
                response_id: row.try_get("response_id")?,
                question_id: row.try_get("question_id")?,
                numeric_value: row.try_get("numeric_value")?,
                value: row.try_get("value")?,
            });
        }
        Ok(answers)
    }

    async fn complaints(&self, program_id: Uuid) -> Result<Vec<Complaint>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, program_id, status, complainant_type, subject, created_at \
             FROM quality.complaints \
             WHERE program_id = $1",
        )
        .bind(program_id)
        .fetch_all(&self.pool)
        .await?;

        let mut complaints = Vec::with_capacity(rows.len());
        for row in rows {
            let raw_status: String = row.try_get("status")?;
            complaints.push(Complaint {
                id: row.try_get("id")?,
                program_id: row.try_get("program_id")?,
                status: raw_status
                    .parse::<ComplaintStatus>()
                    .map_err(|e| decode_err("complaints.status", e))?,
                complainant_type: row.try_get("complainant_type")?,
                subject: row.try_get("subject")?,
                created_at: row.try_get("created_at")?,
            });
        }
        Ok(complaints)
    }

    async fn courses(&self, program_id: Uuid) -> Result<Vec<Course>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, program_id, code, name FROM quality.courses WHERE program_id = $1",
        )
        .bind(program_id)
        .fetch_all(&self.pool)
        .await?;

        let mut courses = Vec::with_capacity(rows.len());
        for row in rows {
            courses.push(Course {
                id: row.try_get("id")?,
                program_id: row.try_get("program_id")?,
                code: row.try_get("code")?,
                name: row.try_get("name")?,
            });
        }
        Ok(courses)
    }

    async fn survey_courses(&self, program_id: Uuid) -> Result<Vec<SurveyCourse>, StoreError> {
        let rows = sqlx::query(
            "SELECT sc.survey_id, sc.course_id \
             FROM quality.survey_courses sc \
             JOIN quality.courses c ON c.id = sc.course_id \
             WHERE c.program_id = $1",
        )
        .bind(program_id)
        .fetch_all(&self.pool)
        .await?;

        let mut links = Vec::with_capacity(rows.len());
        for row in rows {
            links.push(SurveyCourse {
                survey_id: row.try_get("survey_id")?,
                course_id: row.try_get("course_id")?,
            });
        }
        Ok(links)
    }
}

pub async fn list_programs(pool: &PgPool) -> anyhow::Result<Vec<Program>> {
    let rows = sqlx::query("SELECT id, name FROM quality.programs ORDER BY name")
        .fetch_all(pool)
        .await?;

    let mut programs = Vec::new();
    for row in rows {
        programs.push(Program {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
        });
    }
    Ok(programs)
}

struct SeedSurvey {
    id: u128,
    program: u128,
    course: Option<u128>,
    title: &'static str,
    semester: &'static str,
    /// One entry per respondent: scores for the two numeric questions.
    scores: &'static [(i32, i32)],
}

const INFORMATICS: u128 = 0x7a1c_0001;
const MATHEMATICS: u128 = 0x7a1c_0002;
const SEED_YEAR: &str = "2025/2026";

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let programs = [(INFORMATICS, "Informatics"), (MATHEMATICS, "Mathematics")];
    for (id, name) in programs {
        sqlx::query(
            r#"
            INSERT INTO quality.programs (id, name)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name
            "#,
        )
        .bind(Uuid::from_u128(id))
        .bind(name)
        .execute(pool)
        .await?;
    }

    let courses = [
        (0x7a1c_0101, INFORMATICS, "IF201", "Algorithms and Data Structures"),
        (0x7a1c_0102, INFORMATICS, "IF305", "Database Systems"),
        (0x7a1c_0201, MATHEMATICS, "MA101", "Calculus I"),
    ];
    for (id, program, code, name) in courses {
        sqlx::query(
            r#"
            INSERT INTO quality.courses (id, program_id, code, name)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(Uuid::from_u128(id))
        .bind(Uuid::from_u128(program))
        .bind(code)
        .bind(name)
        .execute(pool)
        .await?;
    }

    let surveys = [
        SeedSurvey {
            id: 0x7a1c_1001,
            program: INFORMATICS,
            course: Some(0x7a1c_0101),
            title: "Course Evaluation: Algorithms",
            semester: "odd",
            scores: &[(4, 5), (4, 4), (5, 4), (3, 4), (4, 4), (4, 3), (5, 5), (4, 4)],
        },
        SeedSurvey {
            id: 0x7a1c_1002,
            program: INFORMATICS,
            course: Some(0x7a1c_0102),
            title: "Course Evaluation: Databases",
            semester: "even",
            scores: &[(2, 3), (3, 2)],
        },
        SeedSurvey {
            id: 0x7a1c_1003,
            program: INFORMATICS,
            course: None,
            title: "Alumni Tracer Study",
            semester: "even",
            scores: &[(4, 4), (5, 4), (3, 4)],
        },
        SeedSurvey {
            id: 0x7a1c_2001,
            program: MATHEMATICS,
            course: Some(0x7a1c_0201),
            title: "Course Evaluation: Calculus",
            semester: "odd",
            scores: &[(3, 3), (3, 4), (4, 3), (2, 3), (3, 3)],
        },
        SeedSurvey {
            id: 0x7a1c_2002,
            program: MATHEMATICS,
            course: None,
            title: "Library and Facilities Feedback",
            semester: "odd",
            scores: &[(2, 3), (4, 3), (3, 3)],
        },
    ];

    for survey in &surveys {
        seed_survey(pool, survey).await?;
    }

    let base = Utc
        .with_ymd_and_hms(2026, 2, 2, 9, 0, 0)
        .single()
        .context("invalid seed timestamp")?;
    let complaints = [
        (0x7a1c_3001, INFORMATICS, "pending", "student", "Lab machines outdated", 1),
        (0x7a1c_3002, INFORMATICS, "resolved", "student", "Exam schedule clash", 12),
        (0x7a1c_3003, INFORMATICS, "closed", "lecturer", "Projector in room 204", 30),
        (0x7a1c_3004, MATHEMATICS, "in_progress", "student", "Tutorial slots full", 4),
    ];
    for (id, program, status, complainant_type, subject, days_ago) in complaints {
        sqlx::query(
            r#"
            INSERT INTO quality.complaints
            (id, program_id, status, complainant_type, subject, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(Uuid::from_u128(id))
        .bind(Uuid::from_u128(program))
        .bind(status)
        .bind(complainant_type)
        .bind(subject)
        .bind(base - Duration::days(days_ago))
        .execute(pool)
        .await?;
    }

    Ok(())
}

async fn seed_survey(pool: &PgPool, seed: &SeedSurvey) -> anyhow::Result<()> {
    let survey_id = Uuid::from_u128(seed.id);
    sqlx::query(
        r#"
        INSERT INTO quality.surveys (id, program_id, title, academic_year, semester)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(survey_id)
    .bind(Uuid::from_u128(seed.program))
    .bind(seed.title)
    .bind(SEED_YEAR)
    .bind(seed.semester)
    .execute(pool)
    .await?;

    if let Some(course) = seed.course {
        sqlx::query(
            r#"
            INSERT INTO quality.survey_courses (survey_id, course_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(survey_id)
        .bind(Uuid::from_u128(course))
        .execute(pool)
        .await?;
    }

    let questions = [
        (1u128, "likert", "The material was clearly explained", Vec::<String>::new()),
        (2, "rating", "Rate the overall experience", Vec::new()),
        (
            3,
            "mcq",
            "Would you recommend it?",
            vec!["Yes".to_string(), "No".to_string()],
        ),
        (4, "text", "Any suggestions?", Vec::new()),
    ];
    let question_id = |n: u128| Uuid::from_u128((seed.id << 8) | n);
    for (position, (n, question_type, prompt, options)) in questions.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO quality.questions
            (id, survey_id, question_type, prompt, options, position)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(question_id(*n))
        .bind(survey_id)
        .bind(*question_type)
        .bind(*prompt)
        .bind(options)
        .bind(position as i32)
        .execute(pool)
        .await?;
    }

    for (index, (likert, rating)) in seed.scores.iter().enumerate() {
        let source_key = format!("seed-{survey_id}-{index}");
        let response_id: Option<Uuid> = sqlx::query(
            r#"
            INSERT INTO quality.responses (id, survey_id, source_key)
            VALUES ($1, $2, $3)
            ON CONFLICT (source_key) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(survey_id)
        .bind(&source_key)
        .fetch_optional(pool)
        .await?
        .map(|row| row.try_get("id"))
        .transpose()?;

        let Some(response_id) = response_id else {
            continue;
        };

        let recommend = if likert + rating >= 7 { "Yes" } else { "No" };
        let suggestion = (index % 3 == 0).then_some("More worked examples, please");
        let answers = [
            (question_id(1), Some(*likert), None),
            (question_id(2), Some(*rating), None),
            (question_id(3), None, Some(recommend)),
            (question_id(4), None, suggestion),
        ];
        for (answered, numeric_value, value) in answers {
            insert_answer(pool, response_id, answered, numeric_value, value).await?;
        }
    }

    Ok(())
}

async fn insert_answer<'e, E>(
    executor: E,
    response_id: Uuid,
    question_id: Uuid,
    numeric_value: Option<i32>,
    value: Option<&str>,
) -> anyhow::Result<()>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO quality.answers (id, response_id, question_id, numeric_value, value)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(response_id)
    .bind(question_id)
    .bind(numeric_value)
    .bind(value)
    .execute(executor)
    .await?;
    Ok(())
}

/// Imports respondent answers. Rows sharing a `respondent_key` within a
/// survey form one response; respondents already imported are skipped.
pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        survey_id: Uuid,
        respondent_key: String,
        question_id: Uuid,
        numeric_value: Option<i32>,
        value: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed opening {}", csv_path.display()))?;
    let mut grouped: BTreeMap<(Uuid, String), Vec<CsvRow>> = BTreeMap::new();
    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        grouped
            .entry((row.survey_id, row.respondent_key.clone()))
            .or_default()
            .push(row);
    }

    let mut tx = pool.begin().await?;
    let mut inserted = 0usize;

    for ((survey_id, respondent_key), rows) in grouped {
        let source_key = format!("import-{survey_id}-{respondent_key}");
        let response_id: Option<Uuid> = sqlx::query(
            r#"
            INSERT INTO quality.responses (id, survey_id, source_key)
            VALUES ($1, $2, $3)
            ON CONFLICT (source_key) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(survey_id)
        .bind(&source_key)
        .fetch_optional(&mut *tx)
        .await?
        .map(|row| row.try_get("id"))
        .transpose()?;

        let Some(response_id) = response_id else {
            continue;
        };

        for row in rows {
            insert_answer(
                &mut *tx,
                response_id,
                row.question_id,
                row.numeric_value,
                row.value.as_deref().filter(|v| !v.is_empty()),
            )
            .await?;
        }
        inserted += 1;
    }

    tx.commit().await?;
    Ok(inserted)
}
