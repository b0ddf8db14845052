use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Row index → item id → mark. Absence means "no mark entered".
pub type MarkMatrix = BTreeMap<usize, BTreeMap<u32, f64>>;

pub const DEFAULT_OUTCOME_TARGET: f64 = 60.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CourseDetails {
    pub academic_year: String,
    pub batch: String,
    pub exam_season: String,
    pub course_code: String,
    pub semester: String,
    pub credits: String,
    pub faculty_name: String,
    pub branch: String,
}

/// Partial update for [`CourseDetails`]; only `Some` fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CourseDetailsPatch {
    pub academic_year: Option<String>,
    pub batch: Option<String>,
    pub exam_season: Option<String>,
    pub course_code: Option<String>,
    pub semester: Option<String>,
    pub credits: Option<String>,
    pub faculty_name: Option<String>,
    pub branch: Option<String>,
}

impl CourseDetails {
    pub fn merged(&self, patch: CourseDetailsPatch) -> CourseDetails {
        CourseDetails {
            academic_year: patch.academic_year.unwrap_or_else(|| self.academic_year.clone()),
            batch: patch.batch.unwrap_or_else(|| self.batch.clone()),
            exam_season: patch.exam_season.unwrap_or_else(|| self.exam_season.clone()),
            course_code: patch.course_code.unwrap_or_else(|| self.course_code.clone()),
            semester: patch.semester.unwrap_or_else(|| self.semester.clone()),
            credits: patch.credits.unwrap_or_else(|| self.credits.clone()),
            faculty_name: patch.faculty_name.unwrap_or_else(|| self.faculty_name.clone()),
            branch: patch.branch.unwrap_or_else(|| self.branch.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub id: u32,
    #[serde(default)]
    pub statement: String,
    #[serde(default = "default_target")]
    pub target: f64,
}

fn default_target() -> f64 {
    DEFAULT_OUTCOME_TARGET
}

impl Outcome {
    pub fn blank(id: u32) -> Self {
        Outcome {
            id,
            statement: String::new(),
            target: DEFAULT_OUTCOME_TARGET,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Question {
    pub id: u32,
    pub text: String,
    pub marks: Option<f64>,
    /// Outcome-mapping code, e.g. "CO2".
    pub co: String,
    /// Cognitive-level tag, e.g. "L3".
    pub bl: String,
}

impl Question {
    pub fn blank(id: u32) -> Self {
        Question {
            id,
            ..Question::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GradedKind {
    QuestionPaper,
    Assessment,
}

impl GradedKind {
    pub fn default_name(self, existing: usize) -> String {
        match self {
            GradedKind::QuestionPaper => format!("Question Paper {}", existing + 1),
            GradedKind::Assessment => format!("Assessment {}", existing + 1),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GradedKind::QuestionPaper => "question paper",
            GradedKind::Assessment => "assessment",
        }
    }
}

/// A question paper or an assessment: its own question list plus a mark
/// matrix keyed by roster row index and question id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradedSet {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub marks: MarkMatrix,
}

impl GradedSet {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        GradedSet {
            id,
            name: name.into(),
            questions: vec![Question::blank(1)],
            marks: MarkMatrix::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CourseState {
    pub course_details: CourseDetails,
    pub student_data: Vec<Map<String, Value>>,
    pub headers: Vec<String>,
    pub outcomes: Vec<Outcome>,
    pub question_papers: Vec<GradedSet>,
    pub course_assessments: Vec<GradedSet>,
    pub co_marks: MarkMatrix,
}

impl Default for CourseState {
    fn default() -> Self {
        CourseState {
            course_details: CourseDetails::default(),
            student_data: Vec::new(),
            headers: Vec::new(),
            outcomes: vec![Outcome::blank(1)],
            question_papers: vec![GradedSet::new(1, "End Semester Question Paper")],
            course_assessments: vec![GradedSet::new(1, "Assessment 1")],
            co_marks: MarkMatrix::new(),
        }
    }
}

impl CourseState {
    pub fn sets_mut(&mut self, kind: GradedKind) -> &mut Vec<GradedSet> {
        match kind {
            GradedKind::QuestionPaper => &mut self.question_papers,
            GradedKind::Assessment => &mut self.course_assessments,
        }
    }
}
