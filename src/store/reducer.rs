use super::state::{
    CourseDetailsPatch, CourseState, GradedKind, GradedSet, MarkMatrix, Outcome, Question,
};
use super::StoreError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Action {
    SetCourseDetails {
        details: CourseDetailsPatch,
    },
    SetStudentData {
        rows: Vec<Map<String, Value>>,
    },
    SetHeaders {
        headers: Vec<String>,
    },
    ImportRoster {
        headers: Vec<String>,
        rows: Vec<Map<String, Value>>,
    },
    AddOutcome,
    UpdateOutcome {
        id: u32,
        statement: Option<String>,
        target: Option<f64>,
    },
    RemoveOutcome {
        id: u32,
    },
    SetOutcomes {
        outcomes: Vec<Outcome>,
    },
    AddGradedSet {
        kind: GradedKind,
        name: Option<String>,
    },
    RemoveGradedSet {
        kind: GradedKind,
        id: u32,
    },
    RenameGradedSet {
        kind: GradedKind,
        id: u32,
        name: String,
    },
    SetQuestions {
        kind: GradedKind,
        set_id: u32,
        questions: Vec<Question>,
    },
    AddQuestion {
        kind: GradedKind,
        set_id: u32,
    },
    UpdateQuestion {
        kind: GradedKind,
        set_id: u32,
        question: Question,
    },
    RemoveQuestion {
        kind: GradedKind,
        set_id: u32,
        question_id: u32,
    },
    SetMark {
        kind: GradedKind,
        set_id: u32,
        row: usize,
        question_id: u32,
        mark: Option<f64>,
    },
    SetCoMark {
        row: usize,
        outcome_id: u32,
        mark: Option<f64>,
    },
    Reset,
}

/// Applies one action to a snapshot and returns the next snapshot. The
/// input is never modified, so a failed action leaves the caller's state
/// as it was.
pub fn reduce(state: &CourseState, action: Action) -> Result<CourseState, StoreError> {
    let mut next = state.clone();
    match action {
        Action::SetCourseDetails { details } => {
            next.course_details = state.course_details.merged(details);
        }
        Action::SetStudentData { rows } => next.student_data = rows,
        Action::SetHeaders { headers } => next.headers = headers,
        Action::ImportRoster { headers, rows } => {
            next.headers = headers;
            next.student_data = rows;
        }
        Action::AddOutcome => {
            let id = next.outcomes.len() as u32 + 1;
            next.outcomes.push(Outcome::blank(id));
        }
        Action::UpdateOutcome {
            id,
            statement,
            target,
        } => {
            let outcome = next
                .outcomes
                .iter_mut()
                .find(|o| o.id == id)
                .ok_or(StoreError::NotFound("outcome", id))?;
            if let Some(s) = statement {
                outcome.statement = s;
            }
            if let Some(t) = target {
                outcome.target = t;
            }
        }
        Action::RemoveOutcome { id } => {
            let pos = next
                .outcomes
                .iter()
                .position(|o| o.id == id)
                .ok_or(StoreError::NotFound("outcome", id))?;
            next.outcomes.remove(pos);
            renumber_outcomes(&mut next.outcomes);
            shift_marks(&mut next.co_marks, id);
        }
        Action::SetOutcomes { mut outcomes } => {
            renumber_outcomes(&mut outcomes);
            next.outcomes = outcomes;
        }
        Action::AddGradedSet { kind, name } => {
            let sets = next.sets_mut(kind);
            let id = sets.iter().map(|s| s.id).max().map_or(1, |m| m + 1);
            let name = name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| kind.default_name(sets.len()));
            sets.push(GradedSet::new(id, name));
        }
        Action::RemoveGradedSet { kind, id } => {
            let sets = next.sets_mut(kind);
            let before = sets.len();
            sets.retain(|s| s.id != id);
            if sets.len() == before {
                return Err(StoreError::NotFound(kind.label(), id));
            }
        }
        Action::RenameGradedSet { kind, id, name } => {
            find_set(&mut next, kind, id)?.name = name;
        }
        Action::SetQuestions {
            kind,
            set_id,
            mut questions,
        } => {
            renumber_questions(&mut questions);
            let set = find_set(&mut next, kind, set_id)?;
            let count = questions.len() as u32;
            for per_row in set.marks.values_mut() {
                per_row.retain(|id, _| *id <= count);
            }
            set.marks.retain(|_, per_row| !per_row.is_empty());
            set.questions = questions;
        }
        Action::AddQuestion { kind, set_id } => {
            let set = find_set(&mut next, kind, set_id)?;
            let id = set.questions.len() as u32 + 1;
            set.questions.push(Question::blank(id));
        }
        Action::UpdateQuestion {
            kind,
            set_id,
            question,
        } => {
            let set = find_set(&mut next, kind, set_id)?;
            let slot = set
                .questions
                .iter_mut()
                .find(|q| q.id == question.id)
                .ok_or(StoreError::NotFound("question", question.id))?;
            *slot = question;
        }
        Action::RemoveQuestion {
            kind,
            set_id,
            question_id,
        } => {
            let set = find_set(&mut next, kind, set_id)?;
            let pos = set
                .questions
                .iter()
                .position(|q| q.id == question_id)
                .ok_or(StoreError::NotFound("question", question_id))?;
            set.questions.remove(pos);
            renumber_questions(&mut set.questions);
            shift_marks(&mut set.marks, question_id);
        }
        Action::SetMark {
            kind,
            set_id,
            row,
            question_id,
            mark,
        } => {
            let set = find_set(&mut next, kind, set_id)?;
            put_mark(&mut set.marks, row, question_id, mark);
        }
        Action::SetCoMark {
            row,
            outcome_id,
            mark,
        } => put_mark(&mut next.co_marks, row, outcome_id, mark),
        Action::Reset => next = CourseState::default(),
    }
    Ok(next)
}

fn find_set(state: &mut CourseState, kind: GradedKind, id: u32) -> Result<&mut GradedSet, StoreError> {
    state
        .sets_mut(kind)
        .iter_mut()
        .find(|s| s.id == id)
        .ok_or(StoreError::NotFound(kind.label(), id))
}

fn renumber_outcomes(outcomes: &mut [Outcome]) {
    for (i, o) in outcomes.iter_mut().enumerate() {
        o.id = i as u32 + 1;
    }
}

fn renumber_questions(questions: &mut [Question]) {
    for (i, q) in questions.iter_mut().enumerate() {
        q.id = i as u32 + 1;
    }
}

/// Drops marks for `removed` and moves higher ids down by one so marks stay
/// attached to the same item after renumbering.
fn shift_marks(marks: &mut MarkMatrix, removed: u32) {
    for per_row in marks.values_mut() {
        *per_row = std::mem::take(per_row)
            .into_iter()
            .filter(|(id, _)| *id != removed)
            .map(|(id, v)| if id > removed { (id - 1, v) } else { (id, v) })
            .collect();
    }
    marks.retain(|_, per_row| !per_row.is_empty());
}

fn put_mark(marks: &mut MarkMatrix, row: usize, item: u32, mark: Option<f64>) {
    match mark {
        Some(v) => {
            marks.entry(row).or_default().insert(item, v);
        }
        None => {
            if let Some(per_row) = marks.get_mut(&row) {
                per_row.remove(&item);
                if per_row.is_empty() {
                    marks.remove(&row);
                }
            }
        }
    }
}
