//! Data shapes exchanged with the backend.

use serde::{Deserialize, Serialize};

/// An elective subject from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub id: i64,
    pub code: String,
    pub name: String,
    #[serde(rename = "abstract")]
    pub summary: String,
    pub subject_info: SubjectInfo,
}

/// Catalog details of a subject. Everything here is display data, so
/// missing fields fall back to defaults rather than failing the fetch.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SubjectInfo {
    pub level: i64,
    pub semester: i64,
    /// "W" for winter, "S" for summer
    pub season: String,
    pub activated: bool,
    pub mandatory: bool,
    pub professors: Vec<String>,
    pub assistants: Vec<String>,
    pub mandatory_for: Vec<String>,
    pub elective_for: Vec<String>,
    pub tags: Vec<String>,
    pub technologies: Vec<String>,
    pub evaluation: Vec<String>,
    pub participants: Vec<i64>,
}

/// A student's submitted form, as returned by the backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StudentData {
    pub id: i64,
    pub index: String,
    pub study_track: String,
    pub current_year: i64,
    pub study_effort: String,
    #[serde(default)]
    pub passed_subjects: Vec<Subject>,
    #[serde(default)]
    pub preferred_domains: Vec<String>,
    #[serde(default)]
    pub preferred_technologies: Vec<String>,
    #[serde(default)]
    pub preferred_evaluation: Vec<String>,
    #[serde(default)]
    pub favorite_professors: Vec<String>,
}

/// A student form submission. Passed subjects are sent by id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentForm {
    pub index: String,
    pub study_track: String,
    pub current_year: i64,
    pub study_effort: String,
    pub passed_subjects: Vec<i64>,
    pub preferred_domains: Vec<String>,
    pub preferred_technologies: Vec<String>,
    pub preferred_evaluation: Vec<String>,
    pub favorite_professors: Vec<String>,
}

/// The student's subject preferences, as sets of subject ids.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub favorite_ids: Vec<i64>,
    #[serde(default)]
    pub liked_ids: Vec<i64>,
    #[serde(default)]
    pub disliked_ids: Vec<i64>,
}

/// Which preference bucket a toggle applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PreferenceKind {
    Favorite,
    Liked,
    Disliked,
}

/// A published review of a subject.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Review {
    pub id: i64,
    pub subject: String,
    pub text: String,
    #[serde(default)]
    pub votes: i64,
}

/// A review to submit for a subject.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewReview {
    pub subject: String,
    pub text: String,
}
