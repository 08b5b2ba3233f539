use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "meal_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Attendance {
    pub id: Uuid,
    pub student_id: Uuid,
    pub attendance_date: NaiveDate,
    pub meal_type: MealType,
    pub is_present: bool,
    pub notes: Option<String>,
    pub recorded_by: Uuid,
    pub recorded_at: DateTime<Utc>,
}

/// One record per (student, date, meal); submitting the same key again
/// overwrites presence and notes.
#[derive(Debug, Deserialize)]
pub struct AttendanceInput {
    pub student_id: Uuid,
    pub attendance_date: NaiveDate,
    pub meal_type: MealType,
    pub is_present: bool,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct AttendanceDisplay {
    pub id: Uuid,
    pub student_id: Uuid,
    pub attendance_date: NaiveDate,
    pub meal_type: MealType,
    pub is_present: bool,
    pub notes: Option<String>,
    pub recorded_by: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub first_name: String,
    pub last_name: String,
    pub grade: Option<String>,
    pub class_name: Option<String>,
    pub recorded_by_name: String,
}
