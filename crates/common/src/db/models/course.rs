//! Course entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Course status enum
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseStatus {
    Draft,
    Active,
    Archived,
}

impl From<CourseStatus> for String {
    fn from(status: CourseStatus) -> Self {
        match status {
            CourseStatus::Draft => "draft".to_string(),
            CourseStatus::Active => "active".to_string(),
            CourseStatus::Archived => "archived".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "courses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub learning_topic_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub short_summary: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub difficulty: Option<String>,

    pub estimated_total_minutes: Option<i32>,

    #[sea_orm(column_type = "Text")]
    pub status: String,

    /// The user prompt the course was generated from
    #[sea_orm(column_type = "Text", nullable)]
    pub source_prompt: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::learning_topic::Entity",
        from = "Column::LearningTopicId",
        to = "super::learning_topic::Column::Id"
    )]
    LearningTopic,

    #[sea_orm(has_many = "super::course_module::Entity")]
    Modules,
}

impl Related<super::learning_topic::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LearningTopic.def()
    }
}

impl Related<super::course_module::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Modules.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
