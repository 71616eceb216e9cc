//! SeaORM entity models
//!
//! Database entities for the hosted learning schema

mod course;
mod course_lesson;
mod course_module;
mod learning_topic;

pub use learning_topic::{
    Entity as LearningTopicEntity,
    Model as LearningTopic,
    ActiveModel as LearningTopicActiveModel,
    Column as LearningTopicColumn,
    Difficulty,
    Priority,
    TopicStatus,
};

pub use course::{
    Entity as CourseEntity,
    Model as Course,
    ActiveModel as CourseActiveModel,
    Column as CourseColumn,
    CourseStatus,
};

pub use course_module::{
    Entity as CourseModuleEntity,
    Model as CourseModule,
    ActiveModel as CourseModuleActiveModel,
    Column as CourseModuleColumn,
};

pub use course_lesson::{
    Entity as CourseLessonEntity,
    Model as CourseLesson,
    ActiveModel as CourseLessonActiveModel,
    Column as CourseLessonColumn,
};
