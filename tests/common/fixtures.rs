use criteria_core::config::CriteriaConfig;
use criteria_core::criteria::CriteriaContext;
use criteria_core::metadata::{Entity, MetadataRegistry, TableDescriptor};
use std::sync::Arc;

pub struct Exam;

impl Entity for Exam {
    const NAME: &'static str = "Exam";

    fn describe() -> TableDescriptor {
        TableDescriptor::new(Self::NAME, "exam")
            .id("id", "id")
            .column("studentId", "student_id")
            .column("grade", "grade")
            .column("score", "score")
            .readonly("createdAt", "created_at")
    }
}

pub struct Student;

impl Entity for Student {
    const NAME: &'static str = "Student";

    fn describe() -> TableDescriptor {
        TableDescriptor::new(Self::NAME, "student")
            .id("id", "id")
            .column("name", "name")
            .column("classId", "class_id")
    }
}

pub struct Score;

impl Entity for Score {
    const NAME: &'static str = "Score";

    fn describe() -> TableDescriptor {
        TableDescriptor::new(Self::NAME, "score")
            .id("id", "id")
            .column("examId", "exam_id")
            .column("points", "points")
    }
}

/// Columns of `exam` in declaration order
pub const EXAM_COLUMNS: &str = "id, student_id, grade, score, created_at";

pub fn registry() -> Arc<MetadataRegistry> {
    let registry = MetadataRegistry::new();
    registry.register_entity::<Exam>();
    registry.register_entity::<Student>();
    registry.register_entity::<Score>();
    Arc::new(registry)
}

pub fn context() -> Arc<CriteriaContext> {
    CriteriaContext::with_resolver(registry())
}

pub fn context_with(config: CriteriaConfig) -> Arc<CriteriaContext> {
    CriteriaContext::new(registry(), config)
}
