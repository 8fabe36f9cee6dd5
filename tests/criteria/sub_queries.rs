use crate::common::fixtures::{context, Exam, Student};
use criteria_core::criteria::{col, Criteria, Expression, ExpressionBuilder, Function, Target};
use criteria_core::error::CriteriaError;
use serde_json::json;

#[test]
fn test_in_sub_query() {
    let ctx = context();
    let criteria = Criteria::of::<Exam>(&ctx)
        .select("id")
        .in_sub_query("studentId", "Student", |s| s.select("id").eq("name", "Ann"));

    let statement = criteria.render().unwrap();
    assert_eq!(
        statement.sql(),
        "SELECT t1.id FROM exam t1 WHERE t1.student_id IN \
         (SELECT t2.id FROM student t2 WHERE t2.name = :p1)"
    );
    assert_eq!(statement.parameters().get("p1"), Some(&json!("Ann")));
}

#[test]
fn test_not_in_sub_query() {
    let ctx = context();
    let criteria = Criteria::of::<Exam>(&ctx)
        .select("id")
        .not_in_sub_query("studentId", "Student", |s| s.select("id"));

    assert_eq!(
        criteria.render().unwrap().sql(),
        "SELECT t1.id FROM exam t1 WHERE t1.student_id NOT IN (SELECT t2.id FROM student t2)"
    );
}

#[test]
fn test_correlated_not_exists_shares_placeholders() {
    let ctx = context();
    let criteria = Criteria::of::<Exam>(&ctx)
        .select("id")
        .eq("grade", "A")
        .not_exists("Score", |s| s.on("examId", "id").gt("points", 50))
        .lt("score", 99);

    let statement = criteria.render().unwrap();
    assert_eq!(
        statement.sql(),
        "SELECT t1.id FROM exam t1 WHERE t1.grade = :p1 AND NOT EXISTS \
         (SELECT t2.id, t2.exam_id, t2.points FROM score t2 \
         WHERE t2.exam_id = t1.id AND t2.points > :p2) AND t1.score < :p3"
    );
    assert_eq!(statement.parameters().len(), 3);
}

#[test]
fn test_exists_inside_nested_group() {
    let ctx = context();
    let criteria = Criteria::of::<Exam>(&ctx)
        .select("id")
        .eq("grade", "A")
        .or_nest(false, |b| {
            b.exists("Score", |s| s.on("examId", "id"))
                .is_null("score")
        });

    assert_eq!(
        criteria.render().unwrap().sql(),
        "SELECT t1.id FROM exam t1 WHERE t1.grade = :p1 OR \
         (EXISTS (SELECT t2.id, t2.exam_id, t2.points FROM score t2 WHERE t2.exam_id = t1.id) \
         AND t1.score IS NULL)"
    );
}

#[test]
fn test_scalar_sub_select() {
    let ctx = context();
    let criteria = Criteria::of::<Exam>(&ctx)
        .select("id")
        .sub_select("best", "Score", |s| {
            s.on("examId", "id").function(Function::max("points"))
        });

    assert_eq!(
        criteria.render().unwrap().sql(),
        "SELECT t1.id, (SELECT MAX(t2.points) AS max_points FROM score t2 \
         WHERE t2.exam_id = t1.id) AS best FROM exam t1"
    );
}

#[test]
fn test_derived_table_inherits_output_names() {
    let ctx = context();
    let criteria = Criteria::of::<Exam>(&ctx)
        .from_sub_query("Exam", |sub| {
            sub.select("studentId")
                .function(Function::avg("score").alias("average"))
                .group("studentId")
        })
        .gt(col("average"), 80)
        .desc(col("average"));

    assert_eq!(
        criteria.render().unwrap().sql(),
        "SELECT t1.student_id, t1.average FROM \
         (SELECT t2.student_id, AVG(t2.score) AS average FROM exam t2 GROUP BY t2.student_id) t1 \
         WHERE t1.average > :p1 ORDER BY t1.average DESC"
    );
}

#[test]
fn test_derived_table_exclusion_and_wildcard() {
    let ctx = context();
    let criteria = Criteria::of::<Exam>(&ctx)
        .from_sub_query("Student", |sub| sub.eq("classId", 4))
        .exclude("class_id");

    assert_eq!(
        criteria.render().unwrap().sql(),
        "SELECT t1.id, t1.name FROM \
         (SELECT t2.id, t2.name, t2.class_id FROM student t2 WHERE t2.class_id = :p1) t1"
    );
}

#[test]
fn test_prebuilt_sub_query_from_another_context_is_refused() {
    let ctx = context();
    let other = context();
    let students = Criteria::of::<Student>(&other).select("id").eq("name", "Ann");

    let criteria = Criteria::of::<Exam>(&ctx).eq("grade", "A").where_clause(
        ExpressionBuilder::new()
            .target(Target::immediate("student_id"))
            .in_sub_query(students),
    );

    assert!(matches!(
        criteria.error(),
        Some(CriteriaError::DetachedContext { entity }) if entity == "Student"
    ));
    assert_eq!(criteria.fragments().condition_count(), 1);
    assert!(matches!(
        criteria.render(),
        Err(CriteriaError::DetachedContext { .. })
    ));
}

#[test]
fn test_detached_exists_inside_nested_expression_is_refused() {
    let ctx = context();
    let other = context();
    let scores = Criteria::new(&other, "Score").gt("points", 50);
    let group = Expression::nested(false, vec![Expression::exists(scores)]);

    let criteria = Criteria::of::<Exam>(&ctx).where_clause(group);

    assert!(!criteria.fragments().has_conditions());
    assert!(matches!(
        criteria.render_count(),
        Err(CriteriaError::DetachedContext { .. })
    ));
}

#[test]
fn test_detached_derived_table_fails_at_render() {
    let ctx = context();
    let other = context();
    let criteria = Criteria::of::<Exam>(&ctx)
        .from_sub_query("Student", |_| Criteria::of::<Student>(&other).eq("name", "Ann"));

    assert!(criteria.error().is_none());
    assert!(matches!(
        criteria.render(),
        Err(CriteriaError::DetachedContext { entity }) if entity == "Student"
    ));
}
