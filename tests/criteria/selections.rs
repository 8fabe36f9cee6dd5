use crate::common::fixtures::{context, context_with, Exam, EXAM_COLUMNS};
use criteria_core::config::CriteriaConfig;
use criteria_core::criteria::{Comparison, Criteria, Direction, Function};
use serde_json::json;

#[test]
fn test_wildcard_selects_every_mapped_column() {
    let ctx = context();
    let criteria = Criteria::of::<Exam>(&ctx);
    assert_eq!(
        criteria.render().unwrap().sql(),
        format!("SELECT {EXAM_COLUMNS} FROM exam")
    );
}

#[test]
fn test_unknown_entity_selects_star() {
    let ctx = context();
    let criteria = Criteria::new(&ctx, "audit_log").eq(criteria_core::col("level"), "warn");
    assert_eq!(
        criteria.render().unwrap().sql(),
        "SELECT * FROM audit_log WHERE level = :p1"
    );
}

#[test]
fn test_exclude_by_property_or_column() {
    let ctx = context();
    let criteria = Criteria::of::<Exam>(&ctx)
        .exclude("createdAt")
        .exclude("grade");
    assert_eq!(
        criteria.render().unwrap().sql(),
        "SELECT id, student_id, score FROM exam"
    );
}

#[test]
fn test_explicit_selections_keep_insertion_order() {
    let ctx = context();
    let criteria = Criteria::of::<Exam>(&ctx)
        .select("studentId")
        .select_as("score", "s")
        .col_select("legacy")
        .col_select_as("x", "y")
        .native_select("NOW()", Some("now"))
        .select("missing");

    assert_eq!(
        criteria.render().unwrap().sql(),
        "SELECT student_id, score AS s, legacy, x AS y, NOW() AS now FROM exam"
    );
}

#[test]
fn test_distinct() {
    let ctx = context();
    let criteria = Criteria::of::<Exam>(&ctx).select("grade").distinct();
    assert_eq!(criteria.render().unwrap().sql(), "SELECT DISTINCT grade FROM exam");
}

#[test]
fn test_aggregates_with_group() {
    let ctx = context();
    let criteria = Criteria::of::<Exam>(&ctx)
        .select("studentId")
        .function(Function::avg("score").scale(2))
        .function(Function::count_all())
        .function(Function::sum("missing"))
        .group("studentId");

    assert_eq!(
        criteria.render().unwrap().sql(),
        "SELECT student_id, ROUND(AVG(score), 2) AS avg_score, COUNT(*) AS count \
         FROM exam GROUP BY student_id"
    );
}

#[test]
fn test_group_all_uses_plain_columns() {
    let ctx = context();
    let criteria = Criteria::of::<Exam>(&ctx)
        .select("studentId")
        .select("grade")
        .function(Function::max("score"))
        .group_all();

    assert_eq!(
        criteria.render().unwrap().sql(),
        "SELECT student_id, grade, MAX(score) AS max_score FROM exam GROUP BY student_id, grade"
    );
}

#[test]
fn test_having_binds_values() {
    let ctx = context();
    let criteria = Criteria::of::<Exam>(&ctx)
        .select("studentId")
        .function(Function::avg("score"))
        .group("studentId")
        .having(Function::avg("score"), Comparison::Gt, 70)
        .having_native("COUNT(*) > 1");

    let statement = criteria.render().unwrap();
    assert_eq!(
        statement.sql(),
        "SELECT student_id, AVG(score) AS avg_score FROM exam GROUP BY student_id \
         HAVING AVG(score) > :p1 AND COUNT(*) > 1"
    );
    assert_eq!(statement.parameters().get("p1"), Some(&json!(70)));
}

#[test]
fn test_order_items() {
    let ctx = context();
    let criteria = Criteria::of::<Exam>(&ctx)
        .select("grade")
        .desc("score")
        .asc("id")
        .order_function(Function::count_all(), Direction::Desc)
        .order_native("grade NULLS LAST")
        .asc("missing");

    assert_eq!(
        criteria.render().unwrap().sql(),
        "SELECT grade FROM exam ORDER BY score DESC, id ASC, COUNT(*) DESC, grade NULLS LAST"
    );
}

#[test]
fn test_keep_order_hint_from_config() {
    let config = CriteriaConfig {
        keep_order_hint: true,
        ..CriteriaConfig::default()
    };
    let ctx = context_with(config);
    let criteria = Criteria::of::<Exam>(&ctx).select("id").desc("score");

    assert_eq!(
        criteria.render().unwrap().sql(),
        "SELECT id FROM exam /* keep orderby */ ORDER BY score DESC"
    );

    // no order, no hint
    let plain = Criteria::of::<Exam>(&ctx).select("id");
    assert_eq!(plain.render().unwrap().sql(), "SELECT id FROM exam");
}

#[test]
fn test_selection_cache_is_invalidated_by_new_selection() {
    let ctx = context();
    let criteria = Criteria::of::<Exam>(&ctx).exclude("createdAt");
    criteria.render().unwrap();
    assert!(criteria.fragments().is_selection_cached());

    let criteria = criteria.select("grade");
    assert!(!criteria.fragments().is_selection_cached());
    assert_eq!(criteria.render().unwrap().sql(), "SELECT grade FROM exam");
}
