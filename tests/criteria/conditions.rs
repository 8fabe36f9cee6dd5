use crate::common::fixtures::{context, context_with, Exam, EXAM_COLUMNS};
use criteria_core::config::CriteriaConfig;
use criteria_core::criteria::{
    col, Comparison, Criteria, ExpressionBuilder, MatchMode, Slot, SqlRenderer, Target,
};
use criteria_core::error::CriteriaError;
use indexmap::IndexMap;
use serde_json::json;

fn where_sql(criteria: &Criteria) -> String {
    SqlRenderer::new(criteria).where_segment()
}

#[test]
fn test_or_cursor_applies_to_following_conditions() {
    let ctx = context();
    let criteria = Criteria::of::<Exam>(&ctx)
        .eq("studentId", 1)
        .or()
        .eq("grade", "A");

    let statement = criteria.render().unwrap();
    assert_eq!(
        statement.sql(),
        format!("SELECT {EXAM_COLUMNS} FROM exam WHERE student_id = :p1 OR grade = :p2")
    );
    assert_eq!(statement.parameters().get("p1"), Some(&json!(1)));
    assert_eq!(statement.parameters().get("p2"), Some(&json!("A")));
}

#[test]
fn test_nested_group_joined_with_and() {
    let ctx = context();
    let criteria = Criteria::of::<Exam>(&ctx)
        .eq("studentId", 1)
        .and_nest(false, |b| b.gt("score", 60).lt("score", 90));

    assert_eq!(
        where_sql(&criteria),
        "student_id = :p1 AND (score > :p2 AND score < :p3)"
    );
    let parameters = criteria.render().unwrap().parameters().clone();
    assert_eq!(parameters.len(), 3);
    assert_eq!(parameters.get("p2"), Some(&json!(60)));
    assert_eq!(parameters.get("p3"), Some(&json!(90)));
}

#[test]
fn test_negated_or_group() {
    let ctx = context();
    let criteria = Criteria::of::<Exam>(&ctx)
        .eq("grade", "A")
        .or_nest(true, |b| b.is_null("score").or().lt("score", 10));

    assert_eq!(
        where_sql(&criteria),
        "grade = :p1 OR NOT (score IS NULL OR score < :p2)"
    );
}

#[test]
fn test_nested_scratch_starts_with_and_cursor() {
    let ctx = context();
    let criteria = Criteria::of::<Exam>(&ctx)
        .or()
        .and_nest(false, |b| b.eq("score", 1).eq("id", 2))
        .eq("grade", "C");

    // the outer cursor is still OR after the group
    assert_eq!(
        where_sql(&criteria),
        "(score = :p1 AND id = :p2) OR grade = :p3"
    );
}

#[test]
fn test_like_variants() {
    let ctx = context();
    let criteria = Criteria::of::<Exam>(&ctx)
        .like("grade", "A", MatchMode::Start)
        .not_like("grade", "B", MatchMode::Anywhere)
        .like_escape("grade", "C!_", MatchMode::End, '!');

    assert_eq!(
        where_sql(&criteria),
        "grade LIKE :p1 AND grade NOT LIKE :p2 AND grade LIKE :p3 ESCAPE '!'"
    );
    assert_eq!(ctx.params().value("p1"), Some(json!("A%")));
    assert_eq!(ctx.params().value("p2"), Some(json!("%B%")));
    assert_eq!(ctx.params().value("p3"), Some(json!("%C!_")));
}

#[test]
fn test_membership_and_ranges() {
    let ctx = context();
    let criteria = Criteria::of::<Exam>(&ctx)
        .in_list("grade", ["A", "B"])
        .not_in("studentId", [7, 8, 9])
        .between("score", 50, 70)
        .not_between("id", 100, 200);

    assert_eq!(
        where_sql(&criteria),
        "grade IN (:p1, :p2) AND student_id NOT IN (:p3, :p4, :p5) \
         AND score BETWEEN :p6 AND :p7 AND id NOT BETWEEN :p8 AND :p9"
    );
}

#[test]
fn test_empty_in_list_is_omitted() {
    let ctx = context();
    let criteria = Criteria::of::<Exam>(&ctx)
        .in_list("grade", Vec::<String>::new())
        .eq("score", 1);

    assert_eq!(where_sql(&criteria), "score = :p1");
}

#[test]
fn test_null_tests_bind_nothing() {
    let ctx = context();
    let criteria = Criteria::of::<Exam>(&ctx).is_null("score").not_null("grade");

    assert_eq!(where_sql(&criteria), "score IS NULL AND grade IS NOT NULL");
    assert!(ctx.params().is_empty());
}

#[test]
fn test_templates() {
    let ctx = context();
    let mut named = IndexMap::new();
    named.insert("first".to_string(), json!("A"));
    named.insert("second".to_string(), json!("B"));

    let criteria = Criteria::of::<Exam>(&ctx)
        .template_on("score", "{@} % {0} = {1}", vec![json!(2), json!(0)])
        .template("EXTRACT(YEAR FROM created_at) = {0}", vec![json!(2024)])
        .named_template("grade IN ({first}, {second})", named);

    assert_eq!(
        where_sql(&criteria),
        "score % :p1 = :p2 AND EXTRACT(YEAR FROM created_at) = :p3 AND grade IN (:p4, :p5)"
    );
    assert_eq!(ctx.params().value("p5"), Some(json!("B")));
}

#[test]
fn test_template_needing_a_column_without_one_is_omitted() {
    let ctx = context();
    let criteria = Criteria::of::<Exam>(&ctx)
        .template("{@} > {0}", vec![json!(1)])
        .template_on("missing", "{@} > {0}", vec![json!(1)]);

    assert_eq!(criteria.fragments().condition_count(), 0);
    assert!(ctx.params().is_empty());
}

#[test]
fn test_native_sql() {
    let ctx = context();
    let criteria = Criteria::of::<Exam>(&ctx)
        .native("score > 0")
        .native("  ")
        .or()
        .native("grade = 'F'");

    assert_eq!(where_sql(&criteria), "score > 0 OR grade = 'F'");
}

#[test]
fn test_unresolved_and_blank_properties_are_dropped() {
    let ctx = context();
    let criteria = Criteria::of::<Exam>(&ctx)
        .eq("missing", 1)
        .eq("", 2)
        .eq("grade", "A");

    assert_eq!(where_sql(&criteria), "grade = :p1");
    assert!(criteria.error().is_none());
    assert!(criteria.render().is_ok());
}

#[test]
fn test_strict_mode_fails_every_render() {
    let ctx = context_with(CriteriaConfig::default().strict(true));
    let criteria = Criteria::of::<Exam>(&ctx).eq("missing", 1).eq("grade", "A");

    let expected = CriteriaError::UnresolvedProperty {
        entity: "Exam".to_string(),
        property: "missing".to_string(),
    };
    assert_eq!(criteria.render().unwrap_err(), expected);
    assert_eq!(criteria.render_count().unwrap_err(), expected);
    // the valid condition was still collected
    assert_eq!(criteria.fragments().condition_count(), 1);
}

#[test]
fn test_strict_can_be_toggled_per_node() {
    let ctx = context();
    let criteria = Criteria::of::<Exam>(&ctx).strict(true).gt("missing", 1);
    assert!(criteria.is_strict());
    assert!(criteria.render().is_err());
}

#[test]
fn test_raw_column_bypasses_metadata() {
    let ctx = context();
    let criteria = Criteria::of::<Exam>(&ctx).eq(col("legacy_flag"), true);
    assert_eq!(where_sql(&criteria), "legacy_flag = :p1");
}

#[test]
fn test_value_template_wraps_token() {
    let ctx = context();
    let expression = ExpressionBuilder::new()
        .target(Target::immediate("created_at"))
        .value_template("DATE({0})")
        .compare(Comparison::Ge, "2024-01-01");
    let criteria = Criteria::of::<Exam>(&ctx).where_clause(expression);

    assert_eq!(where_sql(&criteria), "created_at >= DATE(:p1)");
    assert_eq!(ctx.params().value("p1"), Some(json!("2024-01-01")));
}

#[test]
fn test_explicit_slot_overrides_cursor() {
    let ctx = context();
    let expression = ExpressionBuilder::new()
        .target(Target::immediate("score"))
        .slot(Slot::Or)
        .compare(Comparison::Gt, 5);
    let criteria = Criteria::of::<Exam>(&ctx)
        .eq("grade", "A")
        .where_clause(expression)
        .where_clause(None);

    assert_eq!(where_sql(&criteria), "grade = :p1 OR score > :p2");
}

#[test]
fn test_comparison_operators() {
    let ctx = context();
    let criteria = Criteria::of::<Exam>(&ctx)
        .ne("grade", "F")
        .ge("score", 10)
        .le("score", 20)
        .compare("id", Comparison::Lt, 99);

    assert_eq!(
        where_sql(&criteria),
        "grade <> :p1 AND score >= :p2 AND score <= :p3 AND id < :p4"
    );
}
