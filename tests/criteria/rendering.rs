use crate::common::fixtures::{context, context_with, Exam, EXAM_COLUMNS};
use criteria_core::config::{CriteriaConfig, PlaceholderStyle};
use criteria_core::criteria::{Comparison, Criteria, Direction, Function, JoinType, SqlRenderer};
use criteria_core::error::CriteriaError;
use serde_json::json;

#[test]
fn test_segments_of_joined_query() {
    let ctx = context();
    let criteria = Criteria::of::<Exam>(&ctx)
        .select("grade")
        .join("Student", JoinType::Left, |s| s.on("id", "studentId").group("name"))
        .group("grade")
        .range_with_row(0, 5);
    let renderer = SqlRenderer::new(&criteria);

    // generate aliases in root-first order before looking at individual segments
    criteria.render().unwrap();

    assert_eq!(renderer.select_segment(), "t1.grade");
    assert_eq!(
        renderer.from_segment(),
        "exam t1 LEFT JOIN student t2 ON t2.id = t1.student_id"
    );
    assert_eq!(renderer.where_segment(), "");
    assert_eq!(renderer.group_segment(), "t1.grade, t2.name");
    assert_eq!(renderer.having_segment(), "");
    assert_eq!(renderer.order_segment(), "");
    assert_eq!(renderer.range_segment(), "LIMIT 5 OFFSET 0");
}

#[test]
fn test_repeated_renders_are_identical() {
    let ctx = context();
    let criteria = Criteria::of::<Exam>(&ctx)
        .eq("grade", "A")
        .exists("Score", |s| s.on("examId", "id").gt("points", 10));

    let first = criteria.render().unwrap();
    let second = criteria.render().unwrap();
    assert_eq!(first, second);
    assert_eq!(ctx.params().sequence(), 2);
    assert_eq!(criteria.alias(), "t1");
}

#[test]
fn test_complete_with_configured_style() {
    let config = CriteriaConfig::default().with_placeholder_style(PlaceholderStyle::Dollar);
    let ctx = context_with(config);
    let criteria = Criteria::of::<Exam>(&ctx)
        .select("id")
        .eq("studentId", 1)
        .or()
        .eq("grade", "A")
        .and()
        .and_nest(false, |b| b.gt("score", 60).lt("score", 90));

    let compiled = criteria.render_complete().unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT id FROM exam WHERE student_id = $1 OR grade = $2 AND (score > $3 AND score < $4)"
    );
    assert_eq!(compiled.values, vec![json!(1), json!("A"), json!(60), json!(90)]);
}

#[test]
fn test_complete_orders_values_by_appearance() {
    let ctx = context();
    // the sub-query mints :p1 before the outer condition mints :p2, but the outer
    // condition comes first in the text
    let criteria = Criteria::of::<Exam>(&ctx)
        .select("id")
        .in_sub_query("studentId", "Student", |s| s.select("id").eq("name", "Ann"))
        .eq("grade", "B");
    let compiled = criteria
        .render()
        .unwrap()
        .complete(PlaceholderStyle::Question)
        .unwrap();

    assert_eq!(
        compiled.sql,
        "SELECT t1.id FROM exam t1 WHERE t1.student_id IN \
         (SELECT t2.id FROM student t2 WHERE t2.name = ?) AND t1.grade = ?"
    );
    assert_eq!(compiled.values, vec![json!("Ann"), json!("B")]);
}

#[test]
fn test_custom_placeholder_prefix() {
    let config = CriteriaConfig {
        placeholder_prefix: "arg".to_string(),
        ..CriteriaConfig::default()
    };
    let ctx = context_with(config);
    let criteria = Criteria::of::<Exam>(&ctx).select("id").eq("grade", "A");

    let statement = criteria.render().unwrap();
    assert_eq!(statement.sql(), "SELECT id FROM exam WHERE grade = :arg1");
    assert_eq!(
        statement.complete(PlaceholderStyle::Question).unwrap().sql,
        "SELECT id FROM exam WHERE grade = ?"
    );
}

#[test]
fn test_native_tokens_that_were_never_minted() {
    let ctx = context();
    let criteria = Criteria::of::<Exam>(&ctx)
        .select("id")
        .native("created_at > :since")
        .native("score = :p42");

    let statement = criteria.render().unwrap();
    assert_eq!(
        statement.complete(PlaceholderStyle::Question).unwrap_err(),
        CriteriaError::UnknownPlaceholder {
            token: ":p42".to_string()
        }
    );

    let criteria = Criteria::of::<Exam>(&ctx)
        .select("id")
        .native("created_at > :since");
    let compiled = criteria.render_complete().unwrap();
    assert_eq!(compiled.sql, "SELECT id FROM exam WHERE created_at > :since");
    assert!(compiled.values.is_empty());
}

#[test]
fn test_into_parts() {
    let ctx = context();
    let (sql, parameters) = Criteria::of::<Exam>(&ctx)
        .select("id")
        .eq("id", 3)
        .render()
        .unwrap()
        .into_parts();

    assert_eq!(sql, "SELECT id FROM exam WHERE id = :p1");
    assert_eq!(parameters.get("p1"), Some(&json!(3)));
}

#[test]
fn test_group_having_order_render_identically_twice() {
    let ctx = context();
    let criteria = Criteria::of::<Exam>(&ctx)
        .select("studentId")
        .function(Function::avg("score"))
        .group("studentId")
        .having(Function::avg("score"), Comparison::Gt, 70)
        .having_native("COUNT(*) > 1")
        .desc("studentId")
        .order_function(Function::max("score"), Direction::Asc)
        .keep_order_hint(true);
    let renderer = SqlRenderer::new(&criteria);

    let first = (
        renderer.group_segment(),
        renderer.having_segment(),
        renderer.order_segment(),
    );
    let second = (
        renderer.group_segment(),
        renderer.having_segment(),
        renderer.order_segment(),
    );

    assert_eq!(first, second);
    assert_eq!(first.0, "student_id");
    assert!(first.1.contains(":p1"));
    assert!(first.1.ends_with("COUNT(*) > 1"));
    assert!(first.2.starts_with("student_id DESC, "));
    // the having value was bound once, at add time
    assert_eq!(ctx.params().sequence(), 1);
    let statement = criteria.render().unwrap();
    assert!(statement.sql().contains("/* keep orderby */ ORDER BY student_id DESC"));
    assert_eq!(statement, criteria.render().unwrap());
}

#[test]
fn test_aliasing_from_nested_group_requalifies_selections() {
    let ctx = context();
    let criteria = Criteria::of::<Exam>(&ctx).eq("grade", "A");
    assert_eq!(
        criteria.render().unwrap().sql(),
        format!("SELECT {EXAM_COLUMNS} FROM exam WHERE grade = :p1")
    );

    let criteria = criteria.and_nest(false, |b| b.exists("Student", |s| s.on("id", "studentId")));
    let sql = criteria.render().unwrap().sql().to_string();

    assert!(sql.starts_with(
        "SELECT t1.id, t1.student_id, t1.grade, t1.score, t1.created_at FROM exam t1 \
         WHERE t1.grade = :p1 AND (EXISTS"
    ));
}

#[test]
fn test_aliasing_through_scratch_handle_requalifies_selections() {
    let ctx = context();
    let criteria = Criteria::of::<Exam>(&ctx).select("grade");
    assert_eq!(criteria.render().unwrap().sql(), "SELECT grade FROM exam");

    let _ = criteria.scratch().as_alias("e");
    assert_eq!(criteria.render().unwrap().sql(), "SELECT e.grade FROM exam e");
}
