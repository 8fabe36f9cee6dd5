use crate::constants::keywords;

/// Represents different types of SQL JOINs used to attach foreign criteria
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinType {
    #[default]
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

impl JoinType {
    pub fn to_sql(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
            JoinType::Right => "RIGHT JOIN",
            JoinType::Full => "FULL OUTER JOIN",
            JoinType::Cross => "CROSS JOIN",
        }
    }

    /// CROSS JOIN never carries an ON clause
    pub fn takes_condition(&self) -> bool {
        !matches!(self, JoinType::Cross)
    }
}

/// Render one join clause from its pieces
pub(crate) fn join_clause(join_type: JoinType, table_reference: &str, on_condition: &str) -> String {
    let mut sql = format!("{} {}", join_type.to_sql(), table_reference);
    if join_type.takes_condition() && !on_condition.is_empty() {
        sql.push_str(&format!(" {} {on_condition}", keywords::ON));
    }
    sql
}
