use super::expression::{Field, Target};
use super::node::Criteria;
use super::render::SqlRenderer;
use crate::constants::{keywords, TEMPLATE_TARGET_SLOT};

/// Aggregate operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunctionOp {
    Count,
    Sum,
    Avg,
    Min,
    Max,
    /// Raw function template; `{@}` receives the target column
    Native(String),
}

impl FunctionOp {
    fn keyword(&self) -> &str {
        match self {
            FunctionOp::Count => "COUNT",
            FunctionOp::Sum => "SUM",
            FunctionOp::Avg => "AVG",
            FunctionOp::Min => "MIN",
            FunctionOp::Max => "MAX",
            FunctionOp::Native(_) => "NATIVE",
        }
    }
}

/// Aggregate function applied to one column.
///
/// Functions are created against a [`Field`] and resolved into a [`Target`] when a
/// criteria node accepts them. An unaliased aggregate gets a synthesized alias of
/// the form `{op}_{column}` (`avg_score`, `count_id`, or plain `count` for
/// `COUNT(*)`).
#[derive(Debug, Clone)]
pub struct Function {
    op: FunctionOp,
    field: Option<Field>,
    target: Option<Target>,
    alias: Option<String>,
    scale: Option<u32>,
    distinct: bool,
}

impl Function {
    fn new(op: FunctionOp, field: Option<Field>) -> Self {
        Self {
            op,
            field,
            target: None,
            alias: None,
            scale: None,
            distinct: false,
        }
    }

    /// `COUNT(*)`
    pub fn count_all() -> Self {
        Self::new(FunctionOp::Count, None)
    }

    pub fn count(field: impl Into<Field>) -> Self {
        Self::new(FunctionOp::Count, Some(field.into()))
    }

    pub fn sum(field: impl Into<Field>) -> Self {
        Self::new(FunctionOp::Sum, Some(field.into()))
    }

    pub fn avg(field: impl Into<Field>) -> Self {
        Self::new(FunctionOp::Avg, Some(field.into()))
    }

    pub fn min(field: impl Into<Field>) -> Self {
        Self::new(FunctionOp::Min, Some(field.into()))
    }

    pub fn max(field: impl Into<Field>) -> Self {
        Self::new(FunctionOp::Max, Some(field.into()))
    }

    pub fn native(template: &str, field: Option<Field>) -> Self {
        Self::new(FunctionOp::Native(template.to_string()), field)
    }

    pub fn alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_string());
        self
    }

    /// Round the result to `scale` decimal places
    pub fn scale(mut self, scale: u32) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn op(&self) -> &FunctionOp {
        &self.op
    }

    pub fn field(&self) -> Option<&Field> {
        self.field.as_ref()
    }

    pub fn target(&self) -> Option<&Target> {
        self.target.as_ref()
    }

    pub(crate) fn with_target(mut self, target: Target) -> Self {
        self.target = Some(target);
        self
    }

    /// A function over a property must have had that property resolved
    pub fn is_resolved(&self) -> bool {
        match &self.field {
            Some(Field::Property(_)) => self.target.is_some(),
            _ => true,
        }
    }

    pub fn is_valid(&self) -> bool {
        match &self.op {
            FunctionOp::Native(template) => {
                !template.trim().is_empty()
                    && (!template.contains(TEMPLATE_TARGET_SLOT) || self.column_sql().is_some())
            }
            _ => self.field.as_ref().map_or(true, |field| !field.is_blank()),
        }
    }

    /// Explicit alias, or the synthesized one for built-in aggregates
    pub fn output_alias(&self) -> Option<String> {
        if let Some(alias) = &self.alias {
            return Some(alias.clone());
        }
        if matches!(self.op, FunctionOp::Native(_)) {
            return None;
        }
        let op = self.op.keyword().to_ascii_lowercase();
        match self.column_name() {
            Some(column) => Some(format!("{op}_{column}")),
            None => Some(op),
        }
    }

    fn column_name(&self) -> Option<String> {
        match (&self.target, &self.field) {
            (Some(target), _) => target.column_name().map(str::to_string),
            (None, Some(field)) => Some(field.name().to_string()),
            (None, None) => None,
        }
    }

    fn column_sql(&self) -> Option<String> {
        match (&self.target, &self.field) {
            (Some(target), _) => Some(target.to_sql()),
            (None, Some(Field::Column { qualifier: Some(q), column })) => Some(format!("{q}.{column}")),
            (None, Some(field)) => Some(field.name().to_string()),
            (None, None) => None,
        }
    }

    /// Function expression without alias
    pub fn to_sql(&self) -> String {
        let column = self.column_sql();
        let call = match &self.op {
            FunctionOp::Native(template) => match &column {
                Some(column) => template.replace(TEMPLATE_TARGET_SLOT, column),
                None => template.clone(),
            },
            op => {
                let argument = column.unwrap_or_else(|| "*".to_string());
                if self.distinct && argument != "*" {
                    format!("{}({} {argument})", op.keyword(), keywords::DISTINCT)
                } else {
                    format!("{}({argument})", op.keyword())
                }
            }
        };
        match self.scale {
            Some(scale) => format!("ROUND({call}, {scale})"),
            None => call,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    Standard,
    Immediate,
    Native,
    Function,
    SubQuery,
}

/// One projected output column
#[derive(Debug, Clone)]
pub enum Selection {
    Column {
        target: Target,
        alias: Option<String>,
    },
    Native {
        sql: String,
        alias: Option<String>,
    },
    Function(Function),
    SubQuery {
        query: Box<Criteria>,
        alias: String,
    },
}

impl Selection {
    pub fn column(target: Option<Target>, alias: Option<&str>) -> Option<Self> {
        let target = target.filter(Target::is_valid)?;
        if target.is_aggregate() {
            return None;
        }
        Some(Selection::Column {
            target,
            alias: non_blank(alias),
        })
    }

    pub fn native(sql: &str, alias: Option<&str>) -> Option<Self> {
        if sql.trim().is_empty() {
            return None;
        }
        Some(Selection::Native {
            sql: sql.to_string(),
            alias: non_blank(alias),
        })
    }

    pub fn function(function: Function) -> Option<Self> {
        (function.is_resolved() && function.is_valid()).then_some(Selection::Function(function))
    }

    pub fn sub_query(query: Criteria, alias: &str) -> Option<Self> {
        let alias = non_blank(Some(alias))?;
        Some(Selection::SubQuery {
            query: Box::new(query),
            alias,
        })
    }

    pub fn mode(&self) -> SelectionMode {
        match self {
            Selection::Column {
                target: Target::Standard { .. },
                ..
            } => SelectionMode::Standard,
            Selection::Column { .. } => SelectionMode::Immediate,
            Selection::Native { .. } => SelectionMode::Native,
            Selection::Function(_) => SelectionMode::Function,
            Selection::SubQuery { .. } => SelectionMode::SubQuery,
        }
    }

    pub fn alias(&self) -> Option<String> {
        match self {
            Selection::Column { alias, .. } | Selection::Native { alias, .. } => alias.clone(),
            Selection::Function(function) => function.output_alias(),
            Selection::SubQuery { alias, .. } => Some(alias.clone()),
        }
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, Selection::Function(_))
    }

    /// Name this selection has in the result set, as seen from an enclosing query
    pub fn output_name(&self) -> Option<String> {
        self.alias().or_else(|| match self {
            Selection::Column { target, .. } => target.column_name().map(str::to_string),
            _ => None,
        })
    }

    /// Expression without alias
    pub fn expression_sql(&self) -> String {
        match self {
            Selection::Column { target, .. } => target.to_sql(),
            Selection::Native { sql, .. } => sql.clone(),
            Selection::Function(function) => function.to_sql(),
            Selection::SubQuery { query, .. } => {
                format!("({})", SqlRenderer::new(query).query_sql())
            }
        }
    }

    pub fn to_sql(&self) -> String {
        let expression = self.expression_sql();
        match self.alias() {
            Some(alias) => format!("{expression} {} {alias}", keywords::AS),
            None => expression,
        }
    }

    pub(crate) fn sub_query_ref(&self) -> Option<&Criteria> {
        match self {
            Selection::SubQuery { query, .. } => Some(query),
            _ => None,
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .filter(|value| !value.trim().is_empty())
        .map(str::to_string)
}
