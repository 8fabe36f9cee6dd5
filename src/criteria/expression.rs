//! Condition AST: targets, operands, connectors and the validating builder.

use super::node::Criteria;
use super::params::ParameterAllocator;
use super::render::SqlRenderer;
use super::selection::Function;
use super::table::TableHandle;
use crate::constants::{keywords, TEMPLATE_TARGET_SLOT};
use crate::metadata::ColumnDescriptor;
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;

/// Logical connector joining a condition to the ones before it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Slot {
    #[default]
    And,
    Or,
}

impl Slot {
    pub fn to_sql(&self) -> &'static str {
        match self {
            Slot::And => "AND",
            Slot::Or => "OR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl Comparison {
    pub fn to_sql(&self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::Ne => "<>",
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
            Comparison::Lt => "<",
            Comparison::Le => "<=",
        }
    }
}

/// Wildcard placement for LIKE patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// `x%`
    Start,
    /// `%x`
    End,
    /// `%x%`
    Anywhere,
}

impl MatchMode {
    pub fn wrap(&self, value: &str) -> String {
        match self {
            MatchMode::Start => format!("{value}%"),
            MatchMode::End => format!("%{value}"),
            MatchMode::Anywhere => format!("%{value}%"),
        }
    }
}

/// What a caller names when adding a condition or selection.
///
/// A `Property` goes through the metadata resolver; a `Column` is used as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Property(String),
    Column {
        qualifier: Option<String>,
        column: String,
    },
}

impl Field {
    pub fn property(name: impl Into<String>) -> Self {
        Field::Property(name.into())
    }

    pub fn column(column: impl Into<String>) -> Self {
        Field::Column {
            qualifier: None,
            column: column.into(),
        }
    }

    pub fn qualified(qualifier: impl Into<String>, column: impl Into<String>) -> Self {
        Field::Column {
            qualifier: Some(qualifier.into()),
            column: column.into(),
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Field::Property(name) => name.trim().is_empty(),
            Field::Column { column, .. } => column.trim().is_empty(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Field::Property(name) => name,
            Field::Column { column, .. } => column,
        }
    }
}

impl From<&str> for Field {
    fn from(name: &str) -> Self {
        Field::Property(name.to_string())
    }
}

impl From<String> for Field {
    fn from(name: String) -> Self {
        Field::Property(name)
    }
}

impl From<&String> for Field {
    fn from(name: &String) -> Self {
        Field::Property(name.clone())
    }
}

/// Raw column reference that skips metadata lookup
pub fn col(column: &str) -> Field {
    Field::column(column)
}

/// The column side of a condition, resolved against a node
#[derive(Debug, Clone)]
pub enum Target {
    /// Column found through the metadata resolver
    Standard {
        owner: Arc<TableHandle>,
        column: ColumnDescriptor,
    },
    /// Raw column, qualified either by a raw alias string or by the owning node
    Immediate {
        owner: Option<Arc<TableHandle>>,
        qualifier: Option<String>,
        column: String,
    },
    /// Aggregate function, used by HAVING conditions
    Aggregate(Box<Function>),
}

impl Target {
    pub fn immediate(column: &str) -> Self {
        Target::Immediate {
            owner: None,
            qualifier: None,
            column: column.to_string(),
        }
    }

    pub fn is_valid(&self) -> bool {
        match self {
            Target::Standard { column, .. } => !column.column.trim().is_empty(),
            Target::Immediate { column, .. } => !column.trim().is_empty(),
            Target::Aggregate(function) => function.is_valid(),
        }
    }

    /// Physical column name, when there is one
    pub fn column_name(&self) -> Option<&str> {
        match self {
            Target::Standard { column, .. } => Some(&column.column),
            Target::Immediate { column, .. } => Some(column),
            Target::Aggregate(_) => None,
        }
    }

    pub fn property(&self) -> Option<&str> {
        match self {
            Target::Standard { column, .. } => Some(&column.property),
            _ => None,
        }
    }

    pub fn owner(&self) -> Option<&Arc<TableHandle>> {
        match self {
            Target::Standard { owner, .. } => Some(owner),
            Target::Immediate { owner, .. } => owner.as_ref(),
            Target::Aggregate(_) => None,
        }
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, Target::Aggregate(_))
    }

    pub fn to_sql(&self) -> String {
        match self {
            Target::Standard { owner, column } => owner.qualify(&column.column),
            Target::Immediate {
                qualifier: Some(qualifier),
                column,
                ..
            } => format!("{qualifier}.{column}"),
            Target::Immediate {
                owner: Some(owner),
                column,
                ..
            } => owner.qualify(column),
            Target::Immediate { column, .. } => column.clone(),
            Target::Aggregate(function) => function.to_sql(),
        }
    }
}

/// A value side of a condition: raw until the expression enters a node, then a token
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Value(Value),
    Bound(String),
}

impl Operand {
    pub fn is_bound(&self) -> bool {
        matches!(self, Operand::Bound(_))
    }

    fn bind(&mut self, allocator: &ParameterAllocator, template: Option<&str>) {
        if let Operand::Value(value) = self {
            let token = allocator.allocate(template, std::mem::take(value));
            *self = Operand::Bound(token);
        }
    }

    pub fn to_sql(&self) -> String {
        match self {
            Operand::Value(value) => format_value(value),
            Operand::Bound(token) => token.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum TemplateArgs {
    None,
    Positional(Vec<Operand>),
    Named(IndexMap<String, Operand>),
}

/// Condition variants
#[derive(Debug, Clone)]
pub enum Condition {
    Compare {
        target: Target,
        op: Comparison,
        value: Operand,
    },
    Like {
        target: Target,
        pattern: Operand,
        escape: Option<char>,
        negated: bool,
    },
    In {
        target: Target,
        values: Vec<Operand>,
        negated: bool,
    },
    Between {
        target: Target,
        low: Operand,
        high: Operand,
        negated: bool,
    },
    Null {
        target: Target,
        negated: bool,
    },
    /// `{@}` is replaced by the target column, `{0}`.. or `{name}` by bound values
    Template {
        target: Option<Target>,
        template: String,
        args: TemplateArgs,
    },
    Native {
        sql: String,
    },
    Nested {
        not: bool,
        children: Vec<Expression>,
    },
    /// Column on one node equals a column on another; consumes no placeholder
    ColumnEq {
        target: Target,
        other: Target,
    },
    InSubQuery {
        target: Target,
        query: Box<Criteria>,
        negated: bool,
    },
    Exists {
        query: Box<Criteria>,
        negated: bool,
    },
}

impl Condition {
    pub fn to_sql(&self) -> String {
        match self {
            Condition::Compare { target, op, value } => {
                format!("{} {} {}", target.to_sql(), op.to_sql(), value.to_sql())
            }
            Condition::Like {
                target,
                pattern,
                escape,
                negated,
            } => {
                let mut sql = format!(
                    "{} {}LIKE {}",
                    target.to_sql(),
                    not_prefix(*negated),
                    pattern.to_sql()
                );
                if let Some(escape) = escape {
                    sql.push_str(&format!(" ESCAPE '{}'", escape_char(*escape)));
                }
                sql
            }
            Condition::In {
                target,
                values,
                negated,
            } => {
                let value_list = values
                    .iter()
                    .map(Operand::to_sql)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{} {}IN ({value_list})", target.to_sql(), not_prefix(*negated))
            }
            Condition::Between {
                target,
                low,
                high,
                negated,
            } => format!(
                "{} {}BETWEEN {} AND {}",
                target.to_sql(),
                not_prefix(*negated),
                low.to_sql(),
                high.to_sql()
            ),
            Condition::Null { target, negated } => {
                if *negated {
                    format!("{} IS NOT NULL", target.to_sql())
                } else {
                    format!("{} IS NULL", target.to_sql())
                }
            }
            Condition::Template {
                target,
                template,
                args,
            } => render_template(target.as_ref(), template, args),
            Condition::Native { sql } => sql.clone(),
            Condition::Nested { not, children } => {
                let inner = join_expressions(children);
                if *not {
                    format!("{} ({inner})", keywords::NOT)
                } else {
                    format!("({inner})")
                }
            }
            Condition::ColumnEq { target, other } => {
                format!("{} = {}", target.to_sql(), other.to_sql())
            }
            Condition::InSubQuery {
                target,
                query,
                negated,
            } => format!(
                "{} {}IN ({})",
                target.to_sql(),
                not_prefix(*negated),
                SqlRenderer::new(query).query_sql()
            ),
            Condition::Exists { query, negated } => format!(
                "{}EXISTS ({})",
                not_prefix(*negated),
                SqlRenderer::new(query).query_sql()
            ),
        }
    }

    fn bind(&mut self, allocator: &ParameterAllocator, template: Option<&str>) {
        match self {
            Condition::Compare { value, .. } => value.bind(allocator, template),
            Condition::Like { pattern, .. } => pattern.bind(allocator, template),
            Condition::In { values, .. } => {
                for value in values.iter_mut() {
                    value.bind(allocator, template);
                }
            }
            Condition::Between { low, high, .. } => {
                low.bind(allocator, template);
                high.bind(allocator, template);
            }
            Condition::Template { args, .. } => match args {
                TemplateArgs::None => {}
                TemplateArgs::Positional(values) => {
                    for value in values.iter_mut() {
                        value.bind(allocator, template);
                    }
                }
                TemplateArgs::Named(values) => {
                    for value in values.values_mut() {
                        value.bind(allocator, template);
                    }
                }
            },
            Condition::Nested { children, .. } => {
                for child in children.iter_mut() {
                    child.bind(allocator);
                }
            }
            Condition::Null { .. }
            | Condition::Native { .. }
            | Condition::ColumnEq { .. }
            | Condition::InSubQuery { .. }
            | Condition::Exists { .. } => {}
        }
    }
}

/// One condition plus its connector
#[derive(Debug, Clone)]
pub struct Expression {
    slot: Option<Slot>,
    condition: Condition,
    value_template: Option<String>,
}

impl Expression {
    pub fn builder() -> ExpressionBuilder {
        ExpressionBuilder::new()
    }

    /// Raw SQL fragment; blank text yields nothing
    pub fn native(sql: &str) -> Option<Self> {
        if sql.trim().is_empty() {
            return None;
        }
        Some(Self::from_condition(Condition::Native {
            sql: sql.to_string(),
        }))
    }

    /// Parenthesized group of conditions; an empty group yields nothing
    pub fn nested(not: bool, children: Vec<Expression>) -> Option<Self> {
        if children.is_empty() {
            return None;
        }
        Some(Self::from_condition(Condition::Nested { not, children }))
    }

    pub fn exists(query: Criteria) -> Self {
        Self::from_condition(Condition::Exists {
            query: Box::new(query),
            negated: false,
        })
    }

    pub fn not_exists(query: Criteria) -> Self {
        Self::from_condition(Condition::Exists {
            query: Box::new(query),
            negated: true,
        })
    }

    fn from_condition(condition: Condition) -> Self {
        Self {
            slot: None,
            condition,
            value_template: None,
        }
    }

    pub fn with_slot(mut self, slot: Slot) -> Self {
        self.slot = Some(slot);
        self
    }

    /// Connector used when rendering; AND unless one was set
    pub fn slot(&self) -> Slot {
        self.slot.unwrap_or_default()
    }

    pub fn has_explicit_slot(&self) -> bool {
        self.slot.is_some()
    }

    pub(crate) fn default_slot(&mut self, slot: Slot) {
        if self.slot.is_none() {
            self.slot = Some(slot);
        }
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    /// Replace every raw operand with a token from `allocator`. Already bound
    /// operands keep their tokens.
    pub fn bind(&mut self, allocator: &ParameterAllocator) {
        let template = self.value_template.clone();
        self.condition.bind(allocator, template.as_deref());
    }

    pub fn is_bound(&self) -> bool {
        fn all_bound(operands: &[Operand]) -> bool {
            operands.iter().all(Operand::is_bound)
        }
        match &self.condition {
            Condition::Compare { value, .. } => value.is_bound(),
            Condition::Like { pattern, .. } => pattern.is_bound(),
            Condition::In { values, .. } => all_bound(values),
            Condition::Between { low, high, .. } => low.is_bound() && high.is_bound(),
            Condition::Template { args, .. } => match args {
                TemplateArgs::None => true,
                TemplateArgs::Positional(values) => all_bound(values),
                TemplateArgs::Named(values) => values.values().all(Operand::is_bound),
            },
            Condition::Nested { children, .. } => children.iter().all(Expression::is_bound),
            _ => true,
        }
    }

    pub fn to_sql(&self) -> String {
        self.condition.to_sql()
    }

    /// Every criteria embedded in this expression, nested groups included
    pub(crate) fn sub_queries(&self) -> Vec<&Criteria> {
        match &self.condition {
            Condition::InSubQuery { query, .. } | Condition::Exists { query, .. } => {
                vec![query.as_ref()]
            }
            Condition::Nested { children, .. } => {
                children.iter().flat_map(Expression::sub_queries).collect()
            }
            _ => Vec::new(),
        }
    }
}

/// Join conditions with their own connectors; the first connector is dropped
pub(crate) fn join_expressions<'a, I>(expressions: I) -> String
where
    I: IntoIterator<Item = &'a Expression>,
{
    let mut sql = String::new();
    for (index, expression) in expressions.into_iter().enumerate() {
        if index > 0 {
            sql.push(' ');
            sql.push_str(expression.slot().to_sql());
            sql.push(' ');
        }
        sql.push_str(&expression.to_sql());
    }
    sql
}

/// Validating builder: every terminal method returns `None` when the target is
/// missing, blank or unresolved, or when the operands cannot form a condition.
#[derive(Debug, Clone, Default)]
pub struct ExpressionBuilder {
    target: Option<Target>,
    slot: Option<Slot>,
    value_template: Option<String>,
}

impl ExpressionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target(mut self, target: impl Into<Option<Target>>) -> Self {
        self.target = target.into();
        self
    }

    pub fn slot(mut self, slot: Slot) -> Self {
        self.slot = Some(slot);
        self
    }

    /// Wrap every minted token, e.g. `CAST({0} AS DATE)`
    pub fn value_template(mut self, template: &str) -> Self {
        self.value_template = Some(template.to_string());
        self
    }

    fn finish<F>(self, condition: F) -> Option<Expression>
    where
        F: FnOnce(Target) -> Condition,
    {
        let target = self.target.filter(Target::is_valid)?;
        Some(Expression {
            slot: self.slot,
            condition: condition(target),
            value_template: self.value_template,
        })
    }

    pub fn compare(self, op: Comparison, value: impl Into<Value>) -> Option<Expression> {
        let value = Operand::Value(value.into());
        self.finish(|target| Condition::Compare { target, op, value })
    }

    pub fn like(self, value: &str, mode: MatchMode) -> Option<Expression> {
        self.like_with(value, mode, None, false)
    }

    pub fn like_escape(self, value: &str, mode: MatchMode, escape: char) -> Option<Expression> {
        self.like_with(value, mode, Some(escape), false)
    }

    pub fn not_like(self, value: &str, mode: MatchMode) -> Option<Expression> {
        self.like_with(value, mode, None, true)
    }

    pub fn like_with(
        self,
        value: &str,
        mode: MatchMode,
        escape: Option<char>,
        negated: bool,
    ) -> Option<Expression> {
        let pattern = Operand::Value(Value::String(mode.wrap(value)));
        self.finish(|target| Condition::Like {
            target,
            pattern,
            escape,
            negated,
        })
    }

    pub fn in_list<I, V>(self, values: I) -> Option<Expression>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.membership(values, false)
    }

    pub fn not_in<I, V>(self, values: I) -> Option<Expression>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.membership(values, true)
    }

    fn membership<I, V>(self, values: I, negated: bool) -> Option<Expression>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Operand> = values
            .into_iter()
            .map(|value| Operand::Value(value.into()))
            .collect();
        if values.is_empty() {
            return None;
        }
        self.finish(|target| Condition::In {
            target,
            values,
            negated,
        })
    }

    pub fn between(self, low: impl Into<Value>, high: impl Into<Value>) -> Option<Expression> {
        self.range(low.into(), high.into(), false)
    }

    pub fn not_between(self, low: impl Into<Value>, high: impl Into<Value>) -> Option<Expression> {
        self.range(low.into(), high.into(), true)
    }

    fn range(self, low: Value, high: Value, negated: bool) -> Option<Expression> {
        self.finish(|target| Condition::Between {
            target,
            low: Operand::Value(low),
            high: Operand::Value(high),
            negated,
        })
    }

    pub fn is_null(self) -> Option<Expression> {
        self.finish(|target| Condition::Null {
            target,
            negated: false,
        })
    }

    pub fn not_null(self) -> Option<Expression> {
        self.finish(|target| Condition::Null {
            target,
            negated: true,
        })
    }

    /// Template with positional values (`{0}`, `{1}`, ...). The target is optional,
    /// but if the template mentions `{@}` one must be present and resolved.
    pub fn template(self, template: &str, values: Vec<Value>) -> Option<Expression> {
        let args = if values.is_empty() {
            TemplateArgs::None
        } else {
            TemplateArgs::Positional(values.into_iter().map(Operand::Value).collect())
        };
        self.template_with(template, args)
    }

    /// Template with named values (`{name}`)
    pub fn named_template(self, template: &str, values: IndexMap<String, Value>) -> Option<Expression> {
        let args = TemplateArgs::Named(
            values
                .into_iter()
                .map(|(key, value)| (key, Operand::Value(value)))
                .collect(),
        );
        self.template_with(template, args)
    }

    fn template_with(self, template: &str, args: TemplateArgs) -> Option<Expression> {
        if template.trim().is_empty() {
            return None;
        }
        let target = match self.target {
            Some(target) if target.is_valid() => Some(target),
            Some(_) => return None,
            None if template.contains(TEMPLATE_TARGET_SLOT) => return None,
            None => None,
        };
        Some(Expression {
            slot: self.slot,
            condition: Condition::Template {
                target,
                template: template.to_string(),
                args,
            },
            value_template: self.value_template,
        })
    }

    pub fn column_eq(self, other: impl Into<Option<Target>>) -> Option<Expression> {
        let other = other.into().filter(Target::is_valid)?;
        self.finish(|target| Condition::ColumnEq { target, other })
    }

    pub fn in_sub_query(self, query: Criteria) -> Option<Expression> {
        self.finish(|target| Condition::InSubQuery {
            target,
            query: Box::new(query),
            negated: false,
        })
    }

    pub fn not_in_sub_query(self, query: Criteria) -> Option<Expression> {
        self.finish(|target| Condition::InSubQuery {
            target,
            query: Box::new(query),
            negated: true,
        })
    }
}

fn render_template(target: Option<&Target>, template: &str, args: &TemplateArgs) -> String {
    let mut sql = template.to_string();
    if let Some(target) = target {
        sql = sql.replace(TEMPLATE_TARGET_SLOT, &target.to_sql());
    }
    match args {
        TemplateArgs::None => {}
        TemplateArgs::Positional(values) => {
            // highest index first so `{1}` does not eat the front of `{10}`
            for (index, value) in values.iter().enumerate().rev() {
                sql = sql.replace(&format!("{{{index}}}"), &value.to_sql());
            }
        }
        TemplateArgs::Named(values) => {
            for (key, value) in values {
                sql = sql.replace(&format!("{{{key}}}"), &value.to_sql());
            }
        }
    }
    sql
}

fn not_prefix(negated: bool) -> &'static str {
    if negated {
        "NOT "
    } else {
        ""
    }
}

fn escape_char(escape: char) -> String {
    if escape == '\'' {
        "''".to_string()
    } else {
        escape.to_string()
    }
}

/// Format a JSON value as a SQL literal (unbound expressions only)
fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        _ => format!("'{}'", value.to_string().replace('\'', "''")),
    }
}
