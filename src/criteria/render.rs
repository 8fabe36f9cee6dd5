//! # SQL Renderer
//!
//! Walks a criteria tree and assembles the statement text. Segments can be rendered
//! one at a time (`select_segment`, `where_segment`, ...) for callers that splice
//! them into their own templates, or as a whole statement through
//! [`SqlRenderer::render`], [`SqlRenderer::render_count`] and
//! [`SqlRenderer::render_update`].
//!
//! Rendering never mints placeholders: every value was bound when its condition
//! entered a node, so rendering the same tree twice yields identical text.

use super::expression::{join_expressions, Expression};
use super::joins::{join_clause, JoinType};
use super::node::{Criteria, CriteriaKind};
use super::pagination::RangeMode;
use super::selection::Selection;
use super::table::TableHandle;
use crate::config::PlaceholderStyle;
use crate::constants::{keywords, KEEP_ORDER_HINT, NAMED_SIGIL};
use crate::error::{CriteriaError, Result};
use crate::logging::log_render_operation;
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;

/// Rendered statement with named tokens and the values bound to them
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    sql: String,
    parameters: IndexMap<String, Value>,
    prefix: String,
}

impl Statement {
    fn new(sql: String, criteria: &Criteria) -> Self {
        let params = criteria.params();
        Self {
            sql,
            parameters: params.snapshot(),
            prefix: params.prefix().to_string(),
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Every value minted by the tree's allocator, keyed by name without the sigil
    pub fn parameters(&self) -> &IndexMap<String, Value> {
        &self.parameters
    }

    pub fn into_parts(self) -> (String, IndexMap<String, Value>) {
        (self.sql, self.parameters)
    }

    /// Rewrite named tokens into positional markers, collecting values in the
    /// order their markers appear.
    ///
    /// Only names of the form `{prefix}{digits}` are treated as minted tokens.
    /// Anything else after a `:` is left alone, and so are `::` casts.
    pub fn complete(&self, style: PlaceholderStyle) -> Result<CompiledStatement> {
        let mut sql = String::with_capacity(self.sql.len());
        let mut values = Vec::new();
        let mut rest = self.sql.as_str();

        while let Some(position) = rest.find(NAMED_SIGIL) {
            sql.push_str(&rest[..position]);
            let after = &rest[position + NAMED_SIGIL.len_utf8()..];

            if let Some(stripped) = after.strip_prefix(NAMED_SIGIL) {
                sql.push(NAMED_SIGIL);
                sql.push(NAMED_SIGIL);
                rest = stripped;
                continue;
            }

            let name_len = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            let name = &after[..name_len];

            if self.is_minted(name) {
                let value = self
                    .parameters
                    .get(name)
                    .ok_or_else(|| CriteriaError::UnknownPlaceholder {
                        token: format!("{NAMED_SIGIL}{name}"),
                    })?;
                values.push(value.clone());
                match style {
                    PlaceholderStyle::Question => sql.push('?'),
                    PlaceholderStyle::Dollar => sql.push_str(&format!("${}", values.len())),
                }
            } else {
                sql.push(NAMED_SIGIL);
                sql.push_str(name);
            }
            rest = &after[name_len..];
        }
        sql.push_str(rest);

        Ok(CompiledStatement { sql, values })
    }

    fn is_minted(&self, name: &str) -> bool {
        name.strip_prefix(self.prefix.as_str())
            .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
    }
}

/// Statement with positional markers and values in marker order
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledStatement {
    pub sql: String,
    pub values: Vec<Value>,
}

/// Renders one criteria tree rooted at `criteria`
#[derive(Debug, Clone, Copy)]
pub struct SqlRenderer<'a> {
    criteria: &'a Criteria,
}

impl<'a> SqlRenderer<'a> {
    pub fn new(criteria: &'a Criteria) -> Self {
        Self { criteria }
    }

    pub fn range_mode(&self) -> RangeMode {
        self.criteria.range_mode()
    }

    /// Projection list without the SELECT keyword
    pub fn select_segment(&self) -> String {
        let mut items: Vec<String> = own_selections(self.criteria).to_vec();
        collect_foreign_selections(self.criteria, &mut items);

        let body = items.join(", ");
        if self.criteria.is_distinct() {
            format!("{} {body}", keywords::DISTINCT)
        } else {
            body
        }
    }

    /// Table reference (or derived table) plus every join clause
    pub fn from_segment(&self) -> String {
        let mut sql = source_reference(self.criteria);
        append_joins(self.criteria, &mut sql);
        sql
    }

    pub fn where_segment(&self) -> String {
        join_expressions(self.criteria.fragments().conditions())
    }

    pub fn group_segment(&self) -> String {
        let mut items = Vec::new();
        collect_groups(self.criteria, &mut items);
        items.join(", ")
    }

    pub fn having_segment(&self) -> String {
        let mut expressions: Vec<&Expression> = Vec::new();
        collect_havings(self.criteria, &mut expressions);
        join_expressions(expressions)
    }

    pub fn order_segment(&self) -> String {
        let mut items = Vec::new();
        collect_orders(self.criteria, &mut items);
        items.join(", ")
    }

    /// `LIMIT n OFFSET m`, or empty when no window is set
    pub fn range_segment(&self) -> String {
        self.criteria.range().to_sql().trim_start().to_string()
    }

    /// Full statement for the node's role: UPDATE for update nodes, SELECT otherwise
    pub fn render(&self) -> Result<Statement> {
        if self.criteria.kind() == CriteriaKind::Update {
            return self.render_update();
        }
        self.validate()?;

        let sql = self.query_sql();
        Ok(self.finish("select", sql))
    }

    /// `SELECT COUNT(*)` over the same rows, without ordering or range. Grouped
    /// or distinct queries are wrapped in a derived table.
    pub fn render_count(&self) -> Result<Statement> {
        if self.criteria.kind() == CriteriaKind::Update {
            return Err(CriteriaError::unsupported(
                "render_count",
                self.criteria.kind().role(),
            ));
        }
        self.validate()?;

        let sql = if self.needs_count_wrapper() {
            let mut inner = self.head_sql();
            self.append_filters(&mut inner);
            format!(
                "{} {} {} ({inner}) count_source",
                keywords::SELECT,
                keywords::COUNT_ALL,
                keywords::FROM
            )
        } else {
            let mut sql = format!(
                "{} {} {} {}",
                keywords::SELECT,
                keywords::COUNT_ALL,
                keywords::FROM,
                self.from_segment()
            );
            self.append_filters(&mut sql);
            sql
        };
        Ok(self.finish("count", sql))
    }

    /// `UPDATE table SET ... WHERE ...`
    pub fn render_update(&self) -> Result<Statement> {
        let update_set = self.criteria.update_set()?;
        self.validate()?;
        if update_set.is_empty() {
            return Err(CriteriaError::unsupported(
                "render_update without assignments",
                self.criteria.kind().role(),
            ));
        }

        let mut sql = format!(
            "{} {} {} {}",
            keywords::UPDATE,
            self.criteria.table().table_reference(),
            keywords::SET,
            update_set.to_sql()
        );
        let conditions = self.where_segment();
        if !conditions.is_empty() {
            sql.push_str(&format!(" {} {conditions}", keywords::WHERE));
        }
        Ok(self.finish("update", sql))
    }

    /// SELECT text for embedding (sub-queries, derived tables). Errors are
    /// reported by the enclosing render call, which validates the whole tree.
    pub(crate) fn query_sql(&self) -> String {
        let mut sql = self.head_sql();
        self.append_filters(&mut sql);

        let order = self.order_segment();
        if !order.is_empty() {
            if self.criteria.keeps_order_hint() {
                sql.push(' ');
                sql.push_str(KEEP_ORDER_HINT);
            }
            sql.push_str(&format!(" {} {order}", keywords::ORDER_BY));
        }
        sql.push_str(&self.criteria.range().to_sql());
        sql
    }

    fn head_sql(&self) -> String {
        format!(
            "{} {} {} {}",
            keywords::SELECT,
            self.select_segment(),
            keywords::FROM,
            self.from_segment()
        )
    }

    fn append_filters(&self, sql: &mut String) {
        let conditions = self.where_segment();
        if !conditions.is_empty() {
            sql.push_str(&format!(" {} {conditions}", keywords::WHERE));
        }

        let groups = self.group_segment();
        if !groups.is_empty() {
            sql.push_str(&format!(" {} {groups}", keywords::GROUP_BY));
        }

        let havings = self.having_segment();
        if !havings.is_empty() {
            sql.push_str(&format!(" {} {havings}", keywords::HAVING));
        }
    }

    fn needs_count_wrapper(&self) -> bool {
        self.criteria.is_distinct() || !self.group_segment().is_empty() || !self.having_segment().is_empty()
    }

    fn finish(&self, statement_kind: &str, sql: String) -> Statement {
        let statement = Statement::new(sql, self.criteria);
        log_render_operation(
            statement_kind,
            self.criteria.entity(),
            statement.parameters().len(),
            statement.sql().len(),
        );
        statement
    }

    /// Surface the first deferred error anywhere in the tree, then check that no
    /// two distinct aliased tables share an alias.
    fn validate(&self) -> Result<()> {
        let mut first_error: Option<CriteriaError> = None;
        let mut seen: Vec<(String, *const TableHandle)> = Vec::new();
        let mut collision: Option<String> = None;

        let context = self.criteria.context();
        self.criteria.for_each_node(&mut |node: &Criteria| {
            if first_error.is_none() {
                first_error = node.error().cloned();
            }
            if first_error.is_none() && !node.table().same_context(context) {
                first_error = Some(CriteriaError::DetachedContext {
                    entity: node.entity().to_string(),
                });
            }
            let table = node.table();
            if !table.is_aliased() || collision.is_some() {
                return;
            }
            let alias = table.alias();
            let pointer = Arc::as_ptr(table);
            match seen.iter().find(|(existing, _)| *existing == alias) {
                Some((_, owner)) if *owner != pointer => collision = Some(alias),
                Some(_) => {}
                None => seen.push((alias, pointer)),
            }
        });

        if let Some(error) = first_error {
            return Err(error);
        }
        match collision {
            Some(alias) => Err(CriteriaError::AliasCollision { alias }),
            None => Ok(()),
        }
    }
}

fn own_selections(node: &Criteria) -> Arc<[String]> {
    node.fragments()
        .cached_selections(node.table().alias_epoch(), || compute_own_selections(node))
}

fn compute_own_selections(node: &Criteria) -> Vec<String> {
    let fragments = node.fragments();
    if fragments.has_selection() {
        return fragments.selections().iter().map(Selection::to_sql).collect();
    }
    if let Some(sub_query) = node.sub_query() {
        return inherited_selections(node, sub_query);
    }
    wildcard_selections(node)
}

/// Descriptor columns minus exclusions, or `*` when none are known
fn wildcard_selections(node: &Criteria) -> Vec<String> {
    let table = node.table();
    let fragments = node.fragments();
    let columns: Vec<String> = table
        .descriptor()
        .columns
        .iter()
        .filter(|column| !fragments.is_excluded(&column.property, &column.column))
        .map(|column| table.qualify(&column.column))
        .collect();

    if columns.is_empty() {
        vec![table.qualify("*")]
    } else {
        columns
    }
}

/// Output names of the derived table, qualified with the outer alias
fn inherited_selections(node: &Criteria, sub_query: &Criteria) -> Vec<String> {
    let alias = node.alias();
    let fragments = node.fragments();
    let names: Vec<String> = output_names(sub_query)
        .into_iter()
        .filter(|name| !fragments.is_excluded(name, name))
        .map(|name| format!("{alias}.{name}"))
        .collect();

    if names.is_empty() {
        vec![format!("{alias}.*")]
    } else {
        names
    }
}

fn output_names(node: &Criteria) -> Vec<String> {
    let fragments = node.fragments();
    if fragments.has_selection() {
        return fragments
            .selections()
            .iter()
            .filter_map(Selection::output_name)
            .collect();
    }
    if let Some(sub_query) = node.sub_query() {
        return output_names(sub_query)
            .into_iter()
            .filter(|name| !fragments.is_excluded(name, name))
            .collect();
    }
    node.table()
        .descriptor()
        .columns
        .iter()
        .filter(|column| !fragments.is_excluded(&column.property, &column.column))
        .map(|column| column.column.clone())
        .collect()
}

fn collect_foreign_selections(node: &Criteria, items: &mut Vec<String>) {
    for foreign in node.foreigns() {
        if foreign.fragments().has_selection() || foreign.is_fetch() {
            items.extend(own_selections(foreign).iter().cloned());
        }
        collect_foreign_selections(foreign, items);
    }
}

fn source_reference(node: &Criteria) -> String {
    match node.sub_query() {
        Some(sub_query) => format!("({}) {}", SqlRenderer::new(sub_query).query_sql(), node.alias()),
        None => node.table().table_reference(),
    }
}

fn append_joins(node: &Criteria, sql: &mut String) {
    for foreign in node.foreigns() {
        let join_type = match foreign.kind() {
            CriteriaKind::Foreign(join_type) => join_type,
            _ => JoinType::default(),
        };
        let on_condition = join_expressions(foreign.fragments().conditions());
        sql.push(' ');
        sql.push_str(&join_clause(join_type, &source_reference(foreign), &on_condition));
        append_joins(foreign, sql);
    }
}

fn collect_groups(node: &Criteria, items: &mut Vec<String>) {
    if node.is_group_all() {
        items.extend(group_all_items(node));
    } else {
        items.extend(node.fragments().groups().iter().map(|group| group.to_sql()));
    }
    for foreign in node.foreigns() {
        collect_groups(foreign, items);
    }
}

/// Every non-aggregate column the node projects, joined nodes included
fn group_all_items(node: &Criteria) -> Vec<String> {
    let mut items = plain_columns(node);
    for foreign in node.foreigns() {
        if foreign.fragments().has_selection() || foreign.is_fetch() {
            items.extend(plain_columns(foreign));
        }
    }
    items
}

fn plain_columns(node: &Criteria) -> Vec<String> {
    let fragments = node.fragments();
    if !fragments.has_selection() {
        return own_selections(node).to_vec();
    }
    fragments
        .selections()
        .iter()
        .filter(|selection| matches!(selection, Selection::Column { .. }))
        .map(Selection::expression_sql)
        .collect()
}

fn collect_havings<'n>(node: &'n Criteria, expressions: &mut Vec<&'n Expression>) {
    expressions.extend(node.fragments().havings());
    for foreign in node.foreigns() {
        collect_havings(foreign, expressions);
    }
}

fn collect_orders(node: &Criteria, items: &mut Vec<String>) {
    items.extend(node.fragments().orders().iter().map(|order| order.to_sql()));
    for foreign in node.foreigns() {
        collect_orders(foreign, items);
    }
}
