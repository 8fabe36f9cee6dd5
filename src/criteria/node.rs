use super::expression::{Comparison, Expression, ExpressionBuilder, Field, MatchMode, Slot, Target};
use super::fragment::{Direction, FragmentAccumulator, GroupItem, OrderItem};
use super::joins::JoinType;
use super::pagination::{Range, RangeMode};
use super::params::ParameterAllocator;
use super::render::{CompiledStatement, SqlRenderer, Statement};
use super::selection::{Function, Selection};
use super::table::TableHandle;
use crate::config::CriteriaConfig;
use crate::error::{CriteriaError, Result};
use crate::metadata::{Entity, MetadataResolver, TableDescriptor};
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// State shared by every node of one criteria tree: the parameter allocator, the
/// metadata resolver, the alias sequence and the configuration.
///
/// One context per compiled statement. Nodes derived from each other hold the same
/// `Arc`, which is what keeps placeholder names and generated aliases unique
/// across the whole tree.
#[derive(Debug)]
pub struct CriteriaContext {
    params: ParameterAllocator,
    resolver: Arc<dyn MetadataResolver>,
    alias_sequence: AtomicU64,
    config: CriteriaConfig,
}

impl CriteriaContext {
    pub fn new(resolver: Arc<dyn MetadataResolver>, config: CriteriaConfig) -> Arc<Self> {
        Arc::new(Self {
            params: ParameterAllocator::new(&config.placeholder_prefix),
            resolver,
            alias_sequence: AtomicU64::new(0),
            config,
        })
    }

    /// Like [`CriteriaContext::new`], but rejects prefixes that cannot appear in SQL
    pub fn try_new(resolver: Arc<dyn MetadataResolver>, config: CriteriaConfig) -> Result<Arc<Self>> {
        config.validate()?;
        Ok(Self::new(resolver, config))
    }

    pub fn with_resolver(resolver: Arc<dyn MetadataResolver>) -> Arc<Self> {
        Self::new(resolver, CriteriaConfig::default())
    }

    pub fn params(&self) -> &ParameterAllocator {
        &self.params
    }

    pub fn resolver(&self) -> &dyn MetadataResolver {
        self.resolver.as_ref()
    }

    pub fn config(&self) -> &CriteriaConfig {
        &self.config
    }

    pub(crate) fn next_alias(&self) -> String {
        let sequence = self.alias_sequence.fetch_add(1, Ordering::AcqRel) + 1;
        format!("{}{sequence}", self.config.alias_prefix)
    }

    fn descriptor(&self, entity: &str) -> Arc<TableDescriptor> {
        self.resolver
            .table(entity)
            .unwrap_or_else(|| Arc::new(TableDescriptor::bare(entity)))
    }
}

/// Role of a node within its tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CriteriaKind {
    Query,
    Update,
    Foreign(JoinType),
    SubQuery,
}

impl CriteriaKind {
    pub fn role(&self) -> &'static str {
        match self {
            CriteriaKind::Query => "query",
            CriteriaKind::Update => "update",
            CriteriaKind::Foreign(_) => "foreign",
            CriteriaKind::SubQuery => "sub-query",
        }
    }
}

/// One `column = :token` pair of an update statement
#[derive(Debug, Clone)]
pub struct Assignment {
    pub target: Target,
    pub token: String,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateSet {
    assignments: Vec<Assignment>,
}

impl UpdateSet {
    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn to_sql(&self) -> String {
        self.assignments
            .iter()
            .map(|a| format!("{} = {}", a.target.to_sql(), a.token))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Builder context bound to one table.
///
/// Conditions added through the fluent methods take the node's current connector
/// (see [`Criteria::and`] / [`Criteria::or`]), are validated, and have their values
/// bound to placeholders immediately. A condition whose column cannot be resolved
/// is dropped without a trace unless the node is strict, in which case the first
/// failure is kept and returned by every render call.
#[derive(Debug, Clone)]
pub struct Criteria {
    context: Arc<CriteriaContext>,
    table: Arc<TableHandle>,
    kind: CriteriaKind,
    slot: Slot,
    strict: bool,
    distinct: bool,
    group_all: bool,
    keep_order_hint: bool,
    fetch: bool,
    fragments: FragmentAccumulator,
    master: Option<Arc<TableHandle>>,
    sub_query: Option<Box<Criteria>>,
    foreigns: Vec<Criteria>,
    update_set: Option<UpdateSet>,
    range: Range,
    error: Option<CriteriaError>,
}

impl Criteria {
    /// Root query node for `entity`
    pub fn new(context: &Arc<CriteriaContext>, entity: &str) -> Self {
        Self::with_kind(context, entity, CriteriaKind::Query, None)
    }

    pub fn of<E: Entity>(context: &Arc<CriteriaContext>) -> Self {
        Self::new(context, E::NAME)
    }

    /// Root node of an UPDATE statement
    pub fn update(context: &Arc<CriteriaContext>, entity: &str) -> Self {
        Self::with_kind(context, entity, CriteriaKind::Update, None)
    }

    fn with_kind(
        context: &Arc<CriteriaContext>,
        entity: &str,
        kind: CriteriaKind,
        master: Option<Arc<TableHandle>>,
    ) -> Self {
        let descriptor = context.descriptor(entity);
        Self {
            context: Arc::clone(context),
            table: Arc::new(TableHandle::new(descriptor, Arc::clone(context))),
            kind,
            slot: Slot::And,
            strict: context.config().strict,
            distinct: false,
            group_all: false,
            keep_order_hint: context.config().keep_order_hint,
            fetch: false,
            fragments: FragmentAccumulator::new(),
            master,
            sub_query: None,
            foreigns: Vec::new(),
            update_set: (kind == CriteriaKind::Update).then(UpdateSet::default),
            range: Range::Unbounded,
            error: None,
        }
    }

    /// Child node for a join or sub-query: same context, this node as master, an
    /// empty accumulator. Both nodes switch to aliased rendering.
    pub fn derive(&self, entity: &str) -> Criteria {
        self.table.enable_alias();
        self.fragments.invalidate();

        let mut child = Self::with_kind(
            &self.context,
            entity,
            CriteriaKind::SubQuery,
            Some(Arc::clone(&self.table)),
        );
        child.strict = self.strict;
        child.table.enable_alias();
        child
    }

    /// Throwaway node over the same table, used to collect a nested condition group
    pub fn scratch(&self) -> Criteria {
        Criteria {
            context: Arc::clone(&self.context),
            table: Arc::clone(&self.table),
            kind: self.kind,
            slot: Slot::And,
            strict: self.strict,
            distinct: false,
            group_all: false,
            keep_order_hint: false,
            fetch: false,
            fragments: FragmentAccumulator::new(),
            master: self.master.clone(),
            sub_query: None,
            foreigns: Vec::new(),
            update_set: None,
            range: Range::Unbounded,
            error: None,
        }
    }

    // ------------------------------------------------------------------
    // Connector cursor
    // ------------------------------------------------------------------

    /// Conditions added from now on join with AND, until [`Criteria::or`] is called
    pub fn and(mut self) -> Self {
        self.slot = Slot::And;
        self
    }

    /// Conditions added from now on join with OR, until [`Criteria::and`] is called
    pub fn or(mut self) -> Self {
        self.slot = Slot::Or;
        self
    }

    pub fn current_slot(&self) -> Slot {
        self.slot
    }

    // ------------------------------------------------------------------
    // Flags
    // ------------------------------------------------------------------

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Group by every selected non-aggregate column
    pub fn group_all(mut self) -> Self {
        self.group_all = true;
        self
    }

    pub fn keep_order_hint(mut self, keep: bool) -> Self {
        self.keep_order_hint = keep;
        self
    }

    /// Project this joined node's columns even without explicit selections
    pub fn fetch(mut self) -> Self {
        self.fetch = true;
        self
    }

    pub fn as_alias(self, alias: &str) -> Self {
        if !alias.trim().is_empty() {
            self.table.set_alias(alias);
            self.fragments.invalidate();
        }
        self
    }

    pub fn use_alias(self) -> Self {
        self.table.enable_alias();
        self.fragments.invalidate();
        self
    }

    // ------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------

    fn record(&mut self, error: CriteriaError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn resolve_field(&mut self, field: impl Into<Field>) -> Option<Target> {
        let owner = Arc::clone(&self.table);
        self.resolve_against(&owner, field.into())
    }

    fn resolve_against(&mut self, owner: &Arc<TableHandle>, field: Field) -> Option<Target> {
        if field.is_blank() {
            return None;
        }
        match field {
            Field::Property(property) => {
                match self.context.resolver().column(owner.entity(), &property) {
                    Some(column) => Some(Target::Standard {
                        owner: Arc::clone(owner),
                        column,
                    }),
                    None => {
                        if self.strict {
                            self.record(CriteriaError::unresolved(owner.entity(), property));
                        }
                        None
                    }
                }
            }
            Field::Column { qualifier, column } => Some(Target::Immediate {
                owner: qualifier.is_none().then(|| Arc::clone(owner)),
                qualifier,
                column,
            }),
        }
    }

    fn resolve_function(&mut self, function: Function) -> Option<Function> {
        match function.field().cloned() {
            None => Some(function),
            Some(field) => {
                let target = self.resolve_field(field)?;
                Some(function.with_target(target))
            }
        }
    }

    /// Sub-queries minted by another context carry tokens from another allocator
    fn accepts(&mut self, expression: &Expression) -> bool {
        let detached = expression
            .sub_queries()
            .into_iter()
            .find(|query| !query.table.same_context(&self.context))
            .map(|query| query.table.entity().to_string());

        match detached {
            Some(entity) => {
                warn!(
                    entity = %entity,
                    "expression embeds criteria built on another context; dropping it"
                );
                self.record(CriteriaError::DetachedContext { entity });
                false
            }
            None => true,
        }
    }

    fn push_condition(&mut self, expression: Option<Expression>) {
        if let Some(mut expression) = expression {
            if !self.accepts(&expression) {
                return;
            }
            expression.default_slot(self.slot);
            expression.bind(self.context.params());
            self.fragments.add_condition(expression);
        }
    }

    fn push_having(&mut self, expression: Option<Expression>) {
        if let Some(mut expression) = expression {
            if !self.accepts(&expression) {
                return;
            }
            expression.default_slot(self.slot);
            expression.bind(self.context.params());
            self.fragments.add_having(expression);
        }
    }

    fn add_with<F>(mut self, field: impl Into<Field>, build: F) -> Self
    where
        F: FnOnce(ExpressionBuilder) -> Option<Expression>,
    {
        let target = self.resolve_field(field);
        let expression = build(ExpressionBuilder::new().target(target));
        self.push_condition(expression);
        self
    }

    // ------------------------------------------------------------------
    // Conditions
    // ------------------------------------------------------------------

    /// Append a prebuilt expression; `None` is ignored
    pub fn where_clause(mut self, expression: Option<Expression>) -> Self {
        self.push_condition(expression);
        self
    }

    pub fn where_all<I>(mut self, expressions: I) -> Self
    where
        I: IntoIterator<Item = Option<Expression>>,
    {
        for expression in expressions {
            self.push_condition(expression);
        }
        self
    }

    pub fn compare(self, field: impl Into<Field>, op: Comparison, value: impl Into<Value>) -> Self {
        self.add_with(field, |builder| builder.compare(op, value))
    }

    pub fn eq(self, field: impl Into<Field>, value: impl Into<Value>) -> Self {
        self.compare(field, Comparison::Eq, value)
    }

    pub fn ne(self, field: impl Into<Field>, value: impl Into<Value>) -> Self {
        self.compare(field, Comparison::Ne, value)
    }

    pub fn gt(self, field: impl Into<Field>, value: impl Into<Value>) -> Self {
        self.compare(field, Comparison::Gt, value)
    }

    pub fn ge(self, field: impl Into<Field>, value: impl Into<Value>) -> Self {
        self.compare(field, Comparison::Ge, value)
    }

    pub fn lt(self, field: impl Into<Field>, value: impl Into<Value>) -> Self {
        self.compare(field, Comparison::Lt, value)
    }

    pub fn le(self, field: impl Into<Field>, value: impl Into<Value>) -> Self {
        self.compare(field, Comparison::Le, value)
    }

    pub fn like(self, field: impl Into<Field>, value: &str, mode: MatchMode) -> Self {
        self.add_with(field, |builder| builder.like(value, mode))
    }

    pub fn like_escape(self, field: impl Into<Field>, value: &str, mode: MatchMode, escape: char) -> Self {
        self.add_with(field, |builder| builder.like_escape(value, mode, escape))
    }

    pub fn not_like(self, field: impl Into<Field>, value: &str, mode: MatchMode) -> Self {
        self.add_with(field, |builder| builder.not_like(value, mode))
    }

    pub fn in_list<I, V>(self, field: impl Into<Field>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.add_with(field, |builder| builder.in_list(values))
    }

    pub fn not_in<I, V>(self, field: impl Into<Field>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.add_with(field, |builder| builder.not_in(values))
    }

    pub fn between(self, field: impl Into<Field>, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        self.add_with(field, |builder| builder.between(low, high))
    }

    pub fn not_between(
        self,
        field: impl Into<Field>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        self.add_with(field, |builder| builder.not_between(low, high))
    }

    pub fn is_null(self, field: impl Into<Field>) -> Self {
        self.add_with(field, ExpressionBuilder::is_null)
    }

    pub fn not_null(self, field: impl Into<Field>) -> Self {
        self.add_with(field, ExpressionBuilder::not_null)
    }

    /// Template over a column: `{@}` is the column, `{0}`.. the values
    pub fn template_on(self, field: impl Into<Field>, template: &str, values: Vec<Value>) -> Self {
        self.add_with(field, |builder| builder.template(template, values))
    }

    /// Template with no column
    pub fn template(mut self, template: &str, values: Vec<Value>) -> Self {
        let expression = ExpressionBuilder::new().template(template, values);
        self.push_condition(expression);
        self
    }

    pub fn named_template(mut self, template: &str, values: IndexMap<String, Value>) -> Self {
        let expression = ExpressionBuilder::new().named_template(template, values);
        self.push_condition(expression);
        self
    }

    pub fn native(mut self, sql: &str) -> Self {
        let expression = Expression::native(sql);
        self.push_condition(expression);
        self
    }

    /// `this.field = other.other_field` against any node of the tree
    pub fn column_eq(
        mut self,
        field: impl Into<Field>,
        other: &Arc<TableHandle>,
        other_field: impl Into<Field>,
    ) -> Self {
        let target = self.resolve_field(field);
        let other = self.resolve_against(other, other_field.into());
        let expression = ExpressionBuilder::new().target(target).column_eq(other);
        self.push_condition(expression);
        self
    }

    /// Correlate with the master node: `this.field = master.master_field`.
    /// On a foreign node this becomes part of the ON clause.
    pub fn on(mut self, field: impl Into<Field>, master_field: impl Into<Field>) -> Self {
        match self.master.clone() {
            Some(master) => self.column_eq(field, &master, master_field),
            None => {
                self.record(CriteriaError::unsupported("on", self.kind.role()));
                self
            }
        }
    }

    pub fn in_sub_query<F>(self, field: impl Into<Field>, entity: &str, builder: F) -> Self
    where
        F: FnOnce(Criteria) -> Criteria,
    {
        self.sub_query_membership(field, entity, builder, false)
    }

    pub fn not_in_sub_query<F>(self, field: impl Into<Field>, entity: &str, builder: F) -> Self
    where
        F: FnOnce(Criteria) -> Criteria,
    {
        self.sub_query_membership(field, entity, builder, true)
    }

    fn sub_query_membership<F>(mut self, field: impl Into<Field>, entity: &str, builder: F, negated: bool) -> Self
    where
        F: FnOnce(Criteria) -> Criteria,
    {
        let target = self.resolve_field(field);
        let query = builder(self.derive(entity));
        let builder = ExpressionBuilder::new().target(target);
        let expression = if negated {
            builder.not_in_sub_query(query)
        } else {
            builder.in_sub_query(query)
        };
        self.push_condition(expression);
        self
    }

    pub fn exists<F>(mut self, entity: &str, builder: F) -> Self
    where
        F: FnOnce(Criteria) -> Criteria,
    {
        let query = builder(self.derive(entity));
        self.push_condition(Some(Expression::exists(query)));
        self
    }

    pub fn not_exists<F>(mut self, entity: &str, builder: F) -> Self
    where
        F: FnOnce(Criteria) -> Criteria,
    {
        let query = builder(self.derive(entity));
        self.push_condition(Some(Expression::not_exists(query)));
        self
    }

    /// Collect the conditions `builder` adds to a scratch node into one
    /// parenthesized group appended here with `slot`. Only conditions survive;
    /// the scratch node itself is discarded.
    pub fn nest<F>(mut self, not: bool, slot: Slot, builder: F) -> Self
    where
        F: FnOnce(Criteria) -> Criteria,
    {
        let mut harvested = builder(self.scratch());

        if !Arc::ptr_eq(&harvested.table, &self.table) {
            warn!(
                entity = %self.table.entity(),
                "nested group builder returned a node other than its scratch instance; skipping the group"
            );
            return self;
        }
        if let Some(error) = harvested.error.take() {
            self.record(error);
        }
        if harvested.fragments.has_selection() || !harvested.foreigns.is_empty() {
            debug!(
                entity = %self.table.entity(),
                "nested group builder added non-condition fragments; they are dropped"
            );
        }

        match Expression::nested(not, harvested.fragments.take_conditions()) {
            Some(group) => self.fragments.add_condition(group.with_slot(slot)),
            None => warn!(
                entity = %self.table.entity(),
                "nested group collected no conditions; skipping it"
            ),
        }
        self
    }

    pub fn and_nest<F>(self, not: bool, builder: F) -> Self
    where
        F: FnOnce(Criteria) -> Criteria,
    {
        self.nest(not, Slot::And, builder)
    }

    pub fn or_nest<F>(self, not: bool, builder: F) -> Self
    where
        F: FnOnce(Criteria) -> Criteria,
    {
        self.nest(not, Slot::Or, builder)
    }

    // ------------------------------------------------------------------
    // Selections
    // ------------------------------------------------------------------

    pub fn select(self, field: impl Into<Field>) -> Self {
        self.select_with(field.into(), None)
    }

    pub fn select_as(self, field: impl Into<Field>, alias: &str) -> Self {
        self.select_with(field.into(), Some(alias))
    }

    /// Select a raw column, bypassing metadata lookup
    pub fn col_select(self, column: &str) -> Self {
        self.select_with(Field::column(column), None)
    }

    pub fn col_select_as(self, column: &str, alias: &str) -> Self {
        self.select_with(Field::column(column), Some(alias))
    }

    fn select_with(mut self, field: Field, alias: Option<&str>) -> Self {
        let target = self.resolve_field(field);
        if let Some(selection) = Selection::column(target, alias) {
            self.fragments.add_selection(selection);
        }
        self
    }

    pub fn native_select(mut self, sql: &str, alias: Option<&str>) -> Self {
        if let Some(selection) = Selection::native(sql, alias) {
            self.fragments.add_selection(selection);
        }
        self
    }

    pub fn function(mut self, function: Function) -> Self {
        if let Some(selection) = self.resolve_function(function).and_then(Selection::function) {
            self.fragments.add_selection(selection);
        }
        self
    }

    /// Scalar sub-query in the select list
    pub fn sub_select<F>(mut self, alias: &str, entity: &str, builder: F) -> Self
    where
        F: FnOnce(Criteria) -> Criteria,
    {
        let query = builder(self.derive(entity));
        if let Some(selection) = Selection::sub_query(query, alias) {
            self.fragments.add_selection(selection);
        }
        self
    }

    /// Drop a property or column from the wildcard selection
    pub fn exclude(mut self, field: &str) -> Self {
        self.fragments.exclude(field);
        self
    }

    // ------------------------------------------------------------------
    // Group / having / order
    // ------------------------------------------------------------------

    pub fn group(mut self, field: impl Into<Field>) -> Self {
        if let Some(target) = self.resolve_field(field) {
            self.fragments.add_group(GroupItem::Column(target));
        }
        self
    }

    pub fn group_native(mut self, sql: &str) -> Self {
        if !sql.trim().is_empty() {
            self.fragments.add_group(GroupItem::Native(sql.to_string()));
        }
        self
    }

    pub fn having(mut self, function: Function, op: Comparison, value: impl Into<Value>) -> Self {
        let Some(function) = self.resolve_function(function) else {
            return self;
        };
        let expression = ExpressionBuilder::new()
            .target(Target::Aggregate(Box::new(function)))
            .compare(op, value);
        self.push_having(expression);
        self
    }

    pub fn having_native(mut self, sql: &str) -> Self {
        let expression = Expression::native(sql);
        self.push_having(expression);
        self
    }

    pub fn asc(self, field: impl Into<Field>) -> Self {
        self.order(field, Direction::Asc)
    }

    pub fn desc(self, field: impl Into<Field>) -> Self {
        self.order(field, Direction::Desc)
    }

    pub fn order(mut self, field: impl Into<Field>, direction: Direction) -> Self {
        if let Some(target) = self.resolve_field(field) {
            self.fragments.add_order(OrderItem::Column { target, direction });
        }
        self
    }

    pub fn order_function(mut self, function: Function, direction: Direction) -> Self {
        if let Some(function) = self.resolve_function(function).filter(Function::is_valid) {
            self.fragments
                .add_order(OrderItem::Function { function, direction });
        }
        self
    }

    pub fn order_native(mut self, sql: &str) -> Self {
        if !sql.trim().is_empty() {
            self.fragments.add_order(OrderItem::Native(sql.to_string()));
        }
        self
    }

    // ------------------------------------------------------------------
    // Joins and embedded sub-query
    // ------------------------------------------------------------------

    /// Attach a joined node. Its conditions render as the ON clause.
    pub fn foreign(mut self, mut child: Criteria) -> Self {
        if !child.table.same_context(&self.context) {
            warn!(
                entity = %child.table.entity(),
                "foreign criteria was built on another context; refusing to attach it"
            );
            self.record(CriteriaError::DetachedContext {
                entity: child.table.entity().to_string(),
            });
            return self;
        }
        if !matches!(child.kind, CriteriaKind::Foreign(_)) {
            child.kind = CriteriaKind::Foreign(JoinType::default());
        }
        if child.master.is_none() {
            child.master = Some(Arc::clone(&self.table));
        }
        self.table.enable_alias();
        child.table.enable_alias();
        self.fragments.invalidate();
        child.fragments.invalidate();
        self.foreigns.push(child);
        self
    }

    /// Derive a child for `entity`, let `builder` shape it and attach it as a join
    pub fn join<F>(self, entity: &str, join_type: JoinType, builder: F) -> Self
    where
        F: FnOnce(Criteria) -> Criteria,
    {
        let child = builder(self.derive(entity).join_type(join_type));
        self.foreign(child)
    }

    pub fn join_type(mut self, join_type: JoinType) -> Self {
        match self.kind {
            CriteriaKind::Foreign(_) | CriteriaKind::SubQuery => {
                self.kind = CriteriaKind::Foreign(join_type);
            }
            _ => self.record(CriteriaError::unsupported("join_type", self.kind.role())),
        }
        self
    }

    pub fn inner_join(self) -> Self {
        self.join_type(JoinType::Inner)
    }

    pub fn left_join(self) -> Self {
        self.join_type(JoinType::Left)
    }

    /// Select from a derived table instead of this node's own table
    pub fn from_sub_query<F>(mut self, entity: &str, builder: F) -> Self
    where
        F: FnOnce(Criteria) -> Criteria,
    {
        let query = builder(self.derive(entity));
        self.sub_query = Some(Box::new(query));
        self.fragments.invalidate();
        self
    }

    // ------------------------------------------------------------------
    // Range
    // ------------------------------------------------------------------

    /// Rows `start..end`; replaces any page window
    pub fn range_with_row(mut self, start: u64, end: u64) -> Self {
        self.range = Range::rows(start, end);
        self
    }

    /// Pages `start..=end` of `size`; replaces any row window
    pub fn range_with_page(mut self, start: u64, end: u64, size: u64) -> Self {
        self.range = Range::pages(start, end, size);
        self
    }

    pub fn range(&self) -> Range {
        self.range
    }

    pub fn range_mode(&self) -> RangeMode {
        self.range.mode()
    }

    // ------------------------------------------------------------------
    // Update role
    // ------------------------------------------------------------------

    /// `SET field = value`. Only update nodes accept this; anywhere else the call
    /// is recorded as an error that every render returns.
    pub fn set(mut self, field: impl Into<Field>, value: impl Into<Value>) -> Self {
        if self.update_set.is_none() {
            self.record(CriteriaError::unsupported("set", self.kind.role()));
            return self;
        }
        let Some(target) = self.resolve_field(field) else {
            return self;
        };
        if let Target::Standard { column, .. } = &target {
            if !column.updatable {
                if self.strict {
                    let operation = format!("set {}", column.property);
                    self.record(CriteriaError::unsupported(operation, "read-only column"));
                }
                return self;
            }
        }
        let token = self.context.params().allocate(None, value.into());
        if let Some(update_set) = self.update_set.as_mut() {
            update_set.assignments.push(Assignment { target, token });
        }
        self
    }

    pub fn update_set(&self) -> Result<&UpdateSet> {
        self.update_set
            .as_ref()
            .ok_or_else(|| CriteriaError::unsupported("update_set", self.kind.role()))
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn context(&self) -> &Arc<CriteriaContext> {
        &self.context
    }

    pub fn params(&self) -> &ParameterAllocator {
        self.context.params()
    }

    pub fn table(&self) -> &Arc<TableHandle> {
        &self.table
    }

    pub fn entity(&self) -> &str {
        self.table.entity()
    }

    pub fn alias(&self) -> String {
        self.table.alias()
    }

    pub fn kind(&self) -> CriteriaKind {
        self.kind
    }

    pub fn fragments(&self) -> &FragmentAccumulator {
        &self.fragments
    }

    pub fn master(&self) -> Option<&Arc<TableHandle>> {
        self.master.as_ref()
    }

    pub fn sub_query(&self) -> Option<&Criteria> {
        self.sub_query.as_deref()
    }

    pub fn foreigns(&self) -> &[Criteria] {
        &self.foreigns
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    pub fn is_group_all(&self) -> bool {
        self.group_all
    }

    pub fn keeps_order_hint(&self) -> bool {
        self.keep_order_hint
    }

    pub fn is_fetch(&self) -> bool {
        self.fetch
    }

    /// First strict-mode or role violation recorded on this node
    pub fn error(&self) -> Option<&CriteriaError> {
        self.error.as_ref()
    }

    /// Visit this node and every node reachable from it: embedded sub-query,
    /// sub-query selections, joined nodes, and sub-queries inside conditions.
    pub(crate) fn for_each_node(&self, visit: &mut dyn FnMut(&Criteria)) {
        visit(self);
        if let Some(sub_query) = &self.sub_query {
            sub_query.for_each_node(visit);
        }
        for selection in self.fragments.selections() {
            if let Some(query) = selection.sub_query_ref() {
                query.for_each_node(visit);
            }
        }
        for foreign in &self.foreigns {
            foreign.for_each_node(visit);
        }
        for expression in self
            .fragments
            .conditions()
            .iter()
            .chain(self.fragments.havings())
        {
            for query in expression.sub_queries() {
                query.for_each_node(visit);
            }
        }
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    pub fn render(&self) -> Result<Statement> {
        SqlRenderer::new(self).render()
    }

    pub fn render_count(&self) -> Result<Statement> {
        SqlRenderer::new(self).render_count()
    }

    pub fn render_update(&self) -> Result<Statement> {
        SqlRenderer::new(self).render_update()
    }

    /// Render and rewrite named tokens into the configured positional markers
    pub fn render_complete(&self) -> Result<CompiledStatement> {
        self.render()?
            .complete(self.context.config().placeholder_style)
    }
}
