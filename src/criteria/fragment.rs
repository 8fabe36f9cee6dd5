use super::expression::{Expression, Target};
use super::selection::{Function, Selection};
use indexmap::IndexSet;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn to_sql(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone)]
pub enum GroupItem {
    Column(Target),
    Native(String),
}

impl GroupItem {
    pub fn to_sql(&self) -> String {
        match self {
            GroupItem::Column(target) => target.to_sql(),
            GroupItem::Native(sql) => sql.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum OrderItem {
    Column { target: Target, direction: Direction },
    Function { function: Function, direction: Direction },
    Native(String),
}

impl OrderItem {
    pub fn to_sql(&self) -> String {
        match self {
            OrderItem::Column { target, direction } => {
                format!("{} {}", target.to_sql(), direction.to_sql())
            }
            OrderItem::Function {
                function,
                direction,
            } => format!("{} {}", function.to_sql(), direction.to_sql()),
            OrderItem::Native(sql) => sql.clone(),
        }
    }
}

/// Per-node ordered collections of selections, conditions, group, having and
/// order items. Insertion order is rendering order.
///
/// Rendered selection text is cached until the next structural change or until
/// the owning table's alias epoch moves; group, having and order text is rebuilt
/// on every render.
#[derive(Debug, Default)]
pub struct FragmentAccumulator {
    selections: Vec<Selection>,
    conditions: Vec<Expression>,
    groups: Vec<GroupItem>,
    havings: Vec<Expression>,
    orders: Vec<OrderItem>,
    excludes: IndexSet<String>,
    selection_cache: Mutex<Option<(u64, Arc<[String]>)>>,
}

impl Clone for FragmentAccumulator {
    fn clone(&self) -> Self {
        Self {
            selections: self.selections.clone(),
            conditions: self.conditions.clone(),
            groups: self.groups.clone(),
            havings: self.havings.clone(),
            orders: self.orders.clone(),
            excludes: self.excludes.clone(),
            selection_cache: Mutex::new(None),
        }
    }
}

impl FragmentAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_selection(&mut self, selection: Selection) {
        self.selections.push(selection);
        self.invalidate();
    }

    pub fn add_condition(&mut self, condition: Expression) {
        self.conditions.push(condition);
    }

    pub fn add_group(&mut self, group: GroupItem) {
        self.groups.push(group);
    }

    pub fn add_having(&mut self, having: Expression) {
        self.havings.push(having);
    }

    pub fn add_order(&mut self, order: OrderItem) {
        self.orders.push(order);
    }

    /// Drop a property or column from the wildcard selection
    pub fn exclude(&mut self, name: &str) {
        if !name.trim().is_empty() {
            self.excludes.insert(name.to_string());
            self.invalidate();
        }
    }

    pub fn is_excluded(&self, property: &str, column: &str) -> bool {
        self.excludes.contains(property) || self.excludes.contains(column)
    }

    pub fn selections(&self) -> &[Selection] {
        &self.selections
    }

    pub fn conditions(&self) -> &[Expression] {
        &self.conditions
    }

    pub fn groups(&self) -> &[GroupItem] {
        &self.groups
    }

    pub fn havings(&self) -> &[Expression] {
        &self.havings
    }

    pub fn orders(&self) -> &[OrderItem] {
        &self.orders
    }

    pub fn excludes(&self) -> impl Iterator<Item = &str> {
        self.excludes.iter().map(String::as_str)
    }

    pub fn condition_count(&self) -> usize {
        self.conditions.len()
    }

    pub fn has_selection(&self) -> bool {
        !self.selections.is_empty()
    }

    pub fn has_conditions(&self) -> bool {
        !self.conditions.is_empty()
    }

    pub fn has_any_fragment(&self) -> bool {
        !self.selections.is_empty()
            || !self.conditions.is_empty()
            || !self.groups.is_empty()
            || !self.havings.is_empty()
            || !self.orders.is_empty()
    }

    /// Move the collected conditions out, leaving the list empty
    pub(crate) fn take_conditions(&mut self) -> Vec<Expression> {
        std::mem::take(&mut self.conditions)
    }

    /// Cached selection text, computed by `compute` on a miss. An entry cached
    /// under another `epoch` is a miss.
    pub fn cached_selections<F>(&self, epoch: u64, compute: F) -> Arc<[String]>
    where
        F: FnOnce() -> Vec<String>,
    {
        let mut cache = self.selection_cache.lock();
        if let Some((cached_epoch, cached)) = cache.as_ref() {
            if *cached_epoch == epoch {
                return Arc::clone(cached);
            }
        }
        let computed: Arc<[String]> = compute().into();
        *cache = Some((epoch, Arc::clone(&computed)));
        computed
    }

    pub fn is_selection_cached(&self) -> bool {
        self.selection_cache.lock().is_some()
    }

    /// Forget cached selection text
    pub fn invalidate(&self) {
        *self.selection_cache.lock() = None;
    }
}
