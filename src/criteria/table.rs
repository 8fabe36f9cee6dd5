use super::node::CriteriaContext;
use crate::metadata::TableDescriptor;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{trace, warn};

/// Identity of the table a criteria node is bound to.
///
/// Expressions, selections and joined nodes hold an `Arc<TableHandle>` of the node
/// that owns their columns, so a column can be qualified with that node's alias at
/// render time no matter where in the tree it ends up.
#[derive(Debug)]
pub struct TableHandle {
    descriptor: Arc<TableDescriptor>,
    context: Arc<CriteriaContext>,
    alias: RwLock<Option<String>>,
    explicit: AtomicBool,
    aliased: AtomicBool,
    alias_epoch: AtomicU64,
}

impl TableHandle {
    pub(crate) fn new(descriptor: Arc<TableDescriptor>, context: Arc<CriteriaContext>) -> Self {
        Self {
            descriptor,
            context,
            alias: RwLock::new(None),
            explicit: AtomicBool::new(false),
            aliased: AtomicBool::new(false),
            alias_epoch: AtomicU64::new(0),
        }
    }

    pub fn descriptor(&self) -> &TableDescriptor {
        &self.descriptor
    }

    pub fn entity(&self) -> &str {
        &self.descriptor.entity
    }

    pub fn table_name(&self) -> &str {
        &self.descriptor.table
    }

    /// Alias of this table, generated from the tree-wide sequence on first use
    pub fn alias(&self) -> String {
        if let Some(alias) = self.alias.read().as_ref() {
            return alias.clone();
        }

        let mut slot = self.alias.write();
        if let Some(alias) = slot.as_ref() {
            return alias.clone();
        }
        let generated = self.context.next_alias();
        trace!(entity = %self.entity(), alias = %generated, "generated table alias");
        *slot = Some(generated.clone());
        generated
    }

    pub fn has_explicit_alias(&self) -> bool {
        self.explicit.load(Ordering::Acquire)
    }

    /// Set an explicit alias. Also turns aliasing on.
    pub fn set_alias(&self, alias: &str) {
        let mut slot = self.alias.write();
        if let Some(previous) = slot.as_ref() {
            if !self.has_explicit_alias() && previous != alias {
                warn!(
                    entity = %self.entity(),
                    previous = %previous,
                    alias = %alias,
                    "replacing an alias that was already generated; earlier renders used the old one"
                );
            }
        }
        *slot = Some(alias.to_string());
        self.explicit.store(true, Ordering::Release);
        self.aliased.store(true, Ordering::Release);
        self.alias_epoch.fetch_add(1, Ordering::AcqRel);
    }

    pub fn enable_alias(&self) {
        if !self.aliased.swap(true, Ordering::AcqRel) {
            self.alias_epoch.fetch_add(1, Ordering::AcqRel);
        }
    }

    /// Bumped whenever qualification of this table's columns changes. Every node
    /// sharing the handle sees the bump, scratch nodes included.
    pub fn alias_epoch(&self) -> u64 {
        self.alias_epoch.load(Ordering::Acquire)
    }

    pub fn is_aliased(&self) -> bool {
        self.aliased.load(Ordering::Acquire)
    }

    /// `alias.column` when aliasing is on, the bare column otherwise
    pub fn qualify(&self, column: &str) -> String {
        if self.is_aliased() {
            format!("{}.{}", self.alias(), column)
        } else {
            column.to_string()
        }
    }

    /// `table alias` when aliasing is on, the bare table otherwise
    pub fn table_reference(&self) -> String {
        if self.is_aliased() {
            format!("{} {}", self.table_name(), self.alias())
        } else {
            self.table_name().to_string()
        }
    }

    pub(crate) fn same_context(&self, context: &Arc<CriteriaContext>) -> bool {
        Arc::ptr_eq(&self.context, context)
    }
}
