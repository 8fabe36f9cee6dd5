//! # Criteria Compiler
//!
//! Fluent, metadata-aware query criteria that compile to parameterized SQL.
//!
//! ## Overview
//!
//! A [`Criteria`] node is bound to one entity's table. Conditions, selections,
//! grouping, ordering and a range window are added fluently; property names are
//! resolved to physical columns through a [`MetadataResolver`](crate::metadata::MetadataResolver),
//! and every value is bound to a named placeholder (`:p1`, `:p2`, ...) the moment
//! it enters the node. Nodes derived from each other form a tree that shares one
//! [`CriteriaContext`], so placeholder names and table aliases stay unique across
//! joins and sub-queries.
//!
//! ## Key Components
//!
//! - [`expression`] - Conditions, targets and the validating expression builder
//! - [`selection`] - Projected columns and aggregate functions
//! - [`params`] - Per-tree placeholder allocator
//! - [`fragment`] - Per-node accumulated fragments with cached selection text
//! - [`joins`] - Join types used by foreign criteria
//! - [`pagination`] - Row and page windows
//! - [`node`] - The criteria node and its shared context
//! - [`render`] - Segment and statement rendering, positional rewriting
//!
//! ## Connectors
//!
//! `and()` / `or()` move a sticky cursor: every condition added afterwards joins
//! with that connector until the cursor moves again. Nested groups get their
//! connector explicitly through `and_nest` / `or_nest`.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use criteria_core::criteria::{Criteria, CriteriaContext};
//!
//! let ctx = CriteriaContext::with_resolver(registry);
//! let criteria = Criteria::new(&ctx, "Exam")
//!     .eq("studentId", 1)
//!     .or()
//!     .eq("grade", "A")
//!     .and_nest(false, |b| b.gt("score", 60).lt("score", 90));
//!
//! let statement = criteria.render()?;
//! // SELECT ... FROM exam WHERE student_id = :p1 OR grade = :p2
//! //     AND (score > :p3 AND score < :p4)
//! ```

pub mod expression;
pub mod fragment;
pub mod joins;
pub mod node;
pub mod pagination;
pub mod params;
pub mod render;
pub mod selection;
pub mod table;

pub use expression::{
    col, Comparison, Condition, Expression, ExpressionBuilder, Field, MatchMode, Operand, Slot,
    Target, TemplateArgs,
};
pub use fragment::{Direction, FragmentAccumulator, GroupItem, OrderItem};
pub use joins::JoinType;
pub use node::{Assignment, Criteria, CriteriaContext, CriteriaKind, UpdateSet};
pub use pagination::{Range, RangeMode};
pub use params::ParameterAllocator;
pub use render::{CompiledStatement, SqlRenderer, Statement};
pub use selection::{Function, FunctionOp, Selection, SelectionMode};
pub use table::TableHandle;
