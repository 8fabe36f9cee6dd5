#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Criteria Core Rust
//!
//! Metadata-aware query criteria that compile to parameterized SQL.
//!
//! ## Overview
//!
//! Callers describe a query against entity properties (`"studentId"`, `"score"`)
//! instead of physical columns. The compiler resolves properties through registered
//! table metadata, binds every value to a named placeholder, and renders a
//! statement whose placeholders can be rewritten to `?` or `$n` markers for any
//! driver.
//!
//! ## Key Features
//!
//! - **Fluent criteria**: comparisons, LIKE, IN, BETWEEN, NULL tests, templates and raw SQL
//! - **Sticky connectors**: `and()` / `or()` set the connector for every following condition
//! - **Trees**: joins, EXISTS / IN sub-queries, scalar sub-selects and derived tables
//!   share one allocator, so placeholder names never collide
//! - **Aggregates**: COUNT / SUM / AVG / MIN / MAX with GROUP BY and HAVING
//! - **Pagination**: row and page windows, plus a count statement for totals
//! - **Update statements**: `SET` assignments honouring read-only columns
//!
//! ## Module Organization
//!
//! - [`criteria`] - Criteria nodes, expressions and the renderer
//! - [`metadata`] - Entity-to-table metadata and the resolver trait
//! - [`config`] - Compiler configuration
//! - [`constants`] - SQL keywords and defaults
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust
//! use criteria_core::criteria::{Criteria, CriteriaContext};
//! use criteria_core::config::PlaceholderStyle;
//! use criteria_core::metadata::{MetadataRegistry, TableDescriptor};
//! use std::sync::Arc;
//!
//! let registry = MetadataRegistry::new().with(
//!     TableDescriptor::new("Exam", "exam")
//!         .id("id", "id")
//!         .column("studentId", "student_id")
//!         .column("grade", "grade"),
//! );
//! let ctx = CriteriaContext::with_resolver(Arc::new(registry));
//!
//! let criteria = Criteria::new(&ctx, "Exam").eq("studentId", 1).or().eq("grade", "A");
//! let statement = criteria.render().unwrap();
//! assert_eq!(
//!     statement.sql(),
//!     "SELECT id, student_id, grade FROM exam WHERE student_id = :p1 OR grade = :p2"
//! );
//!
//! let compiled = statement.complete(PlaceholderStyle::Dollar).unwrap();
//! assert_eq!(
//!     compiled.sql,
//!     "SELECT id, student_id, grade FROM exam WHERE student_id = $1 OR grade = $2"
//! );
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # All tests, property tests included
//! ```

pub mod config;
pub mod constants;
pub mod criteria;
pub mod error;
pub mod logging;
pub mod metadata;

pub use config::{CriteriaConfig, PlaceholderStyle};
pub use criteria::{
    col, CompiledStatement, Comparison, Criteria, CriteriaContext, Direction, Expression,
    ExpressionBuilder, Field, Function, JoinType, MatchMode, Slot, SqlRenderer, Statement,
};
pub use error::{CriteriaError, Result};
pub use metadata::{ColumnDescriptor, Entity, MetadataRegistry, MetadataResolver, TableDescriptor};
