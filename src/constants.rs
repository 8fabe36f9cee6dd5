//! # Criteria Constants
//!
//! SQL keywords and defaults shared by the renderer, the parameter allocator and the
//! configuration layer.

/// Default prefix for minted placeholder names (`:p1`, `:p2`, ...)
pub const DEFAULT_PLACEHOLDER_PREFIX: &str = "p";

/// Default prefix for generated table aliases (`t1`, `t2`, ...)
pub const DEFAULT_ALIAS_PREFIX: &str = "t";

/// Marker that asks later pagination/optimization passes to keep an explicit ORDER BY
pub const KEEP_ORDER_HINT: &str = "/* keep orderby */";

/// Sigil that starts a named placeholder token in rendered SQL
pub const NAMED_SIGIL: char = ':';

/// Slot in a value template that receives the minted token
pub const VALUE_TEMPLATE_SLOT: &str = "{0}";

/// Slot in a condition template that receives the qualified target column
pub const TEMPLATE_TARGET_SLOT: &str = "{@}";

/// SQL keywords emitted by the renderer
pub mod keywords {
    pub const SELECT: &str = "SELECT";
    pub const DISTINCT: &str = "DISTINCT";
    pub const FROM: &str = "FROM";
    pub const WHERE: &str = "WHERE";
    pub const GROUP_BY: &str = "GROUP BY";
    pub const HAVING: &str = "HAVING";
    pub const ORDER_BY: &str = "ORDER BY";
    pub const UPDATE: &str = "UPDATE";
    pub const SET: &str = "SET";
    pub const ON: &str = "ON";
    pub const AS: &str = "AS";
    pub const NOT: &str = "NOT";
    pub const COUNT_ALL: &str = "COUNT(*)";
}
