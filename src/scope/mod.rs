//! Record-level visibility: which rows of a collection a principal may touch.

pub mod filter;
pub mod resolver;

pub use filter::{IdScope, ScopeFilter, ScopeTarget, Scoped};
pub use resolver::{resolve_scope, strategy_for, RoleScope, ScopeRequest};
