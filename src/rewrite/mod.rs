//! Query rewrite hooks
//!
//! The planning layer that decides which predicates are pushed down plugs in
//! here. The query tree is opaque: rules receive it by value and return the
//! rewritten tree.

mod planner;

pub use planner::{PushDownPlanner, PushDownRule, RewriteError, RuleChain};
