//! Push-down rules and the planner that applies them

use thiserror::Error;

use crate::observability::Logger;

/// Errors raised while rewriting a query tree
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RewriteError {
    #[error("Rule '{rule}' failed: {reason}")]
    Rule { rule: String, reason: String },

    #[error("No rules configured")]
    NoRules,
}

impl RewriteError {
    /// Failure of the named rule
    pub fn rule(rule: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Rule {
            rule: rule.into(),
            reason: reason.into(),
        }
    }
}

/// One predicate push-down transformation over a query tree `T`.
pub trait PushDownRule<T> {
    /// Stable rule name, used in logs and errors.
    fn name(&self) -> &str;

    /// Rewrite `tree`, returning it unchanged when the rule does not apply.
    fn apply(&self, tree: T) -> Result<T, RewriteError>;
}

/// Holds a rule set and applies it to query trees.
pub trait PushDownPlanner<T> {
    /// Replace the configured rules.
    fn set_rules(&mut self, rules: Vec<Box<dyn PushDownRule<T>>>);

    /// The configured rules, in application order.
    fn rules(&self) -> &[Box<dyn PushDownRule<T>>];

    /// Return a rewritten tree reflecting pushed-down predicates.
    fn apply_rules(&self, tree: T) -> Result<T, RewriteError>;
}

/// Planner that applies its rules in order, feeding each the previous output.
///
/// The first failing rule aborts the chain.
pub struct RuleChain<T> {
    rules: Vec<Box<dyn PushDownRule<T>>>,
    require_rules: bool,
}

impl<T> RuleChain<T> {
    /// An empty chain; applying it returns the tree unchanged.
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            require_rules: false,
        }
    }

    /// A chain over `rules`.
    pub fn with_rules(rules: Vec<Box<dyn PushDownRule<T>>>) -> Self {
        Self {
            rules,
            require_rules: false,
        }
    }

    /// Fail with `NoRules` instead of passing trees through an empty chain.
    pub fn strict(mut self) -> Self {
        self.require_rules = true;
        self
    }

    /// Append a rule to the end of the chain.
    pub fn push(&mut self, rule: Box<dyn PushDownRule<T>>) {
        self.rules.push(rule);
    }
}

impl<T> Default for RuleChain<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PushDownPlanner<T> for RuleChain<T> {
    fn set_rules(&mut self, rules: Vec<Box<dyn PushDownRule<T>>>) {
        self.rules = rules;
    }

    fn rules(&self) -> &[Box<dyn PushDownRule<T>>] {
        &self.rules
    }

    fn apply_rules(&self, tree: T) -> Result<T, RewriteError> {
        if self.rules.is_empty() && self.require_rules {
            return Err(RewriteError::NoRules);
        }

        let mut tree = tree;
        for rule in &self.rules {
            tree = rule.apply(tree)?;
            Logger::trace("REWRITE_RULE_APPLIED", &[("rule", rule.name())]);
        }
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Append(&'static str);

    impl PushDownRule<String> for Append {
        fn name(&self) -> &str {
            self.0
        }

        fn apply(&self, tree: String) -> Result<String, RewriteError> {
            Ok(format!("{}>{}", tree, self.0))
        }
    }

    struct Reject;

    impl PushDownRule<String> for Reject {
        fn name(&self) -> &str {
            "reject"
        }

        fn apply(&self, _tree: String) -> Result<String, RewriteError> {
            Err(RewriteError::rule(self.name(), "unsupported node"))
        }
    }

    #[test]
    fn test_rules_apply_in_order() {
        let chain = RuleChain::with_rules(vec![Box::new(Append("a")), Box::new(Append("b"))]);
        assert_eq!(chain.apply_rules("q".to_string()).unwrap(), "q>a>b");
        assert_eq!(chain.rules().len(), 2);
    }

    #[test]
    fn test_failing_rule_aborts() {
        let mut chain = RuleChain::new();
        chain.push(Box::new(Append("a")));
        chain.push(Box::new(Reject));
        chain.push(Box::new(Append("b")));

        let err = chain.apply_rules("q".to_string()).unwrap_err();
        assert_eq!(err, RewriteError::rule("reject", "unsupported node"));
    }

    #[test]
    fn test_empty_chain() {
        let chain: RuleChain<String> = RuleChain::new();
        assert_eq!(chain.apply_rules("q".to_string()).unwrap(), "q");

        let strict: RuleChain<String> = RuleChain::new().strict();
        assert_eq!(strict.apply_rules("q".to_string()), Err(RewriteError::NoRules));
    }

    #[test]
    fn test_set_rules_replaces() {
        let mut chain = RuleChain::with_rules(vec![Box::new(Append("a"))]);
        chain.set_rules(vec![Box::new(Append("z"))]);
        assert_eq!(chain.apply_rules("q".to_string()).unwrap(), "q>z");
    }
}
