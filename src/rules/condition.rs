//! Predicates polled by conditional transition rules.

use std::fmt;

/// Predicate that decides whether a conditional transition fires.
///
/// Conditions are polled once per tick on the authority while the machine
/// sits in the rule's source state. They take no arguments: whatever they
/// depend on is captured by the closure.
///
/// # Example
///
/// ```rust
/// use retrostate::rules::Condition;
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
///
/// let grounded = Arc::new(AtomicBool::new(false));
/// let flag = Arc::clone(&grounded);
/// let landed = Condition::new(move || flag.load(Ordering::Relaxed));
///
/// assert!(!landed.check());
/// grounded.store(true, Ordering::Relaxed);
/// assert!(landed.check());
///
/// assert!(Condition::always().check());
/// ```
pub struct Condition {
    predicate: Box<dyn Fn() -> bool + Send + Sync>,
}

impl Condition {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Condition {
            predicate: Box::new(predicate),
        }
    }

    /// Condition used when a rule is registered without a predicate.
    pub fn always() -> Self {
        Self::new(|| true)
    }

    pub fn check(&self) -> bool {
        (self.predicate)()
    }
}

impl<F> From<Option<F>> for Condition
where
    F: Fn() -> bool + Send + Sync + 'static,
{
    fn from(predicate: Option<F>) -> Self {
        predicate.map_or_else(Self::always, Self::new)
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Condition(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn condition_reflects_captured_state() {
        let counter = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&counter);
        let condition = Condition::new(move || seen.load(Ordering::SeqCst) > 2);

        assert!(!condition.check());
        counter.store(3, Ordering::SeqCst);
        assert!(condition.check());
    }

    #[test]
    fn missing_predicate_is_always_true() {
        let condition = Condition::from(None::<fn() -> bool>);
        assert!(condition.check());
    }

    #[test]
    fn present_predicate_is_used() {
        let condition = Condition::from(Some(|| false));
        assert!(!condition.check());
    }
}
