use super::Effect;
use crate::core::AttributeAssignment;
use crate::Error;

/// Result of evaluating a rule, policy or policy set.
#[derive(Debug)]
pub struct Response {
    /// Effect of the evaluated node
    pub effect: Effect,
    /// Errors met during evaluation
    pub status: Option<Error>,
    /// Obligations of the decisive branch
    pub obligations: Vec<AttributeAssignment>,
}

impl Response {
    /// Response with the given effect and nothing else.
    pub fn new(effect: Effect) -> Self {
        Self {
            effect,
            status: None,
            obligations: Vec::new(),
        }
    }

    /// Not applicable response.
    pub fn not_applicable() -> Self {
        Self::new(Effect::NotApplicable)
    }

    /// Indeterminate response carrying an error.
    pub fn indeterminate(effect: Effect, status: Error) -> Self {
        Self::new(effect.as_indeterminate()).with_status(status)
    }

    /// Set the status.
    pub fn with_status(mut self, status: Error) -> Self {
        self.status = Some(status);
        self
    }

    /// Set the obligations.
    pub fn with_obligations(mut self, obligations: Vec<AttributeAssignment>) -> Self {
        self.obligations = obligations;
        self
    }
}
