//! Error types for the decision engine.
//!
//! Every failure in the engine is a value of [`Error`]. Evaluation never
//! panics: errors raised while calculating an expression become the status
//! of a [`Response`](crate::policy::Response) and turn its effect into an
//! Indeterminate one.

use thiserror::Error;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the decision engine.
#[derive(Error, Debug)]
pub enum Error {
    /// A value was read through an accessor of a different type
    #[error("Expected {expected} value but got {actual}")]
    AttributeValueType {
        /// Type the accessor expects
        expected: String,
        /// Actual type of the value
        actual: String,
    },

    /// A flags accessor was used on a value that is not a flags value
    #[error("Expected flags value but got {actual}")]
    AttributeValueFlagsType {
        /// Actual type of the value
        actual: String,
    },

    /// A flags accessor of the wrong width was used
    #[error("Can't access {actual} bit flags of {flags_type} as {requested} bit flags")]
    AttributeValueFlagsBits {
        /// Name of the flags type
        flags_type: String,
        /// Width requested by the accessor
        requested: u32,
        /// Width of the flags type
        actual: u32,
    },

    /// Attempt to serialize the undefined value
    #[error("Can't serialize undefined value")]
    UndefinedSerialization,

    /// Text can't be parsed as a value of the given type
    #[error("Can't treat {text:?} as {type_name}: {message}")]
    InvalidValue {
        /// Name of the target type
        type_name: String,
        /// Offending text
        text: String,
        /// Detailed error message
        message: String,
    },

    /// The context has no attribute with the requested id and type
    #[error("Missing attribute {id} ({type_name})")]
    MissingAttribute {
        /// Attribute id
        id: String,
        /// Requested type
        type_name: String,
    },

    /// A lookup or a function has no value to produce
    #[error("Missing value: {message}")]
    MissingValue {
        /// Detailed error message
        message: String,
    },

    /// Obligation value doesn't match the declared attribute type
    #[error("Can't assign {actual} value to attribute {id} of type {expected}")]
    AssignmentTypeMismatch {
        /// Attribute id
        id: String,
        /// Declared attribute type
        expected: String,
        /// Type of the calculated value
        actual: String,
    },

    /// Function name is not in the registry
    #[error("Unknown function {name}")]
    UnknownFunction {
        /// Function name
        name: String,
    },

    /// Function can't be built from the given arguments
    #[error("Invalid arguments for {function}: {message}")]
    FunctionArguments {
        /// Function name
        function: String,
        /// Detailed error message
        message: String,
    },

    /// Function failed at evaluation time
    #[error("Function {function} failed: {message}")]
    Function {
        /// Function name
        function: String,
        /// Detailed error message
        message: String,
    },

    /// Modification path has no elements
    #[error("Path to modify is too short")]
    PathTooShort,

    /// Modification path goes through a missing child
    #[error("Node {parent} has no child {id}")]
    MissingChild {
        /// Id of the node being searched
        parent: String,
        /// Child id that wasn't found
        id: String,
    },

    /// Attempt to modify a hidden node
    #[error("Can't modify hidden {kind}")]
    HiddenNode {
        /// Kind of node (policy, policy set)
        kind: &'static str,
    },

    /// Attempt to append a hidden item
    #[error("Can't append hidden {kind}")]
    HiddenItem {
        /// Kind of item (rule, policy, policy set)
        kind: &'static str,
    },

    /// Item can't be placed at the given position
    #[error("Invalid item: {message}")]
    InvalidItem {
        /// Detailed error message
        message: String,
    },

    /// Two children of one node share an id
    #[error("Duplicate child id {id}")]
    DuplicateChild {
        /// Shared id
        id: String,
    },

    /// Flags mapper child id isn't a flag name
    #[error("Flags type {flags_type} has no flag {flag}")]
    UnknownFlag {
        /// Name of the flags type
        flags_type: String,
        /// Missing flag name
        flag: String,
    },

    /// Path starts with an id different from the root id
    #[error("Root id is {expected:?} but path starts with {actual:?}")]
    InvalidRootId {
        /// Root id (None for hidden root)
        expected: Option<String>,
        /// First path element
        actual: String,
    },

    /// Transaction base tag doesn't match the current storage tag
    #[error("Update tag {actual} doesn't match current tag {expected}")]
    TagMismatch {
        /// Current tag of the storage
        expected: String,
        /// Tag supplied with the transaction or update
        actual: String,
    },

    /// Tagged operation on storage that has no tag
    #[error("Storage {id} has no tag")]
    MissingTag {
        /// Storage or content id
        id: String,
    },

    /// Transaction failed earlier and can't be used
    #[error("Transaction failed: {message}")]
    FailedTransaction {
        /// Message of the original failure
        message: String,
    },

    /// Validation of a definition failed
    #[error("Validation error: {message}")]
    Validation {
        /// Detailed error message
        message: String,
        /// Field that caused the error, if applicable
        field: Option<String>,
    },

    /// Context can't be built
    #[error("Context error: {message}")]
    Context {
        /// Detailed error message
        message: String,
    },

    /// Content storage error
    #[error("Content error: {message}")]
    Content {
        /// Detailed error message
        message: String,
        /// Content id, if applicable
        content_id: Option<String>,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Detailed error message
        message: String,
        /// Configuration key that caused the error
        key: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Error attributed to a named rule, policy or policy set
    #[error("{id}>{source}")]
    Bound {
        /// Id of the node that produced the error
        id: String,
        /// Underlying error
        #[source]
        source: Box<Error>,
    },

    /// Several errors collected by one node
    #[error("multiple errors: {}", join(.0))]
    Multiple(Vec<Error>),

    /// Internal error (unexpected condition)
    #[error("Internal error: {message}")]
    Internal {
        /// Detailed error message
        message: String,
    },
}

fn join(errors: &[Error]) -> String {
    errors
        .iter()
        .map(|e| format!("\"{}\"", e))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Error {
    /// Create a type mismatch error.
    pub fn value_type(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Error::AttributeValueType {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create an invalid value error.
    pub fn invalid_value(
        type_name: impl Into<String>,
        text: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::InvalidValue {
            type_name: type_name.into(),
            text: text.into(),
            message: message.into(),
        }
    }

    /// Create a missing attribute error.
    pub fn missing_attribute(id: impl Into<String>, type_name: impl Into<String>) -> Self {
        Error::MissingAttribute {
            id: id.into(),
            type_name: type_name.into(),
        }
    }

    /// Create a missing value error.
    pub fn missing_value(message: impl Into<String>) -> Self {
        Error::MissingValue {
            message: message.into(),
        }
    }

    /// Create a construction-time function error.
    pub fn function_arguments(function: impl Into<String>, message: impl Into<String>) -> Self {
        Error::FunctionArguments {
            function: function.into(),
            message: message.into(),
        }
    }

    /// Create a runtime function error.
    pub fn function(function: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Function {
            function: function.into(),
            message: message.into(),
        }
    }

    /// Create an invalid item error.
    pub fn invalid_item(message: impl Into<String>) -> Self {
        Error::InvalidItem {
            message: message.into(),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
            field: None,
        }
    }

    /// Create a validation error with field context.
    pub fn validation_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a context error.
    pub fn context(message: impl Into<String>) -> Self {
        Error::Context {
            message: message.into(),
        }
    }

    /// Create a content error.
    pub fn content(message: impl Into<String>) -> Self {
        Error::Content {
            message: message.into(),
            content_id: None,
        }
    }

    /// Create a content error for the given content.
    pub fn content_with_id(message: impl Into<String>, content_id: impl Into<String>) -> Self {
        Error::Content {
            message: message.into(),
            content_id: Some(content_id.into()),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: None,
        }
    }

    /// Create a configuration error with key context.
    pub fn config_key(message: impl Into<String>, key: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
        }
    }

    /// Attribute the error to the node with the given id.
    pub fn bind(self, id: impl Into<String>) -> Self {
        Error::Bound {
            id: id.into(),
            source: Box::new(self),
        }
    }

    /// Merge two optional statuses into one.
    pub fn merge(first: Option<Error>, second: Option<Error>) -> Option<Error> {
        match (first, second) {
            (None, None) => None,
            (Some(e), None) | (None, Some(e)) => Some(e),
            (Some(Error::Multiple(mut a)), Some(Error::Multiple(b))) => {
                a.extend(b);
                Some(Error::Multiple(a))
            }
            (Some(Error::Multiple(mut a)), Some(b)) => {
                a.push(b);
                Some(Error::Multiple(a))
            }
            (Some(a), Some(b)) => Some(Error::Multiple(vec![a, b])),
        }
    }

    /// Collapse a list of errors into one status.
    pub fn collect(errors: Vec<Error>) -> Option<Error> {
        let mut errors = errors;
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Error::Multiple(errors)),
        }
    }

    /// The innermost error, looking through node attribution.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Bound { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Check if the error means a value is absent rather than broken.
    pub fn is_missing_value(&self) -> bool {
        matches!(
            self.root_cause(),
            Error::MissingAttribute { .. } | Error::MissingValue { .. }
        )
    }

    /// Check if the error is a type error.
    pub fn is_type_error(&self) -> bool {
        matches!(
            self.root_cause(),
            Error::AttributeValueType { .. }
                | Error::AttributeValueFlagsType { .. }
                | Error::AttributeValueFlagsBits { .. }
                | Error::UndefinedSerialization
                | Error::InvalidValue { .. }
                | Error::AssignmentTypeMismatch { .. }
        )
    }

    /// Get the error category for metrics.
    pub fn category(&self) -> &'static str {
        match self {
            Error::AttributeValueType { .. }
            | Error::AttributeValueFlagsType { .. }
            | Error::AttributeValueFlagsBits { .. }
            | Error::UndefinedSerialization
            | Error::InvalidValue { .. }
            | Error::AssignmentTypeMismatch { .. } => "type",
            Error::MissingAttribute { .. } | Error::MissingValue { .. } => "missing",
            Error::UnknownFunction { .. }
            | Error::FunctionArguments { .. }
            | Error::Function { .. } => "function",
            Error::PathTooShort
            | Error::MissingChild { .. }
            | Error::HiddenNode { .. }
            | Error::HiddenItem { .. }
            | Error::InvalidItem { .. }
            | Error::DuplicateChild { .. }
            | Error::UnknownFlag { .. }
            | Error::InvalidRootId { .. } => "modification",
            Error::TagMismatch { .. }
            | Error::MissingTag { .. }
            | Error::FailedTransaction { .. } => "versioning",
            Error::Validation { .. } => "validation",
            Error::Context { .. } => "context",
            Error::Content { .. } => "content",
            Error::Config { .. } => "config",
            Error::Io(_) => "io",
            Error::Serialization(_) => "serialization",
            Error::Bound { source, .. } => source.category(),
            Error::Multiple(_) => "multiple",
            Error::Internal { .. } => "internal",
        }
    }
}
