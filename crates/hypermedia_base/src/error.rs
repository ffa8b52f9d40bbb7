use std::error::Error as StdError;
use std::fmt;
use std::path::PathBuf;

use tracing_error::{SpanTrace, SpanTraceStatus};

/* 📖 # Error handling without anyhow/thiserror

The error type is hand-written: an `ErrorKind` with the structured data of each failure,
wrapped in `HypermediaError`, which adds context strings, an optional cause and the span
trace active when the error was created.

Output-generation failures fall into three groups:
- contract violations raised by the generator (`Structure`, `DuplicateElement`)
- dispatch failures (`NoVisitorFound`, `InvalidType`, `InternalErrorValue`)
- environment failures (`FileError`, `Config`, `Serialization`)

None of them are retried anywhere; they travel up to the caller unchanged.
*/

/// Error variants that can occur while producing hypermedia output.
#[derive(Debug)]
pub enum ErrorKind {
    /// File system operation failed
    FileError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Document elements were opened or closed in an illegal order
    Structure { message: String },

    /// An element name occurred twice inside the same parent
    DuplicateElement { element: String, parent: String },

    /// No visitor is registered for the value type or any of its ancestors
    NoVisitorFound { type_names: Vec<String> },

    /// A value of an unexpected type was handed to a visitor
    InvalidType { expected: String, found: String },

    /// An internal error value was passed where content was expected
    InternalErrorValue { message: String },

    /// Encoding the normalized document failed
    Serialization { message: String },

    /// Configuration could not be parsed
    Config { message: String },

    /// Catch-all for other errors with a message
    Message { message: String },
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::FileError { path, source } => {
                write!(f, "File error at {}: {}", path.display(), source)
            }
            ErrorKind::Structure { message } => write!(f, "{}", message),
            ErrorKind::DuplicateElement { element, parent } => {
                write!(f, "Element {} may only occur once inside of {}.", element, parent)
            }
            ErrorKind::NoVisitorFound { type_names } => match type_names.first() {
                Some(first) => write!(
                    f,
                    "No visitor found for {}! Tried: {}",
                    first,
                    type_names.join(", ")
                ),
                None => write!(f, "No visitor found!"),
            },
            ErrorKind::InvalidType { expected, found } => {
                write!(f, "Expected value of type {}, got {}.", expected, found)
            }
            ErrorKind::InternalErrorValue { message } => {
                write!(f, "Refusing to render internal error value: {}", message)
            }
            ErrorKind::Serialization { message } => write!(f, "Serialization failed: {}", message),
            ErrorKind::Config { message } => write!(f, "Invalid configuration: {}", message),
            ErrorKind::Message { message } => write!(f, "{}", message),
        }
    }
}

/// Error type wrapping an [`ErrorKind`] with context, an optional cause and a span trace.
pub struct HypermediaError {
    kind: ErrorKind,
    context: Vec<String>,
    cause: Option<Box<HypermediaError>>,
    span_trace: SpanTrace,
}

impl HypermediaError {
    /// Creates a new error from an ErrorKind, capturing the current span trace.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: vec![],
            cause: None,
            span_trace: SpanTrace::capture(),
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Message {
            message: message.into(),
        })
    }

    pub fn structure(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Structure {
            message: message.into(),
        })
    }

    pub fn duplicate_element(element: impl Into<String>, parent: impl Into<String>) -> Self {
        Self::new(ErrorKind::DuplicateElement {
            element: element.into(),
            parent: parent.into(),
        })
    }

    pub fn no_visitor_found(type_names: Vec<String>) -> Self {
        Self::new(ErrorKind::NoVisitorFound { type_names })
    }

    pub fn invalid_type(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidType {
            expected: expected.into(),
            found: found.into(),
        })
    }

    pub fn internal_error_value(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InternalErrorValue {
            message: message.into(),
        })
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Serialization {
            message: message.into(),
        })
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config {
            message: message.into(),
        })
    }

    /// Attaches context to an error.
    /// Context is displayed before the error message.
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Attaches context using lazy evaluation.
    pub fn with_context<F>(mut self, f: F) -> Self
    where
        F: FnOnce() -> String,
    {
        self.context.push(f());
        self
    }

    /// Records the error that led to this one.
    pub fn caused_by(mut self, cause: HypermediaError) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Returns a reference to the underlying ErrorKind.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn get_context(&self) -> &[String] {
        &self.context
    }

    pub fn cause(&self) -> Option<&HypermediaError> {
        self.cause.as_deref()
    }

    pub fn span_trace(&self) -> &SpanTrace {
        &self.span_trace
    }

    /// Returns the innermost error in the chain.
    pub fn root_cause(&self) -> &(dyn StdError + 'static) {
        let mut current: &(dyn StdError + 'static) = self;
        while let Some(next) = current.source() {
            current = next;
        }
        current
    }

    fn write_tree(&self, f: &mut fmt::Formatter<'_>, indent: &str) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        let branches = self.context.len() + usize::from(self.cause.is_some());
        for (i, ctx) in self.context.iter().enumerate() {
            let branch = if i + 1 == branches { "└─" } else { "├─" };
            write!(f, "\n{}{} {}", indent, branch, ctx)?;
        }
        if let Some(cause) = &self.cause {
            write!(f, "\n{}└─ cause: ", indent)?;
            cause.write_tree(f, &format!("{}   ", indent))?;
        }
        Ok(())
    }
}

impl From<ErrorKind> for HypermediaError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl StdError for HypermediaError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        if let Some(cause) = &self.cause {
            return Some(cause.as_ref());
        }
        match &self.kind {
            ErrorKind::FileError { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl fmt::Display for HypermediaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ctx in &self.context {
            write!(f, "{}: ", ctx)?;
        }
        write!(f, "{}", self.kind)
    }
}

impl fmt::Debug for HypermediaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_tree(f, "")?;
        if self.span_trace.status() == SpanTraceStatus::CAPTURED {
            write!(f, "\nTrace: {}", self.span_trace)?;
        }
        Ok(())
    }
}

/// Standard result type for hypermedia operations.
pub type HypermediaResult<T> = std::result::Result<T, Box<HypermediaError>>;

/// Extension trait for attaching context to Results.
pub trait ResultExt<T> {
    /// Attaches context to an error, consuming and re-wrapping it.
    fn context(self, context: impl Into<String>) -> HypermediaResult<T>;

    /// Attaches context using lazy evaluation.
    /// Context is only evaluated if the result is an error.
    fn with_context<F>(self, f: F) -> HypermediaResult<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for HypermediaResult<T> {
    fn context(self, context: impl Into<String>) -> HypermediaResult<T> {
        self.map_err(|err| Box::new(err.context(context)))
    }

    fn with_context<F>(self, f: F) -> HypermediaResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|err| Box::new(err.with_context(f)))
    }
}
