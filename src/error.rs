//! Error types for contract resolution and object-graph serialization.
//!
//! Every failure raised while walking a graph carries the JSON path of the
//! node that failed and, on the read side, the line and position of the token
//! that was being consumed.
//!
//! ## Error Categories
//!
//! - **Resolution**: a type cannot be instantiated, or its constructors are ambiguous
//! - **Syntax**: malformed JSON or an unexpected token for the target contract
//! - **Reference**: an unresolved `$ref` or a duplicated `$id`
//! - **Loop**: a self referencing loop under [`ReferenceLoopHandling::Error`]
//! - **Member**: required member missing, unknown member, value conversion failure
//! - **Host**: a failure raised by user code (accessors, creators, converters)
//!
//! ## Error Handling Pipeline
//!
//! When [`SerializerSettings::with_error_handler`] is set, each per-node failure
//! is wrapped in an [`ErrorContext`] and offered to the handler at the node
//! boundary and then at every ancestor boundary. Returning
//! [`ErrorDecision::Handled`] abandons the node and the walk continues.
//!
//! ```rust
//! use jsongraph::{from_str_with_settings, ErrorDecision, SerializerSettings};
//! use std::sync::{Arc, Mutex};
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&seen);
//! let settings = SerializerSettings::new().with_error_handler(move |_current, context| {
//!     sink.lock().unwrap().push(context.path().to_string());
//!     ErrorDecision::Handled
//! });
//!
//! let numbers: Vec<i32> = from_str_with_settings(r#"[1, "two", 3]"#, &settings).unwrap();
//! assert_eq!(numbers, vec![1, 3]);
//! assert_eq!(seen.lock().unwrap().as_slice(), ["[1]"]);
//! ```
//!
//! [`ReferenceLoopHandling::Error`]: crate::ReferenceLoopHandling::Error
//! [`SerializerSettings::with_error_handler`]: crate::SerializerSettings::with_error_handler

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Failure raised by user code: accessors, creators, converters and predicates.
pub type HostError = Box<dyn std::error::Error + Send + Sync>;

/// Where in the document an error happened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub path: String,
    pub line: Option<usize>,
    pub position: Option<usize>,
}

impl Location {
    /// A location known only by its JSON path (the write side).
    #[must_use]
    pub fn at_path(path: impl Into<String>) -> Self {
        Location {
            path: path.into(),
            line: None,
            position: None,
        }
    }

    /// A location with line information (the read side).
    #[must_use]
    pub fn new(path: impl Into<String>, line: usize, position: usize) -> Self {
        Location {
            path: path.into(),
            line: Some(line),
            position: Some(position),
        }
    }
}

fn render(message: &str, location: &Option<Location>) -> String {
    let Some(location) = location else {
        return message.to_string();
    };
    let mut out = String::with_capacity(message.len() + location.path.len() + 32);
    out.push_str(message);
    if !out.ends_with('.') {
        out.push('.');
    }
    out.push_str(" Path '");
    out.push_str(&location.path);
    out.push('\'');
    if let (Some(line), Some(position)) = (location.line, location.position) {
        out.push_str(&format!(", line {line}, position {position}"));
    }
    out.push('.');
    out
}

/// Represents all possible errors raised while resolving contracts or walking a graph.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Type cannot be instantiated or its constructors are ambiguous
    #[error("{}", render(.message, .location))]
    Resolution {
        message: String,
        location: Option<Location>,
    },

    /// Malformed JSON or a token that does not fit the target contract
    #[error("{}", render(.message, .location))]
    Syntax {
        message: String,
        location: Option<Location>,
    },

    /// Unresolved `$ref` or duplicated `$id`
    #[error("{}", render(.message, .location))]
    Reference {
        message: String,
        location: Option<Location>,
    },

    /// Self referencing loop under the `Error` loop policy
    #[error("{}", render(.message, .location))]
    Loop {
        message: String,
        location: Option<Location>,
    },

    /// Required, unknown or unconvertible member
    #[error("{}", render(.message, .location))]
    Member {
        message: String,
        location: Option<Location>,
    },

    /// Failure raised by user code
    #[error("{}", render(.message, .location))]
    Host {
        message: String,
        location: Option<Location>,
    },

    /// Nesting exceeded the configured maximum depth
    #[error("{}", render(.message, .location))]
    MaxDepth {
        message: String,
        location: Option<Location>,
    },

    /// The error handler kept suppressing the same failure at the same place
    #[error("{}", render(.message, .location))]
    InfiniteLoop {
        message: String,
        location: Option<Location>,
    },

    /// IO error during reading or writing
    #[error("IO error: {0}")]
    Io(String),

    /// Custom error
    #[error("{0}")]
    Custom(String),
}

impl Error {
    /// Creates a resolution error (not instantiable, ambiguous constructors).
    pub fn resolution(message: impl Into<String>) -> Self {
        Error::Resolution {
            message: message.into(),
            location: None,
        }
    }

    /// Creates a syntax error at the given location.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use jsongraph::{Error, Location};
    ///
    /// let err = Error::syntax("Unexpected character encountered while parsing value: x.", Location::new("", 1, 1));
    /// assert_eq!(
    ///     err.to_string(),
    ///     "Unexpected character encountered while parsing value: x. Path '', line 1, position 1."
    /// );
    /// ```
    pub fn syntax(message: impl Into<String>, location: Location) -> Self {
        Error::Syntax {
            message: message.into(),
            location: Some(location),
        }
    }

    /// Creates a structural error whose location is attached later by the walker.
    pub fn structure(message: impl Into<String>) -> Self {
        Error::Syntax {
            message: message.into(),
            location: None,
        }
    }

    pub fn reference(message: impl Into<String>) -> Self {
        Error::Reference {
            message: message.into(),
            location: None,
        }
    }

    pub fn loop_detected(message: impl Into<String>, location: Location) -> Self {
        Error::Loop {
            message: message.into(),
            location: Some(location),
        }
    }

    pub fn member(message: impl Into<String>) -> Self {
        Error::Member {
            message: message.into(),
            location: None,
        }
    }

    /// Wraps a failure raised by user code, keeping its message.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use jsongraph::{Error, HostError};
    ///
    /// let cause: HostError = "disk on fire".into();
    /// let err = Error::host("Error getting value from 'Name' on 'Person'", &cause);
    /// assert_eq!(err.to_string(), "Error getting value from 'Name' on 'Person': disk on fire");
    /// ```
    pub fn host(context: impl fmt::Display, cause: &HostError) -> Self {
        Error::Host {
            message: format!("{context}: {cause}"),
            location: None,
        }
    }

    pub fn max_depth(max_depth: usize, location: Location) -> Self {
        Error::MaxDepth {
            message: format!("The reader's MaxDepth of {max_depth} has been exceeded."),
            location: Some(location),
        }
    }

    /// Escalates a repeatedly suppressed failure. This error is never offered to the handler.
    pub fn infinite_loop(repeated: &Error) -> Self {
        Error::InfiniteLoop {
            message: "Infinite loop detected from error handling.".to_string(),
            location: repeated.location().cloned(),
        }
    }

    /// Creates a custom error with a display message.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use jsongraph::Error;
    ///
    /// let err = Error::custom("something went wrong");
    /// assert!(err.to_string().contains("something went wrong"));
    /// ```
    pub fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }

    /// Creates an I/O error for reading/writing failures.
    pub fn io(msg: &str) -> Self {
        Error::Io(msg.to_string())
    }

    /// The message without location details.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Error::Resolution { message, .. }
            | Error::Syntax { message, .. }
            | Error::Reference { message, .. }
            | Error::Loop { message, .. }
            | Error::Member { message, .. }
            | Error::Host { message, .. }
            | Error::MaxDepth { message, .. }
            | Error::InfiniteLoop { message, .. } => message,
            Error::Io(message) | Error::Custom(message) => message,
        }
    }

    #[must_use]
    pub fn location(&self) -> Option<&Location> {
        match self {
            Error::Resolution { location, .. }
            | Error::Syntax { location, .. }
            | Error::Reference { location, .. }
            | Error::Loop { location, .. }
            | Error::Member { location, .. }
            | Error::Host { location, .. }
            | Error::MaxDepth { location, .. }
            | Error::InfiniteLoop { location, .. } => location.as_ref(),
            Error::Io(_) | Error::Custom(_) => None,
        }
    }

    /// JSON path of the failing node, or an empty string when unknown.
    #[must_use]
    pub fn path(&self) -> &str {
        self.location().map_or("", |location| location.path.as_str())
    }

    /// Attaches a location unless the error already carries one.
    #[must_use]
    pub fn at(mut self, at: Location) -> Self {
        match &mut self {
            Error::Resolution { location, .. }
            | Error::Syntax { location, .. }
            | Error::Reference { location, .. }
            | Error::Loop { location, .. }
            | Error::Member { location, .. }
            | Error::Host { location, .. }
            | Error::MaxDepth { location, .. }
            | Error::InfiniteLoop { location, .. } => {
                if location.is_none() {
                    *location = Some(at);
                }
            }
            Error::Io(_) | Error::Custom(_) => {}
        }
        self
    }

    /// Fatal errors bypass the error handler.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Error::InfiniteLoop { .. })
    }

    fn signature(&self) -> (Option<Location>, String) {
        (self.location().cloned(), self.message().to_string())
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// What the error handler decided for one failing node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDecision {
    /// Rethrow: the failure unwinds the whole call.
    Propagate,
    /// Suppress: the node is abandoned and left at its default or omitted.
    Handled,
}

/// One failing node, as seen by the error handler.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    path: String,
    member: Option<String>,
    error: Error,
}

impl ErrorContext {
    fn new(error: Error, member: Option<&str>) -> Self {
        ErrorContext {
            path: error.path().to_string(),
            member: member.map(str::to_string),
            error,
        }
    }

    /// JSON path of the failing node.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Property name, dictionary key or array index of the node within its container.
    #[must_use]
    pub fn member(&self) -> Option<&str> {
        self.member.as_deref()
    }

    #[must_use]
    pub fn error(&self) -> &Error {
        &self.error
    }
}

/// Callback offered every per-node failure before it propagates.
///
/// The first argument is the container being written or populated when the
/// failure happened, `None` when no instance exists yet.
pub type ErrorHandler = Arc<dyn Fn(Option<&dyn Any>, &ErrorContext) -> ErrorDecision + Send + Sync>;

/// Call-scoped state of the error handler pipeline.
pub(crate) struct ErrorPipeline {
    handler: Option<ErrorHandler>,
    last_handled: Option<(Option<Location>, String)>,
}

impl ErrorPipeline {
    pub(crate) fn new(handler: Option<ErrorHandler>) -> Self {
        ErrorPipeline {
            handler,
            last_handled: None,
        }
    }

    /// Offers a failure to the handler. `Ok` means the node is abandoned and the walk goes on.
    pub(crate) fn offer(
        &mut self,
        error: Error,
        current: Option<&dyn Any>,
        member: Option<&str>,
    ) -> Result<()> {
        if error.is_fatal() {
            return Err(error);
        }
        let Some(handler) = self.handler.as_ref() else {
            return Err(error);
        };

        let context = ErrorContext::new(error, member);
        match handler(current, &context) {
            ErrorDecision::Propagate => Err(context.error),
            ErrorDecision::Handled => {
                let signature = context.error.signature();
                if self.last_handled.as_ref() == Some(&signature) {
                    tracing::warn!(
                        path = %context.path,
                        error = %context.error,
                        "same failure suppressed twice in a row, aborting"
                    );
                    return Err(Error::infinite_loop(&context.error));
                }
                tracing::warn!(
                    path = %context.path,
                    member = ?context.member,
                    error = %context.error,
                    "failure suppressed by error handler"
                );
                self.last_handled = Some(signature);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn always(decision: ErrorDecision) -> ErrorHandler {
        Arc::new(move |_, _| decision)
    }

    #[test]
    fn test_display_with_line_info() {
        let err = Error::member("Could not find member 'Age' on object of type 'Person'")
            .at(Location::new("Age", 1, 20));
        assert_eq!(
            err.to_string(),
            "Could not find member 'Age' on object of type 'Person'. Path 'Age', line 1, position 20."
        );
    }

    #[test]
    fn test_display_path_only() {
        let err = Error::loop_detected(
            "Self referencing loop detected with type 'Node'.",
            Location::at_path("[0].Next"),
        );
        assert_eq!(
            err.to_string(),
            "Self referencing loop detected with type 'Node'. Path '[0].Next'."
        );
    }

    #[test]
    fn test_at_keeps_first_location() {
        let err = Error::reference("Could not resolve reference '9'.")
            .at(Location::new("a", 1, 2))
            .at(Location::new("b", 3, 4));
        assert_eq!(err.path(), "a");
    }

    #[test]
    fn test_pipeline_without_handler_propagates() {
        let mut pipeline = ErrorPipeline::new(None);
        let result = pipeline.offer(Error::member("boom"), None, None);
        assert!(matches!(result, Err(Error::Member { .. })));
    }

    #[test]
    fn test_pipeline_propagate_decision() {
        let mut pipeline = ErrorPipeline::new(Some(always(ErrorDecision::Propagate)));
        assert!(pipeline.offer(Error::member("boom"), None, Some("x")).is_err());
    }

    #[test]
    fn test_pipeline_escalates_repeated_failure() {
        let mut pipeline = ErrorPipeline::new(Some(always(ErrorDecision::Handled)));
        let err = Error::syntax("bad", Location::new("[2]", 1, 8));
        assert!(pipeline.offer(err.clone(), None, None).is_ok());
        let escalated = pipeline.offer(err, None, None).unwrap_err();
        assert!(escalated.is_fatal());
        assert_eq!(
            escalated.to_string(),
            "Infinite loop detected from error handling. Path '[2]', line 1, position 8."
        );
    }

    #[test]
    fn test_pipeline_distinct_failures_are_not_a_loop() {
        let mut pipeline = ErrorPipeline::new(Some(always(ErrorDecision::Handled)));
        let first = Error::member("Required property 'A' not found in JSON.");
        let second = Error::member("Required property 'B' not found in JSON.");
        assert!(pipeline.offer(first, None, None).is_ok());
        assert!(pipeline.offer(second, None, None).is_ok());
    }

    #[test]
    fn test_fatal_errors_skip_handler() {
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let handler: ErrorHandler = Arc::new(move |_, _| {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            ErrorDecision::Handled
        });
        let mut pipeline = ErrorPipeline::new(Some(handler));
        let fatal = Error::infinite_loop(&Error::member("x"));
        assert!(pipeline.offer(fatal, None, None).is_err());
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }
}
