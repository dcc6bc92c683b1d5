//! Configuration for graph serialization.
//!
//! - [`SerializerSettings`]: the per-call policy bundle
//! - policy enums for references, loops, missing members, nulls, defaults and type names
//!
//! ## Examples
//!
//! ```rust
//! use jsongraph::{PreserveReferencesHandling, ReferenceLoopHandling, SerializerSettings};
//!
//! let settings = SerializerSettings::pretty()
//!     .with_preserve_references_handling(PreserveReferencesHandling::Objects)
//!     .with_reference_loop_handling(ReferenceLoopHandling::Ignore)
//!     .with_max_depth(Some(32));
//! assert_eq!(settings.max_depth, Some(32));
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::contract::ContractKind;
use crate::converter::JsonConverter;
use crate::error::{ErrorContext, ErrorDecision, ErrorHandler};
use crate::reference::ReferenceResolver;
use crate::resolver::ContractResolver;

/// Output layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Formatting {
    #[default]
    None,
    Indented,
}

/// What to do when writing a member would re-enter an object on the current write stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ReferenceLoopHandling {
    /// Abort with a self referencing loop error.
    #[default]
    Error,
    /// Omit the member or element.
    Ignore,
    /// Write it anyway; the data is trusted to terminate.
    Serialize,
}

/// Which contract kinds get `$id`/`$ref` tracking when nothing more specific says so.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PreserveReferencesHandling {
    #[default]
    None,
    Objects,
    Arrays,
    All,
}

impl PreserveReferencesHandling {
    /// Whether values of the given kind are tracked by default.
    #[must_use]
    pub const fn covers(self, kind: ContractKind) -> bool {
        match self {
            PreserveReferencesHandling::None => false,
            PreserveReferencesHandling::All => true,
            PreserveReferencesHandling::Objects => matches!(
                kind,
                ContractKind::Object
                    | ContractKind::Dictionary
                    | ContractKind::Dynamic
                    | ContractKind::Serializable
            ),
            PreserveReferencesHandling::Arrays => matches!(kind, ContractKind::Array),
        }
    }
}

/// Unknown JSON properties on read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum MissingMemberHandling {
    #[default]
    Ignore,
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum NullValueHandling {
    #[default]
    Include,
    Ignore,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DefaultValueHandling {
    #[default]
    Include,
    /// Skip members equal to their default on write.
    Ignore,
    /// Set absent members to their default on read.
    Populate,
    IgnoreAndPopulate,
}

impl DefaultValueHandling {
    #[must_use]
    pub const fn ignores(self) -> bool {
        matches!(
            self,
            DefaultValueHandling::Ignore | DefaultValueHandling::IgnoreAndPopulate
        )
    }

    #[must_use]
    pub const fn populates(self) -> bool {
        matches!(
            self,
            DefaultValueHandling::Populate | DefaultValueHandling::IgnoreAndPopulate
        )
    }
}

/// When to write `$type` metadata.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TypeNameHandling {
    #[default]
    None,
    Objects,
    Arrays,
    All,
    /// Only when the runtime type differs from the declared type.
    Auto,
}

/// Verbosity of `$type` names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TypeNameFormat {
    /// The short type name, `Dog`.
    #[default]
    Simple,
    /// The full type path, `my_crate::zoo::Dog`.
    Full,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ConstructorHandling {
    #[default]
    Default,
    AllowNonPublicDefaultConstructor,
}

/// Whether a member must be present in JSON.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Required {
    /// Optional.
    #[default]
    Default,
    /// Must be present; `null` is accepted.
    AllowNull,
    /// Must be present and not `null`.
    Always,
}

/// Builds the reference table for one call.
pub type ReferenceResolverFactory = Arc<dyn Fn() -> Box<dyn ReferenceResolver> + Send + Sync>;

/// Settings for one serializer.
///
/// # Examples
///
/// ```rust
/// use jsongraph::{MissingMemberHandling, SerializerSettings};
///
/// let settings = SerializerSettings::new()
///     .with_missing_member_handling(MissingMemberHandling::Error);
/// assert_eq!(settings.missing_member_handling, MissingMemberHandling::Error);
/// ```
#[derive(Clone)]
pub struct SerializerSettings {
    pub formatting: Formatting,
    pub indent: usize,
    pub reference_loop_handling: ReferenceLoopHandling,
    pub preserve_references_handling: PreserveReferencesHandling,
    pub missing_member_handling: MissingMemberHandling,
    pub null_value_handling: NullValueHandling,
    pub default_value_handling: DefaultValueHandling,
    pub type_name_handling: TypeNameHandling,
    pub type_name_format: TypeNameFormat,
    pub constructor_handling: ConstructorHandling,
    pub max_depth: Option<usize>,
    pub check_additional_content: bool,
    pub error_handler: Option<ErrorHandler>,
    pub contract_resolver: Option<Arc<ContractResolver>>,
    pub converters: Vec<Arc<dyn JsonConverter>>,
    pub reference_resolver: Option<ReferenceResolverFactory>,
}

impl Default for SerializerSettings {
    fn default() -> Self {
        SerializerSettings {
            formatting: Formatting::None,
            indent: 2,
            reference_loop_handling: ReferenceLoopHandling::default(),
            preserve_references_handling: PreserveReferencesHandling::default(),
            missing_member_handling: MissingMemberHandling::default(),
            null_value_handling: NullValueHandling::default(),
            default_value_handling: DefaultValueHandling::default(),
            type_name_handling: TypeNameHandling::default(),
            type_name_format: TypeNameFormat::default(),
            constructor_handling: ConstructorHandling::default(),
            max_depth: Some(64),
            check_additional_content: true,
            error_handler: None,
            contract_resolver: None,
            converters: Vec::new(),
            reference_resolver: None,
        }
    }
}

impl fmt::Debug for SerializerSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializerSettings")
            .field("formatting", &self.formatting)
            .field("indent", &self.indent)
            .field("reference_loop_handling", &self.reference_loop_handling)
            .field(
                "preserve_references_handling",
                &self.preserve_references_handling,
            )
            .field("missing_member_handling", &self.missing_member_handling)
            .field("null_value_handling", &self.null_value_handling)
            .field("default_value_handling", &self.default_value_handling)
            .field("type_name_handling", &self.type_name_handling)
            .field("type_name_format", &self.type_name_format)
            .field("constructor_handling", &self.constructor_handling)
            .field("max_depth", &self.max_depth)
            .field("check_additional_content", &self.check_additional_content)
            .field("error_handler", &self.error_handler.is_some())
            .field("converters", &self.converters.len())
            .finish_non_exhaustive()
    }
}

impl SerializerSettings {
    /// Creates default settings (compact output, no reference tracking, loops are errors).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use jsongraph::{Formatting, ReferenceLoopHandling, SerializerSettings};
    ///
    /// let settings = SerializerSettings::new();
    /// assert_eq!(settings.formatting, Formatting::None);
    /// assert_eq!(settings.reference_loop_handling, ReferenceLoopHandling::Error);
    /// assert_eq!(settings.max_depth, Some(64));
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates settings for indented output.
    #[must_use]
    pub fn pretty() -> Self {
        SerializerSettings {
            formatting: Formatting::Indented,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_formatting(mut self, formatting: Formatting) -> Self {
        self.formatting = formatting;
        self
    }

    /// Sets the indentation size (number of spaces per level). Only affects indented output.
    #[must_use]
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    #[must_use]
    pub fn with_reference_loop_handling(mut self, handling: ReferenceLoopHandling) -> Self {
        self.reference_loop_handling = handling;
        self
    }

    #[must_use]
    pub fn with_preserve_references_handling(
        mut self,
        handling: PreserveReferencesHandling,
    ) -> Self {
        self.preserve_references_handling = handling;
        self
    }

    #[must_use]
    pub fn with_missing_member_handling(mut self, handling: MissingMemberHandling) -> Self {
        self.missing_member_handling = handling;
        self
    }

    #[must_use]
    pub fn with_null_value_handling(mut self, handling: NullValueHandling) -> Self {
        self.null_value_handling = handling;
        self
    }

    #[must_use]
    pub fn with_default_value_handling(mut self, handling: DefaultValueHandling) -> Self {
        self.default_value_handling = handling;
        self
    }

    #[must_use]
    pub fn with_type_name_handling(mut self, handling: TypeNameHandling) -> Self {
        self.type_name_handling = handling;
        self
    }

    #[must_use]
    pub fn with_type_name_format(mut self, format: TypeNameFormat) -> Self {
        self.type_name_format = format;
        self
    }

    #[must_use]
    pub fn with_constructor_handling(mut self, handling: ConstructorHandling) -> Self {
        self.constructor_handling = handling;
        self
    }

    /// Sets the maximum nesting depth for reading and writing. `None` disables the check.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[must_use]
    pub fn with_check_additional_content(mut self, check: bool) -> Self {
        self.check_additional_content = check;
        self
    }

    /// Installs the callback offered every per-node failure before it propagates.
    #[must_use]
    pub fn with_error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(Option<&dyn Any>, &ErrorContext) -> ErrorDecision + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    #[must_use]
    pub fn with_contract_resolver(mut self, resolver: Arc<ContractResolver>) -> Self {
        self.contract_resolver = Some(resolver);
        self
    }

    #[must_use]
    pub fn with_converter(mut self, converter: Arc<dyn JsonConverter>) -> Self {
        self.converters.push(converter);
        self
    }

    /// Replaces the default `$id`/`$ref` table with a custom one, built fresh for every call.
    #[must_use]
    pub fn with_reference_resolver<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn ReferenceResolver> + Send + Sync + 'static,
    {
        self.reference_resolver = Some(Arc::new(factory));
        self
    }
}
