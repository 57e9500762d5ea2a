use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

pub type StdErrorBoxed = Box<dyn std::error::Error + Send + Sync + 'static>;

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    /// A raw attribute value does not conform to a matching rule's syntax.
    ///
    /// This is fatal to the entire entry mutation it occurs in: no index
    /// write may be issued once key derivation has failed.
    pub fn invalid_value(rule: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidValue {
                rule: rule.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    /// An index kind is enabled for an attribute whose schema does not
    /// define the required matching rule.
    pub fn schema_mismatch(attribute: impl Into<String>, kind: impl Into<String>) -> Error {
        Error(
            ErrorKind::SchemaMismatch {
                attribute: attribute.into(),
                kind: kind.into(),
            }
            .into(),
        )
    }

    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidArgument {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    /// A failure reported by the persistent sorted store, surfaced unchanged.
    pub fn store<E>(context: impl Into<String>, source: E) -> Error
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error(
            ErrorKind::Store {
                context: context.into(),
                source: Box::new(source),
            }
            .into(),
        )
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid value for rule {rule}: {message}")]
    InvalidValue { rule: String, message: String },

    #[error("attribute {attribute} has no matching rule for {kind} indexing")]
    SchemaMismatch { attribute: String, kind: String },

    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("store error: {context}")]
    Store {
        context: String,
        source: StdErrorBoxed,
    },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}
