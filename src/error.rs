use thiserror::Error;

/// Domain errors the admin console and registration form need to tell apart.
/// Everything else propagates as `anyhow::Error`.
#[derive(Error, Debug)]
pub enum Error {
    #[error("A registrant with email '{0}' already exists")]
    DuplicateEmail(String),

    #[error("Registrant {0} not found")]
    RegistrantNotFound(i64),

    #[error("No registrants selected")]
    EmptySelection,

    #[error("Deletion requires explicit confirmation")]
    UnconfirmedDelete,

    #[error("Invalid registration: {0}")]
    Validation(String),

    #[error("Unknown table column '{0}'")]
    UnknownColumn(String),
}
