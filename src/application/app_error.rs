use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// Record or balance store unreachable or failing - the only
    /// condition callers should blindly retry.
    #[error("Database error: {0}")]
    Database(String),

    #[error("Missing payment reference")]
    MissingReference,

    #[error("Missing recipient: userEmail or userId required")]
    MissingRecipient,

    #[error("Payment not verified: {0}")]
    PaymentNotVerified(String),

    #[error("Unknown plan: {0}")]
    UnknownPlan(String),

    /// Computed credit grant was non-positive. A pricing-table bug, not
    /// a user mistake - surfaced distinctly from verification failures.
    #[error("Invalid credit grant for plan {0}")]
    InvalidGrant(String),

    #[error("Recipient account not found")]
    RecipientNotFound,

    #[error("Payment provider not configured")]
    ProviderNotConfigured,

    /// Provider is not available on this deployment region.
    #[error("Payment provider not supported")]
    ProviderNotSupported,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found")]
    NotFound,

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Clone, Copy, Debug)]
pub enum ErrorCode {
    DatabaseError,
    MissingReference,
    MissingRecipient,
    PaymentNotVerified,
    UnknownPlan,
    InvalidGrant,
    RecipientNotFound,
    ProviderNotConfigured,
    ProviderNotSupported,
    InvalidInput,
    NotFound,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::MissingReference => "MISSING_REFERENCE",
            ErrorCode::MissingRecipient => "MISSING_RECIPIENT",
            ErrorCode::PaymentNotVerified => "PAYMENT_NOT_VERIFIED",
            ErrorCode::UnknownPlan => "UNKNOWN_PLAN",
            ErrorCode::InvalidGrant => "INVALID_GRANT",
            ErrorCode::RecipientNotFound => "RECIPIENT_NOT_FOUND",
            ErrorCode::ProviderNotConfigured => "PROVIDER_NOT_CONFIGURED",
            ErrorCode::ProviderNotSupported => "PROVIDER_NOT_SUPPORTED",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
