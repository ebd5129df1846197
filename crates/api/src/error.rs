use devdeck_types::ServiceId;
use thiserror::Error;

/// Failure of a single capability-client round trip.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The external service answered with a non-success status.
    #[error("{message}")]
    External { service: ServiceId, status: u16, message: String },

    /// The request never produced a response (DNS, connect, TLS, timeout).
    #[error("{service} request failed: {message}")]
    Transport { service: ServiceId, message: String },

    /// The response arrived but its body was not what the client expected.
    #[error("{service} response could not be decoded: {message}")]
    Decode { service: ServiceId, message: String },

    /// The client is missing its base URL or credentials.
    #[error("{service} is not configured: {message}")]
    NotConfigured { service: ServiceId, message: String },
}

impl ServiceError {
    pub fn external(service: ServiceId, status: u16, message: impl Into<String>) -> Self {
        Self::External {
            service,
            status,
            message: message.into(),
        }
    }

    pub fn transport(service: ServiceId, message: impl Into<String>) -> Self {
        Self::Transport {
            service,
            message: message.into(),
        }
    }

    pub fn decode(service: ServiceId, message: impl Into<String>) -> Self {
        Self::Decode {
            service,
            message: message.into(),
        }
    }

    pub fn not_configured(service: ServiceId, message: impl Into<String>) -> Self {
        Self::NotConfigured {
            service,
            message: message.into(),
        }
    }

    /// Status code reported by the external service, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::External { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn service(&self) -> ServiceId {
        match self {
            Self::External { service, .. }
            | Self::Transport { service, .. }
            | Self::Decode { service, .. }
            | Self::NotConfigured { service, .. } => *service,
        }
    }
}
