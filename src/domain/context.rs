//! Request context
//!
//! Per-request metadata threaded through middleware for tracing.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Context for a request, used for log correlation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// Correlation ID, taken from X-Correlation-Id or generated
    pub correlation_id: Uuid,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
        }
    }

    pub fn with_correlation_id(correlation_id: Uuid) -> Self {
        Self { correlation_id }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_correlation_id_is_kept() {
        let id = Uuid::new_v4();
        let ctx = RequestContext::with_correlation_id(id);
        assert_eq!(ctx.correlation_id, id);
    }

    #[test]
    fn test_new_generates_id() {
        let a = RequestContext::new();
        let b = RequestContext::new();
        assert_ne!(a.correlation_id, b.correlation_id);
    }
}
