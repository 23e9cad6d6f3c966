use crate::rules::RuleId;
use crate::types::FrameNumber;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid frame descriptor (frame {frame_number}): {reason}")]
    InvalidFrameDescriptor {
        frame_number: FrameNumber,
        reason: String,
    },

    #[error("Strategy violation of {rule} rule at {subject}: {detail}")]
    StrategyViolation {
        rule: RuleId,
        subject: String,
        detail: String,
    },

    #[error("Validation failed: {0}")]
    Validation(String),
}

impl CoreError {
    pub(crate) fn invalid_frame(frame_number: FrameNumber, reason: impl Into<String>) -> Self {
        Self::InvalidFrameDescriptor {
            frame_number,
            reason: reason.into(),
        }
    }

    pub(crate) fn violation(
        rule: RuleId,
        subject: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self::StrategyViolation {
            rule,
            subject: subject.into(),
            detail: detail.into(),
        }
    }
}
