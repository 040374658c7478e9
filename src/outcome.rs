use std::fmt;

/// Result of one login attempt, decided exactly once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Success,
    /// `detail` carries the on-screen error text when one was found.
    Failure { detail: Option<String> },
    Unclear,
}

impl LoginOutcome {
    pub fn failure(detail: impl Into<String>) -> Self {
        LoginOutcome::Failure { detail: Some(detail.into()) }
    }

    pub fn screenshot_label(&self) -> &'static str {
        match self {
            LoginOutcome::Success => "success",
            LoginOutcome::Failure { .. } => "error",
            LoginOutcome::Unclear => "unclear",
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            LoginOutcome::Success => 0,
            _ => 1,
        }
    }
}

impl fmt::Display for LoginOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoginOutcome::Success => write!(f, "login successful"),
            LoginOutcome::Failure { detail: Some(detail) } => {
                write!(f, "login failed ({})", detail)
            }
            LoginOutcome::Failure { detail: None } => write!(f, "login failed"),
            LoginOutcome::Unclear => write!(f, "login status unclear"),
        }
    }
}
