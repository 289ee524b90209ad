use thiserror::Error;

/// Message shown when the simulated tab-switch monitor fires.
pub const DEFAULT_WARNING_MESSAGE: &str =
    "We detected that you switched tabs. This will be recorded.";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("warning delay must be > 0 seconds")]
    InvalidWarningDelay,

    #[error("warning message cannot be empty")]
    EmptyWarningMessage,
}

/// Knobs for the mocked proctoring around an attempt.
///
/// Proctoring never inspects anything real: the camera is a flag and the
/// tab-switch warning is a one-shot message raised a fixed number of
/// seconds after the attempt starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProctoringSettings {
    require_camera_to_start: bool,
    warning_after_secs: Option<u32>,
    warning_message: String,
    low_time_threshold_secs: u32,
}

impl ProctoringSettings {
    /// Creates custom proctoring settings.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::InvalidWarningDelay` for a zero delay and
    /// `SettingsError::EmptyWarningMessage` for a blank message.
    pub fn new(
        require_camera_to_start: bool,
        warning_after_secs: Option<u32>,
        warning_message: impl Into<String>,
        low_time_threshold_secs: u32,
    ) -> Result<Self, SettingsError> {
        if warning_after_secs == Some(0) {
            return Err(SettingsError::InvalidWarningDelay);
        }
        let warning_message = warning_message.into().trim().to_owned();
        if warning_message.is_empty() {
            return Err(SettingsError::EmptyWarningMessage);
        }

        Ok(Self {
            require_camera_to_start,
            warning_after_secs,
            warning_message,
            low_time_threshold_secs,
        })
    }

    /// Settings with the simulated warning turned off.
    #[must_use]
    pub fn without_warning() -> Self {
        Self {
            warning_after_secs: None,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn require_camera_to_start(&self) -> bool {
        self.require_camera_to_start
    }

    #[must_use]
    pub fn warning_after_secs(&self) -> Option<u32> {
        self.warning_after_secs
    }

    #[must_use]
    pub fn warning_message(&self) -> &str {
        &self.warning_message
    }

    /// Remaining time at or below which the countdown counts as running low.
    #[must_use]
    pub fn low_time_threshold_secs(&self) -> u32 {
        self.low_time_threshold_secs
    }
}

impl Default for ProctoringSettings {
    fn default() -> Self {
        Self {
            require_camera_to_start: true,
            warning_after_secs: Some(5),
            warning_message: DEFAULT_WARNING_MESSAGE.to_owned(),
            low_time_threshold_secs: 60,
        }
    }
}
