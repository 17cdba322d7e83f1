use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnrollmentError {
    /// Raised by the strict tokenizer when a `|` segment holds more than one record start.
    #[error("enrollment segment holds more than one record: `{segment}`")]
    MergedRecords { segment: String },

    #[error("{field} must be between 0 and 100, got {value}")]
    ScoreOutOfRange { field: &'static str, value: u8 },

    #[error("{field} may not contain `;` or line breaks")]
    InvalidField { field: &'static str },
}
