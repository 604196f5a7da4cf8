use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ShtResult<T> = Result<T, ShtError>;
pub type ParserResult<T> = ShtResult<T>;
pub type SynthesisResult<T> = ShtResult<T>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShtErrorCategory {
    Success,
    InputValidationError,
    IoSystemError,
    FormatError,
    ShapeError,
    InternalError,
}

impl ShtErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::InputValidationError => 2,
            Self::IoSystemError => 3,
            Self::FormatError => 4,
            Self::ShapeError => 5,
            Self::InternalError => 6,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::InputValidationError => "InputValidationError",
            Self::IoSystemError => "IoSystemError",
            Self::FormatError => "FormatError",
            Self::ShapeError => "ShapeError",
            Self::InternalError => "InternalError",
        }
    }

    pub const fn is_fatal(self) -> bool {
        !matches!(self, Self::Success)
    }
}

impl Display for ShtErrorCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// Error shared by the codec, the model and the synthesizer.
///
/// `placeholder` is a stable dotted identifier (`FORMAT.TRUNCATED`,
/// `SHAPE.COEFFICIENTS`, ...) that tests and the CLI can match on without
/// parsing the human-readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShtError {
    category: ShtErrorCategory,
    placeholder: &'static str,
    message: String,
}

impl ShtError {
    pub fn new(
        category: ShtErrorCategory,
        placeholder: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            placeholder,
            message: message.into(),
        }
    }

    pub fn input_validation(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(
            ShtErrorCategory::InputValidationError,
            placeholder,
            message,
        )
    }

    pub fn io_system(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(ShtErrorCategory::IoSystemError, placeholder, message)
    }

    pub fn format(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(ShtErrorCategory::FormatError, placeholder, message)
    }

    pub fn shape(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(ShtErrorCategory::ShapeError, placeholder, message)
    }

    pub fn internal(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(ShtErrorCategory::InternalError, placeholder, message)
    }

    pub const fn category(&self) -> ShtErrorCategory {
        self.category
    }

    pub const fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        let severity = if self.category.is_fatal() {
            "ERROR"
        } else {
            "INFO"
        };
        format!("{}: [{}] {}", severity, self.placeholder, self.message)
    }

    pub fn fatal_exit_line(&self) -> Option<String> {
        self.category
            .is_fatal()
            .then(|| format!("FATAL EXIT CODE: {}", self.exit_code()))
    }
}

impl Display for ShtError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.category.as_str(),
            self.placeholder,
            self.message
        )
    }
}

impl Error for ShtError {}
