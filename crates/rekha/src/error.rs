// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use llm_contracts::LLMError;
use thiserror::Error;
#[derive(Error, Debug)]
pub enum RekhaError {
    #[error("Dataset load error: {0}")]
    Load(#[from] LoadError),
    #[error("Chart plan error: {0}")]
    Plan(#[from] PlanError),
    #[error("Chart render error: {0}")]
    Render(#[from] RenderError),
    #[error("Insight regeneration error: {0}")]
    Regeneration(#[from] RegenerationError),
    #[error("Report export error: {0}")]
    Export(#[from] ExportError),
    #[error("Feedback error: {0}")]
    Feedback(#[from] FeedbackError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("Failed to read spreadsheet: {0}")]
    Spreadsheet(String),
    #[error("Unsupported data format: {format}")]
    UnsupportedFormat { format: String },
    #[error("Row {row} has {found} fields but the header declares {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Column '{column}' has {found} values, expected {expected}")]
    ColumnLength {
        column: String,
        expected: usize,
        found: usize,
    },
    #[error("Duplicate column name: '{column}'")]
    DuplicateColumn { column: String },
    #[error("Column '{column}' not found in dataset")]
    ColumnNotFound { column: String },
    #[error("The file contains no columns")]
    EmptyDataset,
    #[error("No dataset has been loaded")]
    NoDataset,
}
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    #[error("AI response is not a valid chart plan list: {reason}")]
    Parse { reason: String },
    #[error("Network issue while contacting the AI service: {0}")]
    Transport(LLMError),
    #[error("AI service rejected the request: {0}")]
    Provider(LLMError),
    #[error("Could not serialise the data sample: {reason}")]
    Sample { reason: String },
}
impl PlanError {
    pub fn from_llm(err: LLMError) -> Self {
        if err.is_malformed_payload() {
            PlanError::Parse {
                reason: err.to_string(),
            }
        } else if err.is_transient() {
            PlanError::Transport(err)
        } else {
            PlanError::Provider(err)
        }
    }
    /// Parse and transport failures are worth another attempt; provider rejections are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PlanError::Parse { .. } | PlanError::Transport(_))
    }
}
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Chart {chart} has no rows left after filtering")]
    EmptySlice { chart: usize },
    #[error("Column '{column}' not found in chart data")]
    MissingColumn { column: String },
    #[error("Column '{column}' has no plottable values")]
    NoPlottableValues { column: String },
    #[error("Drawing failed: {0}")]
    Draw(String),
    #[error("Image encoding failed: {0}")]
    Encode(String),
}
#[derive(Error, Debug)]
pub enum RegenerationError {
    #[error("Invalid JSON in insight response: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("Insight response has no 'insight' text")]
    MissingInsight,
    #[error("Network issue while contacting the AI service: {0}")]
    Transport(LLMError),
    #[error("AI service rejected the request: {0}")]
    Provider(LLMError),
    #[error("Chart {index} does not exist in the current plan")]
    UnknownChart { index: usize },
    #[error("Could not serialise the chart data: {reason}")]
    Sample { reason: String },
}
impl RegenerationError {
    pub fn from_llm(err: LLMError) -> Self {
        if err.is_transient() {
            RegenerationError::Transport(err)
        } else {
            RegenerationError::Provider(err)
        }
    }
}
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to assemble archive: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("Failed to decode chart image {index}: {reason}")]
    Image { index: usize, reason: String },
    #[error("Failed to format document: {0}")]
    Format(#[from] std::fmt::Error),
}
#[derive(Error, Debug)]
pub enum FeedbackError {
    #[error("An email address is required to submit feedback")]
    MissingEmail,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to write feedback row: {0}")]
    Csv(#[from] csv::Error),
    #[error("Feedback store lock poisoned")]
    LockPoisoned,
}
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Source(#[from] ::config::ConfigError),
    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
    #[error("Missing required configuration: {field}")]
    MissingRequired { field: String },
    #[error("Chart count {value} is outside the allowed range {min}..={max}")]
    ChartCount { value: usize, min: usize, max: usize },
    #[error("'{value}' is not a hex color like #1f77b4")]
    InvalidColor { value: String },
}
pub type Result<T> = std::result::Result<T, RekhaError>;
impl RekhaError {
    pub fn is_recoverable(&self) -> bool {
        match self {
            RekhaError::Plan(err) => err.is_retryable(),
            RekhaError::Render(_) | RekhaError::Regeneration(_) => true,
            RekhaError::Load(LoadError::NoDataset) => true,
            _ => false,
        }
    }
    pub fn category(&self) -> &'static str {
        match self {
            RekhaError::Load(_) => "Data",
            RekhaError::Plan(_) => "Planning",
            RekhaError::Render(_) => "Rendering",
            RekhaError::Regeneration(_) => "Insight",
            RekhaError::Export(_) => "Export",
            RekhaError::Feedback(_) => "Feedback",
            RekhaError::Config(_) => "Configuration",
            RekhaError::Io(_) => "I/O",
        }
    }
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            RekhaError::Load(LoadError::RaggedRow { .. } | LoadError::Csv(_)) => vec![
                "Check that every row has the same number of fields as the header".to_string(),
                "Quote values that contain commas".to_string(),
            ],
            RekhaError::Load(LoadError::UnsupportedFormat { .. }) => {
                vec!["Upload a .csv or .xlsx file".to_string()]
            }
            RekhaError::Config(ConfigError::MissingRequired { field }) if field == "OPENAI_API_KEY" => {
                vec!["Set OPENAI_API_KEY in the environment or a .env file".to_string()]
            }
            RekhaError::Feedback(FeedbackError::MissingEmail) => {
                vec!["Provide an email address with the feedback".to_string()]
            }
            _ => Vec::new(),
        }
    }
    pub fn user_message(&self) -> String {
        match self {
            RekhaError::Load(LoadError::EmptyDataset) => {
                "The uploaded file contains no columns. Please upload a file with a header row.".to_string()
            }
            RekhaError::Load(LoadError::NoDataset) => {
                "Please upload a CSV or Excel file first.".to_string()
            }
            RekhaError::Load(err) => format!("Error loading file: {err}"),
            _ => self.to_string(),
        }
    }
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            RekhaError::Render(_) | RekhaError::Regeneration(_) => ErrorSeverity::Warning,
            RekhaError::Plan(_) => ErrorSeverity::Warning,
            RekhaError::Config(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }
}
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}
impl ErrorSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorSeverity::Info => "INFO",
            ErrorSeverity::Warning => "WARNING",
            ErrorSeverity::Error => "ERROR",
            ErrorSeverity::Critical => "CRITICAL",
        }
    }
    pub fn color_code(&self) -> &'static str {
        match self {
            ErrorSeverity::Info => "\x1b[36m",
            ErrorSeverity::Warning => "\x1b[33m",
            ErrorSeverity::Error => "\x1b[31m",
            ErrorSeverity::Critical => "\x1b[35m",
        }
    }
}
