//! Error handling for the GaitVis-RS application
//!
//! This module defines the crate error type and a Result alias for use
//! throughout the pipeline, the dataset loader and the viewer.
//!
//! Validation errors (`DataShape`, `Configuration`) are returned synchronously
//! from the mutating call that caused them. Runtime degradation of the producer
//! (stalls) is never an error: it is reported through
//! [`PipelineEvent::RateReport`](crate::pipeline::PipelineEvent).

use crate::types::Side;
use thiserror::Error;

/// Main error type for GaitVis-RS operations
#[derive(Error, Debug)]
pub enum GaitVisError {
    /// A sensor frame's reading count does not match its side's layout
    #[error("Data shape error: {side} frame {frame} has {actual} readings, layout has {expected} sensors")]
    DataShape {
        side: Side,
        frame: usize,
        expected: usize,
        actual: usize,
    },

    /// Invalid rendering parameters (radius, smoothness, grid dimensions)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Errors related to dataset discovery and loading
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Errors related to configuration file loading/saving
    #[error("Config file error: {0}")]
    Config(String),

    /// Errors related to parsing coordinate or sequence files
    #[error("Parse error: {0}")]
    Parse(String),

    /// Errors related to channel communication
    #[error("Channel error: {0}")]
    Channel(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<GaitVisError>,
    },
}

impl GaitVisError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        GaitVisError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Whether this error (or the error it wraps) is a configuration error
    pub fn is_configuration(&self) -> bool {
        match self {
            GaitVisError::Configuration(_) => true,
            GaitVisError::WithContext { source, .. } => source.is_configuration(),
            _ => false,
        }
    }

    /// Whether this error (or the error it wraps) is a data shape error
    pub fn is_data_shape(&self) -> bool {
        match self {
            GaitVisError::DataShape { .. } => true,
            GaitVisError::WithContext { source, .. } => source.is_data_shape(),
            _ => false,
        }
    }
}

impl From<csv::Error> for GaitVisError {
    fn from(err: csv::Error) -> Self {
        GaitVisError::Parse(err.to_string())
    }
}

impl From<serde_json::Error> for GaitVisError {
    fn from(err: serde_json::Error) -> Self {
        GaitVisError::Parse(err.to_string())
    }
}

/// Result type alias for GaitVis-RS operations
pub type Result<T> = std::result::Result<T, GaitVisError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| GaitVisError::Io(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| GaitVisError::Io(e).with_context(f()))
    }
}
