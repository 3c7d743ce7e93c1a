//! Repository configuration.

use crate::monitor::{ErrorSink, SqlTracer, TracingSink};
use std::fmt;
use std::sync::Arc;
use tracing::Level;

/// Configuration shared by a repository and the joins it starts.
///
/// # Example
/// ```ignore
/// use repolite::RepositoryConfig;
///
/// let config = RepositoryConfig::new()
///     .sink(|e: &repolite::OrmError| eprintln!("{e}"))
///     .log_level(tracing::Level::INFO)
///     .no_truncate();
/// ```
#[derive(Clone)]
pub struct RepositoryConfig {
    pub(crate) sink: Arc<dyn ErrorSink>,
    pub(crate) log_level: Level,
    pub(crate) max_sql_length: Option<usize>,
    pub(crate) validate_schema: bool,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            sink: Arc::new(TracingSink),
            log_level: Level::DEBUG,
            max_sql_length: Some(200),
            validate_schema: true,
        }
    }
}

impl fmt::Debug for RepositoryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryConfig")
            .field("log_level", &self.log_level)
            .field("max_sql_length", &self.max_sql_length)
            .field("validate_schema", &self.validate_schema)
            .finish_non_exhaustive()
    }
}

impl RepositoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Where backend errors are reported. Defaults to [`TracingSink`].
    pub fn sink(mut self, sink: impl ErrorSink + 'static) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    /// Share an existing sink.
    pub fn shared_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Tracing level for statement events.
    pub fn log_level(mut self, level: Level) -> Self {
        self.log_level = level;
        self
    }

    /// Set maximum SQL length to log.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation in logs.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    /// Skip the column-count check at repository construction.
    pub fn skip_schema_validation(mut self) -> Self {
        self.validate_schema = false;
        self
    }

    pub fn validates_schema(&self) -> bool {
        self.validate_schema
    }

    pub(crate) fn tracer(&self) -> SqlTracer {
        SqlTracer {
            level: self.log_level,
            max_sql_length: self.max_sql_length,
        }
    }
}
