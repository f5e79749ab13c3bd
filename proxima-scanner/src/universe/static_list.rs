//! Fixed symbol lists supplied through configuration.

use async_trait::async_trait;

use super::{SourceError, UniverseSource};

/// A fixed symbol list from configuration.
pub struct StaticSource {
    name: String,
    symbols: Vec<String>,
}

impl StaticSource {
    pub fn new(name: impl Into<String>, symbols: Vec<String>) -> Self {
        Self {
            name: name.into(),
            symbols,
        }
    }
}

#[async_trait]
impl UniverseSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_symbols(&self) -> Result<Vec<String>, SourceError> {
        Ok(self.symbols.clone())
    }
}
