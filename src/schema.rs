//! Statement schema: the optional structural reference for a complete
//! Statement of Intent.
//!
//! Only the parts used for validation are modelled:
//! `{"sections": [{"fields": [{"id": "q1", "required": true}]}]}`.

use std::path::Path;

use serde::Deserialize;
use tokio::fs;

use crate::error::StartupError;
use crate::questionnaire::ResponseMap;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatementSchema {
    #[serde(default)]
    pub sections: Vec<SchemaSection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchemaSection {
    #[serde(default)]
    pub fields: Vec<SchemaField>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchemaField {
    pub id: Option<String>,
    #[serde(default)]
    pub required: bool,
}

impl StatementSchema {
    /// Read the schema. A missing file is allowed; malformed JSON is fatal.
    pub async fn load(path: &Path) -> Result<Option<Self>, StartupError> {
        if !fs::try_exists(path).await? {
            tracing::warn!(path = %path.display(), "No statement schema; skipping field validation");
            return Ok(None);
        }

        let content = fs::read_to_string(path).await?;
        let schema = serde_json::from_str(&content).map_err(|source| StartupError::SchemaInvalid {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Some(schema))
    }

    /// Ids of required fields that have no response.
    pub fn missing_required(&self, responses: &ResponseMap) -> Vec<String> {
        self.sections
            .iter()
            .flat_map(|s| &s.fields)
            .filter(|f| f.required)
            .filter_map(|f| f.id.as_deref())
            .filter(|id| !responses.contains_key(*id))
            .map(str::to_string)
            .collect()
    }
}
