//! Column, row, filter and enrichment operations.

use std::collections::HashMap;

use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;

use crate::client::{require_handle, Client};
use crate::error::{Error, Result};
use crate::types::{
    Column, DeduplicateBody, EnrichBody, EnrichmentProvider, EnrichmentSpec, RowsBody, RowsPage,
    SortModel,
};

/// The only key a non-empty filter model may have.
pub const FILTER_MODEL_KEY: &str = "_cnf_";

/// Check that a filter model is absent, `{}`, or `{"_cnf_": ...}`.
pub fn validate_filter_model(filter_model: Option<&Value>) -> Result<()> {
    let valid = match filter_model {
        None | Some(Value::Null) => true,
        Some(Value::Object(map)) => {
            map.is_empty() || (map.len() == 1 && map.contains_key(FILTER_MODEL_KEY))
        }
        Some(_) => false,
    };

    if valid {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!(
            "invalid filter model, should be empty or have the single key {FILTER_MODEL_KEY}"
        )))
    }
}

/// Map column names to ids. Each name must match exactly one column.
pub fn resolve_column_ids(columns: &[Column], names: &[impl AsRef<str>]) -> Result<Vec<String>> {
    let mut by_name: HashMap<&str, Vec<&str>> = HashMap::new();
    for column in columns {
        by_name
            .entry(column.name.as_str())
            .or_default()
            .push(column.id.as_str());
    }

    names
        .iter()
        .map(|name| {
            let name = name.as_ref();
            match by_name.get(name).map(Vec::as_slice) {
                Some([id]) => Ok((*id).to_string()),
                Some([_, _, ..]) => Err(Error::InvalidArgument(format!(
                    "Multiple matches for column name: {name}"
                ))),
                _ => Err(Error::InvalidArgument(format!(
                    "No column found with name: {name}"
                ))),
            }
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct SavedFilterOnSheet {
    #[serde(rename = "filterModel")]
    filter_model: Value,
}

impl Client {
    /// All columns of a sheet, hidden ones included.
    pub fn columns(&self, handle: &str) -> Result<Vec<Column>> {
        require_handle(handle)?;
        self.get_with_query(
            &format!("/dataset/{handle}/columns"),
            &[("showHidden", "true")],
        )
    }

    /// Map column names to column ids.
    ///
    /// Names must exist and be unique in the sheet.
    pub fn column_ids_for_names(
        &self,
        handle: &str,
        names: &[impl AsRef<str>],
    ) -> Result<Vec<String>> {
        let columns = self.columns(handle)?;
        resolve_column_ids(&columns, names)
    }

    /// Query rows `start_row..end_row`, optionally filtered.
    pub fn rows(
        &self,
        handle: &str,
        start_row: u64,
        end_row: u64,
        filter_model: Option<&Value>,
    ) -> Result<RowsPage> {
        require_handle(handle)?;
        validate_filter_model(filter_model)?;

        let body = RowsBody {
            start_row,
            end_row,
            filter_model,
        };
        self.post(&format!("/file/{handle}/filter"), &body)
    }

    /// Number of rows in a sheet, optionally filtered.
    pub fn count_rows(&self, handle: &str, filter_model: Option<&Value>) -> Result<u64> {
        let page = self.rows(handle, 0, 1, filter_model)?;
        u64::try_from(page.last_row)
            .map_err(|_| Error::InvalidResponse(format!("negative row count: {}", page.last_row)))
    }

    /// Remove duplicate rows.
    ///
    /// `column_ids` together form the key; for each key the first row in
    /// `sort_model` order is kept.
    pub fn deduplicate_rows(
        &self,
        handle: &str,
        column_ids: &[String],
        sort_model: &[SortModel],
    ) -> Result<()> {
        require_handle(handle)?;
        if column_ids.is_empty() {
            return Err(Error::InvalidArgument(
                "no columns to deduplicate by".to_string(),
            ));
        }

        self.send_json(
            Method::DELETE,
            &format!("/dataset/{handle}/deduplicate-rows"),
            &DeduplicateBody {
                columns: column_ids,
                sort_model,
            },
        )
    }

    /// Saved filters of the account.
    pub fn list_saved_filters(&self) -> Result<Value> {
        self.get("/filter-templates")
    }

    /// Filter model of a saved filter, resolved against a sheet's columns.
    pub fn saved_filter_model(&self, sheet_handle: &str, saved_filter_handle: &str) -> Result<Value> {
        require_handle(sheet_handle)?;
        if saved_filter_handle.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "empty value for saved filter handle".to_string(),
            ));
        }

        let resp: SavedFilterOnSheet = self.get(&format!(
            "/filter-templates/{saved_filter_handle}/on-sheet/{sheet_handle}"
        ))?;
        Ok(resp.filter_model)
    }

    /// Query rows through a saved filter.
    pub fn rows_with_saved_filter(
        &self,
        sheet_handle: &str,
        saved_filter_handle: &str,
        start_row: u64,
        end_row: u64,
    ) -> Result<RowsPage> {
        let filter_model = self.saved_filter_model(sheet_handle, saved_filter_handle)?;
        self.rows(sheet_handle, start_row, end_row, Some(&filter_model))
    }

    /// Run a built-in enrichment on a column.
    pub fn enrich(
        &self,
        handle: &str,
        column_id: &str,
        provider: EnrichmentProvider,
        filter_model: Option<&Value>,
    ) -> Result<Value> {
        require_handle(handle)?;

        let body = EnrichBody {
            filter_model,
            enrichments: vec![EnrichmentSpec {
                provider: provider.as_str(),
                data_type: provider.data_type(),
                key: None,
            }],
        };
        self.post(&format!("/enrichments/{handle}/{column_id}"), &body)
    }

    /// Check the format of email addresses in a column.
    pub fn enrich_email_format(
        &self,
        handle: &str,
        column_id: &str,
        filter_model: Option<&Value>,
    ) -> Result<Value> {
        self.enrich(
            handle,
            column_id,
            EnrichmentProvider::EmailFormatCheck,
            filter_model,
        )
    }
}
