//! LanceDB-backed vector store.
//!
//! Passages live in one table with dedicated `library` and `position`
//! columns (the fields filters push down to SQL) plus the full metadata
//! map as JSON. Filter parts on other metadata keys are evaluated in
//! process after the nearest-neighbour fetch.

use crate::filter::Filter;
use crate::memory::cosine_similarity;
use crate::store::VectorStore;
use crate::types::{Passage, LIBRARY_KEY, POSITION_KEY};
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray,
    UInt64Array,
};
use arrow_schema::{DataType, Field, Schema};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::Table;
use librarian_core::{AppError, AppResult};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

/// Over-fetch factor when part of the filter must be evaluated in
/// process after the vector search.
const RESIDUAL_FETCH_FACTOR: usize = 4;

/// LanceDB-backed [`VectorStore`].
pub struct LanceStore {
    table: Table,
    dimensions: usize,
}

impl LanceStore {
    /// Create or open a LanceDB store at the given path.
    pub async fn open(db_path: &Path, table_name: &str, dimensions: usize) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Retrieval(format!("Failed to create store directory: {}", e))
            })?;
        }

        let uri = db_path.to_string_lossy().to_string();
        let conn = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| AppError::Retrieval(format!("Failed to connect to LanceDB: {}", e)))?;

        let table_names = conn
            .table_names()
            .execute()
            .await
            .map_err(|e| AppError::Retrieval(format!("Failed to list tables: {}", e)))?;

        let table = if table_names.contains(&table_name.to_string()) {
            conn.open_table(table_name)
                .execute()
                .await
                .map_err(|e| AppError::Retrieval(format!("Failed to open table: {}", e)))?
        } else {
            let schema = Self::schema(dimensions);
            let empty_batch = RecordBatch::new_empty(schema.clone());

            conn.create_table(
                table_name,
                RecordBatchIterator::new(vec![Ok(empty_batch)], schema),
            )
            .execute()
            .await
            .map_err(|e| AppError::Retrieval(format!("Failed to create table: {}", e)))?
        };

        tracing::debug!("Opened LanceDB store at {:?}", db_path);

        Ok(Self { table, dimensions })
    }

    fn schema(dimensions: usize) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("content", DataType::Utf8, false),
            Field::new("library", DataType::Utf8, false),
            Field::new("position", DataType::UInt64, false),
            Field::new("metadata", DataType::Utf8, false),
            Field::new(
                "embedding",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    dimensions as i32,
                ),
                false,
            ),
        ]))
    }

    /// Insert passages with their embeddings.
    pub async fn add_passages(&self, entries: &[(Passage, Vec<f32>)]) -> AppResult<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut contents = Vec::with_capacity(entries.len());
        let mut libraries = Vec::with_capacity(entries.len());
        let mut positions = Vec::with_capacity(entries.len());
        let mut metadata_json = Vec::with_capacity(entries.len());
        let mut flat_embeddings = Vec::with_capacity(entries.len() * self.dimensions);

        for (passage, embedding) in entries {
            if embedding.len() != self.dimensions {
                return Err(AppError::Retrieval(format!(
                    "Embedding dimension mismatch: expected {}, got {}",
                    self.dimensions,
                    embedding.len()
                )));
            }

            contents.push(passage.content.clone());
            libraries.push(passage.library().unwrap_or_default().to_string());
            positions.push(passage.position().unwrap_or_default());
            metadata_json.push(serde_json::to_string(&passage.metadata)?);
            flat_embeddings.extend_from_slice(embedding);
        }

        let schema = Self::schema(self.dimensions);
        let embedding_array = FixedSizeListArray::new(
            Arc::new(Field::new("item", DataType::Float32, true)),
            self.dimensions as i32,
            Arc::new(Float32Array::from(flat_embeddings)),
            None,
        );

        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(contents)),
                Arc::new(StringArray::from(libraries)),
                Arc::new(UInt64Array::from(positions)),
                Arc::new(StringArray::from(metadata_json)),
                Arc::new(embedding_array),
            ],
        )
        .map_err(|e| AppError::Retrieval(format!("Failed to build record batch: {}", e)))?;

        self.table
            .add(RecordBatchIterator::new(vec![Ok(batch)], schema))
            .execute()
            .await
            .map_err(|e| AppError::Retrieval(format!("Failed to add passages: {}", e)))?;

        tracing::debug!("Inserted {} passages into LanceDB", entries.len());
        Ok(())
    }

    /// Number of stored passages.
    pub async fn count(&self) -> AppResult<usize> {
        self.table
            .count_rows(None)
            .await
            .map_err(|e| AppError::Retrieval(format!("Failed to count rows: {}", e)))
    }

    fn row_to_passage(batch: &RecordBatch, row: usize, query: &[f32]) -> AppResult<Passage> {
        let content = batch
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| AppError::Retrieval("Invalid content column".to_string()))?
            .value(row)
            .to_string();

        let metadata_text = batch
            .column(3)
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| AppError::Retrieval("Invalid metadata column".to_string()))?
            .value(row);

        let metadata: serde_json::Map<String, Value> = serde_json::from_str(metadata_text)
            .map_err(|e| AppError::Retrieval(format!("Failed to parse metadata: {}", e)))?;

        let embedding_list = batch
            .column(4)
            .as_any()
            .downcast_ref::<FixedSizeListArray>()
            .ok_or_else(|| AppError::Retrieval("Invalid embedding column".to_string()))?;

        let embedding_ref = embedding_list.value(row);
        let embedding_values = embedding_ref
            .as_any()
            .downcast_ref::<Float32Array>()
            .ok_or_else(|| AppError::Retrieval("Invalid embedding values".to_string()))?;
        let embedding: Vec<f32> = (0..embedding_values.len())
            .map(|i| embedding_values.value(i))
            .collect();

        Ok(Passage {
            content,
            metadata,
            score: cosine_similarity(query, &embedding),
        })
    }
}

/// Render the SQL predicate for the filter parts the backend can apply.
///
/// Returns the pushed-down predicate (if any) and whether a residual
/// part remains for in-process evaluation.
fn sql_predicate(filter: &Filter) -> (Option<String>, bool) {
    match filter {
        Filter::Eq { field, value } => match (column_for(field), sql_literal(value)) {
            (Some(column), Some(literal)) => (Some(format!("{} = {}", column, literal)), false),
            _ => (None, true),
        },
        Filter::In { field, values } => {
            let literals: Option<Vec<String>> = values.iter().map(sql_literal).collect();
            match (column_for(field), literals) {
                (Some(column), Some(literals)) if !literals.is_empty() => (
                    Some(format!("{} IN ({})", column, literals.join(", "))),
                    false,
                ),
                _ => (None, true),
            }
        }
        Filter::And(parts) => {
            let mut clauses = Vec::new();
            let mut residual = false;
            for part in parts {
                let (clause, part_residual) = sql_predicate(part);
                if let Some(clause) = clause {
                    clauses.push(format!("({})", clause));
                }
                residual |= part_residual;
            }
            let predicate = if clauses.is_empty() {
                None
            } else {
                Some(clauses.join(" AND "))
            };
            (predicate, residual)
        }
    }
}

/// Metadata fields backed by real table columns.
fn column_for(field: &str) -> Option<&'static str> {
    match field {
        LIBRARY_KEY => Some("library"),
        POSITION_KEY => Some("position"),
        _ => None,
    }
}

fn sql_literal(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(format!("'{}'", s.replace('\'', "''"))),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait::async_trait]
impl VectorStore for LanceStore {
    async fn search(
        &self,
        query: &[f32],
        k: usize,
        filter: Option<&Filter>,
    ) -> AppResult<Vec<Passage>> {
        if query.len() != self.dimensions {
            return Err(AppError::Retrieval(format!(
                "Query dimension mismatch: expected {}, got {}",
                self.dimensions,
                query.len()
            )));
        }

        let (predicate, residual) = match filter {
            Some(filter) => sql_predicate(filter),
            None => (None, false),
        };

        let fetch_k = if residual {
            k * RESIDUAL_FETCH_FACTOR
        } else {
            k
        };

        let mut lance_query = self
            .table
            .query()
            .nearest_to(query.to_vec())
            .map_err(|e| AppError::Retrieval(format!("Failed to build query: {}", e)))?
            .limit(fetch_k);

        if let Some(predicate) = predicate {
            lance_query = lance_query.only_if(predicate);
        }

        let batches = lance_query
            .execute()
            .await
            .map_err(|e| AppError::Retrieval(format!("Failed to execute search: {}", e)))?
            .try_collect::<Vec<_>>()
            .await
            .map_err(|e| AppError::Retrieval(format!("Failed to collect results: {}", e)))?;

        let mut passages = Vec::new();
        for batch in &batches {
            for row in 0..batch.num_rows() {
                match Self::row_to_passage(batch, row, query) {
                    Ok(passage) => passages.push(passage),
                    Err(e) => tracing::warn!("Skipping unreadable row: {}", e),
                }
            }
        }

        if residual {
            if let Some(filter) = filter {
                passages.retain(|p| filter.matches(p));
            }
        }

        passages.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        passages.truncate(k);

        tracing::debug!("LanceDB returned {} passages (top-{})", passages.len(), k);
        Ok(passages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_library_eq_predicate() {
        let (predicate, residual) = sql_predicate(&Filter::eq(LIBRARY_KEY, "guides"));
        assert_eq!(predicate.as_deref(), Some("library = 'guides'"));
        assert!(!residual);
    }

    #[test]
    fn test_library_in_predicate() {
        let filter = Filter::is_in(LIBRARY_KEY, vec![json!("a"), json!("b")]);
        let (predicate, residual) = sql_predicate(&filter);
        assert_eq!(predicate.as_deref(), Some("library IN ('a', 'b')"));
        assert!(!residual);
    }

    #[test]
    fn test_quote_escaping() {
        let (predicate, _) = sql_predicate(&Filter::eq(LIBRARY_KEY, "o'brien"));
        assert_eq!(predicate.as_deref(), Some("library = 'o''brien'"));
    }

    #[test]
    fn test_metadata_field_becomes_residual() {
        let (predicate, residual) = sql_predicate(&Filter::eq("type", "article"));
        assert_eq!(predicate, None);
        assert!(residual);
    }

    #[test]
    fn test_and_mixes_pushdown_and_residual() {
        let filter = Filter::and(vec![
            Filter::eq("type", "article"),
            Filter::eq(LIBRARY_KEY, "guides"),
        ]);
        let (predicate, residual) = sql_predicate(&filter);
        assert_eq!(predicate.as_deref(), Some("(library = 'guides')"));
        assert!(residual);
    }

    #[test]
    fn test_position_predicate() {
        let (predicate, residual) = sql_predicate(&Filter::eq(POSITION_KEY, 3));
        assert_eq!(predicate.as_deref(), Some("position = 3"));
        assert!(!residual);
    }
}
