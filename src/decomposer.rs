//! Query Decomposer
//!
//! Splits a natural-language query into an ordered set of sub-intent
//! components mirroring SQL clause structure. Decomposition is total:
//! any strategy failure falls back to a single component wrapping the
//! original query verbatim, so decomposition can never abort the pipeline.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::classifier::{has_aggregation_keywords, Complexity, QueryCategory, QueryClassification};
use crate::error::{PipelineError, Result};
use crate::schema::SchemaContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComponentType {
    DataRetrieval,
    Join,
    Filtering,
    Aggregation,
    Sorting,
    Primary,
}

/// Fixed execution priority per component type. Ties are broken by
/// component id ascending.
fn type_priority(component_type: ComponentType) -> u8 {
    match component_type {
        ComponentType::DataRetrieval => 1,
        ComponentType::Join => 2,
        ComponentType::Filtering => 3,
        ComponentType::Aggregation => 4,
        ComponentType::Sorting => 5,
        ComponentType::Primary => 6,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryComponent {
    pub id: u32,
    pub component_type: ComponentType,
    pub description: String,
    pub query: String,
    pub required_tables: Vec<String>,
    pub estimated_complexity: Complexity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryDecomposition {
    pub components: Vec<QueryComponent>,
    pub execution_order: Vec<u32>,
    /// Cross-component dependency edges. No strategy populates this today;
    /// `execution_order` is the only authoritative ordering. Kept so the
    /// serialized shape stays stable for callers.
    pub dependencies: HashMap<u32, Vec<u32>>,
}

impl QueryDecomposition {
    fn new(components: Vec<QueryComponent>) -> Self {
        let mut keyed: Vec<(u8, u32)> = components
            .iter()
            .map(|c| (type_priority(c.component_type), c.id))
            .collect();
        keyed.sort_unstable();
        let execution_order = keyed.into_iter().map(|(_, id)| id).collect();
        Self {
            components,
            execution_order,
            dependencies: HashMap::new(),
        }
    }

    pub fn component(&self, id: u32) -> Option<&QueryComponent> {
        self.components.iter().find(|c| c.id == id)
    }

    /// Components in execution order, for prompt construction.
    pub fn ordered_components(&self) -> Vec<&QueryComponent> {
        self.execution_order
            .iter()
            .filter_map(|id| self.component(*id))
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct QueryDecomposer;

impl QueryDecomposer {
    pub fn new() -> Self {
        Self
    }

    /// Decompose a query. Never fails: strategy errors degrade to a
    /// single-component fallback.
    pub fn decompose(
        &self,
        query: &str,
        schema: &SchemaContext,
        classification: &QueryClassification,
    ) -> QueryDecomposition {
        let result = if classification.complexity == Complexity::High
            || classification.required_joins > 2
        {
            self.decompose_complex(query, schema)
        } else if classification.category == QueryCategory::Aggregation {
            self.decompose_aggregation(query, schema)
        } else {
            self.decompose_simple(query, schema)
        };

        match result {
            Ok(decomposition) => decomposition,
            Err(e) => {
                warn!("decomposition failed, falling back to single component: {e}");
                Self::fallback(query)
            }
        }
    }

    /// One `DataRetrieval` component for the primary table, one `Join` per
    /// additional relevant table in schema-context order, and a trailing
    /// `Aggregation` component when aggregation vocabulary is present.
    fn decompose_complex(&self, query: &str, schema: &SchemaContext) -> Result<QueryDecomposition> {
        let mut tables = schema.relevant_tables.iter();
        let primary = tables.next().ok_or_else(|| {
            PipelineError::Decomposition("complex decomposition requires at least one relevant table".to_string())
        })?;

        let mut components = Vec::new();
        let mut next_id = 1u32;

        components.push(QueryComponent {
            id: next_id,
            component_type: ComponentType::DataRetrieval,
            description: format!("Retrieve base data from {}", primary.name),
            query: query.to_string(),
            required_tables: vec![primary.name.clone()],
            estimated_complexity: Complexity::Low,
        });
        next_id += 1;

        for table in tables {
            components.push(QueryComponent {
                id: next_id,
                component_type: ComponentType::Join,
                description: format!("Join {} with {}", primary.name, table.name),
                query: query.to_string(),
                required_tables: vec![primary.name.clone(), table.name.clone()],
                estimated_complexity: Complexity::Medium,
            });
            next_id += 1;
        }

        if has_aggregation_keywords(query) {
            components.push(QueryComponent {
                id: next_id,
                component_type: ComponentType::Aggregation,
                description: "Aggregate the joined result".to_string(),
                query: query.to_string(),
                required_tables: schema.table_names(),
                estimated_complexity: Complexity::Medium,
            });
        }

        Ok(QueryDecomposition::new(components))
    }

    /// Exactly two components: base data retrieval, then aggregation.
    fn decompose_aggregation(
        &self,
        query: &str,
        schema: &SchemaContext,
    ) -> Result<QueryDecomposition> {
        let tables = schema.table_names();
        let components = vec![
            QueryComponent {
                id: 1,
                component_type: ComponentType::DataRetrieval,
                description: "Retrieve base data for aggregation".to_string(),
                query: query.to_string(),
                required_tables: tables.clone(),
                estimated_complexity: Complexity::Low,
            },
            QueryComponent {
                id: 2,
                component_type: ComponentType::Aggregation,
                description: "Apply the requested aggregation".to_string(),
                query: query.to_string(),
                required_tables: tables,
                estimated_complexity: Complexity::Medium,
            },
        ];
        Ok(QueryDecomposition::new(components))
    }

    /// A single `Primary` component referencing every relevant table.
    fn decompose_simple(&self, query: &str, schema: &SchemaContext) -> Result<QueryDecomposition> {
        Ok(QueryDecomposition::new(vec![QueryComponent {
            id: 1,
            component_type: ComponentType::Primary,
            description: "Answer the query directly".to_string(),
            query: query.to_string(),
            required_tables: schema.table_names(),
            estimated_complexity: Complexity::Low,
        }]))
    }

    /// Last-resort decomposition wrapping the original query verbatim.
    fn fallback(query: &str) -> QueryDecomposition {
        QueryDecomposition::new(vec![QueryComponent {
            id: 1,
            component_type: ComponentType::Primary,
            description: "Fallback decomposition".to_string(),
            query: query.to_string(),
            required_tables: Vec::new(),
            estimated_complexity: Complexity::Medium,
        }])
    }
}
