//! Prompt templates for SQL generation and correction
//!
//! The generation prompt embeds the relevant schema, the detected intent and
//! the decomposition plan; the correction prompt enumerates exactly which
//! validation dimensions failed so the model can fix the right things.

use crate::analysis::SemanticAnalysis;
use crate::decomposer::QueryDecomposition;
use crate::schema::SchemaContext;

pub const SQL_GENERATION_SYSTEM_PROMPT: &str = r#"You are a SQL generation engine for a business-intelligence copilot.

Rules:
1. Use ONLY the tables and columns listed in the schema context.
2. Generate standard SELECT statements. Never generate DDL or destructive statements.
3. Prefer explicit column lists over SELECT *.
4. Return ONLY valid JSON, no other text."#;

/// Build the candidate-generation prompt.
pub fn build_generation_prompt(
    analysis: &SemanticAnalysis,
    schema: &SchemaContext,
    decomposition: &QueryDecomposition,
) -> String {
    let mut parts = Vec::new();

    parts.push(SQL_GENERATION_SYSTEM_PROMPT.to_string());
    parts.push(format!("\nUSER QUESTION: {}", analysis.query));
    parts.push(format!("DETECTED INTENT: {:?}", analysis.intent));

    if !analysis.entities.is_empty() {
        let entities: Vec<String> = analysis
            .entities
            .iter()
            .map(|e| format!("{} ({:?})", e.text, e.entity_type))
            .collect();
        parts.push(format!("RECOGNIZED ENTITIES: {}", entities.join(", ")));
    }

    parts.push("\nRELEVANT SCHEMA:".to_string());
    parts.push(schema.describe());

    parts.push("\nQUERY PLAN STEPS:".to_string());
    for (idx, component) in decomposition.ordered_components().iter().enumerate() {
        parts.push(format!(
            "{}. [{:?}] {}",
            idx + 1,
            component.component_type,
            component.description
        ));
    }

    parts.push(
        r#"
Generate one or more SQL candidates answering the question.
Return JSON in this exact format:
[
  {"sql": "SELECT ...", "explanation": "why this query answers the question"}
]

Only return the JSON, no other text."#
            .to_string(),
    );

    parts.join("\n")
}

/// Build the single-shot correction prompt from itemized validation
/// failures.
pub fn build_correction_prompt(original_query: &str, sql: &str, issues: &[String]) -> String {
    let issue_lines: Vec<String> = issues.iter().map(|i| format!("- {}", i)).collect();

    format!(
        r#"The SQL below was generated for a business question but failed validation.
Fix every listed issue while still answering the question.

QUESTION: {}

FAILING SQL:
{}

VALIDATION ISSUES:
{}

Return ONLY the corrected SQL statement, no explanation, no markdown."#,
        original_query,
        sql,
        issue_lines.join("\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::QueryClassifier;
    use crate::decomposer::QueryDecomposer;
    use crate::schema::TableInfo;

    #[test]
    fn test_generation_prompt_embeds_schema_and_plan() {
        let query = "Top 10 players by deposits";
        let schema = SchemaContext::new(vec![
            TableInfo::new("Players", &[("PlayerID", "int")]),
            TableInfo::new("Deposits", &[("Amount", "decimal")]),
        ]);
        let classification = QueryClassifier::new().classify_with_schema(query, Some(&schema));
        let decomposition = QueryDecomposer::new().decompose(query, &schema, &classification);
        let analysis = crate::analysis::SemanticAnalysis::empty(query);

        let prompt = build_generation_prompt(&analysis, &schema, &decomposition);
        assert!(prompt.contains("Players"));
        assert!(prompt.contains("Deposits"));
        assert!(prompt.contains("QUERY PLAN STEPS"));
        assert!(prompt.contains(query));
    }

    #[test]
    fn test_correction_prompt_lists_every_issue() {
        let issues = vec![
            "Table 'playerz' is not part of the known schema".to_string(),
            "SELECT * may impact performance".to_string(),
        ];
        let prompt = build_correction_prompt("show players", "SELECT * FROM playerz", &issues);
        for issue in &issues {
            assert!(prompt.contains(issue));
        }
        assert!(prompt.contains("SELECT * FROM playerz"));
    }
}
