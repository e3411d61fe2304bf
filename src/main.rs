use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

use queryforge::heuristics::{KeywordSchemaResolver, KeywordSemanticAnalyzer};
use queryforge::llm::{OpenAiClient, DUMMY_API_KEY};
use queryforge::validation::RegexSecurityValidator;
use queryforge::{QueryProcessor, TableInfo};

#[derive(Parser)]
#[command(name = "queryforge")]
#[command(about = "Translate a natural-language business question into validated SQL")]
struct Args {
    /// The business question in natural language
    query: String,

    /// Path to a JSON file describing the full schema (array of tables)
    #[arg(short, long)]
    schema: Option<PathBuf>,

    /// User identifier recorded with the request
    #[arg(short, long, default_value = "cli-user")]
    user: String,

    /// OpenAI API key (or set OPENAI_API_KEY env var)
    #[arg(long)]
    api_key: Option<String>,
}

fn demo_schema() -> Vec<TableInfo> {
    vec![
        TableInfo::new(
            "Players",
            &[
                ("PlayerID", "int"),
                ("Name", "varchar"),
                ("Status", "varchar"),
                ("CreatedAt", "datetime"),
            ],
        ),
        TableInfo::new(
            "Deposits",
            &[("DepositID", "int"), ("PlayerID", "int"), ("Amount", "decimal"), ("DepositedAt", "datetime")],
        ),
    ]
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    info!("queryforge starting");

    let full_schema: Vec<TableInfo> = match &args.schema {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => demo_schema(),
    };

    let api_key = args
        .api_key
        .or_else(|| std::env::var("OPENAI_API_KEY").ok())
        .unwrap_or_else(|| DUMMY_API_KEY.to_string());

    let processor = QueryProcessor::new(
        Arc::new(KeywordSemanticAnalyzer::from_schema(&full_schema)),
        Arc::new(KeywordSchemaResolver::new(full_schema)),
        Arc::new(OpenAiClient::new(api_key)),
        Arc::new(RegexSecurityValidator::new()),
    );

    let cancel = CancellationToken::new();
    let result = processor.process_query(&args.query, &args.user, &cancel).await?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
