use std::{
	fs,
	path::{Path, PathBuf},
	time::Instant,
};

use clap::Parser;
use color_eyre::eyre;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use ragdesk_service::{QueryResult, RagService, SeedData};
use ragdesk_storage::{db::Db, qdrant::QdrantStore};

#[derive(Debug, Parser)]
#[command(
	version = ragdesk_cli::VERSION,
	rename_all = "kebab",
	styles = ragdesk_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[arg(long, short = 'd', value_name = "FILE")]
	pub dataset: PathBuf,
	/// Load the built-in schemas and examples before running the dataset.
	#[arg(long)]
	pub seed: bool,
	/// Write the report here instead of stdout.
	#[arg(long, short = 'o', value_name = "FILE")]
	pub out: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct EvalDataset {
	name: Option<String>,
	queries: Vec<EvalQuery>,
}

#[derive(Debug, Deserialize)]
struct EvalQuery {
	id: Option<String>,
	query: String,
	expected_intent: Option<String>,
}

#[derive(Debug, Serialize)]
struct EvalOutput {
	dataset: EvalDatasetInfo,
	summary: EvalSummary,
	queries: Vec<QueryReport>,
}

#[derive(Debug, Serialize)]
struct EvalDatasetInfo {
	name: String,
	config_path: String,
}

#[derive(Debug, PartialEq, Serialize)]
struct EvalSummary {
	query_count: usize,
	success_rate: f64,
	/// Share of labelled queries whose intent matched; `None` when nothing is labelled.
	intent_accuracy: Option<f64>,
	latency_ms_p50: f64,
	latency_ms_p95: f64,
}

#[derive(Debug, Serialize)]
struct QueryReport {
	id: String,
	query: String,
	intent: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	expected_intent: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	intent_match: Option<bool>,
	success: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	sql_query: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	result_count: Option<usize>,
	latency_ms: f64,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = ragdesk_config::load(&args.config)?;
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

	let dataset = load_dataset(&args.dataset)?;
	let db = Db::connect(&config.storage.postgres).await?;
	let qdrant = QdrantStore::new(&config.storage.qdrant)?;
	let service = RagService::new(config, db, qdrant);

	if args.seed {
		let report = service.seed(&SeedData::builtin()).await?;

		tracing::info!(
			schema_count = report.schema_count,
			example_count = report.example_count,
			"Seeded knowledge base before evaluation."
		);
	}

	let mut reports = Vec::with_capacity(dataset.queries.len());

	for (index, query) in dataset.queries.iter().enumerate() {
		let start = Instant::now();
		let result = service.process_query(&query.query).await;
		let latency_ms = start.elapsed().as_secs_f64() * 1_000.0;

		reports.push(build_report(index, query, result, latency_ms));
	}

	let output = EvalOutput {
		dataset: EvalDatasetInfo {
			name: dataset.name.clone().unwrap_or_else(|| "eval".to_string()),
			config_path: args.config.display().to_string(),
		},
		summary: summarize(&reports),
		queries: reports,
	};
	let json = serde_json::to_string_pretty(&output)?;

	match &args.out {
		Some(path) => {
			fs::write(path, json)?;

			tracing::info!(path = %path.display(), "Wrote evaluation report.");
		},
		None => println!("{json}"),
	}

	Ok(())
}

fn load_dataset(path: &Path) -> color_eyre::Result<EvalDataset> {
	let raw = fs::read_to_string(path)?;
	let dataset: EvalDataset = serde_json::from_str(&raw)?;

	if dataset.queries.is_empty() {
		return Err(eyre::eyre!("Dataset must include at least one query."));
	}
	if let Some(index) = dataset.queries.iter().position(|q| q.query.trim().is_empty()) {
		return Err(eyre::eyre!("Query at index {index} is empty."));
	}

	Ok(dataset)
}

fn build_report(
	index: usize,
	query: &EvalQuery,
	result: QueryResult,
	latency_ms: f64,
) -> QueryReport {
	let intent_match = query.expected_intent.as_ref().map(|expected| *expected == result.intent);

	QueryReport {
		id: query.id.clone().unwrap_or_else(|| format!("query-{index}")),
		query: query.query.clone(),
		intent: result.intent,
		expected_intent: query.expected_intent.clone(),
		intent_match,
		success: result.success,
		sql_query: result.sql_query,
		result_count: result.result_count,
		latency_ms,
	}
}

fn summarize(reports: &[QueryReport]) -> EvalSummary {
	let count = reports.len().max(1) as f64;
	let success_rate = reports.iter().filter(|r| r.success).count() as f64 / count;
	let labelled: Vec<bool> = reports.iter().filter_map(|r| r.intent_match).collect();
	let intent_accuracy = (!labelled.is_empty())
		.then(|| labelled.iter().filter(|hit| **hit).count() as f64 / labelled.len() as f64);
	let mut sorted: Vec<f64> = reports.iter().map(|r| r.latency_ms).collect();

	sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

	EvalSummary {
		query_count: reports.len(),
		success_rate,
		intent_accuracy,
		latency_ms_p50: percentile(&sorted, 0.50),
		latency_ms_p95: percentile(&sorted, 0.95),
	}
}

/// Linear interpolation between the closest ranks of an ascending slice.
fn percentile(sorted: &[f64], q: f64) -> f64 {
	let Some(last) = sorted.len().checked_sub(1) else {
		return 0.0;
	};
	let rank = q.clamp(0.0, 1.0) * last as f64;
	let below = rank.floor() as usize;
	let above = (below + 1).min(last);
	let frac = rank - below as f64;

	sorted[below] + (sorted[above] - sorted[below]) * frac
}

#[cfg(test)]
mod tests {
	use super::*;

	fn report(intent: &str, expected: Option<&str>, success: bool, latency_ms: f64) -> QueryReport {
		let query = EvalQuery {
			id: None,
			query: "q".to_string(),
			expected_intent: expected.map(str::to_string),
		};
		let result = QueryResult {
			success,
			response: String::new(),
			intent: intent.to_string(),
			sql_query: None,
			result_count: None,
			confidence: None,
			sql_executed: None,
			error: None,
		};

		build_report(0, &query, result, latency_ms)
	}

	#[test]
	fn percentile_interpolates_between_ranks() {
		let values = [10.0, 20.0, 30.0, 40.0];

		assert_eq!(percentile(&values, 0.0), 10.0);
		assert_eq!(percentile(&values, 1.0), 40.0);
		assert!((percentile(&values, 0.5) - 25.0).abs() < 1e-9);
		assert!((percentile(&values, 0.95) - 38.5).abs() < 1e-9);
		assert_eq!(percentile(&[], 0.5), 0.0);
	}

	#[test]
	fn summary_counts_only_labelled_queries_for_accuracy() {
		let reports = vec![
			report("faq_query", Some("faq_query"), true, 30.0),
			report("general_info", Some("ticket_management_query"), true, 10.0),
			report("error", None, false, 20.0),
		];
		let summary = summarize(&reports);

		assert_eq!(summary.query_count, 3);
		assert!((summary.success_rate - 2.0 / 3.0).abs() < 1e-9);
		assert_eq!(summary.intent_accuracy, Some(0.5));
		assert_eq!(summary.latency_ms_p50, 20.0);
		assert_eq!(reports[0].intent_match, Some(true));
		assert_eq!(reports[2].intent_match, None);
		assert_eq!(reports[2].id, "query-0");
	}

	#[test]
	fn unlabelled_dataset_has_no_intent_accuracy() {
		let summary = summarize(&[report("faq_query", None, true, 5.0)]);

		assert_eq!(summary.intent_accuracy, None);
		assert_eq!(summary.latency_ms_p95, 5.0);
	}

	#[test]
	fn dataset_parses_optional_fields() {
		let dataset: EvalDataset = serde_json::from_str(
			r#"{"queries": [{"query": "如何修改密碼", "expected_intent": "faq_query"}, {"id": "t1", "query": "開啟中的工單"}]}"#,
		)
		.expect("Failed to parse dataset.");

		assert!(dataset.name.is_none());
		assert_eq!(dataset.queries.len(), 2);
		assert_eq!(dataset.queries[0].expected_intent.as_deref(), Some("faq_query"));
		assert_eq!(dataset.queries[1].id.as_deref(), Some("t1"));
	}
}
