//! CLI for the streamframe buffer.
//!
//! Replays newline-delimited JSON messages into a frame and prints the
//! result, or benchmarks the push path.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};
use streamframe::labels::format_labels;
use streamframe::{
    DataFrame, DataFrameMessage, FieldSchema, FieldType, FieldValue, FrameSchema,
    StreamingDataFrame, StreamingFrameOptions,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// streamframe: bounded columnar buffer for streamed query results.
#[derive(Parser)]
#[command(name = "streamframe", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Push newline-delimited JSON messages into a frame and print the result.
    Replay {
        /// Message file, or "-" for stdin.
        input: String,

        /// Maximum number of rows kept (overrides the options file).
        #[arg(long)]
        max_length: Option<usize>,

        /// Maximum time span kept, in milliseconds (overrides the options file).
        #[arg(long)]
        max_delta: Option<f64>,

        /// JSON file with frame options.
        #[arg(long)]
        options: Option<PathBuf>,

        /// Output format.
        #[arg(long, default_value = "json")]
        format: OutputFormat,
    },

    /// Run a push-path microbenchmark.
    Bench {
        /// Number of rows to push.
        #[arg(long, default_value = "1000000")]
        rows: usize,

        /// Rows per push.
        #[arg(long, default_value = "100")]
        batch: usize,

        /// Maximum number of rows kept.
        #[arg(long, default_value = "1000")]
        max_length: usize,
    },
}

/// Output format for the final frame.
#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// The frame snapshot as JSON.
    Json,
    /// One row per line, one column per field.
    Csv,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Replay {
            input,
            max_length,
            max_delta,
            options,
            format,
        } => cmd_replay(&input, max_length, max_delta, options.as_deref(), &format),
        Commands::Bench {
            rows,
            batch,
            max_length,
        } => cmd_bench(rows, batch, max_length),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Implements `streamframe replay <input>`.
fn cmd_replay(
    input: &str,
    max_length: Option<usize>,
    max_delta: Option<f64>,
    options_path: Option<&Path>,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = load_options(options_path, max_length, max_delta)?;
    let mut frame = StreamingDataFrame::new(options)?;

    let messages = if input == "-" {
        replay(&mut frame, io::stdin().lock())?
    } else {
        let file = File::open(input).map_err(|e| format!("cannot open '{input}': {e}"))?;
        replay(&mut frame, BufReader::new(file))?
    };
    info!(messages, rows = frame.len(), columns = frame.fields().len(), "replay finished");

    let snapshot = frame.snapshot();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&snapshot)?),
        OutputFormat::Csv => print!("{}", to_csv(&snapshot)),
    }

    Ok(())
}

/// Reads options from `path` if given, then applies flag overrides.
fn load_options(
    path: Option<&Path>,
    max_length: Option<usize>,
    max_delta: Option<f64>,
) -> Result<StreamingFrameOptions, Box<dyn std::error::Error>> {
    let mut options = match path {
        Some(path) => {
            let data = std::fs::read_to_string(path)
                .map_err(|e| format!("cannot read options '{}': {e}", path.display()))?;
            serde_json::from_str(&data)?
        }
        None => StreamingFrameOptions::default(),
    };

    if let Some(max_length) = max_length {
        options.max_length = max_length;
    }
    if let Some(max_delta) = max_delta {
        options.max_delta = max_delta;
    }

    options.validate()?;
    Ok(options)
}

/// Pushes one message per non-blank line. Returns the number of messages.
///
/// Errors carry the 1-based line number of the offending message.
fn replay(frame: &mut StreamingDataFrame, reader: impl BufRead) -> Result<usize, Box<dyn std::error::Error>> {
    let mut messages = 0;

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let line_no = i + 1;
        let message = DataFrameMessage::from_json(&line).map_err(|e| format!("line {line_no}: {e}"))?;
        frame.push(message).map_err(|e| format!("line {line_no}: {e}"))?;
        debug!(line = line_no, rows = frame.len(), "pushed message");
        messages += 1;
    }

    Ok(messages)
}

/// Renders a snapshot as CSV with a header row of column names.
///
/// Series columns are named `name{labels}`; gaps render as empty cells.
fn to_csv(frame: &DataFrame) -> String {
    let mut out = String::new();

    let header: Vec<String> = frame
        .fields
        .iter()
        .map(|field| match &field.labels {
            Some(labels) if !labels.is_empty() => csv_escape(&format!("{}{}", field.name, format_labels(labels))),
            _ => csv_escape(&field.name),
        })
        .collect();
    out.push_str(&header.join(","));
    out.push('\n');

    for row in 0..frame.length {
        let cells: Vec<String> = frame.fields.iter().map(|field| csv_cell(&field.values[row])).collect();
        out.push_str(&cells.join(","));
        out.push('\n');
    }

    out
}

fn csv_cell(value: &FieldValue) -> String {
    match value {
        FieldValue::Null => String::new(),
        FieldValue::Bool(b) => b.to_string(),
        FieldValue::Number(n) => n.to_string(),
        FieldValue::Text(s) => csv_escape(s),
        FieldValue::Other(v) => csv_escape(&v.to_string()),
    }
}

/// Quotes a CSV cell when it contains a separator, quote or newline.
fn csv_escape(s: &str) -> String {
    if s.contains([',', '"', '\n']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Implements `streamframe bench`.
#[allow(clippy::cast_precision_loss)] // Benchmark stats are fine with f64 precision
fn cmd_bench(rows: usize, batch: usize, max_length: usize) -> Result<(), Box<dyn std::error::Error>> {
    if batch == 0 {
        return Err("batch must be at least 1".into());
    }

    println!("streamframe push-path benchmark");
    println!("  Rows: {rows}");
    println!("  Batch: {batch}");
    println!("  Max length: {max_length}");
    println!();

    let options = StreamingFrameOptions::new(Some(max_length), None)?;
    let mut frame = StreamingDataFrame::new(options)?;
    frame.push(DataFrameMessage::schema_only(FrameSchema::new(vec![
        FieldSchema::new("time", FieldType::Time),
        FieldSchema::new("value", FieldType::Number),
    ])))?;

    let batches = rows / batch;
    println!("Pushing {batches} batches of {batch} rows...");

    let base_time = 1_700_000_000_000.0;
    let mut row = 0.0;

    let start = Instant::now();

    for _ in 0..batches {
        let mut time = Vec::with_capacity(batch);
        let mut value = Vec::with_capacity(batch);
        for _ in 0..batch {
            time.push(FieldValue::Number(base_time + row * 1000.0));
            value.push(FieldValue::Number(row));
            row += 1.0;
        }
        frame.push_new_values(vec![time, value])?;
    }

    let elapsed = start.elapsed();
    let total_rows = batches * batch;
    let ns_per_row = elapsed.as_nanos() as f64 / total_rows.max(1) as f64;
    let rows_per_sec = total_rows as f64 / elapsed.as_secs_f64();

    println!();
    println!("Results:");
    println!("  Total rows: {total_rows}");
    println!("  Retained rows: {}", frame.len());
    println!("  Elapsed: {elapsed:.3?}");
    println!("  Avg latency: {ns_per_row:.1} ns/row");
    println!("  Throughput: {rows_per_sec:.0} rows/sec");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MESSAGES: &str = r#"{"schema": {"fields": [{"name": "labels", "type": "string"}, {"name": "time", "type": "time"}, {"name": "speed", "type": "number"}]}}

{"data": {"values": [["sensor=A", "sensor=B"], [100, 100], [10, 15]]}}
{"data": {"values": [["sensor=B"], [200], [20]]}}
"#;

    #[test]
    fn test_replay_counts_messages() {
        let mut frame = StreamingDataFrame::empty();

        let messages = replay(&mut frame, MESSAGES.as_bytes()).unwrap();

        assert_eq!(messages, 3);
        assert_eq!(frame.len(), 2);
        assert_eq!(frame.fields().len(), 3);
    }

    #[test]
    fn test_replay_reports_line_number() {
        let mut frame = StreamingDataFrame::empty();
        let input = format!("{MESSAGES}{{\"data\": {{\"values\": [[300]]}}}}\n");

        let err = replay(&mut frame, input.as_bytes()).unwrap_err();

        assert!(err.to_string().starts_with("line 5:"), "{err}");
        assert_eq!(frame.len(), 2);
    }

    #[test]
    fn test_replay_rejects_invalid_json() {
        let mut frame = StreamingDataFrame::empty();

        let err = replay(&mut frame, "not json\n".as_bytes()).unwrap_err();

        assert!(err.to_string().starts_with("line 1:"));
    }

    #[test]
    fn test_to_csv() {
        let mut frame = StreamingDataFrame::empty();
        replay(&mut frame, MESSAGES.as_bytes()).unwrap();

        let csv = to_csv(&frame.snapshot());

        assert_eq!(
            csv,
            "time,\"speed{sensor=\"\"A\"\"}\",\"speed{sensor=\"\"B\"\"}\"\n100,10,15\n200,,20\n"
        );
    }

    #[test]
    fn test_load_options_flags_override_defaults() {
        let options = load_options(None, Some(10), Some(500.0)).unwrap();
        assert_eq!(options.max_length, 10);
        assert_eq!(options.max_delta, 500.0);

        assert!(load_options(None, Some(0), None).is_err());
    }

    #[test]
    fn test_csv_escape() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
