//! tempeval - annotation comparison CLI
//!
//! Compare annotation documents, validate them against a schema, and check
//! their referential integrity.
//!
//! ```bash
//! # Score a system document against gold
//! tempeval score -r gold/doc1.xml -p system/doc1.xml
//!
//! # Temporal closure scoring of TLINK Type labels
//! tempeval score -r gold/doc1.xml -p system/doc1.xml \
//!     --include TLINK:Type --temporal-closure
//!
//! # Validate documents against a schema
//! tempeval validate -s schema.xml gold/doc1.xml gold/doc2.xml
//!
//! # Referential integrity and duplicate-span report
//! tempeval check gold/doc1.xml
//! ```

use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};

use tempeval::eval::report;
use tempeval::{
    score_files, score_overlapping_spans, DebuggingScores, NamedScores, Result, Schema,
    ScoreAccumulator, Scores, Selector, TemporalClosureScores,
};

#[derive(Parser)]
#[command(name = "tempeval")]
#[command(
    author,
    version,
    about = "Annotation comparison: precision/recall/F1 with temporal closure",
    long_about = r#"
tempeval - compare span-based annotation documents

Scores a set of predicted annotation documents against reference
("gold standard") documents and prints precision, recall and F1 per
annotation type, property, and property value. For temporal-link
properties, closure scoring credits predictions entailed by the
reference under point-algebra transitivity.

PATTERNS:
  --include / --exclude take type[:property[:value]] expressions,
  e.g. TLINK, TLINK:Type, TLINK:Type:CONTAINS. '*' matches any
  position.
"#
)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score predicted documents against reference documents
    #[command(visible_alias = "s")]
    Score(ScoreArgs),

    /// Validate documents against a schema
    #[command(visible_alias = "v")]
    Validate(ValidateArgs),

    /// Report dangling references and duplicate entity spans
    #[command(visible_alias = "c")]
    Check(CheckArgs),
}

#[derive(Args)]
struct ScoreArgs {
    /// Reference ("gold standard") document files
    #[arg(short, long, required = true, num_args = 1..)]
    reference: Vec<PathBuf>,

    /// Predicted (system) document files, matched to references by position
    #[arg(short, long, num_args = 0..)]
    predicted: Vec<PathBuf>,

    /// Restrict scoring to these type[:property[:value]] expressions
    #[arg(short, long, num_args = 1..)]
    include: Vec<String>,

    /// Exclude these type[:property[:value]] expressions from scoring
    #[arg(short, long, num_args = 1..)]
    exclude: Vec<String>,

    /// Score each side against the other side's temporal closure.
    /// Combine with --include to select a single relation property
    /// whose values are temporal relations (BEFORE, CONTAINS, ...)
    #[arg(long)]
    temporal_closure: bool,

    /// Record and print every mismatched item
    #[arg(long)]
    verbose: bool,

    /// Count spans as matching when they overlap by one character or more
    /// (debugging aid, spans granularity only)
    #[arg(long)]
    overlap: bool,

    /// Print one table per document instead of merged totals
    #[arg(long)]
    per_document: bool,

    /// Emit rows as JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ValidateArgs {
    /// Schema document to validate against
    #[arg(short, long)]
    schema: PathBuf,

    /// Annotation document files
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[derive(Args)]
struct CheckArgs {
    /// Annotation document files
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let outcome = match cli.command {
        Commands::Score(args) => run_score(&args),
        Commands::Validate(args) => run_validate(&args),
        Commands::Check(args) => run_check(&args),
    };
    match outcome {
        Ok(failures) if failures > 0 => process::exit(1),
        Ok(_) => {}
        Err(error) => {
            eprintln!("error: {error}");
            process::exit(1);
        }
    }
}

fn run_score(args: &ScoreArgs) -> Result<usize> {
    let selector = Selector::from_exprs(&args.include, &args.exclude);
    if args.overlap {
        return score_overlap(args, &selector);
    }
    if args.temporal_closure {
        let per_document = collect::<TemporalClosureScores>(args, &selector)?;
        emit(args, &per_document)?;
    } else if args.verbose {
        let per_document = collect::<DebuggingScores>(args, &selector)?;
        for (file_name, named) in &per_document {
            for (name, scores) in named {
                for (item, kind) in &scores.errors {
                    eprintln!("{file_name}: {name}: {}: {item}", kind.as_str());
                }
            }
        }
        emit(args, &per_document)?;
    } else {
        let per_document = collect::<Scores>(args, &selector)?;
        emit(args, &per_document)?;
    }
    Ok(0)
}

/// Score each reference/predicted file pair; missing predicted files score
/// against an empty document.
fn collect<S: ScoreAccumulator>(
    args: &ScoreArgs,
    selector: &Selector,
) -> Result<Vec<(String, NamedScores<S>)>> {
    let mut per_document = Vec::new();
    for (index, reference) in args.reference.iter().enumerate() {
        let predicted = args.predicted.get(index).map(PathBuf::as_path);
        if predicted.is_none() && !args.predicted.is_empty() {
            log::warn!("{}: no predicted file, scoring against empty", reference.display());
        }
        let named = score_files::<S>(reference, predicted, selector)?;
        per_document.push((reference.display().to_string(), named));
    }
    Ok(per_document)
}

fn emit<S: ScoreAccumulator>(
    args: &ScoreArgs,
    per_document: &[(String, NamedScores<S>)],
) -> Result<()> {
    if args.per_document {
        if args.json {
            let documents: Vec<serde_json::Value> = per_document
                .iter()
                .map(|(file_name, named)| {
                    serde_json::json!({ "file": file_name, "scores": report::rows(named) })
                })
                .collect();
            println!("{}", to_json(&documents)?);
        } else {
            let borrowed = per_document
                .iter()
                .map(|(file_name, named)| (file_name.as_str(), named));
            print!("{}", report::render_document_table(borrowed));
        }
    } else {
        let mut merged: NamedScores<S> = NamedScores::new();
        for (_, named) in per_document {
            tempeval::merge_named_scores(&mut merged, named);
        }
        if args.json {
            println!("{}", to_json(&report::rows(&merged))?);
        } else {
            print!("{}", report::render_table(&merged));
        }
    }
    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|error| tempeval::Error::format(format!("JSON output failed: {error}")))
}

fn score_overlap(args: &ScoreArgs, selector: &Selector) -> Result<usize> {
    let mut merged: NamedScores<Scores> = NamedScores::new();
    for (index, reference_path) in args.reference.iter().enumerate() {
        let reference = tempeval::load_lenient(reference_path);
        let predicted = match args.predicted.get(index) {
            Some(path) => tempeval::load_lenient(path),
            None => tempeval::AnnotationStore::new(),
        };
        let named = score_overlapping_spans(&reference, &predicted, selector)?;
        tempeval::merge_named_scores(&mut merged, &named);
    }
    if args.json {
        println!("{}", to_json(&report::rows(&merged))?);
    } else {
        print!("{}", report::render_table(&merged));
    }
    Ok(0)
}

fn run_validate(args: &ValidateArgs) -> Result<usize> {
    let schema = Schema::from_file(&args.schema)?;
    let mut failures = 0;
    for path in &args.files {
        let store = match tempeval::AnnotationStore::from_file(path) {
            Ok(store) => store,
            Err(error) => {
                eprintln!("{}: invalid document: {error}", path.display());
                failures += 1;
                continue;
            }
        };
        for (annotation, message) in schema.errors(&store) {
            println!("{}: {}: {message}", path.display(), annotation.id);
            failures += 1;
        }
    }
    Ok(failures)
}

fn run_check(args: &CheckArgs) -> Result<usize> {
    let mut findings = 0;
    for path in &args.files {
        let store = tempeval::AnnotationStore::from_file(path)?;
        if let Some(annotation) = store.find_self_referential() {
            println!("{}: self-referential annotation {}", path.display(), annotation.id);
            findings += 1;
        }
        for (id, property, target) in store.dangling_references() {
            println!(
                "{}: {id}: property '{property}' references missing id '{target}'",
                path.display()
            );
            findings += 1;
        }
        for (spans, group) in store.entities_with_identical_spans() {
            let ids: Vec<&str> = group.iter().map(|a| a.id.as_str()).collect();
            let encoded: Vec<String> = spans
                .iter()
                .map(|(start, end)| format!("{start},{end}"))
                .collect();
            println!(
                "{}: multiple entities for span {}: {}",
                path.display(),
                encoded.join(";"),
                ids.join(", ")
            );
            findings += 1;
        }
    }
    Ok(findings)
}
