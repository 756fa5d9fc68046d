use chrono::SecondsFormat;
use clap::Args;
use loan_risk::config::AppConfig;
use loan_risk::error::AppError;
use loan_risk::scoring::{
    train, ModelRegistry, ModelSnapshot, RiskAssessment, RiskComponentKind, TrainingReport,
    TrainingSet,
};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct TrainArgs {
    /// Historical loan CSV (defaults to LOAN_RISK_TRAINING_DATA)
    #[arg(long)]
    pub(crate) data: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct AssessArgs {
    /// Historical loan CSV (defaults to LOAN_RISK_TRAINING_DATA)
    #[arg(long)]
    pub(crate) data: Option<PathBuf>,
    /// JSON object holding the applicant fields
    #[arg(long)]
    pub(crate) applicant: PathBuf,
}

pub(crate) fn run_train(args: TrainArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let path = args.data.unwrap_or(config.model.training_data.clone());

    let dataset = TrainingSet::from_path(&path)?;
    let snapshot = train(&dataset, &config.model.training_params())?;

    println!("Default model trained from {}", path.display());
    render_snapshot(&snapshot);
    render_report(snapshot.report());
    Ok(())
}

pub(crate) fn run_assess(args: AssessArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let path = args.data.unwrap_or(config.model.training_data.clone());

    let fields = read_applicant(&args.applicant)?;
    let dataset = TrainingSet::from_path(&path)?;
    let registry = ModelRegistry::bootstrap(&dataset, &config.model.training_params())?;
    let engine = config.model.engine(Arc::new(registry));

    let assessment = engine.assess(&fields)?;
    render_assessment(&assessment);
    Ok(())
}

fn read_applicant(path: &Path) -> Result<Map<String, Value>, AppError> {
    let raw = std::fs::read_to_string(path)?;
    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) => Err(AppError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("{} must hold a JSON object", path.display()),
        ))),
        Err(err) => Err(AppError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            err,
        ))),
    }
}

fn render_snapshot(snapshot: &ModelSnapshot) {
    println!(
        "Trained at {} | {} trees over {} encoded features",
        snapshot
            .trained_at()
            .to_rfc3339_opts(SecondsFormat::Secs, true),
        snapshot.classifier().tree_count(),
        snapshot.encoder().width()
    );
}

fn render_report(report: &TrainingReport) {
    println!(
        "Rows: {} training / {} holdout | default rate {:.1}%",
        report.training_rows,
        report.holdout_rows,
        report.default_rate * 100.0
    );
    println!("Training accuracy: {:.3}", report.training_accuracy);
    match (report.holdout_accuracy, report.holdout_log_loss) {
        (Some(accuracy), Some(log_loss)) => {
            println!("Holdout accuracy: {accuracy:.3} | log loss {log_loss:.4}")
        }
        _ => println!("Holdout: disabled"),
    }

    if !report.top_features.is_empty() {
        println!("Top features by gain:");
        for feature in &report.top_features {
            println!("  - {:<28} {:.3}", feature.feature, feature.importance);
        }
    }
}

fn render_assessment(assessment: &RiskAssessment) {
    let verdict = &assessment.verdict;
    println!("Risk assessment (model v{})", assessment.model_version);
    println!(
        "- Risk score {:.2} -> {:?} risk, recommend {:?}",
        verdict.risk_score, verdict.risk_level, verdict.recommendation
    );
    println!(
        "- Default probability {:.1}% (rating {} / {})",
        verdict.default_probability * 100.0,
        assessment.rating.rating,
        assessment.rating.category.label()
    );
    println!("Components:");
    for kind in RiskComponentKind::ALL {
        println!("  - {:<18} {:>6.2}", kind.label(), verdict.components.component(kind));
    }
}
