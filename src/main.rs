use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use discharge_agent_lib::{
    config,
    core_state::CoreState,
    init_tracing,
    intake::{self, DischargeForm},
    models::{DischargeRecord, StageId},
    orchestration::LangflowClient,
    progress::{run_flow, FlowEvent, JitterPacer, NoPacing, Pacer},
    reconcile::{reconcile, ReconciledOutputSet},
    render::{self, PdfContent},
};

#[derive(Parser)]
#[command(name = "discharge-agent")]
#[command(about = "Patient discharge agent pipeline CLI")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the default discharge record as JSON
    Sample,
    /// Validate a discharge record JSON file
    Validate {
        /// Path to the discharge record
        file: PathBuf,
    },
    /// Submit a discharge record and reveal each agent's output
    Run(RunArgs),
    /// Reconcile and render a saved orchestration response
    Reconcile {
        /// Path to the saved response JSON
        response: PathBuf,
        #[command(flatten)]
        export: ExportArgs,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Discharge record JSON file (defaults to the sample record)
    #[arg(long, conflicts_with = "name")]
    input: Option<PathBuf>,
    /// Patient name (builds the record from form fields)
    #[arg(long, requires = "diagnosis")]
    name: Option<String>,
    #[arg(long)]
    diagnosis: Option<String>,
    /// Preferred language for translations
    #[arg(long, default_value = "")]
    language: String,
    #[arg(long, default_value = "")]
    phone: String,
    /// Comma-separated medication list
    #[arg(long, default_value = "")]
    medications: String,
    #[arg(long, default_value = "")]
    instructions: String,
    /// Orchestration service base URL
    #[arg(long)]
    base_url: Option<String>,
    /// Flow identifier
    #[arg(long)]
    flow_id: Option<String>,
    /// Request timeout in seconds (no timeout by default)
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Reveal stages without the cosmetic delay
    #[arg(long)]
    no_pacing: bool,
    #[command(flatten)]
    export: ExportArgs,
}

#[derive(Args)]
struct ExportArgs {
    /// Write all stage outputs as JSON
    #[arg(long)]
    export_json: bool,
    /// Write one stage's output as JSON (summary, quiz, followup, translate, messenger, packager)
    #[arg(long, value_name = "STAGE")]
    export_stage: Vec<String>,
    /// Write the discharge summary PDF
    #[arg(long)]
    export_pdf: bool,
    /// Export directory
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Commands::Sample => {
            println!("{}", serde_json::to_string_pretty(&DischargeRecord::sample())?);
        }
        Commands::Validate { file } => {
            let record = intake::parse_record_json(&std::fs::read_to_string(&file)?)?;
            println!(
                "Valid discharge record {} for {} ({})",
                record.id,
                record.patient_name(),
                record.metadata().diagnosis
            );
        }
        Commands::Run(args) => run(args)?,
        Commands::Reconcile { response, export } => {
            let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&response)?)?;
            let outputs = reconcile(&raw);
            print_outputs(&outputs);
            println!("{} of {} agents matched", outputs.matched_count(), StageId::all().len());
            write_exports(&export, &outputs, "")?;
        }
    }

    Ok(())
}

fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let record = build_record(&args)?;

    let timeout = args
        .timeout_secs
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .or_else(config::request_timeout);
    let client = LangflowClient::new(
        &args.base_url.clone().unwrap_or_else(config::base_url),
        &args.flow_id.clone().unwrap_or_else(config::flow_id),
        timeout,
    )?;
    let pacer: Box<dyn Pacer> = if args.no_pacing {
        Box::new(NoPacing)
    } else {
        Box::new(JitterPacer::default())
    };

    let state = CoreState::new();
    println!(
        "Submitting discharge record for {} to {}",
        record.patient_name(),
        client.run_url()
    );

    let on_event = |event: FlowEvent| print_event(&state, event);
    let outcome = run_flow(&state, &client, pacer.as_ref(), &record, Some(&on_event))?;

    println!();
    print_outputs(&outcome.outputs);
    println!("{}", state.snapshot()?.progress_label());
    write_exports(&args.export, &outcome.outputs, record.patient_name())?;
    Ok(())
}

fn build_record(args: &RunArgs) -> Result<DischargeRecord, Box<dyn std::error::Error>> {
    if let Some(path) = &args.input {
        return Ok(intake::parse_record_json(&std::fs::read_to_string(path)?)?);
    }
    if let Some(name) = &args.name {
        let form = DischargeForm {
            name: name.clone(),
            diagnosis: args.diagnosis.clone().unwrap_or_default(),
            language: args.language.clone(),
            phone: args.phone.clone(),
            medications: args.medications.clone(),
            instructions: args.instructions.clone(),
        };
        return Ok(form.into_record()?);
    }
    Ok(DischargeRecord::sample())
}

fn print_event(state: &CoreState, event: FlowEvent) {
    match event {
        FlowEvent::Started { session_id, .. } => println!("Session {session_id}"),
        FlowEvent::StageUpdated { .. } => print_board(state),
        FlowEvent::Completed { matched, duration_ms } => {
            println!("Flow completed in {duration_ms} ms ({matched} agents produced output)")
        }
        FlowEvent::Failed { stage, error } => {
            print_board(state);
            eprintln!("{}: {error}", stage.id.display_name());
        }
    }
}

fn print_board(state: &CoreState) {
    match state.snapshot() {
        Ok(flow) => println!("{}\n", render::render_progress(&flow)),
        Err(e) => eprintln!("Cannot read progress: {e}"),
    }
}

fn print_outputs(outputs: &ReconciledOutputSet) {
    for (stage, slot) in outputs.iter() {
        println!("── {} ──", stage.display_name());
        println!("{}\n", render::render_stage(stage, &slot.to_value()));
    }
}

fn write_exports(
    args: &ExportArgs,
    outputs: &ReconciledOutputSet,
    patient_name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let dir = args.out_dir.clone().unwrap_or_else(config::exports_dir);
    if args.export_json {
        report(&render::export_all_json(outputs, &dir, render::today())?);
    }
    for id in &args.export_stage {
        let stage: StageId = id.parse()?;
        report(&render::export_stage_json(outputs, stage, &dir, render::today())?);
    }
    if args.export_pdf {
        report(&render::export_pdf(&PdfContent::from_outputs(outputs, patient_name), &dir)?);
    }
    Ok(())
}

fn report(path: &Path) {
    println!("Exported {}", path.display());
}
