//! Survey pipeline CLI: one subcommand per pipeline stage.
//!
//! Usage:
//!   survey-pipeline messages <user> <json-in> <prev-coding> <flow> <variable> <json-out> <coding-out> <icr-out> <csv-out>
//!   survey-pipeline concat-flows <user> <json-out> <name=path>...
//!   survey-pipeline join-surveys <user> <messages> <json-out> <dest=path>...
//!   survey-pipeline auto-code <user> <json-in> <prev-coded-dir> <json-out> <coding-dir>
//!   survey-pipeline apply-codes <user> <json-in> <coded-dir> <json-out> <scheme-dir>
//!   survey-pipeline analysis <user> <json-in> <json-out> <csv-by-message> <csv-by-individual>

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use survey_pipeline::config::{self, PipelineConfig};
use survey_pipeline::stages::{
    self, AnalysisArgs, ApplyCodesArgs, AutoCodeArgs, ConcatFlowsArgs, JoinSurveysArgs, MessagesArgs, NamedPath,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "survey-pipeline",
    version,
    about = "Provenance-tracked survey and SMS data pipeline"
)]
struct Cli {
    /// Path to a YAML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean one show's messages and export them for coding and analysis
    Messages {
        /// User launching this program
        user: String,
        json_input: PathBuf,
        /// Coding file from a previous run (need not exist)
        prev_coding: PathBuf,
        /// Name of the activation flow the messages came from
        flow_name: String,
        /// Name of the message variable in the flow
        variable_name: String,
        json_output: PathBuf,
        coding_output: PathBuf,
        /// CSV of messages sampled for inter-coder reliability
        icr_output: PathBuf,
        csv_output: PathBuf,
    },
    /// Tag, normalise and concatenate flows
    ConcatFlows {
        user: String,
        json_output: PathBuf,
        /// Flows as NAME=PATH, concatenated in order
        #[arg(required = true)]
        inputs: Vec<NamedPath>,
    },
    /// Join survey responses onto messages by respondent id
    ///
    /// Feedback flows must already be merged into the messages with concat-flows.
    JoinSurveys {
        user: String,
        messages_input: PathBuf,
        json_output: PathBuf,
        /// Surveys as DESTINATION=PATH
        #[arg(required = true)]
        surveys: Vec<NamedPath>,
    },
    /// Assign message ids to survey answers and write coding files
    AutoCode {
        user: String,
        json_input: PathBuf,
        /// Directory of coded files from a previous round
        prev_coded_dir: PathBuf,
        json_output: PathBuf,
        coding_output_dir: PathBuf,
    },
    /// Merge manually coded labels back onto records
    ApplyCodes {
        user: String,
        json_input: PathBuf,
        coded_dir: PathBuf,
        json_output: PathBuf,
        scheme_dir: PathBuf,
    },
    /// Build per-message and per-respondent analysis datasets
    Analysis {
        user: String,
        json_input: PathBuf,
        json_output: PathBuf,
        csv_by_message: PathBuf,
        csv_by_individual: PathBuf,
    },
    /// Print the effective configuration as YAML
    Config,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "survey_pipeline=info",
        1 => "survey_pipeline=debug",
        _ => "survey_pipeline=trace",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn cmd_messages(args: MessagesArgs, config: &PipelineConfig) -> i32 {
    match stages::run_messages(&args, config) {
        Ok(summary) => {
            println!(
                "Kept {} of {} messages ({} outside window), {} to code, {} for ICR",
                summary.responses - summary.outside_window,
                summary.responses,
                summary.outside_window,
                summary.coded_messages,
                summary.icr_messages
            );
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_concat_flows(args: ConcatFlowsArgs, config: &PipelineConfig) -> i32 {
    match stages::run_concat_flows(&args, config) {
        Ok(count) => {
            println!("Wrote {} records from {} flows", count, args.inputs.len());
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_join_surveys(args: JoinSurveysArgs, config: &PipelineConfig) -> i32 {
    match stages::run_join_surveys(&args, config) {
        Ok(matched) => {
            for (survey, count) in args.surveys.iter().zip(matched) {
                println!("{:<24}  {:>7} matched", survey.name, count);
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_auto_code(args: AutoCodeArgs, config: &PipelineConfig) -> i32 {
    match stages::run_auto_code(&args, config) {
        Ok(counts) => {
            for (name, count) in counts {
                println!("{:<24}  {:>7} messages", name, count);
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_apply_codes(args: ApplyCodesArgs, config: &PipelineConfig) -> i32 {
    match stages::run_apply_codes(&args, config) {
        Ok(stats) => {
            println!("{:<24}  {:>9}  {:>12}  {:>7}", "PLAN", "LABELLED", "PLACEHOLDERS", "SKIPPED");
            println!("{}", "-".repeat(58));
            for (name, s) in stats {
                println!("{:<24}  {:>9}  {:>12}  {:>7}", name, s.labelled, s.placeholders, s.skipped);
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_analysis(args: AnalysisArgs, config: &PipelineConfig) -> i32 {
    match stages::run_analysis(&args, config) {
        Ok(summary) => {
            println!(
                "{} messages from {} individuals ({} withdrawn)",
                summary.messages, summary.individuals, summary.withdrawn
            );
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_config(config: &PipelineConfig) -> i32 {
    match config::to_yaml(config) {
        Ok(yaml) => {
            print!("{}", yaml);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let code = match cli.command {
        Commands::Messages {
            user,
            json_input,
            prev_coding,
            flow_name,
            variable_name,
            json_output,
            coding_output,
            icr_output,
            csv_output,
        } => cmd_messages(
            MessagesArgs {
                user,
                json_input,
                prev_coding,
                flow_name,
                variable_name,
                json_output,
                coding_output,
                icr_output,
                csv_output,
            },
            &config,
        ),
        Commands::ConcatFlows { user, json_output, inputs } => {
            cmd_concat_flows(ConcatFlowsArgs { user, json_output, inputs }, &config)
        }
        Commands::JoinSurveys {
            user,
            messages_input,
            json_output,
            surveys,
        } => cmd_join_surveys(
            JoinSurveysArgs {
                user,
                messages_input,
                json_output,
                surveys,
            },
            &config,
        ),
        Commands::AutoCode {
            user,
            json_input,
            prev_coded_dir,
            json_output,
            coding_output_dir,
        } => cmd_auto_code(
            AutoCodeArgs {
                user,
                json_input,
                prev_coded_dir,
                json_output,
                coding_output_dir,
            },
            &config,
        ),
        Commands::ApplyCodes {
            user,
            json_input,
            coded_dir,
            json_output,
            scheme_dir,
        } => cmd_apply_codes(
            ApplyCodesArgs {
                user,
                json_input,
                coded_dir,
                json_output,
                scheme_dir,
            },
            &config,
        ),
        Commands::Analysis {
            user,
            json_input,
            json_output,
            csv_by_message,
            csv_by_individual,
        } => cmd_analysis(
            AnalysisArgs {
                user,
                json_input,
                json_output,
                csv_by_message,
                csv_by_individual,
            },
            &config,
        ),
        Commands::Config => cmd_config(&config),
    };
    std::process::exit(code);
}
