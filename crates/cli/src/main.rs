use clap::{Parser, Subcommand};
use pof_core::{JsonSnapshotFile, PatientRepository, DEFAULT_DATA_FILE};
use pof_types::PatientId;
use std::error::Error;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "pof")]
#[command(about = "PatientsOnFIRE snapshot maintenance CLI")]
struct Cli {
    /// Snapshot file to operate on
    #[arg(long, global = true, default_value = DEFAULT_DATA_FILE)]
    data_file: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List stored patient IDs in ascending order
    List,
    /// Print one patient record as JSON
    Show {
        /// Patient ID
        id: PatientId,
    },
    /// Delete one patient record
    Delete {
        /// Patient ID
        id: PatientId,
    },
    /// Print the number of stored patients
    Count,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Diagnostics go to stderr so command output stays pipeable.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pof_core=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("Use 'pof --help' for commands");
        return Ok(());
    };

    if !cli.data_file.exists() {
        eprintln!("Snapshot file not found: {}", cli.data_file.display());
        return Ok(());
    }
    let mut repository =
        PatientRepository::open(Some(JsonSnapshotFile::new(&cli.data_file))).await;

    match execute(command, &mut repository).await {
        Ok(output) => println!("{}", output),
        Err(e) => eprintln!("Error: {}", e),
    }

    Ok(())
}

/// Run one command against an opened repository and return what to print.
///
/// Mutations are flushed by the repository itself; a failed save is logged.
async fn execute(
    command: Commands,
    repository: &mut PatientRepository,
) -> Result<String, Box<dyn Error>> {
    match command {
        Commands::List => {
            let ids = repository.list_ids();
            if ids.is_empty() {
                Ok("No patients found.".into())
            } else {
                Ok(ids
                    .iter()
                    .map(PatientId::to_string)
                    .collect::<Vec<_>>()
                    .join("\n"))
            }
        }
        Commands::Show { id } => match repository.get_by_id(id) {
            Some(record) => Ok(serde_json::to_string_pretty(record)?),
            None => Err(format!("Patient {} not found", id).into()),
        },
        Commands::Delete { id } => match repository.delete(id).await {
            Some(_) => Ok(format!("Deleted patient {}", id)),
            None => Err(format!("Patient {} not found", id).into()),
        },
        Commands::Count => Ok(repository.count().to_string()),
    }
}
