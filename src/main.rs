use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use genforge::config::Config;
use genforge::models::BatchJob;
use genforge::service::{CannedService, ChatClient, GenerationService};
use genforge::{codec, replay, tree_render, versions, workspace};
use genforge::{Generator, GeneratorSettings, Strictness};

#[derive(Parser)]
#[command(name = "genforge")]
#[command(about = "Prompt-driven project scaffolding with versioned, replayable generations")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new version of a project from a prompt
    Generate {
        /// Project name (one directory under the projects root)
        #[arg(short, long)]
        project: String,

        /// Prompt text
        #[arg(long, conflicts_with = "prompt_file", required_unless_present = "prompt_file")]
        prompt: Option<String>,

        /// Read the prompt from a file
        #[arg(long)]
        prompt_file: Option<PathBuf>,

        /// Template directory to overlay the generated files on
        #[arg(short, long)]
        template: Option<PathBuf>,

        #[arg(long)]
        projects_root: Option<PathBuf>,

        /// System directive sent with the prompt
        #[arg(long)]
        system: Option<String>,

        /// Use a captured service response instead of calling the service
        #[arg(long)]
        response_file: Option<PathBuf>,

        /// Drop bad manifest entries instead of failing
        #[arg(long)]
        lenient: bool,

        /// Run the generation's entrypoint afterwards
        #[arg(long)]
        replay: bool,
    },
    /// Run a generation's entrypoint and record PASSED/FAILED
    Replay {
        output_path: PathBuf,

        /// Entrypoint file name to search for
        #[arg(short, long)]
        entrypoint: Option<String>,
    },
    /// Run a JSON list of {project, prompt, template?} jobs
    Batch {
        jobs: PathBuf,

        #[arg(long)]
        projects_root: Option<PathBuf>,

        /// Replay each generation after writing it
        #[arg(long)]
        replay: bool,
    },
    /// Encode a directory as a JSON tree
    Export {
        dir: PathBuf,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write a JSON tree into a directory
    Import { json_file: PathBuf, dest: PathBuf },
    /// Print a directory as an ASCII tree
    Tree { dir: PathBuf },
    /// Print the JSON Schema of the tree format
    Schema,
    /// List the existing generations of a project
    Generations {
        #[arg(short, long)]
        project: String,

        #[arg(long)]
        projects_root: Option<PathBuf>,
    },
}

/// Logs go to stderr so stdout only carries command output.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "genforge=info".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let mut config = Config::load();

    match cli.command {
        Commands::Generate {
            project,
            prompt,
            prompt_file,
            template,
            projects_root,
            system,
            response_file,
            lenient,
            replay,
        } => {
            if let Some(root) = projects_root {
                config.projects_root = root;
            }
            if lenient {
                config.strictness = Strictness::Lenient;
            }
            if let Some(system) = system {
                config.system_directive = system;
            }
            let prompt = match (prompt, prompt_file) {
                (Some(text), _) => text,
                (None, Some(path)) => fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read prompt file {}", path.display()))?,
                (None, None) => bail!("either --prompt or --prompt-file is required"),
            };

            let settings = GeneratorSettings::from(&config);
            let output_path = match response_file {
                Some(path) => {
                    let response = fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read response file {}", path.display()))?;
                    let generator = Generator::new(CannedService::new(response), settings);
                    generate(&generator, &prompt, &project, template.as_deref()).await?
                }
                None => {
                    let generator = Generator::new(ChatClient::new(config.service.clone()), settings);
                    generate(&generator, &prompt, &project, template.as_deref()).await?
                }
            };
            println!("{}", output_path.display());

            if replay {
                let result = replay::replay_with(&output_path, &config.entrypoint)?;
                println!("{}", result.outcome);
            }
        }
        Commands::Replay {
            output_path,
            entrypoint,
        } => {
            let entrypoint = entrypoint.unwrap_or(config.entrypoint);
            let result = replay::replay_with(&output_path, &entrypoint)?;
            println!("{}", result.outcome);
        }
        Commands::Batch {
            jobs,
            projects_root,
            replay,
        } => {
            if let Some(root) = projects_root {
                config.projects_root = root;
            }
            let content = fs::read_to_string(&jobs)
                .with_context(|| format!("Failed to read jobs file {}", jobs.display()))?;
            let jobs: Vec<BatchJob> =
                serde_json::from_str(&content).context("Failed to parse jobs file")?;

            let generator = Generator::new(
                ChatClient::new(config.service.clone()),
                GeneratorSettings::from(&config),
            );
            let entrypoint = replay.then_some(config.entrypoint.as_str());
            for outcome in generator.run_batch(&jobs, entrypoint).await {
                match (&outcome.output_path, &outcome.error) {
                    (Some(path), None) => println!(
                        "{}\t{}\t{}",
                        outcome.project,
                        path.display(),
                        outcome.replay.as_deref().unwrap_or("-")
                    ),
                    (_, Some(error)) => println!("{}\tERROR\t{}", outcome.project, error),
                    (None, None) => println!("{}\tERROR\tno output", outcome.project),
                }
            }
        }
        Commands::Export { dir, output } => {
            let tree = workspace::load(&dir)?;
            let encoded = codec::encode(&tree)?;
            match output {
                Some(path) => fs::write(&path, encoded)
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => println!("{}", encoded),
            }
        }
        Commands::Import { json_file, dest } => {
            let text = fs::read_to_string(&json_file)
                .with_context(|| format!("Failed to read {}", json_file.display()))?;
            let tree = codec::decode(&text)?;
            let written = workspace::materialize_tree(&tree, &dest)?;
            tracing::info!(files = written, dest = %dest.display(), "imported tree");
        }
        Commands::Tree { dir } => {
            let tree = workspace::load(&dir)?;
            print!("{}", tree_render::render_tree(&tree));
        }
        Commands::Schema => {
            println!("{}", serde_json::to_string_pretty(&codec::schema()?)?);
        }
        Commands::Generations {
            project,
            projects_root,
        } => {
            let root = projects_root.unwrap_or(config.projects_root);
            for generation in versions::list_generations(&root, &project)? {
                println!("{}", generation);
            }
        }
    }

    Ok(())
}

async fn generate<S: GenerationService>(
    generator: &Generator<S>,
    prompt: &str,
    project: &str,
    template: Option<&Path>,
) -> anyhow::Result<PathBuf> {
    let generation = generator.generate_project(prompt, project, template).await?;
    if let Some(reason) = &generation.manifest.fallback_reason {
        tracing::warn!(reason = %reason, "service output was wrapped into a fallback manifest");
    }
    Ok(generation.project.root_path)
}
