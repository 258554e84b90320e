use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info};

use xrefmaps::{
    fix_xrefmap_file, resolve_href, DocFx, GitCli, HrefContext, HttpLinkChecker, LinkChecker,
    LinkValidation, VersionControl, XrefMapGenerator, XrefMapsConfig,
};

#[derive(Parser)]
#[command(
    name = "xrefmaps",
    version,
    about = "Generate the DocFX xref maps of every Unity version"
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to ./xrefmaps.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate and publish the xref map of every version
    Generate {
        /// Root directory of the published xref maps
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Drop the references whose page does not exist online
        #[arg(long)]
        test_urls: bool,

        /// Do not regenerate versions already published
        #[arg(long)]
        skip_existing: bool,

        /// Commit the output repository with this message
        #[arg(long, value_name = "MESSAGE")]
        commit: Option<String>,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Fix the hrefs of an xref map in place
    Fix {
        file: PathBuf,

        /// Scripting reference the hrefs point to
        #[arg(long)]
        api_url: Option<String>,

        /// Drop the references whose page does not exist online
        #[arg(long)]
        test_urls: bool,
    },
    /// List the versions resolved from the tags of the source repository
    Versions {
        /// Working tree of the source repository
        #[arg(long)]
        repo: Option<PathBuf>,
    },
    /// Resolve the href of a single symbol
    Href {
        uid: String,
        comment_id: String,

        /// Scripting reference the href points to
        #[arg(long)]
        api_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut config =
        XrefMapsConfig::load(cli.config.as_deref()).context("Failed to load the configuration")?;

    match cli.command {
        Commands::Generate {
            output,
            test_urls,
            skip_existing,
            commit,
            json,
        } => {
            if let Some(output) = output {
                config.output_path = output;
            }
            config.test_urls |= test_urls;
            config.skip_existing |= skip_existing;
            if commit.is_some() {
                config.commit_message = commit;
            }
            cmd_generate(config, json).await
        }
        Commands::Fix {
            file,
            api_url,
            test_urls,
        } => {
            config.test_urls |= test_urls;
            cmd_fix(&config, file, api_url).await
        }
        Commands::Versions { repo } => {
            if let Some(repo) = repo {
                config.repo_path = repo;
            }
            cmd_versions(&config).await
        }
        Commands::Href {
            uid,
            comment_id,
            api_url,
        } => {
            let api_url = api_url.unwrap_or_else(|| config.api_url.clone());
            println!(
                "{}",
                resolve_href(&uid, &comment_id, &api_url, &config.namespaces_to_trim)
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn link_checker(config: &XrefMapsConfig) -> Result<Arc<dyn LinkChecker>> {
    let checker = HttpLinkChecker::new(Duration::from_secs(config.link_check_timeout_secs))
        .context("Failed to create the HTTP client")?;
    Ok(Arc::new(checker))
}

async fn cmd_generate(config: XrefMapsConfig, json: bool) -> Result<ExitCode> {
    let docs = Arc::new(DocFx::new(&config));
    let mut generator = XrefMapGenerator::new(config.clone(), Arc::new(GitCli), docs);
    if config.test_urls {
        generator = generator.with_link_checker(link_checker(&config)?);
    }

    let report = generator.run().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    for failure in &report.failed {
        error!("{} ({}): {}", failure.version, failure.release, failure.error);
    }

    if report.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

async fn cmd_fix(config: &XrefMapsConfig, file: PathBuf, api_url: Option<String>) -> Result<ExitCode> {
    let context = HrefContext::new(
        api_url.unwrap_or_else(|| config.api_url.clone()),
        config.namespaces_to_trim.clone(),
    );

    let validation = if config.test_urls {
        Some(LinkValidation {
            checker: link_checker(config)?,
            concurrency: config.link_check_concurrency,
        })
    } else {
        None
    };

    let report = fix_xrefmap_file(&file, &context, config.rescue_orphan_overloads, validation.as_ref())
        .await
        .with_context(|| format!("Failed to fix {}", file.display()))?;

    info!(
        "Fixed {}: {} references kept, {} invalid, {} unreachable",
        file.display(),
        report.resolved - report.unreachable,
        report.removed,
        report.unreachable
    );
    Ok(ExitCode::SUCCESS)
}

async fn cmd_versions(config: &XrefMapsConfig) -> Result<ExitCode> {
    let tags = GitCli
        .list_tags(&config.repo_path)
        .await
        .with_context(|| format!("Failed to list the tags of '{}'", config.repo_path.display()))?;

    let resolved = xrefmaps::resolve_versions(&tags, config.stable_marker)
        .context("Failed to resolve the Unity versions")?;

    for version in &resolved.versions {
        println!("{}\t{}", version.name, version.release);
    }
    println!(
        "latest stable: {} ({})",
        resolved.latest_stable.name, resolved.latest_stable.release
    );
    Ok(ExitCode::SUCCESS)
}
