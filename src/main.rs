use periphery::analysis::Periphery;
use periphery::cli::{Cli, Commands, ConfigAction, ProjectAction};
use periphery::config::Config;
use periphery::error::{PeripheryError, Result};
use periphery::scrape::ScrapeState;
use periphery::storage::Project;
use std::path::{Path, PathBuf};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(cli.verbose);

    // Handle commands
    match cli.command {
        Commands::Project { action } => {
            cmd_project(cli.config, action)?;
        }
        Commands::Analyze { project } => {
            cmd_analyze(cli.config, &project).await?;
        }
        Commands::Resume { project } => {
            cmd_resume(cli.config, &project).await?;
        }
        Commands::Deps {
            project,
            qualifying,
            json,
        } => {
            cmd_deps(cli.config, &project, qualifying, json)?;
        }
        Commands::Status { project } => {
            cmd_status(cli.config, &project)?;
        }
        Commands::Logs { project } => {
            cmd_logs(cli.config, &project)?;
        }
        Commands::People {
            project,
            limit,
            json,
        } => {
            cmd_people(cli.config, &project, limit, json)?;
        }
        Commands::Person {
            project,
            username,
            json,
        } => {
            cmd_person(cli.config, &project, &username, json)?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, action)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "periphery=debug" } else { "periphery=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt().with_env_filter(filter).with_target(false).init();
}

fn open(config_path: Option<PathBuf>) -> Result<Periphery> {
    let config = load_config(config_path)?;
    Periphery::from_config(&config)
}

fn read_manifest(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| PeripheryError::Io {
        source: e,
        context: format!("Failed to read manifest: {:?}", path),
    })
}

fn manifest_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| PeripheryError::Json {
        source: e,
        context: "Failed to serialize output".to_string(),
    })
}

/// New projects read as `processing` until their first analysis runs
fn created_message(project: &Project) -> String {
    format!(
        "✓ Created project {} ({})\n  Status: {} until 'periphery analyze {}' runs",
        project.name,
        project.id,
        project.analysis_status.as_str(),
        project.id
    )
}

fn cmd_project(config_path: Option<PathBuf>, action: ProjectAction) -> Result<()> {
    let app = open(config_path)?;
    let db = app.database();

    match action {
        ProjectAction::Create {
            name,
            manifest,
            description,
        } => {
            let content = read_manifest(&manifest)?;
            let project =
                db.create_project(&name, &description, &content, manifest_name(&manifest))?;
            println!("{}", created_message(&project));
        }
        ProjectAction::AddManifest { project, manifest } => {
            let content = read_manifest(&manifest)?;
            let name = manifest_name(&manifest).unwrap_or(periphery::storage::DEFAULT_MANIFEST_NAME);
            db.add_manifest(&project, name, &content)?;
            println!("✓ Added {} to project {}", name, project);
        }
        ProjectAction::List => {
            let projects = db.list_projects()?;
            if projects.is_empty() {
                println!("No projects yet");
            }
            for project in projects {
                println!(
                    "{}  {:<24} {:<10} {}",
                    project.id,
                    project.name,
                    project.analysis_status.as_str(),
                    project.created_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
    }

    Ok(())
}

async fn cmd_analyze(config_path: Option<PathBuf>, project: &str) -> Result<()> {
    let app = open(config_path)?;

    println!("Analyzing project {}...", project);
    let summary = app.start_analysis(project).await?;

    println!("✓ Analysis complete");
    println!("  Dependencies:    {}", summary.dependencies);
    println!("  With repository: {}", summary.with_repository);
    println!("  Scored:          {}", summary.scored);
    println!(
        "  Scraped repos:   {}/{}",
        summary.progress.processed_repos, summary.progress.total_repos
    );
    Ok(())
}

async fn cmd_resume(config_path: Option<PathBuf>, project: &str) -> Result<()> {
    let app = open(config_path)?;
    let progress = app.resume(project).await?;
    println!(
        "✓ Scrape finished ({}/{} repos)",
        progress.processed_repos, progress.total_repos
    );
    Ok(())
}

fn cmd_deps(config_path: Option<PathBuf>, project: &str, qualifying: bool, json: bool) -> Result<()> {
    let app = open(config_path)?;
    let deps = if qualifying {
        app.list_qualifying(project)?
    } else {
        app.list_dependencies(project)?
    };

    if json {
        println!("{}", to_json(&deps)?);
        return Ok(());
    }

    let cutoff = app.signal_cutoff();
    println!("Signal cutoff: {:.2}", cutoff);
    for dep in deps {
        let marker = if dep.qualifies(cutoff) { "*" } else { " " };
        let scores = match dep.scores {
            Some(s) => format!("{:.2} (rel {:.2}, niche {:.2})", s.signal, s.relevance, s.niche),
            None => "pending".to_string(),
        };
        println!(
            "{} {:<32} {:<12} {:<34} {}",
            marker,
            dep.package_name,
            dep.version_spec,
            scores,
            dep.repository_url.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

fn cmd_status(config_path: Option<PathBuf>, project: &str) -> Result<()> {
    let app = open(config_path)?;
    let record = app.database().require_project(project)?;
    let progress = app.get_progress(project)?;

    println!("Project: {} ({})", record.name, record.id);
    println!("  Analysis: {}", record.analysis_status.as_str());

    let state = match ScrapeState::of(progress.as_ref()) {
        ScrapeState::NotStarted => "not started",
        ScrapeState::Running => "in progress",
        ScrapeState::Finished => "finished",
    };
    println!("  Scrape:   {}", state);

    if let Some(progress) = progress {
        println!(
            "  Progress: {}/{} repos ({}%)",
            progress.processed_repos, progress.total_repos, progress.percent
        );
        println!(
            "  Updated:  {}",
            progress.updated_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}

fn cmd_logs(config_path: Option<PathBuf>, project: &str) -> Result<()> {
    let app = open(config_path)?;
    for entry in app.list_logs(project)? {
        println!(
            "{} [{:<5}] {:<20} {}",
            entry.created_at.format("%H:%M:%S"),
            entry.level,
            entry.step.as_deref().unwrap_or("-"),
            entry.message
        );
    }
    Ok(())
}

fn cmd_people(config_path: Option<PathBuf>, project: &str, limit: usize, json: bool) -> Result<()> {
    let app = open(config_path)?;
    let people: Vec<_> = app.list_influence(project)?.into_iter().take(limit).collect();

    if json {
        println!("{}", to_json(&people)?);
        return Ok(());
    }

    if people.is_empty() {
        println!("No contributors recorded yet");
    }
    for (rank, person) in people.iter().enumerate() {
        println!(
            "{:>3}. {:<24} commits {:>6}  issues {:>5}  total {:>6}",
            rank + 1,
            person.username,
            person.commits,
            person.issues,
            person.total()
        );
    }
    Ok(())
}

fn cmd_person(config_path: Option<PathBuf>, project: &str, username: &str, json: bool) -> Result<()> {
    let app = open(config_path)?;
    let detail = app.user_detail(project, username)?;

    if json {
        println!("{}", to_json(&detail)?);
        return Ok(());
    }

    println!("{}", detail.username);
    if let Some(url) = &detail.profile_url {
        println!("  Profile: {}", url);
    }
    println!("  Commits: {}  Issues: {}", detail.commits, detail.issues);
    println!(
        "  Active in {} of {} relevant repos",
        detail.affected_repos, detail.total_relevant_repos
    );
    for repo in &detail.repos {
        println!(
            "  - {}/{}  commits {}  issues {}",
            repo.owner, repo.repo, repo.commits, repo.issues
        );
        println!("      {}", repo.commits_url);
        println!("      {}", repo.issues_url);
    }
    Ok(())
}

fn cmd_config(config_path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show { section } => {
            let config = load_config(config_path)?;
            let value = toml::Value::try_from(&config)?;

            let shown = match section {
                Some(name) => value.get(&name).cloned().ok_or_else(|| {
                    PeripheryError::Config(format!("Unknown config section: {}", name))
                })?,
                None => value,
            };
            println!("{}", toml::to_string_pretty(&shown)?);
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            // Create parent directory
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| PeripheryError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }

            Config::default().save(&path)?;
            println!("✓ Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

fn load_config(config_path: Option<PathBuf>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    Config::load_or_default(&path)
}
