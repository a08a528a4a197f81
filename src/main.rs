use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use plan_review::catalog::FieldCatalog;
use plan_review::chat;
use plan_review::config::AppConfig;
use plan_review::ingestion::ExtractionTable;
use plan_review::judgment::LlmJudge;
use plan_review::learning_store::LearningStore;
use plan_review::llm::LlmClient;
use plan_review::render;
use plan_review::session::ReviewSession;
use plan_review::validation::{validate_all, ChecklistValidationReport};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "plan-review")]
#[command(about = "Plan document checklist generation and validation")]
struct Args {
    /// Learned-mapping file (or set PLAN_REVIEW_MAPPINGS)
    #[arg(long, global = true)]
    mappings: Option<PathBuf>,

    /// Directory for exports (or set PLAN_REVIEW_OUTPUT_DIR)
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// OpenAI API key (or set OPENAI_API_KEY env var)
    #[arg(long, global = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate an extraction table and print the summary
    Validate {
        /// CSV, XLSX or JSON extraction output
        file: PathBuf,
        /// Only rows for this group
        #[arg(short, long)]
        group: Option<String>,
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate a group's checklist and export it
    Checklist {
        file: PathBuf,
        #[arg(short, long)]
        group: String,
        #[arg(long)]
        html: bool,
        #[arg(long)]
        json: bool,
        #[arg(long)]
        csv: bool,
        #[arg(long)]
        pdf: bool,
        /// Ask the LLM for approval/notice/handbook flags
        #[arg(long)]
        ai: bool,
    },
    /// Teach a synonym or a correction
    Teach {
        #[command(subcommand)]
        lesson: Lesson,
    },
    /// Show recent learning events
    History {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// Interactive menu
    Chat {
        /// Extraction table to load at start
        file: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum Lesson {
    Synonym {
        term: String,
        synonym: String,
        #[arg(short, long, default_value = "user")]
        user: String,
    },
    Correction {
        incorrect: String,
        correct: String,
        #[arg(short, long, default_value = "user")]
        user: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config = AppConfig::from_env()?;
    if let Some(path) = args.mappings {
        config.mappings_path = path;
    }
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }
    if let Some(key) = args.api_key {
        config.api_key = key;
    }

    let store = LearningStore::open(&config.mappings_path)
        .with_context(|| format!("loading {}", config.mappings_path.display()))?;
    let catalog = FieldCatalog::standard();

    match args.command {
        Command::Validate { file, group, json } => {
            let mut table = ExtractionTable::from_path(&file)?;
            if let Some(group) = &group {
                table = table.for_group(group);
            }
            let report = validate_all(&table.field_values(), &catalog, &store);
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_summary(&report);
            }
        }
        Command::Checklist {
            file,
            group,
            html,
            json,
            csv,
            pdf,
            ai,
        } => {
            let mut session = ReviewSession::new(catalog, store);
            session.load_table(&file)?;
            session.process_group(&group);
            if ai {
                if !config.ai_enabled() {
                    println!("AI mode requested but no API key is configured; skipping.");
                } else {
                    let judge = LlmJudge::new(LlmClient::from_config(&config));
                    session.apply_judgment(&judge).await;
                }
            }
            if let Some((checklist, report)) = session.current() {
                print_summary(report);
                std::fs::create_dir_all(&config.output_dir)?;
                // HTML preview unless another format was asked for
                if html || !(json || csv || pdf) {
                    let path = render::write_html(checklist, report, &config.output_dir)?;
                    println!("HTML preview: {}", path.display());
                }
                if json {
                    let path = render::write_json(checklist, report, &config.output_dir)?;
                    println!("JSON export: {}", path.display());
                }
                if csv {
                    let path = render::write_csv_file(checklist, &config.output_dir)?;
                    println!("CSV export: {}", path.display());
                }
                if pdf {
                    let path = render::write_pdf(checklist, report, &config.output_dir)?;
                    println!("PDF checklist: {}", path.display());
                }
            }
        }
        Command::Teach { lesson } => {
            let mut store = store;
            match lesson {
                Lesson::Synonym { term, synonym, user } => {
                    store.teach_synonym(&term, &synonym, &user)?;
                    println!("Learned: '{}' is a synonym for '{}'", synonym, term);
                }
                Lesson::Correction {
                    incorrect,
                    correct,
                    user,
                } => {
                    store.teach_correction(&incorrect, &correct, &user)?;
                    println!("Learned: '{}' should be '{}'", incorrect, correct);
                }
            }
        }
        Command::History { limit } => print_history(&store, limit),
        Command::Chat { file } => {
            let mut session = ReviewSession::new(catalog, store);
            if let Some(file) = file {
                session.load_table(&file)?;
            }
            run_menu(&mut session, &config).await?;
        }
    }

    Ok(())
}

fn print_summary(report: &ChecklistValidationReport) {
    println!("\nValidation Summary:");
    println!("   Status: {}", report.overall_status.as_str().to_uppercase());
    println!("   Fields Found: {}", report.fields_found);
    println!("   Missing Fields: {}", report.fields_missing);
    println!("   Needs Review: {}", report.fields_with_issues);

    if !report.warnings.is_empty() {
        println!("\n{} Warning(s)", report.warnings.len());
        for warning in report.warnings.iter().take(5) {
            println!("     - {}", warning);
        }
    }
    for result in report.field_results.values() {
        if let Some(judgment) = &result.judgment {
            println!(
                "   [AI] {}: approval={} notice={} handbook={} - {}",
                result.field_name,
                judgment.requires_approval,
                judgment.requires_notice,
                judgment.in_handbook,
                judgment.reasoning
            );
        }
    }
}

fn print_history(store: &LearningStore, limit: usize) {
    let recent = store.recent_history(limit);
    if recent.is_empty() {
        println!("No learning history yet.");
        return;
    }
    println!(
        "Learning History (showing {} of {} entries):",
        recent.len(),
        store.history().len()
    );
    for (i, event) in recent.iter().enumerate() {
        println!("\n{}. {}", i + 1, event.action.to_string().to_uppercase());
        println!("   Term: {}", event.subject_term);
        println!("   Value: {}", event.value);
        println!("   User: {}", event.user_id);
        println!("   Time: {}", event.timestamp);
    }
}

fn prompt(lines: &mut impl Iterator<Item = io::Result<String>>, label: &str) -> Result<Option<String>> {
    print!("{}", label);
    io::stdout().flush()?;
    match lines.next() {
        Some(line) => Ok(Some(line?.trim().to_string())),
        None => Ok(None),
    }
}

async fn run_menu(session: &mut ReviewSession, config: &AppConfig) -> Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    println!("\n{}", "=".repeat(70));
    println!("Plan Document Review System");
    println!("Checklist generation, validation and continuous learning");
    println!("{}\n", "=".repeat(70));

    loop {
        println!("\nMain Menu:");
        println!("1. Load extraction output (CSV/XLSX/JSON)");
        println!("2. Generate checklist for group");
        println!("3. Validate current checklist");
        println!("4. Preview checklist (HTML)");
        println!("5. Export data (JSON/CSV/PDF)");
        println!("6. Teach (add synonym/correction)");
        println!("7. View learning history");
        println!("8. Chat mode");
        println!("9. AI judgment on current checklist");
        println!("0. Exit");

        let Some(choice) = prompt(&mut lines, "\nChoose an option (0-9): ")? else {
            break;
        };

        match choice.as_str() {
            "0" => {
                println!("\nThank you for using the Plan Document Review System!");
                break;
            }
            "1" => {
                let Some(path) = prompt(&mut lines, "Enter file path: ")? else { break };
                match session.load_table(&path) {
                    Ok(table) => {
                        println!("Loaded {} rows", table.len());
                        let groups = table.groups();
                        if !groups.is_empty() {
                            println!("Groups: {}", groups.join(", "));
                        }
                    }
                    Err(e) => println!("Error loading {}: {}", path, e),
                }
            }
            "2" => {
                if let Some(groups) = session.table().map(|t| t.groups()).filter(|g| !g.is_empty()) {
                    println!("\nAvailable groups: {}", groups.join(", "));
                }
                let Some(group) = prompt(&mut lines, "Enter group name: ")? else { break };
                if !group.is_empty() {
                    let (_, report) = session.process_group(&group);
                    print_summary(report);
                }
            }
            "3" => match session.revalidate() {
                Some(report) => print_summary(report),
                None => println!("No checklist to validate. Generate one first."),
            },
            "4" => match session.current() {
                Some((checklist, report)) => {
                    std::fs::create_dir_all(&config.output_dir)?;
                    let path = render::write_html(checklist, report, &config.output_dir)?;
                    println!("HTML preview generated: {}", path.display());
                    println!("  Open in a browser to edit before export");
                }
                None => println!("No checklist generated yet. Generate a checklist first."),
            },
            "5" => match session.current() {
                Some((checklist, report)) => {
                    std::fs::create_dir_all(&config.output_dir)?;
                    let json = render::write_json(checklist, report, &config.output_dir)?;
                    println!("JSON exported: {}", json.display());
                    let csv = render::write_csv_file(checklist, &config.output_dir)?;
                    println!("CSV exported: {}", csv.display());
                    let pdf = render::write_pdf(checklist, report, &config.output_dir)?;
                    println!("PDF generated: {}", pdf.display());
                }
                None => println!("No checklist generated yet. Generate a checklist first."),
            },
            "6" => teach_menu(session, &mut lines)?,
            "7" => print_history(&session.store, 10),
            "8" => {
                println!("\nChat Mode (type 'exit' to return to menu)");
                loop {
                    let Some(input) = prompt(&mut lines, "You: ")? else { break };
                    if chat::is_exit(&input) {
                        break;
                    }
                    if input.is_empty() {
                        continue;
                    }
                    println!("Bot: {}\n", chat::respond(&input, session.current()));
                }
            }
            "9" => {
                if !config.ai_enabled() {
                    println!("AI mode needs OPENAI_API_KEY.");
                    continue;
                }
                let judge = LlmJudge::new(LlmClient::from_config(config));
                match session.apply_judgment(&judge).await {
                    Some(report) => print_summary(report),
                    None => println!("No checklist generated yet. Generate a checklist first."),
                }
            }
            _ => println!("Invalid option. Please try again."),
        }
    }

    info!("Menu closed");
    Ok(())
}

fn teach_menu(
    session: &mut ReviewSession,
    lines: &mut impl Iterator<Item = io::Result<String>>,
) -> Result<()> {
    println!("\nTeaching Mode");
    println!("1. Add Synonym");
    println!("2. Add Correction");
    println!("3. Back");

    let Some(choice) = prompt(lines, "Choose option: ")? else {
        return Ok(());
    };
    let (first_label, second_label) = match choice.as_str() {
        "1" => ("Enter term: ", "Enter synonym: "),
        "2" => ("Enter incorrect term: ", "Enter correct term: "),
        _ => return Ok(()),
    };

    let (Some(first), Some(second)) = (prompt(lines, first_label)?, prompt(lines, second_label)?) else {
        return Ok(());
    };
    let user = prompt(lines, "Your name (optional): ")?
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| "user".to_string());

    let outcome = if choice == "1" {
        session
            .store
            .teach_synonym(&first, &second, &user)
            .map(|_| format!("Learned: '{}' is a synonym for '{}'", second, first))
    } else {
        session
            .store
            .teach_correction(&first, &second, &user)
            .map(|_| format!("Learned: '{}' should be '{}'", first, second))
    };

    match outcome {
        Ok(message) => println!("{}", message),
        Err(e) => println!("Could not save: {}", e),
    }
    Ok(())
}
