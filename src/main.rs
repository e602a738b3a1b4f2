use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use predicate_engine::{
    parse_predicate, ApplicantData, DateConverter, JsonPathPredicateGenerator, ParseError,
    PredicateEvaluator, ProgramConfig,
};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Evaluate block predicates against an applicant's answers", long_about = None)]
struct Cli {
    /// Program definition (questions and blocks) as JSON
    #[arg(short, long)]
    program: Option<PathBuf>,

    /// Applicant answers as JSON, rooted at {"applicant": ...}
    #[arg(short, long)]
    applicant: Option<PathBuf>,

    /// Date used by age predicates, yyyy-mm-dd
    #[arg(short, long)]
    today: Option<NaiveDate>,

    /// Evaluate one predicate and exit instead of starting the REPL
    #[arg(short, long)]
    query: Option<String>,

    /// Log every compiled leaf
    #[arg(short, long)]
    verbose: bool,
}

struct Session {
    program: ProgramConfig,
    applicant: ApplicantData,
    generator: JsonPathPredicateGenerator,
}

impl Session {
    fn load(cli: &Cli) -> Result<Self> {
        // 优先使用JSON配置，失败时使用示例程序
        let program = match &cli.program {
            Some(path) => ProgramConfig::from_json_file(path)?,
            None => {
                warn!("no --program given, using the sample program");
                ProgramConfig::sample()
            }
        };
        info!(questions = program.questions.len(), blocks = program.blocks.len(), "program loaded");

        let applicant = match &cli.applicant {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("cannot read applicant file {}", path.display()))?;
                ApplicantData::from_json_str(&json)
                    .with_context(|| format!("cannot parse applicant file {}", path.display()))?
            }
            None => ApplicantData::new(),
        };

        let date_converter = match cli.today {
            Some(today) => DateConverter::fixed(today),
            None => program.date_converter(),
        };
        let generator = JsonPathPredicateGenerator::new(date_converter, &program.questions, None);

        Ok(Self {
            program,
            applicant,
            generator,
        })
    }

    fn evaluator(&self) -> PredicateEvaluator<'_, ApplicantData> {
        PredicateEvaluator::new(&self.applicant, &self.generator)
    }

    fn evaluate(&self, input: &str) -> Result<bool, ParseError> {
        let tree = parse_predicate(input)?;
        let (result, trace) = self.evaluator().evaluate_with_trace(&tree);

        println!("{}", tree.to_display_string(&self.program.questions));
        for leaf in &trace {
            match &leaf.query {
                Ok(query) => println!("  [{}] {}", mark(leaf.result), query),
                Err(err) => println!("  [{}] question {}: {}", mark(false), leaf.question_id, err),
            }
        }
        println!("=> {}", result);
        Ok(result)
    }

    fn print_questions(&self) {
        for question in &self.program.questions {
            let scalars: Vec<String> = question
                .question_type
                .scalars()
                .iter()
                .map(|s| s.to_string())
                .collect();
            println!(
                "  {:>4}  {:<28} {:?} [{}]",
                question.id,
                question.name,
                question.question_type,
                scalars.join(", ")
            );
        }
    }

    fn print_blocks(&self) {
        let evaluator = self.evaluator();
        for block in &self.program.blocks {
            println!(
                "  {:<24} visible: {:<5} eligible: {}",
                block.name,
                evaluator.is_visible(block.visibility.as_ref(), &[]),
                evaluator.is_eligible(block.eligibility.as_ref())
            );
            for definition in [&block.visibility, &block.eligibility].into_iter().flatten() {
                println!("      {:?}: {}", definition.action, definition.root_node);
            }
        }
    }
}

fn mark(result: bool) -> &'static str {
    if result {
        "x"
    } else {
        " "
    }
}

fn print_parse_error(input: &str, err: &ParseError) {
    let width = err.span.end.saturating_sub(err.span.start).max(1);
    eprintln!("  {}", input);
    eprintln!("  {}{}", " ".repeat(err.span.start), "^".repeat(width));
    eprintln!("parse error: {}", err.message);
}

fn print_help() {
    println!("  <predicate>   e.g. 1.city == \"Seattle\" AND 3.number BETWEEN [1, 4]");
    println!("  :questions    list the questions predicates may reference");
    println!("  :blocks       evaluate every block's visibility and eligibility");
    println!("  :data         print the applicant's answers");
    println!("  :quit         leave");
}

fn repl(session: &Session) -> Result<()> {
    let mut editor = DefaultEditor::new()?;
    println!("predicate-repl: type :help for commands");

    loop {
        match editor.readline("predicate> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                editor.add_history_entry(line)?;
                match line {
                    ":quit" | ":q" => break,
                    ":help" => print_help(),
                    ":questions" => session.print_questions(),
                    ":blocks" => session.print_blocks(),
                    ":data" => println!("{}", serde_json::to_string_pretty(session.applicant.as_value())?),
                    _ => {
                        if let Err(err) = session.evaluate(line) {
                            print_parse_error(line, &err);
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let session = Session::load(&cli)?;

    match &cli.query {
        Some(query) => match session.evaluate(query) {
            Ok(result) => {
                std::process::exit(if result { 0 } else { 1 });
            }
            Err(err) => {
                print_parse_error(query, &err);
                std::process::exit(2);
            }
        },
        None => repl(&session),
    }
}
