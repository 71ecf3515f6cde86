use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use formula_forge::ai::{GeminiSolverClient, SolverService};
use formula_forge::input::Sketch;
use formula_forge::models::{Config, InputMode};
use formula_forge::render::render_result;
use formula_forge::repl::Repl;
use formula_forge::session::Session;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "formula-forge")]
#[command(about = "Step-by-step solutions for math and science problems")]
struct CliArgs {
    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Solve a single problem and exit.
    Solve(SolveArgs),
    /// Interactive session (the default).
    Interactive,
}

#[derive(Debug, Args)]
struct SolveArgs {
    /// Problem text, or extra context for an image or sketch.
    #[arg(short, long)]
    text: Option<String>,

    /// Image file containing the problem.
    #[arg(short, long, value_name = "PATH", conflicts_with = "sketch")]
    image: Option<PathBuf>,

    /// JSON sketch file: {"strokes": [[[x, y], ...], ...]}.
    #[arg(short, long, value_name = "PATH")]
    sketch: Option<PathBuf>,
}

impl SolveArgs {
    fn mode(&self) -> InputMode {
        if self.sketch.is_some() {
            InputMode::Draw
        } else if self.image.is_some() {
            InputMode::Image
        } else {
            InputMode::Text
        }
    }
}

fn prepare_session(args: &SolveArgs) -> Result<Session> {
    let mut session = Session::new();
    session.set_mode(args.mode());
    session.set_text(args.text.clone().unwrap_or_default());

    if let Some(path) = &args.image {
        session.attach_image_path(path)?;
    }
    if let Some(path) = &args.sketch {
        *session.canvas_mut() = Sketch::load(path)?.into_canvas();
    }

    Ok(session)
}

async fn run_once(args: SolveArgs, service: &dyn SolverService) -> Result<bool> {
    let mut session = prepare_session(&args)?;
    session.solve(service).await;

    let view = session.view();
    println!("{}", render_result(&view));
    Ok(view.error.is_none())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "formula_forge=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = CliArgs::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };
    info!("Solver model: {}", config.model);

    let service: Arc<dyn SolverService> = Arc::new(GeminiSolverClient::from_config(&config));

    match args.command.unwrap_or(CliCommand::Interactive) {
        CliCommand::Solve(solve_args) => match run_once(solve_args, service.as_ref()).await {
            Ok(true) => Ok(()),
            Ok(false) => std::process::exit(1),
            Err(e) => {
                error!("Solve failed: {}", e);
                std::process::exit(1);
            }
        },
        CliCommand::Interactive => {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let mut stdout = std::io::stdout();
            Repl::new(service).run(stdin, &mut stdout).await?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formula_forge::ai::MockSolverClient;
    use std::io::Write;

    fn args(text: Option<&str>, image: Option<PathBuf>, sketch: Option<PathBuf>) -> SolveArgs {
        SolveArgs {
            text: text.map(str::to_string),
            image,
            sketch,
        }
    }

    #[test]
    fn test_mode_inference() {
        assert_eq!(args(Some("1+1"), None, None).mode(), InputMode::Text);
        assert_eq!(
            args(None, Some(PathBuf::from("a.png")), None).mode(),
            InputMode::Image
        );
        assert_eq!(
            args(None, None, Some(PathBuf::from("s.json"))).mode(),
            InputMode::Draw
        );
    }

    #[test]
    fn test_cli_rejects_image_with_sketch() {
        let parsed = CliArgs::try_parse_from([
            "formula-forge",
            "solve",
            "--image",
            "a.png",
            "--sketch",
            "s.json",
        ]);
        assert!(parsed.is_err());
    }

    #[tokio::test]
    async fn test_run_once_with_sketch() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"strokes": [[[10, 10], [90, 40]]]}}"#).unwrap();

        let service = MockSolverClient::new().with_solution("It is a line".to_string());
        let ok = run_once(
            args(None, None, Some(file.path().to_path_buf())),
            &service,
        )
        .await
        .unwrap();

        assert!(ok);
        assert_eq!(
            service.requests()[0].image.as_ref().unwrap().mime_type,
            "image/png"
        );
    }

    #[tokio::test]
    async fn test_run_once_empty_text_fails_without_call() {
        let service = MockSolverClient::new();
        let ok = run_once(args(Some("  "), None, None), &service).await.unwrap();
        assert!(!ok);
        assert_eq!(service.get_call_count(), 0);
    }
}
