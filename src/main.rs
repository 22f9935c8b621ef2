use std::io::Read;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use menuscan::config;
use menuscan::engines::OllamaGenerativeEngine;
use menuscan::{process_async, MenuOrchestrator, MenuRequest};

const USAGE: &str = "usage: menuscan [--image PATH] [TEXT_FILE]\n\
\n\
Reads recognized menu text from TEXT_FILE (or stdin) and prints the\n\
structured result as JSON. With --image, sparse results escalate to the\n\
Ollama vision model at MENUSCAN_OLLAMA_URL.";

struct Args {
    text_file: Option<String>,
    image: Option<String>,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        text_file: None,
        image: None,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => return Err(USAGE.to_string()),
            "--image" => {
                args.image = Some(iter.next().ok_or("--image needs a path")?);
            }
            _ if args.text_file.is_none() => args.text_file = Some(arg),
            _ => return Err(format!("unexpected argument {arg:?}\n\n{USAGE}")),
        }
    }
    Ok(args)
}

fn read_text(path: Option<&str>) -> Result<String, String> {
    match path {
        Some(path) => std::fs::read_to_string(path).map_err(|e| format!("cannot read {path}: {e}")),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .map_err(|e| format!("cannot read stdin: {e}"))?;
            Ok(text)
        }
    }
}

fn run() -> Result<(), String> {
    let args = parse_args()?;
    let pipeline_config = config::load_pipeline_config().map_err(|e| e.to_string())?;
    let text = read_text(args.text_file.as_deref())?;

    let mut orchestrator = MenuOrchestrator::new(pipeline_config);
    let mut request = MenuRequest::from_text(text);

    if let Some(path) = args.image {
        let image = std::fs::read(&path).map_err(|e| format!("cannot read {path}: {e}"))?;
        let budget = Duration::from_millis(orchestrator.config().stage_timeout_ms);
        let engine = OllamaGenerativeEngine::from_env(budget).map_err(|e| e.to_string())?;
        tracing::info!(model = engine.model(), "Secondary engine enabled");
        orchestrator = orchestrator.with_secondary(Arc::new(engine));
        request = request.with_image(image);
    }

    // The blocking HTTP client must be built outside the runtime
    let runtime = tokio::runtime::Runtime::new().map_err(|e| format!("cannot start runtime: {e}"))?;
    let outcome = runtime.block_on(process_async(Arc::new(orchestrator), request));
    let json = serde_json::to_string_pretty(&outcome).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}

fn main() -> ExitCode {
    config::init_tracing();
    tracing::debug!("{} v{}", config::APP_NAME, config::APP_VERSION);

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}
