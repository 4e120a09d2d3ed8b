use anyhow::{anyhow, Context, Result};
use primekit::design::{DesignEngine, DesignOptions, DesignSpecification};
use primekit::folding::StructureFolder;
use primekit::scoring::DesignMode;
use primekit::template::Template;
use primekit::thermodynamics::ThermodynamicCalculator;
use serde::{Deserialize, Serialize};
use std::{env, fs};

#[derive(Deserialize)]
struct DesignRequest {
    template: String,
    #[serde(default)]
    circular: bool,
    spec: DesignSpecification,
    #[serde(default)]
    options: DesignOptions,
}

#[derive(Deserialize)]
struct BatchRequest {
    template: String,
    #[serde(default)]
    circular: bool,
    specs: Vec<DesignSpecification>,
    #[serde(default)]
    options: DesignOptions,
}

#[derive(Deserialize)]
struct AnalyzeRequest {
    template: String,
    #[serde(default)]
    circular: bool,
    forward: String,
    reverse: String,
    #[serde(default = "default_mode")]
    mode: DesignMode,
    #[serde(default = "default_tm_target")]
    tm_target: f64,
}

fn default_mode() -> DesignMode {
    DesignMode::Amplification
}

fn default_tm_target() -> f64 {
    60.0
}

#[derive(Serialize)]
struct TmReport {
    sequence: String,
    tm_celsius: f64,
    gc_fraction: f64,
    length: usize,
}

fn usage() {
    eprintln!(
        "Usage:\n  \
  primekit_cli --version\n  \
  primekit_cli tm SEQUENCE\n  \
  primekit_cli fold SEQUENCE\n  \
  primekit_cli analyze '<request-json>'\n  \
  primekit_cli design '<request-json>'\n  \
  primekit_cli batch '<request-json>'\n\n  \
  Tip: pass @file.json instead of inline JSON"
    );
}

fn load_json_arg(value: &str) -> Result<String> {
    if let Some(path) = value.strip_prefix('@') {
        fs::read_to_string(path).with_context(|| format!("Could not read JSON file '{path}'"))
    } else {
        Ok(value.to_string())
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Could not serialize JSON output")?;
    println!("{text}");
    Ok(())
}

fn load_template(sequence: &str, circular: bool) -> Result<Template> {
    let template = if circular {
        Template::from_sequence_circular(sequence)
    } else {
        Template::from_sequence(sequence)
    };
    template.map_err(|e| anyhow!("{e}"))
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() <= 1 {
        usage();
        return Err(anyhow!("Missing command"));
    }
    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("primekit {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let command = &args[1];
    match command.as_str() {
        "tm" => {
            let sequence = args.get(2).ok_or_else(|| {
                usage();
                anyhow!("Missing sequence for tm")
            })?;
            let calculator = ThermodynamicCalculator::default();
            let tm_celsius = calculator.tm(sequence).map_err(|e| anyhow!("{e}"))?;
            let cleaned = primekit::template::clean_sequence(sequence).map_err(|e| anyhow!("{e}"))?;
            print_json(&TmReport {
                sequence: String::from_utf8_lossy(&cleaned).to_string(),
                tm_celsius,
                gc_fraction: calculator.gc_fraction(&cleaned),
                length: cleaned.len(),
            })
        }
        "fold" => {
            let sequence = args.get(2).ok_or_else(|| {
                usage();
                anyhow!("Missing sequence for fold")
            })?;
            let folder = StructureFolder::default();
            let fold = folder.fold_sequence(sequence).map_err(|e| anyhow!("{e}"))?;
            print_json(&fold)
        }
        "analyze" => {
            let json = load_json_arg(args.get(2).ok_or_else(|| {
                usage();
                anyhow!("Missing request JSON for analyze")
            })?)?;
            let request: AnalyzeRequest =
                serde_json::from_str(&json).context("Invalid analyze request JSON")?;
            let template = load_template(&request.template, request.circular)?;
            let engine = DesignEngine::default();
            let (features, score) = engine
                .analyze_pair(
                    &template,
                    &request.forward,
                    &request.reverse,
                    request.mode,
                    request.tm_target,
                )
                .map_err(|e| anyhow!("{e}"))?;
            print_json(&serde_json::json!({
                "features": features,
                "score": score,
            }))
        }
        "design" => {
            let json = load_json_arg(args.get(2).ok_or_else(|| {
                usage();
                anyhow!("Missing request JSON for design")
            })?)?;
            let request: DesignRequest =
                serde_json::from_str(&json).context("Invalid design request JSON")?;
            let template = load_template(&request.template, request.circular)?;
            let engine = DesignEngine::default();
            let result = engine
                .design(&template, &request.spec, &request.options)
                .map_err(|e| anyhow!("{e}"))?;
            print_json(&result)
        }
        "batch" => {
            let json = load_json_arg(args.get(2).ok_or_else(|| {
                usage();
                anyhow!("Missing request JSON for batch")
            })?)?;
            let request: BatchRequest =
                serde_json::from_str(&json).context("Invalid batch request JSON")?;
            let template = load_template(&request.template, request.circular)?;
            let engine = DesignEngine::default();
            let results = engine.design_batch(&template, &request.specs, &request.options);
            print_json(&results)
        }
        _ => {
            usage();
            Err(anyhow!("Unknown command '{command}'"))
        }
    }
}
