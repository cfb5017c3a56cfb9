use std::{fs, process};

use clap::Parser;
use kvoracle_cli::{App, Command, RunRecord, ValidateArgs};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let app = App::parse();
    match &app.command {
        Command::Validate(args) => validate(args),
    }
}

fn validate(args: &ValidateArgs) {
    let mut any_failed = false;

    for path in &args.inputs {
        let filename = path.file_name().unwrap_or_default().to_string_lossy();

        let file = fs::File::open(path).unwrap_or_else(|e| {
            eprintln!("Failed to open {filename}: {e}");
            process::exit(1);
        });

        let record: RunRecord = serde_json::from_reader(file).unwrap_or_else(|e| {
            eprintln!("Failed to parse {filename}: {e}");
            process::exit(1);
        });

        tracing::debug!(
            file = %filename,
            steps = record.steps.len(),
            versions = record.log.len(),
            "validating run"
        );

        let failures = match kvoracle_core::validate(&record.steps, &record.log) {
            Ok(failures) => failures,
            Err(e) => {
                eprintln!("Malformed run in {filename}: {e:?}");
                process::exit(1);
            }
        };

        let rendered: Vec<String> = failures.iter().map(ToString::to_string).collect();
        if args.json {
            let result = serde_json::json!({
                "file": filename,
                "consistent": rendered.is_empty(),
                "failures": rendered,
            });
            println!("{result}");
        } else if rendered.is_empty() {
            println!("{filename}: PASS");
        } else {
            println!("{filename}: FAIL");
            for failure in &rendered {
                println!("  {failure}");
            }
        }
        if !rendered.is_empty() {
            any_failed = true;
        }
    }

    if any_failed {
        process::exit(1);
    }
}
