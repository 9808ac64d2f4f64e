//! Terminal rendering of deploy events and check reports.

use shipwright_deploy::{CheckReport, DeployEvent, DeployOutcome};
use shipwright_uploader::UploadEvent;
use tokio::sync::mpsc;

/// Prints deploy events until the sender side is dropped.
pub async fn print_deploy_events(mut events_rx: mpsc::Receiver<DeployEvent>) {
    while let Some(event) = events_rx.recv().await {
        match event {
            DeployEvent::Step(step) => println!("\n==> {step}"),
            DeployEvent::Upload(UploadEvent::Started {
                total_files,
                total_bytes,
            }) => println!("Sending {total_files} files ({total_bytes} bytes)"),
            DeployEvent::Upload(UploadEvent::Progress {
                done,
                total,
                relative_path,
            }) => println!("  [{done}/{total}] {relative_path}"),
            DeployEvent::Upload(UploadEvent::Failed {
                relative_path,
                error,
            }) => eprintln!("  error in {relative_path}: {error}"),
            DeployEvent::Upload(UploadEvent::Finished { uploaded, failed }) => {
                println!("Upload finished: {uploaded} sent, {failed} skipped")
            }
            DeployEvent::EnvWritten { path } => println!("Environment file written to {path}"),
            DeployEvent::Output(line) => println!("  {line}"),
            DeployEvent::ComposeFinished { exit_status } => match exit_status {
                Some(0) => println!("Containers started"),
                Some(code) => eprintln!("Compose returned exit status {code}"),
                None => eprintln!("Compose ended without an exit status"),
            },
            DeployEvent::Status(output) => println!("{output}"),
        }
    }
}

/// Prints the closing summary of a deploy.
pub fn print_deploy_summary(outcome: &DeployOutcome) {
    let upload = &outcome.upload;
    println!();
    if outcome.is_success() {
        println!("Deploy complete");
    } else {
        println!("Deploy finished with problems");
    }
    println!(
        "  files:   {}/{} uploaded ({} bytes)",
        upload.uploaded_files, upload.total_files, upload.uploaded_bytes
    );
    for failure in &upload.failures {
        println!("  skipped: {} ({})", failure.relative_path, failure.error);
    }
    if let Some(url) = &outcome.app_url {
        println!("  app:     {url}");
    }
}

/// Prints a readiness report section by section.
pub fn print_check_report(report: &CheckReport) {
    for section in &report.sections {
        println!("\n=== {} ===", section.title);
        for result in &section.results {
            if let Some(error) = &result.error {
                eprintln!("[ERR] {}: {error}", result.command);
                continue;
            }
            if !result.output.is_empty() {
                println!("{}", result.output);
            }
            if let Some(code) = result.exit_status
                && code != 0
            {
                eprintln!("[exit {code}] {}", result.command);
            }
        }
    }
}
