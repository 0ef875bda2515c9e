use std::path::{Path, PathBuf};

use resume_intake_lib::core::logging::init_tracing;
use resume_intake_lib::core::models::{FileState, ProcessingMode, UploadedFile};
use resume_intake_lib::core::service::CoreService;

const USAGE: &str = "Usage: resume_intake [--job <job-description.txt>] <resume> [<resume>...]";

struct Args {
    job_description: Option<PathBuf>,
    resumes: Vec<PathBuf>,
}

fn parse_args(mut raw: impl Iterator<Item = String>) -> Option<Args> {
    let mut job_description = None;
    let mut resumes = Vec::new();

    while let Some(arg) = raw.next() {
        match arg.as_str() {
            "--job" => job_description = Some(PathBuf::from(raw.next()?)),
            "-h" | "--help" => return None,
            _ => resumes.push(PathBuf::from(arg)),
        }
    }

    if resumes.is_empty() {
        return None;
    }
    Some(Args {
        job_description,
        resumes,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let Some(args) = parse_args(std::env::args().skip(1)) else {
        eprintln!("{USAGE}");
        std::process::exit(1);
    };

    if let Some(missing) = args
        .resumes
        .iter()
        .chain(args.job_description.iter())
        .find(|path| !path.exists())
    {
        eprintln!("File not found: {}", missing.display());
        std::process::exit(2);
    }

    let mut files = Vec::with_capacity(args.resumes.len());
    for path in &args.resumes {
        let bytes = tokio::fs::read(path).await?;
        // An empty MIME type makes the renderer fall back to the extension.
        files.push(UploadedFile::new(file_name(path), "", bytes));
    }

    let service = CoreService::new().await?;
    service.set_processing_mode(ProcessingMode::Auto);
    service.upload(files);
    service.wait_idle().await;

    for status in service.file_statuses() {
        if status.status == FileState::Error {
            eprintln!(
                "{}: {}",
                status.file_name,
                status.error.unwrap_or_default()
            );
        }
    }

    let candidates = match args.job_description {
        Some(path) => {
            let job_description = tokio::fs::read_to_string(&path).await?;
            service.analyze_matches(&job_description).await?
        }
        None => service.candidates(),
    };

    println!("{}", serde_json::to_string_pretty(&candidates)?);
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|v| v.to_str())
        .unwrap_or("resume")
        .to_string()
}
