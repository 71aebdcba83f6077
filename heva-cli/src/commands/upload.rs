//! Upload command - send files as multipart form data.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use heva_core::Envelope;
use heva_fetch::UploadForm;
use serde_json::Value;
use tracing::info;

use crate::context::AppContext;
use crate::output;
use crate::Cli;

/// Arguments for the upload command.
#[derive(Args)]
pub struct UploadArgs {
    /// Endpoint path relative to the base URL.
    pub endpoint: String,

    /// File to upload. Repeatable.
    #[arg(long = "file", required = true)]
    pub files: Vec<PathBuf>,

    /// Form field name for the files.
    #[arg(long, default_value = "file")]
    pub field: String,

    /// MIME type for the files.
    #[arg(long)]
    pub mime: Option<String>,

    /// Extra text field as key=value. Repeatable.
    #[arg(long = "form", short = 'F')]
    pub fields: Vec<String>,
}

/// Runs the upload command.
pub async fn run(args: &UploadArgs, cli: &Cli) -> Result<()> {
    let ctx = AppContext::load(cli)?;
    let form = build_form(args).await?;
    let client = ctx.api_client()?;

    info!(endpoint = %args.endpoint, files = args.files.len(), "Uploading");
    let envelope: Envelope<Value> = client
        .upload(&args.endpoint, &form)
        .await
        .with_context(|| format!("upload to {}", args.endpoint))?;

    output::print_envelope(&envelope, cli)
}

async fn build_form(args: &UploadArgs) -> Result<UploadForm> {
    let mut form = UploadForm::new();

    for raw in &args.fields {
        let (key, value) = parse_field(raw)?;
        form = form.text(key, value);
    }

    for path in &args.files {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let name = file_name(path);
        form = match &args.mime {
            Some(mime) => form.file_with_mime(&args.field, name, bytes, mime),
            None => form.file(&args.field, name, bytes),
        };
    }

    Ok(form)
}

/// Splits `key=value`.
fn parse_field(raw: &str) -> Result<(&str, &str)> {
    raw.split_once('=')
        .filter(|(key, _)| !key.is_empty())
        .with_context(|| format!("Form field must look like key=value, got {raw:?}"))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| "upload".to_string(), |n| n.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_field() {
        assert_eq!(parse_field("kind=invoice").unwrap(), ("kind", "invoice"));
        assert_eq!(parse_field("note=a=b").unwrap(), ("note", "a=b"));
        assert!(parse_field("=x").is_err());
        assert!(parse_field("kind").is_err());
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name(Path::new("/tmp/docs/facture.pdf")), "facture.pdf");
        assert_eq!(file_name(Path::new("/")), "upload");
    }

    #[tokio::test]
    async fn test_build_form_reads_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bilan.csv");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"year,revenue\n2023,120000\n")
            .unwrap();

        let args = UploadArgs {
            endpoint: "/documents/upload/".to_string(),
            files: vec![path],
            field: "document".to_string(),
            mime: Some("text/csv".to_string()),
            fields: vec!["kind=balance_sheet".to_string()],
        };

        let form = build_form(&args).await.unwrap();
        assert_eq!(form.files().len(), 1);
        assert_eq!(form.files()[0].file_name, "bilan.csv");
        assert_eq!(form.files()[0].mime.as_deref(), Some("text/csv"));
        assert_eq!(form.fields(), [("kind".to_string(), "balance_sheet".to_string())]);
    }

    #[tokio::test]
    async fn test_build_form_missing_file() {
        let args = UploadArgs {
            endpoint: "/documents/upload/".to_string(),
            files: vec![PathBuf::from("/definitely/not/here.pdf")],
            field: "file".to_string(),
            mime: None,
            fields: Vec::new(),
        };
        assert!(build_form(&args).await.is_err());
    }
}
