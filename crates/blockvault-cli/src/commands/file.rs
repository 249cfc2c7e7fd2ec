//! File lifecycle CLI commands, run on behalf of one principal.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use blockvault_core::config::AppConfig;
use blockvault_core::error::AppError;
use blockvault_core::result::AppResult;
use blockvault_core::types::ContentAddress;
use blockvault_entity::file::{FileRecord, FileVersion};
use blockvault_entity::storage::format_bytes;
use blockvault_service::{FileLocator, UploadRequest};

use crate::output::{self, OutputFormat};

/// Environment variable read when `--key` is not given.
const KEY_ENV: &str = "BLOCKVAULT_KEY";

/// Arguments for file commands
#[derive(Debug, Args)]
pub struct FileArgs {
    /// Username of the principal to act as
    #[arg(short = 'u', long = "as", value_name = "USERNAME")]
    pub principal: String,

    /// File subcommand
    #[command(subcommand)]
    pub command: FileCommand,
}

/// File subcommands
#[derive(Debug, Subcommand)]
pub enum FileCommand {
    /// Upload a local file as a new file or as a new version of one
    Upload {
        /// Local path to read
        path: PathBuf,
        /// Display name (defaults to the local file name)
        #[arg(short, long)]
        name: Option<String>,
        /// Content type to record
        #[arg(long)]
        content_type: Option<String>,
        /// Encrypt before storing
        #[arg(long)]
        encrypt: bool,
        /// Base64 key to encrypt with; a key is generated when omitted
        #[arg(long, env = KEY_ENV, hide_env_values = true)]
        key: Option<String>,
        /// Read the key from the terminal without echoing it
        #[arg(long)]
        prompt_key: bool,
        /// Append as a new version of this file id
        #[arg(long, value_name = "FILE_ID")]
        version_of: Option<String>,
        /// Version description
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Download a file by id or content address
    Download {
        /// File id or content address
        target: String,
        /// Where to write (defaults to the stored name in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Historic version number (requires a file id)
        #[arg(long)]
        version: Option<i32>,
        /// Base64 key for encrypted files
        #[arg(long, env = KEY_ENV, hide_env_values = true)]
        key: Option<String>,
        /// Read the key from the terminal without echoing it
        #[arg(long)]
        prompt_key: bool,
        /// Overwrite an existing output file
        #[arg(long)]
        force: bool,
    },
    /// Delete a file and all its versions
    Delete {
        /// File id
        file_id: String,
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
    /// Print the public retrieval URL of a file
    Share {
        /// File id
        file_id: String,
    },
    /// List files, newest first
    List {
        /// Only the most recent few
        #[arg(long)]
        recent: bool,
    },
    /// Show one file record
    Show {
        /// File id
        file_id: String,
    },
    /// List the versions of a file, newest first
    Versions {
        /// File id
        file_id: String,
    },
    /// Record an external attestation reference on a file
    Attest {
        /// File id
        file_id: String,
        /// Attestation reference, e.g. a transaction hash
        reference: String,
    },
}

/// File display row for table output
#[derive(Debug, Serialize, Tabled)]
struct FileRow {
    /// File ID
    id: String,
    /// Name
    filename: String,
    /// Type
    #[tabled(rename = "type")]
    #[serde(rename = "type")]
    file_type: String,
    /// Size
    size: String,
    /// Version
    version: i32,
    /// Encrypted
    encrypted: String,
    /// Pinned
    pinned: String,
    /// Uploaded at
    uploaded_at: String,
}

impl From<&FileRecord> for FileRow {
    fn from(f: &FileRecord) -> Self {
        Self {
            id: f.id.to_string(),
            filename: f.filename.clone(),
            file_type: f.file_type.to_string(),
            size: format_bytes(f.size_bytes),
            version: f.current_version,
            encrypted: output::yes_no(f.encrypted),
            pinned: output::yes_no(f.pinned),
            uploaded_at: f.uploaded_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Version display row for table output
#[derive(Debug, Serialize, Tabled)]
struct VersionRow {
    /// Version
    version: i32,
    /// Content address
    cid: String,
    /// Size
    size: String,
    /// Encrypted
    encrypted: String,
    /// Description
    description: String,
    /// Created at
    created_at: String,
}

impl From<&FileVersion> for VersionRow {
    fn from(v: &FileVersion) -> Self {
        Self {
            version: v.version_number,
            cid: v.cid.short(),
            size: format_bytes(v.size_bytes),
            encrypted: output::yes_no(v.encrypted),
            description: v.description.clone().unwrap_or_default(),
            created_at: v.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// JSON shape of a finished upload.
#[derive(Debug, Serialize)]
struct UploadReport<'a> {
    file: &'a FileRecord,
    version: i32,
    /// Only present when the key was generated for this upload.
    #[serde(skip_serializing_if = "Option::is_none")]
    generated_key: Option<String>,
}

/// Execute file commands
pub async fn execute(args: &FileArgs, config: &AppConfig, format: OutputFormat) -> AppResult<()> {
    let lifecycle = super::build_lifecycle(config).await?;
    let ctx = super::act_as(&lifecycle, &args.principal).await?;

    match &args.command {
        FileCommand::Upload {
            path,
            name,
            content_type,
            encrypt,
            key,
            prompt_key,
            version_of,
            description,
        } => {
            let key = resolve_key(key.as_deref(), *prompt_key)?;
            let data = tokio::fs::read(path).await.map_err(|e| {
                AppError::validation(format!("Cannot read '{}': {}", path.display(), e))
            })?;
            let filename = match name {
                Some(name) => name.clone(),
                None => local_name(path)?,
            };

            let mut request = UploadRequest::new(filename, Bytes::from(data));
            if let Some(content_type) = content_type {
                request = request.content_type(content_type.clone());
            }
            if *encrypt {
                request = request.encrypted(key);
            } else if key.is_some() {
                return Err(AppError::validation(format!(
                    "A key was supplied (--key, --prompt-key or {KEY_ENV}) but --encrypt was not"
                )));
            }
            if let Some(target) = version_of {
                request = request.new_version_of(super::parse_file_id(target)?, description.clone());
            } else if description.is_some() {
                output::print_warning("--description only applies with --version-of; ignored");
            }

            let outcome = lifecycle.upload(&ctx, request).await?;
            let generated_key = outcome.generated_key.as_ref().map(|k| k.to_base64());

            match format {
                OutputFormat::Json => output::print_json(
                    &UploadReport {
                        file: &outcome.record,
                        version: outcome.version.version_number,
                        generated_key,
                    },
                    "{}",
                ),
                OutputFormat::Table => {
                    output::print_success(&format!(
                        "Stored '{}' as version {} ({})",
                        outcome.record.filename,
                        outcome.version.version_number,
                        format_bytes(outcome.version.size_bytes)
                    ));
                    output::print_kv("File ID", &outcome.record.id.to_string());
                    output::print_kv("Content address", outcome.record.cid.as_str());
                    output::print_kv("Encrypted", &output::yes_no(outcome.record.encrypted));
                    output::print_kv("Pinned", &output::yes_no(outcome.record.pinned));
                    if let Some(key) = generated_key {
                        output::print_kv("Key", &key);
                        output::print_warning(
                            "Save this key now. It is not stored and cannot be recovered.",
                        );
                    }
                    if !outcome.record.pinned {
                        output::print_warning("Content could not be pinned; it may be collected.");
                    }
                }
            }
        }
        FileCommand::Download {
            target,
            output: destination,
            version,
            key,
            prompt_key,
            force,
        } => {
            let key = resolve_key(key.as_deref(), *prompt_key)?;
            let file = match version {
                Some(number) => {
                    let file_id = super::parse_file_id(target)?;
                    lifecycle
                        .download_version(&ctx, file_id, *number, key.as_deref())
                        .await?
                }
                None => {
                    lifecycle
                        .download(&ctx, parse_locator(target)?, key.as_deref())
                        .await?
                }
            };

            let path = match destination {
                Some(path) => path.clone(),
                None => PathBuf::from(safe_name(&file.filename)),
            };
            if !force && tokio::fs::try_exists(&path).await.unwrap_or(false) {
                return Err(AppError::validation(format!(
                    "'{}' already exists; pass --force to overwrite",
                    path.display()
                )));
            }
            tokio::fs::write(&path, &file.data).await.map_err(|e| {
                AppError::internal(format!("Cannot write '{}': {}", path.display(), e))
            })?;

            output::print_success(&format!(
                "Wrote version {} of '{}' to {} ({}, {})",
                file.version_number,
                file.filename,
                path.display(),
                format_bytes(file.data.len() as i64),
                file.content_type
            ));
        }
        FileCommand::Delete { file_id, force } => {
            let file_id = super::parse_file_id(file_id)?;
            let record = lifecycle.get_file(&ctx, file_id).await?;

            if !force {
                let confirm = dialoguer::Confirm::new()
                    .with_prompt(format!(
                        "Delete '{}' and all {} version(s)?",
                        record.filename, record.current_version
                    ))
                    .default(false)
                    .interact()
                    .map_err(|e| AppError::internal(format!("Input error: {}", e)))?;

                if !confirm {
                    println!("Cancelled.");
                    return Ok(());
                }
            }

            let released = lifecycle.delete(&ctx, file_id).await?;
            output::print_success(&format!(
                "Deleted '{}', released {}",
                record.filename,
                format_bytes(released)
            ));
        }
        FileCommand::Share { file_id } => {
            let url = lifecycle
                .share_link(&ctx, super::parse_file_id(file_id)?)
                .await?;
            match format {
                OutputFormat::Json => output::print_json(&serde_json::json!({ "url": url }), "{}"),
                OutputFormat::Table => println!("{}", url),
            }
        }
        FileCommand::List { recent } => {
            let files = if *recent {
                lifecycle.recent_files(&ctx).await?
            } else {
                lifecycle.list_files(&ctx).await?
            };
            let rows: Vec<FileRow> = files.iter().map(FileRow::from).collect();
            output::print_list(&rows, format);
        }
        FileCommand::Show { file_id } => {
            let record = lifecycle
                .get_file(&ctx, super::parse_file_id(file_id)?)
                .await?;
            print_record(&record, format);
        }
        FileCommand::Versions { file_id } => {
            let versions = lifecycle
                .list_versions(&ctx, super::parse_file_id(file_id)?)
                .await?;
            let rows: Vec<VersionRow> = versions.iter().map(VersionRow::from).collect();
            output::print_list(&rows, format);
        }
        FileCommand::Attest { file_id, reference } => {
            let record = lifecycle
                .attach_attestation(&ctx, super::parse_file_id(file_id)?, reference)
                .await?;
            output::print_success(&format!("Attestation recorded on '{}'", record.filename));
        }
    }

    Ok(())
}

fn print_record(record: &FileRecord, format: OutputFormat) {
    match format {
        OutputFormat::Json => output::print_json(record, "{}"),
        OutputFormat::Table => {
            println!("File '{}':", record.filename);
            output::print_kv("ID", &record.id.to_string());
            output::print_kv("Content address", record.cid.as_str());
            output::print_kv("Type", record.file_type.as_str());
            output::print_kv(
                "Content type",
                record.content_type.as_deref().unwrap_or("-"),
            );
            output::print_kv("Size", &format_bytes(record.size_bytes));
            output::print_kv("Version", &record.current_version.to_string());
            output::print_kv("Encrypted", &output::yes_no(record.encrypted));
            if let Some(fingerprint) = &record.key_fingerprint {
                output::print_kv("Key fingerprint", fingerprint);
            }
            output::print_kv("Pinned", &output::yes_no(record.pinned));
            output::print_kv("Replicas", &record.replication_count.to_string());
            output::print_kv("Uploaded", &record.uploaded_at.to_rfc3339());
            if let Some(attestation) = &record.attestation_ref {
                output::print_kv("Attestation", attestation);
            }
        }
    }
}

/// The key to use: typed at a hidden prompt when asked for, otherwise the
/// `--key` value or `BLOCKVAULT_KEY`.
fn resolve_key(given: Option<&str>, prompt: bool) -> AppResult<Option<String>> {
    if !prompt {
        return Ok(given.map(str::to_string));
    }
    let key = dialoguer::Password::new()
        .with_prompt("Encryption key (base64)")
        .interact()
        .map_err(|e| AppError::internal(format!("Input error: {}", e)))?;
    Ok(Some(key.trim().to_string()))
}

/// A file id if the argument parses as one, otherwise a content address.
fn parse_locator(target: &str) -> AppResult<FileLocator> {
    match super::parse_file_id(target) {
        Ok(id) => Ok(FileLocator::Id(id)),
        Err(_) => ContentAddress::parse(target)
            .map(FileLocator::Cid)
            .map_err(|e| {
                AppError::validation(format!(
                    "'{}' is neither a file id nor a content address: {}",
                    target, e.message
                ))
            }),
    }
}

fn local_name(path: &Path) -> AppResult<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            AppError::validation(format!(
                "Cannot derive a file name from '{}'; pass --name",
                path.display()
            ))
        })
}

/// The last path component of a stored display name, so a download never
/// writes outside the current directory.
fn safe_name(filename: &str) -> String {
    Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("download.bin")
        .to_string()
}
