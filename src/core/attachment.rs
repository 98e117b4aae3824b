use crate::core::client::{Body, Client, QueryParams};
use crate::core::table::{self, paginate, record_from, DEFAULT_BATCH_SIZE};
use crate::domain::model::Record;
use crate::utils::error::Result;
use crate::utils::validation::validate_path;
use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

const ATTACHMENT_PATH: &str = "api/now/attachment";
const ATTACHMENT_FILE_PATH: &str = "api/now/attachment/file";

/// One entry of the `attachments` module parameter.
#[derive(Debug, Clone, Deserialize)]
pub struct AttachmentParam {
    pub path: String,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub content_type: Option<String>,
}

/// A local file to attach, read once so hashing and upload see the same bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentMetadata {
    pub path: PathBuf,
    pub content_type: String,
    pub hash: String,
    pub content: Vec<u8>,
}

/// Local attachments keyed by the file name they get on the instance.
pub type AttachmentSet = BTreeMap<String, AttachmentMetadata>;

pub fn sha256_hex(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

pub fn guess_content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("txt") | Some("log") | Some("conf") | Some("cfg") | Some("ini") => "text/plain",
        Some("csv") => "text/csv",
        Some("html") | Some("htm") => "text/html",
        Some("json") => "application/json",
        Some("xml") => "application/xml",
        Some("yml") | Some("yaml") => "application/x-yaml",
        Some("pdf") => "application/pdf",
        Some("zip") => "application/zip",
        Some("gz") | Some("tgz") => "application/gzip",
        Some("tar") => "application/x-tar",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("doc") => "application/msword",
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        Some("xls") => "application/vnd.ms-excel",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => "text/plain",
    }
}

pub async fn transform_metadata_list(params: &[AttachmentParam]) -> Result<AttachmentSet> {
    let mut set = AttachmentSet::new();
    for param in params {
        validate_path("attachments.path", &param.path)?;
        let path = PathBuf::from(&param.path);
        let name = match &param.name {
            Some(name) => name.clone(),
            None => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| param.path.clone()),
        };
        let content_type = param
            .content_type
            .clone()
            .unwrap_or_else(|| guess_content_type(&path).to_string());
        let content = tokio::fs::read(&path).await?;

        set.insert(
            name,
            AttachmentMetadata {
                path,
                content_type,
                hash: sha256_hex(&content),
                content,
            },
        );
    }
    Ok(set)
}

fn field<'a>(record: &'a Record, name: &str) -> Option<&'a str> {
    record.get(name).and_then(Value::as_str)
}

/// True when any local attachment is new or differs from its remote namesake.
pub fn are_changed(records: &[Record], metadata: &AttachmentSet) -> bool {
    let remote: HashMap<&str, Option<&str>> = records
        .iter()
        .filter_map(|r| field(r, "file_name").map(|name| (name, field(r, "hash"))))
        .collect();

    metadata.iter().any(|(name, meta)| match remote.get(name.as_str()) {
        Some(remote_hash) => *remote_hash != Some(meta.hash.as_str()),
        None => true,
    })
}

#[derive(Debug, Clone)]
pub struct AttachmentClient {
    client: Client,
    batch_size: usize,
}

impl AttachmentClient {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub async fn list_records(&self, table_name: &str, table_sys_id: &str) -> Result<Vec<Record>> {
        let query = table::query_of([("table_name", table_name), ("table_sys_id", table_sys_id)]);
        paginate(&self.client, ATTACHMENT_PATH, &query, self.batch_size).await
    }

    pub async fn create_record(
        &self,
        query: QueryParams,
        content: Vec<u8>,
        content_type: &str,
        check_mode: bool,
    ) -> Result<Record> {
        if check_mode {
            return Ok(query
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect());
        }

        let response = self
            .client
            .post(
                ATTACHMENT_FILE_PATH,
                Body::Raw {
                    content,
                    content_type: content_type.to_string(),
                },
                Some(&query),
            )
            .await?;
        record_from(&response)
    }

    pub async fn upload_record(
        &self,
        table_name: &str,
        table_sys_id: &str,
        name: &str,
        metadata: &AttachmentMetadata,
        check_mode: bool,
    ) -> Result<Record> {
        let query = table::query_of([
            ("table_name", table_name),
            ("table_sys_id", table_sys_id),
            ("file_name", name),
            ("hash", metadata.hash.as_str()),
        ]);
        tracing::info!("Uploading attachment {} to {} {}", name, table_name, table_sys_id);
        self.create_record(query, metadata.content.clone(), &metadata.content_type, check_mode)
            .await
    }

    pub async fn upload_records(
        &self,
        table_name: &str,
        table_sys_id: &str,
        metadata: &AttachmentSet,
        check_mode: bool,
    ) -> Result<Vec<Record>> {
        let mut uploaded = Vec::with_capacity(metadata.len());
        for (name, meta) in metadata {
            uploaded.push(
                self.upload_record(table_name, table_sys_id, name, meta, check_mode)
                    .await?,
            );
        }
        Ok(uploaded)
    }

    /// Replaces changed attachments, uploads new ones and keeps the rest.
    pub async fn update_records(
        &self,
        table_name: &str,
        table_sys_id: &str,
        metadata: &AttachmentSet,
        records: &[Record],
        check_mode: bool,
    ) -> Result<Vec<Record>> {
        let mut result = Vec::with_capacity(records.len() + metadata.len());
        let mut seen = Vec::new();

        for record in records {
            let name = field(record, "file_name").unwrap_or_default();
            match metadata.get(name) {
                Some(meta) if field(record, "hash") != Some(meta.hash.as_str()) => {
                    self.delete_record(record, check_mode).await?;
                    result.push(
                        self.upload_record(table_name, table_sys_id, name, meta, check_mode)
                            .await?,
                    );
                }
                _ => result.push(record.clone()),
            }
            seen.push(name.to_string());
        }

        for (name, meta) in metadata {
            if !seen.contains(name) {
                result.push(
                    self.upload_record(table_name, table_sys_id, name, meta, check_mode)
                        .await?,
                );
            }
        }

        Ok(result)
    }

    pub async fn delete_attached_records(
        &self,
        table_name: &str,
        table_sys_id: &str,
        check_mode: bool,
    ) -> Result<()> {
        for record in self.list_records(table_name, table_sys_id).await? {
            self.delete_record(&record, check_mode).await?;
        }
        Ok(())
    }

    pub async fn delete_record(&self, record: &Record, check_mode: bool) -> Result<()> {
        if check_mode {
            return Ok(());
        }
        let id = table::sys_id(record)?;
        self.client
            .delete(&format!("{}/{}", ATTACHMENT_PATH, id), None)
            .await?;
        tracing::info!("Deleted attachment {}", id);
        Ok(())
    }
}
