use crate::types::StorageContext;
use reqwest::{
    multipart::{Form, Part},
    Response, StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};
use ulid::Ulid;

#[derive(Debug, Clone, Copy)]
pub enum Error {
    UploadFailed,
    DeleteFailed,
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct UploadedMedia {
    pub public_id: String,
    pub url: String,
    /// Upload time. Signed requests carry their own timestamp.
    pub timestamp: i64,
}

/// Cloudinary signature: the parameters, already in alphabetical order,
/// joined as a query string with the api secret appended, hashed with sha256.
fn sign(params: &[(&str, String)], api_secret: &str) -> String {
    let data_to_sign = params
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(format!("{}{}", data_to_sign, api_secret));
    base16ct::lower::encode_string(&hasher.finalize())
}

async fn read_ok_body(res: Response, err: Error) -> Result<String, Error> {
    let status = res.status();
    let data = res.text().await.map_err(|e| {
        tracing::error!("Error occurred while processing return data: {:?}", e);
        err
    })?;

    if status != StatusCode::OK {
        tracing::error!("Storage request failed with status {}: {}", status, data);
        return Err(err);
    }

    Ok(data)
}

pub async fn upload_file(cfg: &StorageContext, contents: Vec<u8>) -> Result<UploadedMedia, Error> {
    let file_name = Ulid::new().to_string();
    let part = Part::bytes(contents).file_name(file_name);

    let timestamp = chrono::Utc::now().timestamp();
    let signature = sign(
        &[
            ("timestamp", timestamp.to_string()),
            ("upload_preset", cfg.upload_preset.clone()),
        ],
        &cfg.api_secret,
    );

    let form = Form::new()
        .text("upload_preset", cfg.upload_preset.clone())
        .text("api_key", cfg.api_key.clone())
        .text("timestamp", timestamp.to_string())
        .text("signature", signature)
        .text("signature_algorithm", "sha256")
        .part("file", part);

    let res = cfg
        .client
        .post(&cfg.upload_endpoint)
        .multipart(form)
        .send()
        .await
        .map_err(|err| {
            tracing::error!("Error occurred while trying to upload a file: {:?}", err);
            Error::UploadFailed
        })?;

    let data = read_ok_body(res, Error::UploadFailed).await?;

    serde_json::from_str::<UploadResponse>(&data)
        .map(|res| UploadedMedia {
            url: res.secure_url,
            public_id: res.public_id,
            timestamp,
        })
        .map_err(|err| {
            tracing::error!("Failed to deserialize cloudinary response: {:?}", err);
            Error::UploadFailed
        })
}

pub async fn delete_file(cfg: &StorageContext, media: &UploadedMedia) -> Result<(), Error> {
    let timestamp = chrono::Utc::now().timestamp();
    let signature = sign(
        &[
            ("public_id", media.public_id.clone()),
            ("timestamp", timestamp.to_string()),
        ],
        &cfg.api_secret,
    );

    let res = cfg
        .client
        .post(&cfg.delete_endpoint)
        .json(&json!({
            "public_id": media.public_id,
            "api_key": cfg.api_key,
            "signature": signature,
            "timestamp": timestamp,
        }))
        .send()
        .await
        .map_err(|err| {
            tracing::error!("Failed to delete file {}: {:?}", media.url, err);
            Error::DeleteFailed
        })?;

    let data = read_ok_body(res, Error::DeleteFailed).await?;
    tracing::debug!("Delete file response: {}", data);

    Ok(())
}
