//! Client for the asset-upload collaborator.
//!
//! Spot images reach the API either as already-hosted http(s) URLs or as
//! inline `data:` URIs. Hosted URLs pass through after validation; inline
//! payloads are uploaded to the configured asset host before the spot is
//! persisted. Any failure aborts the whole create; a spot is never stored
//! with partially-uploaded images.

use std::time::Duration;

use hiddenspots_common::HiddenSpotsError;

const MAX_IMAGE_URL_LEN: usize = 2048;

pub struct AssetClient {
    client: reqwest::Client,
    upload_url: Option<String>,
    api_key: Option<String>,
}

impl AssetClient {
    pub fn new(upload_url: Option<String>, api_key: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            upload_url: upload_url.map(|u| u.trim_end_matches('/').to_string()),
            api_key,
        }
    }

    /// Resolve every submitted image to a hosted URL, in order.
    pub async fn resolve_images(
        &self,
        images: &[String],
    ) -> Result<Vec<String>, HiddenSpotsError> {
        let mut resolved = Vec::with_capacity(images.len());
        for image in images {
            let image = image.trim();
            if image.starts_with("data:image/") {
                resolved.push(self.upload_data_uri(image).await?);
            } else {
                resolved.push(validate_image_url(image)?);
            }
        }
        Ok(resolved)
    }

    async fn upload_data_uri(&self, data: &str) -> Result<String, HiddenSpotsError> {
        let Some(upload_url) = &self.upload_url else {
            return Err(HiddenSpotsError::validation(
                "images",
                "inline image uploads are not configured; submit hosted URLs",
            ));
        };

        let mut req = self
            .client
            .post(format!("{upload_url}/upload"))
            .json(&serde_json::json!({ "data": data }));
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| HiddenSpotsError::Upstream(format!("asset upload failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(HiddenSpotsError::Upstream(format!(
                "asset host returned {status}"
            )));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| HiddenSpotsError::Upstream(format!("asset host response: {e}")))?;
        body.get("url")
            .and_then(|u| u.as_str())
            .map(String::from)
            .ok_or_else(|| {
                HiddenSpotsError::Upstream("asset host response missing url".to_string())
            })
    }
}

/// Validate an already-hosted image URL: parseable, http(s), length-capped.
fn validate_image_url(raw: &str) -> Result<String, HiddenSpotsError> {
    if raw.is_empty() {
        return Err(HiddenSpotsError::validation("images", "empty image URL"));
    }
    if raw.len() > MAX_IMAGE_URL_LEN {
        return Err(HiddenSpotsError::validation(
            "images",
            format!("image URL too long (max {MAX_IMAGE_URL_LEN} characters)"),
        ));
    }
    let parsed = url::Url::parse(raw)
        .map_err(|_| HiddenSpotsError::validation("images", format!("invalid image URL {raw:?}")))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(HiddenSpotsError::validation(
            "images",
            "image URLs must use http or https",
        ));
    }
    Ok(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hosted_url_passes_through() {
        let url = "https://assets.example.com/spots/1.jpg";
        assert_eq!(validate_image_url(url).unwrap(), url);
    }

    #[test]
    fn rejects_non_http_scheme() {
        assert!(validate_image_url("ftp://example.com/a.jpg").is_err());
        assert!(validate_image_url("javascript:alert(1)").is_err());
    }

    #[test]
    fn rejects_unparseable_url() {
        assert!(validate_image_url("not a url").is_err());
    }

    #[test]
    fn rejects_overlong_url() {
        let long = format!("https://example.com/{}", "a".repeat(MAX_IMAGE_URL_LEN));
        assert!(validate_image_url(&long).is_err());
    }

    #[tokio::test]
    async fn unconfigured_uploader_rejects_data_uris() {
        let client = AssetClient::new(None, None);
        let err = client
            .resolve_images(&["data:image/png;base64,AAAA".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            HiddenSpotsError::Validation { field: "images", .. }
        ));
    }

    #[tokio::test]
    async fn mixed_list_resolves_in_order() {
        let client = AssetClient::new(None, None);
        let images = vec![
            "https://assets.example.com/1.jpg".to_string(),
            "https://assets.example.com/2.jpg".to_string(),
        ];
        let resolved = client.resolve_images(&images).await.unwrap();
        assert_eq!(resolved, images);
    }
}
