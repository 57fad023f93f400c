use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Response, Url};

use crate::conf::RemoteConfig;
use crate::core::SyncError;
use crate::query::QueryState;
use crate::store::{Fields, PageResult, Record, RecordId};

use super::Remote;
use super::wire::{decode_ack, decode_page, decode_record, list_params};

/// [`Remote`] speaking JSON over HTTP with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: Client,
    base_url: Url,
}

impl HttpRemote {
    pub fn new(config: &RemoteConfig) -> Result<Self, SyncError> {
        let mut base = config.base_url.trim_end_matches('/').to_string();
        base.push('/');
        let base_url = Url::parse(&base)
            .map_err(|e| SyncError::Config(format!("invalid base_url '{}': {e}", config.base_url)))?;
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SyncError::Network(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn collection_url(&self, resource: &str) -> Result<Url, SyncError> {
        self.base_url
            .join(resource.trim_matches('/'))
            .map_err(|e| SyncError::Config(format!("invalid resource path '{resource}': {e}")))
    }

    fn record_url(&self, resource: &str, id: RecordId) -> Result<Url, SyncError> {
        let mut url = self.collection_url(resource)?;
        url.path_segments_mut()
            .map_err(|_| SyncError::Config(format!("cannot append id to '{resource}'")))?
            .push(&id.to_string());
        Ok(url)
    }
}

async fn read_body(response: Response) -> Result<(u16, Vec<u8>), SyncError> {
    let status = response.status().as_u16();
    let body = response.bytes().await?;
    Ok((status, body.to_vec()))
}

#[async_trait]
impl Remote for HttpRemote {
    async fn list(&self, resource: &str, query: &QueryState) -> Result<PageResult, SyncError> {
        let mut url = self.collection_url(resource)?;
        url.query_pairs_mut().extend_pairs(list_params(query));
        debug!("GET {}", url);

        let response = self.client.get(url).send().await?;
        let (status, body) = read_body(response).await?;
        decode_page(status, &body, query)
    }

    async fn create(&self, resource: &str, fields: &Fields) -> Result<Record, SyncError> {
        let url = self.collection_url(resource)?;
        debug!("POST {}", url);

        let response = self.client.post(url).json(fields).send().await?;
        let (status, body) = read_body(response).await?;
        decode_record(status, &body)
    }

    async fn update(
        &self,
        resource: &str,
        id: RecordId,
        fields: &Fields,
    ) -> Result<Record, SyncError> {
        let url = self.record_url(resource, id)?;
        debug!("PUT {}", url);

        let response = self.client.put(url).json(fields).send().await?;
        let (status, body) = read_body(response).await?;
        decode_record(status, &body)
    }

    async fn delete(&self, resource: &str, id: RecordId) -> Result<(), SyncError> {
        let url = self.record_url(resource, id)?;
        debug!("DELETE {}", url);

        let response = self.client.delete(url).send().await?;
        let (status, body) = read_body(response).await?;
        decode_ack(status, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn remote(base_url: &str) -> HttpRemote {
        HttpRemote::new(&RemoteConfig {
            base_url: base_url.to_string(),
            timeout: Duration::from_secs(1),
        })
        .unwrap()
    }

    #[test]
    fn test_urls() {
        let remote = remote("http://localhost:5000/api");
        assert_eq!(
            remote.collection_url("clients").unwrap().as_str(),
            "http://localhost:5000/api/clients"
        );
        assert_eq!(
            remote.record_url("/team-members/", 7).unwrap().as_str(),
            "http://localhost:5000/api/team-members/7"
        );
    }

    #[test]
    fn test_trailing_slash_base() {
        let remote = remote("http://localhost:5000/api/");
        assert_eq!(remote.base_url().as_str(), "http://localhost:5000/api/");
        assert_eq!(
            remote.collection_url("faqs").unwrap().as_str(),
            "http://localhost:5000/api/faqs"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let err = HttpRemote::new(&RemoteConfig {
            base_url: "not a url".into(),
            timeout: Duration::from_secs(1),
        })
        .unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }
}
