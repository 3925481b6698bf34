use bytes::Bytes;
use futures::stream::BoxStream;
use futures::TryStreamExt;
use hex::FromHex;
use hyper::{Body, Client, HeaderMap, Request, StatusCode, Uri};
use hyper::body::to_bytes;
use hyper::client::HttpConnector;
use hyper::header::USER_AGENT;
use hyper_tls::HttpsConnector;
use tokio::fs::{try_exists, File};
use tokio_util::io::ReaderStream;
use tracing::trace;

use crate::util::checksum::{ChecksumValidator, Md5Validator, Sha1Validator};

/// A response body together with the hashes the server announced for it
pub struct Download {
    pub body: BoxStream<'static, anyhow::Result<Bytes>>,
    pub announced_md5: Option<[u8;16]>,
    pub announced_sha1: Option<[u8;20]>,
}
impl Download {
    /// empty if the server did not announce any hashes
    pub fn announced_validators(&self) -> Vec<Box<dyn ChecksumValidator>> {
        let mut result: Vec<Box<dyn ChecksumValidator>> = vec![];
        if let Some(sha1) = self.announced_sha1 {
            result.push(Box::new(Sha1Validator::new(sha1)));
        }
        if let Some(md5) = self.announced_md5 {
            result.push(Box::new(Md5Validator::new(md5)));
        }
        result
    }
}

/// Downloads files from absolute `http(s)://` or `file://` URLs, picking up the expected hashcodes
///  if the server sends them in a header.
///
/// Instances do HTTP connection caching internally, so keeping them alive has performance benefits.
pub struct ValidatingHttpDownloader {
    client: Client<HttpsConnector<HttpConnector>>,
    user_agent: String,
}
impl ValidatingHttpDownloader {
    pub fn new(user_agent: impl Into<String>) -> ValidatingHttpDownloader {
        ValidatingHttpDownloader {
            client: Client::builder()
                .build::<_, Body>(HttpsConnector::new()),
            user_agent: user_agent.into(),
        }
    }

    fn request(&self, url: &str) -> anyhow::Result<Request<Body>> {
        Ok(Request::builder()
            .method("GET")
            .uri(Uri::try_from(url)?)
            // Maven Central returns a 403 without a user agent
            .header(USER_AGENT, &self.user_agent)
            .body(Body::empty())?)
    }

    /// `None` if the remote side does not have the file
    pub async fn get(&self, url: &str) -> anyhow::Result<Option<Download>> {
        if let Some(path) = url.strip_prefix("file://") {
            return Self::get_file(path).await;
        }

        let request = self.request(url)?;
        trace!("getting {:?}", request);

        let response = self.client.request(request)
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(anyhow::anyhow!("upstream request for {} failed: {}", url, response.status()));
        }

        let (announced_sha1, announced_md5) = announced_hashes(response.headers());
        Ok(Some(Download {
            body: Box::pin(response.into_body().map_err(anyhow::Error::from)),
            announced_md5,
            announced_sha1,
        }))
    }

    /// Small text files like `.sha1` checksum files or `maven-metadata.xml`
    pub async fn get_text(&self, url: &str) -> anyhow::Result<Option<String>> {
        if let Some(path) = url.strip_prefix("file://") {
            if !try_exists(path).await? {
                return Ok(None);
            }
            return Ok(Some(tokio::fs::read_to_string(path).await?));
        }

        let response = self.client.request(self.request(url)?)
            .await?;
        if !response.status().is_success() {
            trace!("no text file at {}: {}", url, response.status());
            return Ok(None);
        }

        let bytes = to_bytes(response.into_body())
            .await?;
        Ok(Some(String::from_utf8(bytes.into())?))
    }

    async fn get_file(path: &str) -> anyhow::Result<Option<Download>> {
        trace!("reading local file {}", path);
        if !try_exists(path).await? {
            return Ok(None);
        }

        let file = File::open(path).await?;
        Ok(Some(Download {
            body: Box::pin(ReaderStream::new(file).map_err(anyhow::Error::from)),
            announced_md5: None,
            announced_sha1: None,
        }))
    }
}

fn announced_hashes(headers: &HeaderMap) -> (Option<[u8;20]>, Option<[u8;16]>) {
    let sha1_string = headers.get("x-checksum-sha1")
        .or_else(|| headers.get("x-goog-meta-checksum-sha1"))
        .or_else(|| headers.get("etag"))
        .map(|h| h.to_str().unwrap_or(""))
        // a quoted etag is only a SHA1 hash if it has the right length
        .map(|s| if s.len() == 42 { &s[1..41] } else { s });

    let md5_string = headers.get("x-checksum-md5")
        .or_else(|| headers.get("x-goog-meta-checksum-md5"))
        .map(|h| h.to_str().unwrap_or(""));

    // headers that don't parse as a hash (e.g. arbitrary etags) are no checksum information
    (
        sha1_string.and_then(|s| <[u8;20]>::from_hex(s).ok()),
        md5_string.and_then(|s| <[u8;16]>::from_hex(s).ok()),
    )
}
