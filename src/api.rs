// API client module: a small blocking HTTP client that talks to the
// pinning service (Pinata) and the minting service (Tatum). Every call
// is synchronous; the orchestrator in `pipeline` chains them in order.

use anyhow::{Context, Result};
use reqwest::blocking::{multipart, Client, Response};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::config::Preferences;
use crate::form::SubmissionInput;
use crate::pipeline::MintBackend;

/// Chain every token is minted on.
pub const CHAIN: &str = "MATIC";

const PIN_FILE_PATH: &str = "pinning/pinFileToIPFS";
const PIN_JSON_PATH: &str = "pinning/pinJSONToIPFS";
const MINT_PATH: &str = "v3/nft/mint";
const API_KEY_HEADER: &str = "x-api-key";

/// Builds the `ipfs://` URI for a content hash.
pub fn ipfs_uri(hash: &str) -> String {
    format!("ipfs://{}", hash)
}

/// Tag attached to the pinned file, sent as the `pinataMetadata` part.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PinataMetadata {
    pub name: String,
}

impl PinataMetadata {
    /// The pinned file is labelled `NFT <name>`.
    pub fn for_nft(name: &str) -> Self {
        PinataMetadata {
            name: format!("NFT {}", name),
        }
    }
}

/// Token metadata document. `image` points at the pinned file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MetadataDocument {
    pub name: String,
    pub description: String,
    pub image: String,
    pub external_url: String,
}

impl MetadataDocument {
    pub fn new(input: &SubmissionInput, image_hash: &str) -> Self {
        MetadataDocument {
            name: input.name.clone(),
            description: input.description.clone(),
            image: ipfs_uri(image_hash),
            external_url: input.external_url.clone(),
        }
    }
}

#[derive(Serialize, Debug)]
struct PinJsonRequest<'a> {
    #[serde(rename = "pinataContent")]
    pinata_content: &'a MetadataDocument,
}

/// Response of both pinning endpoints. Pinata also returns the pin size
/// and a timestamp; only the hash is needed.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct PinResponse {
    #[serde(rename = "IpfsHash")]
    pub ipfs_hash: String,
}

/// Mint payload for the minting service.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MintRequest {
    pub chain: String,
    pub to: String,
    pub url: String,
}

impl MintRequest {
    pub fn new(wallet: &str, metadata_hash: &str) -> Self {
        MintRequest {
            chain: CHAIN.to_string(),
            to: wallet.to_string(),
            url: ipfs_uri(metadata_hash),
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct MintResponse {
    #[serde(rename = "txId")]
    pub tx_id: String,
}

/// Blocking client holding the reqwest client, both service base URLs and
/// their credentials.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    pinata_url: Url,
    tatum_url: Url,
    pinata_jwt: String,
    tatum_key: String,
}

impl ApiClient {
    /// Create an ApiClient from resolved preferences. Requests use the
    /// client's default timeout.
    pub fn new(prefs: &Preferences) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        Ok(ApiClient {
            client,
            pinata_url: prefs.pinata_api_url.clone(),
            tatum_url: prefs.tatum_api_url.clone(),
            pinata_jwt: prefs.pinata_jwt.clone(),
            tatum_key: prefs.tatum_key.clone(),
        })
    }

    /// Stream a file to the pinning service as multipart/form-data and
    /// return the content hash it was pinned under.
    pub fn pin_file(&self, path: &Path, metadata: &PinataMetadata) -> Result<PinResponse> {
        let url = endpoint(&self.pinata_url, PIN_FILE_PATH)?;

        // `Form::file` opens the file and streams it, taking the part's
        // filename and mime type from the path.
        let form = multipart::Form::new()
            .file("file", path)
            .with_context(|| format!("Failed to open file {}", path.display()))?
            .text(
                "pinataMetadata",
                serde_json::to_string(metadata).context("Serializing pinata metadata")?,
            );

        let res = self
            .client
            .post(url)
            .bearer_auth(&self.pinata_jwt)
            .multipart(form)
            .send()
            .context("Failed to send file upload request")?;
        let res = check_status("File upload", res)?;
        let pinned: PinResponse = res.json().context("Parsing file upload response json")?;
        debug!(hash = %pinned.ipfs_hash, "file pinned");
        Ok(pinned)
    }

    /// Pin the metadata document as JSON.
    pub fn pin_json(&self, document: &MetadataDocument) -> Result<PinResponse> {
        let url = endpoint(&self.pinata_url, PIN_JSON_PATH)?;
        let body = PinJsonRequest {
            pinata_content: document,
        };

        let res = self
            .client
            .post(url)
            .bearer_auth(&self.pinata_jwt)
            .json(&body)
            .send()
            .context("Failed to send metadata upload request")?;
        let res = check_status("Metadata upload", res)?;
        let pinned: PinResponse = res
            .json()
            .context("Parsing metadata upload response json")?;
        debug!(hash = %pinned.ipfs_hash, "metadata pinned");
        Ok(pinned)
    }

    /// Ask the minting service to mint a token for the metadata URI.
    pub fn mint(&self, request: &MintRequest) -> Result<MintResponse> {
        let url = endpoint(&self.tatum_url, MINT_PATH)?;

        let res = self
            .client
            .post(url)
            .header(API_KEY_HEADER, &self.tatum_key)
            .json(request)
            .send()
            .context("Failed to send mint request")?;
        let res = check_status("Mint", res)?;
        let minted: MintResponse = res.json().context("Parsing mint response json")?;
        debug!(tx_id = %minted.tx_id, "mint submitted");
        Ok(minted)
    }
}

impl MintBackend for ApiClient {
    fn pin_file(&self, path: &Path, metadata: &PinataMetadata) -> Result<PinResponse> {
        ApiClient::pin_file(self, path, metadata)
    }

    fn pin_json(&self, document: &MetadataDocument) -> Result<PinResponse> {
        ApiClient::pin_json(self, document)
    }

    fn mint(&self, request: &MintRequest) -> Result<MintResponse> {
        ApiClient::mint(self, request)
    }
}

fn endpoint(base: &Url, path: &str) -> Result<Url> {
    base.join(path)
        .with_context(|| format!("Invalid endpoint {} for {}", path, base))
}

/// Turn a non-2xx response into an error carrying the status and body.
fn check_status(what: &str, res: Response) -> Result<Response> {
    if !res.status().is_success() {
        let status = res.status();
        let txt = res.text().unwrap_or_default();
        anyhow::bail!("{} failed: {} - {}", what, status, txt);
    }
    Ok(res)
}
