//! Upload/mint orchestration.
//!
//! One submission runs file pin → metadata pin → mint → clipboard, each
//! step blocking until the previous one finished. The first failure aborts
//! the run. Content pinned before a failure stays pinned.

use std::path::Path;

use reqwest::Url;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::api::{MetadataDocument, MintRequest, MintResponse, PinResponse, PinataMetadata};
use crate::form::SubmissionInput;

/// The three network calls of a run.
pub trait MintBackend {
    fn pin_file(&self, path: &Path, metadata: &PinataMetadata) -> anyhow::Result<PinResponse>;
    fn pin_json(&self, document: &MetadataDocument) -> anyhow::Result<PinResponse>;
    fn mint(&self, request: &MintRequest) -> anyhow::Result<MintResponse>;
}

/// Receives every status change of a run.
pub trait StatusIndicator {
    fn update(&mut self, status: &Status);
}

pub trait Clipboard {
    fn copy(&mut self, text: &str) -> anyhow::Result<()>;
}

/// Run state. Each run moves forward only:
/// Idle → Validating → UploadingFile → UploadingMetadata → Minting →
/// Success, or to Failed from Validating or any network-bound stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Validating,
    UploadingFile,
    UploadingMetadata,
    Minting,
    Success,
    Failed,
}

impl Stage {
    pub fn title(self) -> &'static str {
        match self {
            Stage::Idle => "Mint an NFT!",
            Stage::Validating => "Checking form...",
            Stage::UploadingFile => "Uploading File...",
            Stage::UploadingMetadata => "Uploading Metadata...",
            Stage::Minting => "Minting NFT...",
            Stage::Success => "NFT Minted!",
            Stage::Failed => "Failed to Mint NFT",
        }
    }

    pub fn can_advance_to(self, next: Stage) -> bool {
        use Stage::*;
        matches!(
            (self, next),
            (Idle, Validating)
                | (Validating, UploadingFile)
                | (Validating, Failed)
                | (UploadingFile, UploadingMetadata)
                | (UploadingFile, Failed)
                | (UploadingMetadata, Minting)
                | (UploadingMetadata, Failed)
                | (Minting, Success)
                | (Minting, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Success | Stage::Failed)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    pub stage: Stage,
    pub title: String,
    pub message: Option<String>,
}

impl Status {
    fn new(stage: Stage) -> Self {
        Status {
            stage,
            title: stage.title().to_string(),
            message: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum MintError {
    #[error("Please select a file!")]
    MissingFile,
    #[error("{source:#}")]
    Failed {
        stage: Stage,
        source: anyhow::Error,
    },
}

impl MintError {
    /// Stage the run was in when it failed.
    pub fn stage(&self) -> Stage {
        match self {
            MintError::MissingFile => Stage::Validating,
            MintError::Failed { stage, .. } => *stage,
        }
    }
}

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct MintOutcome {
    pub image_hash: String,
    pub metadata_hash: String,
    pub transaction_id: String,
    pub link: String,
}

pub struct Orchestrator<B> {
    backend: B,
    marketplace_url: Url,
}

impl<B: MintBackend> Orchestrator<B> {
    pub fn new(backend: B, marketplace_url: Url) -> Self {
        Orchestrator {
            backend,
            marketplace_url,
        }
    }

    /// Link copied to the clipboard after a successful mint.
    pub fn marketplace_link(&self, wallet: &str) -> String {
        format!(
            "{}/{}",
            self.marketplace_url.as_str().trim_end_matches('/'),
            wallet
        )
    }

    /// Run one submission to completion.
    pub fn run(
        &self,
        input: &SubmissionInput,
        status: &mut dyn StatusIndicator,
        clipboard: &mut dyn Clipboard,
    ) -> Result<MintOutcome, MintError> {
        let mut run = Run {
            stage: Stage::Idle,
            status,
        };
        run.advance(Status::new(Stage::Validating));

        let Some(file) = input.file.as_deref() else {
            warn!("submission without a file");
            run.advance(Status {
                stage: Stage::Failed,
                title: MintError::MissingFile.to_string(),
                message: None,
            });
            return Err(MintError::MissingFile);
        };

        match self.pin_and_mint(&mut run, file, input, clipboard) {
            Ok(outcome) => {
                run.advance(Status {
                    message: Some("Link copied to clipboard!".to_string()),
                    ..Status::new(Stage::Success)
                });
                Ok(outcome)
            }
            Err(err) => {
                error!(stage = ?err.stage(), "mint failed: {}", err);
                run.advance(Status {
                    message: Some(err.to_string()),
                    ..Status::new(Stage::Failed)
                });
                Err(err)
            }
        }
    }

    fn pin_and_mint(
        &self,
        run: &mut Run<'_>,
        file: &Path,
        input: &SubmissionInput,
        clipboard: &mut dyn Clipboard,
    ) -> Result<MintOutcome, MintError> {
        let stage = run.advance(Status::new(Stage::UploadingFile));
        let image = self
            .backend
            .pin_file(file, &PinataMetadata::for_nft(&input.name))
            .map_err(failed(stage))?;

        let stage = run.advance(Status::new(Stage::UploadingMetadata));
        let document = MetadataDocument::new(input, &image.ipfs_hash);
        let metadata = self
            .backend
            .pin_json(&document)
            .map_err(failed(stage))?;

        let stage = run.advance(Status::new(Stage::Minting));
        let request = MintRequest::new(&input.wallet, &metadata.ipfs_hash);
        let minted = self.backend.mint(&request).map_err(failed(stage))?;
        info!(tx_id = %minted.tx_id, "nft minted");

        let link = self.marketplace_link(&input.wallet);
        clipboard.copy(&link).map_err(failed(stage))?;
        debug!(%link, "link copied to clipboard");

        Ok(MintOutcome {
            image_hash: image.ipfs_hash,
            metadata_hash: metadata.ipfs_hash,
            transaction_id: minted.tx_id,
            link,
        })
    }
}

fn failed(stage: Stage) -> impl FnOnce(anyhow::Error) -> MintError {
    move |source| MintError::Failed { stage, source }
}

struct Run<'s> {
    stage: Stage,
    status: &'s mut dyn StatusIndicator,
}

impl Run<'_> {
    fn advance(&mut self, status: Status) -> Stage {
        debug_assert!(
            self.stage.can_advance_to(status.stage),
            "invalid transition {:?} -> {:?}",
            self.stage,
            status.stage
        );
        self.stage = status.stage;
        info!(stage = ?status.stage, "{}", status.title);
        self.status.update(&status);
        self.stage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct FakeBackend {
        calls: RefCell<Vec<&'static str>>,
        fail_on: Option<&'static str>,
        seen_metadata: RefCell<Option<PinataMetadata>>,
        seen_document: RefCell<Option<MetadataDocument>>,
        seen_mint: RefCell<Option<MintRequest>>,
    }

    impl FakeBackend {
        fn failing_on(call: &'static str) -> Self {
            FakeBackend {
                fail_on: Some(call),
                ..Default::default()
            }
        }

        fn record(&self, call: &'static str) -> anyhow::Result<()> {
            self.calls.borrow_mut().push(call);
            if self.fail_on == Some(call) {
                anyhow::bail!("{} failed: 500 Internal Server Error - boom", call);
            }
            Ok(())
        }
    }

    impl MintBackend for &FakeBackend {
        fn pin_file(&self, _path: &Path, metadata: &PinataMetadata) -> anyhow::Result<PinResponse> {
            self.record("pin_file")?;
            *self.seen_metadata.borrow_mut() = Some(metadata.clone());
            Ok(PinResponse {
                ipfs_hash: "Qm1".into(),
            })
        }

        fn pin_json(&self, document: &MetadataDocument) -> anyhow::Result<PinResponse> {
            self.record("pin_json")?;
            *self.seen_document.borrow_mut() = Some(document.clone());
            Ok(PinResponse {
                ipfs_hash: "Qm2".into(),
            })
        }

        fn mint(&self, request: &MintRequest) -> anyhow::Result<MintResponse> {
            self.record("mint")?;
            *self.seen_mint.borrow_mut() = Some(request.clone());
            Ok(MintResponse {
                tx_id: "tx123".into(),
            })
        }
    }

    #[derive(Default)]
    struct RecordingStatus(Vec<Status>);

    impl StatusIndicator for RecordingStatus {
        fn update(&mut self, status: &Status) {
            self.0.push(status.clone());
        }
    }

    impl RecordingStatus {
        fn stages(&self) -> Vec<Stage> {
            self.0.iter().map(|s| s.stage).collect()
        }

        fn last(&self) -> &Status {
            self.0.last().unwrap()
        }
    }

    #[derive(Default)]
    struct MemoryClipboard {
        text: Option<String>,
        broken: bool,
    }

    impl Clipboard for MemoryClipboard {
        fn copy(&mut self, text: &str) -> anyhow::Result<()> {
            if self.broken {
                anyhow::bail!("clipboard unavailable");
            }
            self.text = Some(text.to_string());
            Ok(())
        }
    }

    fn orchestrator(backend: &FakeBackend) -> Orchestrator<&FakeBackend> {
        Orchestrator::new(
            backend,
            Url::parse("https://testnets.opensea.io").unwrap(),
        )
    }

    fn input() -> SubmissionInput {
        SubmissionInput {
            file: Some("/tmp/art.png".into()),
            name: "Art1".into(),
            description: "desc".into(),
            external_url: "https://x.io".into(),
            wallet: "0xABC".into(),
        }
    }

    #[test]
    fn successful_run_calls_endpoints_in_order() {
        let backend = FakeBackend::default();
        let mut status = RecordingStatus::default();
        let mut clipboard = MemoryClipboard::default();

        let outcome = orchestrator(&backend)
            .run(&input(), &mut status, &mut clipboard)
            .unwrap();

        assert_eq!(*backend.calls.borrow(), vec!["pin_file", "pin_json", "mint"]);
        assert_eq!(
            outcome,
            MintOutcome {
                image_hash: "Qm1".into(),
                metadata_hash: "Qm2".into(),
                transaction_id: "tx123".into(),
                link: "https://testnets.opensea.io/0xABC".into(),
            }
        );
        assert_eq!(
            clipboard.text.as_deref(),
            Some("https://testnets.opensea.io/0xABC")
        );
        assert_eq!(
            status.stages(),
            vec![
                Stage::Validating,
                Stage::UploadingFile,
                Stage::UploadingMetadata,
                Stage::Minting,
                Stage::Success,
            ]
        );
        assert_eq!(status.last().title, "NFT Minted!");
        assert_eq!(status.last().message.as_deref(), Some("Link copied to clipboard!"));
    }

    #[test]
    fn requests_chain_previous_hashes() {
        let backend = FakeBackend::default();
        orchestrator(&backend)
            .run(&input(), &mut RecordingStatus::default(), &mut MemoryClipboard::default())
            .unwrap();

        assert_eq!(
            backend.seen_metadata.borrow().as_ref().unwrap().name,
            "NFT Art1"
        );
        let document = backend.seen_document.borrow().clone().unwrap();
        assert_eq!(document.image, "ipfs://Qm1");
        assert_eq!(document.external_url, "https://x.io");
        assert_eq!(
            backend.seen_mint.borrow().clone().unwrap(),
            MintRequest {
                chain: "MATIC".into(),
                to: "0xABC".into(),
                url: "ipfs://Qm2".into(),
            }
        );
    }

    #[test]
    fn missing_file_makes_no_calls() {
        let backend = FakeBackend::default();
        let mut status = RecordingStatus::default();
        let mut clipboard = MemoryClipboard::default();
        let submission = SubmissionInput {
            file: None,
            ..input()
        };

        let err = orchestrator(&backend)
            .run(&submission, &mut status, &mut clipboard)
            .unwrap_err();

        assert!(matches!(err, MintError::MissingFile));
        assert!(backend.calls.borrow().is_empty());
        assert!(clipboard.text.is_none());
        assert_eq!(status.stages(), vec![Stage::Validating, Stage::Failed]);
        assert_eq!(status.last().title, "Please select a file!");
    }

    #[test]
    fn file_pin_failure_stops_run() {
        let backend = FakeBackend::failing_on("pin_file");
        let mut status = RecordingStatus::default();
        let mut clipboard = MemoryClipboard::default();

        let err = orchestrator(&backend)
            .run(&input(), &mut status, &mut clipboard)
            .unwrap_err();

        assert_eq!(*backend.calls.borrow(), vec!["pin_file"]);
        assert_eq!(err.stage(), Stage::UploadingFile);
        assert!(clipboard.text.is_none());
        assert_eq!(status.last().stage, Stage::Failed);
        assert_eq!(status.last().title, "Failed to Mint NFT");
        assert_eq!(
            status.last().message.as_deref(),
            Some("pin_file failed: 500 Internal Server Error - boom")
        );
    }

    #[test]
    fn json_pin_failure_skips_mint() {
        let backend = FakeBackend::failing_on("pin_json");
        let mut status = RecordingStatus::default();

        let err = orchestrator(&backend)
            .run(&input(), &mut status, &mut MemoryClipboard::default())
            .unwrap_err();

        assert_eq!(*backend.calls.borrow(), vec!["pin_file", "pin_json"]);
        assert_eq!(err.stage(), Stage::UploadingMetadata);
        assert_eq!(
            status.stages(),
            vec![
                Stage::Validating,
                Stage::UploadingFile,
                Stage::UploadingMetadata,
                Stage::Failed,
            ]
        );
    }

    #[test]
    fn mint_failure_leaves_clipboard_untouched() {
        let backend = FakeBackend::failing_on("mint");
        let mut clipboard = MemoryClipboard::default();

        let err = orchestrator(&backend)
            .run(&input(), &mut RecordingStatus::default(), &mut clipboard)
            .unwrap_err();

        assert_eq!(err.stage(), Stage::Minting);
        assert!(clipboard.text.is_none());
    }

    #[test]
    fn clipboard_failure_fails_run() {
        let backend = FakeBackend::default();
        let mut status = RecordingStatus::default();
        let mut clipboard = MemoryClipboard {
            broken: true,
            ..Default::default()
        };

        let err = orchestrator(&backend)
            .run(&input(), &mut status, &mut clipboard)
            .unwrap_err();

        assert_eq!(err.to_string(), "clipboard unavailable");
        assert_eq!(status.last().stage, Stage::Failed);
    }

    #[test]
    fn error_display_includes_context_chain() {
        let source = anyhow::anyhow!("connection refused").context("Failed to send mint request");
        let err = MintError::Failed {
            stage: Stage::Minting,
            source,
        };
        assert_eq!(
            err.to_string(),
            "Failed to send mint request: connection refused"
        );
    }

    #[test]
    fn link_ignores_transaction_and_trailing_slash() {
        let backend = FakeBackend::default();
        let orchestrator = Orchestrator::new(
            &backend,
            Url::parse("https://testnets.opensea.io/").unwrap(),
        );
        assert_eq!(
            orchestrator.marketplace_link("0xABC"),
            "https://testnets.opensea.io/0xABC"
        );
    }

    #[test]
    fn stages_only_move_forward() {
        assert!(Stage::Idle.can_advance_to(Stage::Validating));
        assert!(Stage::Minting.can_advance_to(Stage::Success));
        assert!(Stage::UploadingFile.can_advance_to(Stage::Failed));
        assert!(!Stage::UploadingFile.can_advance_to(Stage::Success));
        assert!(!Stage::UploadingMetadata.can_advance_to(Stage::UploadingFile));
        assert!(!Stage::Success.can_advance_to(Stage::Failed));
        assert!(!Stage::Failed.can_advance_to(Stage::Idle));
        assert!(Stage::Failed.is_terminal());
        assert!(!Stage::Minting.is_terminal());
    }
}
