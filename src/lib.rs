// Library root
// -----------
// This crate exposes the pieces behind the `nft-mint` binary, which
// pins a file and its metadata on IPFS and mints a token for it.
//
// Module responsibilities:
// - `config`: Resolves credentials and endpoints from flags, environment
//   and the preferences file.
// - `api`: Encapsulates HTTP interactions with the pinning and minting
//   services.
// - `form`: Submission fields, per-field validation and the loading flag.
// - `pipeline`: Runs one submission through upload, metadata upload,
//   mint and clipboard, reporting each stage.
// - `ui`: Implements the terminal form and delegates to `pipeline`.
pub mod api;
pub mod config;
pub mod form;
pub mod pipeline;
pub mod ui;

/// Initialize tracing for the binary. Logs go to stderr and default to
/// `warn` so they stay out of the way of the spinner; use `RUST_LOG` to
/// see stage transitions.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();
}
