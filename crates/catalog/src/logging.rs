//! Tracing subscriber setup for the catalog binary

use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// Default directives, quiet on the HTTP and ONNX stacks
fn default_directives(verbose: bool) -> &'static str {
  if verbose {
    "info,hyper=warn,reqwest=warn,ort=warn,tower_http=info"
  } else {
    "catalog=info,hyper=warn,reqwest=warn,ort=error,warn"
  }
}

/// Build the filter, letting `RUST_LOG` win over the defaults
pub fn build_filter(verbose: bool) -> EnvFilter {
  EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)))
}

/// Install the global subscriber. Safe to call more than once.
pub fn init(verbose: bool) {
  let _ = tracing_subscriber::registry()
    .with(fmt::layer().with_writer(std::io::stderr))
    .with(build_filter(verbose))
    .try_init();
}
