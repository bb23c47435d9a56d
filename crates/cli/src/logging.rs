//! Tracing setup.
//!
//! Application logs go to stdout without targets. The prompt log
//! (`quotarelay::prompts`) goes to stderr with its target, so it can be
//! split off from chat output and from the rest of the log.

use quotarelay_relay::PROMPT_LOG_TARGET;
use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

pub fn init(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    subscriber(filter, std::io::stdout, std::io::stderr).init();
}

fn subscriber<A, P>(
    filter: EnvFilter,
    app_writer: A,
    prompt_writer: P,
) -> impl Subscriber + Send + Sync + 'static
where
    A: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    P: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let app_log = tracing_subscriber::fmt::layer()
        .with_writer(app_writer)
        .with_target(false)
        .with_filter(filter_fn(|meta| meta.target() != PROMPT_LOG_TARGET));

    let prompt_log = tracing_subscriber::fmt::layer()
        .with_writer(prompt_writer)
        .with_filter(filter_fn(|meta| meta.target() == PROMPT_LOG_TARGET));

    tracing_subscriber::registry()
        .with(filter)
        .with(app_log)
        .with(prompt_log)
}
