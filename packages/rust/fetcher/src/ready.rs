//! Fetch a page and wait until its tables are present.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use scraper::{Html, Selector};
use tracing::{info, instrument, warn};
use url::Url;

use valuelist_shared::{FetchConfig, Result, ValueListError};

use crate::source::PageSource;
use crate::wait::{WaitError, WaitOptions, wait_until};

/// Phrases a page shows when its content is rendered client-side only.
const JS_REQUIRED_MARKERS: &[&str] = &["Enable JavaScript", "requires JavaScript"];

/// Whether `html` contains at least one element matching `ready`.
pub fn page_is_ready(html: &str, ready: &Selector) -> bool {
    Html::parse_document(html).select(ready).next().is_some()
}

/// Fetch `url` from `source` until the ready selector matches.
///
/// A fetch error ends the wait at once. On timeout the last body seen is
/// returned inside [`ValueListError::FetchTimeout`] for the snapshot.
#[instrument(skip_all, fields(%url, source = source.name()))]
pub async fn fetch_ready_page<S>(source: &S, url: &Url, config: &FetchConfig) -> Result<String>
where
    S: PageSource,
{
    let ready = Selector::parse(&config.ready_selector).map_err(|e| {
        ValueListError::config(format!(
            "invalid ready selector '{}': {e}",
            config.ready_selector
        ))
    })?;

    let opts = WaitOptions {
        timeout: config.wait_timeout,
        poll_interval: config.poll_interval,
    };

    let last_body: Mutex<Option<String>> = Mutex::new(None);
    let js_warned = AtomicBool::new(false);

    let outcome = wait_until(opts, || {
        let ready = &ready;
        let last_body = &last_body;
        let js_warned = &js_warned;
        async move {
            let body = source.fetch_html(url).await?;
            if page_is_ready(&body, ready) {
                return Ok(Some(body));
            }

            if JS_REQUIRED_MARKERS.iter().any(|m| body.contains(m))
                && !js_warned.swap(true, Ordering::Relaxed)
            {
                warn!("page asks for JavaScript; tables may never render without a browser");
            }

            if let Ok(mut slot) = last_body.lock() {
                *slot = Some(body);
            }
            Ok::<_, ValueListError>(None)
        }
    })
    .await;

    match outcome {
        Ok(body) => {
            info!(bytes = body.len(), "page ready");
            Ok(body)
        }
        Err(WaitError::Aborted(e)) => Err(e),
        Err(WaitError::Timeout { waited, attempts }) => {
            warn!(?waited, attempts, "page never became ready");
            let snapshot = last_body.into_inner().ok().flatten();
            Err(ValueListError::FetchTimeout {
                url: url.to_string(),
                waited,
                snapshot,
            })
        }
    }
}
