use lazy_static::lazy_static;
use prometheus::{register_int_counter, Encoder, IntCounter, TextEncoder};

lazy_static! {
    pub static ref LOGO_CACHE_HITS: IntCounter = register_int_counter!(
        "tvtuner_logo_cache_hits_total",
        "Logos served from the on-disk cache"
    )
    .unwrap();
    pub static ref LOGO_DOWNLOADS: IntCounter = register_int_counter!(
        "tvtuner_logo_downloads_total",
        "Logos downloaded and written to the cache"
    )
    .unwrap();
    pub static ref LOGO_DOWNLOAD_FAILURES: IntCounter = register_int_counter!(
        "tvtuner_logo_download_failures_total",
        "Logo downloads that failed and left no cache file"
    )
    .unwrap();
    pub static ref THUMBNAIL_DECODE_FAILURES: IntCounter = register_int_counter!(
        "tvtuner_thumbnail_decode_failures_total",
        "Logo files that could not be decoded into a thumbnail"
    )
    .unwrap();
}

pub fn gather_metrics() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
