use indicatif::{ProgressBar, ProgressStyle};
use sitedown_engine::{Mirror, MirrorConfig, MirrorResult, ProgressCallback, ResultCallback};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::warn;
use url::Url;

/// Options for configuring a mirror run over one or more sites
pub struct MirrorOptions {
    pub seeds: Vec<String>,
    pub root: PathBuf,
    /// Template applied to every seed; `base_url` and `root` are overridden.
    pub config: MirrorConfig,
    pub show_progress: bool,
}

/// Callback for reporting run progress
pub type MirrorProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Callback for reporting individual results as they come in
pub type MirrorResultCallback = ResultCallback;

/// Extract the path component from a URL
pub fn extract_url_path(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| {
            let path = u.path().to_string();
            if path.is_empty() || path == "/" {
                "/".to_string()
            } else {
                path
            }
        })
        .unwrap_or_else(|| url.to_string())
}

/// Mirror every seed in turn, one engine session per seed.
/// A seed that cannot be mirrored is reported through `progress_callback`
/// and does not stop the remaining seeds.
pub async fn execute_mirror(
    options: MirrorOptions,
    progress_callback: Option<MirrorProgressCallback>,
    result_callback: Option<MirrorResultCallback>,
) -> Result<Vec<MirrorResult>, String> {
    let MirrorOptions {
        seeds,
        root,
        config,
        show_progress,
    } = options;

    if seeds.is_empty() {
        return Err("No seed URLs to mirror".to_string());
    }

    let progress_bar = if show_progress {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .map_err(|e| e.to_string())?,
        );
        pb.set_message("Starting mirror...");
        Some(Arc::new(pb))
    } else {
        None
    };

    let processed_count = Arc::new(AtomicUsize::new(0));

    let internal_progress_callback: ProgressCallback = match progress_bar.clone() {
        Some(pb) => {
            let count_clone = processed_count.clone();
            Arc::new(move |_visited: usize, url: String| {
                let count = count_clone.fetch_add(1, Ordering::Relaxed) + 1;
                pb.set_message(format!("Mirroring... {} URLs processed ({})", count, url));
                pb.tick();
            })
        }
        None => {
            let count_clone = processed_count.clone();
            Arc::new(move |_visited: usize, _url: String| {
                count_clone.fetch_add(1, Ordering::Relaxed);
            })
        }
    };

    let mut all_results = Vec::new();
    for (idx, seed) in seeds.iter().enumerate() {
        if let Some(ref callback) = progress_callback
            && seeds.len() > 1
        {
            callback(format!("Mirroring site {}/{}: {}", idx + 1, seeds.len(), seed));
        }

        let seed_config = config.clone().with_base_url(seed.as_str()).with_root(root.clone());
        let mut mirror = match Mirror::new(seed_config) {
            Ok(mirror) => mirror.with_progress_callback(internal_progress_callback.clone()),
            Err(e) => {
                warn!(seed = %seed, error = %e, "could not set up mirror");
                if let Some(ref callback) = progress_callback {
                    callback(format!("[!]  Failed to mirror {}: {}", seed, e));
                }
                continue;
            }
        };
        if let Some(ref cb) = result_callback {
            mirror = mirror.with_result_callback(cb.clone());
        }

        match mirror.run().await {
            Ok(results) => all_results.extend(results),
            Err(e) => {
                warn!(seed = %seed, error = %e, "mirror run failed");
                if let Some(ref callback) = progress_callback {
                    callback(format!("[!]  Failed to mirror {}: {}", seed, e));
                }
            }
        }
    }

    if let Some(ref pb) = progress_bar {
        let total = processed_count.load(Ordering::Relaxed);
        pb.finish_with_message(format!("Mirror complete! {} URLs processed", total));
    }

    Ok(all_results)
}
