use chrono::Utc;
use clap::ArgMatches;
use colored::Colorize;
use sitedown_core::mirror::{MirrorOptions, execute_mirror};
use sitedown_core::report::{MirrorReport, ReportFormat, render_report, save_report};
use sitedown_engine::{MirrorConfig, ResourceKind};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use url::Url;

// Helper functions for the mirror handler

/// Log level used when `RUST_LOG` is not set
pub fn default_log_level(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

pub fn init_tracing(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_level(verbose, quiet)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Load URLs from either a file or a single URL argument
pub fn load_urls_from_source(
    url: Option<&Url>,
    hosts_file: Option<&PathBuf>,
) -> Result<Vec<String>, String> {
    if let Some(hosts_file_path) = hosts_file {
        load_urls_from_file(hosts_file_path)
    } else if let Some(url) = url {
        Ok(vec![url.as_str().to_string()])
    } else {
        Err("Either --url or --hosts-file must be provided".to_string())
    }
}

/// Load and parse seed URLs from a file; blank lines and `#` comments are ignored
pub fn load_urls_from_file(path: &Path) -> Result<Vec<String>, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read hosts file {}: {}", path.display(), e))?;

    let urls: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(parse_url_line)
        .collect();

    if urls.is_empty() {
        return Err(format!("No valid URLs found in {}", path.display()));
    }

    Ok(urls)
}

/// Parse a single line as an http(s) URL, adding http:// when no scheme is given
pub fn parse_url_line(line: &str) -> Option<String> {
    let candidate = if line.contains("://") {
        line.to_string()
    } else {
        format!("http://{}", line)
    };

    match Url::parse(&candidate) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() => {
            Some(candidate)
        }
        _ => {
            eprintln!("⚠️  Skipping invalid URL '{}'", line);
            None
        }
    }
}

/// Create the mirror root and one directory per resource kind under it
pub fn bootstrap_root(dir: &str) -> Result<PathBuf, String> {
    let expanded = shellexpand::tilde(dir);
    let root = PathBuf::from(expanded.as_ref());

    fs::create_dir_all(&root)
        .map_err(|e| format!("Failed to create mirror root {}: {}", root.display(), e))?;
    for subdir in ResourceKind::ALL.iter().filter_map(|kind| kind.subdir()) {
        let path = root.join(subdir);
        fs::create_dir_all(&path)
            .map_err(|e| format!("Failed to create {}: {}", path.display(), e))?;
    }

    Ok(root)
}

/// Everything `mirror` needs, parsed from its arguments
#[derive(Debug, Clone)]
pub struct MirrorRequest {
    pub seeds: Vec<String>,
    pub output: String,
    pub config: MirrorConfig,
    pub format: ReportFormat,
    pub report_out: Option<PathBuf>,
}

pub fn parse_mirror_args(sub_matches: &ArgMatches) -> Result<MirrorRequest, String> {
    let url = sub_matches.get_one::<Url>("url");
    let hosts_file = sub_matches.get_one::<PathBuf>("hosts-file");
    let seeds = load_urls_from_source(url, hosts_file)?;

    let output = sub_matches
        .get_one::<String>("output")
        .cloned()
        .unwrap_or_else(|| "downloads".to_string());

    let mut config = MirrorConfig::default()
        .with_timeout(*sub_matches.get_one::<u64>("timeout").unwrap_or(&30))
        .with_retries(*sub_matches.get_one::<u32>("retries").unwrap_or(&2))
        .with_delay_ms(*sub_matches.get_one::<u64>("delay").unwrap_or(&0))
        .with_root_index(sub_matches.get_flag("root-index"))
        .with_follow_stylesheets(sub_matches.get_flag("follow-stylesheets"));

    if let Some(domain) = sub_matches.get_one::<String>("domain") {
        config = config.with_base_domain(domain.as_str());
    }
    if let Some(max_pages) = sub_matches.get_one::<usize>("max-pages") {
        config = config.with_max_pages(*max_pages);
    }
    if let Some(max_bytes) = sub_matches.get_one::<u64>("max-bytes") {
        config = config.with_max_bytes(*max_bytes);
    }
    if let Some(max_depth) = sub_matches.get_one::<usize>("max-depth") {
        config = config.with_max_depth(*max_depth);
    }
    if let Some(proxy) = sub_matches.get_one::<String>("proxy") {
        config = config.with_proxy(proxy.as_str());
    }
    if let Some(user_agent) = sub_matches.get_one::<String>("user-agent") {
        config = config.with_user_agent(user_agent.as_str());
    }

    let format_name = sub_matches
        .get_one::<String>("report-format")
        .map(String::as_str)
        .unwrap_or("text");
    let format = ReportFormat::from_str(format_name)
        .ok_or_else(|| format!("Unknown report format '{}'", format_name))?;

    Ok(MirrorRequest {
        seeds,
        output,
        config,
        format,
        report_out: sub_matches.get_one::<PathBuf>("report-out").cloned(),
    })
}

fn print_mirror_plan(request: &MirrorRequest, root: &Path) {
    let config = &request.config;
    println!("\n🪞 Mirroring {} site(s)", request.seeds.len());
    println!("Mirror root: {}", root.display().to_string().bright_white());
    if let Some(ref domain) = config.base_domain {
        println!("Domain: {}", domain);
    }
    println!(
        "Max depth: {}",
        config
            .max_depth
            .map(|d| d.to_string())
            .unwrap_or_else(|| "unlimited".to_string())
    );
    if let Some(max_pages) = config.max_pages {
        println!("Max pages: {}", max_pages);
    }
    if let Some(max_bytes) = config.max_bytes {
        println!("Max bytes: {}", max_bytes);
    }
    if config.delay_ms > 0 {
        println!("Delay: {} ms", config.delay_ms);
    }
    println!(
        "Stylesheets: {}\n",
        if config.follow_stylesheets { "followed" } else { "opaque" }
    );
}

pub async fn handle_mirror(sub_matches: &ArgMatches, quiet: bool) {
    let request = match parse_mirror_args(sub_matches) {
        Ok(request) => request,
        Err(e) => {
            eprintln!("✗ {}", e);
            std::process::exit(1);
        }
    };

    let root = match bootstrap_root(&request.output) {
        Ok(root) => root,
        Err(e) => {
            eprintln!("✗ {}", e);
            std::process::exit(1);
        }
    };

    if !quiet {
        print_mirror_plan(&request, &root);
    }

    let options = MirrorOptions {
        seeds: request.seeds.clone(),
        root: root.clone(),
        config: request.config.clone(),
        show_progress: !quiet,
    };

    let progress_callback = Arc::new(move |msg: String| {
        if !quiet {
            println!("{}", msg);
        }
    });

    let started_at = Utc::now();
    let all_results = match execute_mirror(options, Some(progress_callback), None).await {
        Ok(results) => results,
        Err(e) => {
            eprintln!("✗ Mirror failed: {}", e);
            std::process::exit(1);
        }
    };
    let finished_at = Utc::now();

    if !quiet {
        println!("\n{} Mirror complete!\n", "✓".green().bold());
    }

    let report = MirrorReport::from_results(
        &request.seeds,
        &root,
        started_at,
        finished_at,
        &all_results,
    );
    let rendered = match render_report(&report, request.format) {
        Ok(rendered) => rendered,
        Err(e) => {
            eprintln!("✗ Failed to render report: {}", e);
            std::process::exit(1);
        }
    };

    match request.report_out {
        Some(ref path) => match save_report(&rendered, path) {
            Ok(()) => println!(
                "{} Report saved to {}",
                "✓".green().bold(),
                path.display().to_string().bright_white()
            ),
            Err(e) => {
                eprintln!("✗ Failed to save report to {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => print!("{}", rendered),
    }
}
