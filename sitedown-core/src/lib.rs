use colored::Colorize;

pub mod mirror;
pub mod report;

const BANNER: &str = r#"
     _ _              _
 ___(_) |_ ___  __| | _____      ___ __
/ __| | __/ _ \/ _` |/ _ \ \ /\ / / '_ \
\__ \ | ||  __/ (_| | (_) \ V  V /| | | |
|___/_|\__\___|\__,_|\___/ \_/\_/ |_| |_|
"#;

pub fn print_banner() {
    println!("{}", BANNER.bright_cyan().bold());
    println!(
        "  {} {}\n",
        "sitedown".bright_white().bold(),
        format!("v{} - offline website mirroring", env!("CARGO_PKG_VERSION")).dimmed()
    );
}
