use sitedown::commands::command_argument_builder;
use sitedown::handlers::{handle_mirror, init_tracing};
use sitedown_core::print_banner;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");
    let verbose = chosen_command.get_count("verbose");

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    if chosen_command.subcommand().is_none() {
        // No subcommand provided, just show the banner
        return;
    }

    init_tracing(verbose, quiet);

    match chosen_command.subcommand() {
        Some(("mirror", primary_command)) => handle_mirror(primary_command, quiet).await,
        _ => unreachable!("clap should ensure we don't get here"),
    }
}
