pub mod sync;
pub mod transfer;

use colored::Colorize;
use tilecache_core::UsageError;

/// Report a usage fault and exit with status 2 without doing any work.
pub(crate) fn usage_exit(command: &str, usage: &str, err: &UsageError) -> ! {
    eprintln!("{} {err}", "error:".red().bold());
    eprintln!("usage: tilecache {command} {usage}");
    std::process::exit(2);
}
