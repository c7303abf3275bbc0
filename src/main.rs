use bobfs::cli_interface::BobFsCli;
use clap::Parser;
/// a CLI interface to users to create a BobFS image,
/// or to inspect and change the one it holds.
///
/// Set `RUST_LOG` to see what the filesystem does underneath.
fn main() -> anyhow::Result<()> {
    env_logger::builder().format_timestamp_nanos().init();
    let args = BobFsCli::parse();
    let stdout = std::io::stdout();
    bobfs::cli_interface::run(args, &mut stdout.lock())
}
