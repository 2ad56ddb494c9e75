use std::path::Path;

use clap::Parser;
use snafu::ErrorCompat;

mod args;
mod dms;

fn main() {
    let args = args::Args::parse();
    let mut builder = env_logger::Builder::from_default_env();
    if args.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();

    if let Err(e) = dms::run_analysis(Path::new(".")) {
        eprintln!("エラー: {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}
