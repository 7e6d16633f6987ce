//! Reproduces the `/api/v1/x/{name}/checksum` endpoint from the command
//! line, so an operator can diff a feature file against what the
//! service last served without making an HTTP request.

use std::path::PathBuf;

use clap::Parser;

use xfeature::service;

#[derive(Parser)]
#[command(name = "checksum-tool")]
struct Args {
    /// Directory of XML feature files.
    #[arg(long, env = "XFEATURE_FEATURE_ROOT", default_value = "specs/xfeature/")]
    feature_root: PathBuf,

    /// Feature name to checksum.
    name: String,
}

fn main() {
    let args = Args::parse();
    match service::checksum(&args.feature_root, &args.name) {
        Ok(response) => println!("{} {}", response.algorithm, response.checksum),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}
