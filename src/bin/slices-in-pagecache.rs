use pagecache_tools::probe::{self, ReportStyle};
use pagecache_tools::Reporter;
use std::path::PathBuf;
use structopt::StructOpt;

/// Infers which parts of files are in the page cache.
#[derive(StructOpt, Debug)]
#[structopt(name = "slices-in-pagecache")]
struct Options {
    /// Files to probe; each must be readable
    #[structopt(required = true)]
    files: Vec<PathBuf>,
}

fn main() {
    let reporter = Reporter::init("slices-in-pagecache");
    let opt = Options::from_args();

    reporter.or_exit(probe::run(&opt.files, ReportStyle::Slices, &reporter));
}
