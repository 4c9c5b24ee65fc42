use pagecache_tools::probe::{self, ReportStyle};
use pagecache_tools::Reporter;
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(name = "is-in-pagecache")]
struct Options {
    /// Files to probe
    #[structopt(required = true)]
    files: Vec<PathBuf>,
}

fn main() {
    let reporter = Reporter::init("is-in-pagecache");
    let opt = Options::from_args();

    reporter.or_exit(probe::run(&opt.files, ReportStyle::Summary, &reporter));
}
