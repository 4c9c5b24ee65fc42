use pagecache_tools::random_io::{self, ReadConfig, ReadOptions};
use pagecache_tools::target::FileTarget;
use pagecache_tools::Reporter;
use std::io;
use std::path::PathBuf;
use structopt::clap::AppSettings;
use structopt::StructOpt;

/// Reads data randomly from a file.
///
/// For cache hints and instructions, the hinted or prefetched part of the
/// file is the zone between startoffset and startoffset+length.
#[derive(StructOpt, Debug)]
#[structopt(name = "hrr", setting = AppSettings::AllowNegativeNumbers)]
struct Options {
    /// Minimum read block size [default: 512]
    #[structopt(short = "b", value_name = "minbsize")]
    min_block_size: Option<i64>,

    /// Maximum read block size [default: 32768]
    #[structopt(short = "B", value_name = "maxbsize")]
    max_block_size: Option<i64>,

    /// Give a hint to the filesystem (posix_fadvise) before reading
    #[structopt(short = "H")]
    hint: bool,

    /// Max offset to read from, relative to startoffset [default: file size - startoffset]
    #[structopt(short = "L", value_name = "length")]
    window_length: Option<i64>,

    /// Do I/Os in the file from that offset on [default: 0]
    #[structopt(short = "O", value_name = "startoffset")]
    window_start: Option<i64>,

    /// Use pread instead of lseek & read
    #[structopt(short = "P")]
    positional: bool,

    /// Instruct the pagecache to prefetch the target zone before reading
    #[structopt(short = "R")]
    prefetch: bool,

    /// Amount of data to read [default: 1/8 of the file size]
    #[structopt(short = "S", value_name = "size")]
    read_size: Option<i64>,

    /// Align read block boundaries on alignment bytes: 1 for pure random
    /// reads, 512 for sectors, 4096 for filesystem blocks [default: 512]
    #[structopt(short = "Z", value_name = "alignment")]
    alignment: Option<i64>,

    /// Target file
    file: PathBuf,
}

impl Options {
    fn read_options(&self) -> ReadOptions {
        ReadOptions {
            min_block_size: self.min_block_size,
            max_block_size: self.max_block_size,
            hint: self.hint,
            window_length: self.window_length,
            window_start: self.window_start,
            positional: self.positional,
            prefetch: self.prefetch,
            read_size: self.read_size,
            alignment: self.alignment,
        }
    }
}

fn main() {
    let reporter = Reporter::init("hrr");
    let opt = Options::from_args();

    let target = reporter.or_exit(FileTarget::open(&opt.file));
    let config = reporter.or_exit(ReadConfig::resolve(
        &opt.read_options(),
        target.path(),
        target.size(),
    ));

    let mut rng = random_io::clock_seeded_rng();
    let stdout = io::stdout();
    reporter.or_exit(random_io::run(
        target,
        &config,
        &mut rng,
        &reporter,
        &mut stdout.lock(),
    ));
}
