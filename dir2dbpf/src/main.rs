use crate::tool::Dir2Dbpf;
use log::error;
use std::path::PathBuf;
use structopt::StructOpt;

mod tool;

#[derive(StructOpt, Debug)]
#[structopt(name = "dir2dbpf")]
pub struct Dir2DbpfParameters {
    /// Folder with one sub-folder per group.
    #[structopt(short, long, parse(from_os_str))]
    input: PathBuf,

    #[structopt(short, long, parse(from_os_str))]
    output: PathBuf,

    /// Write the 64-bit DBBF variant.
    #[structopt(long)]
    dbbf: bool,

    /// File stored as the package signature.
    #[structopt(long, parse(from_os_str))]
    signature: Option<PathBuf>,

    /// Compress payloads larger than this many bytes.
    #[structopt(short, long)]
    compress_threshold: Option<usize>,
}

fn main() {
    env_logger::init();

    let params = Dir2DbpfParameters::from_args();
    let stats = match Dir2Dbpf::convert(params) {
        Ok(s) => s,
        Err(e) => {
            error!("Packing failed: {}", e);
            std::process::exit(1);
        }
    };

    for phase in stats.phases() {
        println!("{}={}ms", phase.name(), phase.total_time().as_millis());
    }
}
