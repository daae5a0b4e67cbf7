use crate::tool::Dbpf2Dir;
use log::error;
use std::path::PathBuf;
use structopt::StructOpt;

mod tool;

#[derive(StructOpt, Debug)]
#[structopt(name = "dbpf2dir")]
pub struct Dbpf2DirParameters {
    /// Archives to unpack, highest priority first.
    #[structopt(short, long, required = true, parse(from_os_str))]
    input: Vec<PathBuf>,

    #[structopt(short, long, parse(from_os_str))]
    output: PathBuf,

    /// Only unpack records of this group (name or `0x` literal).
    #[structopt(short, long)]
    group: Option<String>,
}

fn main() {
    env_logger::init();

    let params = Dbpf2DirParameters::from_args();
    let (stats, unpacker) = match Dbpf2Dir::convert(params) {
        Ok(t) => t,
        Err(e) => {
            error!("Unpacking failed: {}", e);
            std::process::exit(1);
        }
    };

    for archive in unpacker.failed_archives() {
        println!("missing={:?}", archive);
    }
    for (key, e) in unpacker.errors() {
        println!("failed={} {}", key, e);
    }

    for phase in stats.phases() {
        println!("{}={}ms", phase.name(), phase.total_time().as_millis());
    }
}
