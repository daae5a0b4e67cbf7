use dbpf::header::ArchiveHeader;
use dbpf::index::ArchiveIndex;
use dbpf::settings::load_settings;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(name = "dbpfinfo")]
struct Opt {
    /// Print names instead of hashes where the registries know them.
    #[structopt(short, long)]
    names: bool,

    #[structopt(short, long, parse(from_os_str))]
    input: PathBuf,
}

fn main() {
    env_logger::init();

    let opt = Opt::from_args();
    if let Err(e) = print_info(&opt) {
        eprintln!("cannot read {:?}: {}", opt.input, e);
        std::process::exit(1);
    }
}

fn print_info(opt: &Opt) -> dbpf::Result<()> {
    let mut stream = BufReader::new(File::open(&opt.input)?);
    let header = ArchiveHeader::read(&mut stream)?;
    let index = ArchiveIndex::read(&mut stream, &header)?;

    println!("variant={:?}", header.variant);
    println!("version={}.{}", header.major_version, header.minor_version);
    println!(
        "index count={} offset={} size={}",
        header.index_count, header.index_offset, header.index_size
    );

    let hasher = if opt.names {
        load_settings()?.create_hasher()?
    } else {
        dbpf::Hasher::new()
    };

    for item in index.iter() {
        let key = if opt.names {
            item.key.path(&hasher)
        } else {
            item.key.to_string()
        };
        println!(
            "item key={} offset={} size={} mem_size={} compressed={}",
            key, item.chunk_offset, item.compressed_size, item.mem_size, item.is_compressed
        );
    }
    Ok(())
}
