use crate::Dbpf2DirParameters;
use dbpf::converters::create_converters;
use dbpf::settings::load_settings;
use dbpf::unpacker::Unpacker;
use dbpf::Result;
use log::info;

common::phase_stats!(pub Statistics; setup, unpack);

pub struct Dbpf2Dir;

impl Dbpf2Dir {
    /// Unpacks the input archives and returns the timings together with the
    /// unpacker, which holds the per-record errors.
    pub fn convert(params: Dbpf2DirParameters) -> Result<(Statistics, Unpacker)> {
        let mut stats = Statistics::default();

        stats.setup.start();
        let settings = load_settings()?;
        let mut hasher = settings.create_hasher()?;
        let group = match &params.group {
            Some(name) => Some(hasher.get_file_hash(name)?),
            None => None,
        };

        let converters = create_converters(settings.converters.as_deref());
        let mut unpacker = Unpacker::new(params.input, params.output, converters);
        unpacker.set_hasher(hasher);
        if let Some(group) = group {
            info!("Unpacking only group {:#010x}", group);
            unpacker.set_filter(move |item| item.key.group == group);
        }
        stats.setup.end();

        stats.unpack.start();
        unpacker.run()?;
        stats.unpack.end();

        Ok((stats, unpacker))
    }
}
