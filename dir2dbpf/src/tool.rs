use crate::Dir2DbpfParameters;
use dbpf::converters::create_converters;
use dbpf::header::Variant;
use dbpf::packer::Packer;
use dbpf::settings::load_settings;
use dbpf::Result;

common::phase_stats!(pub Statistics; setup, pack);

pub struct Dir2Dbpf;

impl Dir2Dbpf {
    pub fn convert(params: Dir2DbpfParameters) -> Result<Statistics> {
        let mut stats = Statistics::default();

        stats.setup.start();
        let settings = load_settings()?;
        let mut packer = Packer::new(create_converters(settings.converters.as_deref()));
        packer.set_hasher(settings.create_hasher()?);
        packer.set_signature(params.signature);
        packer.set_compress_threshold(params.compress_threshold.or(settings.compress_threshold));
        if params.dbbf || settings.dbbf {
            packer.set_variant(Variant::Dbbf);
        }
        stats.setup.end();

        stats.pack.start();
        packer.pack_to_file(&params.input, &params.output)?;
        stats.pack.end();

        Ok(stats)
    }
}
