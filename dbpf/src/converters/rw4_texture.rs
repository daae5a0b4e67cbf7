use crate::converter::{output_file, Converter};
use crate::converters::dds::DdsTexture;
use crate::error::{Error, Result};
use crate::hash::Hasher;
use crate::key::ResourceKey;
use crate::keys::RW4_TYPE;
use crate::writer::RecordWriter;
use log::debug;
use rw4::{BaseResource, GraphKind, Raster, Reference, RenderGraph, RwObject};
use std::convert::TryFrom;
use std::path::Path;

const NAME: &str = "rw4 textures";

/// Converts texture render graphs to `.dds` files and back.
pub struct Rw4TextureConverter;

/// Extracts the texture of a texture graph. Returns `None` for graphs that
/// are not a single texture.
pub fn graph_to_texture(graph: &RenderGraph) -> Option<DdsTexture> {
    if !graph.is_texture() {
        return None;
    }
    let rasters = graph.rasters();
    if rasters.len() != 1 {
        return None;
    }
    let (_, raster) = rasters[0];

    let pixels = graph.resolve(raster.texture_data)?;
    match graph.get(pixels)? {
        RwObject::BaseResource(buffer) => Some(DdsTexture {
            format: raster.format,
            width: raster.width as u32,
            height: raster.height as u32,
            levels: raster.levels.max(1) as u32,
            data: buffer.data.clone(),
        }),
        _ => None,
    }
}

/// Builds a texture graph: one raster referencing one pixel buffer.
pub fn texture_to_graph(texture: &DdsTexture) -> Result<RenderGraph> {
    let too_large = |what: &str| Error::Converter {
        name: NAME,
        message: format!("texture {} does not fit a raster", what),
    };

    let mut graph = RenderGraph::new(GraphKind::Texture);
    let raster = Raster {
        format: texture.format,
        width: u16::try_from(texture.width).map_err(|_| too_large("width"))?,
        height: u16::try_from(texture.height).map_err(|_| too_large("height"))?,
        levels: u8::try_from(texture.levels).map_err(|_| too_large("mip-map count"))?,
        ..Raster::default()
    };
    let pixels = graph.add(BaseResource {
        data: texture.data.clone(),
    });
    graph.add(Raster {
        texture_data: Reference::Object(pixels),
        ..raster
    });
    Ok(graph)
}

impl Rw4TextureConverter {
    fn extension(hasher: &Hasher) -> String {
        format!(".{}.dds", hasher.get_type_name(RW4_TYPE))
    }
}

impl Converter for Rw4TextureConverter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_decoder(&self, key: &ResourceKey) -> bool {
        key.type_id == RW4_TYPE
    }

    fn decode(&self, data: &[u8], folder: &Path, key: &ResourceKey, hasher: &Hasher) -> Result<bool> {
        if RenderGraph::peek_kind(&mut &data[..])? != GraphKind::Texture {
            debug!("{} is not a texture graph", key);
            return Ok(false);
        }

        let graph = RenderGraph::from_bytes(data)?;
        match graph_to_texture(&graph) {
            Some(texture) => {
                std::fs::write(output_file(key, folder, "dds", hasher), texture.to_bytes())?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn is_encoder(&self, path: &Path, hasher: &Hasher) -> bool {
        let extension = Self::extension(hasher);
        path.is_file()
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.len() > extension.len() && n.ends_with(&extension))
                .unwrap_or(false)
    }

    fn encode(
        &self,
        path: &Path,
        output: &mut dyn RecordWriter,
        group: u32,
        hasher: &mut Hasher,
    ) -> Result<bool> {
        if !self.is_encoder(path, hasher) {
            return Ok(false);
        }

        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        let instance_name = file_name.split('.').next().unwrap_or_default();
        let instance = hasher.get_file_hash(instance_name)?;

        let texture = DdsTexture::parse(&std::fs::read(path)?)?;
        let bytes = texture_to_graph(&texture)?.to_bytes()?;
        output.write_record(ResourceKey::new(group, instance, RW4_TYPE), &bytes)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use crate::converter::Converter;
    use crate::converters::dds::{DdsTexture, D3DFMT_DXT1};
    use crate::converters::rw4_texture::{graph_to_texture, texture_to_graph, Rw4TextureConverter};
    use crate::hash::Hasher;
    use crate::key::ResourceKey;
    use crate::keys::RW4_TYPE;
    use crate::writer::RecordWriter;
    use crate::Result;
    use rw4::{BoundingBox, GraphKind, RenderGraph};

    struct Records(Vec<(ResourceKey, Vec<u8>)>);

    impl RecordWriter for Records {
        fn write_record(&mut self, key: ResourceKey, data: &[u8]) -> Result<()> {
            self.0.push((key, data.to_vec()));
            Ok(())
        }
    }

    fn texture() -> DdsTexture {
        DdsTexture {
            format: D3DFMT_DXT1,
            width: 8,
            height: 8,
            levels: 1,
            data: (0..32u8).collect(),
        }
    }

    #[test]
    fn texture_survives_graph() {
        let mut graph = texture_to_graph(&texture()).unwrap();
        let read = RenderGraph::from_bytes(&graph.to_bytes().unwrap()).unwrap();
        assert_eq!(graph_to_texture(&read), Some(texture()));
    }

    #[test]
    fn model_graphs_are_not_applicable() {
        let dir = tempfile::tempdir().unwrap();
        let mut graph = RenderGraph::new(GraphKind::Model);
        graph.add(BoundingBox::default());
        let bytes = graph.to_bytes().unwrap();

        let key = ResourceKey::new(1, 2, RW4_TYPE);
        let converted = Rw4TextureConverter
            .decode(&bytes, dir.path(), &key, &Hasher::new())
            .unwrap();
        assert!(!converted);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn decode_then_encode() {
        let dir = tempfile::tempdir().unwrap();
        let mut hasher = Hasher::new();
        let key = ResourceKey::new(1, hasher.get_file_hash("rock").unwrap(), RW4_TYPE);
        hasher.project_registry_mut().add("rock", key.instance);

        let bytes = texture_to_graph(&texture()).unwrap().to_bytes().unwrap();
        assert!(Rw4TextureConverter
            .decode(&bytes, dir.path(), &key, &hasher)
            .unwrap());

        let file = dir.path().join("rock.rw4.dds");
        assert!(Rw4TextureConverter.is_encoder(&file, &hasher));
        assert!(!Rw4TextureConverter.is_encoder(&dir.path().join("rock.dds"), &hasher));

        let mut records = Records(vec![]);
        assert!(Rw4TextureConverter
            .encode(&file, &mut records, 1, &mut hasher)
            .unwrap());
        assert_eq!(records.0.len(), 1);
        assert_eq!(records.0[0].0, key);

        let graph = RenderGraph::from_bytes(&records.0[0].1).unwrap();
        assert_eq!(graph_to_texture(&graph), Some(texture()));
    }
}
