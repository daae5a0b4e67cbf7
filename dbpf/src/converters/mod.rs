//! Converters shipped with the crate.

use crate::converter::Converter;

pub mod dds;
pub mod rw4_texture;

pub use rw4_texture::Rw4TextureConverter;

/// Creates the chain of all shipped converters whose names are enabled.
/// `None` enables every converter.
pub fn create_converters(enabled: Option<&[String]>) -> Vec<Box<dyn Converter>> {
    let all: Vec<Box<dyn Converter>> = vec![Box::new(Rw4TextureConverter)];

    all.into_iter()
        .filter(|c| match enabled {
            Some(names) => names.iter().any(|n| n == c.name()),
            None => true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::converters::create_converters;

    #[test]
    fn enabled_names_filter_the_chain() {
        assert_eq!(create_converters(None).len(), 1);
        assert_eq!(create_converters(Some(&[][..])).len(), 0);
        assert_eq!(
            create_converters(Some(&["rw4 textures".to_string()][..])).len(),
            1
        );
    }
}
