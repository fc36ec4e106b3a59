use std::fs;
use std::path::Path;

use anyhow::Context;
use engine_logging::engine_info;
use novel_engine::SourceConfig;
use serde::de::DeserializeOwned;

/// Reads a RON file into `T`.
pub(crate) fn load_ron<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let value = ron::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
    engine_info!("Loaded configuration from {:?}", path);
    Ok(value)
}

/// Source from `path`, or the built-in LightNovelPub source.
pub(crate) fn load_source(path: Option<&Path>) -> anyhow::Result<SourceConfig> {
    match path {
        Some(path) => load_ron(path),
        None => Ok(SourceConfig::light_novel_pub()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use novel_engine::{ConversionOptionsBuilder, HeadingStyle};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn bundled_source_matches_the_builtin() {
        let parsed: SourceConfig =
            ron::from_str(include_str!("../../../../sources/lightnovelpub.ron")).unwrap();
        assert_eq!(parsed, SourceConfig::light_novel_pub());
    }

    #[test]
    fn missing_path_uses_the_builtin_source() {
        assert_eq!(load_source(None).unwrap(), SourceConfig::light_novel_pub());
    }

    #[test]
    fn conversion_options_load_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("options.ron");
        fs::write(&path, "(heading_style: atx, bullet_list_marker: \"-\")").unwrap();

        let builder: ConversionOptionsBuilder = load_ron(&path).unwrap();
        let options = builder.build().unwrap();
        assert_eq!(options.heading_style(), HeadingStyle::Atx);
        assert_eq!(options.bullet_list_marker(), "-");
        assert_eq!(options.em_delimiter(), "_");
    }

    #[test]
    fn unreadable_file_names_the_path() {
        let err = load_ron::<SourceConfig>(Path::new("/nonexistent/source.ron")).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/source.ron"));
    }
}
