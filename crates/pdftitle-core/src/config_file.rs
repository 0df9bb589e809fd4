use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{HeuristicConfig, TierToggles, TitleConfigBuilder};

#[derive(Error, Debug)]
pub enum ConfigFileError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub heuristic: Option<HeuristicSection>,
    pub ocr: Option<OcrSection>,
    pub metadata: Option<MetadataSection>,
    pub tiers: Option<TiersSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeuristicSection {
    pub max_position: Option<usize>,
    pub min_length: Option<usize>,
    pub ideal_min_length: Option<usize>,
    pub ideal_max_length: Option<usize>,
    pub max_length: Option<usize>,
    pub acceptance_threshold: Option<f64>,
    /// Replaces the built-in boilerplate keywords.
    pub boilerplate_keywords: Option<Vec<String>>,
    /// Appended to the boilerplate keywords.
    pub extra_boilerplate_keywords: Option<Vec<String>>,
    pub extra_date_patterns: Option<Vec<String>>,
    pub extra_minor_words: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrSection {
    pub dpi: Option<u32>,
    pub language: Option<String>,
    pub tesseract_path: Option<String>,
    pub page_segmentation_mode: Option<u8>,
    /// `0` disables the timeout.
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataSection {
    pub extra_placeholder_patterns: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TiersSection {
    pub metadata: Option<bool>,
    pub text_layer: Option<bool>,
    pub ocr: Option<bool>,
}

/// Platform config directory path: `<config_dir>/pdftitle/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("pdftitle").join("config.toml"))
}

/// Load config by cascading CWD `.pdftitle.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".pdftitle.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    match read_config(path) {
        Ok(config) => Some(config),
        Err(ConfigFileError::Read { source, .. })
            if source.kind() == std::io::ErrorKind::NotFound =>
        {
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "ignoring config file");
            None
        }
    }
}

/// Read a config file that the user asked for explicitly; errors are surfaced.
pub fn read_config(path: &Path) -> Result<ConfigFile, ConfigFileError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigFileError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    ConfigFile {
        heuristic: merge_section(base.heuristic, overlay.heuristic, HeuristicSection::merge),
        ocr: merge_section(base.ocr, overlay.ocr, OcrSection::merge),
        metadata: merge_section(base.metadata, overlay.metadata, MetadataSection::merge),
        tiers: merge_section(base.tiers, overlay.tiers, TiersSection::merge),
    }
}

fn merge_section<T>(base: Option<T>, overlay: Option<T>, f: fn(T, T) -> T) -> Option<T> {
    match (base, overlay) {
        (Some(b), Some(o)) => Some(f(b, o)),
        (b, o) => o.or(b),
    }
}

impl HeuristicSection {
    fn merge(self, overlay: Self) -> Self {
        Self {
            max_position: overlay.max_position.or(self.max_position),
            min_length: overlay.min_length.or(self.min_length),
            ideal_min_length: overlay.ideal_min_length.or(self.ideal_min_length),
            ideal_max_length: overlay.ideal_max_length.or(self.ideal_max_length),
            max_length: overlay.max_length.or(self.max_length),
            acceptance_threshold: overlay.acceptance_threshold.or(self.acceptance_threshold),
            boilerplate_keywords: overlay.boilerplate_keywords.or(self.boilerplate_keywords),
            extra_boilerplate_keywords: overlay
                .extra_boilerplate_keywords
                .or(self.extra_boilerplate_keywords),
            extra_date_patterns: overlay.extra_date_patterns.or(self.extra_date_patterns),
            extra_minor_words: overlay.extra_minor_words.or(self.extra_minor_words),
        }
    }
}

impl OcrSection {
    fn merge(self, overlay: Self) -> Self {
        Self {
            dpi: overlay.dpi.or(self.dpi),
            language: overlay.language.or(self.language),
            tesseract_path: overlay.tesseract_path.or(self.tesseract_path),
            page_segmentation_mode: overlay
                .page_segmentation_mode
                .or(self.page_segmentation_mode),
            timeout_secs: overlay.timeout_secs.or(self.timeout_secs),
        }
    }
}

impl MetadataSection {
    fn merge(self, overlay: Self) -> Self {
        Self {
            extra_placeholder_patterns: overlay
                .extra_placeholder_patterns
                .or(self.extra_placeholder_patterns),
        }
    }
}

impl TiersSection {
    fn merge(self, overlay: Self) -> Self {
        Self {
            metadata: overlay.metadata.or(self.metadata),
            text_layer: overlay.text_layer.or(self.text_layer),
            ocr: overlay.ocr.or(self.ocr),
        }
    }
}

impl ConfigFile {
    /// Layer the file's values onto `builder`. Values already set on the
    /// builder before this call are overwritten, so apply the file first
    /// and CLI overrides after.
    pub fn apply_to(&self, mut builder: TitleConfigBuilder) -> TitleConfigBuilder {
        if let Some(h) = &self.heuristic {
            if let Some(n) = h.max_position {
                builder = builder.max_position(n);
            }
            if let Some(n) = h.min_length {
                builder = builder.min_len(n);
            }
            if h.ideal_min_length.is_some() || h.ideal_max_length.is_some() {
                let defaults = HeuristicConfig::default();
                builder = builder.ideal_length(
                    h.ideal_min_length.unwrap_or(defaults.ideal_min_len),
                    h.ideal_max_length.unwrap_or(defaults.ideal_max_len),
                );
            }
            if let Some(n) = h.max_length {
                builder = builder.max_len(n);
            }
            if let Some(t) = h.acceptance_threshold {
                builder = builder.acceptance_threshold(t);
            }
            if let Some(keywords) = &h.boilerplate_keywords {
                builder = builder.set_boilerplate_prefixes(keywords.clone());
            }
            for keyword in h.extra_boilerplate_keywords.iter().flatten() {
                builder = builder.add_boilerplate_prefix(keyword.clone());
            }
            for pattern in h.extra_date_patterns.iter().flatten() {
                builder = builder.add_date_pattern(pattern.clone());
            }
            for word in h.extra_minor_words.iter().flatten() {
                builder = builder.add_minor_word(word.clone());
            }
        }

        if let Some(o) = &self.ocr {
            if let Some(dpi) = o.dpi {
                builder = builder.dpi(dpi);
            }
            if let Some(lang) = &o.language {
                builder = builder.ocr_language(lang.clone());
            }
            if let Some(path) = &o.tesseract_path {
                builder = builder.tesseract_path(path);
            }
            if let Some(psm) = o.page_segmentation_mode {
                builder = builder.page_segmentation_mode(psm);
            }
            if let Some(secs) = o.timeout_secs {
                let timeout = (secs > 0).then(|| Duration::from_secs(secs));
                builder = builder.ocr_timeout(timeout);
            }
        }

        if let Some(m) = &self.metadata {
            for pattern in m.extra_placeholder_patterns.iter().flatten() {
                builder = builder.add_placeholder_pattern(pattern.clone());
            }
        }

        if let Some(t) = &self.tiers {
            let defaults = TierToggles::default();
            builder = builder.tiers(TierToggles {
                metadata: t.metadata.unwrap_or(defaults.metadata),
                text_layer: t.text_layer.unwrap_or(defaults.text_layer),
                ocr: t.ocr.unwrap_or(defaults.ocr),
            });
        }

        builder
    }
}
