//! Screenshot-to-structured-record extraction.
//!
//! Turns a post-game result screenshot into a [`MatchRecord`]: the decoded
//! outcome, map, duration, timestamp, killer, and up to four survivors'
//! stats. See [`Extractor`] for the entry point.

mod config;
mod datetime;
mod error;
mod icon_matcher;
mod image;
mod match_parser;
mod ocr;
mod resolver;
mod templates;
mod text_assembler;
mod token;

pub use config::ExtractorConfig;
pub use error::ExtractError;
pub use icon_matcher::{IconKind, IconMatch, IconMatcher};
pub use image::{Color, Image, OwnedImage};
pub use match_parser::{MatchParser, MatchRecord, Outcome, SurvivorStats};
pub use ocr::OcrBackend;
pub use resolver::LayoutResolver;
pub use templates::{Template, TemplateKind, TemplateSet};
pub use text_assembler::{RowFields, TextAssembler};
pub use token::{Point, RawPolygon, Token};

use std::sync::Arc;

use resultshot_registry::{LayoutRegistry, RelativeIcon};

/// Owns the loaded templates, the OCR backend, and the layout resolver; the
/// single entry point embedding code drives per screenshot.
pub struct Extractor {
    config: ExtractorConfig,
    templates: TemplateSet,
    ocr_backend: Arc<OcrBackend>,
    resolver: LayoutResolver,
    registry: Arc<dyn LayoutRegistry>,
}

impl Extractor {
    /// Loads templates from `config.templates_path` and wires up the
    /// resolver. Returns `TemplateLoadFailure` only when a character name
    /// collides across the survivors/hunters directories; a single
    /// undecodable template file is logged and skipped.
    pub fn new(
        config: ExtractorConfig,
        ocr_backend: OcrBackend,
        registry: Arc<dyn LayoutRegistry>,
    ) -> Result<Self, ExtractError> {
        let templates = TemplateSet::load(&config.templates_path)?;
        let resolver = LayoutResolver::new(config.aspect_tolerance);

        Ok(Self {
            config,
            templates,
            ocr_backend: Arc::new(ocr_backend),
            resolver,
            registry,
        })
    }

    /// Extract a [`MatchRecord`] from raw image bytes.
    ///
    /// `custom_layout`, when present, overrides both the registry and the
    /// built-in fallback buckets for this call only.
    pub fn extract(
        &self,
        image_bytes: &[u8],
        custom_layout: Option<&[RelativeIcon; 5]>,
    ) -> Result<MatchRecord, ExtractError> {
        let parser = MatchParser {
            templates: &self.templates,
            ocr_backend: self.ocr_backend.clone(),
            resolver: &self.resolver,
            registry: self.registry.as_ref(),
            map_names: &self.config.map_names,
            ocr_timeout: std::time::Duration::from_secs(self.config.ocr_timeout_seconds),
            match_threshold: self.config.match_threshold,
            ambiguity_margin: self.config.ambiguity_margin,
        };
        parser.extract(image_bytes, custom_layout)
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }
}
