//! Stateful Generator
//!
//! Holds settings, the last written artifact, and an optional completion
//! callback. Every generate call reports through that callback exactly once:
//! `None` on success, `Some(message)` on failure.

use std::path::Path;

use crate::config::GeneratorSettings;
use crate::encoder::{MatrixEncoder, StandardEncoder};
use crate::output::{export_artifact, OutputArtifact};
use crate::pipeline::{GenerationPipeline, GenerationReport, PipelineError, Stage};
use crate::symbology::{self, Symbology, SymbologyFilter};

pub type FinishedCallback = Box<dyn FnMut(Option<&str>) + Send>;

pub struct Generator<E = StandardEncoder> {
    settings: GeneratorSettings,
    pipeline: GenerationPipeline<E>,
    output: Option<OutputArtifact>,
    stage: Stage,
    on_finished: Option<FinishedCallback>,
}

impl Generator<StandardEncoder> {
    pub fn new(settings: GeneratorSettings) -> Self {
        Self::with_encoder(settings, StandardEncoder::new())
    }
}

impl<E: MatrixEncoder> Generator<E> {
    pub fn with_encoder(settings: GeneratorSettings, encoder: E) -> Self {
        Self {
            settings,
            pipeline: GenerationPipeline::new(encoder),
            output: None,
            stage: Stage::Idle,
            on_finished: None,
        }
    }

    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut GeneratorSettings {
        &mut self.settings
    }

    pub fn on_finished(&mut self, callback: impl FnMut(Option<&str>) + Send + 'static) {
        self.on_finished = Some(Box::new(callback));
    }

    pub fn format(&self) -> Symbology {
        self.settings.format
    }

    /// Select the symbology. Group selectors and `None` are rejected and the
    /// current format is kept.
    pub fn set_format(&mut self, filter: SymbologyFilter) -> bool {
        match symbology::resolve(filter) {
            Ok(format) => {
                self.settings.format = format;
                true
            }
            Err(_) => false,
        }
    }

    /// Select the symbology by name, see [`symbology::parse`].
    pub fn set_format_name(&mut self, name: &str) -> bool {
        self.set_format(symbology::parse(name))
    }

    /// Where the last successful run wrote its image.
    pub fn output_file(&self) -> Option<&Path> {
        self.output.as_ref().map(|o| o.path.as_path())
    }

    pub fn last_output(&self) -> Option<&OutputArtifact> {
        self.output.as_ref()
    }

    /// `Idle` before the first run, then `Done` or `Failed`.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Encode `text` with the current settings and write the image.
    ///
    /// A failed run leaves the previous artifact in place.
    pub fn generate(&mut self, text: &str) -> Result<GenerationReport, PipelineError> {
        let request = self.settings.request(text);
        let result = self.pipeline.generate(&request);

        match &result {
            Ok(report) => {
                self.output = Some(report.artifact.clone());
                self.stage = Stage::Done;
                self.notify(None);
            }
            Err(e) => {
                self.stage = Stage::Failed;
                self.notify(Some(&e.to_string()));
            }
        }
        result
    }

    /// Copy the last generated image into `documents_dir`.
    ///
    /// The caller is responsible for any storage permission the platform
    /// requires before calling this.
    pub fn save_image(&self, documents_dir: &Path) -> bool {
        export_artifact(self.output.as_ref(), documents_dir)
    }

    fn notify(&mut self, error: Option<&str>) {
        if let Some(callback) = self.on_finished.as_mut() {
            callback(error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn generator_in(dir: &Path) -> Generator {
        Generator::new(GeneratorSettings {
            format: Symbology::QrCode,
            file_path: dir.to_path_buf(),
            ..Default::default()
        })
    }

    #[test]
    fn test_set_format_rejects_groups_and_keeps_current() {
        let dir = tempfile::tempdir().unwrap();
        let mut generator = generator_in(dir.path());

        assert!(!generator.set_format(SymbologyFilter::Any));
        assert!(!generator.set_format(SymbologyFilter::None));
        assert!(!generator.set_format_name("OneDCodes"));
        assert!(!generator.set_format_name("no such format"));
        assert_eq!(generator.format(), Symbology::QrCode);

        assert!(generator.set_format_name("ean-13"));
        assert_eq!(generator.format(), Symbology::Ean13);
    }

    #[test]
    fn test_completion_signal_reports_every_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let mut generator = generator_in(dir.path());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        generator.on_finished(move |error| sink.lock().unwrap().push(error.map(str::to_string)));

        assert_eq!(generator.stage(), Stage::Idle);
        generator.generate("https://example.com").unwrap();
        assert_eq!(generator.stage(), Stage::Done);
        assert!(generator.generate("").is_err());
        assert_eq!(generator.stage(), Stage::Failed);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], None);
        assert!(seen[1].as_deref().unwrap().contains("empty"));
    }

    #[test]
    fn test_output_file_tracks_last_success() {
        let dir = tempfile::tempdir().unwrap();
        let mut generator = generator_in(dir.path());
        assert!(generator.output_file().is_none());

        generator.generate("first").unwrap();
        assert_eq!(generator.output_file(), Some(dir.path().join("scode.png").as_path()));

        generator.settings_mut().file_name = "second".to_string();
        generator.generate("second").unwrap();
        assert_eq!(generator.output_file(), Some(dir.path().join("second.png").as_path()));
    }

    #[test]
    fn test_save_image_requires_prior_generation() {
        let dir = tempfile::tempdir().unwrap();
        let docs = tempfile::tempdir().unwrap();
        let mut generator = generator_in(dir.path());

        assert!(!generator.save_image(docs.path()));
        generator.generate("export me").unwrap();
        assert!(generator.save_image(docs.path()));
        assert!(docs.path().join("scode.png").exists());
    }
}
