use async_trait::async_trait;
use ocr_engine::{EngineOptions, OcrEngine, RecognizedWord};
use ocr_models::{BoundingBox, OcrError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type FailFn = Arc<dyn Fn(&EngineOptions) -> OcrError + Send + Sync>;

#[derive(Clone)]
enum Script {
    Words(Vec<RecognizedWord>),
    /// Answers with a single word `"{width}x{height}"` of the PNG it was given.
    EchoDimensions,
    Fail(FailFn),
}

/// In-process stand-in for tesseract with a fixed answer, optional latency
/// and bookkeeping of how it was called.
pub struct ScriptedEngine {
    script: Script,
    delay: Option<Duration>,
    languages: Vec<String>,
    calls: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
    last_options: Mutex<Option<EngineOptions>>,
}

struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedEngine {
    fn with_script(script: Script) -> Self {
        Self {
            script,
            delay: None,
            languages: vec!["eng".to_string(), "osd".to_string()],
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            last_options: Mutex::new(None),
        }
    }

    pub fn words(words: Vec<RecognizedWord>) -> Self {
        Self::with_script(Script::Words(words))
    }

    /// One line of words with the same confidence.
    pub fn text(text: &str, confidence: f64) -> Self {
        Self::words(crate::fixtures::line_of(text, 1, confidence))
    }

    pub fn blank() -> Self {
        Self::words(Vec::new())
    }

    pub fn echo_dimensions() -> Self {
        Self::with_script(Script::EchoDimensions)
    }

    pub fn failing<F>(f: F) -> Self
    where
        F: Fn(&EngineOptions) -> OcrError + Send + Sync + 'static,
    {
        Self::with_script(Script::Fail(Arc::new(f)))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_languages(mut self, languages: &[&str]) -> Self {
        self.languages = languages.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of overlapping `recognize` calls seen so far.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn last_options(&self) -> Option<EngineOptions> {
        self.last_options.lock().ok().and_then(|o| o.clone())
    }
}

#[async_trait]
impl OcrEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn recognize(
        &self,
        png: &[u8],
        options: &EngineOptions,
    ) -> Result<Vec<RecognizedWord>, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_options.lock() {
            *last = Some(options.clone());
        }
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        let _active = ActiveGuard(&self.active);
        self.peak.fetch_max(now_active, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(missing) = options
            .language
            .split('+')
            .find(|l| !self.languages.iter().any(|known| known == l))
        {
            return Err(OcrError::MissingLanguage {
                language: missing.to_string(),
            });
        }

        match &self.script {
            Script::Words(words) => Ok(words.clone()),
            Script::Fail(f) => Err(f(options)),
            Script::EchoDimensions => {
                let img = image::load_from_memory(png).map_err(|e| OcrError::EngineFailure {
                    reason: format!("scripted engine could not read input: {e}"),
                })?;
                Ok(vec![RecognizedWord {
                    block_num: 1,
                    par_num: 1,
                    line_num: 1,
                    word_num: 1,
                    bbox: BoundingBox {
                        x: 0,
                        y: 0,
                        width: img.width(),
                        height: img.height(),
                    },
                    confidence: 90.0,
                    text: format!("{}x{}", img.width(), img.height()),
                }])
            }
        }
    }

    async fn languages(&self) -> Result<Vec<String>, OcrError> {
        Ok(self.languages.clone())
    }
}
