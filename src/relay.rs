use crate::classify::ContentClassifier;
use crate::config::Config;
use crate::error::Result;
use crate::path::PathNamer;
use crate::retrieve::RetrievalPipeline;
use crate::store::RemoteStore;
use crate::upload::UploadPipeline;

/// Everything a request needs, built once at startup and shared read-only.
pub struct Relay<S> {
    config: Config,
    classifier: ContentClassifier,
    namer: PathNamer,
    store: S,
}

impl<S: RemoteStore> Relay<S> {

    pub fn new(config: Config, store: S) -> Result<Relay<S>> {
        let classifier = ContentClassifier::new(config.types.clone());
        let namer = PathNamer::new(&config.types)?;
        Ok(Relay {
            config,
            classifier,
            namer,
            store,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn uploader(&self) -> UploadPipeline<'_, S> {
        UploadPipeline::new(&self.config, &self.classifier, &self.namer, &self.store)
    }

    pub fn retriever(&self) -> RetrievalPipeline<'_, S> {
        RetrievalPipeline::new(&self.config, &self.classifier, &self.namer, &self.store)
    }
}
