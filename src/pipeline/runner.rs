//! Per-invocation orchestration

use super::types::{InvocationReport, InvocationResponse, Stage};
use crate::config::PipelineConfig;
use crate::credentials::{
    env_from_bundle, AwsSecretsManagerStore, CredentialBundle, CredentialProvider, SecretStore,
};
use crate::error::Result;
use crate::extract::{Extractor, NotificationEvent};
use crate::load::Loader;
use crate::storage::{build_store_provider, ObjectLocation, ObjectStorage};
use crate::transform::{SystemClock, Transformer};
use crate::trigger::{TokioProcessRunner, TransformTrigger, TriggerStatus};
use crate::types::{CredentialSource, LoadStrategy};
use crate::warehouse::{build_connector, Warehouse, WarehouseConnector};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Extract, transform and load the objects of one notification
#[derive(Debug, Clone)]
pub struct Pipeline {
    credentials: CredentialProvider,
    extractor: Extractor,
    transformer: Transformer,
    loader: Loader,
    connector: Arc<dyn WarehouseConnector>,
    trigger: TransformTrigger,
}

impl Pipeline {
    /// Assemble a pipeline from its parts
    pub fn new(
        credentials: CredentialProvider,
        extractor: Extractor,
        transformer: Transformer,
        loader: Loader,
        connector: Arc<dyn WarehouseConnector>,
        trigger: TransformTrigger,
    ) -> Self {
        Self {
            credentials,
            extractor,
            transformer,
            loader,
            connector,
            trigger,
        }
    }

    /// Build the production pipeline described by the config
    ///
    /// Storage, secrets store and warehouse are the real backends selected by
    /// the config; credentials come from the process environment snapshot.
    pub async fn from_config(config: &PipelineConfig) -> Result<Self> {
        let storage = ObjectStorage::new(build_store_provider(&config.storage)?);
        let store: Option<Arc<dyn SecretStore>> = match config.credentials.source {
            CredentialSource::SecretsManager => {
                Some(Arc::new(AwsSecretsManagerStore::from_env().await))
            }
            CredentialSource::Environment => None,
        };
        Self::with_storage(config, storage, store)
    }

    /// Build a pipeline over the given storage and secrets store
    pub fn with_storage(
        config: &PipelineConfig,
        storage: ObjectStorage,
        store: Option<Arc<dyn SecretStore>>,
    ) -> Result<Self> {
        let credentials = CredentialProvider::new(
            &config.credentials,
            CredentialProvider::env_snapshot(),
            store,
        );
        Ok(Self::new(
            credentials,
            Extractor::new(storage.clone(), &config.extract)?,
            Transformer::new(Arc::new(SystemClock)),
            Loader::from_config(config)?,
            build_connector(config, &storage)?,
            TransformTrigger::from_config(&config.transform_trigger, Arc::new(TokioProcessRunner)),
        ))
    }

    pub fn credentials(&self) -> &CredentialProvider {
        &self.credentials
    }

    pub fn loader(&self) -> &Loader {
        &self.loader
    }

    pub fn connector(&self) -> &Arc<dyn WarehouseConnector> {
        &self.connector
    }

    /// Handle one event and render the function response
    pub async fn handle(&self, event: &NotificationEvent) -> InvocationResponse {
        let report = self.handle_event(event).await;
        report.to_response()
    }

    /// Handle one event
    ///
    /// Credentials are resolved once and one warehouse session serves every
    /// object in the event. The session is closed whether or not the load
    /// succeeds; the first failure aborts the remaining objects.
    pub async fn handle_event(&self, event: &NotificationEvent) -> InvocationReport {
        let mut report = InvocationReport::received();

        report.objects = match event.locations() {
            Ok(objects) => objects,
            Err(e) => return fail(report, e),
        };
        if report.objects.is_empty() {
            info!("Event has no records, nothing to do");
            report.enter(Stage::Done);
            return report;
        }
        info!(objects = report.objects.len(), strategy = ?self.loader.strategy(), "Received event");

        let bundle = match self.credentials.resolve().await {
            Ok(bundle) => bundle,
            Err(e) => return fail(report, e),
        };
        let mut warehouse = match self.connector.connect(&bundle).await {
            Ok(warehouse) => warehouse,
            Err(e) => return fail(report, e),
        };

        let loaded = self.load_objects(warehouse.as_mut(), &mut report).await;
        if let Err(e) = warehouse.close().await {
            warn!(error = %e, "Failed to close warehouse session");
        }
        if let Err(e) = loaded {
            return fail(report, e);
        }

        if let Err(e) = self.run_trigger(&bundle, &mut report).await {
            return fail(report, e);
        }

        report.enter(Stage::Done);
        info!(rows = report.rows_loaded(), "Invocation complete");
        report
    }

    async fn load_objects(
        &self,
        warehouse: &mut dyn Warehouse,
        report: &mut InvocationReport,
    ) -> Result<()> {
        match self.loader.strategy() {
            LoadStrategy::DirectInsert => {
                let objects: Vec<ObjectLocation> = report.objects.clone();
                for location in &objects {
                    info!(object = %location, "Processing object");
                    let dataset = self.extractor.extract(location).await?;
                    report.enter(Stage::Extracted);

                    let records = self.transformer.transform(&dataset);
                    report.enter(Stage::Transformed);

                    let outcome = self.loader.direct_insert(warehouse, &records).await?;
                    report.enter(Stage::Loaded);
                    report.loads.push(outcome);
                }
            }
            LoadStrategy::StagedCopy => {
                // COPY reads the staged files itself
                let outcome = self.loader.staged_copy(warehouse, &report.objects).await?;
                report.enter(Stage::Loaded);
                report.loads.push(outcome);
            }
        }
        Ok(())
    }

    async fn run_trigger(&self, bundle: &CredentialBundle, report: &mut InvocationReport) -> Result<()> {
        let status = self.trigger.run(&env_from_bundle(bundle)).await?;
        if status != TriggerStatus::Skipped {
            report.enter(Stage::TransformationTriggered);
            report.trigger = Some(status);
        }
        Ok(())
    }
}

fn fail(report: InvocationReport, error: crate::error::Error) -> InvocationReport {
    error!(stage = %report.stage(), kind = %error.kind(), error = %error, "Invocation failed");
    report.fail(error)
}
