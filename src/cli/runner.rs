//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::extract::NotificationEvent;
use crate::pipeline::{InvocationState, Pipeline};
use crate::seed::{NewEmployee, SeedVariant, Seeder};
use crate::storage::{build_store_provider, ObjectLocation, ObjectStorage};
use crate::transform::SystemClock;
use crate::trigger::{AwsLambdaInvoker, LoadTrigger};
use crate::types::InvocationMode;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

/// Environment variable set by the Lambda runtime
pub const LAMBDA_RUNTIME_ENV: &str = "AWS_LAMBDA_RUNTIME_API";

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Command to execute; without one, `lambda` inside a Lambda runtime
    pub fn command(&self) -> Result<Commands> {
        let in_lambda = std::env::var_os(LAMBDA_RUNTIME_ENV).is_some();
        resolve_command(self.cli.command.clone(), in_lambda)
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let command = self.command()?;
        let config = PipelineConfig::load(self.cli.config.as_deref())?;

        match command {
            Commands::Lambda => {
                let pipeline = Pipeline::from_config(&config).await?;
                crate::handler::run(Arc::new(pipeline)).await
            }
            Commands::Run { objects } => self.run_objects(&config, &objects).await,
            Commands::Seed {
                variant,
                mutate,
                raise_percent,
                invoke,
                invocation,
            } => {
                let mode = invocation.map_or(config.seed.invocation, InvocationMode::from);
                self.seed(&config, variant, mutate.as_deref(), raise_percent, invoke.then_some(mode))
                    .await
            }
            Commands::Check => self.check(&config).await,
            Commands::Checkpoint => self.checkpoint(&config).await,
        }
    }

    /// Process objects as one synthetic event
    async fn run_objects(&self, config: &PipelineConfig, objects: &[String]) -> Result<()> {
        let locations = objects
            .iter()
            .map(|url| ObjectLocation::parse(url))
            .collect::<Result<Vec<_>>>()?;
        let event = NotificationEvent::for_objects(&locations);

        let pipeline = Pipeline::from_config(config).await?;
        let report = pipeline.handle_event(&event).await;
        let response = report.to_response();
        self.output_message(&json!({
            "type": "INVOCATION",
            "statusCode": response.status_code,
            "body": response.body_json().unwrap_or(Value::String(response.body.clone())),
            "transitions": report.transitions,
        }));

        match report.state {
            InvocationState::Done => Ok(()),
            InvocationState::Failed { error, .. } => Err(error),
        }
    }

    /// Upload sample data, optionally invoking the function afterwards
    async fn seed(
        &self,
        config: &PipelineConfig,
        variant: SeedVariant,
        mutate: Option<&str>,
        raise_percent: f64,
        invoke: Option<InvocationMode>,
    ) -> Result<()> {
        let storage = ObjectStorage::new(build_store_provider(&config.storage)?);
        let mut seeder = Seeder::new(storage, &config.seed, Arc::new(SystemClock));

        if let Some(mode) = invoke {
            if config.seed.function_name.is_none() {
                return Err(Error::missing_field("seed.function_name"));
            }
            let invoker = Arc::new(AwsLambdaInvoker::from_env().await);
            seeder = seeder.with_trigger(LoadTrigger::new(invoker, mode));
        }

        let outcome = match mutate {
            Some(key) => {
                seeder
                    .mutate(key, raise_percent, &NewEmployee::default())
                    .await?
            }
            None => seeder.upload(variant).await?,
        };
        info!(location = %outcome.location, "Seed complete");

        self.output_message(&json!({
            "type": "SEED",
            "seed": outcome,
        }));
        Ok(())
    }

    /// Resolve credentials and open then close one session
    async fn check(&self, config: &PipelineConfig) -> Result<()> {
        let pipeline = Pipeline::from_config(config).await?;

        let status = async {
            let bundle = pipeline.credentials().resolve().await?;
            let mut warehouse = pipeline.connector().connect(&bundle).await?;
            let backend = warehouse.backend();
            warehouse.close().await?;
            Ok::<_, Error>(backend)
        }
        .await;

        match status {
            Ok(backend) => self.output_message(&json!({
                "type": "CONNECTION_STATUS",
                "connectionStatus": {
                    "status": "SUCCEEDED",
                    "message": format!("Connected to {backend}")
                }
            })),
            Err(ref e) => self.output_message(&json!({
                "type": "CONNECTION_STATUS",
                "connectionStatus": {
                    "status": "FAILED",
                    "kind": e.kind(),
                    "message": format!("Connection failed: {e}")
                }
            })),
        }

        status.map(|_| ())
    }

    /// Print the checkpoint of the copy target
    async fn checkpoint(&self, config: &PipelineConfig) -> Result<()> {
        let pipeline = Pipeline::from_config(config).await?;
        let table = pipeline.loader().raw_table().clone();

        let bundle = pipeline.credentials().resolve().await?;
        let mut warehouse = pipeline.connector().connect(&bundle).await?;
        let checkpoint = warehouse.load_checkpoint(&table).await;
        warehouse.close().await?;
        let checkpoint = checkpoint?;

        self.output_message(&json!({
            "type": "CHECKPOINT",
            "checkpoint": {
                "table": table.to_string(),
                "last_load_time": checkpoint,
            }
        }));
        Ok(())
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}

/// Pick the command to run when none was given
pub fn resolve_command(command: Option<Commands>, in_lambda: bool) -> Result<Commands> {
    match command {
        Some(command) => Ok(command),
        None if in_lambda => Ok(Commands::Lambda),
        None => Err(Error::config(
            "No command given (use --help to list commands)",
        )),
    }
}
