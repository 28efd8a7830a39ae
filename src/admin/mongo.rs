//! MongoDB driver backend.
//!
//! Each host gets its own direct-connection client so `ping` reaches
//! exactly the member being probed, never a discovered peer.  Clients are
//! created lazily and cached; creating one does not touch the network, and
//! the driver reconnects on its own between attempts.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use mongodb::bson::{doc, Document};
use mongodb::error::{Error as DriverError, ErrorKind};
use mongodb::options::{ClientOptions, Credential, ServerAddress};
use mongodb::Client;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::debug;

use super::client::{AdminClient, CommandReply};
use crate::config::ConnectionConfig;
use crate::errors::AdminError;
use crate::topology::{ClusterConfig, ClusterStatus};

const APP_NAME: &str = "replset-bootstrap";

/// Administrative client backed by the official MongoDB driver.
pub struct MongoAdmin {
    /// Host that receives `replSetGetStatus` and `replSetInitiate`.
    seed: String,
    settings: ConnectionConfig,
    /// host -> client, filled on first use.
    clients: Mutex<HashMap<String, Client>>,
}

impl MongoAdmin {
    pub fn new(seed: impl Into<String>, settings: ConnectionConfig) -> Self {
        Self {
            seed: seed.into(),
            settings,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Host that receives `replSetGetStatus` and `replSetInitiate`.
    pub fn seed(&self) -> &str {
        &self.seed
    }

    fn client_options(&self, host: &str) -> Result<ClientOptions, AdminError> {
        let address = ServerAddress::parse(host)
            .map_err(|e| AdminError::Decode(format!("invalid host {host}: {e}")))?;
        let timeout = Duration::from_millis(self.settings.server_selection_timeout_ms);

        let mut options = ClientOptions::default();
        options.hosts = vec![address];
        options.direct_connection = Some(true);
        options.server_selection_timeout = Some(timeout);
        options.connect_timeout = Some(timeout);
        options.app_name = Some(APP_NAME.to_string());

        if let Some(username) = &self.settings.username {
            let mut credential = Credential::default();
            credential.username = Some(username.clone());
            credential.password = self.settings.password.clone();
            credential.source = Some("admin".to_string());
            options.credential = Some(credential);
        }
        Ok(options)
    }

    async fn client_for(&self, host: &str) -> Result<Client, AdminError> {
        let mut clients = self.clients.lock().await;
        if let Some(client) = clients.get(host) {
            return Ok(client.clone());
        }
        let client = Client::with_options(self.client_options(host)?).map_err(driver_error)?;
        clients.insert(host.to_string(), client.clone());
        Ok(client)
    }

    async fn run_admin_command(
        &self,
        host: &str,
        command: Document,
    ) -> Result<Document, AdminError> {
        let client = self.client_for(host).await?;
        client
            .database("admin")
            .run_command(command)
            .await
            .map_err(driver_error)
    }
}

impl AdminClient for MongoAdmin {
    fn ping(
        &self,
        host: &str,
    ) -> Pin<Box<dyn Future<Output = Result<CommandReply, AdminError>> + Send + '_>> {
        let host = host.to_string();
        Box::pin(async move {
            let reply = self.run_admin_command(&host, doc! { "ping": 1 }).await?;
            decode(reply)
        })
    }

    fn status(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<ClusterStatus, AdminError>> + Send + '_>> {
        Box::pin(async move {
            let reply = self
                .run_admin_command(&self.seed, doc! { "replSetGetStatus": 1 })
                .await?;
            decode(reply)
        })
    }

    fn initiate(
        &self,
        config: &ClusterConfig,
    ) -> Pin<Box<dyn Future<Output = Result<(), AdminError>> + Send + '_>> {
        let command = initiate_command(config);
        Box::pin(async move {
            let command = command?;
            debug!(seed = %self.seed, "sending replSetInitiate");
            let reply: CommandReply = decode(self.run_admin_command(&self.seed, command).await?)?;
            if reply.is_ok() {
                Ok(())
            } else {
                Err(AdminError::Command {
                    code: 0,
                    code_name: String::new(),
                    message: format!("replSetInitiate returned ok: {}", reply.ok),
                })
            }
        })
    }
}

/// Build `{ replSetInitiate: { _id, members: [...] } }`.
fn initiate_command(config: &ClusterConfig) -> Result<Document, AdminError> {
    let config_doc = mongodb::bson::to_document(config)
        .map_err(|e| AdminError::Decode(format!("encoding replica set config: {e}")))?;
    Ok(doc! { "replSetInitiate": config_doc })
}

fn decode<T: DeserializeOwned>(reply: Document) -> Result<T, AdminError> {
    mongodb::bson::from_document(reply).map_err(|e| AdminError::Decode(e.to_string()))
}

/// Server-side command errors keep their code; everything else (DNS,
/// refused connections, server selection timeouts) is unreachability.
fn driver_error(err: DriverError) -> AdminError {
    match err.kind.as_ref() {
        ErrorKind::Command(command) => {
            AdminError::from_code(command.code, &command.code_name, &command.message)
        }
        _ => AdminError::Unreachable {
            message: err.to_string(),
        },
    }
}
