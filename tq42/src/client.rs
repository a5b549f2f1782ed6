//! # Platform client
//!
//! [`Client`] holds a connection to the channels service and the credentials attached to every
//! request. It is cheap to clone: clones share the underlying HTTP/2 connection until one of them
//! reconnects.
//!
//! Obtaining access tokens is out of scope of this library. Pass a token explicitly with
//! [`ClientBuilder::access_token`] or through the `TQ42_ACCESS_TOKEN` environment variable.

use std::env;
use std::time::Duration;

use tokio::time::{self, Instant};
use tonic::metadata::{AsciiMetadataValue, MetadataMap};
use tonic::transport::{ClientTlsConfig, Endpoint};
use tonic::Status;

use crate::config::ConfigEnvironment;
use crate::consts::{
    AUTHORIZATION_METADATA_KEY, CHANNEL_ID_METADATA_KEY, ENV_ACCESS_TOKEN,
    MAX_DECODING_MESSAGE_SIZE, READY_POOLING_INTERVAL,
};
use crate::proto::ChannelServiceClient;

use crate::prelude::*;

/// Client of the platform.
#[derive(Clone, Debug)]
pub struct Client {
    environment: ConfigEnvironment,
    endpoint: Endpoint,
    channels: ChannelServiceClient,
    authorization: Option<AsciiMetadataValue>,
}

/// Builder for [`Client`].
#[derive(Clone, Debug, Default)]
pub struct ClientBuilder {
    environment: ConfigEnvironment,
    access_token: Option<String>,
}

impl ClientBuilder {
    /// Sets configuration environment.
    pub fn environment(mut self, environment: ConfigEnvironment) -> Self {
        self.environment = environment;
        self
    }

    /// Sets access token sent as a bearer token with every request.
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Builds a client.
    ///
    /// The connection is established lazily, so this does not fail if the service is down.
    /// Must be called within a Tokio runtime.
    pub fn build(self) -> Result<Client> {
        let url = self.environment.channels_url();
        let mut endpoint = Endpoint::from_shared(url.clone())
            .map_err(|err| Error::Config(format!("invalid channels URL `{url}`: {err}")))?;
        if url.starts_with("https://") {
            endpoint = endpoint.tls_config(ClientTlsConfig::new().with_webpki_roots())?;
        }

        let authorization = match self.access_token {
            Some(token) => Some(
                AsciiMetadataValue::try_from(format!("Bearer {token}"))
                    .map_err(|err| Error::Config(format!("invalid access token: {err}")))?,
            ),
            None => None,
        };

        log::debug!("channels endpoint: {url}");
        Ok(Client {
            environment: self.environment,
            channels: channel_service(endpoint.connect_lazy()),
            endpoint,
            authorization,
        })
    }
}

impl Client {
    /// Creates an empty [`ClientBuilder`].
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Creates a client configured from environment variables.
    ///
    /// See [`ConfigEnvironment::from_env`] for the variables recognized. The access token is read
    /// from `TQ42_ACCESS_TOKEN`.
    pub fn from_env() -> Result<Self> {
        let mut builder = Self::builder().environment(ConfigEnvironment::from_env());
        if let Ok(token) = env::var(ENV_ACCESS_TOKEN) {
            builder = builder.access_token(token);
        }
        builder.build()
    }

    /// Configuration environment.
    pub fn environment(&self) -> &ConfigEnvironment {
        &self.environment
    }

    /// Returns `true` if requests carry an access token.
    pub fn is_authenticated(&self) -> bool {
        self.authorization.is_some()
    }

    pub(crate) fn channel_service(&self) -> ChannelServiceClient {
        self.channels.clone()
    }

    /// Metadata attached to every request.
    pub(crate) fn metadata(&self) -> MetadataMap {
        let mut metadata = MetadataMap::new();
        if let Some(authorization) = &self.authorization {
            metadata.insert(AUTHORIZATION_METADATA_KEY, authorization.clone());
        }
        metadata
    }

    /// Metadata of a duplex stream scoped to `channel_id`.
    pub(crate) fn stream_metadata(&self, channel_id: &str) -> Result<MetadataMap> {
        let channel_id = AsciiMetadataValue::try_from(channel_id)
            .map_err(|err| Error::Config(format!("invalid channel ID `{channel_id}`: {err}")))?;

        let mut metadata = self.metadata();
        metadata.insert(CHANNEL_ID_METADATA_KEY, channel_id);
        Ok(metadata)
    }

    /// Dials the endpoint until connected or `timeout` lapses, then switches to the new
    /// connection.
    pub(crate) async fn reconnect(&mut self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match time::timeout(remaining, self.endpoint.connect()).await {
                Ok(Ok(connection)) => {
                    self.channels = channel_service(connection);
                    return Ok(());
                }
                Ok(Err(err)) => {
                    log::trace!("can't connect to channels endpoint: {err}");
                    if Instant::now() + READY_POOLING_INTERVAL >= deadline {
                        return Err(Error::from(err));
                    }
                    time::sleep(READY_POOLING_INTERVAL).await;
                }
                Err(_) => {
                    return Err(Error::from(Status::unavailable(format!(
                        "channels endpoint is not ready within {timeout:?}"
                    ))));
                }
            }
        }
    }
}

fn channel_service(connection: tonic::transport::Channel) -> ChannelServiceClient {
    ChannelServiceClient::new(connection).max_decoding_message_size(MAX_DECODING_MESSAGE_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_environment() -> ConfigEnvironment {
        ConfigEnvironment::new("example.com").with_channels_url("http://127.0.0.1:50051")
    }

    #[tokio::test]
    async fn bearer_token_is_attached() {
        let client = Client::builder()
            .environment(local_environment())
            .access_token("secret")
            .build()
            .unwrap();

        assert!(client.is_authenticated());
        assert_eq!(
            client.metadata().get(AUTHORIZATION_METADATA_KEY).unwrap(),
            "Bearer secret"
        );
    }

    #[tokio::test]
    async fn stream_metadata_is_scoped_to_channel() {
        let client = Client::builder()
            .environment(local_environment())
            .build()
            .unwrap();

        let metadata = client.stream_metadata("c0ffee").unwrap();
        assert_eq!(metadata.get(CHANNEL_ID_METADATA_KEY).unwrap(), "c0ffee");
        assert!(metadata.get(AUTHORIZATION_METADATA_KEY).is_none());

        assert!(matches!(
            client.stream_metadata("bad\nid"),
            Err(Error::Config(_))
        ));
    }

    #[tokio::test]
    async fn invalid_url_is_rejected() {
        let result = Client::builder()
            .environment(ConfigEnvironment::new("example.com").with_channels_url("not a url"))
            .build();

        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn invalid_token_is_rejected() {
        let result = Client::builder()
            .environment(local_environment())
            .access_token("line\nbreak")
            .build();

        assert!(matches!(result, Err(Error::Config(_))));
    }
}
