//! Common constants.

use std::time::Duration;

/// Default platform domain.
pub const DEFAULT_BASE_URL: &str = "terraquantum.io";
/// Default OAuth client ID.
pub const DEFAULT_CLIENT_ID: &str = "gvBa4BHKOTlotDuE6E2HSQBzBDlM00F4";
/// Default OAuth scope.
pub const DEFAULT_SCOPE: &str = "openid profile email offline_access tq42";

/// Environment variable that overrides [`DEFAULT_BASE_URL`].
pub const ENV_BASE_URL: &str = "TQ42_BASE_URL";
/// Environment variable that overrides [`DEFAULT_CLIENT_ID`].
pub const ENV_CLIENT_ID: &str = "TQ42_CLIENT_ID";
/// Environment variable that overrides [`DEFAULT_SCOPE`].
pub const ENV_SCOPE: &str = "TQ42_SCOPE";
/// Environment variable that overrides the channels endpoint URL.
pub const ENV_CHANNELS_URL: &str = "TQ42_CHANNELS_URL";
/// Environment variable holding an access token.
pub const ENV_ACCESS_TOKEN: &str = "TQ42_ACCESS_TOKEN";

/// Metadata key that scopes a duplex stream to a channel.
pub const CHANNEL_ID_METADATA_KEY: &str = "channel_id";
/// Metadata key for the bearer token.
pub const AUTHORIZATION_METADATA_KEY: &str = "authorization";

/// Default number of reconnect attempts before a transport error is given up on.
pub const DEFAULT_RECONNECT_ATTEMPTS: usize = 5;
/// Default reconnect backoff step. Attempt `n` waits up to `n * step` for connectivity.
pub const DEFAULT_RECONNECT_BACKOFF_STEP: Duration = Duration::from_secs(2);

/// Maximum size of an incoming gRPC message.
pub const MAX_DECODING_MESSAGE_SIZE: usize = 10_000_000;

/// Interval between dial attempts while waiting for connectivity.
pub(crate) const READY_POOLING_INTERVAL: Duration = Duration::from_millis(100);
