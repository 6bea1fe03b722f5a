//! Sign-in options handed to the session client factory.

use std::collections::BTreeMap;
use tracing::{debug, error};

use super::capability::{CapabilityRegistry, GAMES_CAPABILITY};
use crate::error::BridgeError;
use crate::request::SignInConfiguration;

/// Base configuration the options start from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BaseOptions {
    #[default]
    DefaultSignIn,
    GamesSignIn,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAuthCode {
    pub client_id: String,
    pub force_refresh: bool,
}

/// Capability-specific settings attached to the options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionsExtension {
    pub capability: String,
    pub properties: BTreeMap<String, String>,
}

impl OptionsExtension {
    pub fn new(capability: impl Into<String>) -> Self {
        Self {
            capability: capability.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// Everything the SDK needs to build a session client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignInOptions {
    pub base: BaseOptions,
    pub server_auth_code: Option<ServerAuthCode>,
    pub request_email: bool,
    /// Client id the id token is minted for, when one is requested.
    pub id_token_client_id: Option<String>,
    pub scopes: Vec<String>,
    pub account_name: Option<String>,
    pub extensions: Vec<OptionsExtension>,
    /// Extra APIs the client must add next to sign-in.
    pub apis: Vec<String>,
    /// Route popups to an invisible, non-clickable view.
    pub hide_popups: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SignInOptionsBuilder {
    options: SignInOptions,
}

impl SignInOptionsBuilder {
    pub fn new(base: BaseOptions) -> Self {
        Self {
            options: SignInOptions {
                base,
                ..Default::default()
            },
        }
    }

    pub fn request_server_auth_code(mut self, client_id: impl Into<String>, force_refresh: bool) -> Self {
        self.options.server_auth_code = Some(ServerAuthCode {
            client_id: client_id.into(),
            force_refresh,
        });
        self
    }

    pub fn request_email(mut self) -> Self {
        self.options.request_email = true;
        self
    }

    pub fn request_id_token(mut self, client_id: impl Into<String>) -> Self {
        self.options.id_token_client_id = Some(client_id.into());
        self
    }

    pub fn request_scope(mut self, scope: impl Into<String>) -> Self {
        self.options.scopes.push(scope.into());
        self
    }

    pub fn set_account_name(mut self, name: impl Into<String>) -> Self {
        self.options.account_name = Some(name.into());
        self
    }

    pub fn add_extension(mut self, extension: OptionsExtension) -> Self {
        self.options.extensions.push(extension);
        self
    }

    pub fn add_api(mut self, api: impl Into<String>) -> Self {
        self.options.apis.push(api.into());
        self
    }

    pub fn hide_popups(mut self) -> Self {
        self.options.hide_popups = true;
        self
    }

    pub fn build(self) -> SignInOptions {
        self.options
    }

    /// Translate a request configuration into options.
    ///
    /// Fails before anything reaches the SDK when a capability is requested
    /// without what it needs: a web client id for auth codes and id tokens,
    /// or a registered games provider for the games configuration.
    pub fn from_configuration(
        config: &SignInConfiguration,
        capabilities: &CapabilityRegistry,
    ) -> Result<SignInOptions, BridgeError> {
        let mut builder = if config.use_games_config {
            debug!("Using games sign-in options");
            Self::new(BaseOptions::GamesSignIn)
        } else {
            debug!("Using default sign-in options");
            Self::new(BaseOptions::DefaultSignIn)
        };

        if config.request_auth_code {
            if config.web_client_id.is_empty() {
                error!("Web client ID is needed for Auth Code");
                return Err(BridgeError::InvalidConfiguration(
                    "auth code requires a web client id".to_string(),
                ));
            }
            debug!(
                force_refresh = config.force_refresh_token,
                client = %config.web_client_id,
                "Requesting auth code"
            );
            builder = builder.request_server_auth_code(&config.web_client_id, config.force_refresh_token);
        }

        if config.request_email {
            debug!("Requesting email");
            builder = builder.request_email();
        }

        if config.request_id_token {
            if config.web_client_id.is_empty() {
                error!("Web client ID is needed for ID Token");
                return Err(BridgeError::InvalidConfiguration(
                    "id token requires a web client id".to_string(),
                ));
            }
            debug!(client = %config.web_client_id, "Requesting id token");
            builder = builder.request_id_token(&config.web_client_id);
        }

        for scope in &config.additional_scopes {
            debug!(scope = %scope, "Adding scope");
            builder = builder.request_scope(scope);
        }

        if config.use_games_config {
            let games = capabilities.require(GAMES_CAPABILITY)?;
            if config.hide_ui_popups {
                debug!("Hiding popup views for games API");
                builder = builder.add_extension(games.options_extension(false)?);
            }
            debug!("Adding games API");
            builder = builder.add_api(games.api()?);
        }

        if let Some(name) = config.account_name.as_deref().filter(|n| !n.is_empty()) {
            debug!(account = %name, "Setting account name");
            builder = builder.set_account_name(name);
        }

        if config.hide_ui_popups {
            builder = builder.hide_popups();
        }

        Ok(builder.build())
    }
}
