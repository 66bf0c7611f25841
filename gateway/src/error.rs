//! Gateway errors.
use std::net::SocketAddr;

use displaydoc::Display;
use thiserror::Error;

pub use crate::auth::AuthError;
pub use crate::configuration::ConfigurationError;
pub use crate::route_map::RouteMapError;
pub use crate::store::StoreError;
pub use crate::type_graph::TypeGraphError;

/// Errors that stop the gateway from starting or serving.
#[derive(Error, Debug, Display)]
#[non_exhaustive]
pub enum GatewayError {
    /// GATEWAY_ENV is set to {0}, but only development, testing and production are valid
    InvalidMode(String),

    /// configuration error: {0}
    Configuration(#[from] ConfigurationError),

    /// store error: {0}
    Store(#[from] StoreError),

    /// type graph error: {0}
    TypeGraph(#[from] TypeGraphError),

    /// invalid REST routes: {0}
    RouteMap(#[from] RouteMapError),

    /// could not bind to {address}: {error}
    Bind {
        address: SocketAddr,
        error: std::io::Error,
    },

    /// server failed: {0}
    Serve(std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_mode_names_the_bad_value() {
        assert_eq!(
            GatewayError::InvalidMode("staging".to_string()).to_string(),
            "GATEWAY_ENV is set to staging, but only development, testing and production are valid"
        );
    }

    #[test]
    fn it_wraps_configuration_errors() {
        let error = GatewayError::from(ConfigurationError::MissingSecret);
        assert!(error.to_string().starts_with("configuration error: a JWT secret is required"));
    }
}
