//! Starts a server that serves a REST surface and a GraphQL surface over a relational store.

#![warn(unreachable_pub)]

pub mod auth;
mod axum_factory;
pub mod configuration;
mod controllers;
pub mod environment;
pub mod error;
mod executable;
pub mod graphql;
pub mod route_map;
pub mod store;
pub mod type_graph;

pub use axum_factory::AppState;
pub use axum_factory::make_axum_router;
pub use configuration::Configuration;
pub use environment::Environment;
pub use environment::Mode;
pub use executable::Executable;
pub use executable::main;
pub use type_graph::TypeGraph;
