//! Main entry point for CLI command to start server.

fn main() -> anyhow::Result<()> {
    graphql_rest_gateway::main()
}
