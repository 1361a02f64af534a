//! Main entry point for the calculator CLI.

fn main() -> anyhow::Result<()> {
    graphql_calculator::main()
}
