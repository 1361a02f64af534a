//! A GraphQL calculator: arithmetic queries, a calculation history and schema introspection,
//! answered by a small GraphQL execution engine.

#![cfg_attr(feature = "failfast", allow(unreachable_code))]
#![warn(unreachable_pub)]

macro_rules! failfast_debug {
    ($($tokens:tt)+) => {{
        tracing::debug!($($tokens)+);
        #[cfg(feature = "failfast")]
        panic!(
            "failfast triggered. \
            Please remove the feature failfast if you don't want to see these panics"
        );
    }};
}

pub mod json_ext;

pub mod calculator;
pub mod configuration;
pub mod error;
mod executable;
pub mod execution;
pub mod graphql;
mod introspection;
pub mod resolver;
pub mod services;
pub mod spec;

pub use configuration::Configuration;
pub use executable::main;
pub use execution::Executor;
pub use resolver::ResolverTable;
pub use spec::Schema;
