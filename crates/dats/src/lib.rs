//! Automated discovery of the transition states of OH-initiated reactions and
//! the rate constants that follow from them

pub mod collection;
pub mod config;
pub mod construct;
pub mod error;
pub mod filter;
pub mod journal;
pub mod molecule;
pub mod monitor;
pub mod step;
pub mod submit;
pub mod validate;
pub mod workflow;

pub use config::Config;
pub use construct::Reaction;
pub use error::DatsError;
pub use molecule::{Molecule, Role};
pub use step::Step;
pub use workflow::{Ensemble, Finals, Workflow};

/// print the formatted message to stderr and exit with status 1
#[macro_export]
macro_rules! die {
    ($($t:tt)*) => {{
        eprintln!($($t)*);
        std::process::exit(1)
    }};
}
