// Allow the derive macros to refer to `::strata_engine::...` from inside this crate.
extern crate self as strata_engine;

pub mod ecs;
