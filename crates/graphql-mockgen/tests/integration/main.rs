#![allow(unused_crate_dependencies)]

mod builders;
mod codegen;
mod common;
mod mocks;
