use crate::cli::run;

pub mod cli;
mod config;
pub mod domain;
pub mod filter;
pub mod http;
pub mod playback;
pub mod site;
pub mod storage;
pub mod view;

fn main() -> anyhow::Result<()> {
    run()
}
