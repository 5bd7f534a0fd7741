mod app;
mod config;
mod curve;
mod heart;
mod render;

use anyhow::Result;

fn main() -> Result<()> {
    let args = config::parse_args();
    app::run(args)
}
