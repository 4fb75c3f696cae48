use clap::Subcommand;
use hlscan_core::config::Properties;

use super::Context;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Write a commented properties template
    Init,
    /// Show the resolved properties with tokens masked
    Show,
}

pub fn run(action: ConfigAction, ctx: &Context) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let (path, created) = Properties::init(ctx.config.as_deref())?;
            if created {
                println!("Wrote config template to {}", path.display());
            } else {
                println!("Config already exists at {}", path.display());
            }
            Ok(())
        }
        ConfigAction::Show => {
            let props = ctx.properties()?;
            println!("{}", props.to_redacted_toml()?);
            Ok(())
        }
    }
}
