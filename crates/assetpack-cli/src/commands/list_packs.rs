//! List packs command implementation.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::context::Context;
use crate::output;

use super::describe;

#[derive(Args, Debug)]
pub struct ListPacksArgs {
    /// Print the packs as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(ctx: &Context, args: ListPacksArgs) -> Result<()> {
    let packs = ctx
        .authorized()?
        .list_packs()
        .await
        .map_err(|e| describe(e, "Failed to list packs"))?;

    if args.json {
        return output::json_pretty(&packs);
    }

    if packs.is_empty() {
        output::note("No packs found.");
        return Ok(());
    }

    for pack in &packs {
        let models = match pack.model_count {
            Some(1) => "1 model".to_string(),
            Some(n) => format!("{} models", n),
            None => String::new(),
        };
        println!("{}  {}  {}", pack.id.as_str().bold(), pack.name, models.dimmed());
    }

    Ok(())
}
