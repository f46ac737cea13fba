use anyhow::{bail, Result};

use crate::cli::ResolveArgs;
use crate::commands::Workspace;

pub fn run(args: ResolveArgs) -> Result<()> {
    let ws = Workspace::load()?;
    let mappings = ws.open_mappings()?;
    match mappings.resolve(&args.alias) {
        Some(primary) => {
            println!("{primary}");
            Ok(())
        }
        None => bail!("no company is known by '{}'", args.alias.trim()),
    }
}
