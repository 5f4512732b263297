use crate::reports;
use clap::Args;
use passtune_core::catalog::PassCatalog;
use passtune_core::error::PtResult;
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct PassesArgs {
    /// Custom catalog file, one pass name per line
    #[arg(long)]
    pub catalog: Option<String>,
}

pub fn run(args: PassesArgs) -> PtResult<()> {
    let catalog = match &args.catalog {
        Some(path) => PassCatalog::from_file(path)?,
        None => PassCatalog::default_llvm(),
    };

    info!("📜 Catalog holds {} passes", catalog.len());
    reports::print_catalog_table(&catalog);
    Ok(())
}
