use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;
use passtune_core::candidate::ScoredCandidate;
use passtune_core::catalog::PassCatalog;

pub fn print_catalog_table(catalog: &PassCatalog) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Index", "Pass"]);

    for (index, name) in catalog.iter().enumerate() {
        let label = if name.is_empty() { "(no-op)" } else { name };
        table.add_row(vec![index.to_string(), label.to_string()]);
    }

    println!("{table}");
}

pub fn print_run_summary(
    algorithm: &str,
    evaluations: usize,
    archive_entries: usize,
    result: &ScoredCandidate,
) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.add_row(vec!["Algorithm".to_string(), algorithm.to_string()]);
    table.add_row(vec!["Evaluations".to_string(), evaluations.to_string()]);
    table.add_row(vec![
        "Archive entries".to_string(),
        archive_entries.to_string(),
    ]);
    table.add_row(vec!["Best fitness".to_string(), result.fitness.to_string()]);
    table.add_row(vec![
        "Best sequence".to_string(),
        result.candidate.to_string(),
    ]);

    println!("{table}");
}
