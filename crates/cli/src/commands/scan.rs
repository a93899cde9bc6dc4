use crate::args::CartOptions;
use crate::report::print_json;
use anyhow::Result;
use cartflash_rom::scan_headers;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};

pub fn run(opts: &CartOptions) -> Result<()> {
    let mut cart = opts.open()?;
    let headers = scan_headers(&mut cart)?;

    if opts.json {
        return print_json(&headers);
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Offset", "Title", "Game Code", "Maker"]);
    for header in &headers {
        table.add_row(vec![
            format!("{:#010x}", header.offset),
            header.info.title.clone(),
            header.info.game_code.clone(),
            header.info.maker_code.clone(),
        ]);
    }

    println!("\nHeader Scan");
    println!("-----------");
    println!("{table}\n");
    println!("{} headers found.\n", headers.len());
    Ok(())
}
