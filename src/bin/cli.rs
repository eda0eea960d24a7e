#![cfg(not(tarpaulin_include))]

use sheetviz::chart::{ChartConfig, ChartKind, project};
use sheetviz::dataset::Dataset;
use sheetviz::downloader::{self, DownloadFormat};
use sheetviz::import::{self, ImportPreview};
use std::env;
use std::fs;
use std::path::Path;

fn usage(program: &str) {
    eprintln!("Usage:");
    eprintln!("  {} preview <file>", program);
    eprintln!("  {} template <out.csv|out.xlsx>", program);
    eprintln!("  {} chart <file> <bar|line|pie|area> <y1,y2,..> [x]", program);
}

fn print_preview(preview: &ImportPreview) {
    println!("Source: {}", preview.source);
    println!("Fields:");
    for field in &preview.fields {
        println!("  {:<20} {}", field.name, field.field_type);
    }

    println!("Rows: {} ({} blank skipped)", preview.rows.len(), preview.skipped_rows);
    for row in preview.rows.iter().take(10) {
        let cells: Vec<String> = preview
            .fields
            .iter()
            .map(|field| row.value_for(field).to_string())
            .collect();
        println!("  {}", cells.join(" | "));
    }
}

fn write_template(out: &str) -> Result<(), Box<dyn std::error::Error>> {
    let format = match Path::new(out).extension().and_then(|e| e.to_str()) {
        Some("csv") => DownloadFormat::Csv,
        _ => DownloadFormat::Xlsx,
    };
    fs::write(out, downloader::template(format)?)?;
    println!("Wrote {} template to {}", format.extension(), out);
    Ok(())
}

fn print_chart(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let preview = import::import_file(&args[0])?;
    let kind: ChartKind = args[1].parse()?;

    let mut config = ChartConfig::new(kind);
    for name in args[2].split(',').filter(|n| !n.trim().is_empty()) {
        config = config.with_y_axis(name.trim());
    }
    if let Some(x) = args.get(3) {
        config = config.with_x_axis(x);
    }

    let dataset = Dataset::from_parts(preview.fields, preview.rows);
    for name in config.non_numeric_y(&dataset) {
        eprintln!("Warning: `{}` is not a numeric field, plotting as 0", name);
    }

    let data = project(&dataset, &config);
    if data.is_empty() {
        println!("Nothing to plot");
        return Ok(());
    }

    if kind == ChartKind::Pie {
        for slice in &data.slices {
            println!("{:<20} {}", slice.label, slice.value);
        }
    } else {
        println!("{:<20} {}", "", data.series.join("\t"));
        for point in &data.points {
            let values: Vec<String> = point.values.iter().map(|v| v.to_string()).collect();
            println!("{:<20} {}", point.label, values.join("\t"));
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("cli");

    match args.get(1).map(String::as_str) {
        Some("preview") if args.len() == 3 => print_preview(&import::import_file(&args[2])?),
        Some("template") if args.len() == 3 => write_template(&args[2])?,
        Some("chart") if args.len() == 5 || args.len() == 6 => print_chart(&args[2..])?,
        _ => usage(program),
    }

    Ok(())
}
