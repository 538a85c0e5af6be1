//! Human-readable output.

use std::fmt::Write;
use tric::archive::Descriptor;
use tric::engine::{BuiltImage, ImageReport};
use tric::model::{ContainerMetadata, RecordTrail};

/// One line per built image.
pub fn format_built(images: &[BuiltImage]) -> String {
    let mut out = String::new();
    for image in images {
        let _ = writeln!(
            out,
            "{:<12} {:<20} {}  {}",
            image.role.as_str(),
            image.name,
            image.id,
            image.path.display()
        );
    }
    out
}

/// Header fields, object table and metadata of an image.
pub fn format_report(report: &ImageReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Image:        {}", report.path.display());
    let _ = writeln!(out, "ID:           {}", report.id);
    let _ = writeln!(out, "Created:      {}", report.created_at.to_rfc3339());
    let _ = writeln!(out, "Modified:     {}", report.modified_at.to_rfc3339());
    let _ = writeln!(out, "Architecture: {}", report.architecture);
    let _ = writeln!(out);
    let _ = writeln!(out, "{:<4} {:<14} {:>12} {:>12}  NAME", "ID", "TYPE", "OFFSET", "SIZE");
    for descriptor in &report.objects {
        out.push_str(&format_descriptor(descriptor));
    }
    for metadata in &report.metadata {
        let _ = writeln!(out);
        out.push_str(&format_metadata(metadata));
    }
    out
}

fn format_descriptor(d: &Descriptor) -> String {
    let kind = match &d.partition {
        Some(p) => format!("{} ({:?}/{:?})", d.data_type, p.fs, p.part),
        None => d.data_type.to_string(),
    };
    format!(
        "{:<4} {:<14} {:>12} {:>12}  {}\n",
        d.id, kind, d.offset, d.size, d.name
    )
}

/// A metadata record, with its trail when present.
pub fn format_metadata(metadata: &ContainerMetadata) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Metadata for {}", metadata.name);
    let _ = writeln!(out, "  ID:      {}", metadata.id);
    let _ = writeln!(out, "  Created: {}", metadata.created_at.to_rfc3339());
    let _ = writeln!(out, "  Command: {}", metadata.execution_command);
    if let Some(trail) = &metadata.record_trail {
        out.push_str(&format_trail(trail));
    }
    out
}

fn format_trail(trail: &RecordTrail) -> String {
    let mut out = String::from("  Record trail:\n");
    for entry in &trail.inputs {
        let _ = writeln!(out, "    input        {:<20} {}", entry.name, entry.id);
    }
    if let Some(app) = &trail.application {
        let _ = writeln!(out, "    application  {:<20} {}", app.name, app.id);
    }
    if let Some(output) = &trail.output {
        let _ = writeln!(out, "    output       {:<20} {}", output.name, output.id);
    }
    out
}
