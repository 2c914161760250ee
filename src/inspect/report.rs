//! Inspect report types and terminal formatting.

use std::fmt;

use serde::Serialize;

/// The result of inspecting a document.
#[derive(Clone, Debug, Serialize)]
pub struct InspectReport {
    pub summary: SummarySection,
    /// Objects per schema type.
    pub objects: Vec<TypeCount>,
    /// Reference elements per kind.
    pub references: Vec<TypeCount>,
    #[serde(skip)]
    pub(crate) bar_width: usize,
}

/// Whole-document counts.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SummarySection {
    /// Objects in the model, all types together.
    pub objects: usize,
    /// IDs in the registry.
    pub registered_ids: usize,
    /// Reference descriptors queued while parsing.
    pub references: usize,
    /// Descriptors the link pass resolved.
    pub resolved: usize,
    pub annotations: usize,
    /// Distinct objects carrying at least one annotation.
    pub annotated_objects: usize,
    /// Tolerated parse problems.
    pub warnings: usize,
}

/// A name with its count.
#[derive(Clone, Debug, Serialize)]
pub struct TypeCount {
    pub name: String,
    pub count: usize,
}

impl fmt::Display for InspectReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "╭─────────────────────────────────────────────────────────────╮")?;
        writeln!(f, "│                 OME-XML Inspection Report                   │")?;
        writeln!(f, "╰─────────────────────────────────────────────────────────────╯")?;
        writeln!(f)?;

        self.fmt_summary(f)?;
        writeln!(f)?;
        self.fmt_histogram(f, "Objects", &self.objects)?;
        writeln!(f)?;
        self.fmt_histogram(f, "References", &self.references)?;

        Ok(())
    }
}

impl InspectReport {
    fn fmt_summary(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.summary;
        let rows = [
            ("Objects", s.objects),
            ("IDs", s.registered_ids),
            ("References", s.references),
            ("Resolved", s.resolved),
            ("Annotations", s.annotations),
            ("Annotated", s.annotated_objects),
            ("Warnings", s.warnings),
        ];

        writeln!(f, "┌─ Summary ─────────────────────────────────────────────────┐")?;
        writeln!(f, "│                                                           │")?;
        for (label, value) in rows {
            writeln!(f, "│   {:<14} {:>8}{:33}│", format!("{label}:"), format_number(value), "")?;
        }
        writeln!(f, "│                                                           │")?;
        writeln!(f, "└───────────────────────────────────────────────────────────┘")?;
        Ok(())
    }

    fn fmt_histogram(
        &self,
        f: &mut fmt::Formatter<'_>,
        title: &str,
        entries: &[TypeCount],
    ) -> fmt::Result {
        let header = format!("{title} ({})", entries.len());
        writeln!(f, "┌─ {} {}┐", header, "─".repeat(57usize.saturating_sub(header.len())))?;
        writeln!(f, "│                                                           │")?;

        if entries.is_empty() {
            writeln!(f, "│   None.                                                   │")?;
        } else {
            let max_count = entries.iter().map(|e| e.count).max().unwrap_or(1);
            for entry in entries {
                let bar = render_bar(entry.count, max_count, self.bar_width);
                writeln!(
                    f,
                    "│   {:<24} {:>7}  {}│",
                    truncate_label(&entry.name, 24),
                    format_number(entry.count),
                    pad_bar(&bar, self.bar_width)
                )?;
            }
        }

        writeln!(f, "│                                                           │")?;
        writeln!(f, "└───────────────────────────────────────────────────────────┘")?;
        Ok(())
    }
}

/// Format a number with thousands separators.
fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Render a horizontal bar using Unicode block characters.
fn render_bar(count: usize, max_count: usize, width: usize) -> String {
    if max_count == 0 || width == 0 {
        return String::new();
    }
    let filled = ((count * width) / max_count).min(width);
    "█".repeat(filled) + &"░".repeat(width - filled)
}

fn pad_bar(bar: &str, width: usize) -> String {
    let padding = (width + 2).saturating_sub(bar.chars().count());
    format!("{}{}", bar, " ".repeat(padding))
}

fn truncate_label(label: &str, max_len: usize) -> String {
    if label.chars().count() <= max_len {
        label.to_string()
    } else {
        let kept: String = label.chars().take(max_len - 1).collect();
        format!("{kept}…")
    }
}
