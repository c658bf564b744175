use std::fmt;

use crate::{
    domain::Verdict,
    engine::{ReportResult, ReportRow},
};

/// Renders a [`ReportResult`] as a markdown document.
///
/// The document opens with a summary table, followed by one section per
/// verdict and a final section for requirements that could not be evaluated.
#[derive(Debug, Clone, Copy)]
pub struct MarkdownReport<'a>(pub &'a ReportResult);

impl fmt::Display for MarkdownReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = self.0;

        writeln!(f, "# PARAMETER CHECK REPORT")?;
        writeln!(f)?;
        writeln!(f, "| RESULT | COUNT |")?;
        writeln!(f, "| --- | --- |")?;
        for verdict in Verdict::ALL {
            writeln!(f, "| {verdict} | {} |", result.summary.count(verdict))?;
        }
        writeln!(f, "| unresolved | {} |", result.summary.unresolved)?;
        writeln!(f, "| **total** | **{}** |", result.summary.total)?;

        for verdict in Verdict::ALL {
            let rows = result.rows.iter().filter(|row| row.verdict == Some(verdict));
            section(f, heading(verdict), rows)?;
        }
        let unresolved = result.rows.iter().filter(|row| row.verdict.is_none());
        section(f, "REQUIREMENTS THAT COULD NOT BE EVALUATED", unresolved)
    }
}

const fn heading(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Matched => "PARAMETERS WITH VALUES AS EXPECTED",
        Verdict::NotFound => "PARAMETERS NOT FOUND IN CONFIG",
        Verdict::Ambiguous => "PARAMETERS WITH MULTIPLE VALUES IN CONFIG",
        Verdict::TypeIncompatible => "PARAMETERS THAT COULD NOT BE COMPARED",
        Verdict::Mismatched => "PARAMETERS WITH WRONG VALUE",
    }
}

fn section<'a>(
    f: &mut fmt::Formatter<'_>,
    heading: &str,
    rows: impl Iterator<Item = &'a ReportRow>,
) -> fmt::Result {
    writeln!(f)?;
    writeln!(f, "## {heading}")?;
    writeln!(f)?;

    let mut rows = rows.peekable();
    if rows.peek().is_none() {
        return writeln!(f, "_None_");
    }

    writeln!(f, "| ID | PARAMETER | EXPECTED VALUE | ACTUAL VALUE | FOUND IN | NOTE |")?;
    writeln!(f, "| --- | --- | --- | --- | --- | --- |")?;
    for row in rows {
        writeln!(
            f,
            "| {} | {} | {} | {} | {} | {} |",
            cell(&row.id),
            cell(&row.path),
            cell(row.expected.as_deref().unwrap_or("")),
            cell(row.actual.as_deref().unwrap_or("")),
            row.found_in
                .iter()
                .map(|source| cell(source))
                .collect::<Vec<_>>()
                .join("<br>"),
            cell(&row.note),
        )?;
    }
    Ok(())
}

/// Escapes text for a table cell.
fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}
